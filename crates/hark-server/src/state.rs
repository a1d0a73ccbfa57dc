//! Application state for the HTTP server.

use std::collections::HashSet;
use std::sync::Arc;

use hark_core::{HarkConfig, HarkResult, Pipeline, StateStore};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    pipeline: Pipeline,
    store: Arc<StateStore>,
    admins: HashSet<String>,
}

impl AppState {
    /// Build the pipeline and its state store from a validated config.
    pub fn new(config: HarkConfig, admins: impl IntoIterator<Item = String>) -> HarkResult<Self> {
        let store = Arc::new(StateStore::new(config.state.clone()));
        let pipeline = Pipeline::new(config, Arc::clone(&store))?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                store,
                admins: admins.into_iter().collect(),
            }),
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn store(&self) -> &StateStore {
        &self.inner.store
    }

    /// Whether a sender is on the configured admin list.
    pub fn is_admin(&self, uid: &str) -> bool {
        self.inner.admins.contains(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hark_core::config::PipelineConfig;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_admin_lookup() {
        let state = assert_ok!(AppState::new(
            HarkConfig::default(),
            ["boss".to_string(), "ops".to_string()]
        ));
        assert!(state.is_admin("boss"));
        assert!(!state.is_admin("guest"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = HarkConfig::builder()
            .pipeline(PipelineConfig {
                steps: vec![],
                ..Default::default()
            })
            .build();
        assert_err!(AppState::new(config, Vec::new()));
    }
}
