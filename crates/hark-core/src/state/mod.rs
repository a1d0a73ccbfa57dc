//! Conversation and participant state.

mod group;
mod lru;
mod member;
mod store;

pub use group::{GroupSnapshot, GroupState};
pub use member::{MemberState, SharedMember};
pub use store::StateStore;

pub(crate) use member::seconds_between;
