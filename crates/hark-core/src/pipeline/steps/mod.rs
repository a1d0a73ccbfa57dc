//! Pipeline steps, in default registry order.

mod block;
mod command;
mod gate;
mod silence;
mod wake;

pub use block::BlockStep;
pub use command::CommandStep;
pub use gate::{is_robot_account, GateStep};
pub use silence::SilenceStep;
pub use wake::WakeStep;
