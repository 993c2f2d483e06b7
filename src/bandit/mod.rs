mod arm;
mod outcome;
mod ucb;

pub use arm::{Arm, ArmMetrics};
pub use outcome::RoundOutcome;
pub use ucb::UcbSelector;
