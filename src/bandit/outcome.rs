use serde::{Deserialize, Serialize};

/// Feedback reported for a participant once its round of work completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Utility observed for the participant this round.
    pub reward: f64,
    /// Secondary signal reported alongside the reward.
    pub auxiliary: f64,
    /// When the round finished, in the orchestrator's clock.
    pub timestamp: f64,
    /// How long the participant took to finish its work.
    pub duration: f64,
    /// Whether the participant finished its work at all.
    pub success: bool,
}

impl RoundOutcome {
    /// Creates a successful outcome carrying only a reward.
    pub fn new(reward: f64) -> Self {
        Self {
            reward,
            auxiliary: 1.0,
            timestamp: 0.0,
            duration: 1.0,
            success: true,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_auxiliary(mut self, auxiliary: f64) -> Self {
        self.auxiliary = auxiliary;
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}
