use serde::Serialize;

use crate::participant::ClientId;

use super::RoundOutcome;

/// The selector's record of one participant's reward history.
#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    id: ClientId,
    size: u64,
    ema_score: f64,
    try_count: u64,
    duration_estimate: f64,
    last_active_round: f64,
    auxiliary: f64,
    success: bool,
}

impl Arm {
    pub(super) fn new(id: ClientId, reward: f64, size: u64, duration: f64) -> Self {
        Self {
            id,
            size,
            ema_score: reward,
            try_count: 0,
            duration_estimate: duration,
            last_active_round: 0.0,
            auxiliary: 0.0,
            success: true,
        }
    }

    /// Folds a round outcome into the arm's smoothed score.
    pub(super) fn update(&mut self, alpha: f64, outcome: &RoundOutcome) {
        self.ema_score = alpha * outcome.reward + (1.0 - alpha) * self.ema_score;
        self.try_count += 1;
        self.duration_estimate = outcome.duration;
        self.last_active_round = outcome.timestamp;
        self.auxiliary = outcome.auxiliary;
        self.success = outcome.success;
    }

    pub(super) fn set_duration(&mut self, duration: f64) {
        self.duration_estimate = duration;
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn ema_score(&self) -> f64 {
        self.ema_score
    }

    pub fn try_count(&self) -> u64 {
        self.try_count
    }

    pub fn duration_estimate(&self) -> f64 {
        self.duration_estimate
    }

    pub fn last_active_round(&self) -> f64 {
        self.last_active_round
    }

    pub fn auxiliary(&self) -> f64 {
        self.auxiliary
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }

    pub fn metrics(&self) -> ArmMetrics {
        ArmMetrics {
            ema_score: self.ema_score,
            try_count: self.try_count,
            duration_estimate: self.duration_estimate,
        }
    }
}

/// Snapshot of an arm exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArmMetrics {
    pub ema_score: f64,
    pub try_count: u64,
    pub duration_estimate: f64,
}
