use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use super::{Arm, ArmMetrics, RoundOutcome};
use crate::{
    configs::{SamplerConfig, ScoreMode},
    error::{Result, SamplerError},
    participant::ClientId,
};

/// Exploitation scheduler keeping one arm per eligible participant.
///
/// Arms are ranked by their smoothed reward, optionally shaped by the last
/// observed duration and topped with a confidence bonus. With the default
/// `exploration` of `0` the ranking is pure exploitation.
#[derive(Debug)]
pub struct UcbSelector {
    arms: HashMap<ClientId, Arm>,
    alpha: f64,
    exploration: f64,
    score_mode: ScoreMode,
    total_tries: u64,
}

impl UcbSelector {
    /// Creates a new `UcbSelector`.
    ///
    /// # Arguments
    /// * `alpha` - EMA weight of the newest reward.
    /// * `exploration` - Weight of the confidence bonus, `0` disables it.
    /// * `score_mode` - Reward shaping applied when ranking.
    pub fn new(alpha: f64, exploration: f64, score_mode: ScoreMode) -> Self {
        Self {
            arms: HashMap::new(),
            alpha,
            exploration,
            score_mode,
            total_tries: 0,
        }
    }

    pub fn from_config(config: &SamplerConfig) -> Self {
        Self::new(config.alpha, config.exploration, config.score_mode)
    }

    /// Registers a new arm, ignoring ids that are already known.
    ///
    /// # Arguments
    /// * `arm_id` - The participant's id.
    /// * `reward` - The seed score.
    /// * `size` - The participant's data size.
    /// * `duration` - The initial duration estimate.
    pub fn register_arm(&mut self, arm_id: ClientId, reward: f64, size: u64, duration: f64) {
        self.arms.entry(arm_id).or_insert_with(|| {
            debug!(arm_id = arm_id, reward = reward; "registered arm");
            Arm::new(arm_id, reward, size, duration)
        });
    }

    /// Folds a round outcome into the arm's smoothed reward.
    ///
    /// # Returns
    /// `NotFound` if the arm was never registered.
    pub fn register_reward(&mut self, arm_id: ClientId, outcome: &RoundOutcome) -> Result<()> {
        let alpha = self.alpha;
        let arm = self.arm_mut(arm_id)?;
        arm.update(alpha, outcome);
        debug!(arm_id = arm_id, ema = arm.ema_score(), tries = arm.try_count(); "updated arm");
        Ok(())
    }

    /// Overwrites the arm's duration estimate.
    pub fn register_duration(&mut self, arm_id: ClientId, duration: f64) -> Result<()> {
        self.arm_mut(arm_id)?.set_duration(duration);
        Ok(())
    }

    /// Picks the `k` best ranked arms among the feasible ones.
    ///
    /// Ties are broken toward fewer tries, then toward the lower id.
    ///
    /// # Arguments
    /// * `k` - The maximum number of arms to return.
    /// * `_current_time` - The orchestrator's clock, reserved for time-aware ranking.
    /// * `feasible` - The arms allowed this round.
    pub fn top_k(
        &mut self,
        k: usize,
        _current_time: f64,
        feasible: &HashSet<ClientId>,
    ) -> Vec<ClientId> {
        self.total_tries += 1;

        let mut ranked: Vec<_> = self
            .arms
            .values()
            .filter(|arm| feasible.contains(&arm.id()))
            .map(|arm| (arm.id(), self.ranking_score(arm), arm.try_count()))
            .collect();

        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.2.cmp(&b.2))
                .then_with(|| a.0.cmp(&b.0))
        });

        ranked.into_iter().take(k).map(|(id, _, _)| id).collect()
    }

    fn ranking_score(&self, arm: &Arm) -> f64 {
        let score = match self.score_mode {
            ScoreMode::Raw => arm.ema_score(),
            ScoreMode::Throughput => {
                let duration = arm.duration_estimate();
                if duration <= 0.0 {
                    f64::INFINITY
                } else if duration.is_finite() {
                    arm.ema_score() / duration
                } else {
                    // never finishes (or unknown): ranks last
                    f64::NEG_INFINITY
                }
            }
        };

        score + self.confidence_bonus(arm)
    }

    fn confidence_bonus(&self, arm: &Arm) -> f64 {
        if self.exploration == 0.0 {
            return 0.0;
        }

        let tries = arm.try_count().max(1) as f64;
        (self.exploration * (self.total_tries as f64).ln() / tries).sqrt()
    }

    /// Returns the arm's current smoothed reward.
    pub fn client_reward(&self, arm_id: ClientId) -> Result<f64> {
        self.arm(arm_id).map(Arm::ema_score)
    }

    pub fn arm(&self, arm_id: ClientId) -> Result<&Arm> {
        self.arms
            .get(&arm_id)
            .ok_or(SamplerError::NotFound { what: "arm", id: arm_id })
    }

    fn arm_mut(&mut self, arm_id: ClientId) -> Result<&mut Arm> {
        self.arms
            .get_mut(&arm_id)
            .ok_or(SamplerError::NotFound { what: "arm", id: arm_id })
    }

    pub fn all_metrics(&self) -> BTreeMap<ClientId, ArmMetrics> {
        self.arms.iter().map(|(id, arm)| (*id, arm.metrics())).collect()
    }

    /// Number of `top_k` queries answered so far.
    pub fn total_tries(&self) -> u64 {
        self.total_tries
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ClientId = 1;
    const B: ClientId = 2;
    const C: ClientId = 3;

    fn feasible(ids: &[ClientId]) -> HashSet<ClientId> {
        ids.iter().copied().collect()
    }

    fn reward_n(sel: &mut UcbSelector, id: ClientId, reward: f64, n: usize) {
        for _ in 0..n {
            sel.register_reward(id, &RoundOutcome::new(reward)).unwrap();
        }
    }

    #[test]
    fn ema_law() {
        let mut sel = UcbSelector::new(0.8, 0.0, ScoreMode::Raw);
        sel.register_arm(A, 10.0, 10, 1.0);

        sel.register_reward(A, &RoundOutcome::new(5.0)).unwrap();
        let expected = 0.8 * 5.0 + 0.2 * 10.0;
        assert!((sel.client_reward(A).unwrap() - expected).abs() < 1e-12);

        sel.register_reward(A, &RoundOutcome::new(1.0)).unwrap();
        let expected = 0.8 * 1.0 + 0.2 * expected;
        assert!((sel.client_reward(A).unwrap() - expected).abs() < 1e-12);
        assert_eq!(sel.arm(A).unwrap().try_count(), 2);
    }

    #[test]
    fn reward_records_outcome_bookkeeping() {
        let mut sel = UcbSelector::new(0.5, 0.0, ScoreMode::Raw);
        sel.register_arm(A, 1.0, 10, 1.0);

        let outcome = RoundOutcome::new(2.0)
            .with_duration(7.5)
            .with_timestamp(3.0)
            .failed();
        sel.register_reward(A, &outcome).unwrap();

        let arm = sel.arm(A).unwrap();
        assert_eq!(arm.duration_estimate(), 7.5);
        assert_eq!(arm.last_active_round(), 3.0);
        assert!(!arm.succeeded());
    }

    #[test]
    fn register_arm_is_idempotent() {
        let mut sel = UcbSelector::new(0.8, 0.0, ScoreMode::Raw);
        sel.register_arm(A, 4.0, 10, 1.0);
        reward_n(&mut sel, A, 2.0, 1);
        let before = sel.arm(A).unwrap().clone();

        sel.register_arm(A, 100.0, 99, 9.0);
        assert_eq!(sel.arm(A).unwrap(), &before);
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn unknown_arm_is_not_found() {
        let mut sel = UcbSelector::new(0.8, 0.0, ScoreMode::Raw);
        let res = sel.register_reward(A, &RoundOutcome::new(1.0));
        assert!(matches!(res, Err(SamplerError::NotFound { id: A, .. })));
        assert!(sel.client_reward(A).is_err());
        assert!(sel.register_duration(A, 1.0).is_err());
    }

    #[test]
    fn ties_favor_fewer_tries() {
        let mut sel = UcbSelector::new(1.0, 0.0, ScoreMode::Raw);
        for id in [A, B, C] {
            sel.register_arm(id, 0.0, 10, 1.0);
        }
        reward_n(&mut sel, A, 0.9, 5);
        reward_n(&mut sel, B, 0.9, 2);
        reward_n(&mut sel, C, 0.5, 1);

        assert_eq!(sel.top_k(2, 0.0, &feasible(&[A, B, C])), vec![B, A]);
    }

    #[test]
    fn full_ties_fall_back_to_id() {
        let mut sel = UcbSelector::new(0.8, 0.0, ScoreMode::Raw);
        for id in [C, A, B] {
            sel.register_arm(id, 1.0, 10, 1.0);
        }
        assert_eq!(sel.top_k(3, 0.0, &feasible(&[A, B, C])), vec![A, B, C]);
    }

    #[test]
    fn top_k_stays_within_feasible_set() {
        let mut sel = UcbSelector::new(0.8, 0.0, ScoreMode::Raw);
        sel.register_arm(A, 1.0, 10, 1.0);
        sel.register_arm(B, 50.0, 10, 1.0);
        sel.register_arm(C, 2.0, 10, 1.0);

        let picked = sel.top_k(2, 0.0, &feasible(&[A, C, 42]));
        assert_eq!(picked, vec![C, A]);
        assert_eq!(sel.total_tries(), 1);
    }

    #[test]
    fn throughput_mode_prefers_fast_arms() {
        let mut sel = UcbSelector::new(1.0, 0.0, ScoreMode::Throughput);
        sel.register_arm(A, 0.0, 10, 1.0);
        sel.register_arm(B, 0.0, 10, 1.0);
        sel.register_reward(A, &RoundOutcome::new(10.0).with_duration(10.0)).unwrap();
        sel.register_reward(B, &RoundOutcome::new(6.0).with_duration(2.0)).unwrap();

        assert_eq!(sel.top_k(1, 0.0, &feasible(&[A, B])), vec![B]);
        // shaping never touches the stored score
        assert_eq!(sel.client_reward(A).unwrap(), 10.0);
    }

    #[test]
    fn throughput_mode_ranks_stalled_arms_last() {
        let mut sel = UcbSelector::new(1.0, 0.0, ScoreMode::Throughput);
        sel.register_arm(A, 0.0, 10, 1.0);
        sel.register_arm(B, 0.0, 10, 1.0);
        sel.register_arm(C, 0.0, 10, 1.0);
        let stalled = RoundOutcome::new(10.0).with_duration(f64::INFINITY).failed();
        sel.register_reward(A, &stalled).unwrap();
        sel.register_reward(B, &RoundOutcome::new(10.0).with_duration(2.0)).unwrap();
        sel.register_reward(C, &RoundOutcome::new(1.0).with_duration(0.0)).unwrap();

        assert_eq!(sel.top_k(3, 0.0, &feasible(&[A, B, C])), vec![C, B, A]);
        assert_eq!(sel.top_k(1, 0.0, &feasible(&[A, B])), vec![B]);
    }

    #[test]
    fn exploration_bonus_lifts_untried_arms() {
        let mut sel = UcbSelector::new(1.0, 4.0, ScoreMode::Raw);
        sel.register_arm(A, 0.0, 10, 1.0);
        sel.register_arm(B, 0.0, 10, 1.0);
        reward_n(&mut sel, A, 1.0, 100);
        sel.register_reward(B, &RoundOutcome::new(0.9)).unwrap();

        sel.top_k(1, 0.0, &feasible(&[A, B]));
        assert_eq!(sel.top_k(1, 0.0, &feasible(&[A, B])), vec![B]);
    }

    #[test]
    fn metrics_table_lists_every_arm() {
        let mut sel = UcbSelector::new(0.8, 0.0, ScoreMode::Raw);
        sel.register_arm(A, 1.0, 10, 2.0);
        sel.register_arm(B, 3.0, 10, 4.0);

        let metrics = sel.all_metrics();
        assert_eq!(metrics.len(), 2);
        assert_eq!(
            metrics[&B],
            ArmMetrics {
                ema_score: 3.0,
                try_count: 0,
                duration_estimate: 4.0
            }
        );
    }
}
