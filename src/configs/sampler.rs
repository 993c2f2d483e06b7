use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SamplerError};

/// How a round's participants are picked once enough of them are feasible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Rank participants with the bandit selector after the first round.
    #[default]
    Bandit,
    /// Always sample uniformly at random.
    Random,
}

/// Reward shaping applied when ranking arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Rank by the smoothed reward alone.
    #[default]
    Raw,
    /// Rank by smoothed reward per unit of the last observed duration.
    Throughput,
}

/// Sampler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub mode: SamplingMode,
    pub score_mode: ScoreMode,
    /// Inclusive lower bound on a participant's data size.
    pub filter_less: u64,
    /// Inclusive upper bound on a participant's data size.
    pub filter_more: u64,
    pub sample_seed: u64,
    /// EMA smoothing factor, the weight given to the newest reward.
    pub alpha: f64,
    /// Weight of the confidence bonus added to arm scores, `0` disables it.
    pub exploration: f64,
    /// Rejection budget for `next_client_id_to_run`.
    pub max_retries: usize,
    pub batch_size: u64,
    pub upload_epoch: u64,
    pub model_size: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Bandit,
            score_mode: ScoreMode::Raw,
            filter_less: 0,
            filter_more: u64::MAX,
            sample_seed: 233,
            alpha: 0.8,
            exploration: 0.0,
            max_retries: 1024,
            batch_size: 32,
            upload_epoch: 1,
            model_size: 1.0,
        }
    }
}

impl SamplerConfig {
    /// Parses and validates a configuration from its JSON representation.
    /// Missing fields take their default value.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The reward ceiling used to seed a newly registered arm.
    pub fn reward_cap(&self) -> u64 {
        self.upload_epoch.saturating_mul(self.batch_size)
    }

    /// Checks the invariants the sampler relies on.
    pub fn validate(&self) -> Result<()> {
        if self.filter_less > self.filter_more {
            return Err(SamplerError::InvalidConfig(format!(
                "filter_less ({}) cannot exceed filter_more ({})",
                self.filter_less, self.filter_more
            )));
        }

        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SamplerError::InvalidConfig(format!(
                "alpha ({}) must lie in [0, 1]",
                self.alpha
            )));
        }

        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(SamplerError::InvalidConfig(format!(
                "exploration ({}) must be finite and non-negative",
                self.exploration
            )));
        }

        if self.max_retries == 0 {
            return Err(SamplerError::InvalidConfig(
                "max_retries must be greater than 0".into(),
            ));
        }

        if !self.model_size.is_finite() || self.model_size < 0.0 {
            return Err(SamplerError::InvalidConfig(format!(
                "model_size ({}) must be finite and non-negative",
                self.model_size
            )));
        }

        Ok(())
    }
}
