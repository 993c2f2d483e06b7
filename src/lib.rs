pub mod bandit;
pub mod configs;
pub mod error;
pub mod participant;
pub mod sampler;
pub mod simulation;

pub use bandit::{ArmMetrics, RoundOutcome, UcbSelector};
pub use configs::{SamplerConfig, SamplingMode, ScoreMode};
pub use error::{Result, SamplerError};
pub use participant::{AvailabilityTrace, AvailabilityTraces, Client, ClientId, HostId, Speed};
pub use sampler::{ClientSampler, DataInfo, SharedSampler};
