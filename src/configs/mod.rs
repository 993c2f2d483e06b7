mod sampler;

pub use sampler::{SamplerConfig, SamplingMode, ScoreMode};
