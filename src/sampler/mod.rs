mod hosts;
mod registry;
mod shared;

pub use hosts::HostAssignment;
pub use registry::{ClientSampler, DataInfo};
pub use shared::SharedSampler;
