mod client;
mod trace;

pub use client::{Client, Speed};
pub use trace::{AvailabilityTrace, AvailabilityTraces, TRACE_FORMAT_VERSION};

/// Stable unique identifier of a participant.
pub type ClientId = u64;

/// Identifier of the host a participant is assigned to.
pub type HostId = usize;
