use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use super::ClientId;
use crate::error::{Result, SamplerError};

/// The only availability trace format version this crate understands.
pub const TRACE_FORMAT_VERSION: u32 = 1;

/// An ordered sequence of half-open `[start, end)` activity intervals.
///
/// Intervals are sorted by start, non-overlapping and non-empty; this is checked
/// on construction and on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct AvailabilityTrace {
    intervals: Vec<(f64, f64)>,
}

impl AvailabilityTrace {
    /// Creates a new `AvailabilityTrace`.
    ///
    /// # Arguments
    /// * `intervals` - The `(start, end)` pairs during which the participant is active.
    ///
    /// # Returns
    /// An error if any interval is empty, not finite, or out of order.
    pub fn new(intervals: Vec<(f64, f64)>) -> Result<Self> {
        let mut prev_end = f64::NEG_INFINITY;

        for (i, &(start, end)) in intervals.iter().enumerate() {
            if !start.is_finite() || !end.is_finite() {
                return Err(SamplerError::InvalidConfig(format!(
                    "trace interval {i} is not finite"
                )));
            }
            if start >= end {
                return Err(SamplerError::InvalidConfig(format!(
                    "trace interval {i}: start ({start}) must be before end ({end})"
                )));
            }
            if start < prev_end {
                return Err(SamplerError::InvalidConfig(format!(
                    "trace interval {i} overlaps or precedes the previous one"
                )));
            }
            prev_end = end;
        }

        Ok(Self { intervals })
    }

    /// Returns `true` if `time` falls inside one of the active intervals.
    ///
    /// Times before the first or after the last interval are inactive.
    pub fn is_active(&self, time: f64) -> bool {
        let idx = self.intervals.partition_point(|&(start, _)| start <= time);
        idx > 0 && time < self.intervals[idx - 1].1
    }

    pub fn intervals(&self) -> &[(f64, f64)] {
        &self.intervals
    }
}

impl TryFrom<Vec<(f64, f64)>> for AvailabilityTrace {
    type Error = SamplerError;

    fn try_from(value: Vec<(f64, f64)>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AvailabilityTrace> for Vec<(f64, f64)> {
    fn from(value: AvailabilityTrace) -> Self {
        value.intervals
    }
}

/// The versioned mapping from participant id to its availability trace, as
/// supplied by the dataset provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityTraces {
    version: u32,
    clients: BTreeMap<ClientId, AvailabilityTrace>,
}

impl AvailabilityTraces {
    pub fn new(clients: BTreeMap<ClientId, AvailabilityTrace>) -> Self {
        Self {
            version: TRACE_FORMAT_VERSION,
            clients,
        }
    }

    /// Parses a trace document from its JSON representation.
    ///
    /// # Returns
    /// An error if the document is malformed or of an unsupported version.
    pub fn from_json(content: &str) -> Result<Self> {
        let traces: Self = serde_json::from_str(content)?;

        if traces.version != TRACE_FORMAT_VERSION {
            return Err(SamplerError::InvalidConfig(format!(
                "unsupported trace version {} (expected {TRACE_FORMAT_VERSION})",
                traces.version
            )));
        }

        Ok(traces)
    }

    /// Loads a trace document from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn get(&self, client_id: ClientId) -> Option<&AvailabilityTrace> {
        self.clients.get(&client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
