use serde::{Deserialize, Serialize};

use super::{AvailabilityTrace, ClientId, HostId};

/// Per-participant throughput figures used by the completion time model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    /// Samples processed per unit of time.
    pub compute: f64,
    /// Model units transferred per unit of time.
    pub communication: f64,
}

impl Speed {
    pub fn new(compute: f64, communication: f64) -> Self {
        Self {
            compute,
            communication,
        }
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// A registered participant: immutable identity and data volume plus the
/// statistics that change from round to round.
#[derive(Debug, Clone)]
pub struct Client {
    host_id: HostId,
    client_id: ClientId,
    distance: f64,
    size: u64,
    speed: Speed,
    score: f64,
    availability: Option<AvailabilityTrace>,
}

impl Client {
    /// Creates a new `Client`.
    ///
    /// # Arguments
    /// * `host_id` - The host this participant was first seen on.
    /// * `client_id` - The participant's unique identifier.
    /// * `distance` - Statistical divergence of the participant's local data.
    /// * `size` - Number of local data samples.
    /// * `speed` - Compute and communication rates.
    /// * `availability` - Optional activity trace, `None` means always available.
    pub fn new(
        host_id: HostId,
        client_id: ClientId,
        distance: f64,
        size: u64,
        speed: Speed,
        availability: Option<AvailabilityTrace>,
    ) -> Self {
        Self {
            host_id,
            client_id,
            distance,
            size,
            speed,
            score: 0.0,
            availability,
        }
    }

    /// Estimates how long a round of local work takes on this participant.
    ///
    /// Each local epoch processes one batch, capped by the local data size, with a
    /// forward and backward pass costing three times a plain forward pass. The model
    /// is then uploaded once.
    ///
    /// # Arguments
    /// * `batch_size` - Samples per local batch.
    /// * `epochs_per_round` - Local epochs run before uploading.
    /// * `model_size` - Size of the model to upload.
    ///
    /// # Returns
    /// The estimated duration, infinite if either speed is not positive.
    pub fn completion_time(&self, batch_size: u64, epochs_per_round: u64, model_size: f64) -> f64 {
        let samples = epochs_per_round as f64 * self.size.min(batch_size) as f64;
        let compute = rate_time(3.0 * samples, self.speed.compute);
        let communication = rate_time(model_size, self.speed.communication);
        compute + communication
    }

    /// Overwrites the participant's score with the latest reward.
    pub fn register_reward(&mut self, reward: f64) {
        self.score = reward;
    }

    /// Returns `true` if the participant may be selected at `time`.
    pub fn is_active(&self, time: f64) -> bool {
        self.availability
            .as_ref()
            .is_none_or(|trace| trace.is_active(time))
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn host_id(&self) -> HostId {
        self.host_id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    pub fn has_trace(&self) -> bool {
        self.availability.is_some()
    }
}

fn rate_time(work: f64, rate: f64) -> f64 {
    if work <= 0.0 {
        0.0
    } else if rate > 0.0 {
        work / rate
    } else {
        f64::INFINITY
    }
}
