use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::ClientSampler;
use crate::{bandit::RoundOutcome, error::Result, participant::ClientId};

/// A `ClientSampler` shared between orchestration threads.
///
/// Every call goes through one lock, so the seeded generator is advanced by a
/// single caller at a time. Selections stay reproducible only as long as the
/// callers themselves agree on an order.
#[derive(Debug, Clone)]
pub struct SharedSampler {
    inner: Arc<Mutex<ClientSampler>>,
}

impl SharedSampler {
    pub fn new(sampler: ClientSampler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sampler)),
        }
    }

    /// Locks the sampler for a sequence of calls that must not interleave with
    /// other threads.
    pub fn lock(&self) -> MutexGuard<'_, ClientSampler> {
        self.inner.lock()
    }

    pub fn resample_clients(&self, num_of_clients: usize, current_time: f64) -> Vec<ClientId> {
        self.inner.lock().resample_clients(num_of_clients, current_time)
    }

    pub fn register_score(&self, client_id: ClientId, outcome: RoundOutcome) -> Result<()> {
        self.inner.lock().register_score(client_id, outcome)
    }
}
