use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Serialize;

use super::HostAssignment;
use crate::{
    bandit::{ArmMetrics, RoundOutcome, UcbSelector},
    configs::{SamplerConfig, SamplingMode},
    error::{Result, SamplerError},
    participant::{AvailabilityTrace, AvailabilityTraces, Client, ClientId, HostId, Speed},
};

/// Summary of the eligible population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataInfo {
    pub total_feasible_clients: usize,
    /// Saturates at `u64::MAX`.
    pub total_feasible_samples: u64,
}

/// Registry of participants that decides, round by round, which of them take part.
///
/// A participant is identified by its client id alone: registering the same id
/// again, from any host, replaces the previous participant. All sampling draws
/// from a generator seeded from the configuration, so two samplers fed the same
/// calls in the same order return the same selections.
#[derive(Debug)]
pub struct ClientSampler {
    config: SamplerConfig,
    clients: HashMap<ClientId, Client>,
    feasible: Vec<ClientId>,
    feasible_samples: u64,
    traced_clients: usize,
    hosts: HostAssignment,
    selector: Option<UcbSelector>,
    traces: Option<AvailabilityTraces>,
    rng: StdRng,
    rounds: u64,
}

impl ClientSampler {
    /// Creates a new `ClientSampler`.
    ///
    /// # Returns
    /// An error if the configuration is invalid.
    pub fn new(config: SamplerConfig) -> Result<Self> {
        config.validate()?;

        let selector = match config.mode {
            SamplingMode::Bandit => Some(UcbSelector::from_config(&config)),
            SamplingMode::Random => None,
        };

        info!(
            "sampler ready: mode {:?}, filter [{}, {}], seed {}",
            config.mode, config.filter_less, config.filter_more, config.sample_seed
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(config.sample_seed),
            config,
            clients: HashMap::new(),
            feasible: Vec::new(),
            feasible_samples: 0,
            traced_clients: 0,
            hosts: HostAssignment::new(),
            selector,
            traces: None,
            rounds: 0,
        })
    }

    /// Creates a new `ClientSampler` that looks up each registered participant's
    /// availability in `traces` unless one is given explicitly.
    pub fn with_traces(config: SamplerConfig, traces: AvailabilityTraces) -> Result<Self> {
        let mut sampler = Self::new(config)?;
        info!("loaded availability traces for {} clients", traces.len());
        sampler.traces = Some(traces);
        Ok(sampler)
    }

    fn admits(&self, size: u64) -> bool {
        (self.config.filter_less..=self.config.filter_more).contains(&size)
    }

    /// Registers a participant.
    ///
    /// # Arguments
    /// * `host_id` - The host the participant reports from.
    /// * `client_id` - The participant's unique identifier.
    /// * `distance` - Statistical divergence of the participant's data.
    /// * `size` - Number of local data samples.
    /// * `speed` - Compute and communication rates.
    /// * `trace` - Availability trace, falls back to the loaded traces when `None`.
    pub fn register_client(
        &mut self,
        host_id: HostId,
        client_id: ClientId,
        distance: f64,
        size: u64,
        speed: Speed,
        trace: Option<AvailabilityTrace>,
    ) {
        let trace = trace.or_else(|| {
            self.traces
                .as_ref()
                .and_then(|traces| traces.get(client_id).cloned())
        });

        let client = Client::new(host_id, client_id, distance, size, speed, trace);
        let duration = client.completion_time(
            self.config.batch_size,
            self.config.upload_epoch,
            self.config.model_size,
        );

        if client.has_trace() {
            self.traced_clients += 1;
        }

        if let Some(prev) = self.clients.insert(client_id, client) {
            warn!(
                "client {client_id} re-registered from host {host_id}, replacing the one from host {}",
                prev.host_id()
            );
            if prev.has_trace() {
                self.traced_clients -= 1;
            }
            if self.admits(prev.size()) {
                self.feasible.retain(|&id| id != client_id);
                self.feasible_samples = self.feasible_samples.saturating_sub(prev.size());
            }
        }

        if !self.admits(size) {
            debug!("client {client_id} with {size} samples filtered out");
            return;
        }

        self.feasible.push(client_id);
        self.feasible_samples = self.feasible_samples.saturating_add(size);

        let reward = size.min(self.config.reward_cap()) as f64;
        if let Some(selector) = self.selector.as_mut() {
            selector.register_arm(client_id, reward, size, duration);
        }
    }

    /// Updates a participant's speed in place.
    pub fn register_speed(
        &mut self,
        _host_id: HostId,
        client_id: ClientId,
        speed: Speed,
    ) -> Result<()> {
        self.client_mut(client_id)?.set_speed(speed);
        Ok(())
    }

    /// Reports a participant's round outcome to the selector and the participant.
    ///
    /// # Returns
    /// `NotFound` if the participant, or in bandit mode its arm, is unknown.
    pub fn register_score(&mut self, client_id: ClientId, outcome: RoundOutcome) -> Result<()> {
        self.client(client_id)?;

        if let Some(selector) = self.selector.as_mut() {
            selector.register_reward(client_id, &outcome)?;
        }

        self.client_mut(client_id)?.register_reward(outcome.reward);
        Ok(())
    }

    /// Stores the participant's estimated completion time as its arm's duration.
    /// Does nothing outside bandit mode.
    pub fn register_duration(
        &mut self,
        client_id: ClientId,
        batch_size: u64,
        upload_epoch: u64,
        model_size: f64,
    ) -> Result<()> {
        let duration = self.completion_time(client_id, batch_size, upload_epoch, model_size)?;

        match self.selector.as_mut() {
            Some(selector) => selector.register_duration(client_id, duration),
            None => Ok(()),
        }
    }

    pub fn completion_time(
        &self,
        client_id: ClientId,
        batch_size: u64,
        upload_epoch: u64,
        model_size: f64,
    ) -> Result<f64> {
        let client = self.client(client_id)?;
        Ok(client.completion_time(batch_size, upload_epoch, model_size))
    }

    /// Returns the eligible participants that are active at `current_time`, in
    /// registration order.
    pub fn feasible_clients(&self, current_time: f64) -> Vec<ClientId> {
        if self.traced_clients == 0 {
            return self.feasible.clone();
        }

        self.feasible
            .iter()
            .copied()
            .filter(|id| self.clients.get(id).is_some_and(|c| c.is_active(current_time)))
            .collect()
    }

    /// Picks the participants for the next round.
    ///
    /// When at most `num_of_clients` are feasible, all of them are returned. Otherwise
    /// the bandit selector ranks them, except on the very first round which has no
    /// feedback yet and falls back to a seeded shuffle.
    ///
    /// # Arguments
    /// * `num_of_clients` - The maximum number of participants to select.
    /// * `current_time` - The orchestrator's clock, checked against availability traces.
    pub fn resample_clients(&mut self, num_of_clients: usize, current_time: f64) -> Vec<ClientId> {
        self.rounds += 1;

        let mut feasible = self.feasible_clients(current_time);

        if feasible.len() <= num_of_clients {
            debug!(
                "round {}: only {} feasible clients, selecting all",
                self.rounds,
                feasible.len()
            );
            return feasible;
        }

        if self.rounds > 1 {
            if let Some(selector) = self.selector.as_mut() {
                let candidates: HashSet<_> = feasible.iter().copied().collect();
                let picked = selector.top_k(num_of_clients, current_time, &candidates);
                info!(
                    "round {}: bandit picked {} of {} feasible clients",
                    self.rounds,
                    picked.len(),
                    candidates.len()
                );
                return picked;
            }
        }

        // feasible.len() > num_of_clients, so holding one candidate back never binds
        let take = num_of_clients.min(feasible.len() - 1);
        feasible.shuffle(&mut self.rng);

        info!(
            "round {}: randomly picked {take} of {} feasible clients",
            self.rounds,
            feasible.len()
        );
        feasible.truncate(take);
        feasible
    }

    /// Picks the next participant for `host_id` to run.
    ///
    /// Starts from the `host_id`-th eligible participant (hosts are numbered from 1)
    /// and jumps to random ones while the candidate fails the size filter.
    ///
    /// # Returns
    /// `Exhausted` if no eligible participant was found within the retry budget.
    pub fn next_client_id_to_run(&mut self, host_id: HostId) -> Result<ClientId> {
        let len = self.feasible.len();
        if len == 0 {
            return Err(SamplerError::Exhausted {
                host_id,
                retries: 0,
            });
        }

        let mut idx = (host_id % len + len - 1) % len;

        for _ in 0..self.config.max_retries {
            let client_id = self.feasible[idx];
            let eligible = match self.clients.get(&client_id) {
                Some(client) => self.admits(client.size()),
                None => false,
            };

            if eligible {
                return Ok(client_id);
            }

            idx = self.rng.random_range(0..len);
        }

        Err(SamplerError::Exhausted {
            host_id,
            retries: self.config.max_retries,
        })
    }

    /// Returns the share of the currently assigned training data (or of the
    /// assigned participants, if `even`) that belongs to `client_id`.
    ///
    /// # Arguments
    /// * `client_id` - The participant to compute the share for.
    /// * `_host_id` - Ignored, identities are not host scoped.
    /// * `even` - Weigh every assigned participant equally instead of by size.
    ///
    /// # Returns
    /// `DivideByZero` if nothing (or nothing with data) is assigned.
    pub fn sample_ratio(&self, client_id: ClientId, _host_id: HostId, even: bool) -> Result<f64> {
        if even {
            let total = self.hosts.total();
            if total == 0 {
                return Err(SamplerError::DivideByZero {
                    what: "even sample ratio",
                });
            }
            return Ok(1.0 / total as f64);
        }

        let mut total = 0.0;
        for id in self.hosts.iter() {
            total += self.client(id)?.size() as f64;
        }

        if total == 0.0 {
            return Err(SamplerError::DivideByZero {
                what: "sample ratio",
            });
        }

        Ok(self.client(client_id)?.size() as f64 / total)
    }

    /// Replaces the participants assigned to `host_id`.
    pub fn client_on_host(&mut self, client_ids: Vec<ClientId>, host_id: HostId) {
        self.hosts.assign(host_id, client_ids);
    }

    pub fn current_client_ids(&self, host_id: HostId) -> Result<&[ClientId]> {
        self.hosts.clients(host_id)
    }

    pub fn client_len_on_host(&self, host_id: HostId) -> Result<usize> {
        self.hosts.clients(host_id).map(<[_]>::len)
    }

    pub fn data_info(&self) -> DataInfo {
        DataInfo {
            total_feasible_clients: self.feasible.len(),
            total_feasible_samples: self.feasible_samples,
        }
    }

    /// Returns the selector's arm table, empty outside bandit mode.
    pub fn all_metrics(&self) -> BTreeMap<ClientId, ArmMetrics> {
        self.selector
            .as_ref()
            .map(UcbSelector::all_metrics)
            .unwrap_or_default()
    }

    /// Returns the participant's smoothed reward.
    ///
    /// # Returns
    /// `NotFound` outside bandit mode or if the participant has no arm.
    pub fn client_reward(&self, client_id: ClientId) -> Result<f64> {
        self.selector
            .as_ref()
            .ok_or(SamplerError::NotFound {
                what: "arm",
                id: client_id,
            })?
            .client_reward(client_id)
    }

    /// Returns the participant's last raw reward.
    pub fn score(&self, client_id: ClientId) -> Result<f64> {
        self.client(client_id).map(Client::score)
    }

    /// Maps every registered participant to its distance.
    pub fn clients_info(&self) -> BTreeMap<ClientId, f64> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.distance()))
            .collect()
    }

    pub fn is_client_active(&self, client_id: ClientId, current_time: f64) -> Result<bool> {
        self.client(client_id).map(|c| c.is_active(current_time))
    }

    /// Returns every eligible participant, in registration order.
    pub fn all_clients(&self) -> &[ClientId] {
        &self.feasible
    }

    pub fn all_clients_len(&self) -> usize {
        self.feasible.len()
    }

    pub fn client_size(&self, client_id: ClientId) -> Result<u64> {
        self.client(client_id).map(Client::size)
    }

    pub fn client(&self, client_id: ClientId) -> Result<&Client> {
        self.clients.get(&client_id).ok_or(SamplerError::NotFound {
            what: "client",
            id: client_id,
        })
    }

    fn client_mut(&mut self, client_id: ClientId) -> Result<&mut Client> {
        self.clients.get_mut(&client_id).ok_or(SamplerError::NotFound {
            what: "client",
            id: client_id,
        })
    }

    /// Number of `resample_clients` calls so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Number of rounds the bandit selector ranked, `0` outside bandit mode.
    pub fn selector_rounds(&self) -> u64 {
        self.selector.as_ref().map_or(0, UcbSelector::total_tries)
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }
}
