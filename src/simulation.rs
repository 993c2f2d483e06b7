use std::{collections::BTreeMap, fs, path::Path};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    bandit::RoundOutcome,
    configs::SamplerConfig,
    error::{Result, SamplerError},
    participant::{AvailabilityTraces, ClientId, HostId, Speed},
    sampler::ClientSampler,
};

/// A participant as described by the dataset provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSpec {
    pub host_id: HostId,
    pub client_id: ClientId,
    #[serde(default)]
    pub distance: f64,
    pub size: u64,
    #[serde(default)]
    pub speed: Speed,
}

/// A whole simulated run: sampler settings, population and round schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSpec {
    #[serde(default)]
    pub config: SamplerConfig,
    pub clients: Vec<ClientSpec>,
    pub rounds: usize,
    pub clients_per_round: usize,
    /// Clock advance between consecutive rounds.
    #[serde(default = "default_round_interval")]
    pub round_interval: f64,
    /// Optional availability trace document, relative to the working directory.
    #[serde(default)]
    pub trace_path: Option<String>,
}

fn default_round_interval() -> f64 {
    1.0
}

impl RunSpec {
    /// Loads a run description from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(content)?;
        spec.config.validate()?;

        if spec.clients_per_round == 0 {
            return Err(SamplerError::InvalidConfig(
                "clients_per_round must be greater than 0".into(),
            ));
        }

        Ok(spec)
    }
}

/// What happened in one simulated round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub round: usize,
    pub time: f64,
    pub selected: Vec<ClientId>,
    pub total_reward: f64,
}

/// Builds a sampler and registers the run's population in it.
pub fn build_sampler(spec: &RunSpec) -> Result<ClientSampler> {
    let mut sampler = match &spec.trace_path {
        Some(path) => {
            let traces = AvailabilityTraces::load(path)?;
            ClientSampler::with_traces(spec.config.clone(), traces)?
        }
        None => ClientSampler::new(spec.config.clone())?,
    };

    for client in &spec.clients {
        sampler.register_client(
            client.host_id,
            client.client_id,
            client.distance,
            client.size,
            client.speed,
            None,
        );
    }

    let info = sampler.data_info();
    info!(
        "registered {} clients, {} feasible holding {} samples",
        spec.clients.len(),
        info.total_feasible_clients,
        info.total_feasible_samples
    );

    Ok(sampler)
}

/// Drives select, dispatch and report for every round of the run.
///
/// Selected participants are assigned to their own hosts, their reward is their
/// distance weighted by their share of the round's data, and their duration is
/// the sampler's completion time estimate.
///
/// # Returns
/// One report per round, or the first error raised by the sampler.
pub fn simulate(spec: &RunSpec, sampler: &mut ClientSampler) -> Result<Vec<RoundReport>> {
    let config = sampler.config().clone();
    let mut reports = Vec::with_capacity(spec.rounds);

    for round in 0..spec.rounds {
        let time = round as f64 * spec.round_interval;
        let selected = sampler.resample_clients(spec.clients_per_round, time);

        let mut per_host: BTreeMap<HostId, Vec<ClientId>> = spec
            .clients
            .iter()
            .map(|client| (client.host_id, Vec::new()))
            .collect();
        for &client_id in &selected {
            let host_id = sampler.client(client_id)?.host_id();
            per_host.entry(host_id).or_default().push(client_id);
        }
        for (host_id, client_ids) in per_host {
            sampler.client_on_host(client_ids, host_id);
        }

        let mut total_reward = 0.0;
        for &client_id in &selected {
            let host_id = sampler.client(client_id)?.host_id();
            let ratio = sampler.sample_ratio(client_id, host_id, false)?;
            let duration = sampler.completion_time(
                client_id,
                config.batch_size,
                config.upload_epoch,
                config.model_size,
            )?;
            let reward = sampler.client(client_id)?.distance() * ratio;

            let outcome = RoundOutcome {
                reward,
                auxiliary: ratio,
                timestamp: time,
                duration,
                success: duration.is_finite(),
            };
            sampler.register_score(client_id, outcome)?;
            total_reward += reward;
            debug!("round {round}: client {client_id} reward {reward:.4} in {duration:.2}");
        }

        info!(
            "round {round} at t={time}: {} clients, total reward {total_reward:.4}",
            selected.len()
        );

        reports.push(RoundReport {
            round,
            time,
            selected,
            total_reward,
        });
    }

    Ok(reports)
}
