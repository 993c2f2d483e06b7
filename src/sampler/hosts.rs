use std::collections::BTreeMap;

use crate::{
    error::{Result, SamplerError},
    participant::{ClientId, HostId},
};

/// Which participants each host is currently running.
#[derive(Debug, Default, Clone)]
pub struct HostAssignment {
    hosts: BTreeMap<HostId, Vec<ClientId>>,
}

impl HostAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the participants assigned to `host_id`.
    pub fn assign(&mut self, host_id: HostId, client_ids: Vec<ClientId>) {
        self.hosts.insert(host_id, client_ids);
    }

    pub fn clients(&self, host_id: HostId) -> Result<&[ClientId]> {
        self.hosts
            .get(&host_id)
            .map(Vec::as_slice)
            .ok_or(SamplerError::UnknownHost(host_id))
    }

    /// Iterates over every assigned participant across all hosts.
    pub fn iter(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.hosts.values().flatten().copied()
    }

    /// Total number of assignments across all hosts.
    pub fn total(&self) -> usize {
        self.hosts.values().map(Vec::len).sum()
    }
}
