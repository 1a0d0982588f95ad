//! Latency-based server selection

use crate::{
    error::{AppError, Result},
    models::ServerDescriptor,
};
use std::collections::BTreeMap;

/// Picks the winning candidate from a probing round.
///
/// The running best starts at index 0 whether or not index 0 responded. A
/// candidate replaces it when its latency is positive and not greater than
/// the running best's latency, where a running best without a latency
/// counts as 0. Equal latencies therefore favour the later index, and a
/// mapping without index 0 keeps index 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerSelector;

impl ServerSelector {
    pub fn new() -> Self {
        Self
    }

    /// Winning candidate index; indices are visited in ascending order
    pub fn select_index(&self, latencies: &BTreeMap<usize, f64>) -> Result<usize> {
        if latencies.is_empty() {
            return Err(AppError::no_reachable_server("no candidate produced a latency"));
        }

        let mut best = 0usize;
        for (&index, &latency) in latencies {
            let best_latency = latencies.get(&best).copied().unwrap_or(0.0);
            if latency > 0.0 && latency <= best_latency {
                best = index;
            }
        }
        Ok(best)
    }

    /// Winning descriptor out of the candidate list the mapping was built from
    pub fn select<'a>(
        &self,
        servers: &'a [ServerDescriptor],
        latencies: &BTreeMap<usize, f64>,
    ) -> Result<&'a ServerDescriptor> {
        candidate(servers, self.select_index(latencies)?)
    }
}

/// Candidate at a selected index
pub fn candidate(servers: &[ServerDescriptor], index: usize) -> Result<&ServerDescriptor> {
    servers.get(index).ok_or_else(|| {
        AppError::internal(format!(
            "Selected index {} is outside the {} candidates",
            index,
            servers.len()
        ))
    })
}
