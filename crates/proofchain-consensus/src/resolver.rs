//! Longest-valid-chain resolution across peers.
//!
//! The resolver asks every registered peer for its chain concurrently, keeps
//! the longest candidate that is strictly longer than the local chain and
//! passes validation, and hands it to [`MiningEngine::replace_if_longer`].
//! A failing peer only removes itself from the candidate list.

use crate::block::Block;
use crate::engine::MiningEngine;
use crate::peers::{PeerAddress, PeerRegistry};
use crate::validation::ChainValidator;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default bound on a single peer fetch.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// A peer's answer to "send me your chain".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerChain {
    /// The peer's blocks, genesis first.
    pub chain: Vec<Block>,
    /// The length the peer reports.
    pub length: usize,
}

impl PeerChain {
    /// Wraps a chain, reporting its actual length.
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }
}

/// Why a peer produced no candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    /// The peer could not be reached or answered with an error status.
    #[error("peer unreachable: {0}")]
    Unreachable(String),

    /// The peer did not answer in time.
    #[error("peer did not answer within {0:?}")]
    Timeout(Duration),

    /// The peer answered with something that is not a chain.
    #[error("malformed peer response: {0}")]
    Malformed(String),
}

/// Transport used to ask a peer for its chain.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    /// Fetches the full chain of `peer`.
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<PeerChain, PeerError>;
}

/// Reconciles the local ledger with the registered peers.
#[derive(Debug, Clone)]
pub struct ConsensusResolver {
    validator: ChainValidator,
    peer_timeout: Duration,
}

impl ConsensusResolver {
    /// Creates a resolver using the default peer timeout.
    pub fn new(validator: ChainValidator) -> Self {
        Self {
            validator,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
        }
    }

    /// Sets the bound on a single peer fetch.
    pub fn with_peer_timeout(mut self, peer_timeout: Duration) -> Self {
        self.peer_timeout = peer_timeout;
        self
    }

    /// Returns the validator applied to candidates.
    pub fn validator(&self) -> &ChainValidator {
        &self.validator
    }

    /// Returns the bound on a single peer fetch.
    pub fn peer_timeout(&self) -> Duration {
        self.peer_timeout
    }

    /// Runs one resolution round. Returns true if the local chain was replaced.
    pub async fn resolve<F>(
        &self,
        engine: &MiningEngine,
        registry: &PeerRegistry,
        fetcher: &F,
    ) -> bool
    where
        F: ChainFetcher + ?Sized,
    {
        let peers = registry.members();
        if peers.is_empty() {
            return false;
        }

        let fetches = peers.iter().map(|peer| async move {
            let result = tokio::time::timeout(self.peer_timeout, fetcher.fetch_chain(peer))
                .await
                .unwrap_or(Err(PeerError::Timeout(self.peer_timeout)));
            (peer, result)
        });
        let responses = join_all(fetches).await;

        let local_length = engine.len();
        let mut best_length = local_length;
        let mut best: Option<(&PeerAddress, Vec<Block>)> = None;

        // Responses come back in address order, so the first of several
        // equally long winners is kept.
        for (peer, response) in responses {
            let candidate = match response {
                Ok(candidate) => candidate,
                Err(e) => {
                    tracing::warn!(peer = %peer, error = %e, "skipping peer");
                    continue;
                }
            };

            if candidate.length != candidate.chain.len() {
                tracing::warn!(
                    peer = %peer,
                    reported = candidate.length,
                    actual = candidate.chain.len(),
                    "skipping peer with inconsistent chain length"
                );
                continue;
            }
            if candidate.length <= best_length {
                tracing::debug!(peer = %peer, length = candidate.length, "candidate not longer");
                continue;
            }
            if let Err(violation) = self.validator.validate(&candidate.chain) {
                tracing::warn!(peer = %peer, %violation, "skipping invalid chain");
                continue;
            }

            best_length = candidate.length;
            best = Some((peer, candidate.chain));
        }

        let Some((peer, chain)) = best else {
            tracing::debug!(local_length, peers = peers.len(), "local chain is authoritative");
            return false;
        };

        let replaced = engine.replace_if_longer(chain);
        if replaced {
            tracing::info!(peer = %peer, local_length, new_length = best_length, "adopted peer chain");
        }
        replaced
    }
}
