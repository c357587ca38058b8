//! Proof-of-work predicate and search.
//!
//! A proof `p` is valid after `last` when SHA-256 of the decimal strings of
//! `last` and `p` concatenated (no separator) starts with `difficulty` hex
//! zeros. The search is a plain scan upward from zero, so the proof it
//! returns is always the smallest valid one.

use crate::error::{ConsensusError, Result};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

/// Leading hex zeros required by default.
pub const DEFAULT_DIFFICULTY: u8 = 4;

/// Cancellation is polled once per this many candidates.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// The proof-of-work predicate at a fixed difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: u8,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    /// Creates a predicate requiring `difficulty` leading hex zeros (1..=64).
    pub fn new(difficulty: u8) -> Self {
        Self {
            difficulty: difficulty.clamp(1, 64),
        }
    }

    /// Returns the number of leading hex zeros required.
    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    /// Returns true if `proof` is a valid successor of `last_proof`.
    pub fn valid(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{last_proof}{proof}");
        let digest = Sha256::digest(guess.as_bytes());

        (0..usize::from(self.difficulty)).all(|nibble| {
            let byte = digest[nibble / 2];
            let value = if nibble % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            value == 0
        })
    }

    /// Finds the smallest proof valid after `last_proof`.
    pub fn search(&self, last_proof: u64) -> Result<u64> {
        (0..=u64::MAX)
            .find(|proof| self.valid(last_proof, *proof))
            .ok_or(ConsensusError::ProofSpaceExhausted(last_proof))
    }

    /// Like [`ProofOfWork::search`], giving up once `cancel` fires.
    pub fn search_cancellable(&self, last_proof: u64, cancel: &CancellationToken) -> Result<u64> {
        for proof in 0..=u64::MAX {
            if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                tracing::debug!(last_proof, tried = proof, "proof search cancelled");
                return Err(ConsensusError::SearchCancelled);
            }
            if self.valid(last_proof, proof) {
                return Ok(proof);
            }
        }
        Err(ConsensusError::ProofSpaceExhausted(last_proof))
    }
}
