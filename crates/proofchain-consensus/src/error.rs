//! Consensus error types.

use thiserror::Error;

/// Errors that can occur during ledger and consensus operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    /// The ledger holds no blocks.
    ///
    /// Construction always seeds the genesis block, so this only surfaces
    /// when an empty replacement chain is offered.
    #[error("ledger chain is empty")]
    EmptyChain,

    /// A peer address could not be parsed.
    #[error("invalid peer address: {0}")]
    InvalidAddress(String),

    /// The chain tip moved while a proof was being searched for.
    #[error("chain tip changed during proof search")]
    StaleTip,

    /// The proof does not satisfy the proof-of-work predicate.
    #[error("proof {proof} is not valid after {last_proof}")]
    InvalidProof {
        /// Proof of the previous block.
        last_proof: u64,
        /// Rejected proof.
        proof: u64,
    },

    /// The last block's index leaves no room for a successor.
    #[error("block index {0} has no successor")]
    IndexOverflow(u64),

    /// The proof search was cancelled before a proof was found.
    #[error("proof search cancelled")]
    SearchCancelled,

    /// Every 64-bit proof was tried without success.
    #[error("no proof exists below u64::MAX for last proof {0}")]
    ProofSpaceExhausted(u64),

    /// Internal engine error.
    #[error("engine error: {0}")]
    EngineError(String),
}

/// A specialized Result type for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;
