//! Proofchain Consensus Core
//!
//! This crate holds everything a proofchain node agrees on with its peers:
//! the block format and its hash linking, the proof-of-work predicate, the
//! ledger with its pending record pool, structural chain validation, and
//! longest-valid-chain resolution. It has no HTTP dependency; the node crate
//! supplies the transport through [`ChainFetcher`].
//!
//! # Components
//!
//! - [`Record`]: One ledger entry (transfer, bet, or any flat field map)
//! - [`Block`]: Ordered container of records, linked by [`BlockHash`]
//! - [`ProofOfWork`]: Leading-zero SHA-256 puzzle binding a block to its predecessor
//! - [`Ledger`]: Chain plus pending pool, single owner
//! - [`MiningEngine`]: Shared ledger with off-lock proof search
//! - [`ChainValidator`]: Checks an untrusted chain without local state
//! - [`PeerRegistry`]: Normalized set of peer addresses
//! - [`ConsensusResolver`]: Adopts the longest valid peer chain
//!
//! # Hashing
//!
//! A block hash is SHA-256 over the canonical JSON form of the block: keys
//! sorted, `", "` and `": "` separators, non-ASCII escaped. See
//! [`to_canonical_json`]. Nodes that disagree on this encoding cannot share
//! a chain.
//!
//! # Mining Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   submit     │────▶│   pending    │────▶│  next_work   │
//! │  (record)    │     │    pool      │     │ (read lock)  │
//! └──────────────┘     └──────────────┘     └──────┬───────┘
//!                                                   │
//!                                                   ▼
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   append     │◀────│ proof found  │◀────│   search     │
//! │ (write lock) │     │              │     │  (no lock)   │
//! └──────┬───────┘     └──────────────┘     └──────────────┘
//!        │ StaleTip / cancelled
//!        └──────────────▶ retry against the new tip
//! ```

mod block;
mod canonical;
mod engine;
mod error;
mod ledger;
mod peers;
mod pow;
mod record;
mod resolver;
mod validation;

pub use block::{unix_timestamp, Block, BlockHash, BlockLink, Timestamp};
pub use canonical::to_canonical_json;
pub use engine::{LedgerEvent, MiningEngine};
pub use error::{ConsensusError, Result};
pub use ledger::{Ledger, MiningTarget};
pub use peers::{PeerAddress, PeerRegistry};
pub use pow::{ProofOfWork, DEFAULT_DIFFICULTY};
pub use record::{Bet, Primitive, Record, Transfer};
pub use resolver::{ChainFetcher, ConsensusResolver, PeerChain, PeerError, DEFAULT_PEER_TIMEOUT};
pub use validation::{ChainValidator, ChainViolation};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _: BlockHash;
        let _: PeerAddress;
        let _: LedgerEvent;
        let _: Timestamp;
        assert_eq!(DEFAULT_DIFFICULTY, 4);
    }
}
