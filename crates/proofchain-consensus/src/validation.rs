//! Structural validation of untrusted chains.
//!
//! The validator looks only at the candidate it is given: hash links and
//! proofs between adjacent blocks, plus index contiguity and the genesis
//! sentinel in strict mode. It never consults a local ledger.

use crate::block::{Block, BlockLink};
use crate::pow::ProofOfWork;
use thiserror::Error;

/// The first rule a candidate chain breaks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    /// `previous_hash` does not match the hash of the block before it.
    #[error("block at position {position} does not link to its predecessor")]
    BrokenLink {
        /// Zero-based position of the offending block.
        position: usize,
    },

    /// The proof is not valid after the previous block's proof.
    #[error("block at position {position} carries invalid proof {proof} after {last_proof}")]
    InvalidProof {
        /// Zero-based position of the offending block.
        position: usize,
        /// Proof of the previous block.
        last_proof: u64,
        /// Rejected proof.
        proof: u64,
    },

    /// The block index is not its one-based position.
    #[error("block at position {position} has index {found}, expected {expected}")]
    IndexMismatch {
        /// Zero-based position of the offending block.
        position: usize,
        /// Expected one-based index.
        expected: u64,
        /// Index carried by the block.
        found: u64,
    },

    /// The first block does not carry the genesis sentinel.
    #[error("first block does not link to the genesis sentinel")]
    GenesisLinkMissing,
}

/// Validates candidate chains against the proof-of-work rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainValidator {
    pow: ProofOfWork,
    strict_index: bool,
}

impl Default for ChainValidator {
    fn default() -> Self {
        Self::new(ProofOfWork::default())
    }
}

impl ChainValidator {
    /// Creates a strict validator.
    pub fn new(pow: ProofOfWork) -> Self {
        Self {
            pow,
            strict_index: true,
        }
    }

    /// Creates a validator that checks only hash links and proofs.
    pub fn loose(pow: ProofOfWork) -> Self {
        Self {
            pow,
            strict_index: false,
        }
    }

    /// Sets whether indices and the genesis sentinel are checked.
    pub fn with_strict_index(mut self, strict_index: bool) -> Self {
        self.strict_index = strict_index;
        self
    }

    /// Returns true if indices and the genesis sentinel are checked.
    pub fn is_strict(&self) -> bool {
        self.strict_index
    }

    /// Returns true if `chain` passes every check.
    pub fn is_valid(&self, chain: &[Block]) -> bool {
        self.validate(chain).is_ok()
    }

    /// Checks `chain`, reporting the first violation.
    ///
    /// Empty and single-block chains are trivially linked.
    pub fn validate(&self, chain: &[Block]) -> Result<(), ChainViolation> {
        if self.strict_index {
            if let Some(first) = chain.first() {
                if first.previous_hash != BlockLink::Genesis {
                    return Err(ChainViolation::GenesisLinkMissing);
                }
            }
            for (position, block) in chain.iter().enumerate() {
                let expected = position as u64 + 1;
                if block.index != expected {
                    return Err(ChainViolation::IndexMismatch {
                        position,
                        expected,
                        found: block.index,
                    });
                }
            }
        }

        for (position, pair) in chain.windows(2).enumerate() {
            let (last, block) = (&pair[0], &pair[1]);
            let position = position + 1;

            if block.previous_hash != BlockLink::Hash(last.hash()) {
                return Err(ChainViolation::BrokenLink { position });
            }
            if !self.pow.valid(last.proof, block.proof) {
                return Err(ChainViolation::InvalidProof {
                    position,
                    last_proof: last.proof,
                    proof: block.proof,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Timestamp;
    use crate::ledger::Ledger;
    use crate::record::{Primitive, Record};
    use proptest::prelude::*;

    fn pow() -> ProofOfWork {
        ProofOfWork::new(2)
    }

    fn mined_chain(blocks: usize, seed: &str) -> Vec<Block> {
        let mut ledger = Ledger::with_genesis(pow(), Block::genesis(1700000000.0));
        for i in 1..blocks {
            ledger
                .submit(Record::transfer(seed, format!("recipient-{i}"), i as i64))
                .unwrap();
            ledger.mine().unwrap();
        }
        ledger.chain().to_vec()
    }

    #[test]
    fn test_trivial_chains_valid() {
        let validator = ChainValidator::new(pow());

        assert!(validator.is_valid(&[]));
        assert!(validator.is_valid(&[Block::genesis(1.0)]));
    }

    #[test]
    fn test_mined_chain_valid() {
        let chain = mined_chain(5, "alice");

        assert!(ChainValidator::new(pow()).is_valid(&chain));
        assert!(ChainValidator::loose(pow()).is_valid(&chain));
    }

    #[test]
    fn test_independent_chains_both_valid() {
        // Same genesis, different histories: validation alone picks neither.
        let a = mined_chain(3, "alice");
        let b = mined_chain(3, "bob");
        let validator = ChainValidator::new(pow());

        assert_eq!(a[0], b[0]);
        assert_ne!(a[2], b[2]);
        assert!(validator.is_valid(&a));
        assert!(validator.is_valid(&b));
    }

    #[test]
    fn test_integer_timestamps_from_peer_validate() {
        let genesis: Block = serde_json::from_str(
            r#"{"index": 1, "previous_hash": 1, "proof": 100, "timestamp": 1700000000, "transactions": []}"#,
        )
        .unwrap();
        let next = Block::new(
            2,
            1700000060i64,
            vec![Record::transfer("a", "b", 1)],
            pow().search(genesis.proof).unwrap(),
            BlockLink::Hash(genesis.hash()),
        );
        let json = serde_json::to_string(&vec![genesis, next]).unwrap();

        let chain: Vec<Block> = serde_json::from_str(&json).unwrap();

        assert_eq!(chain[1].timestamp, Timestamp::Seconds(1700000060));
        assert_eq!(ChainValidator::new(pow()).validate(&chain), Ok(()));
    }

    #[test]
    fn test_broken_link_detected() {
        let mut chain = mined_chain(3, "alice");
        chain[1].transactions.push(Record::transfer("mallory", "mallory", 1000));

        assert_eq!(
            ChainValidator::new(pow()).validate(&chain),
            Err(ChainViolation::BrokenLink { position: 2 })
        );
    }

    #[test]
    fn test_invalid_proof_detected() {
        let mut chain = mined_chain(2, "alice");
        let last_proof = chain[0].proof;
        chain[1].proof = (0..).find(|p| !pow().valid(last_proof, *p)).unwrap();

        assert!(matches!(
            ChainValidator::new(pow()).validate(&chain),
            Err(ChainViolation::InvalidProof { position: 1, .. })
        ));
    }

    #[test]
    fn test_index_checked_only_when_strict() {
        let mut chain = mined_chain(1, "alice");
        chain[0].index = 7;

        assert_eq!(
            ChainValidator::new(pow()).validate(&chain),
            Err(ChainViolation::IndexMismatch {
                position: 0,
                expected: 1,
                found: 7
            })
        );
        assert!(ChainValidator::loose(pow()).is_valid(&chain));
    }

    #[test]
    fn test_genesis_sentinel_checked_only_when_strict() {
        let mut chain = mined_chain(3, "alice");
        chain.remove(0);

        let strict = ChainValidator::new(pow());
        assert_eq!(strict.validate(&chain), Err(ChainViolation::GenesisLinkMissing));
        assert!(ChainValidator::loose(pow()).is_valid(&chain));
    }

    #[derive(Debug, Clone)]
    enum Tamper {
        Timestamp,
        Proof,
        PreviousHash,
        Record,
    }

    fn tamper_strategy() -> impl Strategy<Value = Tamper> {
        prop_oneof![
            Just(Tamper::Timestamp),
            Just(Tamper::Proof),
            Just(Tamper::PreviousHash),
            Just(Tamper::Record),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: mutating any field of a block with a successor invalidates the chain.
        #[test]
        fn prop_tampering_detected(
            position in 1usize..3,
            tamper in tamper_strategy(),
        ) {
            let mut chain = mined_chain(4, "alice");
            let validator = ChainValidator::loose(pow());
            prop_assert!(validator.is_valid(&chain));

            let block = &mut chain[position];
            match tamper {
                Tamper::Timestamp => {
                    block.timestamp = Timestamp::from(block.timestamp.as_secs_f64() + 0.5);
                }
                Tamper::Proof => block.proof = block.proof.wrapping_add(1),
                Tamper::PreviousHash => {
                    block.previous_hash = BlockLink::Hash(crate::BlockHash::digest(b"forged"));
                }
                Tamper::Record => {
                    if let Record::Transfer(transfer) = &mut block.transactions[0] {
                        transfer.amount = Primitive::Integer(1_000_000);
                    }
                }
            }

            prop_assert!(!validator.is_valid(&chain));
        }
    }
}
