//! The block sequence and pending record pool of one node.
//!
//! [`Ledger`] is plain single-owner state. Shared access from request
//! handlers and the resolver goes through [`crate::MiningEngine`], which keeps
//! the ledger behind one lock and runs the proof search outside it.

use crate::block::{unix_timestamp, Block, BlockHash, BlockLink};
use crate::error::{ConsensusError, Result};
use crate::pow::ProofOfWork;
use crate::record::Record;

/// What a miner needs to search for the next proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningTarget {
    /// Proof of the current last block.
    pub last_proof: u64,
    /// Hash of the current last block.
    pub tip_hash: BlockHash,
    /// Index the mined block will take.
    pub next_index: u64,
}

/// An append-only chain of blocks plus the records waiting for the next one.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Proof-of-work predicate used for mining.
    pow: ProofOfWork,

    /// Blocks, genesis first. Never empty.
    chain: Vec<Block>,

    /// Records awaiting inclusion, in submission order.
    pending: Vec<Record>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(ProofOfWork::default())
    }
}

impl Ledger {
    /// Creates a ledger holding a freshly timestamped genesis block.
    pub fn new(pow: ProofOfWork) -> Self {
        Self::with_genesis(pow, Block::genesis(unix_timestamp()))
    }

    /// Creates a ledger starting from the given genesis block.
    pub fn with_genesis(pow: ProofOfWork, genesis: Block) -> Self {
        Self {
            pow,
            chain: vec![genesis],
            pending: Vec::new(),
        }
    }

    /// Returns the proof-of-work predicate.
    pub fn pow(&self) -> ProofOfWork {
        self.pow
    }

    /// Returns the blocks, genesis first.
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Returns the number of blocks.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns true if the chain holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Returns the records awaiting inclusion.
    pub fn pending(&self) -> &[Record] {
        &self.pending
    }

    /// Returns the last block.
    pub fn last_block(&self) -> Result<&Block> {
        self.chain.last().ok_or(ConsensusError::EmptyChain)
    }

    /// Adds a record to the pending pool.
    ///
    /// Returns the index of the block the record will be mined into.
    pub fn submit(&mut self, record: Record) -> Result<u64> {
        let last_index = self.last_block()?.index;
        let next_index = last_index
            .checked_add(1)
            .ok_or(ConsensusError::IndexOverflow(last_index))?;
        tracing::trace!(kind = record.kind(), next_index, "record queued");
        self.pending.push(record);
        Ok(next_index)
    }

    /// Returns the target the next proof must be searched against.
    pub fn next_work(&self) -> Result<MiningTarget> {
        let last = self.last_block()?;
        Ok(MiningTarget {
            last_proof: last.proof,
            tip_hash: last.hash(),
            next_index: self.chain.len() as u64 + 1,
        })
    }

    /// Appends a block for a proof found against `target`.
    ///
    /// The block takes every pending record, followed by `reward` if given.
    /// Fails with [`ConsensusError::StaleTip`] when the last block is no longer
    /// the one the proof was searched against.
    pub fn append_mined(
        &mut self,
        target: &MiningTarget,
        proof: u64,
        reward: Option<Record>,
    ) -> Result<Block> {
        let tip_hash = self.last_block()?.hash();
        if tip_hash != target.tip_hash {
            return Err(ConsensusError::StaleTip);
        }
        if !self.pow.valid(target.last_proof, proof) {
            return Err(ConsensusError::InvalidProof {
                last_proof: target.last_proof,
                proof,
            });
        }

        let mut transactions = std::mem::take(&mut self.pending);
        transactions.extend(reward);

        let block = Block::new(
            self.chain.len() as u64 + 1,
            unix_timestamp(),
            transactions,
            proof,
            BlockLink::Hash(tip_hash),
        );
        self.chain.push(block.clone());

        tracing::debug!(
            index = block.index,
            proof,
            tx_count = block.tx_count(),
            "block appended"
        );

        Ok(block)
    }

    /// Searches for the next proof and appends the resulting block.
    pub fn mine(&mut self) -> Result<Block> {
        self.mine_with_reward(None)
    }

    /// Like [`Ledger::mine`], appending `reward` after the pending records.
    pub fn mine_with_reward(&mut self, reward: Option<Record>) -> Result<Block> {
        let target = self.next_work()?;
        let proof = self.pow.search(target.last_proof)?;
        self.append_mined(&target, proof, reward)
    }

    /// Replaces the whole chain. The pending pool is kept.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<()> {
        if chain.is_empty() {
            return Err(ConsensusError::EmptyChain);
        }
        self.chain = chain;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_ledger() -> Ledger {
        Ledger::with_genesis(ProofOfWork::new(2), Block::genesis(1700000000.0))
    }

    #[test]
    fn test_new_ledger_has_genesis() {
        let ledger = Ledger::default();

        assert_eq!(ledger.len(), 1);
        let genesis = ledger.last_block().unwrap();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, Block::GENESIS_PROOF);
        assert!(genesis.previous_hash.is_genesis());
        assert!(genesis.transactions.is_empty());
    }

    #[test]
    fn test_submit_then_mine() {
        let mut ledger = Ledger::with_genesis(ProofOfWork::default(), Block::genesis(1700000000.0));
        let genesis_hash = ledger.last_block().unwrap().hash();

        let index = ledger.submit(Record::transfer("a", "b", 5)).unwrap();
        assert_eq!(index, 2);
        assert_eq!(ledger.pending().len(), 1);

        let block = ledger.mine().unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(block.index, 2);
        assert_eq!(block.proof, 35293);
        assert_eq!(block.previous_hash, BlockLink::Hash(genesis_hash));
        assert_eq!(block.transactions, vec![Record::transfer("a", "b", 5)]);
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn test_reward_appended_last() {
        let mut ledger = fast_ledger();
        ledger.submit(Record::transfer("a", "b", 5)).unwrap();

        let block = ledger
            .mine_with_reward(Some(Record::mining_reward("node")))
            .unwrap();

        assert_eq!(block.tx_count(), 2);
        assert_eq!(block.transactions[1], Record::mining_reward("node"));
    }

    #[test]
    fn test_append_rejects_stale_tip() {
        let mut ledger = fast_ledger();
        let target = ledger.next_work().unwrap();
        let proof = ledger.pow().search(target.last_proof).unwrap();

        ledger.mine().unwrap();

        assert_eq!(
            ledger.append_mined(&target, proof, None),
            Err(ConsensusError::StaleTip)
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_append_rejects_invalid_proof() {
        let mut ledger = fast_ledger();
        ledger.submit(Record::transfer("a", "b", 5)).unwrap();
        let target = ledger.next_work().unwrap();

        let result = ledger.append_mined(&target, 0, None);

        assert!(matches!(result, Err(ConsensusError::InvalidProof { .. })));
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn test_replace_chain() {
        let mut ledger = fast_ledger();
        ledger.submit(Record::transfer("a", "b", 5)).unwrap();

        let mut other = fast_ledger();
        other.mine().unwrap();
        other.mine().unwrap();

        ledger.replace_chain(other.chain().to_vec()).unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.pending().len(), 1);

        assert_eq!(ledger.replace_chain(Vec::new()), Err(ConsensusError::EmptyChain));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_empty_ledger_reports_empty_chain() {
        let mut ledger = fast_ledger();
        ledger.chain.clear();

        assert_eq!(ledger.last_block().err(), Some(ConsensusError::EmptyChain));
        assert_eq!(
            ledger.submit(Record::transfer("a", "b", 1)),
            Err(ConsensusError::EmptyChain)
        );
    }

    #[test]
    fn test_submit_rejects_exhausted_index() {
        let mut ledger = fast_ledger();
        let genesis = ledger.last_block().unwrap().clone();
        let tip = Block::new(
            u64::MAX,
            1700000001.0,
            Vec::new(),
            ledger.pow().search(genesis.proof).unwrap(),
            BlockLink::Hash(genesis.hash()),
        );
        ledger.replace_chain(vec![genesis, tip]).unwrap();

        assert_eq!(
            ledger.submit(Record::transfer("a", "b", 1)),
            Err(ConsensusError::IndexOverflow(u64::MAX))
        );
        assert!(ledger.pending().is_empty());
    }
}
