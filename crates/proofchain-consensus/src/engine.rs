//! Shared ledger access for concurrent handlers.
//!
//! [`MiningEngine`] owns the node's [`Ledger`] behind a single lock. Proof
//! searches run on a blocking worker without holding that lock, and a chain
//! replacement cancels whatever search is in flight so the miner restarts
//! against the new tip.

use crate::block::Block;
use crate::error::{ConsensusError, Result};
use crate::ledger::Ledger;
use crate::pow::ProofOfWork;
use crate::record::Record;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Events emitted when the ledger changes.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    /// A block was mined locally.
    BlockMined {
        index: u64,
        proof: u64,
        tx_count: usize,
    },
    /// The chain was replaced by a longer one.
    ChainReplaced { old_length: usize, new_length: usize },
}

/// The ledger of one node, shared between request handlers.
pub struct MiningEngine {
    /// The ledger. Every read and write goes through this lock.
    ledger: RwLock<Ledger>,

    /// Serializes miners so two searches never race for the same tip.
    mining: tokio::sync::Mutex<()>,

    /// Token of the search currently in flight.
    search: Mutex<CancellationToken>,

    /// Event broadcaster.
    events: broadcast::Sender<LedgerEvent>,
}

impl Default for MiningEngine {
    fn default() -> Self {
        Self::new(Ledger::default())
    }
}

impl MiningEngine {
    /// Wraps an existing ledger.
    pub fn new(ledger: Ledger) -> Self {
        let (events, _) = broadcast::channel(256);

        Self {
            ledger: RwLock::new(ledger),
            mining: tokio::sync::Mutex::new(()),
            search: Mutex::new(CancellationToken::new()),
            events,
        }
    }

    /// Creates an engine with a fresh genesis block.
    pub fn with_pow(pow: ProofOfWork) -> Self {
        Self::new(Ledger::new(pow))
    }

    /// Subscribes to ledger events.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Returns the proof-of-work predicate.
    pub fn pow(&self) -> ProofOfWork {
        self.ledger.read().pow()
    }

    /// Queues a record, returning the index of the block that will hold it.
    pub fn submit(&self, record: Record) -> Result<u64> {
        self.ledger.write().submit(record)
    }

    /// Mines the pending records into a new block.
    ///
    /// `reward` is appended after the pending records. If the tip moves while
    /// the proof is being searched for, the search restarts against the new
    /// tip, so the returned block always extends the chain it was appended to.
    pub async fn mine(&self, reward: Option<Record>) -> Result<Block> {
        let _miner = self.mining.lock().await;

        loop {
            let (pow, target, token) = {
                let ledger = self.ledger.read();
                let target = ledger.next_work()?;
                // Swapped under the read lock so a replacement either precedes
                // the snapshot or cancels this token.
                let token = CancellationToken::new();
                *self.search.lock() = token.clone();
                (ledger.pow(), target, token)
            };

            // Stops the worker if this future is dropped mid-search.
            let _cancel_on_drop = token.clone().drop_guard();

            let found = tokio::task::spawn_blocking(move || {
                pow.search_cancellable(target.last_proof, &token)
            })
            .await
            .map_err(|e| ConsensusError::EngineError(e.to_string()))?;

            let proof = match found {
                Ok(proof) => proof,
                Err(ConsensusError::SearchCancelled) => {
                    tracing::debug!(index = target.next_index, "chain replaced, restarting search");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let appended = self
                .ledger
                .write()
                .append_mined(&target, proof, reward.clone());

            match appended {
                Ok(block) => {
                    let _ = self.events.send(LedgerEvent::BlockMined {
                        index: block.index,
                        proof: block.proof,
                        tx_count: block.tx_count(),
                    });
                    tracing::info!(
                        index = block.index,
                        proof = block.proof,
                        tx_count = block.tx_count(),
                        "mined block"
                    );
                    return Ok(block);
                }
                Err(ConsensusError::StaleTip) => {
                    tracing::debug!(index = target.next_index, "tip moved, restarting search");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Replaces the chain if `chain` is strictly longer than the current one.
    ///
    /// The length comparison happens under the write lock, so a chain that
    /// grew since the caller looked is never shortened. The candidate must
    /// already have been validated.
    pub fn replace_if_longer(&self, chain: Vec<Block>) -> bool {
        let mut ledger = self.ledger.write();
        let old_length = ledger.len();
        let new_length = chain.len();
        if new_length <= old_length {
            return false;
        }

        if let Err(e) = ledger.replace_chain(chain) {
            tracing::warn!(error = %e, "chain replacement rejected");
            return false;
        }
        self.search.lock().cancel();
        drop(ledger);

        let _ = self.events.send(LedgerEvent::ChainReplaced {
            old_length,
            new_length,
        });
        tracing::info!(old_length, new_length, "replaced chain");

        true
    }

    /// Returns a snapshot of the chain.
    pub fn chain(&self) -> Vec<Block> {
        self.ledger.read().chain().to_vec()
    }

    /// Returns the number of blocks.
    pub fn len(&self) -> usize {
        self.ledger.read().len()
    }

    /// Returns true if the chain holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.ledger.read().is_empty()
    }

    /// Returns a copy of the last block.
    pub fn last_block(&self) -> Result<Block> {
        self.ledger.read().last_block().cloned()
    }

    /// Returns the number of records awaiting inclusion.
    pub fn pending_len(&self) -> usize {
        self.ledger.read().pending().len()
    }
}
