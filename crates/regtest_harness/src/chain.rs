//! In-memory regtest chain with invalidate/reconsider semantics.

use std::collections::{BTreeMap, BTreeSet};

use prospect_core::{AdminCommand, BlockData, BlockHash, DamageEvent, MoveData};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::ChainError;

#[derive(Clone, Debug)]
struct StoredBlock {
    data: BlockData,
    seen: u64,
}

#[derive(Clone, Debug)]
pub struct Chain {
    blocks: BTreeMap<BlockHash, StoredBlock>,
    invalid: BTreeSet<BlockHash>,
    genesis: BlockHash,
    tip: BlockHash,
    nonce: u64,
}

fn block_hash(parent: &BlockHash, height: u64, nonce: u64) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(parent.as_bytes());
    hasher.update(height.to_be_bytes());
    hasher.update(nonce.to_be_bytes());
    BlockHash::from_bytes(hasher.finalize().into())
}

impl Chain {
    pub fn new() -> Self {
        let genesis = block_hash(&BlockHash::default(), 0, 0);
        let mut blocks = BTreeMap::new();
        blocks.insert(
            genesis,
            StoredBlock {
                data: BlockData {
                    height: 0,
                    hash: genesis,
                    parent: BlockHash::default(),
                    moves: Vec::new(),
                    admin: Vec::new(),
                    damage: Vec::new(),
                },
                seen: 0,
            },
        );
        Self {
            blocks,
            invalid: BTreeSet::new(),
            genesis,
            tip: genesis,
            nonce: 1,
        }
    }

    pub fn genesis_hash(&self) -> BlockHash {
        self.genesis
    }

    pub fn get_best_block_hash(&self) -> BlockHash {
        self.tip
    }

    pub fn best_height(&self) -> u64 {
        self.blocks.get(&self.tip).map_or(0, |b| b.data.height)
    }

    pub fn get_block(&self, hash: &BlockHash) -> Option<&BlockData> {
        self.blocks.get(hash).map(|b| &b.data)
    }

    /// Hash of the block at `height` on the active chain.
    pub fn get_block_hash(&self, height: u64) -> Option<BlockHash> {
        self.active_chain().into_iter().nth(height as usize)
    }

    /// Hashes from genesis to the best tip.
    pub fn active_chain(&self) -> Vec<BlockHash> {
        let mut path = Vec::new();
        let mut cur = Some(self.tip);
        while let Some(hash) = cur {
            path.push(hash);
            cur = self
                .blocks
                .get(&hash)
                .filter(|b| b.data.height > 0)
                .map(|b| b.data.parent);
        }
        path.reverse();
        path
    }

    /// Mines a block on top of the best tip carrying the given data.
    pub fn mine(
        &mut self,
        moves: Vec<MoveData>,
        admin: Vec<AdminCommand>,
        damage: Vec<DamageEvent>,
    ) -> BlockHash {
        let parent = self.tip;
        let height = self.best_height() + 1;
        let hash = block_hash(&parent, height, self.nonce);
        let seen = self.nonce;
        self.nonce += 1;
        self.blocks.insert(
            hash,
            StoredBlock {
                data: BlockData {
                    height,
                    hash,
                    parent,
                    moves,
                    admin,
                    damage,
                },
                seen,
            },
        );
        self.tip = hash;
        debug!(target: "regtest_harness.chain", height, %hash, "mined block");
        hash
    }

    fn ancestors(&self, hash: &BlockHash) -> Vec<BlockHash> {
        let mut out = Vec::new();
        let mut cur = self.blocks.get(hash);
        while let Some(block) = cur {
            out.push(block.data.hash);
            if block.data.height == 0 {
                break;
            }
            cur = self.blocks.get(&block.data.parent);
        }
        out
    }

    fn is_descendant_of(&self, hash: &BlockHash, ancestor: &BlockHash) -> bool {
        self.ancestors(hash).contains(ancestor)
    }

    fn is_valid(&self, hash: &BlockHash) -> bool {
        self.ancestors(hash).iter().all(|h| !self.invalid.contains(h))
    }

    pub fn invalidate_block(&mut self, hash: &BlockHash) -> Result<(), ChainError> {
        if !self.blocks.contains_key(hash) {
            return Err(ChainError::UnknownBlock(*hash));
        }
        if *hash == self.genesis {
            return Err(ChainError::GenesisInvalidation);
        }
        self.invalid.insert(*hash);
        info!(target: "regtest_harness.chain", %hash, "block invalidated");
        self.select_tip();
        Ok(())
    }

    /// Clears the invalid mark from the block, its ancestors and its
    /// descendants.
    pub fn reconsider_block(&mut self, hash: &BlockHash) -> Result<(), ChainError> {
        if !self.blocks.contains_key(hash) {
            return Err(ChainError::UnknownBlock(*hash));
        }
        let ancestors: BTreeSet<BlockHash> = self.ancestors(hash).into_iter().collect();
        let cleared: Vec<BlockHash> = self
            .invalid
            .iter()
            .filter(|h| ancestors.contains(*h) || self.is_descendant_of(h, hash))
            .copied()
            .collect();
        for h in cleared {
            self.invalid.remove(&h);
        }
        info!(target: "regtest_harness.chain", %hash, "block reconsidered");
        self.select_tip();
        Ok(())
    }

    /// Picks the highest valid block. On equal height the current tip
    /// stays, otherwise the block seen first wins.
    fn select_tip(&mut self) {
        let mut best: Option<&StoredBlock> = None;
        for block in self.blocks.values() {
            if !self.is_valid(&block.data.hash) {
                continue;
            }
            let better = match best {
                None => true,
                Some(cur) => {
                    let (h, ch) = (block.data.height, cur.data.height);
                    h > ch
                        || (h == ch
                            && cur.data.hash != self.tip
                            && (block.data.hash == self.tip || block.seen < cur.seen))
                }
            };
            if better {
                best = Some(block);
            }
        }
        let tip = best.map_or(self.genesis, |b| b.data.hash);
        if tip != self.tip {
            info!(target: "regtest_harness.chain", old = %self.tip, new = %tip, "best tip changed");
            self.tip = tip;
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mine_empty(chain: &mut Chain, n: usize) -> Vec<BlockHash> {
        (0..n)
            .map(|_| chain.mine(Vec::new(), Vec::new(), Vec::new()))
            .collect()
    }

    #[test]
    fn mining_extends_the_tip() {
        let mut chain = Chain::new();
        let hashes = mine_empty(&mut chain, 3);
        assert_eq!(chain.best_height(), 3);
        assert_eq!(chain.get_best_block_hash(), hashes[2]);
        assert_eq!(chain.get_block_hash(1), Some(hashes[0]));
        assert_eq!(chain.active_chain().len(), 4);
    }

    #[test]
    fn invalidate_and_reconsider_switch_branches() {
        let mut chain = Chain::new();
        let main = mine_empty(&mut chain, 4);

        chain.invalidate_block(&main[1]).unwrap();
        assert_eq!(chain.get_best_block_hash(), main[0]);
        let fork = mine_empty(&mut chain, 2);
        assert_eq!(chain.best_height(), 3);

        chain.reconsider_block(&main[1]).unwrap();
        assert_eq!(chain.get_best_block_hash(), main[3]);
        assert_eq!(chain.get_block_hash(2), Some(main[1]));
        assert!(chain.get_block(&fork[1]).is_some());
    }

    #[test]
    fn equal_height_keeps_current_tip() {
        let mut chain = Chain::new();
        let main = mine_empty(&mut chain, 2);
        chain.invalidate_block(&main[0]).unwrap();
        let fork = mine_empty(&mut chain, 2);
        chain.reconsider_block(&main[0]).unwrap();
        assert_eq!(chain.get_best_block_hash(), fork[1]);
    }

    #[test]
    fn genesis_and_unknown_blocks_are_rejected() {
        let mut chain = Chain::new();
        let genesis = chain.genesis_hash();
        assert!(matches!(
            chain.invalidate_block(&genesis),
            Err(ChainError::GenesisInvalidation)
        ));
        let unknown = BlockHash::from_bytes([5; 32]);
        assert!(matches!(
            chain.reconsider_block(&unknown),
            Err(ChainError::UnknownBlock(_))
        ));
    }
}
