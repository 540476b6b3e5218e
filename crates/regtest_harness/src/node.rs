//! A regtest node: chain, mempool and the game engine kept in sync with
//! the best tip.

use prospect_core::{
    AdminCommand, BlockHash, Character, CharacterId, DamageEvent, Engine, EngineParams, Faction,
    GameState, HexCoord, MoveData, Region,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::chain::Chain;
use crate::error::HarnessError;

#[derive(Debug, Default)]
struct Mempool {
    moves: Vec<MoveData>,
    admin: Vec<AdminCommand>,
    damage: Vec<DamageEvent>,
}

#[derive(Debug)]
pub struct RegtestNode {
    chain: Chain,
    engine: Engine,
    params: EngineParams,
    mempool: Mempool,
}

impl RegtestNode {
    pub fn new(params: EngineParams) -> Result<Self, HarnessError> {
        let chain = Chain::new();
        let engine = Engine::new(params.clone(), 0, chain.genesis_hash())?;
        Ok(Self {
            chain,
            engine,
            params,
            mempool: Mempool::default(),
        })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn state(&self) -> &GameState {
        self.engine.state()
    }

    pub fn game_state(&self) -> Value {
        self.engine.state_json()
    }

    pub fn get_best_block_hash(&self) -> BlockHash {
        self.chain.get_best_block_hash()
    }

    pub fn character_by_name(&self, name: &str) -> Option<&Character> {
        self.state().characters.iter().find(|c| c.name == name)
    }

    pub fn character_id(&self, name: &str) -> Result<CharacterId, HarnessError> {
        self.character_by_name(name)
            .map(|c| c.id)
            .ok_or_else(|| HarnessError::UnknownCharacter(name.to_owned()))
    }

    pub fn region_at(&self, pos: &HexCoord) -> Region {
        let id = self.engine.region_map().region_id(pos);
        self.state().regions.get(id)
    }

    pub fn send_move(&mut self, character: CharacterId, cmd: Value) {
        self.mempool.moves.push(MoveData { character, cmd });
    }

    pub fn admin(&mut self, cmd: AdminCommand) {
        self.mempool.admin.push(cmd);
    }

    pub fn spawn(&mut self, name: impl Into<String>, faction: Faction, position: HexCoord) {
        self.admin(AdminCommand::Spawn {
            name: name.into(),
            faction,
            position,
        });
    }

    pub fn damage(&mut self, target: CharacterId, amount: u32) {
        self.mempool.damage.push(DamageEvent { target, amount });
    }

    /// Mines `n` blocks; the first one takes everything in the mempool.
    pub fn generate(&mut self, n: usize) -> Result<Vec<BlockHash>, HarnessError> {
        let mut hashes = Vec::with_capacity(n);
        for _ in 0..n {
            let pool = std::mem::take(&mut self.mempool);
            hashes.push(self.chain.mine(pool.moves, pool.admin, pool.damage));
            self.sync()?;
        }
        Ok(hashes)
    }

    pub fn invalidate_block(&mut self, hash: &BlockHash) -> Result<(), HarnessError> {
        self.chain.invalidate_block(hash)?;
        self.sync()
    }

    pub fn reconsider_block(&mut self, hash: &BlockHash) -> Result<(), HarnessError> {
        self.chain.reconsider_block(hash)?;
        self.sync()
    }

    /// Brings the engine to the chain's best tip: rewinds to the last
    /// block both agree on, then attaches the new branch.
    fn sync(&mut self) -> Result<(), HarnessError> {
        let active = self.chain.active_chain();
        let mut fork = self.engine.height().min(active.len() as u64 - 1);
        loop {
            let agrees = self
                .engine
                .checkpoint(fork)
                .is_some_and(|s| s.best_hash == active[fork as usize]);
            if agrees || fork < self.engine.oldest_checkpoint() {
                break;
            }
            fork -= 1;
        }

        if fork < self.engine.oldest_checkpoint() || self.engine.checkpoint(fork).is_none() {
            info!(target: "regtest_harness.node", "reorg deeper than checkpoints, replaying from genesis");
            self.engine = Engine::new(self.params.clone(), 0, self.chain.genesis_hash())?;
            fork = 0;
        } else if fork < self.engine.height() {
            info!(target: "regtest_harness.node", from = self.engine.height(), to = fork, "rewinding for reorg");
        }
        if fork < self.engine.height() {
            self.engine.rewind_to(fork)?;
        }

        for hash in &active[fork as usize + 1..] {
            if let Some(block) = self.chain.get_block(hash) {
                self.engine.process_block(block)?;
            }
        }
        debug!(target: "regtest_harness.node", height = self.engine.height(), "engine synced");
        Ok(())
    }
}
