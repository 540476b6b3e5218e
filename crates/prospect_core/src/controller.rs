//! Block advancement. Each confirmed block is applied in a fixed phase
//! order, and the state after every block is kept as a checkpoint so a
//! reorg can rewind and replay.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::block::{AdminCommand, BlockData, BlockHash};
use crate::character::CharacterId;
use crate::command::{parse_update, Command};
use crate::error::EngineError;
use crate::movement;
use crate::params::EngineParams;
use crate::prospecting::{self, BlockContext};
use crate::region::RegionMap;
use crate::state::GameState;

#[derive(Debug)]
pub struct Engine {
    params: EngineParams,
    map: RegionMap,
    state: GameState,
    checkpoints: BTreeMap<u64, GameState>,
}

impl Engine {
    pub fn new(params: EngineParams, genesis_height: u64, genesis_hash: BlockHash) -> Result<Self, EngineError> {
        params.validate()?;
        let state = GameState::genesis(genesis_height, genesis_hash);
        let mut checkpoints = BTreeMap::new();
        checkpoints.insert(genesis_height, state.clone());
        Ok(Self {
            map: RegionMap::new(params.region_size),
            params,
            state,
            checkpoints,
        })
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn region_map(&self) -> RegionMap {
        self.map
    }

    pub fn height(&self) -> u64 {
        self.state.height
    }

    pub fn best_hash(&self) -> BlockHash {
        self.state.best_hash
    }

    pub fn oldest_checkpoint(&self) -> u64 {
        self.checkpoints
            .keys()
            .next()
            .copied()
            .unwrap_or(self.state.height)
    }

    pub fn state_json(&self) -> serde_json::Value {
        self.state.to_json(&self.params)
    }

    /// Applies one block on top of the current state. The block is
    /// processed on a copy, so the state is either fully advanced or, on
    /// error, untouched.
    pub fn process_block(&mut self, block: &BlockData) -> Result<(), EngineError> {
        if block.height != self.state.height + 1 {
            return Err(EngineError::HeightMismatch {
                current: self.state.height,
                got: block.height,
            });
        }
        if block.parent != self.state.best_hash {
            return Err(EngineError::ParentMismatch {
                hash: block.hash,
                best: self.state.best_hash,
            });
        }

        let mut next = self.state.clone();
        let ctx = BlockContext {
            height: block.height,
            hash: &block.hash,
            params: &self.params,
            map: self.map,
        };
        update_state(&mut next, &ctx, block);
        next.height = block.height;
        next.best_hash = block.hash;

        info!(
            target: "prospect_core.controller",
            height = block.height,
            hash = %block.hash,
            moves = block.moves.len(),
            "block attached"
        );
        self.checkpoints.insert(block.height, next.clone());
        while self.checkpoints.len() > self.params.checkpoint_depth {
            self.checkpoints.pop_first();
        }
        self.state = next;
        Ok(())
    }

    /// Restores the state as of `height`, dropping all later checkpoints.
    pub fn rewind_to(&mut self, height: u64) -> Result<(), EngineError> {
        if height > self.state.height {
            return Err(EngineError::RewindAhead {
                current: self.state.height,
                target: height,
            });
        }
        let Some(snapshot) = self.checkpoints.get(&height).cloned() else {
            return Err(EngineError::RollbackTooDeep {
                target: height,
                oldest: self.oldest_checkpoint(),
            });
        };
        self.checkpoints.retain(|h, _| *h <= height);
        info!(target: "prospect_core.controller", from = self.state.height, to = height, "rewound state");
        self.state = snapshot;
        Ok(())
    }

    pub fn checkpoint(&self, height: u64) -> Option<&GameState> {
        self.checkpoints.get(&height)
    }
}

/// The phase order below is part of the consensus rules.
pub fn update_state(state: &mut GameState, ctx: &BlockContext<'_>, block: &BlockData) {
    apply_admin(state, ctx, &block.admin);
    movement::process_all(&mut state.characters, ctx.params.movement_speed);
    process_kills(state, block);
    process_moves(state, ctx, block);
    let due = state.characters.tick_all(ctx.height);
    for id in due {
        prospecting::finish_prospecting(state, ctx, id);
    }
}

fn apply_admin(state: &mut GameState, ctx: &BlockContext<'_>, admin: &[AdminCommand]) {
    for cmd in admin {
        match cmd {
            AdminCommand::Spawn {
                name,
                faction,
                position,
            } => {
                state
                    .characters
                    .create(name.clone(), *faction, *position, ctx.params.starting_hp);
            }
            AdminCommand::Teleport {
                character,
                position,
            } => match state.characters.get_mut(*character) {
                Some(c) if !c.is_busy() => {
                    c.position = *position;
                    c.stop();
                }
                Some(_) => warn!(target: "prospect_core.controller", id = %character, "ignoring teleport of busy character"),
                None => warn!(target: "prospect_core.controller", id = %character, "ignoring teleport of unknown character"),
            },
            AdminCommand::SetHp { character, hp } => match state.characters.get_mut(*character) {
                Some(c) => c.hp = *hp,
                None => warn!(target: "prospect_core.controller", id = %character, "ignoring sethp of unknown character"),
            },
        }
    }
}

fn process_kills(state: &mut GameState, block: &BlockData) {
    for dmg in &block.damage {
        if let Some(c) = state.characters.get_mut(dmg.target) {
            c.hp = c.hp.saturating_sub(dmg.amount);
        }
    }

    let dead: Vec<CharacterId> = state
        .characters
        .iter()
        .filter(|c| c.hp == 0)
        .map(|c| c.id)
        .collect();
    for id in dead {
        prospecting::cancel_prospecting(state, id);
        state.characters.remove(id);
        info!(target: "prospect_core.controller", id = %id, "character killed");
    }
}

fn process_moves(state: &mut GameState, ctx: &BlockContext<'_>, block: &BlockData) {
    for mv in &block.moves {
        if state.characters.get(mv.character).is_none() {
            debug!(target: "prospect_core.controller", id = %mv.character, "move for unknown character");
            continue;
        }
        for cmd in parse_update(&mv.cmd) {
            match cmd {
                Command::Prospect => {
                    prospecting::start_prospecting(state, ctx, mv.character);
                }
                Command::SetWaypoints(wp) => {
                    if let Some(c) = state.characters.get_mut(mv.character) {
                        movement::set_waypoints(c, wp);
                    }
                }
            }
        }
    }
}
