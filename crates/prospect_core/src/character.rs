//! Characters and their busy state.
//!
//! A character is either moving along waypoints, busy with a timed
//! operation, or idle. Starting an operation cancels movement, and the
//! operation tracker below is the only place that sets or clears `busy`.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::coord::HexCoord;
use crate::error::BusyError;
use crate::region::RegionId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub u64);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    #[serde(rename = "r")]
    Red,
    #[serde(rename = "g")]
    Green,
    #[serde(rename = "b")]
    Blue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Prospecting,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyState {
    pub operation: Operation,
    pub blocks_remaining: u32,
    pub region: Option<RegionId>,
    /// Height of the block that started the operation; it is not ticked
    /// in that block.
    pub started_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub faction: Faction,
    pub position: HexCoord,
    pub hp: u32,
    pub waypoints: VecDeque<HexCoord>,
    pub busy: Option<BusyState>,
}

impl Character {
    pub fn is_moving(&self) -> bool {
        !self.waypoints.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn stop(&mut self) {
        self.waypoints.clear();
    }
}

/// All living characters, keyed and iterated in id order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterTable {
    characters: BTreeMap<CharacterId, Character>,
    next_id: u64,
}

impl CharacterTable {
    pub fn create(
        &mut self,
        name: impl Into<String>,
        faction: Faction,
        position: HexCoord,
        hp: u32,
    ) -> CharacterId {
        self.next_id += 1;
        let id = CharacterId(self.next_id);
        let name = name.into();
        info!(target: "prospect_core.character", id = %id, name = %name, ?faction, %position, "character created");
        self.characters.insert(
            id,
            Character {
                id,
                name,
                faction,
                position,
                hp,
                waypoints: VecDeque::new(),
                busy: None,
            },
        );
        id
    }

    pub fn get(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn get_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn remove(&mut self, id: CharacterId) -> Option<Character> {
        self.characters.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Character> {
        self.characters.values_mut()
    }

    pub fn ids(&self) -> Vec<CharacterId> {
        self.characters.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn start_operation(
        &mut self,
        id: CharacterId,
        operation: Operation,
        duration: u32,
        region: Option<RegionId>,
        height: u64,
    ) -> Result<(), BusyError> {
        if duration == 0 {
            return Err(BusyError::ZeroDuration);
        }
        let c = self
            .characters
            .get_mut(&id)
            .ok_or(BusyError::UnknownCharacter(id))?;
        if c.is_busy() {
            return Err(BusyError::AlreadyBusy(id));
        }
        c.stop();
        c.busy = Some(BusyState {
            operation,
            blocks_remaining: duration,
            region,
            started_at: height,
        });
        debug!(target: "prospect_core.character", id = %id, ?operation, duration, "operation started");
        Ok(())
    }

    /// Counts down one block of the character's operation and returns the
    /// blocks left. Operations started at `height` are not counted down.
    pub fn tick(&mut self, id: CharacterId, height: u64) -> Option<u32> {
        let busy = self.characters.get_mut(&id)?.busy.as_mut()?;
        if busy.started_at != height {
            busy.blocks_remaining = busy.blocks_remaining.saturating_sub(1);
        }
        Some(busy.blocks_remaining)
    }

    /// Ticks every busy character and returns those whose operation is
    /// now due, in id order.
    pub fn tick_all(&mut self, height: u64) -> Vec<CharacterId> {
        self.ids()
            .into_iter()
            .filter(|id| self.tick(*id, height) == Some(0))
            .collect()
    }

    pub fn finish_operation(&mut self, id: CharacterId) -> Option<BusyState> {
        self.characters.get_mut(&id).and_then(|c| c.busy.take())
    }

    /// Clears the busy state without running the completion.
    pub fn abandon(&mut self, id: CharacterId) -> Option<BusyState> {
        let busy = self.characters.get_mut(&id).and_then(|c| c.busy.take());
        if let Some(state) = &busy {
            debug!(target: "prospect_core.character", id = %id, operation = ?state.operation, "operation abandoned");
        }
        busy
    }
}
