//! The complete game state and its JSON query view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::BlockHash;
use crate::character::{Character, CharacterTable, Faction, Operation};
use crate::coord::HexCoord;
use crate::params::EngineParams;
use crate::prizes::{PrizePool, PrizeTier};
use crate::region::{Region, RegionId, RegionMap, RegionStore};

/// Everything a block can change. Cloned whole into checkpoints, so two
/// states compare equal exactly when replaying led to the same result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub height: u64,
    pub best_hash: BlockHash,
    pub characters: CharacterTable,
    pub regions: RegionStore,
    pub prizes: PrizePool,
}

impl GameState {
    pub fn genesis(height: u64, hash: BlockHash) -> Self {
        Self {
            height,
            best_hash: hash,
            ..Default::default()
        }
    }

    pub fn to_view(&self, params: &EngineParams) -> StateView {
        let map = RegionMap::new(params.region_size);
        StateView {
            height: self.height,
            blockhash: self.best_hash.to_hex(),
            characters: self
                .characters
                .iter()
                .map(|c| CharacterView::new(c, &map))
                .collect(),
            regions: self.regions.iter().cloned().collect(),
            prizes: params
                .prizes
                .iter()
                .map(|p| {
                    let found = self.prizes.found(p.name);
                    (
                        p.name,
                        PrizeStats {
                            number: p.number,
                            probability: p.probability,
                            found,
                            available: p.number.saturating_sub(found),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn to_json(&self, params: &EngineParams) -> serde_json::Value {
        serde_json::to_value(self.to_view(params)).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateView {
    pub height: u64,
    pub blockhash: String,
    pub characters: Vec<CharacterView>,
    pub regions: Vec<Region>,
    pub prizes: BTreeMap<PrizeTier, PrizeStats>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterView {
    pub id: u64,
    pub name: String,
    pub faction: Faction,
    pub position: HexCoord,
    pub hp: u32,
    pub moving: bool,
    pub busy: Option<BusyView>,
}

impl CharacterView {
    fn new(c: &Character, map: &RegionMap) -> Self {
        Self {
            id: c.id.0,
            name: c.name.clone(),
            faction: c.faction,
            position: c.position,
            hp: c.hp,
            moving: c.is_moving(),
            busy: c.busy.as_ref().map(|b| BusyView {
                blocks: b.blocks_remaining,
                operation: b.operation,
                region: b.region.unwrap_or_else(|| map.region_id(&c.position)),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyView {
    pub blocks: u32,
    pub operation: Operation,
    pub region: RegionId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeStats {
    pub number: u32,
    pub probability: u32,
    pub found: u32,
    pub available: u32,
}
