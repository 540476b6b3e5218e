//! Prize allocation for completed prospecting.
//!
//! Every draw is seeded from the confirming block hash plus the region and
//! character, so replaying the same chain reproduces the same prizes no
//! matter in which order or process the blocks are attached.

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::block::BlockHash;
use crate::character::CharacterId;
use crate::region::RegionId;

/// Resolution of the probability table.
pub const DRAW_SCALE: u32 = 1_000_000;

const SEED_DOMAIN: &[u8] = b"prospecting prize";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeTier {
    Gold,
    Silver,
    Bronze,
}

impl fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrizeTier::Gold => "gold",
            PrizeTier::Silver => "silver",
            PrizeTier::Bronze => "bronze",
        };
        f.write_str(name)
    }
}

/// One row of the prize table: at most `number` prizes of the tier, each
/// prospecting hitting it with chance `1 / probability`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeConfig {
    pub name: PrizeTier,
    pub number: u32,
    pub probability: u32,
}

impl PrizeConfig {
    pub fn band_width(&self) -> u32 {
        DRAW_SCALE / self.probability.max(1)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizePool {
    found: BTreeMap<PrizeTier, u32>,
}

impl PrizePool {
    pub fn found(&self, tier: PrizeTier) -> u32 {
        self.found.get(&tier).copied().unwrap_or(0)
    }

    fn record(&mut self, tier: PrizeTier) {
        *self.found.entry(tier).or_insert(0) += 1;
    }
}

pub fn derive_seed(block: &BlockHash, region: RegionId, character: CharacterId) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SEED_DOMAIN);
    hasher.update(block.as_bytes());
    hasher.update(region.0.to_be_bytes());
    hasher.update(character.0.to_be_bytes());
    hasher.finalize().into()
}

/// Single-use generator for one completion.
#[derive(Debug)]
pub struct PrizeRng {
    rng: StdRng,
}

impl PrizeRng {
    pub fn new(block: &BlockHash, region: RegionId, character: CharacterId) -> Self {
        Self {
            rng: StdRng::from_seed(derive_seed(block, region, character)),
        }
    }

    pub fn draw(&mut self) -> u32 {
        self.rng.gen_range(0..DRAW_SCALE)
    }
}

/// Maps a draw onto the table. Tiers occupy consecutive bands in table
/// order, each shrunk to `chance_percent` of its width; a draw past the
/// last band, or in the band of an exhausted tier, wins nothing.
pub fn select_tier(
    table: &[PrizeConfig],
    pool: &PrizePool,
    draw: u32,
    chance_percent: u32,
) -> Option<PrizeTier> {
    let percent = u64::from(chance_percent.min(100));
    let mut lower = 0u32;
    for prize in table {
        let width = u64::from(prize.band_width()) * percent / 100;
        let upper = lower.saturating_add(width as u32);
        if draw < upper {
            if pool.found(prize.name) >= prize.number {
                debug!(target: "prospect_core.prizes", tier = %prize.name, "tier exhausted");
                return None;
            }
            return Some(prize.name);
        }
        lower = upper;
    }
    None
}

pub fn allocate(
    table: &[PrizeConfig],
    pool: &mut PrizePool,
    block: &BlockHash,
    region: RegionId,
    character: CharacterId,
    chance_percent: u32,
) -> Option<PrizeTier> {
    let draw = PrizeRng::new(block, region, character).draw();
    let tier = select_tier(table, pool, draw, chance_percent)?;
    pool.record(tier);
    info!(target: "prospect_core.prizes", tier = %tier, region = %region, character = %character, found = pool.found(tier), "prize found");
    Some(tier)
}
