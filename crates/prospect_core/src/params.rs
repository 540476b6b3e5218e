use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coord::HexCoord;
use crate::error::ConfigError;
use crate::prizes::{PrizeConfig, PrizeTier, DRAW_SCALE};

const DEFAULT_PROSPECTING_BLOCKS: u32 = 10;
const DEFAULT_REGION_SIZE: u32 = 16;
const DEFAULT_MOVEMENT_SPEED: u32 = 1;
const DEFAULT_STARTING_HP: u32 = 100;
const DEFAULT_CHECKPOINT_DEPTH: usize = 1_000;

/// Ruleset of the engine. Every node replaying the same chain must use
/// identical params.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub prospecting_blocks: u32,
    pub region_size: u32,
    pub movement_speed: u32,
    pub starting_hp: u32,
    pub checkpoint_depth: usize,
    pub prizes: Vec<PrizeConfig>,
    /// Areas where prizes are rarer. Empty by default.
    pub low_prize_zones: Vec<LowPrizeZone>,
}

/// Hex disc in which every prize band is scaled to `chance_percent`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowPrizeZone {
    pub centre: HexCoord,
    pub radius: u32,
    pub chance_percent: u32,
}

impl LowPrizeZone {
    pub fn contains(&self, pos: &HexCoord) -> bool {
        self.centre.distance(pos) <= u64::from(self.radius)
    }
}

impl EngineParams {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_toml(&data)
    }

    pub fn from_toml(data: &str) -> Result<Self, ConfigError> {
        let params: EngineParams = toml::from_str(data)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: u32| {
            std::env::var(key)
                .ok()
                .and_then(|val| val.parse().ok())
                .unwrap_or(fallback)
        };
        Self {
            prospecting_blocks: read("PROSPECTING_BLOCKS", defaults.prospecting_blocks),
            region_size: read("PROSPECT_REGION_SIZE", defaults.region_size),
            movement_speed: read("PROSPECT_MOVEMENT_SPEED", defaults.movement_speed),
            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("prospecting_blocks", self.prospecting_blocks),
            ("region_size", self.region_size),
            ("movement_speed", self.movement_speed),
            ("starting_hp", self.starting_hp),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { field });
            }
        }
        if self.checkpoint_depth == 0 {
            return Err(ConfigError::NotPositive {
                field: "checkpoint_depth",
            });
        }

        let mut seen = BTreeSet::new();
        let mut total = 0u64;
        for prize in &self.prizes {
            if prize.probability == 0 {
                return Err(ConfigError::ZeroProbability {
                    tier: prize.name.to_string(),
                });
            }
            if !seen.insert(prize.name) {
                return Err(ConfigError::DuplicatePrize {
                    tier: prize.name.to_string(),
                });
            }
            total += u64::from(prize.band_width());
        }
        if total > u64::from(DRAW_SCALE) {
            return Err(ConfigError::ProbabilityOverflow);
        }

        for zone in &self.low_prize_zones {
            if !(1..=100).contains(&zone.chance_percent) {
                return Err(ConfigError::ZoneChance {
                    centre: zone.centre,
                    percent: zone.chance_percent,
                });
            }
        }
        Ok(())
    }

    /// Percentage applied to the prize bands at `pos`; overlapping zones
    /// take the lowest.
    pub fn prize_chance_percent(&self, pos: &HexCoord) -> u32 {
        self.low_prize_zones
            .iter()
            .filter(|z| z.contains(pos))
            .map(|z| z.chance_percent)
            .min()
            .unwrap_or(100)
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            prospecting_blocks: DEFAULT_PROSPECTING_BLOCKS,
            region_size: DEFAULT_REGION_SIZE,
            movement_speed: DEFAULT_MOVEMENT_SPEED,
            starting_hp: DEFAULT_STARTING_HP,
            checkpoint_depth: DEFAULT_CHECKPOINT_DEPTH,
            prizes: vec![
                PrizeConfig {
                    name: PrizeTier::Gold,
                    number: 3,
                    probability: 100,
                },
                PrizeConfig {
                    name: PrizeTier::Silver,
                    number: 1_000,
                    probability: 4,
                },
                PrizeConfig {
                    name: PrizeTier::Bronze,
                    number: 0,
                    probability: 2,
                },
            ],
            low_prize_zones: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineParams::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let params = EngineParams::from_toml("prospecting_blocks = 3\n").unwrap();
        assert_eq!(params.prospecting_blocks, 3);
        assert_eq!(params.region_size, DEFAULT_REGION_SIZE);
        assert_eq!(params.prizes.len(), 3);
    }

    #[test]
    fn rejects_bad_tables() {
        let err = EngineParams::from_toml(
            r#"
            [[prizes]]
            name = "gold"
            number = 1
            probability = 1

            [[prizes]]
            name = "silver"
            number = 1
            probability = 2
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ProbabilityOverflow));

        let err = EngineParams::from_toml(
            r#"
            [[prizes]]
            name = "gold"
            number = 1
            probability = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroProbability { .. }));

        let err = EngineParams::from_toml("region_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { field: "region_size" }));
    }

    #[test]
    fn rejects_zero_starting_hp() {
        let err = EngineParams::from_toml("starting_hp = 0").unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { field: "starting_hp" }));
    }

    #[test]
    fn low_prize_zones_scale_by_position() {
        let params = EngineParams::from_toml(
            r#"
            [[low_prize_zones]]
            centre = { x = 100, y = 0 }
            radius = 10
            chance_percent = 55

            [[low_prize_zones]]
            centre = { x = 105, y = 0 }
            radius = 2
            chance_percent = 30
            "#,
        )
        .unwrap();
        assert_eq!(params.prize_chance_percent(&HexCoord::new(0, 0)), 100);
        assert_eq!(params.prize_chance_percent(&HexCoord::new(92, 0)), 55);
        assert_eq!(params.prize_chance_percent(&HexCoord::new(106, 0)), 30);

        let err = EngineParams::from_toml(
            r#"
            [[low_prize_zones]]
            centre = { x = 0, y = 0 }
            radius = 1
            chance_percent = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZoneChance { percent: 0, .. }));
    }
}
