use thiserror::Error;

use crate::block::BlockHash;
use crate::character::CharacterId;
use crate::coord::HexCoord;
use crate::region::RegionId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read params file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse params: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("prize {tier} has zero probability")]
    ZeroProbability { tier: String },
    #[error("prize {tier} listed more than once")]
    DuplicatePrize { tier: String },
    #[error("combined prize probability exceeds one")]
    ProbabilityOverflow,
    #[error("low-prize zone at {centre} has chance {percent}%, expected 1 to 100")]
    ZoneChance { centre: HexCoord, percent: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("region {region} is already being prospected by {by}")]
    AlreadyClaimed { region: RegionId, by: CharacterId },
    #[error("region {region} has already been prospected")]
    AlreadyProspected { region: RegionId },
    #[error("region {region} is not claimed by {character}")]
    NotClaimedBy { region: RegionId, character: CharacterId },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusyError {
    #[error("character {0} does not exist")]
    UnknownCharacter(CharacterId),
    #[error("character {0} is already busy")]
    AlreadyBusy(CharacterId),
    #[error("operation duration must be positive")]
    ZeroDuration,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("block at height {got} does not follow height {current}")]
    HeightMismatch { current: u64, got: u64 },
    #[error("block {hash} does not build on current best block {best}")]
    ParentMismatch { hash: BlockHash, best: BlockHash },
    #[error("cannot rewind to height {target}, oldest checkpoint is {oldest}")]
    RollbackTooDeep { target: u64, oldest: u64 },
    #[error("cannot rewind forward from {current} to {target}")]
    RewindAhead { current: u64, target: u64 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
