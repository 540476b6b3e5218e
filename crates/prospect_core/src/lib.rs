//! Deterministic game-state engine for region prospecting.
//!
//! The engine advances once per confirmed block. Identical chains always
//! produce identical states, which is what makes reorgs (rewind to a
//! checkpoint, then replay the new branch) safe.

pub mod block;
pub mod character;
pub mod command;
pub mod controller;
pub mod coord;
pub mod error;
pub mod movement;
pub mod params;
pub mod prizes;
pub mod prospecting;
pub mod region;
pub mod state;

pub use block::{AdminCommand, BlockData, BlockHash, DamageEvent, MoveData};
pub use character::{BusyState, Character, CharacterId, CharacterTable, Faction, Operation};
pub use command::Command;
pub use controller::Engine;
pub use coord::HexCoord;
pub use error::{BusyError, ConfigError, EngineError, RegionError};
pub use params::{EngineParams, LowPrizeZone};
pub use prizes::{PrizeConfig, PrizePool, PrizeTier};
pub use region::{Prospection, Region, RegionId, RegionMap, RegionStore};
pub use state::{GameState, StateView};
