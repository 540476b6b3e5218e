use prospect_core::{BlockHash, EngineError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("unknown block {0}")]
    UnknownBlock(BlockHash),
    #[error("the genesis block cannot be invalidated")]
    GenesisInvalidation,
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("no character named {0:?}")]
    UnknownCharacter(String),
    #[error("no block marked as {0:?}")]
    UnknownLabel(String),
}
