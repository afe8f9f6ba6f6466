use thiserror::Error;

use crate::battle::state::{BattleState, Trigger};

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("trigger {trigger:?} is not permitted in state {state:?}")]
    InvalidTransition {
        state: BattleState,
        trigger: Trigger,
    },

    #[error("action wait was cancelled")]
    CancelledWait,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
