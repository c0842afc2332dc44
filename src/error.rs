//! Error types for clonk.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClonkError {
    #[error("polygon needs at least 3 points, got {points}")]
    DegeneratePolygon { points: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClonkError>;
