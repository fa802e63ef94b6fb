use thiserror::Error;

use crate::models::{StageEvent, StageState};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Participation is disabled for this room")]
    ParticipationDisabled,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal transition: cannot {event} while {from}")]
    IllegalTransition { from: StageState, event: StageEvent },

    #[error("Upstream write failed: {0}")]
    UpstreamWrite(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code for the error kind
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication",
            Self::Unauthorized(_) => "unauthorized",
            Self::ParticipationDisabled => "participation_disabled",
            Self::NotFound(_) => "not_found",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::UpstreamWrite(_) => "upstream_write_failure",
            Self::InvalidInput(_) => "invalid_input",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
