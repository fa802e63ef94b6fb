//! Room configuration and its metadata codec

use serde::{Deserialize, Serialize};

use super::id::Identity;

/// Room-level configuration attached to the room record.
///
/// Absent or unreadable metadata decodes fail-closed: chat and
/// participation are both disabled and no identity is the creator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomMetadata {
    pub creator_identity: String,
    pub enable_chat: bool,
    pub allow_participation: bool,
}

impl RoomMetadata {
    pub fn new(creator: &Identity, enable_chat: bool, allow_participation: bool) -> Self {
        Self {
            creator_identity: creator.as_str().to_string(),
            enable_chat,
            allow_participation,
        }
    }

    #[must_use]
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };

        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Malformed room metadata, failing closed");
            Self::default()
        })
    }

    pub fn encode(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The creator is always implicitly on stage and cannot be removed
    #[must_use]
    pub fn is_creator(&self, identity: &Identity) -> bool {
        !self.creator_identity.is_empty() && self.creator_identity == identity.as_str()
    }
}
