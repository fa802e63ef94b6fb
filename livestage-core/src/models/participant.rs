//! Participant stage state and its metadata codec
//!
//! On the wire each participant carries a small JSON document with two
//! flags, `hand_raised` and `invited_to_stage`. Every reader and writer goes
//! through [`ParticipantMetadata::decode`] / [`ParticipantMetadata::encode`];
//! all transition logic works on the derived [`StageState`].

use serde::{Deserialize, Serialize};

/// Per-participant metadata document as stored by the media transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantMetadata {
    pub hand_raised: bool,
    pub invited_to_stage: bool,
}

impl ParticipantMetadata {
    /// Decode a raw metadata blob.
    ///
    /// Missing, empty or malformed input yields the default (Viewer) state:
    /// a participant that just joined has no metadata yet.
    #[must_use]
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };

        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Malformed participant metadata, using default");
            Self::default()
        })
    }

    /// Canonical JSON serialization: both keys, always in field order
    pub fn encode(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    #[must_use]
    pub const fn state(&self) -> StageState {
        match (self.hand_raised, self.invited_to_stage) {
            (false, false) => StageState::Viewer,
            (true, false) => StageState::HandRaised,
            (false, true) => StageState::Invited,
            (true, true) => StageState::OnStage,
        }
    }
}

/// Combined stage state of a non-host participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    #[default]
    Viewer,
    HandRaised,
    Invited,
    OnStage,
}

impl StageState {
    pub const ALL: [Self; 4] = [Self::Viewer, Self::HandRaised, Self::Invited, Self::OnStage];

    #[must_use]
    pub const fn metadata(self) -> ParticipantMetadata {
        match self {
            Self::Viewer => ParticipantMetadata {
                hand_raised: false,
                invited_to_stage: false,
            },
            Self::HandRaised => ParticipantMetadata {
                hand_raised: true,
                invited_to_stage: false,
            },
            Self::Invited => ParticipantMetadata {
                hand_raised: false,
                invited_to_stage: true,
            },
            Self::OnStage => ParticipantMetadata {
                hand_raised: true,
                invited_to_stage: true,
            },
        }
    }

    /// Only OnStage participants may publish audio/video
    #[must_use]
    pub const fn can_publish(self) -> bool {
        matches!(self, Self::OnStage)
    }

    /// A raised hand waiting for the host
    #[must_use]
    pub const fn needs_host_attention(self) -> bool {
        matches!(self, Self::HandRaised)
    }

    /// A host invite waiting for the viewer
    #[must_use]
    pub const fn needs_viewer_response(self) -> bool {
        matches!(self, Self::Invited)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::HandRaised => "hand raised",
            Self::Invited => "invited",
            Self::OnStage => "on stage",
        }
    }
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ParticipantMetadata> for StageState {
    fn from(metadata: ParticipantMetadata) -> Self {
        metadata.state()
    }
}

impl From<StageState> for ParticipantMetadata {
    fn from(state: StageState) -> Self {
        state.metadata()
    }
}

/// Events driving the stage state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEvent {
    RaiseHand,
    Invite,
    Accept,
    Reject,
    Remove,
}

impl StageEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RaiseHand => "raise hand",
            Self::Invite => "invite",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Remove => "remove",
        }
    }
}

impl std::fmt::Display for StageEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_absent_is_viewer() {
        assert_eq!(ParticipantMetadata::decode(None), ParticipantMetadata::default());
        assert_eq!(ParticipantMetadata::decode(Some("")), ParticipantMetadata::default());
        assert_eq!(ParticipantMetadata::decode(Some("   ")).state(), StageState::Viewer);
    }

    #[test]
    fn test_decode_malformed_is_viewer() {
        assert_eq!(ParticipantMetadata::decode(Some("{not json")).state(), StageState::Viewer);
        assert_eq!(ParticipantMetadata::decode(Some("[1,2]")).state(), StageState::Viewer);
        assert_eq!(
            ParticipantMetadata::decode(Some(r#"{"hand_raised":"yes"}"#)).state(),
            StageState::Viewer
        );
    }

    #[test]
    fn test_decode_partial_document() {
        let metadata = ParticipantMetadata::decode(Some(r#"{"hand_raised":true}"#));
        assert_eq!(metadata.state(), StageState::HandRaised);

        let metadata =
            ParticipantMetadata::decode(Some(r#"{"invited_to_stage":true,"extra":"ignored"}"#));
        assert_eq!(metadata.state(), StageState::Invited);
    }

    #[test]
    fn test_round_trip_every_state() {
        for state in StageState::ALL {
            let encoded = state.metadata().encode().unwrap();
            let decoded = ParticipantMetadata::decode(Some(&encoded));
            assert_eq!(decoded.state(), state);
        }
    }

    #[test]
    fn test_encode_writes_both_flags() {
        assert_eq!(
            StageState::Invited.metadata().encode().unwrap(),
            r#"{"hand_raised":false,"invited_to_stage":true}"#
        );
        assert_eq!(
            StageState::Viewer.metadata().encode().unwrap(),
            r#"{"hand_raised":false,"invited_to_stage":false}"#
        );
    }

    #[test]
    fn test_only_on_stage_publishes() {
        let publishing: Vec<_> = StageState::ALL.into_iter().filter(|s| s.can_publish()).collect();
        assert_eq!(publishing, vec![StageState::OnStage]);
        assert!(StageState::HandRaised.needs_host_attention());
        assert!(StageState::Invited.needs_viewer_response());
        assert!(!StageState::OnStage.needs_viewer_response());
    }
}
