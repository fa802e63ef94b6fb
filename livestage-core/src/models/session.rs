use serde::{Deserialize, Serialize};

use super::{
    id::{Identity, RoomName},
    room::RoomMetadata,
};

/// Caller of a stage operation, resolved from an authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Host(Identity),
    Viewer(Identity),
}

impl Actor {
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        match self {
            Self::Host(identity) | Self::Viewer(identity) => identity,
        }
    }

    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    /// Whether this actor is the participant `target` themself
    #[must_use]
    pub fn is_self(&self, target: &Identity) -> bool {
        self.identity() == target
    }
}

/// Result of authenticating a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedSession {
    pub identity: Identity,
    pub room_name: RoomName,
    pub is_host: bool,
}

impl AuthenticatedSession {
    /// Resolve the caller's role in the room as it exists now.
    ///
    /// A host claim only counts for the room's recorded creator, so a token
    /// minted for an earlier room of the same name carries no authority.
    #[must_use]
    pub fn actor(&self, room: &RoomMetadata) -> Actor {
        if self.is_host && room.is_creator(&self.identity) {
            Actor::Host(self.identity.clone())
        } else {
            Actor::Viewer(self.identity.clone())
        }
    }
}
