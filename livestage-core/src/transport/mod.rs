//! Media-transport collaborator
//!
//! The transport owns rooms, participants and their metadata documents.
//! This crate only defines the document schemas and writes them through
//! [`MediaTransport::update_participant`], which is assumed atomic per call
//! with no compare-and-swap: concurrent writers to the same participant
//! resolve last-write-wins.

mod memory;

pub use memory::InMemoryTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
    models::{Identity, RoomName},
    Result,
};

/// Room as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub name: RoomName,
    pub metadata: Option<String>,
}

/// Participant as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub identity: Identity,
    pub metadata: Option<String>,
    pub can_publish: bool,
}

/// One atomic participant write: metadata document plus publish permission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantUpdate {
    pub metadata: String,
    pub can_publish: bool,
}

/// Change notification pushed to every subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetadataChange {
    Participant {
        room: RoomName,
        identity: Identity,
        metadata: Option<String>,
        can_publish: bool,
    },
    ParticipantLeft {
        room: RoomName,
        identity: Identity,
    },
    Room {
        room: RoomName,
        metadata: Option<String>,
    },
    RoomDeleted {
        room: RoomName,
    },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn create_room(&self, room: &RoomName, metadata: String) -> Result<()>;

    async fn delete_room(&self, room: &RoomName) -> Result<()>;

    async fn room(&self, room: &RoomName) -> Result<Option<RoomRecord>>;

    async fn participant(
        &self,
        room: &RoomName,
        identity: &Identity,
    ) -> Result<Option<ParticipantRecord>>;

    async fn list_participants(&self, room: &RoomName) -> Result<Vec<ParticipantRecord>>;

    /// Register a freshly joined participant with no metadata
    async fn add_participant(
        &self,
        room: &RoomName,
        identity: &Identity,
        can_publish: bool,
    ) -> Result<()>;

    /// Overwrite a participant's metadata and publish permission in one call
    async fn update_participant(
        &self,
        room: &RoomName,
        identity: &Identity,
        update: ParticipantUpdate,
    ) -> Result<()>;

    /// Drop a participant from the room, freeing its identity
    async fn remove_participant(&self, room: &RoomName, identity: &Identity) -> Result<()>;

    /// Token a client presents to the transport to connect to `room`
    async fn issue_join_token(
        &self,
        room: &RoomName,
        identity: &Identity,
        can_publish: bool,
    ) -> Result<String>;

    fn subscribe(&self) -> broadcast::Receiver<MetadataChange>;
}
