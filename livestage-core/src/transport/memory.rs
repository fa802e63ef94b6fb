//! In-process media transport
//!
//! Keeps rooms and participants in a `DashMap` and fans out every metadata
//! change over a broadcast channel. Each call touches one room entry under
//! its shard lock, so a single write is atomic and concurrent writes to the
//! same participant are last-write-wins. Changes are published before the
//! lock is released, so notification order matches write order.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{MediaTransport, MetadataChange, ParticipantRecord, ParticipantUpdate, RoomRecord};
use crate::{
    models::{Identity, RoomName},
    Error, Result,
};

#[derive(Debug, Default)]
struct RoomEntry {
    metadata: Option<String>,
    participants: HashMap<Identity, ParticipantRecord>,
}

pub struct InMemoryTransport {
    rooms: DashMap<RoomName, RoomEntry>,
    changes: broadcast::Sender<MetadataChange>,
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("rooms", &self.rooms.len())
            .finish()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new(256)
    }
}

impl InMemoryTransport {
    #[must_use]
    pub fn new(broadcast_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            rooms: DashMap::new(),
            changes,
        }
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn publish(&self, change: MetadataChange) {
        // No subscribers is not an error
        let _ = self.changes.send(change);
    }

    fn room_not_found(room: &RoomName) -> Error {
        Error::NotFound(format!("Room {room} not found"))
    }
}

#[async_trait]
impl MediaTransport for InMemoryTransport {
    async fn create_room(&self, room: &RoomName, metadata: String) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        let Entry::Vacant(vacant) = self.rooms.entry(room.clone()) else {
            return Err(Error::InvalidInput(format!("Room {room} already exists")));
        };
        let _guard = vacant.insert(RoomEntry {
            metadata: Some(metadata.clone()),
            participants: HashMap::new(),
        });

        info!(room = %room, "Room created");
        self.publish(MetadataChange::Room {
            room: room.clone(),
            metadata: Some(metadata),
        });
        Ok(())
    }

    async fn delete_room(&self, room: &RoomName) -> Result<()> {
        self.rooms
            .remove(room)
            .ok_or_else(|| Self::room_not_found(room))?;

        info!(room = %room, "Room deleted");
        self.publish(MetadataChange::RoomDeleted { room: room.clone() });
        Ok(())
    }

    async fn room(&self, room: &RoomName) -> Result<Option<RoomRecord>> {
        Ok(self.rooms.get(room).map(|entry| RoomRecord {
            name: room.clone(),
            metadata: entry.metadata.clone(),
        }))
    }

    async fn participant(
        &self,
        room: &RoomName,
        identity: &Identity,
    ) -> Result<Option<ParticipantRecord>> {
        let entry = self
            .rooms
            .get(room)
            .ok_or_else(|| Self::room_not_found(room))?;
        Ok(entry.participants.get(identity).cloned())
    }

    async fn list_participants(&self, room: &RoomName) -> Result<Vec<ParticipantRecord>> {
        let entry = self
            .rooms
            .get(room)
            .ok_or_else(|| Self::room_not_found(room))?;

        let mut participants: Vec<_> = entry.participants.values().cloned().collect();
        participants.sort_by(|a, b| a.identity.as_str().cmp(b.identity.as_str()));
        Ok(participants)
    }

    async fn add_participant(
        &self,
        room: &RoomName,
        identity: &Identity,
        can_publish: bool,
    ) -> Result<()> {
        let mut entry = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| Self::room_not_found(room))?;

        if entry.participants.contains_key(identity) {
            return Err(Error::InvalidInput(format!(
                "Identity {identity} is already in use in room {room}"
            )));
        }

        entry.participants.insert(
            identity.clone(),
            ParticipantRecord {
                identity: identity.clone(),
                metadata: None,
                can_publish,
            },
        );

        debug!(room = %room, identity = %identity, can_publish, "Participant joined");
        self.publish(MetadataChange::Participant {
            room: room.clone(),
            identity: identity.clone(),
            metadata: None,
            can_publish,
        });
        Ok(())
    }

    async fn update_participant(
        &self,
        room: &RoomName,
        identity: &Identity,
        update: ParticipantUpdate,
    ) -> Result<()> {
        let mut entry = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| Self::room_not_found(room))?;

        let participant = entry.participants.get_mut(identity).ok_or_else(|| {
            Error::NotFound(format!("Participant {identity} not found in room {room}"))
        })?;

        participant.metadata = Some(update.metadata.clone());
        participant.can_publish = update.can_publish;

        self.publish(MetadataChange::Participant {
            room: room.clone(),
            identity: identity.clone(),
            metadata: Some(update.metadata),
            can_publish: update.can_publish,
        });
        Ok(())
    }

    async fn remove_participant(&self, room: &RoomName, identity: &Identity) -> Result<()> {
        let mut entry = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| Self::room_not_found(room))?;

        if entry.participants.remove(identity).is_none() {
            return Err(Error::NotFound(format!(
                "Participant {identity} not found in room {room}"
            )));
        }

        debug!(room = %room, identity = %identity, "Participant left");
        self.publish(MetadataChange::ParticipantLeft {
            room: room.clone(),
            identity: identity.clone(),
        });
        Ok(())
    }

    async fn issue_join_token(
        &self,
        room: &RoomName,
        identity: &Identity,
        can_publish: bool,
    ) -> Result<String> {
        if !self.rooms.contains_key(room) {
            return Err(Self::room_not_found(room));
        }
        debug!(room = %room, identity = %identity, can_publish, "Issued join token");
        Ok(nanoid::nanoid!(32))
    }

    fn subscribe(&self) -> broadcast::Receiver<MetadataChange> {
        self.changes.subscribe()
    }
}
