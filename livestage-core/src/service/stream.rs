//! Stream lifecycle: creating, joining and stopping live rooms
//!
//! This is where sessions come from. The host session minted by
//! [`StreamService::create_stream`] is the only one carrying host authority.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    models::{Identity, RoomMetadata, RoomName},
    service::auth::{IdentityProvider, SessionTokenService},
    transport::MediaTransport,
    Error, Result,
};

const MAX_NAME_LENGTH: usize = 64;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStreamRequest {
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default = "default_true")]
    pub enable_chat: bool,
    #[serde(default = "default_true")]
    pub allow_participation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinStreamRequest {
    pub room_name: String,
    #[serde(default)]
    pub identity: Option<String>,
}

/// What a client needs to connect to the media transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    pub room_name: RoomName,
    pub identity: Identity,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSession {
    /// Session token presented on every stage operation
    pub auth_token: String,
    pub connection_details: ConnectionDetails,
}

#[derive(Clone)]
pub struct StreamService {
    transport: Arc<dyn MediaTransport>,
    tokens: SessionTokenService,
}

impl std::fmt::Debug for StreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamService")
            .field("tokens", &self.tokens)
            .finish()
    }
}

impl StreamService {
    pub fn new(transport: Arc<dyn MediaTransport>, tokens: SessionTokenService) -> Self {
        Self { transport, tokens }
    }

    /// Create a room owned by the caller and return a host session
    pub async fn create_stream(&self, req: CreateStreamRequest) -> Result<StreamSession> {
        let room = match req.room_name {
            Some(name) => RoomName::from_string(validate_name("room_name", &name)?),
            None => RoomName::new(),
        };
        let identity = match req.identity {
            Some(name) => Identity::from_string(validate_name("identity", &name)?),
            None => Identity::new(),
        };

        let config = RoomMetadata::new(&identity, req.enable_chat, req.allow_participation);
        self.transport.create_room(&room, config.encode()?).await?;

        if let Err(e) = self.transport.add_participant(&room, &identity, true).await {
            error!(room = %room, error = %e, "Failed to register creator, rolling back room");
            if let Err(cleanup) = self.transport.delete_room(&room).await {
                error!(room = %room, error = %cleanup, "Room rollback failed");
            }
            return Err(e);
        }

        let session = self.session(&room, &identity, true).await?;
        info!(
            room = %room,
            creator = %identity,
            allow_participation = config.allow_participation,
            enable_chat = config.enable_chat,
            "Stream created"
        );
        Ok(session)
    }

    /// Join an existing room as a viewer
    pub async fn join_stream(&self, req: JoinStreamRequest) -> Result<StreamSession> {
        let room = RoomName::from_string(validate_name("room_name", &req.room_name)?);
        let identity = match req.identity {
            Some(name) => Identity::from_string(validate_name("identity", &name)?),
            None => Identity::new(),
        };

        if self.transport.room(&room).await?.is_none() {
            return Err(Error::NotFound(format!("Room {room} not found")));
        }

        self.transport.add_participant(&room, &identity, false).await?;
        let session = self.session(&room, &identity, false).await?;

        info!(room = %room, identity = %identity, "Viewer joined stream");
        Ok(session)
    }

    /// End the caller's stream; only its creator may do this
    pub async fn stop_stream(&self, token: &str) -> Result<()> {
        let session = self.tokens.authenticate(token).await?;

        let record = self
            .transport
            .room(&session.room_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Room {} not found", session.room_name)))?;
        let config = RoomMetadata::decode(record.metadata.as_deref());

        if !session.is_host || !config.is_creator(&session.identity) {
            return Err(Error::Unauthorized(
                "Only the creator can stop the stream".to_string(),
            ));
        }

        self.transport.delete_room(&session.room_name).await?;
        info!(room = %session.room_name, "Stream stopped");
        Ok(())
    }

    /// Leave the caller's room, freeing the identity for a later join
    ///
    /// The creator ends their stream with [`Self::stop_stream`] instead.
    pub async fn leave_stream(&self, token: &str) -> Result<()> {
        let session = self.tokens.authenticate(token).await?;

        let record = self
            .transport
            .room(&session.room_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Room {} not found", session.room_name)))?;
        let config = RoomMetadata::decode(record.metadata.as_deref());

        if config.is_creator(&session.identity) {
            return Err(Error::InvalidInput(
                "The creator must stop the stream instead of leaving it".to_string(),
            ));
        }

        self.transport
            .remove_participant(&session.room_name, &session.identity)
            .await?;
        info!(room = %session.room_name, identity = %session.identity, "Viewer left stream");
        Ok(())
    }

    async fn session(
        &self,
        room: &RoomName,
        identity: &Identity,
        is_host: bool,
    ) -> Result<StreamSession> {
        let token = self
            .transport
            .issue_join_token(room, identity, is_host)
            .await?;

        Ok(StreamSession {
            auth_token: self.tokens.sign(identity, room, is_host)?,
            connection_details: ConnectionDetails {
                room_name: room.clone(),
                identity: identity.clone(),
                token,
            },
        })
    }
}

fn validate_name(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be empty")));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::InvalidInput(format!(
            "{field} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(Error::InvalidInput(format!(
            "{field} must not contain control characters"
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;

    fn service() -> (Arc<InMemoryTransport>, StreamService) {
        let transport = Arc::new(InMemoryTransport::default());
        let tokens = SessionTokenService::new(b"stream-test-secret", 1).unwrap();
        (transport.clone(), StreamService::new(transport, tokens))
    }

    fn create(room: &str, identity: &str) -> CreateStreamRequest {
        CreateStreamRequest {
            room_name: Some(room.to_string()),
            identity: Some(identity.to_string()),
            enable_chat: true,
            allow_participation: true,
        }
    }

    #[tokio::test]
    async fn test_create_stream_registers_publishing_creator() {
        let (transport, svc) = service();
        let session = svc.create_stream(create("studio", "host")).await.unwrap();

        let room = RoomName::from("studio");
        let creator = transport
            .participant(&room, &Identity::from("host"))
            .await
            .unwrap()
            .unwrap();
        assert!(creator.can_publish);

        let record = transport.room(&room).await.unwrap().unwrap();
        let config = RoomMetadata::decode(record.metadata.as_deref());
        assert_eq!(config.creator_identity, "host");
        assert!(config.allow_participation);

        let claims = svc.tokens.verify(&session.auth_token).unwrap();
        assert!(claims.host);
        assert_eq!(claims.room, "studio");
    }

    #[tokio::test]
    async fn test_generated_names() {
        let (_, svc) = service();
        let session = svc
            .create_stream(CreateStreamRequest {
                room_name: None,
                identity: None,
                enable_chat: false,
                allow_participation: false,
            })
            .await
            .unwrap();
        assert_eq!(session.connection_details.room_name.as_str().len(), 12);
        assert_eq!(session.connection_details.identity.as_str().len(), 12);
    }

    #[tokio::test]
    async fn test_join_stream() {
        let (transport, svc) = service();
        svc.create_stream(create("studio", "host")).await.unwrap();

        let session = svc
            .join_stream(JoinStreamRequest {
                room_name: "studio".to_string(),
                identity: Some("alice".to_string()),
            })
            .await
            .unwrap();
        assert!(!svc.tokens.verify(&session.auth_token).unwrap().host);

        let alice = transport
            .participant(&RoomName::from("studio"), &Identity::from("alice"))
            .await
            .unwrap()
            .unwrap();
        assert!(!alice.can_publish);
        assert!(alice.metadata.is_none());

        let err = svc
            .join_stream(JoinStreamRequest {
                room_name: "studio".to_string(),
                identity: Some("alice".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_join_missing_room() {
        let (_, svc) = service();
        let err = svc
            .join_stream(JoinStreamRequest {
                room_name: "nowhere".to_string(),
                identity: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stop_stream_creator_only() {
        let (transport, svc) = service();
        let host = svc.create_stream(create("studio", "host")).await.unwrap();
        let viewer = svc
            .join_stream(JoinStreamRequest {
                room_name: "studio".to_string(),
                identity: Some("alice".to_string()),
            })
            .await
            .unwrap();

        let err = svc.stop_stream(&viewer.auth_token).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        svc.stop_stream(&host.auth_token).await.unwrap();
        assert_eq!(transport.room_count(), 0);
    }

    #[tokio::test]
    async fn test_leave_stream_frees_identity() {
        let (transport, svc) = service();
        let host = svc.create_stream(create("studio", "host")).await.unwrap();
        let join = || JoinStreamRequest {
            room_name: "studio".to_string(),
            identity: Some("alice".to_string()),
        };
        let viewer = svc.join_stream(join()).await.unwrap();

        svc.leave_stream(&viewer.auth_token).await.unwrap();
        assert!(transport
            .participant(&RoomName::from("studio"), &Identity::from("alice"))
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            svc.leave_stream(&viewer.auth_token).await,
            Err(Error::NotFound(_))
        ));

        svc.join_stream(join()).await.unwrap();

        let err = svc.leave_stream(&host.auth_token).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("identity", "  alice ").unwrap(), "alice");
        assert!(validate_name("identity", "   ").is_err());
        assert!(validate_name("identity", &"x".repeat(65)).is_err());
        assert!(validate_name("identity", "bad\nname").is_err());
    }
}
