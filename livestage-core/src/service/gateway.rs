//! Stage enforcement gateway
//!
//! Authenticates the caller, checks room configuration, asks the stage
//! state machine whether the requested transition is legal and persists the
//! result with exactly one participant write. Room metadata is only read.
//!
//! Nothing here serialises concurrent requests: two operations on the same
//! participant race at the transport and the later write wins. Clients
//! converge by re-reading metadata from transport change notifications.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    models::{
        Actor, AuthenticatedSession, Identity, ParticipantMetadata, RoomMetadata, RoomName,
        StageEvent, StageState,
    },
    service::{auth::IdentityProvider, stage},
    transport::{MediaTransport, MetadataChange, ParticipantRecord, ParticipantUpdate},
    Error, Result,
};

/// A persisted stage transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub room: RoomName,
    pub identity: Identity,
    pub from: StageState,
    pub to: StageState,
}

/// One participant as shown in the presence list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub identity: Identity,
    pub state: StageState,
    pub is_creator: bool,
    pub can_publish: bool,
}

/// Read-only view of a room's stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub room: RoomName,
    pub config: RoomMetadata,
    pub participants: Vec<ParticipantView>,
}

impl StageSnapshot {
    /// Hosts, co-hosts and invited speakers currently allowed to publish
    pub fn on_stage(&self) -> impl Iterator<Item = &ParticipantView> {
        self.participants.iter().filter(|p| p.can_publish)
    }

    /// Raised hands waiting for the host
    pub fn pending_requests(&self) -> impl Iterator<Item = &ParticipantView> {
        self.participants
            .iter()
            .filter(|p| p.state.needs_host_attention())
    }
}

/// Stage change pushed to subscribers of one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageUpdate {
    Participant {
        identity: Identity,
        state: StageState,
        can_publish: bool,
    },
    ParticipantLeft {
        identity: Identity,
    },
    /// The room was deleted; no further updates follow
    StreamEnded,
}

impl StageUpdate {
    fn from_change(room: &RoomName, config: &RoomMetadata, change: MetadataChange) -> Option<Self> {
        match change {
            MetadataChange::Participant {
                room: changed,
                identity,
                metadata,
                can_publish,
            } if &changed == room => {
                let state = if config.is_creator(&identity) {
                    StageState::OnStage
                } else {
                    ParticipantMetadata::decode(metadata.as_deref()).state()
                };
                Some(Self::Participant {
                    identity,
                    state,
                    can_publish,
                })
            }
            MetadataChange::ParticipantLeft {
                room: changed,
                identity,
            } if &changed == room => Some(Self::ParticipantLeft { identity }),
            MetadataChange::RoomDeleted { room: changed } if &changed == room => {
                Some(Self::StreamEnded)
            }
            _ => None,
        }
    }
}

struct CallContext {
    session: AuthenticatedSession,
    config: RoomMetadata,
}

impl CallContext {
    fn room(&self) -> &RoomName {
        &self.session.room_name
    }

    fn actor(&self) -> Actor {
        self.session.actor(&self.config)
    }
}

#[derive(Clone)]
pub struct StageGateway {
    transport: Arc<dyn MediaTransport>,
    identity: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for StageGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageGateway").finish()
    }
}

impl StageGateway {
    pub fn new(transport: Arc<dyn MediaTransport>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            transport,
            identity,
        }
    }

    /// Host invites `target` to the stage, or accepts their raised hand
    pub async fn invite_to_stage(&self, token: &str, target: &Identity) -> Result<StageTransition> {
        let ctx = self.context(token).await?;
        let actor = ctx.actor();

        if !actor.is_host() {
            let err = Error::Unauthorized(
                "Only the host can invite participants to the stage".to_string(),
            );
            Self::log_rejection(&ctx, target, &err);
            return Err(err);
        }

        self.transition(&ctx, &actor, target, true, stage::invite_event)
            .await
    }

    /// Caller raises their hand, or accepts a pending invite
    pub async fn raise_hand(&self, token: &str) -> Result<StageTransition> {
        let ctx = self.context(token).await?;
        let actor = ctx.actor();
        let target = ctx.session.identity.clone();

        self.transition(&ctx, &actor, &target, true, stage::raise_hand_event)
            .await
    }

    /// Host removes `target`, or `target` leaves / cancels on their own
    pub async fn remove_from_stage(
        &self,
        token: &str,
        target: &Identity,
    ) -> Result<StageTransition> {
        let ctx = self.context(token).await?;
        let actor = ctx.actor();

        if !actor.is_host() && !actor.is_self(target) {
            let err = Error::Unauthorized(
                "Only the host or the participant themself can leave the stage".to_string(),
            );
            Self::log_rejection(&ctx, target, &err);
            return Err(err);
        }

        let withdraw = |current| stage::remove_event(current, &actor, target);
        self.transition(&ctx, &actor, target, false, withdraw)
            .await
    }

    /// Presence list of the caller's room
    pub async fn list_stage(&self, token: &str) -> Result<StageSnapshot> {
        let ctx = self.context(token).await?;
        let records = self.transport.list_participants(ctx.room()).await?;

        let participants = records
            .into_iter()
            .map(|record| {
                let is_creator = ctx.config.is_creator(&record.identity);
                let state = if is_creator {
                    StageState::OnStage
                } else {
                    ParticipantMetadata::decode(record.metadata.as_deref()).state()
                };
                ParticipantView {
                    identity: record.identity,
                    state,
                    is_creator,
                    can_publish: record.can_publish,
                }
            })
            .collect();

        Ok(StageSnapshot {
            room: ctx.session.room_name.clone(),
            config: ctx.config,
            participants,
        })
    }

    /// Live stage changes of the caller's room
    ///
    /// Subscribers that fall behind the transport's buffer skip the missed
    /// changes and should re-read [`Self::list_stage`].
    pub async fn watch_stage(&self, token: &str) -> Result<BoxStream<'static, StageUpdate>> {
        let changes = BroadcastStream::new(self.transport.subscribe());
        let ctx = self.context(token).await?;
        let room = ctx.session.room_name;
        let config = ctx.config;

        debug!(room = %room, identity = %ctx.session.identity, "Stage watcher attached");
        let updates: BoxStream<'static, StageUpdate> =
            Box::pin(changes.filter_map(move |change| match change {
                Ok(change) => StageUpdate::from_change(&room, &config, change),
                Err(e) => {
                    warn!(room = %room, error = %e, "Stage watcher lagged");
                    None
                }
            }));

        // Finish after StreamEnded so the broadcast receiver is released
        let until_ended = futures::stream::unfold(Some(updates), |updates| async move {
            let mut updates = updates?;
            let update = updates.next().await?;
            let rest = (update != StageUpdate::StreamEnded).then_some(updates);
            Some((update, rest))
        });
        Ok(Box::pin(until_ended))
    }

    async fn context(&self, token: &str) -> Result<CallContext> {
        let session = self.identity.authenticate(token).await?;

        let room = self
            .transport
            .room(&session.room_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Room {} not found", session.room_name)))?;

        Ok(CallContext {
            config: RoomMetadata::decode(room.metadata.as_deref()),
            session,
        })
    }

    async fn transition(
        &self,
        ctx: &CallContext,
        actor: &Actor,
        target: &Identity,
        requires_participation: bool,
        resolve: impl FnOnce(StageState) -> StageEvent,
    ) -> Result<StageTransition> {
        let outcome = self
            .try_transition(ctx, actor, target, requires_participation, resolve)
            .await
            .inspect_err(|e| Self::log_rejection(ctx, target, e))?;

        info!(
            room = %outcome.room,
            actor = %actor.identity(),
            target = %outcome.identity,
            from = %outcome.from,
            to = %outcome.to,
            "Stage transition applied"
        );
        Ok(outcome)
    }

    async fn try_transition(
        &self,
        ctx: &CallContext,
        actor: &Actor,
        target: &Identity,
        requires_participation: bool,
        resolve: impl FnOnce(StageState) -> StageEvent,
    ) -> Result<StageTransition> {
        if requires_participation && !ctx.config.allow_participation {
            return Err(Error::ParticipationDisabled);
        }

        let record = self.load_participant(ctx.room(), target).await?;
        let from = ParticipantMetadata::decode(record.metadata.as_deref()).state();
        let event = resolve(from);

        if ctx.config.is_creator(target) {
            return Err(Error::IllegalTransition {
                from: StageState::OnStage,
                event,
            });
        }

        let to = stage::apply(from, event, actor, target)?;
        self.write(ctx.room(), target, to).await?;

        Ok(StageTransition {
            room: ctx.room().clone(),
            identity: target.clone(),
            from,
            to,
        })
    }

    async fn load_participant(
        &self,
        room: &RoomName,
        identity: &Identity,
    ) -> Result<ParticipantRecord> {
        self.transport
            .participant(room, identity)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Participant {identity} not found")))
    }

    async fn write(&self, room: &RoomName, identity: &Identity, state: StageState) -> Result<()> {
        let update = ParticipantUpdate {
            metadata: state.metadata().encode()?,
            can_publish: state.can_publish(),
        };

        self.transport
            .update_participant(room, identity, update)
            .await
            .map_err(|e| match e {
                Error::NotFound(msg) => Error::NotFound(msg),
                other => Error::UpstreamWrite(other.to_string()),
            })
    }

    fn log_rejection(ctx: &CallContext, target: &Identity, err: &Error) {
        warn!(
            room = %ctx.room(),
            caller = %ctx.session.identity,
            target = %target,
            code = err.code(),
            error = %err,
            "Stage operation rejected"
        );
    }
}
