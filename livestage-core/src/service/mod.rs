pub mod auth;
pub mod gateway;
pub mod stage;
pub mod stream;

pub use auth::{IdentityProvider, SessionClaims, SessionTokenService};
pub use gateway::{ParticipantView, StageGateway, StageSnapshot, StageTransition, StageUpdate};
pub use stream::{
    ConnectionDetails, CreateStreamRequest, JoinStreamRequest, StreamService, StreamSession,
};
