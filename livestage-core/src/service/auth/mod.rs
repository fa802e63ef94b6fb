//! Session authentication

pub mod session;

pub use session::{SessionClaims, SessionTokenService};

use async_trait::async_trait;

use crate::{models::AuthenticatedSession, Result};

/// Identity collaborator: turns a bearer token into an authenticated caller
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedSession>;
}
