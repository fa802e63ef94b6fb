use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::IdentityProvider;
use crate::{
    models::{AuthenticatedSession, Identity, RoomName},
    Error, Result,
};

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Participant identity
    pub sub: String,
    /// Room the session is bound to
    pub room: String,
    /// Whether the session belongs to the room's host
    #[serde(default)]
    pub host: bool,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl From<SessionClaims> for AuthenticatedSession {
    fn from(claims: SessionClaims) -> Self {
        Self {
            identity: Identity::from_string(claims.sub),
            room_name: RoomName::from_string(claims.room),
            is_host: claims.host,
        }
    }
}

/// Signs and verifies session tokens (HS256)
#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionTokenService {
    pub fn new(secret: &[u8], ttl_hours: u64) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::InvalidInput("Session secret must not be empty".to_string()));
        }
        let ttl = i64::try_from(ttl_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| Error::InvalidInput(format!("Session TTL too large: {ttl_hours}h")))?;

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            ttl,
        })
    }

    /// Mint a session token for `identity` in `room`
    pub fn sign(&self, identity: &Identity, room: &RoomName, is_host: bool) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: identity.as_str().to_string(),
            room: room.as_str().to_string(),
            host: is_host,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign session token: {e}")))
    }

    /// Verify a session token and extract claims
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 60; // 60 seconds leeway for clock skew

        let token_data: TokenData<SessionClaims> =
            decode(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Authentication("Session expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    Error::Authentication("Invalid session signature".to_string())
                }
                _ => Error::Authentication(format!("Invalid session token: {e}")),
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl IdentityProvider for SessionTokenService {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedSession> {
        self.verify(token).map(AuthenticatedSession::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> SessionTokenService {
        SessionTokenService::new(b"test-secret-test-secret", 1).unwrap()
    }

    #[tokio::test]
    async fn test_sign_and_authenticate() {
        let svc = service();
        let token = svc
            .sign(&Identity::from("alice"), &RoomName::from("studio"), false)
            .unwrap();

        let session = svc.authenticate(&token).await.unwrap();
        assert_eq!(session.identity.as_str(), "alice");
        assert_eq!(session.room_name.as_str(), "studio");
        assert!(!session.is_host);
    }

    #[test]
    fn test_claims_expiry_follows_ttl() {
        let svc = service();
        let token = svc.sign(&Identity::from("host"), &RoomName::from("studio"), true).unwrap();
        let claims = svc.verify(&token).unwrap();
        assert!(claims.host);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service()
            .sign(&Identity::from("alice"), &RoomName::from("studio"), true)
            .unwrap();
        let other = SessionTokenService::new(b"another-secret", 1).unwrap();
        assert!(matches!(other.verify(&token), Err(Error::Authentication(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();
        let past = Utc::now() - Duration::hours(2);
        let claims = SessionClaims {
            sub: "alice".to_string(),
            room: "studio".to_string(),
            host: false,
            iat: past.timestamp(),
            exp: (past + Duration::minutes(5)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret-test-secret"),
        )
        .unwrap();

        match svc.verify(&token) {
            Err(Error::Authentication(msg)) => assert_eq!(msg, "Session expired"),
            other => panic!("expected expiry error, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_and_empty_secret() {
        assert!(matches!(service().verify("not-a-jwt"), Err(Error::Authentication(_))));
        assert!(SessionTokenService::new(b"", 1).is_err());
    }
}
