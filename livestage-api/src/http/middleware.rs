// HTTP middleware

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AppError;

/// Raw session token taken from the `Authorization` header
///
/// Accepts both `Token <jwt>` and `Bearer <jwt>`. Verification happens in the
/// core services, so a syntactically present token is all this checks.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let value = header
            .to_str()
            .map_err(|_| AppError::unauthorized("Invalid Authorization header"))?;

        parse_authorization(value)
            .map(|token| Self(token.to_string()))
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))
    }
}

fn parse_authorization(value: &str) -> Option<&str> {
    let token = value
        .strip_prefix("Token ")
        .or_else(|| value.strip_prefix("Bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}
