//! Stream lifecycle handlers

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use livestage_core::service::{CreateStreamRequest, JoinStreamRequest, StreamSession};
use serde_json::{json, Value};

use super::{middleware::SessionToken, AppResult, AppState};

pub async fn create_stream(
    State(state): State<AppState>,
    body: Result<Json<CreateStreamRequest>, JsonRejection>,
) -> AppResult<Json<StreamSession>> {
    let Json(req) = body?;
    let session = state.stream_service.create_stream(req).await?;
    Ok(Json(session))
}

pub async fn join_stream(
    State(state): State<AppState>,
    body: Result<Json<JoinStreamRequest>, JsonRejection>,
) -> AppResult<Json<StreamSession>> {
    let Json(req) = body?;
    let session = state.stream_service.join_stream(req).await?;
    Ok(Json(session))
}

pub async fn stop_stream(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Json<Value>> {
    state.stream_service.stop_stream(&token).await?;
    Ok(Json(json!({})))
}

pub async fn leave_stream(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Json<Value>> {
    state.stream_service.leave_stream(&token).await?;
    Ok(Json(json!({})))
}
