//! Stage participation handlers
//!
//! Successful mutations answer with an empty JSON object; every failure goes
//! through [`AppError`](super::AppError) as `{"error": ..., "status": ...}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use livestage_core::{models::Identity, service::StageSnapshot};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::{Stream, StreamExt};

use super::{middleware::SessionToken, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub identity: Identity,
}

pub async fn invite_to_stage(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    body: Result<Json<TargetRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(req) = body?;
    state
        .stage_gateway
        .invite_to_stage(&token, &req.identity)
        .await?;
    Ok(Json(json!({})))
}

pub async fn raise_hand(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Json<Value>> {
    state.stage_gateway.raise_hand(&token).await?;
    Ok(Json(json!({})))
}

pub async fn remove_from_stage(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    body: Result<Json<TargetRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(req) = body?;
    state
        .stage_gateway
        .remove_from_stage(&token, &req.identity)
        .await?;
    Ok(Json(json!({})))
}

pub async fn list_participants(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Json<StageSnapshot>> {
    let snapshot = state.stage_gateway.list_stage(&token).await?;
    Ok(Json(snapshot))
}

/// Server-sent stage updates for the caller's room
pub async fn stage_events(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let updates = state.stage_gateway.watch_stage(&token).await?;
    let events = updates.map(|update| Event::default().event("stage").json_data(update));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
