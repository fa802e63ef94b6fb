//! HTTP surface for stream and stage operations

pub mod error;
pub mod health;
pub mod middleware;
pub mod stage;
pub mod stream;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use livestage_core::{
    bootstrap::Services,
    service::{StageGateway, StreamService},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult, ErrorResponse};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub stage_gateway: Arc<StageGateway>,
    pub stream_service: Arc<StreamService>,
}

impl From<&Services> for AppState {
    fn from(services: &Services) -> Self {
        Self {
            stage_gateway: services.stage_gateway.clone(),
            stream_service: services.stream_service.clone(),
        }
    }
}

/// Build the application router
pub fn create_router(services: &Services) -> Router {
    let state = AppState::from(services);

    let api = Router::new()
        .route("/create_stream", post(stream::create_stream))
        .route("/join_stream", post(stream::join_stream))
        .route("/stop_stream", post(stream::stop_stream))
        .route("/leave_stream", post(stream::leave_stream))
        .route("/invite_to_stage", post(stage::invite_to_stage))
        .route("/raise_hand", post(stage::raise_hand))
        .route("/remove_from_stage", post(stage::remove_from_stage))
        .route("/participants", get(stage::list_participants))
        .route("/events", get(stage::stage_events));

    Router::new()
        .nest("/api", api)
        .merge(health::create_health_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
