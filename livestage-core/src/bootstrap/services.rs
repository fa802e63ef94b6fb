//! Service initialization and dependency injection

use std::sync::Arc;

use tracing::info;

use crate::{
    service::{SessionTokenService, StageGateway, StreamService},
    transport::{InMemoryTransport, MediaTransport},
    Config, Result,
};

/// Container for all initialized services
#[derive(Clone)]
pub struct Services {
    /// Media transport collaborator
    pub transport: Arc<dyn MediaTransport>,
    /// Session token issuer and verifier
    pub session_tokens: SessionTokenService,
    /// Stage invite / raise-hand / remove operations
    pub stage_gateway: Arc<StageGateway>,
    /// Create / join / stop stream operations
    pub stream_service: Arc<StreamService>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("session_tokens", &self.session_tokens)
            .finish_non_exhaustive()
    }
}

/// Build services on top of the in-process transport
pub fn init_services(config: &Config) -> Result<Services> {
    let transport: Arc<dyn MediaTransport> =
        Arc::new(InMemoryTransport::new(config.transport.broadcast_capacity));
    info!(
        broadcast_capacity = config.transport.broadcast_capacity,
        "In-memory media transport initialized"
    );
    init_services_with_transport(config, transport)
}

/// Build services on top of an existing transport
pub fn init_services_with_transport(
    config: &Config,
    transport: Arc<dyn MediaTransport>,
) -> Result<Services> {
    let session_tokens = SessionTokenService::new(
        config.session.secret.as_bytes(),
        config.session.token_ttl_hours,
    )?;

    let stage_gateway = Arc::new(StageGateway::new(
        transport.clone(),
        Arc::new(session_tokens.clone()),
    ));
    let stream_service = Arc::new(StreamService::new(transport.clone(), session_tokens.clone()));

    info!("Services initialized");
    Ok(Services {
        transport,
        session_tokens,
        stage_gateway,
        stream_service,
    })
}
