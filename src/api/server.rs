//! API Server

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::{config::ApiConfig, services::ServiceContainer};
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

pub struct ApiServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, services: &ServiceContainer) -> Self {
        let context = services.context();
        let state = Arc::new(AppState {
            betting: services.betting(),
            query: services.query(),
            engine: services.engine(),
            notifier: context.notifier.clone(),
            metrics: context.metrics.clone(),
            history_limit: services.config().engine.history_limit,
            version: env!("CARGO_PKG_VERSION").to_string(),
        });
        Self { config, state }
    }

    /// Router with the full middleware stack
    pub fn create_app(&self) -> axum::Router {
        create_router(self.state.clone())
            // Request ID first so every later layer can see it
            .layer(axum::middleware::from_fn(request_id_middleware))
            // CORS before timeout so preflight is answered directly
            .layer(create_cors_layer(self.config.allowed_origins.clone()))
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.create_app();
        let addr = self.socket_addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("Wingo API listening on http://{}", addr);
        info!("   CORS: {:?}", self.config.allowed_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server stopped");
        Ok(())
    }

    fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }
}
