//! HTTP serving for procurement-api
//!
//! [`app`] wraps the API router in the request-level layers every deployment
//! runs with. [`Server`] owns a bound listener so the real address is known
//! before serving starts, which also lets tests bind port 0.

pub mod middleware;
pub mod router;

pub use middleware::{auth_middleware, logging_middleware, tracing_middleware};
pub use router::{build_router, AppState, HealthResponse};

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::database::Database;

/// Server startup and serving errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `server.host` is not an IP address
    #[error("server.host {0:?} is not an IP address")]
    InvalidHost(String),

    /// The listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Listener or connection failure after binding
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// API router with request logging, tracing spans and gzip applied
pub fn app<D: Database + 'static>(state: AppState<D>) -> Router {
    build_router(state)
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(axum::middleware::from_fn(tracing_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}

/// A bound listener and the application served on it
pub struct Server {
    listener: TcpListener,
    app: Router,
}

impl Server {
    /// Bind `config.host:config.port` for `state`
    pub async fn bind<D: Database + 'static>(
        config: &ServerConfig,
        state: AppState<D>,
    ) -> Result<Self, ServerError> {
        let host: IpAddr = config
            .host
            .parse()
            .map_err(|_| ServerError::InvalidHost(config.host.clone()))?;
        let addr = SocketAddr::new(host, config.port);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            app: app(state),
        })
    }

    /// Address actually bound, with the real port when 0 was configured
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        info!(%addr, "Procurement API listening");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
