//! HTTP server assembly: routes, middleware and graceful shutdown

mod auth;
mod health;
mod request_context;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use gateway_auth::CredentialGuard;
use gateway_config::Config;
use gateway_llm::{InvocationBackend, LlmState};
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server against Amazon Bedrock
    ///
    /// # Errors
    ///
    /// Returns an error if the expected API key cannot be read or the LLM
    /// state fails to initialize
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let llm_state = LlmState::from_config(config)
            .await
            .context("failed to initialize the bedrock client")?;

        Self::assemble(config, llm_state).await
    }

    /// Build the server over an arbitrary invocation backend
    ///
    /// # Errors
    ///
    /// Same as [`Server::new`]
    pub async fn with_backend(config: &Config, backend: Arc<dyn InvocationBackend>) -> anyhow::Result<Self> {
        let llm_state = LlmState::with_backend(config, backend)?;
        Self::assemble(config, llm_state).await
    }

    async fn assemble(config: &Config, llm_state: LlmState) -> anyhow::Result<Self> {
        let guard = CredentialGuard::from_config(&config.auth);
        guard
            .warm()
            .await
            .context("failed to load the expected API key")?;

        let mut app = Router::new();
        let mut public_paths = Vec::new();

        if config.server.health.enabled {
            let path = config.server.health.path.clone();
            app = app.route(&path, axum::routing::get(health::liveness));
            public_paths.push(path);
        }

        app = app.merge(gateway_llm::llm_router(llm_state));

        // Layers run outermost first: tracing, request context, then authentication
        app = app.layer(axum::middleware::from_fn(move |req, next| {
            let guard = guard.clone();
            let public_paths = public_paths.clone();
            async move { auth::auth_middleware(guard, public_paths, req, next).await }
        }));

        app = app.layer(axum::middleware::from_fn(request_context::request_context_middleware));

        app = app.layer(TraceLayer::new_for_http());

        Ok(Self {
            router: app,
            listen_address: config.server.listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Override the listen address, e.g. from the command line
    #[must_use]
    pub const fn with_listen_address(mut self, listen_address: SocketAddr) -> Self {
        self.listen_address = listen_address;
        self
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address)
            .await
            .with_context(|| format!("failed to bind {}", self.listen_address))?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
