//! HTTP server implementation
//!
//! Wires the redirect service, the HTTP router and the background
//! scheduler into one process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::scheduler::EventScheduler;
use crate::service::RedirectService;

use super::api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Redirect state plus remote publisher
    pub service: RedirectService,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: RedirectService) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// App Server
// ============================================================================

/// The redirect HTTP server
pub struct AppServer {
    config: Config,
    state: AppState,
}

impl AppServer {
    /// Create a new server around an already loaded service
    pub fn new(config: Config, service: RedirectService) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        Ok(Self {
            config,
            state: AppState::new(service),
        })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Address the server listens on
    pub fn bind_address(&self) -> Result<SocketAddr, ServerError> {
        let stored_port = self.state.service.state().port();
        self.config
            .bind_address(stored_port)
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve until `shutdown_signal` resolves, then stop the scheduler
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.bind_address()?;

        let scheduler = if self.config.scheduler.enabled {
            let service = &self.state.service;
            let scheduler = EventScheduler::new(
                service.state().clone(),
                service.publisher().clone(),
                self.config.scheduler.clone(),
            )
            .map_err(|e| ServerError::Init(e.to_string()))?;
            Some(Arc::new(scheduler).spawn())
        } else {
            tracing::info!("Event scheduler disabled");
            None
        };

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{addr}: {e}")))?;

        tracing::info!("Redirect server listening on {}", addr);

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()));

        if let Some(handle) = scheduler {
            if let Err(e) = handle.stop().await {
                tracing::warn!(error = %e, "Scheduler did not stop cleanly");
            }
        }

        served?;
        tracing::info!("Redirect server shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        let redirect_state = self.state.service.state();
        ServerInfo {
            host: self.config.server.host.clone(),
            port: self
                .config
                .server
                .port
                .unwrap_or_else(|| redirect_state.port()),
            data_dir: self.config.storage.data_dir.display().to_string(),
            scheduler_enabled: self.config.scheduler.enabled,
            poll_interval_secs: self.config.scheduler.poll_interval_secs,
            cors_enabled: self.config.server.enable_cors,
            api_key_required: redirect_state.is_api_key_enabled(),
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    pub scheduler_enabled: bool,
    pub poll_interval_secs: u64,
    pub cors_enabled: bool,
    pub api_key_required: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "EZ Redirect Server\n\
             {:-<40}\n\
             Listen: {}:{}\n\
             Data Directory: {}\n\
             Scheduler: {}\n\
             CORS: {}\n\
             API Key: {}",
            "",
            self.host,
            self.port,
            self.data_dir,
            if self.scheduler_enabled {
                format!("every {}s", self.poll_interval_secs)
            } else {
                "disabled".to_string()
            },
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.api_key_required { "required" } else { "not required" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

// ============================================================================
// Tests
// ============================================================================
