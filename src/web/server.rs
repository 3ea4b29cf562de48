//! Web server for the drive API.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::Config;
use crate::file::FileStorage;
use crate::recycle::RecycleCleaner;
use crate::{Database, DriveError, Result};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::create_app;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Per-IP rate limiters.
    rate_limits: Arc<RateLimitState>,
    /// Full configuration.
    config: Config,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, db: Arc<Database>, storage: Arc<FileStorage>) -> Result<Self> {
        let addr = format!("{}:{}", config.web.host, config.web.port)
            .parse()
            .map_err(|e| DriveError::Config(format!("invalid web server address: {}", e)))?;

        let app_state = AppState::new(db, storage, config)?;
        let rate_limits = Arc::new(RateLimitState::new(
            config.web.login_rate_limit,
            config.web.api_rate_limit,
        ));

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            rate_limits,
            config: config.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind the listener and start the background tasks.
    async fn bind(self) -> std::io::Result<(TcpListener, axum::Router)> {
        let listener = TcpListener::bind(self.addr).await?;

        self.rate_limits.clone().start_cleanup_task();
        RecycleCleaner::new(
            self.app_state.db.clone(),
            self.app_state.storage.clone(),
            self.config.recycle.clone(),
        )
        .spawn();

        let router = create_app(self.app_state, self.rate_limits, &self.config.web.cors_origins);
        Ok((listener, router))
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
