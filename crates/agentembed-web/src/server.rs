//! Router assembly and startup.
//!
//! [`EmbedServer`] registers the embed routes under both public paths,
//! stamps the CORS headers on every response and starts the listener.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::routing::{MethodRouter, get};
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::WebConfig;
use crate::embed;
use crate::state::AppState;

/// Primary embed path.
pub const EMBED_PATH: &str = "/embed";

/// Path the generated client posts chat turns to.
pub const CHAT_PATH: &str = "/functions/v1/cerebras-chat";

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// `GET`/`POST`/`OPTIONS` handlers shared by both embed paths.
fn embed_routes() -> MethodRouter<Arc<AppState>> {
    get(embed::document)
        .post(embed::chat)
        .options(embed::preflight)
}

pub struct EmbedServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl EmbedServer {
    pub fn new(state: AppState) -> Self {
        Self {
            config: state.config.clone(),
            state: Arc::new(state),
        }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        Router::new()
            .route(EMBED_PATH, embed_routes())
            .route(CHAT_PATH, embed_routes())
            .route("/health", get(embed::health))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static(ALLOW_ORIGIN),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOW_HEADERS),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOW_METHODS),
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Bind the configured address and serve until shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let router = self.router();
        tracing::info!(
            addr = %listener.local_addr()?,
            upstream = self.state.llm.is_some(),
            "starting embed server"
        );
        axum::serve(listener, router).await?;
        Ok(())
    }
}
