//! HTTP server
//!
//! `ApiServer` owns its configuration, middleware pipeline, route table and a
//! handle on the object graph. Nothing is registered globally, so several
//! servers can coexist in one process.
//!
//! Request flow: resolve the route, run the middleware pipeline, then run the
//! matched handler. Requests that match no route get a plain 404 without
//! touching middleware or the graph.

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::assets::{AssetSource, EmbeddedAssets};
use crate::graph::Fleet;
use crate::server::handlers::{self, HandlerContext};
use crate::server::middleware::{BasicAuth, DebugLogger, Middleware, Pipeline};
use crate::server::routes::{api_routes, Operation, RouteTable};
use crate::server::tls::{self, TlsConfig, TlsError};

pub const DEFAULT_PORT: &str = "3000";

/// Default max request body size (256KB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 262144;

/// Default bound on a single command invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid listen address {addr}: {source}")]
    Address {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("listen address {0} did not resolve")]
    Unresolved(String),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("listener failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("listener task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Server configuration. Fixed once `start` is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Bind host; empty means all interfaces
    pub host: String,
    pub port: String,
    /// TLS certificate path (PEM)
    pub cert: Option<PathBuf>,
    /// TLS private key path (PEM)
    pub key: Option<PathBuf>,
    /// Bound on a single command invocation; `None` waits forever
    pub command_timeout: Option<Duration>,
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT.to_string(),
            cert: None,
            key: None,
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ApiConfig {
    /// `host:port` as configured.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tls(&self) -> Option<TlsConfig> {
        TlsConfig::from_paths(self.cert.as_deref(), self.key.as_deref())
    }
}

struct ApiState {
    routes: RouteTable<Operation>,
    pipeline: Pipeline,
    ctx: HandlerContext,
    max_body_bytes: usize,
}

/// The command gateway.
pub struct ApiServer {
    config: ApiConfig,
    fleet: Arc<dyn Fleet>,
    assets: Arc<dyn AssetSource>,
    pipeline: Pipeline,
    credentials: Option<(String, String)>,
}

impl ApiServer {
    pub fn new(fleet: Arc<dyn Fleet>) -> Self {
        Self::with_config(fleet, ApiConfig::default())
    }

    pub fn with_config(fleet: Arc<dyn Fleet>, config: ApiConfig) -> Self {
        Self {
            config,
            fleet,
            assets: Arc::new(EmbeddedAssets::empty()),
            pipeline: Pipeline::new(),
            credentials: None,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ApiConfig {
        &mut self.config
    }

    /// Serve static assets for paths the API routes do not claim.
    pub fn set_assets(&mut self, assets: Arc<dyn AssetSource>) {
        self.assets = assets;
    }

    /// Append a middleware entry. Entries run in the order they were added.
    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.pipeline.push(middleware);
    }

    /// Require HTTP Basic credentials on every routed request.
    ///
    /// The credential pair is fixed from here on; a second call is ignored.
    pub fn set_basic_auth(&mut self, username: &str, password: &str) {
        if self.credentials.is_some() {
            tracing::warn!(target: "auth", "basic auth already configured; ignoring");
            return;
        }
        self.credentials = Some((username.to_string(), password.to_string()));
        self.add_middleware(Arc::new(BasicAuth::new(username, password)));
    }

    /// Log every routed request.
    pub fn set_debug(&mut self) {
        self.add_middleware(Arc::new(DebugLogger));
    }

    pub fn has_basic_auth(&self) -> bool {
        self.credentials.is_some()
    }

    /// Build the axum router serving this gateway.
    pub fn router(&self) -> Router {
        let state = Arc::new(ApiState {
            routes: api_routes(),
            pipeline: self.pipeline.clone(),
            ctx: HandlerContext {
                fleet: Arc::clone(&self.fleet),
                assets: Arc::clone(&self.assets),
                command_timeout: self.config.command_timeout,
            },
            max_body_bytes: self.config.max_body_bytes,
        });
        Router::new().fallback(route_request).with_state(state)
    }

    /// Bind the listener and serve on a background task.
    ///
    /// Bind and TLS failures end the background task; they are logged and
    /// surface through [`RunningApi::join`], not here.
    pub fn start(self) -> RunningApi {
        let app = self.router();
        let config = self.config;
        info!("Initializing API on {}...", config.listen_addr());

        let handle = axum_server::Handle::new();
        let (stopped_tx, stopped) = watch::channel(false);
        let task = tokio::spawn(serve(app, config, handle.clone(), stopped_tx));
        RunningApi {
            handle,
            stopped,
            task,
        }
    }
}

async fn serve(
    app: Router,
    config: ApiConfig,
    handle: axum_server::Handle<SocketAddr>,
    stopped: watch::Sender<bool>,
) -> Result<(), ApiError> {
    let result = bind_and_serve(app, &config, handle).await;
    if let Err(e) = &result {
        error!(addr = %config.listen_addr(), error = %e, "API listener stopped");
    }
    stopped.send_replace(true);
    result
}

async fn bind_and_serve(
    app: Router,
    config: &ApiConfig,
    handle: axum_server::Handle<SocketAddr>,
) -> Result<(), ApiError> {
    let addr = resolve_addr(config).await?;
    let service = app.into_make_service();

    match config.tls() {
        Some(tls_config) => {
            let rustls = tls_config.load().await?;
            info!(addr = %addr, "API listening (TLS)");
            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(service)
                .await
                .map_err(ApiError::Serve)
        }
        None => {
            tls::warn_insecure();
            info!(addr = %addr, "API listening");
            axum_server::bind(addr)
                .handle(handle)
                .serve(service)
                .await
                .map_err(ApiError::Serve)
        }
    }
}

async fn resolve_addr(config: &ApiConfig) -> Result<SocketAddr, ApiError> {
    let host = if config.host.is_empty() {
        "0.0.0.0"
    } else {
        config.host.as_str()
    };
    let addr = format!("{}:{}", host, config.port);
    let mut resolved = tokio::net::lookup_host(addr.as_str())
        .await
        .map_err(|source| ApiError::Address {
            addr: addr.clone(),
            source,
        })?;
    resolved.next().ok_or_else(|| ApiError::Unresolved(addr.clone()))
}

/// A started gateway.
pub struct RunningApi {
    handle: axum_server::Handle<SocketAddr>,
    stopped: watch::Receiver<bool>,
    task: JoinHandle<Result<(), ApiError>>,
}

impl RunningApi {
    /// Address the listener bound to, once it is listening.
    ///
    /// `None` when the listener task ended without binding.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let mut stopped = self.stopped.clone();
        tokio::select! {
            biased;
            addr = self.handle.listening() => addr,
            _ = stopped.wait_for(|done| *done) => None,
        }
    }

    /// Stop accepting connections and let in-flight requests finish.
    pub fn shutdown(&self, grace: Duration) {
        self.handle.graceful_shutdown(Some(grace));
    }

    /// Handle that can stop the listener after `self` has been consumed.
    pub fn shutdown_handle(&self) -> axum_server::Handle<SocketAddr> {
        self.handle.clone()
    }

    /// Wait for the listener task to end.
    pub async fn join(self) -> Result<(), ApiError> {
        self.task.await?
    }
}

async fn route_request(State(state): State<Arc<ApiState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let Some((op, params)) = state.routes.resolve(&parts.method, parts.uri.path()) else {
        return not_found();
    };

    if let Some(halted) = state.pipeline.run(&parts) {
        return halted;
    }

    let body: Bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "discarding unreadable request body");
            Bytes::new()
        }
    };

    handlers::handle(&state.ctx, *op, &params, parts.uri.path(), &body).await
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "404 page not found",
    )
        .into_response()
}
