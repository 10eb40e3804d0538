use crate::events::EventBus;
use crate::handlers;
use crate::middleware::with_request_logging;
use crate::persistence::{MemoryStore, PersistenceError, SnapshotStore, SqliteStore};
use crate::session::{SessionManager, DEFAULT_SESSION_TTL};
use crate::settings::{ServerSettings, SettingsError};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use warp::filters::BoxedFilter;
use warp::http::Method;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// How often idle games are swept out of memory.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
    allowed_origins: Vec<String>,
    session_ttl: Duration,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            allowed_origins: Vec::new(),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            allowed_origins: if settings.allows_any_origin() {
                Vec::new()
            } else {
                settings.allowed_origins.clone()
            },
            session_ttl: settings.session_ttl(),
        }
    }

    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0)
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Empty means any origin.
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    event_bus: Arc<EventBus>,
    sessions: Arc<SessionManager>,
}

impl AppContext {
    pub fn new(config: ServerConfig, store: Arc<dyn SnapshotStore>) -> Self {
        let event_bus = Arc::new(EventBus::new());
        let sessions = Arc::new(SessionManager::with_ttl(
            Arc::clone(&event_bus),
            store,
            config.session_ttl(),
        ));
        Self::new_with_dependencies(config, event_bus, sessions)
    }

    pub fn new_with_dependencies(
        config: ServerConfig,
        event_bus: Arc<EventBus>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            config,
            event_bus,
            sessions,
        }
    }

    pub fn new_for_tests() -> Self {
        Self::new(ServerConfig::for_tests(), Arc::new(MemoryStore::new()))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    /// Build a server backed by the SQLite file named in `settings`.
    pub fn from_settings(settings: &ServerSettings) -> Result<Self, ServerError> {
        let store = SqliteStore::open(settings.database_path()?)?;
        let context = AppContext::new(ServerConfig::from_settings(settings), Arc::new(store));
        Ok(Self { context })
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let config = context.config().clone();
        let bind_addr = Self::bind_addr(&config)?;

        let preflight = if bind_addr.port() != 0 {
            Some(std::net::TcpListener::bind(bind_addr).map_err(ServerError::BindError)?)
        } else {
            None
        };
        drop(preflight);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let filter = Self::filter(&context);
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(filter)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(%addr, "letterbox server listening");

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });
        let cleanup = Self::spawn_cleanup(context.sessions(), CLEANUP_INTERVAL);

        Ok(ServerHandle::new(addr, shutdown_tx, task, cleanup, context))
    }

    /// Every route plus request logging and CORS.
    pub fn filter(
        context: &AppContext,
    ) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let cors = Self::cors(context.config());
        with_request_logging(Self::routes(context)).with(cors)
    }

    pub fn routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        Self::health_route()
            .or(Self::ws_route(context))
            .unify()
            .or(Self::api_routes(context))
            .unify()
            .boxed()
    }

    fn cors(config: &ServerConfig) -> warp::cors::Builder {
        let builder = warp::cors()
            .allow_methods(vec![Method::GET, Method::DELETE, Method::OPTIONS])
            .allow_headers(vec!["content-type"]);

        if config.allowed_origins().is_empty() {
            builder.allow_any_origin()
        } else {
            builder.allow_origins(config.allowed_origins().iter().map(String::as_str))
        }
    }

    fn spawn_cleanup(sessions: Arc<SessionManager>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticks = IntervalStream::new(tokio::time::interval(every));
            while ticks.next().await.is_some() {
                let evicted = sessions.cleanup_expired_sessions();
                if !evicted.is_empty() {
                    tracing::debug!(count = evicted.len(), "cleanup pass evicted games");
                }
            }
        })
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(source) = err.source() {
            if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
                let recreated = std::io::Error::new(io_err.kind(), io_err.to_string());
                return ServerError::BindError(recreated);
            }
        }

        ServerError::ConfigError(err.to_string())
    }

    fn health_route() -> BoxedFilter<(Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .map(|| handlers::health().into_response())
            .boxed()
    }

    fn ws_route(context: &AppContext) -> BoxedFilter<(Response,)> {
        warp::path("ws")
            .and(warp::path::end())
            .and(warp::ws())
            .and(Self::with_session_manager(context.sessions()))
            .and(Self::with_event_bus(context.event_bus()))
            .map(
                |ws: warp::ws::Ws, sessions: Arc<SessionManager>, event_bus: Arc<EventBus>| {
                    ws.on_upgrade(move |socket| handlers::handle_socket(socket, sessions, event_bus))
                        .into_response()
                },
            )
            .boxed()
    }

    fn api_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let get = warp::path!("api" / "games" / String)
            .and(warp::get())
            .and(Self::with_session_manager(sessions.clone()))
            .and_then(|code: String, sessions: Arc<SessionManager>| async move {
                Ok::<_, Infallible>(handlers::get_game(sessions, code).await)
            });

        let delete = warp::path!("api" / "games" / String)
            .and(warp::delete())
            .and(Self::with_session_manager(sessions))
            .and_then(|code: String, sessions: Arc<SessionManager>| async move {
                Ok::<_, Infallible>(handlers::delete_game(sessions, code).await)
            });

        get.or(delete).unify().boxed()
    }

    fn with_session_manager(
        sessions: Arc<SessionManager>,
    ) -> impl Filter<Extract = (Arc<SessionManager>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&sessions))
    }

    fn with_event_bus(
        event_bus: Arc<EventBus>,
    ) -> impl Filter<Extract = (Arc<EventBus>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&event_bus))
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    cleanup: Option<JoinHandle<()>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        cleanup: JoinHandle<()>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            cleanup: Some(cleanup),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup.abort();
        }

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        tracing::info!(addr = %self.addr, "letterbox server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup.abort();
        }

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
