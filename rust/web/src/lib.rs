//! Realtime server for a Love Letter style elimination card game.
//!
//! Clients talk to it over a WebSocket at `/ws`; every game lives behind a
//! [`SessionManager`] that serializes actions per game code, snapshots the
//! state to a [`SnapshotStore`] and fans events out through the
//! [`EventBus`].

pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod persistence;
pub mod protocol;
pub mod server;
pub mod session;
pub mod settings;
pub mod view;

pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use events::{EventBus, EventSubscription, ServerEvent};
pub use logging::{init_logging, init_test_logging, LogEntry, TestLogSubscriber};
pub use middleware::{log_response, with_request_logging};
pub use persistence::{MemoryStore, PersistenceError, SnapshotStore, SqliteStore};
pub use protocol::ClientMessage;
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use session::{GameCode, SessionError, SessionManager};
pub use settings::{ServerSettings, SettingsError, SettingsOverrides};
pub use view::{GameView, PlayerView};
