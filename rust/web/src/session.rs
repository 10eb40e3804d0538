use crate::errors::{ErrorSeverity, IntoErrorResponse};
use crate::events::{EventBus, ServerEvent};
use crate::persistence::{PersistenceError, SnapshotStore};
use crate::protocol::normalize_code;
use crate::view::{roster, GameView};
use letterbox_engine::cards::Card;
use letterbox_engine::errors::GameError;
use letterbox_engine::game::{ChatEntry, GameState};
use letterbox_engine::player::PlayerId;
use letterbox_engine::round::{self, PlayOutcome, TurnOutcome};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

pub type GameCode = String;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

const CODE_LEN: usize = 4;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: usize = 64;

/// One live game. The state sits behind an async mutex so actions on the
/// same code run one at a time, in the order they queued.
pub struct GameSession {
    code: GameCode,
    state: AsyncMutex<GameState>,
    last_active: Mutex<Instant>,
    deleted: AtomicBool,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("code", &self.code)
            .field("busy", &self.is_busy())
            .finish()
    }
}

impl GameSession {
    fn new(state: GameState) -> Self {
        Self {
            code: state.code().to_string(),
            state: AsyncMutex::new(state),
            last_active: Mutex::new(Instant::now()),
            deleted: AtomicBool::new(false),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Wait for exclusive access to the state.
    pub async fn lock(&self) -> MutexGuard<'_, GameState> {
        let guard = self.state.lock().await;
        self.touch();
        guard
    }

    /// Lock the state for an action. Fails once the game has been deleted,
    /// so actions that queued behind the delete never touch it.
    pub async fn acquire(&self) -> Result<MutexGuard<'_, GameState>, SessionError> {
        let guard = self.lock().await;
        if self.is_deleted() {
            return Err(SessionError::NotFound(self.code.clone()));
        }
        Ok(guard)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    /// An action holds the lock; such a session must not be evicted.
    pub fn is_busy(&self) -> bool {
        self.state.try_lock().is_err()
    }

    fn touch(&self) {
        if let Ok(mut guard) = self.last_active.lock() {
            *guard = Instant::now();
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        match self.last_active.lock() {
            Ok(last) => last.elapsed() >= ttl,
            Err(_) => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn force_last_active(&self, instant: Instant) {
        if let Ok(mut guard) = self.last_active.lock() {
            *guard = instant;
        }
    }
}

/// Live sessions by code.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<GameCode, Arc<GameSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &str) -> Result<Option<Arc<GameSession>>, SessionError> {
        let guard = self
            .sessions
            .read()
            .map_err(|_| SessionError::StoragePoisoned)?;
        Ok(guard.get(code).cloned())
    }

    /// Return the resident session, or install one built by `init`. When two
    /// callers race, both get the same session and only one `init` result
    /// is kept.
    pub fn get_or_create<F>(&self, code: &str, init: F) -> Result<Arc<GameSession>, SessionError>
    where
        F: FnOnce() -> GameState,
    {
        let mut guard = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoragePoisoned)?;
        let session = guard
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(GameSession::new(init())));
        Ok(Arc::clone(session))
    }

    /// Register a fresh game under a newly generated code.
    pub fn insert_new<F>(&self, init: F) -> Result<Arc<GameSession>, SessionError>
    where
        F: FnOnce(&str) -> GameState,
    {
        let mut guard = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoragePoisoned)?;
        let mut rng = rand::rng();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code(&mut rng);
            if guard.contains_key(&code) {
                continue;
            }
            let session = Arc::new(GameSession::new(init(&code)));
            guard.insert(code, Arc::clone(&session));
            return Ok(session);
        }
        Err(SessionError::InvalidAction(
            "Could not allocate a game code".to_string(),
        ))
    }

    pub fn remove(&self, code: &str) -> Result<Option<Arc<GameSession>>, SessionError> {
        let mut guard = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoragePoisoned)?;
        Ok(guard.remove(code))
    }

    /// Evict idle sessions whose lock is free. Returns the evicted codes.
    pub fn cleanup_expired(&self, ttl: Duration) -> Vec<GameCode> {
        let mut expired = Vec::new();
        let mut guard = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.retain(|code, session| {
            if session.is_expired(ttl) && !session.is_busy() {
                expired.push(code.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn codes(&self) -> Vec<GameCode> {
        match self.sessions.read() {
            Ok(guard) => guard.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> GameCode {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Action boundary between the transport and the game engine.
///
/// Every operation resolves the session, runs under its lock, writes the
/// snapshot while still holding the lock and then publishes events, so
/// clients of one game see updates in the order they were applied.
#[derive(Debug)]
pub struct SessionManager {
    registry: SessionRegistry,
    store: Arc<dyn SnapshotStore>,
    event_bus: Arc<EventBus>,
    session_ttl: Duration,
}

impl SessionManager {
    pub fn new(event_bus: Arc<EventBus>, store: Arc<dyn SnapshotStore>) -> Self {
        Self::with_ttl(event_bus, store, DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(
        event_bus: Arc<EventBus>,
        store: Arc<dyn SnapshotStore>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            store,
            event_bus,
            session_ttl,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub async fn create_game(
        &self,
        connection: &PlayerId,
        player_name: &str,
    ) -> Result<GameCode, SessionError> {
        let name = validate_name(player_name)?;
        let session = self.registry.insert_new(|code: &str| GameState::new(code))?;
        let code = session.code().to_string();

        let state = {
            let mut state = session.acquire().await?;
            state.add_player(connection.clone(), name.clone())?;
            self.persist(&state).await;

            self.event_bus.join_room(&code, connection);
            self.event_bus
                .send_to(connection, ServerEvent::GameCreated { code: code.clone() });
            self.broadcast_players(&state);
            state
        };

        tracing::info!(
            code = %code,
            player_id = %connection,
            player_name = %name,
            players = state.players().len(),
            "game created"
        );
        Ok(code)
    }

    pub async fn join_game(
        &self,
        connection: &PlayerId,
        code: &str,
        player_name: &str,
    ) -> Result<(), SessionError> {
        let name = validate_name(player_name)?;
        let session = self.resolve(code).await?;

        let mut state = session.acquire().await?;
        state.add_player(connection.clone(), name.clone())?;
        self.persist(&state).await;

        self.event_bus.join_room(session.code(), connection);
        self.event_bus.send_to(
            connection,
            ServerEvent::JoinResult {
                ok: true,
                message: None,
            },
        );
        self.broadcast_players(&state);

        tracing::info!(
            code = %session.code(),
            player_id = %connection,
            player_name = %name,
            "player joined"
        );
        Ok(())
    }

    /// Chat from a connection that is not seated in the game is ignored.
    pub async fn send_chat(
        &self,
        connection: &PlayerId,
        code: &str,
        message: &str,
    ) -> Result<(), SessionError> {
        let session = self.resolve(code).await?;
        let mut state = session.acquire().await?;

        let Some(sender) = state.player(connection).map(|p| p.name().to_string()) else {
            tracing::debug!(code = %session.code(), player_id = %connection, "chat from non-member ignored");
            return Ok(());
        };

        let entry = ChatEntry {
            sender,
            message: message.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        state.push_chat(entry.clone());
        self.persist(&state).await;

        self.event_bus.broadcast(
            session.code(),
            ServerEvent::Chat {
                sender: entry.sender,
                message: entry.message,
                timestamp: entry.timestamp,
            },
        );
        Ok(())
    }

    /// Deal the first round. Starting a game that already started is a
    /// no-op.
    pub async fn start_game(&self, connection: &PlayerId, code: &str) -> Result<(), SessionError> {
        let session = self.resolve(code).await?;
        let mut state = session.acquire().await?;

        if state.is_started() {
            tracing::debug!(code = %session.code(), "start ignored, game already started");
            return Ok(());
        }

        let mut rng = ChaCha20Rng::seed_from_u64(rand::random());
        round::start_game(&mut state, &mut rng)?;
        self.persist(&state).await;

        self.event_bus.broadcast_with(session.code(), |viewer| ServerEvent::Start {
            state: GameView::render(&state, Some(viewer)),
        });
        self.broadcast_update(&state);

        tracing::info!(
            code = %session.code(),
            player_id = %connection,
            players = state.players().len(),
            tokens_to_win = state.tokens_to_win(),
            "game started"
        );
        Ok(())
    }

    pub async fn play_card(
        &self,
        connection: &PlayerId,
        code: &str,
        card_index: usize,
        target_id: Option<&str>,
        guessed_card: Option<&str>,
    ) -> Result<PlayOutcome, SessionError> {
        let guess = guessed_card.map(Card::from_str).transpose()?;
        let target = target_id.map(PlayerId::from);
        let session = self.resolve(code).await?;
        let mut state = session.acquire().await?;

        let mut rng = ChaCha20Rng::seed_from_u64(rand::random());
        let outcome = round::play_card(
            &mut state,
            connection,
            card_index,
            target.as_ref(),
            guess,
            &mut rng,
        )?;
        self.persist(&state).await;

        tracing::debug!(
            code = %session.code(),
            player_id = %connection,
            card = %outcome.card,
            eliminated = outcome.effect.eliminated.len(),
            "card played"
        );

        if let Some(reveal) = &outcome.effect.reveal {
            self.event_bus.send_to(
                &reveal.viewer,
                ServerEvent::PrivateReveal {
                    target_id: reveal.target.clone(),
                    card: reveal.card,
                },
            );
        }
        self.broadcast_update(&state);

        if let TurnOutcome::RoundEnded(result) = &outcome.turn {
            tracing::info!(
                code = %session.code(),
                round = result.round,
                reason = ?result.reason,
                winners = ?result.winners,
                "round finished"
            );
            if !result.match_winners.is_empty() {
                tracing::info!(code = %session.code(), winners = ?result.match_winners, "match won");
                self.event_bus.broadcast(
                    session.code(),
                    ServerEvent::MatchWon {
                        code: session.code().to_string(),
                        winner_ids: result.match_winners.clone(),
                    },
                );
            }
        }

        Ok(outcome)
    }

    /// Current state as seen by `viewer`, or by a spectator.
    pub async fn view(&self, code: &str, viewer: Option<&PlayerId>) -> Result<GameView, SessionError> {
        let session = self.resolve(code).await?;
        let state = session.acquire().await?;
        Ok(GameView::render(&state, viewer))
    }

    /// A dropped connection keeps its seat; nothing in the game changes.
    pub fn disconnect(&self, connection: &PlayerId) {
        tracing::info!(player_id = %connection, "connection closed");
    }

    /// Remove the game from memory and the store. Actions queued on the
    /// session's lock, or resolving it before the removal completes, fail
    /// with [`SessionError::NotFound`].
    pub async fn delete_game(&self, code: &str) -> Result<(), SessionError> {
        let code = normalize_code(code);
        let resident = self.registry.get(&code)?;
        let _guard = match &resident {
            Some(session) => {
                session.mark_deleted();
                Some(session.lock().await)
            }
            None => None,
        };
        let stored = self
            .run_store({
                let code = code.clone();
                move |store| store.delete(&code)
            })
            .await;
        self.registry.remove(&code)?;
        let stored = stored?;

        if resident.is_none() && !stored {
            return Err(SessionError::NotFound(code));
        }

        self.event_bus.broadcast(
            &code,
            ServerEvent::GameEnded {
                code: code.clone(),
                reason: "terminated_by_request".into(),
            },
        );
        self.event_bus.drop_room(&code);
        tracing::info!(code = %code, "game deleted");
        Ok(())
    }

    /// Evict idle sessions from memory. Their snapshots stay in the store
    /// and their rooms stay on the bus, so a later action on the same code
    /// rehydrates the game and seated connections keep receiving events.
    pub fn cleanup_expired_sessions(&self) -> Vec<GameCode> {
        let expired = self.registry.cleanup_expired(self.session_ttl);
        for code in &expired {
            tracing::info!(code = %code, "evicted idle game");
        }
        expired
    }

    pub fn active_games(&self) -> Vec<GameCode> {
        self.registry.codes()
    }

    /// Resident session for `code`, rehydrated from the store if needed.
    async fn resolve(&self, code: &str) -> Result<Arc<GameSession>, SessionError> {
        let code = normalize_code(code);
        if let Some(session) = self.registry.get(&code)? {
            return Ok(session);
        }

        let snapshot = self
            .run_store({
                let code = code.clone();
                move |store| store.fetch(&code)
            })
            .await?;

        match snapshot {
            Some(state) => {
                tracing::info!(code = %code, "rehydrated game from snapshot");
                self.registry.get_or_create(&code, || state)
            }
            None => Err(SessionError::NotFound(code)),
        }
    }

    /// Write the snapshot. A failed write is logged and the game carries on
    /// from memory.
    async fn persist(&self, state: &GameState) {
        let snapshot = state.clone();
        let result = self.run_store(move |store| store.upsert(&snapshot)).await;
        if let Err(err) = result {
            tracing::error!(
                code = %state.code(),
                error = %err,
                "failed to persist game snapshot"
            );
        }
    }

    async fn run_store<T, F>(&self, f: F) -> Result<T, PersistenceError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SnapshotStore) -> Result<T, PersistenceError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| PersistenceError::Join(e.to_string()))?
    }

    fn broadcast_players(&self, state: &GameState) {
        self.event_bus.broadcast(
            state.code(),
            ServerEvent::Players {
                code: state.code().to_string(),
                players: roster(state, None),
            },
        );
    }

    fn broadcast_update(&self, state: &GameState) {
        self.event_bus.broadcast_with(state.code(), |viewer| ServerEvent::Update {
            state: GameView::render(state, Some(viewer)),
        });
    }
}

fn validate_name(name: &str) -> Result<String, SessionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::InvalidAction(
            "Player name is required".to_string(),
        ));
    }
    Ok(name.to_string())
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Game not found: {0}")]
    NotFound(GameCode),
    #[error("{0}")]
    InvalidAction(String),
    #[error(transparent)]
    Rule(#[from] GameError),
    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Session storage poisoned")]
    StoragePoisoned,
}

impl IntoErrorResponse for SessionError {
    fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::InvalidAction(_) | SessionError::Rule(_) => StatusCode::BAD_REQUEST,
            SessionError::Persistence(_) | SessionError::StoragePoisoned => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => "game_not_found",
            SessionError::InvalidAction(_) | SessionError::Rule(_) => "invalid_action",
            SessionError::Persistence(_) => "persistence_error",
            SessionError::StoragePoisoned => "session_storage_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            SessionError::NotFound(code) => Some(serde_json::json!({ "code": code })),
            _ => None,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            SessionError::StoragePoisoned => ErrorSeverity::Critical,
            SessionError::Persistence(_) => ErrorSeverity::Server,
            _ => ErrorSeverity::Client,
        }
    }
}
