use crate::errors::IntoErrorResponse;
use crate::session::{GameCode, SessionError, SessionManager};
use serde::Serialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Spectator view of a game.
///
/// # HTTP Method and Path
/// - **Method**: GET
/// - **Path**: `/api/games/{code}`
///
/// # Response Format
/// - **200 OK**: the game as a spectator sees it. No hand is included,
///   only `hand_size`; the deck appears as `deck_remaining`.
/// - **404 Not Found**: `game_not_found`, neither live nor in the store
///
/// A game that was evicted from memory is loaded back from its snapshot.
pub async fn get_game(sessions: Arc<SessionManager>, code: GameCode) -> Response {
    match sessions.view(&code, None).await {
        Ok(view) => success_response(StatusCode::OK, view),
        Err(err) => session_error(err),
    }
}

/// Remove a game from memory and from the store.
///
/// # HTTP Method and Path
/// - **Method**: DELETE
/// - **Path**: `/api/games/{code}`
///
/// Connected players receive `game_ended` with reason
/// `terminated_by_request`. Responds `204 No Content`, or `404` when the
/// code is unknown.
pub async fn delete_game(sessions: Arc<SessionManager>, code: GameCode) -> Response {
    match sessions.delete_game(&code).await {
        Ok(()) => reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response(),
        Err(err) => session_error(err),
    }
}

fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

fn session_error(err: SessionError) -> Response {
    err.into_http_response()
}
