use std::time::Instant;
use warp::http::{Method, StatusCode};
use warp::path::FullPath;
use warp::reject::Rejection;
use warp::reply::Response;
use warp::Filter;

#[derive(Debug, Clone)]
struct RequestStart {
    path: String,
    method: String,
    started: Instant,
}

/// Log every request handled by `filter` with its status and duration.
pub fn with_request_logging<F>(
    filter: F,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone
where
    F: Filter<Extract = (Response,), Error = Rejection> + Clone + Send + Sync + 'static,
{
    warp::any()
        .and(warp::path::full())
        .and(warp::method())
        .map(|path: FullPath, method: Method| {
            tracing::debug!(path = %path.as_str(), method = %method, "incoming request");
            RequestStart {
                path: path.as_str().to_string(),
                method: method.to_string(),
                started: Instant::now(),
            }
        })
        .and(filter)
        .map(|request: RequestStart, response: Response| {
            log_response(
                response.status(),
                &request.path,
                &request.method,
                request.started.elapsed().as_millis(),
            );
            response
        })
}

pub fn log_response(status: StatusCode, path: &str, method: &str, duration_ms: u128) {
    if status.is_server_error() {
        tracing::error!(
            status = %status.as_u16(),
            path = %path,
            method = %method,
            duration_ms = duration_ms,
            "server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            status = %status.as_u16(),
            path = %path,
            method = %method,
            duration_ms = duration_ms,
            "client error"
        );
    } else {
        tracing::info!(
            status = %status.as_u16(),
            path = %path,
            method = %method,
            duration_ms = duration_ms,
            "response sent"
        );
    }
}
