use serde::Serialize;
use warp::reply::Json;

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

/// Liveness probe. Does not touch sessions or storage.
pub fn health() -> Json {
    warp::reply::json(&HealthBody { status: "ok" })
}
