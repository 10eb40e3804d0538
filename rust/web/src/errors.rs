//! Error payloads shared by the WebSocket and HTTP surfaces.
//!
//! Every layer keeps its own `thiserror` enum. Anything that reaches a
//! client goes through [`IntoErrorResponse`], which picks the wire code,
//! the HTTP status and the log level in one place.
use serde::{Deserialize, Serialize};
use std::fmt;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Wire form of an error, used as the `error_msg` event body and as the
/// JSON body of failed HTTP requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "game_not_found")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Error classification for logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Rule violations and bad input. Expected during normal play.
    Client,
    /// Failures on our side that need investigation
    Server,
    /// Shared state can no longer be trusted
    Critical,
}

pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    /// Machine-readable code, stable across releases
    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        if let Some(details) = self.error_details() {
            ErrorResponse::with_details(self.error_code(), self.error_message(), details)
        } else {
            ErrorResponse::new(self.error_code(), self.error_message())
        }
    }

    /// Log at the level matching [`severity`](Self::severity) and return the
    /// payload to send back over the socket.
    fn report(&self) -> ErrorResponse {
        let response = self.to_error_response();
        log_error(self.severity(), &response);
        response
    }

    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        self.report().into_response(status)
    }
}

fn log_error(severity: ErrorSeverity, error: &ErrorResponse) {
    match severity {
        ErrorSeverity::Client => {
            tracing::info!(code = %error.error, detail = %error.message, "client error");
        }
        ErrorSeverity::Server => {
            tracing::error!(code = %error.error, detail = %error.message, "server error");
        }
        ErrorSeverity::Critical => {
            tracing::error!(
                code = %error.error,
                detail = %error.message,
                critical = true,
                "critical error"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::TestLogSubscriber;
    use serde_json::json;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    struct Broken;

    impl IntoErrorResponse for Broken {
        fn status_code(&self) -> StatusCode {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        fn error_code(&self) -> &'static str {
            "broken"
        }
        fn error_message(&self) -> String {
            "it broke".into()
        }
    }

    #[test]
    fn error_response_omits_missing_details() {
        let error = ErrorResponse::new("game_not_found", "Game not found: ABCD");
        let json = serde_json::to_value(&error).expect("serialize");

        assert_eq!(json["error"], "game_not_found");
        assert_eq!(json["message"], "Game not found: ABCD");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn error_response_with_details() {
        let error = ErrorResponse::with_details(
            "game_not_found",
            "Game not found",
            json!({ "code": "ABCD" }),
        );
        let json = serde_json::to_value(&error).expect("serialize");
        assert_eq!(json["details"]["code"], "ABCD");
    }

    #[test]
    fn error_response_display() {
        let error = ErrorResponse::new("invalid_action", "Not your turn");
        assert_eq!(error.to_string(), "invalid_action: Not your turn");
    }

    #[test]
    fn server_errors_are_logged_at_error_level() {
        let subscriber = TestLogSubscriber::new();
        let registry = Registry::default().with(subscriber.clone().into_layer::<Registry>());

        let response = tracing::subscriber::with_default(registry, || Broken.report());

        assert_eq!(response.error, "broken");
        assert_eq!(Broken.severity(), ErrorSeverity::Server);
        let entries = subscriber.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::ERROR);
        assert!(entries[0]
            .fields
            .iter()
            .any(|(k, v)| k == "code" && v.contains("broken")));
    }
}
