// src/api/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::SentinelError;

/// Client-visible failures. Downstream problems never get here; they are
/// degraded to fallback content by the handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Sentinel(#[from] SentinelError),
}

impl ApiError {
    pub fn missing(field: &str) -> Self {
        Self::BadRequest(format!("{field} is required"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Sentinel(SentinelError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            Self::Sentinel(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Sentinel(SentinelError::RateLimited { .. }) => "Rate limit exceeded".to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_class() {
        assert_eq!(ApiError::missing("query").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::missing("query").to_string(), "query is required");
        let limited = ApiError::from(SentinelError::RateLimited {
            endpoint: "/signals".into(),
        });
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        let cfg = ApiError::from(SentinelError::Configuration("bad weights".into()));
        assert_eq!(cfg.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
