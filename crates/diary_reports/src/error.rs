//! Error type of the reporting engine and its HTTP mapping.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Report and export errors.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("store error: {0}")]
    Store(#[from] diary_store::StoreError),

    #[error("no resolvable user")]
    Unauthorized,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let status = match &self {
            ReportError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::CACHE_CONTROL, "no-store")]).into_response();
        }
        tracing::error!(error = %self, "request failed");
        (
            status,
            [(header::CACHE_CONTROL, "no-store")],
            "internal error",
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn unauthorized_has_no_body() {
        let resp = ReportError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let err = ReportError::Store(diary_store::StoreError::Status {
            status: 500,
            body: "relation \"days\" does not exist".into(),
        });
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"internal error");
    }
}
