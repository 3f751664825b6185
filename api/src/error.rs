use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use market_data::error::ErrorBody;
use market_data::FetchError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Rejected before reaching the acquisition service
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub fn status_for(err: &FetchError) -> StatusCode {
    match err {
        FetchError::Validation(_) => StatusCode::BAD_REQUEST,
        FetchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        FetchError::ProducerReported(_)
        | FetchError::ProducerFailed { .. }
        | FetchError::TooManyParseErrors { .. } => StatusCode::BAD_GATEWAY,
        FetchError::ProcessLaunch(_) | FetchError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: format!("Invalid request: {}", msg),
                    retryable: false,
                },
            ),
            ApiError::Fetch(err) => (status_for(err), ErrorBody::from(err)),
        };

        if status.is_server_error() {
            tracing::error!("Request failed with {}: {}", status, self);
        } else {
            tracing::warn!("Request failed with {}: {}", status, self);
        }

        (status, Json(json!({ "error": body }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&FetchError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&FetchError::Timeout { after_secs: 60 }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&FetchError::ProducerFailed {
                code: Some(1),
                detail: "boom".to_string()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&FetchError::TooManyParseErrors {
                count: 10,
                ceiling: 10
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&FetchError::ProcessLaunch("not found".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
