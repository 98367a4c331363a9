use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde_json::json,
    tracing::{error, warn},
};

/// Route-level failure, rendered as `{"error": ...}` JSON.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Client mistake: missing field, bad extension, empty message.
    #[error("{0}")]
    BadRequest(String),

    /// Referenced resource (e.g. a file index) does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Vendor call failed. Import timeouts map to 504, the rest to 502.
    #[error(transparent)]
    Vendor(#[from] sift_gemini::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Vendor(e) if e.is_import_timeout() => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Vendor(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(%status, error = %message, "request failed");
        } else {
            warn!(%status, error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            GatewayError::BadRequest("no".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::NotFound("gone".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::Vendor(sift_gemini::Error::ImportTimeout(120)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::Vendor(sift_gemini::Error::UploadHandshake).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
