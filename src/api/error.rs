use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::utils::error::ServiceError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                category = ?self.category(),
                severity = ?self.severity(),
                "request failed: {}",
                self
            );
        }

        (
            status,
            Json(ErrorResponse {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}
