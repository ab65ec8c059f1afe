//! Error responses.
//!
//! Clients get the status and a short message; error details only go to logs.

use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
