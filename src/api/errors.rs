use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use crate::errors::FlowscopeError;

impl IntoResponse for FlowscopeError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            FlowscopeError::Config(_) | FlowscopeError::InvalidModel(_) => StatusCode::BAD_REQUEST,
            FlowscopeError::UnknownTask(_) => StatusCode::NOT_FOUND,
            FlowscopeError::InvalidState(_) => StatusCode::CONFLICT,
            FlowscopeError::Network(_) | FlowscopeError::Backend(_) | FlowscopeError::Stream(_) => {
                StatusCode::BAD_GATEWAY
            }
            FlowscopeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
