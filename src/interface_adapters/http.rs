// JSON error bodies shared by the lobby HTTP routes and the socket upgrade.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_keeps_the_status() {
        let response = error_response(StatusCode::CONFLICT, "lobby `ABC-123` already exists");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
