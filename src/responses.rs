use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    fn status(code: StatusCode, success: bool, msg: &str) -> impl IntoResponse {
        (
            code,
            Json(JsonResponse {
                success,
                message: msg.to_string(),
            }),
        )
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        Self::status(StatusCode::OK, true, msg)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        Self::status(StatusCode::BAD_REQUEST, false, msg)
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        Self::status(StatusCode::UNAUTHORIZED, false, msg)
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        Self::status(StatusCode::NOT_FOUND, false, msg)
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        Self::status(StatusCode::INTERNAL_SERVER_ERROR, false, msg)
    }

    pub fn service_unavailable(msg: &str) -> impl IntoResponse {
        Self::status(StatusCode::SERVICE_UNAVAILABLE, false, msg)
    }
}
