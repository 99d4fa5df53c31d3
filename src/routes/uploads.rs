use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::responses::JsonResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    pub filename: String,
    pub content_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "reports".to_string()
}

pub async fn upload_image(
    State(state): State<AppState>,
    Json(payload): Json<UploadPayload>,
) -> Response {
    let bytes = match base64::engine::general_purpose::STANDARD.decode(payload.data.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => {
            return JsonResponse::bad_request("Image data is not valid base64").into_response()
        }
    };
    if bytes.is_empty() {
        return JsonResponse::bad_request("Image is empty").into_response();
    }

    match state
        .store
        .upload_image(&payload.path, &payload.filename, &payload.content_type, bytes)
        .await
    {
        Ok(url) => Json(json!({ "success": true, "url": url })).into_response(),
        Err(err) => {
            // No further fallback beyond the store's own: surface it.
            error!(?err, filename = %payload.filename, "image upload failed");
            JsonResponse::server_error("Failed to upload image").into_response()
        }
    }
}
