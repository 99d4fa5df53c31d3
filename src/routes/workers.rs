use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn list_workers(State(state): State<AppState>) -> Response {
    let workers = state.workers.lock().unwrap().clone();
    Json(json!({ "workers": workers })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn roster_lists_seeded_workers() {
        let state = test_state();
        let resp = list_workers(State(state)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1 << 16).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let workers = json["workers"].as_array().unwrap();
        assert_eq!(workers.len(), 3);
        assert_eq!(workers[0]["name"], "John");
        assert_eq!(workers[1]["status"], "busy");
    }
}
