use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::models::user::Role;
use crate::responses::JsonResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Response {
    let Some(email) = query.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
        return JsonResponse::bad_request("Recipient email is required").into_response();
    };

    match state.store.get_notifications(email, query.role).await {
        Ok(notifications) => Json(json!({ "notifications": notifications })).into_response(),
        Err(err) => {
            error!(?err, email, "failed to load notifications");
            JsonResponse::server_error("Failed to load notifications").into_response()
        }
    }
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> Response {
    match state.store.mark_notification_read(notification_id).await {
        Ok(Some(_)) => JsonResponse::success("Notification marked as read").into_response(),
        Ok(None) => JsonResponse::not_found("Notification not found").into_response(),
        Err(err) => {
            error!(?err, %notification_id, "failed to mark notification read");
            JsonResponse::server_error("Failed to update notification").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NewNotification;
    use crate::state::test_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn listing_requires_an_email() {
        let state = test_state();
        let resp = list_notifications(
            State(state),
            Query(NotificationQuery {
                email: None,
                role: None,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn role_addressed_notifications_reach_every_member() {
        let state = test_state();
        state
            .store
            .create_notification(NewNotification {
                title: "New report".into(),
                message: "Needs triage".into(),
                recipient_email: None,
                recipient_role: Some(Role::Admin),
            })
            .await
            .unwrap();

        let resp = list_notifications(
            State(state),
            Query(NotificationQuery {
                email: Some("admin@civicx.com".into()),
                role: Some(Role::Admin),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 1 << 16).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["notifications"].as_array().unwrap().len(), 1);
        assert_eq!(json["notifications"][0]["read"], false);
    }

    #[tokio::test]
    async fn marking_read_is_visible_on_the_next_read() {
        let state = test_state();
        let notification = state
            .store
            .create_notification(NewNotification {
                title: "Report update".into(),
                message: "Assigned".into(),
                recipient_email: Some("a@x.com".into()),
                recipient_role: None,
            })
            .await
            .unwrap();

        let resp = mark_notification_read(State(state.clone()), Path(notification.id)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let inbox = state.store.get_notifications("a@x.com", None).await.unwrap();
        assert!(inbox[0].read);
    }

    #[tokio::test]
    async fn marking_an_unknown_notification_is_not_found() {
        let state = test_state();
        let resp = mark_notification_read(State(state), Path(Uuid::new_v4())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
