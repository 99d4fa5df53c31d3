use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::notification::NewNotification;
use crate::models::report::{NewReport, ReportFilters, ReportPatch, ReportStatus};
use crate::models::user::Role;
use crate::responses::JsonResponse;
use crate::state::AppState;

pub async fn create_report(
    State(state): State<AppState>,
    Json(mut payload): Json<NewReport>,
) -> Response {
    payload.title = payload.title.trim().to_string();
    payload.description = payload.description.trim().to_string();
    payload.location = payload.location.trim().to_string();

    if payload.title.is_empty() {
        return JsonResponse::bad_request("Report title is required").into_response();
    }
    if payload.title.len() > 200 {
        return JsonResponse::bad_request("Report title is too long").into_response();
    }
    if payload.description.is_empty() {
        return JsonResponse::bad_request("Report description is required").into_response();
    }
    if payload.description.len() > 4000 {
        return JsonResponse::bad_request("Report description is too long").into_response();
    }
    if payload.location.is_empty() {
        return JsonResponse::bad_request("Report location is required").into_response();
    }
    if payload.user_email.trim().is_empty() {
        return JsonResponse::bad_request("Reporter email is required").into_response();
    }

    if let (Some(vision), Some(image)) = (&state.vision, &payload.image) {
        match vision.validate(image).await {
            Ok(verdict) => {
                if !verdict.is_valid {
                    return JsonResponse::bad_request(&verdict.message).into_response();
                }
                payload.ai_validation = Some(verdict);
            }
            Err(err) => {
                warn!(?err, "image validation unavailable, accepting report as-is");
            }
        }
    }

    let report = match state.store.create_report(payload).await {
        Ok(report) => report,
        Err(err) => {
            error!(?err, "failed to persist report");
            return JsonResponse::server_error("Unable to submit report right now")
                .into_response();
        }
    };

    // Triage notification for admins, best effort.
    if let Err(err) = state
        .store
        .create_notification(NewNotification {
            title: "New report submitted".into(),
            message: format!("{} reported: {}", report.user_email, report.title),
            recipient_email: None,
            recipient_role: Some(Role::Admin),
        })
        .await
    {
        warn!(?err, report_id = %report.id, "failed to create triage notification");
    }

    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "report": report })),
    )
        .into_response()
}

pub async fn list_reports(
    State(state): State<AppState>,
    Query(filters): Query<ReportFilters>,
) -> Response {
    match state.store.get_reports(&filters).await {
        Ok(reports) => Json(json!({ "reports": reports })).into_response(),
        Err(err) => {
            error!(?err, "failed to load reports");
            JsonResponse::server_error("Failed to load reports").into_response()
        }
    }
}

pub async fn patch_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    Json(patch): Json<ReportPatch>,
) -> Response {
    match state.store.update_report(report_id, patch).await {
        Ok(Some(report)) => Json(json!({ "success": true, "report": report })).into_response(),
        Ok(None) => JsonResponse::not_found("Report not found").into_response(),
        Err(err) => {
            error!(?err, %report_id, "failed to update report");
            JsonResponse::server_error("Failed to update report").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangePayload {
    pub status: ReportStatus,
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Proof-of-work photo, required when completing.
    #[serde(default)]
    pub completion_image: Option<String>,
    #[serde(default)]
    pub completion_notes: Option<String>,
}

/// Workflow transitions: approve / reject / assign / start / complete.
/// Validates the transition against the current record, stamps the
/// milestone timestamps, keeps the roster counts current and notifies the
/// people involved.
pub async fn change_report_status(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    Json(payload): Json<StatusChangePayload>,
) -> Response {
    let report = match state.store.get_report(report_id).await {
        Ok(Some(report)) => report,
        Ok(None) => return JsonResponse::not_found("Report not found").into_response(),
        Err(err) => {
            error!(?err, %report_id, "failed to load report");
            return JsonResponse::server_error("Failed to load report").into_response();
        }
    };

    let next = payload.status;
    if !report.status.can_transition_to(next) {
        return JsonResponse::bad_request(&format!(
            "Cannot move a {} report to {}",
            report.status, next
        ))
        .into_response();
    }

    let mut patch = ReportPatch {
        status: Some(next),
        ..Default::default()
    };

    let mut assigned_worker = None;
    match next {
        ReportStatus::Assigned => {
            let Some(worker_id) = payload.worker_id.as_deref() else {
                return JsonResponse::bad_request("A worker id is required for assignment")
                    .into_response();
            };
            let worker = {
                let roster = state.workers.lock().unwrap();
                roster.iter().find(|w| w.id == worker_id).cloned()
            };
            let Some(worker) = worker else {
                return JsonResponse::bad_request("Unknown worker").into_response();
            };
            patch.assigned_worker_id = Some(worker.id.clone());
            patch.assigned_worker = Some(worker.name.clone());
            assigned_worker = Some(worker);
        }
        ReportStatus::InProgress => {
            patch.started_at = Some(OffsetDateTime::now_utc());
        }
        ReportStatus::Completed => {
            let Some(image) = payload.completion_image else {
                return JsonResponse::bad_request("A completion photo is required")
                    .into_response();
            };
            patch.completed_at = Some(OffsetDateTime::now_utc());
            patch.completion_image = Some(image);
            patch.completion_notes = payload.completion_notes;
        }
        _ => {}
    }

    let updated = match state.store.update_report(report_id, patch).await {
        Ok(Some(report)) => report,
        Ok(None) => return JsonResponse::not_found("Report not found").into_response(),
        Err(err) => {
            error!(?err, %report_id, "failed to update report status");
            return JsonResponse::server_error("Failed to update report").into_response();
        }
    };

    if let Some(worker) = &assigned_worker {
        {
            let mut roster = state.workers.lock().unwrap();
            if let Some(entry) = roster.iter_mut().find(|w| w.id == worker.id) {
                entry.assigned_tasks += 1;
            }
        }
        notify(
            &state,
            NewNotification {
                title: "New assignment".into(),
                message: format!("You were assigned: {}", updated.title),
                recipient_email: Some(worker.email.clone()),
                recipient_role: None,
            },
        )
        .await;
    }

    let citizen_message = match next {
        ReportStatus::Approved => format!("Your report '{}' was approved", updated.title),
        ReportStatus::Rejected => format!("Your report '{}' was rejected", updated.title),
        ReportStatus::Assigned => format!(
            "Your report '{}' was assigned to {}",
            updated.title,
            updated.assigned_worker.as_deref().unwrap_or("a worker")
        ),
        ReportStatus::InProgress => {
            format!("Work on your report '{}' has started", updated.title)
        }
        ReportStatus::Completed => format!("Your report '{}' has been resolved", updated.title),
        ReportStatus::Pending => String::new(),
    };
    if !citizen_message.is_empty() {
        notify(
            &state,
            NewNotification {
                title: "Report update".into(),
                message: citizen_message,
                recipient_email: Some(updated.user_email.clone()),
                recipient_role: None,
            },
        )
        .await;
    }

    Json(json!({ "success": true, "report": updated })).into_response()
}

async fn notify(state: &AppState, notification: NewNotification) {
    if let Err(err) = state.store.create_notification(notification).await {
        warn!(?err, "failed to create notification");
    }
}

/// Live feed of report snapshots. Each event carries the complete filtered
/// result set, newest first, exactly as `GET /api/reports` would return it.
pub async fn report_events(
    State(state): State<AppState>,
    Query(filters): Query<ReportFilters>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.store.subscribe_reports(filters);
    let s = stream! {
        while let Some(reports) = subscription.recv().await {
            let ev = Event::default().event("reports").json_data(&reports).unwrap();
            yield Ok::<Event, Infallible>(ev);
        }
    };
    Sse::new(s).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keepalive"),
    )
}
