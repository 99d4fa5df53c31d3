use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::report::{ComplaintStatus, ReportPatch};
use crate::responses::JsonResponse;
use crate::services::relay::OutboundComplaint;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ComplaintPayload {
    pub message: String,
}

/// Relays a citizen complaint about an unresolved report through the
/// outbound form relay. The email carries deep links that advance the
/// complaint status without touching the app UI.
pub async fn submit_complaint(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    Json(payload): Json<ComplaintPayload>,
) -> Response {
    let message = payload.message.trim();
    if message.is_empty() {
        return JsonResponse::bad_request("Please enter your complaint").into_response();
    }
    if message.len() > 4000 {
        return JsonResponse::bad_request("Complaint is too long").into_response();
    }

    let Some(relay) = state.relay.clone() else {
        return JsonResponse::service_unavailable("Complaint relay is not configured")
            .into_response();
    };

    let report = match state.store.get_report(report_id).await {
        Ok(Some(report)) => report,
        Ok(None) => return JsonResponse::not_found("Report not found").into_response(),
        Err(err) => {
            error!(?err, %report_id, "failed to load report for complaint");
            return JsonResponse::server_error("Unable to send complaint right now")
                .into_response();
        }
    };

    let base = state.config.public_base_url.trim_end_matches('/');
    let complaint = OutboundComplaint {
        report_id,
        report_title: report.title.clone(),
        user_email: report.user_email.clone(),
        message: message.to_string(),
        processing_link: format!(
            "{base}/api/complaints/status?reportId={report_id}&status=processing"
        ),
        complete_link: format!(
            "{base}/api/complaints/status?reportId={report_id}&status=completed"
        ),
    };

    if let Err(err) = relay.send_complaint(&complaint).await {
        error!(?err, %report_id, "failed to relay complaint");
        return JsonResponse::server_error("Failed to send complaint. Please try again.")
            .into_response();
    }

    // The complaint is out the door; recording that is best effort.
    let patch = ReportPatch {
        complaint_sent: Some(true),
        complaint_sent_at: Some(OffsetDateTime::now_utc()),
        ..Default::default()
    };
    if let Err(err) = state.store.update_report(report_id, patch).await {
        warn!(?err, %report_id, "failed to record complaint_sent");
    }

    JsonResponse::success("Complaint sent").into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintStatusQuery {
    #[serde(default)]
    pub report_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<ComplaintStatus>,
}

/// Landing handler for the emailed deep links. Renders a tiny HTML page so
/// the clicked link shows a human-readable confirmation.
pub async fn update_complaint_status(
    State(state): State<AppState>,
    Query(query): Query<ComplaintStatusQuery>,
) -> Response {
    let (Some(report_id), Some(status)) = (query.report_id, query.status) else {
        return JsonResponse::bad_request("Missing parameters").into_response();
    };

    let patch = ReportPatch {
        complaint_status: Some(status),
        complaint_status_updated_at: Some(OffsetDateTime::now_utc()),
        ..Default::default()
    };

    match state.store.update_report(report_id, patch).await {
        Ok(Some(_)) => Html(format!(
            r#"<html>
  <body style="font-family: sans-serif; text-align: center; padding: 50px;">
    <h1 style="color: green;">Success</h1>
    <p>Complaint status for Report ID <strong>{report_id}</strong> has been updated to <strong>{status}</strong>.</p>
    <p>You can close this window.</p>
  </body>
</html>"#
        ))
        .into_response(),
        Ok(None) => JsonResponse::not_found("Report not found").into_response(),
        Err(err) => {
            error!(?err, %report_id, "failed to update complaint status");
            JsonResponse::server_error("Failed to update complaint status").into_response()
        }
    }
}
