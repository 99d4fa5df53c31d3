use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A citizen-submitted civic issue with a workflow status. Wire format is
/// camelCase to match the frontend payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub coords: Option<GeoPoint>,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    #[serde(default)]
    pub image: Option<String>,
    pub status: ReportStatus,
    pub user_email: String,
    #[serde(default)]
    pub assigned_worker_id: Option<String>,
    #[serde(default)]
    pub assigned_worker: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub completion_image: Option<String>,
    #[serde(default)]
    pub completion_notes: Option<String>,
    #[serde(default)]
    pub complaint_sent: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub complaint_sent_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub complaint_status: Option<ComplaintStatus>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub complaint_status_updated_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub ai_validation: Option<ImageValidation>,
}

impl Report {
    /// Materialize a stored record from a submission. Used by the local
    /// store; the remote store lets the database assign id and timestamps.
    pub fn from_new(new: NewReport, id: Uuid, now: OffsetDateTime) -> Self {
        Report {
            id,
            title: new.title,
            description: new.description,
            location: new.location,
            coords: new.coords,
            issue_type: new.issue_type,
            image: new.image,
            status: ReportStatus::Pending,
            user_email: new.user_email,
            assigned_worker_id: None,
            assigned_worker: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            completion_image: None,
            completion_notes: None,
            complaint_sent: false,
            complaint_sent_at: None,
            complaint_status: None,
            complaint_status_updated_at: None,
            ai_validation: new.ai_validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum IssueType {
    Pothole,
    Garbage,
    Streetlight,
    Sidewalk,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum ReportStatus {
    Pending,
    Approved,
    Rejected,
    Assigned,
    InProgress,
    Completed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Assigned => "assigned",
            ReportStatus::InProgress => "in-progress",
            ReportStatus::Completed => "completed",
        }
    }

    /// The workflow is linear-ish: rejection is terminal and only reachable
    /// from pending. The store never enforces this; the workflow endpoint
    /// does.
    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        use ReportStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Assigned)
                | (Approved, Assigned)
                | (Assigned, InProgress)
                | (InProgress, Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ComplaintStatus {
    Processing,
    Completed,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Processing => "processing",
            ComplaintStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict from the external image-classification collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageValidation {
    pub is_valid: bool,
    pub confidence: f64,
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub coords: Option<GeoPoint>,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    #[serde(default)]
    pub image: Option<String>,
    pub user_email: String,
    #[serde(default)]
    pub ai_validation: Option<ImageValidation>,
}

/// Shallow-merge update payload. Fields left at `None` are untouched; a
/// patch can set a field but never clear one back to null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReportStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_worker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_worker: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complaint_sent: Option<bool>,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub complaint_sent_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complaint_status: Option<ComplaintStatus>,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub complaint_status_updated_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_validation: Option<ImageValidation>,
}

impl ReportPatch {
    pub fn apply(&self, report: &mut Report) {
        if let Some(status) = self.status {
            report.status = status;
        }
        if let Some(image) = &self.image {
            report.image = Some(image.clone());
        }
        if let Some(id) = &self.assigned_worker_id {
            report.assigned_worker_id = Some(id.clone());
        }
        if let Some(name) = &self.assigned_worker {
            report.assigned_worker = Some(name.clone());
        }
        if let Some(at) = self.started_at {
            report.started_at = Some(at);
        }
        if let Some(at) = self.completed_at {
            report.completed_at = Some(at);
        }
        if let Some(image) = &self.completion_image {
            report.completion_image = Some(image.clone());
        }
        if let Some(notes) = &self.completion_notes {
            report.completion_notes = Some(notes.clone());
        }
        if let Some(sent) = self.complaint_sent {
            report.complaint_sent = sent;
        }
        if let Some(at) = self.complaint_sent_at {
            report.complaint_sent_at = Some(at);
        }
        if let Some(status) = self.complaint_status {
            report.complaint_status = Some(status);
        }
        if let Some(at) = self.complaint_status_updated_at {
            report.complaint_status_updated_at = Some(at);
        }
        if let Some(validation) = &self.ai_validation {
            report.ai_validation = Some(validation.clone());
        }
    }
}

/// Sparse equality predicates for report queries. Omitted filters match
/// everything. Query-string names match the frontend (`type`, `userEmail`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportFilters {
    pub status: Option<ReportStatus>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
    pub user_email: Option<String>,
    pub assigned_worker_id: Option<String>,
}

impl ReportFilters {
    pub fn matches(&self, report: &Report) -> bool {
        if let Some(status) = self.status {
            if report.status != status {
                return false;
            }
        }
        if let Some(issue_type) = self.issue_type {
            if report.issue_type != issue_type {
                return false;
            }
        }
        if let Some(email) = &self.user_email {
            if &report.user_email != email {
                return false;
            }
        }
        if let Some(worker_id) = &self.assigned_worker_id {
            if report.assigned_worker_id.as_ref() != Some(worker_id) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_terminal_and_only_from_pending() {
        assert!(ReportStatus::Pending.can_transition_to(ReportStatus::Rejected));
        assert!(!ReportStatus::Approved.can_transition_to(ReportStatus::Rejected));
        assert!(!ReportStatus::Rejected.can_transition_to(ReportStatus::Assigned));
        assert!(!ReportStatus::Rejected.can_transition_to(ReportStatus::Pending));
    }

    #[test]
    fn workflow_moves_forward_only() {
        assert!(ReportStatus::Pending.can_transition_to(ReportStatus::Approved));
        assert!(ReportStatus::Approved.can_transition_to(ReportStatus::Assigned));
        assert!(ReportStatus::Assigned.can_transition_to(ReportStatus::InProgress));
        assert!(ReportStatus::InProgress.can_transition_to(ReportStatus::Completed));

        assert!(!ReportStatus::Pending.can_transition_to(ReportStatus::Completed));
        assert!(!ReportStatus::Completed.can_transition_to(ReportStatus::InProgress));
        assert!(!ReportStatus::Assigned.can_transition_to(ReportStatus::Approved));
    }

    #[test]
    fn wire_format_matches_frontend_payloads() {
        let json = serde_json::json!({
            "title": "Large pothole on Main Street",
            "description": "Deep hole near the crosswalk",
            "location": "Main St & 4th Ave",
            "type": "pothole",
            "userEmail": "user@civicx.com"
        });
        let new: NewReport = serde_json::from_value(json).unwrap();
        assert_eq!(new.issue_type, IssueType::Pothole);
        assert_eq!(new.user_email, "user@civicx.com");

        let report = Report::from_new(new, Uuid::new_v4(), OffsetDateTime::now_utc());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["type"], "pothole");
        assert!(value["userEmail"].is_string());
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn in_progress_serializes_kebab_case() {
        let status = serde_json::to_value(ReportStatus::InProgress).unwrap();
        assert_eq!(status, "in-progress");
    }

    #[test]
    fn filters_match_on_every_supplied_predicate() {
        let new: NewReport = serde_json::from_value(serde_json::json!({
            "title": "t", "description": "d", "location": "l",
            "type": "garbage", "userEmail": "a@x.com"
        }))
        .unwrap();
        let mut report = Report::from_new(new, Uuid::new_v4(), OffsetDateTime::now_utc());
        report.assigned_worker_id = Some("w1".into());

        assert!(ReportFilters::default().matches(&report));
        assert!(ReportFilters {
            user_email: Some("a@x.com".into()),
            assigned_worker_id: Some("w1".into()),
            ..Default::default()
        }
        .matches(&report));
        assert!(!ReportFilters {
            status: Some(ReportStatus::Completed),
            ..Default::default()
        }
        .matches(&report));
        assert!(!ReportFilters {
            user_email: Some("b@x.com".into()),
            ..Default::default()
        }
        .matches(&report));
    }
}
