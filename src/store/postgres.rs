use std::time::Duration as PollInterval;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Row};
use time::{Duration, OffsetDateTime};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use super::{data_uri, ReportStore, ReportSubscription, StoreError};
use crate::models::notification::{NewNotification, Notification};
use crate::models::report::{
    GeoPoint, ImageValidation, NewReport, Report, ReportFilters, ReportPatch,
};
use crate::models::user::Role;
use crate::services::blob::BlobClient;

pub const DEFAULT_REMOTE_POLL_INTERVAL_MS: u64 = 800;

/// Primary store: a Postgres database plus an optional blob store for
/// images. `created_at`/`updated_at` are stamped with the database server's
/// clock, which makes remote records immune to client clock skew. Updates
/// are per-field patches, so concurrent edits to disjoint fields merge.
pub struct PostgresReportStore {
    pool: PgPool,
    blob: Option<BlobClient>,
    poll_interval: PollInterval,
}

impl PostgresReportStore {
    pub fn new(pool: PgPool, blob: Option<BlobClient>) -> Self {
        PostgresReportStore {
            pool,
            blob,
            poll_interval: PollInterval::from_millis(DEFAULT_REMOTE_POLL_INTERVAL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: PollInterval) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

const REPORT_COLUMNS: &str = "id, title, description, location, latitude, longitude, issue_type, \
     image, status, user_email, assigned_worker_id, assigned_worker, created_at, updated_at, \
     started_at, completed_at, completion_image, completion_notes, complaint_sent, \
     complaint_sent_at, complaint_status, complaint_status_updated_at, ai_validation";

const NOTIFICATION_COLUMNS: &str =
    "id, title, message, recipient_email, recipient_role, created_at, read, read_at";

impl<'r> FromRow<'r, PgRow> for Report {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let latitude: Option<f64> = row.try_get("latitude")?;
        let longitude: Option<f64> = row.try_get("longitude")?;
        let coords = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };
        let ai_validation: Option<Json<ImageValidation>> = row.try_get("ai_validation")?;
        Ok(Report {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            coords,
            issue_type: row.try_get("issue_type")?,
            image: row.try_get("image")?,
            status: row.try_get("status")?,
            user_email: row.try_get("user_email")?,
            assigned_worker_id: row.try_get("assigned_worker_id")?,
            assigned_worker: row.try_get("assigned_worker")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            completion_image: row.try_get("completion_image")?,
            completion_notes: row.try_get("completion_notes")?,
            complaint_sent: row.try_get("complaint_sent")?,
            complaint_sent_at: row.try_get("complaint_sent_at")?,
            complaint_status: row.try_get("complaint_status")?,
            complaint_status_updated_at: row.try_get("complaint_status_updated_at")?,
            ai_validation: ai_validation.map(|v| v.0),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Notification {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Notification {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            recipient_email: row.try_get("recipient_email")?,
            recipient_role: row.try_get("recipient_role")?,
            created_at: row.try_get("created_at")?,
            read: row.try_get("read")?,
            read_at: row.try_get("read_at")?,
        })
    }
}

async fn fetch_reports(pool: &PgPool, filters: &ReportFilters) -> Result<Vec<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>(&format!(
        r#"
        SELECT {REPORT_COLUMNS}
        FROM reports
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR issue_type = $2)
          AND ($3::text IS NULL OR user_email = $3)
          AND ($4::text IS NULL OR assigned_worker_id = $4)
        ORDER BY created_at DESC
        "#
    ))
    .bind(filters.status)
    .bind(filters.issue_type)
    .bind(filters.user_email.as_deref())
    .bind(filters.assigned_worker_id.as_deref())
    .fetch_all(pool)
    .await
}

#[async_trait]
impl ReportStore for PostgresReportStore {
    async fn create_report(&self, new: NewReport) -> Result<Report, StoreError> {
        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            INSERT INTO reports
                (title, description, location, latitude, longitude, issue_type, image,
                 user_email, status, ai_validation, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, now(), now())
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.location)
        .bind(new.coords.map(|c| c.latitude))
        .bind(new.coords.map(|c| c.longitude))
        .bind(new.issue_type)
        .bind(&new.image)
        .bind(&new.user_email)
        .bind(new.ai_validation.map(Json))
        .fetch_one(&self.pool)
        .await?;

        Ok(report)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>, StoreError> {
        let report = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report)
    }

    async fn update_report(
        &self,
        id: Uuid,
        patch: ReportPatch,
    ) -> Result<Option<Report>, StoreError> {
        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            UPDATE reports SET
                status = COALESCE($2, status),
                image = COALESCE($3, image),
                assigned_worker_id = COALESCE($4, assigned_worker_id),
                assigned_worker = COALESCE($5, assigned_worker),
                started_at = COALESCE($6, started_at),
                completed_at = COALESCE($7, completed_at),
                completion_image = COALESCE($8, completion_image),
                completion_notes = COALESCE($9, completion_notes),
                complaint_sent = COALESCE($10, complaint_sent),
                complaint_sent_at = COALESCE($11, complaint_sent_at),
                complaint_status = COALESCE($12, complaint_status),
                complaint_status_updated_at = COALESCE($13, complaint_status_updated_at),
                ai_validation = COALESCE($14, ai_validation),
                updated_at = now()
            WHERE id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.status)
        .bind(&patch.image)
        .bind(&patch.assigned_worker_id)
        .bind(&patch.assigned_worker)
        .bind(patch.started_at)
        .bind(patch.completed_at)
        .bind(&patch.completion_image)
        .bind(&patch.completion_notes)
        .bind(patch.complaint_sent)
        .bind(patch.complaint_sent_at)
        .bind(patch.complaint_status)
        .bind(patch.complaint_status_updated_at)
        .bind(patch.ai_validation.map(Json))
        .fetch_optional(&self.pool)
        .await?;

        Ok(report)
    }

    async fn get_reports(&self, filters: &ReportFilters) -> Result<Vec<Report>, StoreError> {
        Ok(fetch_reports(&self.pool, filters).await?)
    }

    /// Live query emulated by polling with change detection: an immediate
    /// initial snapshot, then a delivery whenever the filtered result set
    /// differs from the last one delivered.
    fn subscribe_reports(&self, filters: ReportFilters) -> ReportSubscription {
        let pool = self.pool.clone();
        let poll_interval = self.poll_interval;
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            let mut last: Option<Vec<(Uuid, OffsetDateTime)>> = None;
            let mut intv = tokio::time::interval(poll_interval);
            loop {
                intv.tick().await;
                match fetch_reports(&pool, &filters).await {
                    Ok(reports) => {
                        let fingerprint: Vec<(Uuid, OffsetDateTime)> =
                            reports.iter().map(|r| (r.id, r.updated_at)).collect();
                        let changed =
                            last.as_ref().map(|prev| prev != &fingerprint).unwrap_or(true);
                        if changed {
                            last = Some(fingerprint);
                            if tx.send(reports).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => warn!(?err, "live report query poll failed"),
                }
            }
        });
        ReportSubscription::new(rx, task)
    }

    async fn upload_image(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError> {
        match &self.blob {
            Some(blob) => Ok(blob.upload(path, filename, content_type, bytes).await?),
            None => Ok(data_uri(content_type, &bytes)),
        }
    }

    async fn create_notification(
        &self,
        new: NewNotification,
    ) -> Result<Notification, StoreError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (title, message, recipient_email, recipient_role, created_at, read)
            VALUES ($1, $2, $3, $4, now(), FALSE)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.message)
        .bind(&new.recipient_email)
        .bind(new.recipient_role)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn get_notifications(
        &self,
        email: &str,
        role: Option<Role>,
    ) -> Result<Vec<Notification>, StoreError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE recipient_email = $1
               OR ($2::text IS NOT NULL AND recipient_role = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(email)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
    ) -> Result<Option<Notification>, StoreError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            UPDATE notifications SET read = TRUE, read_at = now()
            WHERE id = $1
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn prune_notifications(&self, older_than: Duration) -> Result<u64, StoreError> {
        let cutoff = OffsetDateTime::now_utc() - older_than;
        let result = sqlx::query("DELETE FROM notifications WHERE read AND created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
