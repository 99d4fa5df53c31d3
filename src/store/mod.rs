use async_trait::async_trait;
use base64::Engine;
use thiserror::Error;
use time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::notification::{NewNotification, Notification};
use crate::models::report::{NewReport, Report, ReportFilters, ReportPatch};
use crate::models::user::Role;
use crate::services::blob::BlobError;

pub mod local;
pub mod postgres;

pub use local::LocalReportStore;
pub use postgres::PostgresReportStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// One store interface, two backends. The implementation is chosen once at
/// startup by a configuration check and injected; callers never branch on
/// which backend they are talking to.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create_report(&self, new: NewReport) -> Result<Report, StoreError>;

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>, StoreError>;

    /// Shallow-merges `patch` into the record and refreshes `updated_at`.
    /// An unknown id is a silent no-op (`Ok(None)`), never an error.
    async fn update_report(
        &self,
        id: Uuid,
        patch: ReportPatch,
    ) -> Result<Option<Report>, StoreError>;

    /// Matching records ordered by `created_at` descending. Both backends
    /// agree on matching and ordering semantics for any filter set.
    async fn get_reports(&self, filters: &ReportFilters) -> Result<Vec<Report>, StoreError>;

    /// Starts a background task that delivers complete filtered, ordered
    /// snapshots. Dropping or unsubscribing the handle cancels the task.
    fn subscribe_reports(&self, filters: ReportFilters) -> ReportSubscription;

    /// Stores image bytes and returns a durable URL, or a data URI when the
    /// backend acts as its own pseudo-storage. Upload failures propagate;
    /// there is no further fallback.
    async fn upload_image(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError>;

    async fn create_notification(&self, new: NewNotification)
        -> Result<Notification, StoreError>;

    async fn get_notifications(
        &self,
        email: &str,
        role: Option<Role>,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn mark_notification_read(&self, id: Uuid) -> Result<Option<Notification>, StoreError>;

    /// Drops read notifications older than `older_than`; returns how many
    /// were removed. Used by the background sweeper.
    async fn prune_notifications(&self, older_than: Duration) -> Result<u64, StoreError>;
}

/// Cancellable live-query handle. Each delivery is the complete filtered,
/// ordered result set, so consumers are backend-agnostic.
pub struct ReportSubscription {
    rx: mpsc::Receiver<Vec<Report>>,
    task: JoinHandle<()>,
}

impl ReportSubscription {
    pub(crate) fn new(rx: mpsc::Receiver<Vec<Report>>, task: JoinHandle<()>) -> Self {
        ReportSubscription { rx, task }
    }

    /// The next snapshot, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<Vec<Report>> {
        self.rx.recv().await
    }

    /// Stops the background task. Already-buffered snapshots may still be
    /// received; nothing new is produced.
    pub fn unsubscribe(&mut self) {
        self.task.abort();
    }
}

impl Drop for ReportSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(crate) fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
