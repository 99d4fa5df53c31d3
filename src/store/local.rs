use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as PollInterval;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tokio::sync::{mpsc, Mutex};
use tracing::warn;
use uuid::Uuid;

use super::{data_uri, ReportStore, ReportSubscription, StoreError};
use crate::models::notification::{NewNotification, Notification};
use crate::models::report::{NewReport, Report, ReportFilters, ReportPatch};
use crate::models::user::Role;

const REPORTS_FILE: &str = "reports.json";
const NOTIFICATIONS_FILE: &str = "notifications.json";

/// Fallback store holding each logical dataset as one JSON collection on
/// disk. Every mutation is a whole-collection read-modify-write, serialized
/// behind an async mutex. There is a single source of truth per dataset;
/// per-owner views are computed on read.
#[derive(Clone)]
pub struct LocalReportStore {
    inner: Arc<Inner>,
}

struct Inner {
    data_dir: PathBuf,
    poll_interval: PollInterval,
    lock: Mutex<()>,
}

impl LocalReportStore {
    pub fn new(data_dir: impl AsRef<Path>, poll_interval: PollInterval) -> Self {
        LocalReportStore {
            inner: Arc::new(Inner {
                data_dir: data_dir.as_ref().to_path_buf(),
                poll_interval,
                lock: Mutex::new(()),
            }),
        }
    }
}

impl Inner {
    /// A missing or unparseable collection file reads as empty; corruption
    /// is logged, never propagated.
    async fn read_collection<T: DeserializeOwned>(&self, file: &str) -> Vec<T> {
        let path = self.data_dir.join(file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(?err, file, "failed to read collection");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(items) => items,
            Err(err) => {
                warn!(?err, file, "stored collection is corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    async fn write_collection<T: Serialize>(
        &self,
        file: &str,
        items: &[T],
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let bytes = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(self.data_dir.join(file), bytes).await?;
        Ok(())
    }

    async fn query_reports(&self, filters: &ReportFilters) -> Vec<Report> {
        let mut reports: Vec<Report> = self.read_collection(REPORTS_FILE).await;
        reports.retain(|report| filters.matches(report));
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reports
    }
}

#[async_trait]
impl ReportStore for LocalReportStore {
    async fn create_report(&self, new: NewReport) -> Result<Report, StoreError> {
        let _guard = self.inner.lock.lock().await;
        let mut reports: Vec<Report> = self.inner.read_collection(REPORTS_FILE).await;
        let report = Report::from_new(new, Uuid::new_v4(), OffsetDateTime::now_utc());
        reports.push(report.clone());
        self.inner.write_collection(REPORTS_FILE, &reports).await?;
        Ok(report)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>, StoreError> {
        let reports: Vec<Report> = self.inner.read_collection(REPORTS_FILE).await;
        Ok(reports.into_iter().find(|report| report.id == id))
    }

    async fn update_report(
        &self,
        id: Uuid,
        patch: ReportPatch,
    ) -> Result<Option<Report>, StoreError> {
        let _guard = self.inner.lock.lock().await;
        let mut reports: Vec<Report> = self.inner.read_collection(REPORTS_FILE).await;
        let mut updated = None;
        for report in reports.iter_mut() {
            if report.id == id {
                patch.apply(report);
                report.updated_at = OffsetDateTime::now_utc();
                updated = Some(report.clone());
                break;
            }
        }
        if updated.is_some() {
            self.inner.write_collection(REPORTS_FILE, &reports).await?;
        }
        Ok(updated)
    }

    async fn get_reports(&self, filters: &ReportFilters) -> Result<Vec<Report>, StoreError> {
        Ok(self.inner.query_reports(filters).await)
    }

    /// Simulated live query: an immediate snapshot, then one per polling
    /// tick, whether or not anything changed.
    fn subscribe_reports(&self, filters: ReportFilters) -> ReportSubscription {
        let inner = self.inner.clone();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            let mut intv = tokio::time::interval(inner.poll_interval);
            loop {
                intv.tick().await;
                let snapshot = inner.query_reports(&filters).await;
                if tx.send(snapshot).await.is_err() {
                    break;
                }
            }
        });
        ReportSubscription::new(rx, task)
    }

    async fn upload_image(
        &self,
        _path: &str,
        _filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError> {
        // No blob storage here: the encoded image is its own storage.
        Ok(data_uri(content_type, &bytes))
    }

    async fn create_notification(
        &self,
        new: NewNotification,
    ) -> Result<Notification, StoreError> {
        let _guard = self.inner.lock.lock().await;
        let mut notifications: Vec<Notification> =
            self.inner.read_collection(NOTIFICATIONS_FILE).await;
        let notification = Notification::from_new(new, Uuid::new_v4(), OffsetDateTime::now_utc());
        notifications.push(notification.clone());
        self.inner
            .write_collection(NOTIFICATIONS_FILE, &notifications)
            .await?;
        Ok(notification)
    }

    async fn get_notifications(
        &self,
        email: &str,
        role: Option<Role>,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut notifications: Vec<Notification> =
            self.inner.read_collection(NOTIFICATIONS_FILE).await;
        notifications.retain(|n| n.reaches(email, role));
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
    ) -> Result<Option<Notification>, StoreError> {
        let _guard = self.inner.lock.lock().await;
        let mut notifications: Vec<Notification> =
            self.inner.read_collection(NOTIFICATIONS_FILE).await;
        let mut updated = None;
        for notification in notifications.iter_mut() {
            if notification.id == id {
                notification.read = true;
                notification.read_at = Some(OffsetDateTime::now_utc());
                updated = Some(notification.clone());
                break;
            }
        }
        if updated.is_some() {
            self.inner
                .write_collection(NOTIFICATIONS_FILE, &notifications)
                .await?;
        }
        Ok(updated)
    }

    async fn prune_notifications(&self, older_than: Duration) -> Result<u64, StoreError> {
        let cutoff = OffsetDateTime::now_utc() - older_than;
        let _guard = self.inner.lock.lock().await;
        let mut notifications: Vec<Notification> =
            self.inner.read_collection(NOTIFICATIONS_FILE).await;
        let before = notifications.len();
        notifications.retain(|n| !(n.read && n.created_at < cutoff));
        let removed = (before - notifications.len()) as u64;
        if removed > 0 {
            self.inner
                .write_collection(NOTIFICATIONS_FILE, &notifications)
                .await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::{IssueType, ReportStatus};
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    fn temp_store(poll: StdDuration) -> LocalReportStore {
        let dir = std::env::temp_dir().join(format!("civix-store-{}", Uuid::new_v4()));
        LocalReportStore::new(dir, poll)
    }

    fn new_report(title: &str, issue_type: IssueType, email: &str) -> NewReport {
        NewReport {
            title: title.into(),
            description: "details".into(),
            location: "Elm St".into(),
            coords: None,
            issue_type,
            image: None,
            user_email: email.into(),
            ai_validation: None,
        }
    }

    #[tokio::test]
    async fn created_report_is_queryable_by_owner_with_pending_status() {
        let store = temp_store(StdDuration::from_secs(2));
        let created = store
            .create_report(new_report("Pothole on Elm", IssueType::Pothole, "a@x.com"))
            .await
            .unwrap();

        let reports = store
            .get_reports(&ReportFilters {
                user_email: Some("a@x.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        let stored = &reports[0];
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.title, "Pothole on Elm");
        assert_eq!(stored.description, "details");
        assert_eq!(stored.location, "Elm St");
        assert_eq!(stored.issue_type, IssueType::Pothole);
        assert_eq!(stored.user_email, "a@x.com");
        assert_eq!(stored.status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn update_shallow_merges_and_bumps_updated_at() {
        let store = temp_store(StdDuration::from_secs(2));
        let created = store
            .create_report(new_report("Pothole", IssueType::Pothole, "a@x.com"))
            .await
            .unwrap();

        tokio::time::sleep(StdDuration::from_millis(10)).await;
        let updated = store
            .update_report(
                created.id,
                ReportPatch {
                    status: Some(ReportStatus::Assigned),
                    assigned_worker_id: Some("w1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .expect("record exists");

        assert_eq!(updated.status, ReportStatus::Assigned);
        assert_eq!(updated.assigned_worker_id.as_deref(), Some("w1"));
        // untouched fields survive the merge
        assert_eq!(updated.title, "Pothole");
        assert_eq!(updated.user_email, "a@x.com");
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_a_noop() {
        let store = temp_store(StdDuration::from_secs(2));
        store
            .create_report(new_report("Pothole", IssueType::Pothole, "a@x.com"))
            .await
            .unwrap();

        let result = store
            .update_report(
                Uuid::new_v4(),
                ReportPatch {
                    status: Some(ReportStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(result.is_none());
        let all = store.get_reports(&ReportFilters::default()).await.unwrap();
        assert_eq!(all.len(), 1, "no record created by a missed update");
    }

    #[tokio::test]
    async fn queries_filter_and_order_newest_first() {
        let store = temp_store(StdDuration::from_secs(2));
        store
            .create_report(new_report("first", IssueType::Pothole, "a@x.com"))
            .await
            .unwrap();
        tokio::time::sleep(StdDuration::from_millis(5)).await;
        store
            .create_report(new_report("second", IssueType::Garbage, "b@x.com"))
            .await
            .unwrap();
        tokio::time::sleep(StdDuration::from_millis(5)).await;
        store
            .create_report(new_report("third", IssueType::Pothole, "a@x.com"))
            .await
            .unwrap();

        let all = store.get_reports(&ReportFilters::default()).await.unwrap();
        let titles: Vec<&str> = all.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);

        let potholes = store
            .get_reports(&ReportFilters {
                issue_type: Some(IssueType::Pothole),
                user_email: Some("a@x.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let titles: Vec<&str> = potholes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "first"]);
    }

    #[tokio::test]
    async fn subscription_delivers_snapshots_until_unsubscribed() {
        let poll = StdDuration::from_millis(25);
        let store = temp_store(poll);
        store
            .create_report(new_report("one", IssueType::Pothole, "a@x.com"))
            .await
            .unwrap();
        store
            .create_report(new_report("two", IssueType::Garbage, "a@x.com"))
            .await
            .unwrap();

        let mut sub = store.subscribe_reports(ReportFilters {
            user_email: Some("a@x.com".into()),
            ..Default::default()
        });

        let first = timeout(StdDuration::from_secs(1), sub.recv())
            .await
            .expect("initial snapshot arrives promptly")
            .expect("subscription is live");
        assert_eq!(first.len(), 2);
        assert!(first[0].created_at >= first[1].created_at);

        sub.unsubscribe();

        // At most the already-buffered snapshots drain out, then the stream
        // ends. Nothing new may arrive within 2x the polling interval.
        let mut deliveries_after_cancel = 0;
        loop {
            match timeout(poll * 2, sub.recv()).await {
                Ok(Some(_)) => {
                    deliveries_after_cancel += 1;
                    assert!(deliveries_after_cancel <= 8, "subscription kept producing");
                }
                Ok(None) => break,
                Err(_) => panic!("subscription neither delivered nor closed"),
            }
        }
    }

    #[tokio::test]
    async fn corrupt_collection_reads_as_empty() {
        let dir = std::env::temp_dir().join(format!("civix-store-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(REPORTS_FILE), b"{not json").unwrap();

        let store = LocalReportStore::new(&dir, StdDuration::from_secs(2));
        let reports = store.get_reports(&ReportFilters::default()).await.unwrap();
        assert!(reports.is_empty());

        // and the store recovers on the next write
        store
            .create_report(new_report("fresh", IssueType::Other, "a@x.com"))
            .await
            .unwrap();
        let reports = store.get_reports(&ReportFilters::default()).await.unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[tokio::test]
    async fn elm_street_scenario() {
        let store = temp_store(StdDuration::from_secs(2));
        let created = store
            .create_report(new_report("Pothole on Elm", IssueType::Pothole, "a@x.com"))
            .await
            .unwrap();

        let mine = store
            .get_reports(&ReportFilters {
                user_email: Some("a@x.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].status, ReportStatus::Pending);

        store
            .update_report(
                created.id,
                ReportPatch {
                    status: Some(ReportStatus::Assigned),
                    assigned_worker_id: Some("w1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let assigned = store
            .get_reports(&ReportFilters {
                assigned_worker_id: Some("w1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, created.id);
    }

    #[tokio::test]
    async fn notifications_roundtrip_and_prune() {
        let store = temp_store(StdDuration::from_secs(2));
        let to_email = store
            .create_notification(NewNotification {
                title: "Report update".into(),
                message: "Your report was assigned".into(),
                recipient_email: Some("a@x.com".into()),
                recipient_role: None,
            })
            .await
            .unwrap();
        store
            .create_notification(NewNotification {
                title: "New report".into(),
                message: "A report needs triage".into(),
                recipient_email: None,
                recipient_role: Some(Role::Admin),
            })
            .await
            .unwrap();

        let for_citizen = store.get_notifications("a@x.com", None).await.unwrap();
        assert_eq!(for_citizen.len(), 1);

        let for_admin = store
            .get_notifications("admin@civicx.com", Some(Role::Admin))
            .await
            .unwrap();
        assert_eq!(for_admin.len(), 1);

        let read = store
            .mark_notification_read(to_email.id)
            .await
            .unwrap()
            .expect("notification exists");
        assert!(read.read);
        assert!(read.read_at.is_some());

        // unread notifications survive pruning, read ones expire
        let removed = store.prune_notifications(Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        let for_admin = store
            .get_notifications("admin@civicx.com", Some(Role::Admin))
            .await
            .unwrap();
        assert_eq!(for_admin.len(), 1);
    }

    #[tokio::test]
    async fn upload_image_embeds_a_data_uri() {
        let store = temp_store(StdDuration::from_secs(2));
        let url = store
            .upload_image("reports", "pothole.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
