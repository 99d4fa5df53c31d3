use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::user::Role;

/// In-app notification addressed to either a specific email or a whole
/// role (e.g. every admin).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub recipient_role: Option<Role>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub read: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
}

impl Notification {
    pub fn from_new(new: NewNotification, id: Uuid, now: OffsetDateTime) -> Self {
        Notification {
            id,
            title: new.title,
            message: new.message,
            recipient_email: new.recipient_email,
            recipient_role: new.recipient_role,
            created_at: now,
            read: false,
            read_at: None,
        }
    }

    /// A notification reaches a caller when it is addressed to their email
    /// or to their role.
    pub fn reaches(&self, email: &str, role: Option<Role>) -> bool {
        if self.recipient_email.as_deref() == Some(email) {
            return true;
        }
        matches!((self.recipient_role, role), (Some(r), Some(c)) if r == c)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub recipient_role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(email: Option<&str>, role: Option<Role>) -> Notification {
        Notification::from_new(
            NewNotification {
                title: "t".into(),
                message: "m".into(),
                recipient_email: email.map(String::from),
                recipient_role: role,
            },
            Uuid::new_v4(),
            OffsetDateTime::now_utc(),
        )
    }

    #[test]
    fn reaches_by_email_or_role() {
        let by_email = notification(Some("a@x.com"), None);
        assert!(by_email.reaches("a@x.com", None));
        assert!(!by_email.reaches("b@x.com", Some(Role::Admin)));

        let by_role = notification(None, Some(Role::Admin));
        assert!(by_role.reaches("anyone@x.com", Some(Role::Admin)));
        assert!(!by_role.reaches("anyone@x.com", Some(Role::Worker)));
        assert!(!by_role.reaches("anyone@x.com", None));
    }

    #[test]
    fn new_notifications_start_unread() {
        let n = notification(Some("a@x.com"), None);
        assert!(!n.read);
        assert!(n.read_at.is_none());
    }
}
