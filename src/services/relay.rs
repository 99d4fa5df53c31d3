use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

pub const WEB3FORMS_ENDPOINT: &str = "https://api.web3forms.com/submit";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("complaint relay request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("complaint relay responded with status {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("complaint relay rejected the submission: {0}")]
    Rejected(String),
}

/// A citizen follow-up complaint on an unresolved report, ready to be
/// delivered by email. The deep links call back into the service to advance
/// the complaint status without going through the app UI.
#[derive(Debug, Clone)]
pub struct OutboundComplaint {
    pub report_id: Uuid,
    pub report_title: String,
    pub user_email: String,
    pub message: String,
    pub processing_link: String,
    pub complete_link: String,
}

impl OutboundComplaint {
    fn body(&self) -> String {
        format!(
            "{}\n\nReport: {} ({})\n\nMark as processing: {}\nMark as completed: {}",
            self.message, self.report_title, self.report_id, self.processing_link, self.complete_link
        )
    }
}

/// Outbound-only form relay that turns a complaint into an email to the
/// municipality.
#[async_trait]
pub trait ComplaintRelay: Send + Sync {
    async fn send_complaint(&self, complaint: &OutboundComplaint) -> Result<(), RelayError>;
}

pub struct Web3FormsRelay {
    client: Client,
    access_key: String,
    endpoint: String,
}

impl Web3FormsRelay {
    pub fn new(client: Client, access_key: impl Into<String>) -> Self {
        Web3FormsRelay {
            client,
            access_key: access_key.into(),
            endpoint: WEB3FORMS_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct Web3FormsResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl ComplaintRelay for Web3FormsRelay {
    async fn send_complaint(&self, complaint: &OutboundComplaint) -> Result<(), RelayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "access_key": self.access_key,
                "subject": format!("Complaint regarding report: {}", complaint.report_title),
                "email": complaint.user_email,
                "message": complaint.body(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Api {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
            });
        }

        let body = response.json::<Web3FormsResponse>().await?;
        if !body.success {
            return Err(RelayError::Rejected(body.message));
        }
        Ok(())
    }
}

/// Records complaints instead of delivering them. Used in tests.
#[derive(Default)]
pub struct MockRelay {
    pub sent: Mutex<Vec<OutboundComplaint>>,
    pub should_fail: bool,
}

#[async_trait]
impl ComplaintRelay for MockRelay {
    async fn send_complaint(&self, complaint: &OutboundComplaint) -> Result<(), RelayError> {
        if self.should_fail {
            return Err(RelayError::Rejected("mock relay failure".into()));
        }
        self.sent.lock().unwrap().push(complaint.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn complaint() -> OutboundComplaint {
        OutboundComplaint {
            report_id: Uuid::new_v4(),
            report_title: "Pothole on Elm".into(),
            user_email: "a@x.com".into(),
            message: "Still not fixed after two weeks".into(),
            processing_link: "http://localhost:3000/api/complaints/status?reportId=r&status=processing".into(),
            complete_link: "http://localhost:3000/api/complaints/status?reportId=r&status=completed".into(),
        }
    }

    #[tokio::test]
    async fn send_complaint_posts_access_key_and_deep_links() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/submit")
                .json_body_partial(r#"{ "access_key": "k-123", "email": "a@x.com" }"#)
                .body_contains("status=processing")
                .body_contains("status=completed");
            then.status(200)
                .json_body(serde_json::json!({ "success": true, "message": "ok" }));
        });

        let relay = Web3FormsRelay::new(Client::new(), "k-123")
            .with_endpoint(format!("{}/submit", server.base_url()));
        relay.send_complaint(&complaint()).await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn unsuccessful_relay_response_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/submit");
            then.status(200)
                .json_body(serde_json::json!({ "success": false, "message": "bad key" }));
        });

        let relay = Web3FormsRelay::new(Client::new(), "wrong")
            .with_endpoint(format!("{}/submit", server.base_url()));
        let err = relay.send_complaint(&complaint()).await.unwrap_err();

        match err {
            RelayError::Rejected(message) => assert_eq!(message, "bad key"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
