use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

use crate::models::report::ImageValidation;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("image validation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image validation responded with status {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// External image-classification collaborator: given an encoded photo it
/// answers whether the image plausibly shows a civic issue.
#[async_trait]
pub trait ImageValidator: Send + Sync {
    async fn validate(&self, image_data: &str) -> Result<ImageValidation, VisionError>;
}

pub struct HttpImageValidator {
    client: Client,
    endpoint: String,
}

impl HttpImageValidator {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        HttpImageValidator {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ImageValidator for HttpImageValidator {
    async fn validate(&self, image_data: &str) -> Result<ImageValidation, VisionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "imageData": image_data }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VisionError::Api {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
            });
        }

        Ok(response.json::<ImageValidation>().await?)
    }
}

/// Canned validator for tests.
pub struct MockImageValidator {
    pub verdict: ImageValidation,
}

impl Default for MockImageValidator {
    fn default() -> Self {
        MockImageValidator {
            verdict: ImageValidation {
                is_valid: true,
                confidence: 0.95,
                message: "Looks like a civic issue".into(),
                suggestions: vec![],
                issue_type: None,
            },
        }
    }
}

#[async_trait]
impl ImageValidator for MockImageValidator {
    async fn validate(&self, _image_data: &str) -> Result<ImageValidation, VisionError> {
        Ok(self.verdict.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn validate_posts_image_data_and_parses_verdict() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/validate-image")
                .json_body(serde_json::json!({ "imageData": "data:image/png;base64,AAA" }));
            then.status(200).json_body(serde_json::json!({
                "isValid": false,
                "confidence": 0.31,
                "message": "No civic issue detected",
                "suggestions": ["Take a closer photo"],
                "issueType": "pothole"
            }));
        });

        let validator = HttpImageValidator::new(
            Client::new(),
            format!("{}/api/validate-image", server.base_url()),
        );
        let verdict = validator
            .validate("data:image/png;base64,AAA")
            .await
            .unwrap();

        mock.assert();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.suggestions, vec!["Take a closer photo"]);
        assert_eq!(verdict.issue_type.as_deref(), Some("pothole"));
    }
}
