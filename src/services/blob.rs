use http::StatusCode;
use reqwest::Client;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("blob store responded with status {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// Client for the hosted blob store: objects are PUT under a namespaced
/// path and addressable at that same URL afterwards.
#[derive(Clone)]
pub struct BlobClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BlobClient {
    pub fn new(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        BlobClient {
            client,
            base_url,
            token,
        }
    }

    /// Uploads the bytes and returns the durable URL. The object name is
    /// salted with a fresh id so repeated uploads of the same filename
    /// never collide.
    pub async fn upload(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BlobError> {
        let url = format!(
            "{}/{}/{}_{}",
            self.base_url,
            path.trim_matches('/'),
            Uuid::new_v4(),
            urlencoding::encode(filename)
        );

        let mut request = self
            .client
            .put(&url)
            .header(http::header::CONTENT_TYPE.as_str(), content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BlobError::Api {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
            });
        }

        Ok(url)
    }
}
