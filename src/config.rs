use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_NOTIFICATION_RETENTION_DAYS: i64 = 30;

pub struct Config {
    pub port: u16,
    /// Unset means the remote backend is permanently unavailable and the
    /// local JSON store is used without probing.
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub frontend_origin: String,
    /// Base URL embedded in complaint deep links.
    pub public_base_url: String,
    pub blob_store_url: Option<String>,
    pub blob_store_token: Option<String>,
    pub vision_api_url: Option<String>,
    pub web3forms_access_key: Option<String>,
    pub poll_interval: Duration,
    pub notification_retention_days: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let frontend_origin =
            env::var("FRONTEND_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        let poll_interval = env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));

        let notification_retention_days = env::var("NOTIFICATION_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_NOTIFICATION_RETENTION_DAYS);

        Config {
            port,
            database_url,
            data_dir,
            frontend_origin,
            public_base_url,
            blob_store_url: env::var("BLOB_STORE_URL").ok().filter(|v| !v.is_empty()),
            blob_store_token: env::var("BLOB_STORE_TOKEN").ok().filter(|v| !v.is_empty()),
            vision_api_url: env::var("VISION_API_URL").ok().filter(|v| !v.is_empty()),
            web3forms_access_key: env::var("WEB3FORMS_ACCESS_KEY")
                .ok()
                .filter(|v| !v.is_empty()),
            poll_interval,
            notification_retention_days,
        }
    }
}
