use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::models::worker::FieldWorker;
use crate::services::relay::ComplaintRelay;
use crate::services::vision::ImageValidator;
use crate::store::ReportStore;

#[derive(Clone)]
pub struct AppState {
    /// The backend chosen once at startup; handlers never know which one.
    pub store: Arc<dyn ReportStore>,
    pub vision: Option<Arc<dyn ImageValidator>>,
    pub relay: Option<Arc<dyn ComplaintRelay>>,
    pub workers: Arc<Mutex<Vec<FieldWorker>>>,
    pub config: Arc<Config>,
}

#[cfg(test)]
pub fn test_state() -> AppState {
    use crate::models::worker::default_roster;
    use crate::store::LocalReportStore;
    use std::path::PathBuf;
    use std::time::Duration;

    let data_dir = std::env::temp_dir().join(format!("civix-test-{}", uuid::Uuid::new_v4()));
    AppState {
        store: Arc::new(LocalReportStore::new(data_dir, Duration::from_millis(50))),
        vision: None,
        relay: None,
        workers: Arc::new(Mutex::new(default_roster())),
        config: Arc::new(Config {
            port: 0,
            database_url: None,
            data_dir: PathBuf::from("data"),
            frontend_origin: "http://localhost:3000".into(),
            public_base_url: "http://localhost:3000".into(),
            blob_store_url: None,
            blob_store_token: None,
            vision_api_url: None,
            web3forms_access_key: None,
            poll_interval: Duration::from_millis(50),
            notification_retention_days: 30,
        }),
    }
}
