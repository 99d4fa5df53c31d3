use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use reqwest::Client;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use civix_backend::config::Config;
use civix_backend::models::worker::default_roster;
use civix_backend::responses::JsonResponse;
use civix_backend::routes::{auth, complaints, notifications, reports, uploads, workers};
use civix_backend::services::blob::BlobClient;
use civix_backend::services::relay::{ComplaintRelay, Web3FormsRelay};
use civix_backend::services::vision::{HttpImageValidator, ImageValidator};
use civix_backend::state::AppState;
use civix_backend::store::{LocalReportStore, PostgresReportStore, ReportStore};
use civix_backend::sweeper;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env());
    let http_client = Client::new();

    let store = select_store(&config, &http_client).await;

    let vision: Option<Arc<dyn ImageValidator>> = config.vision_api_url.as_ref().map(|url| {
        Arc::new(HttpImageValidator::new(http_client.clone(), url.clone()))
            as Arc<dyn ImageValidator>
    });
    let relay: Option<Arc<dyn ComplaintRelay>> =
        config.web3forms_access_key.as_ref().map(|key| {
            Arc::new(Web3FormsRelay::new(http_client.clone(), key.clone()))
                as Arc<dyn ComplaintRelay>
        });
    if relay.is_none() {
        warn!("WEB3FORMS_ACCESS_KEY not set, complaint relay disabled");
    }

    let state = AppState {
        store,
        vision,
        relay,
        workers: Arc::new(Mutex::new(default_roster())),
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .expect("FRONTEND_ORIGIN must be a valid origin"),
        )
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([CONTENT_TYPE]);

    let report_routes = Router::new()
        .route("/", post(reports::create_report).get(reports::list_reports))
        .route("/events", get(reports::report_events))
        .route("/{report_id}", patch(reports::patch_report))
        .route("/{report_id}/status", post(reports::change_report_status))
        .route("/{report_id}/complaint", post(complaints::submit_complaint));

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route(
            "/{notification_id}/read",
            post(notifications::mark_notification_read),
        );

    let app = Router::new()
        .route("/", get(root))
        .route("/api/auth/login", post(auth::handle_login))
        .nest("/api/reports", report_routes)
        .nest("/api/notifications", notification_routes)
        .route(
            "/api/complaints/status",
            get(complaints::update_complaint_status),
        )
        .route("/api/uploads", post(uploads::upload_image))
        .route("/api/workers", get(workers::list_workers))
        .with_state(state.clone())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );

    sweeper::start_notification_sweeper(state).await;

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await.expect("failed to bind port");
    info!("listening on http://{}", addr);
    axum::serve(listener, app).await.unwrap();
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("CivicX reporting API").into_response()
}

/// Picks the backend once at startup. An unset DATABASE_URL means remote is
/// permanently unavailable and the local store is chosen without a probe; a
/// set-but-unreachable database is logged and masked by the local fallback.
/// The choice is never revisited per call.
async fn select_store(config: &Config, http_client: &Client) -> Arc<dyn ReportStore> {
    if let Some(url) = &config.database_url {
        match PgPool::connect(url).await {
            Ok(pool) => match sqlx::migrate!().run(&pool).await {
                Ok(()) => {
                    info!("✅ Successfully connected to the database");
                    let blob = config.blob_store_url.as_ref().map(|base| {
                        BlobClient::new(
                            http_client.clone(),
                            base.clone(),
                            config.blob_store_token.clone(),
                        )
                    });
                    return Arc::new(PostgresReportStore::new(pool, blob));
                }
                Err(err) => warn!(?err, "database migration failed, using local store"),
            },
            Err(err) => warn!(?err, "database unreachable, using local store"),
        }
    } else {
        info!("DATABASE_URL not set, using local JSON store");
    }
    Arc::new(LocalReportStore::new(&config.data_dir, config.poll_interval))
}
