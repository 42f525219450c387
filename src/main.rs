use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod stats;
mod store;

use auth::rate_limit::RateLimitState;
use config::Config;
use stats::{Clock, SystemClock};
use store::PgDailyLogStore;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub ws_tx: Option<broadcast::Sender<String>>,
    pub rate_limiter: RateLimitState,
    /// Injected so week-offset math is deterministic under test.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// The daily-log store the stats endpoints read through.
    pub fn log_store(&self) -> PgDailyLogStore {
        PgDailyLogStore::new(self.db.clone())
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodlog_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    // Database
    let db = db::create_pool(&config.database_url).await;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    // Feed event broadcast channel
    let (ws_tx, _) = broadcast::channel::<String>(256);

    let state = AppState {
        db,
        config: config.clone(),
        ws_tx: Some(ws_tx),
        rate_limiter: RateLimitState::new(),
        clock: Arc::new(SystemClock),
    };

    // Auth routes with per-IP rate limiting
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler))
        .merge(auth_routes);

    let protected_routes = Router::new()
        // Profile
        .route("/api/me", get(handlers::auth::me))
        .route("/api/me", put(handlers::auth::update_me))
        .route("/api/me", delete(handlers::auth::delete_account))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Food tag vocabulary
        .route("/api/food-tags", get(handlers::food_tags::list_tags))
        .route("/api/food-tags", post(handlers::food_tags::add_tag))
        // Daily logs
        .route("/api/daily-logs", put(handlers::daily_logs::upsert_daily_log))
        .route("/api/daily-logs", get(handlers::daily_logs::list_daily_logs))
        .route("/api/daily-logs/:date", get(handlers::daily_logs::get_daily_log))
        // Stats
        .route("/api/stats/overview", get(handlers::stats::get_overview))
        .route("/api/stats/trend", get(handlers::stats::get_trend))
        .route("/api/stats/food/:name", get(handlers::stats::get_food_links))
        .route(
            "/api/stats/symptom-foods",
            get(handlers::stats::get_symptom_foods),
        )
        .route("/api/stats/export", get(handlers::stats::export_stats))
        // Weekly report
        .route(
            "/api/reports/weekly",
            get(handlers::reports::get_weekly_report),
        )
        // Feed
        .route("/api/posts", get(handlers::feed::list_posts))
        .route("/api/posts", post(handlers::feed::create_post))
        .route("/api/posts/:id", delete(handlers::feed::delete_post))
        .route("/api/posts/:id/like", post(handlers::feed::toggle_post_like))
        .route("/api/posts/:id/comments", get(handlers::feed::list_comments))
        .route(
            "/api/posts/:id/comments",
            post(handlers::feed::create_comment),
        )
        .route("/api/comments/:id", delete(handlers::feed::delete_comment))
        .route(
            "/api/comments/:id/like",
            post(handlers::feed::toggle_comment_like),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    // Client IP is needed for rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .unwrap();
}
