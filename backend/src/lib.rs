//! Retail POS backend
//!
//! Point-of-sale API: catalogue and stock, customers and suppliers with
//! running balances, transactional sales, expenses and reports.

use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Router};
use services::auth::TokenKeys;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    /// JWT keys derived from `config.jwt` once at startup
    pub keys: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let keys = Arc::new(TokenKeys::new(&config.jwt));
        Self {
            db,
            config: Arc::new(config),
            keys,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors.allowed_origins);

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api", routes::api_routes(state.clone()));

    // 500 bodies carry the underlying error only in development
    if state.config.is_development() {
        router = router.layer(axum::middleware::from_fn(middleware::expose_error_details));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Any origin when none are configured, otherwise the configured list
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

/// Root endpoint
async fn root() -> &'static str {
    "Retail POS API v1.0"
}
