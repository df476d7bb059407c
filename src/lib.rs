pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod schemas;
pub mod store;
pub mod use_cases;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use crate::ports::Ledger;
use crate::use_cases::{GetBalance, Withdraw};

/// OpenAPI document for the wallet HTTP surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::wallet::withdraw,
        handlers::wallet::balance,
    ),
    components(
        schemas(
            schemas::WithdrawRequest,
            schemas::WithdrawResponse,
            schemas::BalanceResponse,
            schemas::HealthResponse,
            schemas::ErrorResponse,
        )
    ),
    info(
        title = "Wallet Service API",
        version = "0.1.0",
        description = "Withdraw funds from and query the balance of user wallets"
    ),
    tags(
        (name = "Health", description = "Liveness endpoint"),
        (name = "Wallet", description = "Wallet operations"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub withdraw: Arc<Withdraw>,
    pub get_balance: Arc<GetBalance>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>, request_timeout: Duration) -> Self {
        Self {
            withdraw: Arc::new(Withdraw::new(ledger.clone())),
            get_balance: Arc::new(GetBalance::new(ledger)),
            request_timeout,
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/withdraw", post(handlers::wallet::withdraw))
        .route("/balance", get(handlers::wallet::balance))
}

/// Builds the router. Wallet routes are served both at the root and under
/// `/api/v1`.
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .nest("/api/v1", routes())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::recovery::recovery_layer())
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(app_state)
}

/// Comma-separated origins, or `*` for any.
pub fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| o.parse().ok())
        .collect();
    layer.allow_origin(origins)
}
