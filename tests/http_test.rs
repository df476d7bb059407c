use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wallet_service::domain::{Money, UserId, Wallet};
use wallet_service::ports::{
    Ledger, RepositoryResult, TransactionRepository, UnitOfWork, WalletRepository,
};
use wallet_service::config::Config;
use wallet_service::store::MemoryLedger;
use wallet_service::use_cases::{OpenWallet, OpenWalletInput};
use wallet_service::{create_app, AppState};

const TIMEOUT: Duration = Duration::from_secs(10);

async fn setup(balance: i64) -> (Router, Arc<MemoryLedger>, UserId) {
    let ledger = Arc::new(MemoryLedger::new());
    let user_id = UserId::new();
    let wallet = Wallet::with_balance(user_id, Money::new(balance).unwrap());
    ledger.wallets().create(&wallet).await.unwrap();
    let app = create_app(AppState::new(ledger.clone(), TIMEOUT));
    (app, ledger, user_id)
}

fn withdraw_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn raw_withdraw_request(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/withdraw")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (app, _, _) = setup(0).await;
    let (status, body) = send(&app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Wallet service is running");
}

#[tokio::test]
async fn test_withdraw_then_balance() {
    let (app, ledger, user_id) = setup(10_000).await;

    let (status, body) = send(
        &app,
        withdraw_request("/withdraw", json!({"user_id": user_id.to_string(), "amount": 2500})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["amount_withdrawn"], 2500);
    assert_eq!(body["new_balance"], 7500);
    assert_eq!(body["user_id"], user_id.to_string());

    let (status, body) = send(&app, get_request(&format!("/balance?user_id={}", user_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 7500);
    assert_eq!(body["user_id"], user_id.to_string());

    assert_eq!(ledger.transaction_store().all().await.len(), 1);
}

#[tokio::test]
async fn test_seeded_memory_wallets_accept_withdrawals() {
    let user_id = UserId::new();
    let seeds = format!("{}:1200", user_id);
    let config = Config::from_lookup(|key| match key {
        "SEED_WALLETS" => Some(seeds.clone()),
        _ => None,
    })
    .unwrap()
    .config;

    let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());
    let open_wallet = OpenWallet::new(ledger.clone());
    for seed in &config.seed_wallets {
        open_wallet
            .execute(OpenWalletInput {
                user_id: seed.user_id,
                initial_balance: seed.balance,
            })
            .await
            .unwrap();
    }
    let app = create_app(AppState::new(ledger, TIMEOUT));

    let (status, body) = send(
        &app,
        withdraw_request("/withdraw", json!({"user_id": user_id.to_string(), "amount": 200})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_balance"], 1000);
}

#[tokio::test]
async fn test_versioned_mount_point() {
    let (app, _, user_id) = setup(500).await;

    let (status, body) = send(
        &app,
        withdraw_request(
            "/api/v1/withdraw",
            json!({"user_id": user_id.to_string(), "amount": 200}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_balance"], 300);

    let (status, body) = send(
        &app,
        get_request(&format!("/api/v1/balance?user_id={}", user_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 300);

    let (status, _) = send(&app, get_request("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_insufficient_funds_leaves_balance_unchanged() {
    let (app, ledger, user_id) = setup(1_000).await;

    let (status, body) = send(
        &app,
        withdraw_request("/withdraw", json!({"user_id": user_id.to_string(), "amount": 999999})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_funds");

    let (_, body) = send(&app, get_request(&format!("/balance?user_id={}", user_id))).await;
    assert_eq!(body["balance"], 1000);
    assert!(ledger.transaction_store().all().await.is_empty());
}

#[tokio::test]
async fn test_withdraw_exact_balance() {
    let (app, _, user_id) = setup(1_000).await;
    let (status, body) = send(
        &app,
        withdraw_request("/withdraw", json!({"user_id": user_id.to_string(), "amount": 1000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_balance"], 0);
}

#[tokio::test]
async fn test_unknown_wallet() {
    let (app, _, _) = setup(0).await;
    let stranger = UserId::new();

    let (status, body) = send(&app, get_request(&format!("/balance?user_id={}", stranger))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "wallet_not_found");

    let (status, body) = send(
        &app,
        withdraw_request("/withdraw", json!({"user_id": stranger.to_string(), "amount": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "wallet_not_found");
}

#[tokio::test]
async fn test_balance_parameter_validation() {
    let (app, _, _) = setup(0).await;

    let (status, body) = send(&app, get_request("/balance")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_parameter");

    let (status, body) = send(&app, get_request("/balance?user_id=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_parameter");

    let (status, body) = send(&app, get_request("/balance?user_id=not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_withdraw_validation_errors() {
    let (app, ledger, user_id) = setup(1_000).await;
    let id = user_id.to_string();

    let cases = [
        json!({"amount": 100}),
        json!({"user_id": "", "amount": 100}),
        json!({"user_id": "not-a-uuid", "amount": 100}),
        json!({"user_id": id}),
        json!({"user_id": id, "amount": 0}),
        json!({"user_id": id, "amount": -10}),
    ];
    for case in cases {
        let (status, body) = send(&app, withdraw_request("/withdraw", case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case {}", case);
        assert_eq!(body["error"], "validation_error", "case {}", case);
    }

    let stored = ledger.wallets().find_by_user_id(user_id).await.unwrap();
    assert_eq!(stored.balance().amount(), 1_000);
}

#[tokio::test]
async fn test_malformed_json_is_invalid_request() {
    let (app, _, _) = setup(0).await;

    let (status, body) = send(&app, raw_withdraw_request("{\"user_id\": ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    for wrongly_typed in [
        "{\"user_id\": \"3fa85f64-5717-4562-b3fc-2c963f66afa6\", \"amount\": \"abc\"}",
        "{\"user_id\": \"3fa85f64-5717-4562-b3fc-2c963f66afa6\", \"amount\": 1.5}",
        "{\"user_id\": 42, \"amount\": 10}",
    ] {
        let (status, body) = send(&app, raw_withdraw_request(wrongly_typed)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", wrongly_typed);
        assert_eq!(body["error"], "invalid_request", "body {}", wrongly_typed);
        assert_eq!(body["message"], "Invalid JSON format");
    }

    let missing_content_type = Request::builder()
        .method("POST")
        .uri("/withdraw")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(&app, missing_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_openapi_document() {
    let (app, _, _) = setup(0).await;
    let (status, body) = send(&app, get_request("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/withdraw"].is_object());
    assert!(body["paths"]["/balance"].is_object());
}

/// Ledger whose units of work never open in time.
struct StalledLedger {
    inner: MemoryLedger,
}

#[async_trait]
impl Ledger for StalledLedger {
    fn wallets(&self) -> &dyn WalletRepository {
        self.inner.wallets()
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        self.inner.transactions()
    }

    async fn begin(&self) -> RepositoryResult<Box<dyn UnitOfWork>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.inner.begin().await
    }

    fn backend(&self) -> &'static str {
        "stalled"
    }
}

#[tokio::test]
async fn test_withdraw_times_out() {
    let ledger = Arc::new(StalledLedger {
        inner: MemoryLedger::new(),
    });
    let app = create_app(AppState::new(ledger, Duration::from_millis(50)));

    let (status, body) = send(
        &app,
        withdraw_request("/withdraw", json!({"user_id": UserId::new().to_string(), "amount": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "request_timeout");
}

/// Ledger that panics as soon as a withdrawal starts.
struct PanickingLedger {
    inner: MemoryLedger,
}

#[async_trait]
impl Ledger for PanickingLedger {
    fn wallets(&self) -> &dyn WalletRepository {
        self.inner.wallets()
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        self.inner.transactions()
    }

    async fn begin(&self) -> RepositoryResult<Box<dyn UnitOfWork>> {
        panic!("storage driver exploded");
    }

    fn backend(&self) -> &'static str {
        "panicking"
    }
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error() {
    let ledger = Arc::new(PanickingLedger {
        inner: MemoryLedger::new(),
    });
    let app = create_app(AppState::new(ledger, TIMEOUT));

    let (status, body) = send(
        &app,
        withdraw_request("/withdraw", json!({"user_id": UserId::new().to_string(), "amount": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert_eq!(body["message"], "An unexpected error occurred");

    let (status, _) = send(&app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
}
