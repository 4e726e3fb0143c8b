use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use evdealer_backend::api::{self, AppState};
use evdealer_backend::config::Config;
use evdealer_backend::database;
use evdealer_backend::database::store::PgSettlementStore;
use evdealer_backend::payments::checkout::CheckoutService;
use evdealer_backend::payments::providers::{vnpay::VnpayProvider, zalopay::ZalopayProvider};
use evdealer_backend::settlement::{SettlementRecorder, SettlementStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration once; everything downstream gets it by reference.
    let config = Arc::new(Config::from_env()?);

    tracing::info!("Starting EV dealer payment backend");
    tracing::info!("Environment: {}", config.server.environment);

    let pool = database::init_pool(
        &config.database.url,
        Some(database::PoolConfig {
            max_connections: config.database.max_connections,
            ..Default::default()
        }),
    )
    .await?;

    let store: Arc<dyn SettlementStore> = Arc::new(PgSettlementStore::new(pool.clone()));
    let vnpay = Arc::new(VnpayProvider::new(config.vnpay.clone()));
    let zalopay = Arc::new(ZalopayProvider::new(config.zalopay.clone()));

    let state = AppState {
        config: config.clone(),
        pool,
        checkout: Arc::new(CheckoutService::new(
            store.clone(),
            vnpay.clone(),
            zalopay.clone(),
        )),
        recorder: Arc::new(SettlementRecorder::new(store)),
        vnpay,
        zalopay,
    };

    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/api/checkout", post(api::checkout::create_checkout))
        .route("/api/payments/vnpay/return", get(api::callbacks::vnpay_return))
        .route("/api/payments/vnpay/ipn", get(api::callbacks::vnpay_ipn))
        .route(
            "/api/payments/zalopay/callback",
            post(api::callbacks::zalopay_callback),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.server.bind_addr();
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
