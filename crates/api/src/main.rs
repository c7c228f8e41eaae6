//! API server entry point.

use std::sync::Arc;

use api::AppState;
use api::config::Config;
use api::session::{SessionService, StaticSessions};
use common::CategoryId;
use domain::Category;
use fulfillment::{
    FulfillmentCoordinator, HttpPaymentClient, HttpShipmentClient, StaticCategories,
};
use store::PostgresStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// The category tree normally served by the catalog collaborator.
fn default_categories() -> StaticCategories {
    let root = |id, name: &str| Category {
        id: CategoryId::new(id),
        parent_id: None,
        name: name.to_string(),
    };
    let child = |id, parent, name: &str| Category {
        id: CategoryId::new(id),
        parent_id: Some(CategoryId::new(parent)),
        name: name.to_string(),
    };

    StaticCategories::new([
        root(1, "apparel"),
        child(11, 1, "jackets"),
        child(12, 1, "shoes"),
        root(2, "electronics"),
        child(21, 2, "audio"),
        child(22, 2, "cameras"),
        root(3, "furniture"),
        child(31, 3, "lighting"),
        child(32, 3, "chairs"),
    ])
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let config = Config::from_env();

    // 3. Connect the gateway and run migrations
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    let store = PostgresStore::new(pool);
    store.run_migrations().await.expect("migrations failed");

    // 4. External service clients, one shared HTTP client with the bounded
    //    per-call timeout
    let http = reqwest::Client::builder()
        .timeout(config.external_timeout)
        .build()
        .expect("failed to build HTTP client");
    let payment = HttpPaymentClient::new(
        http.clone(),
        config.payment_service_url.clone(),
        config.payment_api_key.clone(),
    );
    let shipment = HttpShipmentClient::new(
        http,
        config.shipment_service_url.clone(),
        config.shipment_api_key.clone(),
    );

    // 5. Coordinator and application state
    let coordinator = FulfillmentCoordinator::new(
        store.clone(),
        payment,
        shipment,
        default_categories(),
        config.payment_shop_id.clone(),
    );
    let sessions: Arc<dyn SessionService> = Arc::new(StaticSessions::new());
    let state = Arc::new(AppState {
        store,
        coordinator,
        sessions,
    });

    // 6. Build and start the server
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
