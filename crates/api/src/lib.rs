//! HTTP boundary for the marketplace fulfillment core.
//!
//! Handlers are thin: resolve the current user, check the request's CSRF
//! token against the session, call one coordinator operation, translate the
//! result. Observability comes from tracing and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod session;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fulfillment::{CategoryDirectory, FulfillmentCoordinator, PaymentClient, ShipmentClient};
use metrics_exporter_prometheus::PrometheusHandle;
use store::MarketStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use session::SessionService;

/// Shared application state accessible from all handlers.
pub struct AppState<S, P, Sh, C>
where
    S: MarketStore,
{
    /// Gateway handle for the unlocked display reads (label retrieval).
    pub store: S,
    pub coordinator: FulfillmentCoordinator<S, P, Sh, C>,
    pub sessions: Arc<dyn SessionService>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, P, Sh, C>(
    state: Arc<AppState<S, P, Sh, C>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: MarketStore + 'static,
    P: PaymentClient + 'static,
    Sh: ShipmentClient + 'static,
    C: CategoryDirectory + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/buy", post(routes::transactions::buy::<S, P, Sh, C>))
        .route("/ship", post(routes::transactions::ship::<S, P, Sh, C>))
        .route(
            "/ship_done",
            post(routes::transactions::ship_done::<S, P, Sh, C>),
        )
        .route(
            "/complete",
            post(routes::transactions::complete::<S, P, Sh, C>),
        )
        .route(
            "/transactions/{file}",
            get(routes::transactions::label::<S, P, Sh, C>),
        )
        .route("/sell", post(routes::items::sell::<S, P, Sh, C>))
        .route("/items/edit", post(routes::items::edit::<S, P, Sh, C>))
        .route("/bump", post(routes::items::bump::<S, P, Sh, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
