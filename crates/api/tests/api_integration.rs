//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use api::session::{IssuedSession, SessionService, StaticSessions};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::CategoryId;
use domain::{Category, NewUser, ShippingStatus, User};
use fulfillment::{
    AuthorizationStatus, FulfillmentCoordinator, StaticCategories, StubPaymentClient,
    StubShipmentClient,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, MarketStore, MarketTx};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestContext {
    app: axum::Router,
    store: InMemoryStore,
    sessions: Arc<StaticSessions>,
    payment: StubPaymentClient,
    shipment: StubShipmentClient,
}

impl TestContext {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let payment = StubPaymentClient::new();
        let shipment = StubShipmentClient::new();
        let categories = StaticCategories::new([
            Category {
                id: CategoryId::new(1),
                parent_id: None,
                name: "furniture".to_string(),
            },
            Category {
                id: CategoryId::new(10),
                parent_id: Some(CategoryId::new(1)),
                name: "lighting".to_string(),
            },
        ]);
        let sessions = Arc::new(StaticSessions::new());

        let coordinator = FulfillmentCoordinator::new(
            store.clone(),
            payment.clone(),
            shipment.clone(),
            categories,
            "11",
        );
        let state = Arc::new(AppState {
            store: store.clone(),
            coordinator,
            sessions: sessions.clone() as Arc<dyn SessionService>,
        });
        let app = api::create_app(state, get_metrics_handle());

        Self {
            app,
            store,
            sessions,
            payment,
            shipment,
        }
    }

    async fn seed_user(&self, name: &str) -> (User, IssuedSession) {
        let mut tx = self.store.begin().await.unwrap();
        let user = tx
            .insert_user(NewUser {
                account_name: name.to_string(),
                address: format!("{name} street 1"),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        let session = self.sessions.issue(user.id);
        (user, session)
    }

    async fn post_json(
        &self,
        uri: &str,
        session: Option<&IssuedSession>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(session) = session {
            builder = builder.header("authorization", format!("Bearer {}", session.token));
        }
        let request = builder
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Lists an item over HTTP and returns its id.
    async fn sell_item(&self, session: &IssuedSession) -> i64 {
        let (status, json) = self
            .post_json(
                "/sell",
                Some(session),
                serde_json::json!({
                    "csrf_token": session.csrf_token,
                    "name": "lamp",
                    "description": "desk lamp",
                    "price": 500,
                    "category_id": 10,
                    "image_name": "lamp.jpg",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        json["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn health_check() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn buy_requires_a_session() {
    let ctx = TestContext::new();
    let (_, seller_session) = ctx.seed_user("seller").await;
    let item_id = ctx.sell_item(&seller_session).await;

    let (status, _) = ctx
        .post_json(
            "/buy",
            None,
            serde_json::json!({ "csrf_token": "x", "item_id": item_id, "token": "TOK-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn buy_rejects_a_mismatched_csrf_token() {
    let ctx = TestContext::new();
    let (_, seller_session) = ctx.seed_user("seller").await;
    let (_, buyer_session) = ctx.seed_user("buyer").await;
    let item_id = ctx.sell_item(&seller_session).await;

    let (status, json) = ctx
        .post_json(
            "/buy",
            Some(&buyer_session),
            serde_json::json!({ "csrf_token": "wrong", "item_id": item_id, "token": "TOK-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "csrf token error");
}

#[tokio::test]
async fn full_trade_over_http() {
    let ctx = TestContext::new();
    let (seller, seller_session) = ctx.seed_user("seller").await;
    let (_, buyer_session) = ctx.seed_user("buyer").await;
    let item_id = ctx.sell_item(&seller_session).await;

    // Buy
    let (status, json) = ctx
        .post_json(
            "/buy",
            Some(&buyer_session),
            serde_json::json!({
                "csrf_token": buyer_session.csrf_token,
                "item_id": item_id,
                "token": "TOK-1",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let evidence_id = json["transaction_evidence_id"].as_i64().unwrap();

    // Ship
    let (status, json) = ctx
        .post_json(
            "/ship",
            Some(&seller_session),
            serde_json::json!({ "csrf_token": seller_session.csrf_token, "item_id": item_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["path"], format!("/transactions/{evidence_id}.png"));
    assert!(json["reserve_id"].as_str().unwrap().starts_with("RSV-"));

    // Ship done once the carrier reports the parcel moving
    ctx.shipment.set_carrier_status(ShippingStatus::Shipping);
    let (status, json) = ctx
        .post_json(
            "/ship_done",
            Some(&seller_session),
            serde_json::json!({ "csrf_token": seller_session.csrf_token, "item_id": item_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["transaction_evidence_id"].as_i64().unwrap(), evidence_id);

    // Complete once delivered
    ctx.shipment.set_carrier_status(ShippingStatus::Done);
    let (status, json) = ctx
        .post_json(
            "/complete",
            Some(&buyer_session),
            serde_json::json!({ "csrf_token": buyer_session.csrf_token, "item_id": item_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["transaction_evidence_id"].as_i64().unwrap(), evidence_id);

    let seller = ctx.store.get_user(seller.id).await.unwrap().unwrap();
    // One increment from listing, one from the completed sale.
    assert_eq!(seller.num_sell_items, 2);
}

#[tokio::test]
async fn declined_payment_maps_to_bad_request() {
    let ctx = TestContext::new();
    let (_, seller_session) = ctx.seed_user("seller").await;
    let (_, buyer_session) = ctx.seed_user("buyer").await;
    let item_id = ctx.sell_item(&seller_session).await;

    ctx.payment.set_status(AuthorizationStatus::Fail);
    let (status, json) = ctx
        .post_json(
            "/buy",
            Some(&buyer_session),
            serde_json::json!({
                "csrf_token": buyer_session.csrf_token,
                "item_id": item_id,
                "token": "TOK-1",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("payment declined")
    );
}

#[tokio::test]
async fn ship_by_a_non_seller_is_forbidden() {
    let ctx = TestContext::new();
    let (_, seller_session) = ctx.seed_user("seller").await;
    let (_, buyer_session) = ctx.seed_user("buyer").await;
    let item_id = ctx.sell_item(&seller_session).await;

    ctx.post_json(
        "/buy",
        Some(&buyer_session),
        serde_json::json!({
            "csrf_token": buyer_session.csrf_token,
            "item_id": item_id,
            "token": "TOK-1",
        }),
    )
    .await;

    let (status, _) = ctx
        .post_json(
            "/ship",
            Some(&buyer_session),
            serde_json::json!({ "csrf_token": buyer_session.csrf_token, "item_id": item_id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn label_is_seller_only_and_window_bound() {
    let ctx = TestContext::new();
    let (_, seller_session) = ctx.seed_user("seller").await;
    let (_, buyer_session) = ctx.seed_user("buyer").await;
    let item_id = ctx.sell_item(&seller_session).await;

    let (_, json) = ctx
        .post_json(
            "/buy",
            Some(&buyer_session),
            serde_json::json!({
                "csrf_token": buyer_session.csrf_token,
                "item_id": item_id,
                "token": "TOK-1",
            }),
        )
        .await;
    let evidence_id = json["transaction_evidence_id"].as_i64().unwrap();
    let label_uri = format!("/transactions/{evidence_id}.png");

    let fetch_label = |session: &IssuedSession| {
        let request = Request::builder()
            .uri(&label_uri)
            .header("authorization", format!("Bearer {}", session.token))
            .body(Body::empty())
            .unwrap();
        let app = ctx.app.clone();
        async move { app.oneshot(request).await.unwrap() }
    };

    // Before the pickup is reserved the label does not exist yet.
    let response = fetch_label(&seller_session).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    ctx.post_json(
        "/ship",
        Some(&seller_session),
        serde_json::json!({ "csrf_token": seller_session.csrf_token, "item_id": item_id }),
    )
    .await;

    // The buyer may not fetch the seller's label.
    let response = fetch_label(&buyer_session).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The seller gets the stored bytes.
    let response = fetch_label(&seller_session).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "image/png"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(!bytes.is_empty());

    // After delivery the window closes.
    ctx.shipment.set_carrier_status(ShippingStatus::Shipping);
    ctx.post_json(
        "/ship_done",
        Some(&seller_session),
        serde_json::json!({ "csrf_token": seller_session.csrf_token, "item_id": item_id }),
    )
    .await;
    ctx.shipment.set_carrier_status(ShippingStatus::Done);
    ctx.post_json(
        "/complete",
        Some(&buyer_session),
        serde_json::json!({ "csrf_token": buyer_session.csrf_token, "item_id": item_id }),
    )
    .await;

    let response = fetch_label(&seller_session).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn price_bounds_are_rejected_before_any_lock() {
    let ctx = TestContext::new();
    let (_, seller_session) = ctx.seed_user("seller").await;

    let (status, json) = ctx
        .post_json(
            "/sell",
            Some(&seller_session),
            serde_json::json!({
                "csrf_token": seller_session.csrf_token,
                "name": "lamp",
                "description": "desk lamp",
                "price": 5,
                "category_id": 10,
                "image_name": "lamp.jpg",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("price"));
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
