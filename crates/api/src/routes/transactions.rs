//! Saga entry points: buy, ship, ship done, complete, label retrieval.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use common::{ItemId, TransactionEvidenceId};
use domain::ShippingStatus;
use fulfillment::{CategoryDirectory, PaymentClient, ShipmentClient};
use serde::{Deserialize, Serialize};
use store::MarketStore;

use crate::AppState;
use crate::error::ApiError;
use crate::session::current_session;

// -- Request types --

#[derive(Deserialize)]
pub struct BuyRequest {
    pub csrf_token: String,
    pub item_id: i64,
    /// One-time card token from the payment widget.
    pub token: String,
}

#[derive(Deserialize)]
pub struct ShipRequest {
    pub csrf_token: String,
    pub item_id: i64,
}

#[derive(Deserialize)]
pub struct ShipDoneRequest {
    pub csrf_token: String,
    pub item_id: i64,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub csrf_token: String,
    pub item_id: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct TransactionEvidenceResponse {
    pub transaction_evidence_id: TransactionEvidenceId,
}

#[derive(Serialize)]
pub struct ShipResponse {
    pub path: String,
    pub reserve_id: String,
}

// -- Handlers --

/// POST /buy — purchase an item.
#[tracing::instrument(skip_all)]
pub async fn buy<S, P, Sh, C>(
    State(state): State<Arc<AppState<S, P, Sh, C>>>,
    headers: HeaderMap,
    Json(req): Json<BuyRequest>,
) -> Result<Json<TransactionEvidenceResponse>, ApiError>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    let session = current_session(state.sessions.as_ref(), &headers).await?;
    session.require_csrf(&req.csrf_token)?;

    let transaction_evidence_id = state
        .coordinator
        .purchase(session.user_id, ItemId::new(req.item_id), &req.token)
        .await?;

    Ok(Json(TransactionEvidenceResponse {
        transaction_evidence_id,
    }))
}

/// POST /ship — reserve a carrier pickup for a sold item.
#[tracing::instrument(skip_all)]
pub async fn ship<S, P, Sh, C>(
    State(state): State<Arc<AppState<S, P, Sh, C>>>,
    headers: HeaderMap,
    Json(req): Json<ShipRequest>,
) -> Result<Json<ShipResponse>, ApiError>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    let session = current_session(state.sessions.as_ref(), &headers).await?;
    session.require_csrf(&req.csrf_token)?;

    let reservation = state
        .coordinator
        .reserve_pickup(session.user_id, ItemId::new(req.item_id))
        .await?;

    Ok(Json(ShipResponse {
        path: reservation.label_path,
        reserve_id: reservation.reserve_id,
    }))
}

/// POST /ship_done — confirm the parcel was handed to the carrier.
#[tracing::instrument(skip_all)]
pub async fn ship_done<S, P, Sh, C>(
    State(state): State<Arc<AppState<S, P, Sh, C>>>,
    headers: HeaderMap,
    Json(req): Json<ShipDoneRequest>,
) -> Result<Json<TransactionEvidenceResponse>, ApiError>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    let session = current_session(state.sessions.as_ref(), &headers).await?;
    session.require_csrf(&req.csrf_token)?;

    let transaction_evidence_id = state
        .coordinator
        .confirm_handoff(session.user_id, ItemId::new(req.item_id))
        .await?;

    Ok(Json(TransactionEvidenceResponse {
        transaction_evidence_id,
    }))
}

/// POST /complete — confirm delivery and close the trade.
#[tracing::instrument(skip_all)]
pub async fn complete<S, P, Sh, C>(
    State(state): State<Arc<AppState<S, P, Sh, C>>>,
    headers: HeaderMap,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<TransactionEvidenceResponse>, ApiError>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    let session = current_session(state.sessions.as_ref(), &headers).await?;
    session.require_csrf(&req.csrf_token)?;

    let transaction_evidence_id = state
        .coordinator
        .confirm_delivery(session.user_id, ItemId::new(req.item_id))
        .await?;

    Ok(Json(TransactionEvidenceResponse {
        transaction_evidence_id,
    }))
}

/// GET /transactions/:id.png — the stored pickup label.
///
/// Seller-only, and only while the shipment is between pickup reservation
/// and delivery. Uses unlocked reads: nothing is mutated here.
#[tracing::instrument(skip_all)]
pub async fn label<S, P, Sh, C>(
    State(state): State<Arc<AppState<S, P, Sh, C>>>,
    headers: HeaderMap,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    let session = current_session(state.sessions.as_ref(), &headers).await?;

    let evidence_id = file
        .strip_suffix(".png")
        .and_then(|id| id.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .map(TransactionEvidenceId::new)
        .ok_or_else(|| ApiError::BadRequest("incorrect transaction evidence id".to_string()))?;

    let evidence = state
        .store
        .get_evidence(evidence_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("transaction evidence not found".to_string()))?;

    if evidence.seller_id != session.user_id {
        return Err(ApiError::Forbidden("forbidden".to_string()));
    }

    let shipping = state
        .store
        .get_shipping(evidence_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("shipping not found".to_string()))?;

    if !matches!(
        shipping.status,
        ShippingStatus::WaitPickup | ShippingStatus::Shipping
    ) {
        return Err(ApiError::Forbidden("label not available".to_string()));
    }

    if shipping.img_binary.is_empty() {
        return Err(ApiError::Internal("empty label image".to_string()));
    }

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        shipping.img_binary,
    ))
}
