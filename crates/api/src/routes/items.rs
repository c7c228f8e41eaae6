//! Listing endpoints: sell, price edit, bump.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use common::ItemId;
use domain::{Item, Price};
use fulfillment::{CategoryDirectory, NewListing, PaymentClient, ShipmentClient};
use serde::{Deserialize, Serialize};
use store::MarketStore;

use crate::AppState;
use crate::error::ApiError;
use crate::session::current_session;

// -- Request types --

#[derive(Deserialize)]
pub struct SellRequest {
    pub csrf_token: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category_id: i64,
    /// Already-uploaded image, resolved by the out-of-scope upload handler.
    pub image_name: String,
}

#[derive(Deserialize)]
pub struct ItemEditRequest {
    pub csrf_token: String,
    pub item_id: i64,
    pub item_price: i64,
}

#[derive(Deserialize)]
pub struct BumpRequest {
    pub csrf_token: String,
    pub item_id: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct SellResponse {
    pub id: ItemId,
}

#[derive(Serialize)]
pub struct ItemSummaryResponse {
    pub item_id: ItemId,
    pub item_price: i64,
    pub item_created_at: i64,
    pub item_updated_at: i64,
}

impl From<Item> for ItemSummaryResponse {
    fn from(item: Item) -> Self {
        Self {
            item_id: item.id,
            item_price: item.price.get(),
            item_created_at: item.created_at.timestamp(),
            item_updated_at: item.updated_at.timestamp(),
        }
    }
}

fn parse_price(value: i64) -> Result<Price, ApiError> {
    Price::new(value).map_err(|err| ApiError::BadRequest(err.to_string()))
}

// -- Handlers --

/// POST /sell — list a new item.
#[tracing::instrument(skip_all)]
pub async fn sell<S, P, Sh, C>(
    State(state): State<Arc<AppState<S, P, Sh, C>>>,
    headers: HeaderMap,
    Json(req): Json<SellRequest>,
) -> Result<(StatusCode, Json<SellResponse>), ApiError>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    let session = current_session(state.sessions.as_ref(), &headers).await?;
    session.require_csrf(&req.csrf_token)?;

    let price = parse_price(req.price)?;
    let id = state
        .coordinator
        .list_item(
            session.user_id,
            NewListing {
                name: req.name,
                description: req.description,
                price,
                category_id: common::CategoryId::new(req.category_id),
                image_name: req.image_name,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(SellResponse { id })))
}

/// POST /items/edit — change a listing's price.
#[tracing::instrument(skip_all)]
pub async fn edit<S, P, Sh, C>(
    State(state): State<Arc<AppState<S, P, Sh, C>>>,
    headers: HeaderMap,
    Json(req): Json<ItemEditRequest>,
) -> Result<Json<ItemSummaryResponse>, ApiError>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    let session = current_session(state.sessions.as_ref(), &headers).await?;
    session.require_csrf(&req.csrf_token)?;

    let price = parse_price(req.item_price)?;
    let item = state
        .coordinator
        .update_price(session.user_id, ItemId::new(req.item_id), price)
        .await?;

    Ok(Json(item.into()))
}

/// POST /bump — refresh a listing's position.
#[tracing::instrument(skip_all)]
pub async fn bump<S, P, Sh, C>(
    State(state): State<Arc<AppState<S, P, Sh, C>>>,
    headers: HeaderMap,
    Json(req): Json<BumpRequest>,
) -> Result<Json<ItemSummaryResponse>, ApiError>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    let session = current_session(state.sessions.as_ref(), &headers).await?;
    session.require_csrf(&req.csrf_token)?;

    let item = state
        .coordinator
        .bump(session.user_id, ItemId::new(req.item_id))
        .await?;

    Ok(Json(item.into()))
}
