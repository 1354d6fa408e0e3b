//! Handlers for the authenticated person's shopping cart.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/cart` | Holdings with current prices and the total |
//! | `POST`   | `/cart/holdings` | Body: `{"product_id":…,"quantity":1,"choice_ids":[]}` |
//! | `DELETE` | `/cart/holdings/{id}` | |
//! | `POST`   | `/cart/purchase` | All or nothing |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tickle_core::{
  holding::{Holding, NewHolding, Purchase, ShoppingCart},
  pricing::{PriceBreakdown, grand_total},
  store::TicketStore,
};
use uuid::Uuid;

use crate::{AppState, auth::CurrentPerson, error::ApiError};

/// A holding with its price: current for cart lines, the snapshot otherwise.
#[derive(Debug, Serialize, Deserialize)]
pub struct PricedHolding {
  #[serde(flatten)]
  pub holding: Holding,
  pub price:   PriceBreakdown,
}

pub(crate) async fn price_all<S: TicketStore>(
  state: &AppState<S>,
  holdings: Vec<Holding>,
) -> Result<(Vec<PricedHolding>, Decimal), ApiError> {
  let mut priced = Vec::with_capacity(holdings.len());
  for holding in holdings {
    let price = state
      .store
      .price_holding(holding.holding_id)
      .await
      .map_err(ApiError::store)?;
    priced.push(PricedHolding { holding, price });
  }
  let total = grand_total(priced.iter().map(|p| &p.price));
  Ok((priced, total))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CartView {
  pub cart:     ShoppingCart,
  pub holdings: Vec<PricedHolding>,
  pub total:    Decimal,
}

/// `GET /cart`
pub async fn view<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
) -> Result<Json<CartView>, ApiError>
where
  S: TicketStore + 'static,
{
  let cart = state.store.cart(me.person_id).await.map_err(ApiError::store)?;
  let holdings = state
    .store
    .cart_holdings(me.person_id)
    .await
    .map_err(ApiError::store)?;
  let (holdings, total) = price_all(&state, holdings).await?;
  Ok(Json(CartView { cart, holdings, total }))
}

/// `POST /cart/holdings`
pub async fn add<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
  Json(body): Json<NewHolding>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let holding = state
    .store
    .add_to_cart(me.person_id, body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(holding)))
}

/// `DELETE /cart/holdings/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: TicketStore + 'static,
{
  state
    .store
    .remove_from_cart(me.person_id, id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseView {
  pub purchase: Purchase,
  pub holdings: Vec<PricedHolding>,
  pub total:    Decimal,
}

pub(crate) async fn purchase_view<S: TicketStore>(
  state: &AppState<S>,
  purchase: Purchase,
) -> Result<PurchaseView, ApiError> {
  let holdings = state
    .store
    .purchase_holdings(purchase.purchase_id)
    .await
    .map_err(ApiError::store)?;
  let (holdings, total) = price_all(state, holdings).await?;
  Ok(PurchaseView { purchase, holdings, total })
}

/// `POST /cart/purchase`
pub async fn purchase<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let purchase = state
    .store
    .purchase_cart(me.person_id)
    .await
    .map_err(ApiError::store)?;
  let view = purchase_view(&state, purchase).await?;
  Ok((StatusCode::CREATED, Json(view)))
}
