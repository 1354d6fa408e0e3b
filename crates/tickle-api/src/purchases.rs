//! Handlers for `/purchases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/purchases` | The caller's purchases, newest first |
//! | `GET`  | `/purchases/{id}` | Owner or staff |
//! | `POST` | `/purchases/{id}/invalidate` | Staff |
//! | `POST` | `/purchases/{id}/deliver` | Staff, queues ticket emails |

use axum::{
  Json,
  extract::{Path, State},
};
use tickle_core::{
  holding::{Delivery, Purchase},
  mail::ticket_email,
  store::TicketStore,
};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentPerson, Staff, require_self_or_staff},
  cart::{PurchaseView, purchase_view},
  catalog::require_product,
  error::ApiError,
  people::require_person,
};

async fn require_purchase<S: TicketStore>(
  state: &AppState<S>,
  id: Uuid,
) -> Result<Purchase, ApiError> {
  state
    .store
    .get_purchase(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("purchase {id}")))
}

/// `GET /purchases`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
) -> Result<Json<Vec<Purchase>>, ApiError>
where
  S: TicketStore + 'static,
{
  let purchases = state
    .store
    .list_purchases(me.person_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(purchases))
}

/// `GET /purchases/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
  Path(id): Path<Uuid>,
) -> Result<Json<PurchaseView>, ApiError>
where
  S: TicketStore + 'static,
{
  let purchase = require_purchase(&state, id).await?;
  require_self_or_staff(&me, purchase.person_id)?;
  Ok(Json(purchase_view(&state, purchase).await?))
}

/// `POST /purchases/{id}/invalidate`
pub async fn invalidate<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Path(id): Path<Uuid>,
) -> Result<Json<Purchase>, ApiError>
where
  S: TicketStore + 'static,
{
  let purchase = state.store.invalidate_purchase(id).await.map_err(ApiError::store)?;
  Ok(Json(purchase))
}

/// `POST /purchases/{id}/deliver`
///
/// Renders one email per ticket holding, addressed to whoever holds it now,
/// and records a delivery over those holdings.
pub async fn deliver<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, ApiError>
where
  S: TicketStore + 'static,
{
  let purchase = require_purchase(&state, id).await?;
  if !purchase.valid {
    return Err(ApiError::Conflict(format!("purchase {id} is invalidated")));
  }

  let holdings = state.store.purchase_holdings(id).await.map_err(ApiError::store)?;
  let mut emails = Vec::new();
  let mut delivered = Vec::new();
  for holding in holdings {
    let product = require_product(&state, holding.product_id).await?;
    if !product.is_ticket_type() {
      continue;
    }
    let holder = require_person(&state, holding.person_id).await?;
    emails.push(ticket_email(&holder, &holding, &product, &state.mail));
    delivered.push(holding.holding_id);
  }

  if delivered.is_empty() {
    return Err(ApiError::Conflict(format!("purchase {id} holds no tickets")));
  }
  if state.outbox.is_closed() {
    return Err(ApiError::Store("mail outbox is closed".into()));
  }

  let delivery = state
    .store
    .record_delivery(delivered)
    .await
    .map_err(ApiError::store)?;
  let count = emails.len();
  for email in emails {
    state
      .outbox
      .send(email)
      .map_err(|_| ApiError::Store("mail outbox is closed".into()))?;
  }
  tracing::info!(purchase_id = %id, delivery_id = %delivery.delivery_id, count, "delivery queued");
  Ok(Json(delivery))
}
