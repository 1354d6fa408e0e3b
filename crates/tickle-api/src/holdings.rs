//! Handlers for purchased holdings: price, utilization and transfer.

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use tickle_core::{holding::Holding, pricing::PriceBreakdown, store::TicketStore};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentPerson, Staff, require_self_or_staff},
  error::ApiError,
};

async fn require_holding<S: TicketStore>(
  state: &AppState<S>,
  id: Uuid,
) -> Result<Holding, ApiError> {
  state
    .store
    .get_holding(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("holding {id}")))
}

/// `GET /holdings/{id}/price`
pub async fn price<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
  Path(id): Path<Uuid>,
) -> Result<Json<PriceBreakdown>, ApiError>
where
  S: TicketStore + 'static,
{
  let holding = require_holding(&state, id).await?;
  require_self_or_staff(&me, holding.person_id)?;
  Ok(Json(state.store.price_holding(id).await.map_err(ApiError::store)?))
}

/// `POST /holdings/{id}/utilize`
pub async fn utilize<S>(
  State(state): State<AppState<S>>,
  Staff(staff): Staff,
  Path(id): Path<Uuid>,
) -> Result<Json<Holding>, ApiError>
where
  S: TicketStore + 'static,
{
  let holding = state.store.utilize_holding(id).await.map_err(ApiError::store)?;
  tracing::info!(holding_id = %id, by = %staff.person_id, "holding utilized");
  Ok(Json(holding))
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
  /// Login email of the recipient.
  pub email: String,
}

/// `POST /holdings/{id}/transfer`, body: `{"email":"friend@example.com"}`
pub async fn transfer<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
  Path(id): Path<Uuid>,
  Json(body): Json<TransferBody>,
) -> Result<Json<Holding>, ApiError>
where
  S: TicketStore + 'static,
{
  let holding = require_holding(&state, id).await?;
  if holding.person_id != me.person_id {
    return Err(ApiError::Forbidden);
  }
  let recipient = state
    .store
    .find_person_by_email(body.email.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person with email {}", body.email)))?;
  if recipient.person_id == me.person_id {
    return Err(ApiError::BadRequest("cannot transfer a holding to yourself".into()));
  }

  let holding = state
    .store
    .transfer_holding(id, recipient.person_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(holding))
}
