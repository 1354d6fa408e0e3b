//! Handlers for orchestras and orchestra sign-up.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use tickle_core::{
  orchestra::{NewOrchestraTicketType, Orchestra, OrchestraRegistration, OrchestraTicketType},
  store::TicketStore,
};

use crate::{
  AppState,
  auth::{CurrentPerson, Staff},
  error::ApiError,
  people::NameBody,
};

/// `GET /orchestras`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Orchestra>>, ApiError>
where
  S: TicketStore + 'static,
{
  Ok(Json(state.store.list_orchestras().await.map_err(ApiError::store)?))
}

/// `POST /orchestras`, body: `{"name":"Bleckhornen"}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let orchestra = state.store.add_orchestra(body.name).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(orchestra)))
}

/// `GET /orchestras/ticket-types`
pub async fn list_ticket_types<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<OrchestraTicketType>>, ApiError>
where
  S: TicketStore + 'static,
{
  let types = state
    .store
    .list_orchestra_ticket_types()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(types))
}

/// `POST /orchestras/ticket-types`
pub async fn add_ticket_type<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Json(body): Json<NewOrchestraTicketType>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let ticket_type = state
    .store
    .add_orchestra_ticket_type(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(ticket_type)))
}

/// `POST /orchestras/register`
///
/// Replaces the caller's memberships and puts the ticket and requested
/// add-ons in their cart. Nothing changes if any line is refused.
pub async fn register<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
  Json(body): Json<OrchestraRegistration>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let holdings = state
    .store
    .register_orchestra_member(me.person_id, body)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(person_id = %me.person_id, lines = holdings.len(), "orchestra registration");
  Ok((StatusCode::CREATED, Json(holdings)))
}
