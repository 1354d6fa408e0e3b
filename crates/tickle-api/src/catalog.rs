//! Handlers for events, categories, products, variations and discounts.
//!
//! Reads are public, though unpublished products are visible to staff only;
//! every write is staff-only.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tickle_core::{
  catalog::{Event, NewChoice, NewProduct, Product, ProductQuery, ProductVariation},
  discount::{Discount, NewDiscount},
  limits::LimitStatus,
  person::{Person, pretty_emails},
  store::TicketStore,
};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{Staff, Viewer},
  error::ApiError,
  people::NameBody,
};

// ─── Events ───────────────────────────────────────────────────────────────────

/// `GET /events`
pub async fn list_events<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: TicketStore + 'static,
{
  Ok(Json(state.store.list_events().await.map_err(ApiError::store)?))
}

/// `POST /events`, body: `{"name":"Cortège"}`
pub async fn add_event<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let event = state.store.add_event(body.name).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Visitors {
  pub visitors: Vec<Person>,
  /// Every visitor as `"First Last <email>"`, joined with `"; "`.
  pub emails:   String,
}

/// `GET /events/{id}/visitors`
pub async fn visitors<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Path(id): Path<Uuid>,
) -> Result<Json<Visitors>, ApiError>
where
  S: TicketStore + 'static,
{
  let visitors = state.store.event_visitors(id).await.map_err(ApiError::store)?;
  let emails = pretty_emails(&visitors);
  Ok(Json(Visitors { visitors, emails }))
}

// ─── Categories ───────────────────────────────────────────────────────────────

/// `POST /categories`
pub async fn add_category<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let category = state.store.add_category(body.name).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(category)))
}

// ─── Products ─────────────────────────────────────────────────────────────────

/// `GET /products[?published=<bool>&kind=ticket|gadget]`
///
/// Anyone but staff only sees published products, whatever `published` says.
pub async fn list_products<S>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  Query(mut query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError>
where
  S: TicketStore + 'static,
{
  if !viewer.is_staff() {
    query.published = Some(true);
  }
  Ok(Json(state.store.list_products(&query).await.map_err(ApiError::store)?))
}

/// `POST /products`
pub async fn add_product<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Json(body): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let product = state.store.add_product(body).await.map_err(ApiError::store)?;
  tracing::info!(
    product_id = %product.product_id,
    kind = product.kind().as_ref(),
    "product created"
  );
  Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
  #[serde(flatten)]
  pub product:    Product,
  pub variations: Vec<ProductVariation>,
}

pub(crate) async fn require_product<S: TicketStore>(
  state: &AppState<S>,
  id: Uuid,
) -> Result<Product, ApiError> {
  state
    .store
    .get_product(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("product {id}")))
}

/// `GET /products/{id}`
pub async fn get_product<S>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  Path(id): Path<Uuid>,
) -> Result<Json<ProductDetail>, ApiError>
where
  S: TicketStore + 'static,
{
  let product = require_product(&state, id).await?;
  if !product.published && !viewer.is_staff() {
    return Err(ApiError::NotFound(format!("product {id}")));
  }
  let variations = state.store.variations(id).await.map_err(ApiError::store)?;
  Ok(Json(ProductDetail { product, variations }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
  pub person_id: Option<Uuid>,
}

/// `GET /products/{id}/limits[?person_id=<uuid>]`
pub async fn limits<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Path(id): Path<Uuid>,
  Query(params): Query<LimitParams>,
) -> Result<Json<LimitStatus>, ApiError>
where
  S: TicketStore + 'static,
{
  let status = state
    .store
    .limit_status(id, params.person_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(status))
}

// ─── Variations ───────────────────────────────────────────────────────────────

/// `POST /products/{id}/variations`, body: `{"name":"Size"}`
pub async fn add_variation<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Path(id): Path<Uuid>,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let variation = state
    .store
    .add_variation(id, body.name)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(variation)))
}

/// `POST /variations/{id}/choices`, body: `{"name":"XL","delta":"20"}`
pub async fn add_choice<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Path(id): Path<Uuid>,
  Json(body): Json<NewChoice>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let choice = state.store.add_choice(id, body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(choice)))
}

// ─── Discounts ────────────────────────────────────────────────────────────────

/// `POST /discounts`
pub async fn add_discount<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Json(body): Json<NewDiscount>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let discount = state.store.add_discount(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(discount)))
}

/// `PUT /discounts/{id}`
///
/// Purchased holdings keep the copy frozen at purchase time.
pub async fn update_discount<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Path(id): Path<Uuid>,
  Json(body): Json<NewDiscount>,
) -> Result<Json<Discount>, ApiError>
where
  S: TicketStore + 'static,
{
  body.validate()?;
  let discount = Discount {
    discount_id: id,
    name:        body.name,
    adjustment:  body.adjustment,
    eligibility: body.eligibility,
  };
  Ok(Json(state.store.update_discount(discount).await.map_err(ApiError::store)?))
}

#[derive(Debug, Deserialize)]
pub struct AttachBody {
  pub discount_id: Uuid,
}

/// `POST /products/{id}/discounts`, body: `{"discount_id":"<uuid>"}`
pub async fn attach_discount<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Path(id): Path<Uuid>,
  Json(body): Json<AttachBody>,
) -> Result<StatusCode, ApiError>
where
  S: TicketStore + 'static,
{
  state
    .store
    .attach_discount(id, body.discount_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
