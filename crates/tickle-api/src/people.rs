//! Handlers for `/people` and `/nutrition` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/people` | Registration, public |
//! | `GET`  | `/people` | Staff |
//! | `GET`  | `/people/me` | |
//! | `GET`  | `/people/{id}` | Self or staff |
//! | `POST` | `/people/{id}/kobra` | Staff, optional `?overwrite_name=true` |
//! | `POST` | `/people/kobra` | Staff, fills everyone, failing silently |
//! | `GET`  | `/nutrition` | Public |
//! | `POST` | `/nutrition` | Staff |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tickle_core::{
  kobra::{FillOptions, FillOutcome, fill},
  person::{NewPerson, Person, SpecialNutrition},
  pid::Pid,
  store::TicketStore,
};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentPerson, Staff, hash_password, require_self_or_staff},
  error::ApiError,
  today,
};

const MIN_PASSWORD_LEN: usize = 8;

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email:             String,
  pub first_name:        String,
  pub last_name:         String,
  pub password:          String,
  /// `YYMMDD-XXXX`, `YYMMDD+XXXX` or `YYYYMMDDXXXX`.
  #[serde(default)]
  pub pid:               Option<String>,
  #[serde(default)]
  pub liu_id:            Option<String>,
  #[serde(default)]
  pub special_nutrition: Vec<Uuid>,
}

/// `POST /people`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  if body.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ApiError::BadRequest(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  let pid = body
    .pid
    .as_deref()
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .map(|p| Pid::parse(p, today()))
    .transpose()?;

  let input = NewPerson {
    password_hash: Some(hash_password(&body.password)?),
    pid,
    liu_id: body.liu_id.filter(|l| !l.trim().is_empty()),
    special_nutrition: body.special_nutrition,
    ..NewPerson::new(body.email, body.first_name, body.last_name)
  };
  let person = state.store.add_person(input).await.map_err(ApiError::store)?;
  tracing::info!(person_id = %person.person_id, "person registered");
  Ok((StatusCode::CREATED, Json(person)))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /people`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
) -> Result<Json<Vec<Person>>, ApiError>
where
  S: TicketStore + 'static,
{
  let people = state.store.list_people().await.map_err(ApiError::store)?;
  Ok(Json(people))
}

/// `GET /people/me`
pub async fn me<S>(CurrentPerson(me): CurrentPerson) -> Json<Person>
where
  S: TicketStore + 'static,
{
  Json(me)
}

pub(crate) async fn require_person<S: TicketStore>(
  state: &AppState<S>,
  id: Uuid,
) -> Result<Person, ApiError> {
  state
    .store
    .get_person(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id}")))
}

/// `GET /people/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentPerson(me): CurrentPerson,
  Path(id): Path<Uuid>,
) -> Result<Json<Person>, ApiError>
where
  S: TicketStore + 'static,
{
  require_self_or_staff(&me, id)?;
  Ok(Json(require_person(&state, id).await?))
}

// ─── Kobra ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct KobraParams {
  #[serde(default)]
  pub overwrite_name: bool,
}

/// Persist a filled person, resolving the union name first.
async fn save_filled<S: TicketStore>(
  state: &AppState<S>,
  mut person: Person,
  outcome: FillOutcome,
) -> Result<Person, ApiError> {
  let FillOutcome::Filled { union } = outcome else {
    return Ok(person);
  };
  if let Some(name) = union {
    let union = state.store.student_union(name).await.map_err(ApiError::store)?;
    person.student_union_id = Some(union.union_id);
  }
  state.store.update_person(person).await.map_err(ApiError::store)
}

/// `POST /people/{id}/kobra[?overwrite_name=true]`
pub async fn kobra_fill<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Path(id): Path<Uuid>,
  Query(params): Query<KobraParams>,
) -> Result<Json<Person>, ApiError>
where
  S: TicketStore + 'static,
{
  let kobra = state.kobra()?;
  let mut person = require_person(&state, id).await?;
  let options = FillOptions { overwrite_name: params.overwrite_name, fail_silently: false };
  let outcome = fill(kobra, &mut person, options, today()).await?;
  Ok(Json(save_filled(&state, person, outcome).await?))
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkFillReport {
  pub filled:  usize,
  pub skipped: usize,
  pub failed:  usize,
}

/// `POST /people/kobra`
pub async fn kobra_fill_all<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Query(params): Query<KobraParams>,
) -> Result<Json<BulkFillReport>, ApiError>
where
  S: TicketStore + 'static,
{
  let kobra = state.kobra()?;
  let options = FillOptions { overwrite_name: params.overwrite_name, fail_silently: true };
  let today = today();
  let mut report = BulkFillReport::default();

  for mut person in state.store.list_people().await.map_err(ApiError::store)? {
    let person_id = person.person_id;
    match fill(kobra, &mut person, options, today).await {
      Ok(FillOutcome::Skipped) => {
        tracing::info!(%person_id, "kobra fill skipped");
        report.skipped += 1;
      }
      Ok(outcome) => match save_filled(&state, person, outcome).await {
        Ok(_) => report.filled += 1,
        Err(e) => {
          tracing::warn!(%person_id, error = %e, "saving kobra data failed");
          report.failed += 1;
        }
      },
      Err(e) => {
        tracing::warn!(%person_id, error = %e, "kobra fill failed");
        report.failed += 1;
      }
    }
  }

  tracing::info!(
    filled = report.filled,
    skipped = report.skipped,
    failed = report.failed,
    "kobra bulk fill done"
  );
  Ok(Json(report))
}

// ─── Special nutrition ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

/// `GET /nutrition`
pub async fn list_nutrition<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<SpecialNutrition>>, ApiError>
where
  S: TicketStore + 'static,
{
  let list = state.store.list_special_nutrition().await.map_err(ApiError::store)?;
  Ok(Json(list))
}

/// `POST /nutrition`, body: `{"name":"Vegan"}`
pub async fn add_nutrition<S>(
  State(state): State<AppState<S>>,
  Staff(_): Staff,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TicketStore + 'static,
{
  let item = state
    .store
    .add_special_nutrition(body.name)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(item)))
}
