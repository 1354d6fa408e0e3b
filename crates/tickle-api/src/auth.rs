//! HTTP Basic-auth extractors and password hashing.
//!
//! Credentials are `email:password`, checked with argon2 against the stored
//! PHC string of the person with that email.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;
use tickle_core::{person::Person, store::TicketStore};

use crate::{AppState, error::ApiError};

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Store(format!("argon2 error: {e}").into()))
}

/// Check `password` against a PHC string.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .is_ok_and(|hash| Argon2::default().verify_password(password.as_bytes(), &hash).is_ok())
}

/// Pull `(email, password)` out of a Basic `Authorization` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;
  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((email.to_owned(), password.to_owned()))
}

/// The authenticated, active person making the request.
pub struct CurrentPerson(pub Person);

impl<S> FromRequestParts<AppState<S>> for CurrentPerson
where
  S: TicketStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;

    let person = state
      .store
      .find_person_by_email(email)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    let valid = person
      .password_hash
      .as_deref()
      .is_some_and(|phc| verify_password(&password, phc));
    if !valid || !person.is_active {
      return Err(ApiError::Unauthorized);
    }
    Ok(CurrentPerson(person))
  }
}

/// An authenticated person with the staff flag.
pub struct Staff(pub Person);

impl<S> FromRequestParts<AppState<S>> for Staff
where
  S: TicketStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentPerson(person) = CurrentPerson::from_request_parts(parts, state).await?;
    if !person.is_staff {
      return Err(ApiError::Forbidden);
    }
    Ok(Staff(person))
  }
}

/// The caller of a public route: anonymous when no `Authorization` header is
/// sent, otherwise authenticated like [`CurrentPerson`].
pub struct Viewer(pub Option<Person>);

impl Viewer {
  pub fn is_staff(&self) -> bool { self.0.as_ref().is_some_and(|p| p.is_staff) }
}

impl<S> FromRequestParts<AppState<S>> for Viewer
where
  S: TicketStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    if !parts.headers.contains_key(header::AUTHORIZATION) {
      return Ok(Viewer(None));
    }
    let CurrentPerson(person) = CurrentPerson::from_request_parts(parts, state).await?;
    Ok(Viewer(Some(person)))
  }
}

/// Refuse unless `person` is `owner` or staff.
pub fn require_self_or_staff(person: &Person, owner: uuid::Uuid) -> Result<(), ApiError> {
  if person.person_id == owner || person.is_staff {
    Ok(())
  } else {
    Err(ApiError::Forbidden)
  }
}
