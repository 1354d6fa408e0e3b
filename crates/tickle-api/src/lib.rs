//! JSON REST API for Tickle.
//!
//! Exposes an axum [`Router`] backed by any [`tickle_core::store::TicketStore`].
//! TLS and the mail transport are the caller's responsibility: rendered
//! emails are pushed onto [`AppState::outbox`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tickle_api::api_router(state))
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod holdings;
pub mod orchestras;
pub mod people;
pub mod purchases;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use chrono::NaiveDate;
use tickle_core::{
  mail::{Email, MailSettings},
  store::TicketStore,
};
use tickle_kobra::KobraClient;
use tokio::sync::mpsc::UnboundedSender;

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  /// `None` when no Kobra credentials are configured.
  pub kobra:  Option<Arc<KobraClient>>,
  pub mail:   Arc<MailSettings>,
  pub outbox: UnboundedSender<Email>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      kobra:  self.kobra.clone(),
      mail:   self.mail.clone(),
      outbox: self.outbox.clone(),
    }
  }
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, mail: MailSettings, outbox: UnboundedSender<Email>) -> Self {
    Self { store, kobra: None, mail: Arc::new(mail), outbox }
  }

  pub fn with_kobra(mut self, client: KobraClient) -> Self {
    self.kobra = Some(Arc::new(client));
    self
  }

  pub(crate) fn kobra(&self) -> Result<&KobraClient, ApiError> {
    self
      .kobra
      .as_deref()
      .ok_or_else(|| ApiError::BadGateway("student lookup is not configured".into()))
  }
}

pub(crate) fn today() -> NaiveDate { chrono::Local::now().date_naive() }

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router over `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: TicketStore + 'static,
{
  Router::new()
    // People
    .route("/people", get(people::list::<S>).post(people::register::<S>))
    .route("/people/me", get(people::me::<S>))
    .route("/people/kobra", post(people::kobra_fill_all::<S>))
    .route("/people/{id}", get(people::get_one::<S>))
    .route("/people/{id}/kobra", post(people::kobra_fill::<S>))
    .route("/nutrition", get(people::list_nutrition::<S>).post(people::add_nutrition::<S>))
    // Catalog
    .route("/events", get(catalog::list_events::<S>).post(catalog::add_event::<S>))
    .route("/events/{id}/visitors", get(catalog::visitors::<S>))
    .route("/categories", post(catalog::add_category::<S>))
    .route("/products", get(catalog::list_products::<S>).post(catalog::add_product::<S>))
    .route("/products/{id}", get(catalog::get_product::<S>))
    .route("/products/{id}/limits", get(catalog::limits::<S>))
    .route("/products/{id}/variations", post(catalog::add_variation::<S>))
    .route("/products/{id}/discounts", post(catalog::attach_discount::<S>))
    .route("/variations/{id}/choices", post(catalog::add_choice::<S>))
    .route("/discounts", post(catalog::add_discount::<S>))
    .route("/discounts/{id}", put(catalog::update_discount::<S>))
    // Cart
    .route("/cart", get(cart::view::<S>))
    .route("/cart/holdings", post(cart::add::<S>))
    .route("/cart/holdings/{id}", axum::routing::delete(cart::remove::<S>))
    .route("/cart/purchase", post(cart::purchase::<S>))
    // Purchases
    .route("/purchases", get(purchases::list::<S>))
    .route("/purchases/{id}", get(purchases::get_one::<S>))
    .route("/purchases/{id}/invalidate", post(purchases::invalidate::<S>))
    .route("/purchases/{id}/deliver", post(purchases::deliver::<S>))
    // Holdings
    .route("/holdings/{id}/price", get(holdings::price::<S>))
    .route("/holdings/{id}/utilize", post(holdings::utilize::<S>))
    .route("/holdings/{id}/transfer", post(holdings::transfer::<S>))
    // Orchestras
    .route("/orchestras", get(orchestras::list::<S>).post(orchestras::create::<S>))
    .route(
      "/orchestras/ticket-types",
      get(orchestras::list_ticket_types::<S>).post(orchestras::add_ticket_type::<S>),
    )
    .route("/orchestras/register", post(orchestras::register::<S>))
    .with_state(state)
}
