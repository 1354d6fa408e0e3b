//! HTTP server wiring for Tickle.
//!
//! Mounts the [`tickle_api`] router under `/api`, adds request tracing and
//! drains the mail outbox.

pub mod config;

pub use config::ServerConfig;

use axum::{Router, routing::get};
use tickle_api::{AppState, api_router};
use tickle_core::{mail::Email, store::TicketStore};
use tokio::sync::mpsc::UnboundedReceiver;
use tower_http::trace::TraceLayer;

/// Build the top-level router for `state`.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: TicketStore + 'static,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

/// Consume rendered emails until every sender is gone.
///
/// No transport is wired in; each message is logged so an operator or a log
/// shipper can pick it up.
pub async fn drain_outbox(mut outbox: UnboundedReceiver<Email>) {
  while let Some(email) = outbox.recv().await {
    tracing::info!(
      to = %email.to.join(", "),
      from = %email.from,
      subject = %email.subject,
      tags = ?email.tags,
      "mail queued"
    );
  }
  tracing::debug!("mail outbox closed");
}
