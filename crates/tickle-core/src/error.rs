//! Error types for `tickle-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation ──────────────────────────────────────────────────────────
  #[error("quantity must be exactly 1 for un-quantitative products")]
  QuantityNotOne,

  #[error("quantity must be at least 1")]
  QuantityZero,

  #[error("holding must have either a shopping cart or a purchase")]
  HoldingWithoutOwner,

  #[error("can't hold both a shopping cart and a purchase at the same time")]
  HoldingWithTwoOwners,

  #[error("variation choice {0} does not belong to the product")]
  ForeignChoice(Uuid),

  #[error("more than one choice selected for variation {0}")]
  DuplicateVariationChoice(Uuid),

  #[error("invalid national identity number: {0}")]
  InvalidPid(String),

  #[error("{0}")]
  Invalid(String),

  // ── Lookups ─────────────────────────────────────────────────────────────
  #[error("person not found: {0}")]
  PersonNotFound(Uuid),

  #[error("product not found: {0}")]
  ProductNotFound(Uuid),

  #[error("holding not found: {0}")]
  HoldingNotFound(Uuid),

  #[error("purchase not found: {0}")]
  PurchaseNotFound(Uuid),

  #[error("not found: {0}")]
  NotFound(String),

  // ── Business rules ──────────────────────────────────────────────────────
  #[error("product {0} is not published")]
  Unpublished(Uuid),

  #[error("personal limit of {limit} reached for product {product_id}")]
  PersonalLimitReached { product_id: Uuid, limit: u32 },

  #[error("total limit of {limit} reached for product {product_id}")]
  TotalLimitReached { product_id: Uuid, limit: u32 },

  #[error("shopping cart is empty")]
  EmptyCart,

  #[error("holding {0} is not purchased")]
  NotPurchased(Uuid),

  #[error("holding {0} is already utilized")]
  AlreadyUtilized(Uuid),

  #[error("holding {0} is not transferable")]
  NotTransferable(Uuid),

  #[error("purchase {0} is already invalidated")]
  AlreadyInvalidated(Uuid),

  #[error("email address already registered: {0}")]
  EmailTaken(String),

  // ── Kobra ───────────────────────────────────────────────────────────────
  #[error(
    "person must have LiU ID, PID, RFID card number or magnet card number \
     defined"
  )]
  MissingIdentifier,

  #[error("unauthorized against the student lookup service")]
  LookupUnauthorized,

  #[error("student not found")]
  StudentNotFound,

  #[error("student lookup failed: {0}")]
  Lookup(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Whether the error is a caller-side validation failure rather than a
  /// missing record or a rule violation.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::QuantityNotOne
        | Self::QuantityZero
        | Self::HoldingWithoutOwner
        | Self::HoldingWithTwoOwners
        | Self::ForeignChoice(_)
        | Self::DuplicateVariationChoice(_)
        | Self::InvalidPid(_)
        | Self::Invalid(_)
        | Self::MissingIdentifier
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
