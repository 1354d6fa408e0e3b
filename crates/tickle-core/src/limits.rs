//! Personal and total purchase limits.
//!
//! A ceiling of `None` means unlimited. Purchased quantities are the sum of
//! holding quantities across valid purchases.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, catalog::Product};

/// Has `purchased` already met the ceiling?
pub fn limit_reached(purchased: u64, ceiling: Option<u32>) -> bool {
  ceiling.is_some_and(|c| purchased >= u64::from(c))
}

/// Would buying `requested` more units go over the ceiling?
pub fn would_exceed(purchased: u64, requested: u64, ceiling: Option<u32>) -> bool {
  ceiling.is_some_and(|c| purchased + requested > u64::from(c))
}

/// Refuse a purchase of `requested` units of `product` given what the buyer
/// (`personal_purchased`) and everyone (`total_purchased`) already hold.
pub fn check(
  product: &Product,
  personal_purchased: u64,
  total_purchased: u64,
  requested: u64,
) -> Result<()> {
  check_personal(product, personal_purchased, requested)?;
  if would_exceed(total_purchased, requested, product.total_limit) {
    return Err(Error::TotalLimitReached {
      product_id: product.product_id,
      limit:      product.total_limit.unwrap_or_default(),
    });
  }
  Ok(())
}

/// Refuse giving `requested` units of `product` to someone who already holds
/// `personal_purchased`. Transfers only move units, so the total is not checked.
pub fn check_personal(product: &Product, personal_purchased: u64, requested: u64) -> Result<()> {
  if would_exceed(personal_purchased, requested, product.personal_limit) {
    return Err(Error::PersonalLimitReached {
      product_id: product.product_id,
      limit:      product.personal_limit.unwrap_or_default(),
    });
  }
  Ok(())
}

/// The limit state of a product, optionally from one person's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitStatus {
  pub product_id:             Uuid,
  pub personal_limit:         Option<u32>,
  pub total_limit:            Option<u32>,
  /// Units bought by the person asked about, if any.
  pub personal_purchased:     Option<u64>,
  pub total_purchased:        u64,
  pub personal_limit_reached: bool,
  pub total_limit_reached:    bool,
}

impl LimitStatus {
  pub fn new(product: &Product, personal_purchased: Option<u64>, total_purchased: u64) -> Self {
    Self {
      product_id: product.product_id,
      personal_limit: product.personal_limit,
      total_limit: product.total_limit,
      personal_purchased,
      total_purchased,
      personal_limit_reached: personal_purchased
        .is_some_and(|n| limit_reached(n, product.personal_limit)),
      total_limit_reached: limit_reached(total_purchased, product.total_limit),
    }
  }

  pub fn any_reached(&self) -> bool { self.personal_limit_reached || self.total_limit_reached }
}
