//! Holding price computation.
//!
//! `unit = base + Σ choice deltas + Σ eligible discount deltas` and
//! `total = unit × quantity`. Percentage discounts are taken of the
//! pre-modifier unit price (base plus choice deltas), never of each other.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  catalog::{Product, VariationChoice},
  discount::{Adjustment, Discount, HoldingDiscount},
};

/// A discount as applied to one price computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
  pub discount_id: Uuid,
  pub name:        String,
  pub adjustment:  Adjustment,
  pub delta:       Decimal,
}

impl AppliedDiscount {
  /// Freeze onto `holding_id`.
  pub fn freeze(&self, holding_id: Uuid) -> HoldingDiscount {
    HoldingDiscount {
      holding_id,
      discount_id: self.discount_id,
      name: self.name.clone(),
      adjustment: self.adjustment,
      delta: self.delta,
    }
  }
}

/// Every component of a holding's price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
  pub base:            Decimal,
  pub variation_delta: Decimal,
  pub modifier_delta:  Decimal,
  pub unit_price:      Decimal,
  pub quantity:        u32,
  pub total:           Decimal,
  pub discounts:       Vec<AppliedDiscount>,
}

/// Price `quantity` units of `product` with the chosen variation `choices`
/// and the discounts already found eligible for the buyer.
///
/// Fails if the quantity is invalid for the product.
pub fn price(
  product: &Product,
  choices: &[VariationChoice],
  discounts: &[&Discount],
  quantity: u32,
) -> Result<PriceBreakdown> {
  product.validate_quantity(quantity)?;

  let base = product.base_price;
  let variation_delta: Decimal = choices.iter().map(|c| c.delta).sum();
  let before_modifiers = base + variation_delta;

  let applied: Vec<AppliedDiscount> = discounts
    .iter()
    .map(|d| AppliedDiscount {
      discount_id: d.discount_id,
      name:        d.name.clone(),
      adjustment:  d.adjustment,
      delta:       d.adjustment.delta(before_modifiers),
    })
    .collect();
  let modifier_delta: Decimal = applied.iter().map(|a| a.delta).sum();

  let unit_price = before_modifiers + modifier_delta;
  Ok(PriceBreakdown {
    base,
    variation_delta,
    modifier_delta,
    unit_price,
    quantity,
    total: unit_price * Decimal::from(quantity),
    discounts: applied,
  })
}

/// Sum the totals of several holdings.
pub fn grand_total<'a>(prices: impl IntoIterator<Item = &'a PriceBreakdown>) -> Decimal {
  prices.into_iter().map(|p| p.total).sum()
}
