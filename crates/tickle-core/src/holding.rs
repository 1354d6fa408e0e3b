//! Holdings and the carts and purchases that own them.
//!
//! A holding starts life in a person's shopping cart. Purchasing the cart
//! moves it, in one transaction, into a new purchase and freezes its price and
//! discounts. Purchased holdings are never deleted; a purchase is invalidated
//! instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, catalog::Product, pricing::PriceBreakdown};

// ─── Ownership ───────────────────────────────────────────────────────────────

/// What a holding currently belongs to: exactly one of a cart or a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum HoldingOwner {
  Cart(Uuid),
  Purchase(Uuid),
}

impl HoldingOwner {
  /// Build from the two nullable storage columns, rejecting rows that have
  /// both or neither.
  pub fn from_columns(cart_id: Option<Uuid>, purchase_id: Option<Uuid>) -> Result<Self> {
    match (cart_id, purchase_id) {
      (Some(cart), None) => Ok(Self::Cart(cart)),
      (None, Some(purchase)) => Ok(Self::Purchase(purchase)),
      (Some(_), Some(_)) => Err(Error::HoldingWithTwoOwners),
      (None, None) => Err(Error::HoldingWithoutOwner),
    }
  }

  /// The inverse of [`HoldingOwner::from_columns`]: `(cart_id, purchase_id)`.
  pub fn to_columns(self) -> (Option<Uuid>, Option<Uuid>) {
    match self {
      Self::Cart(id) => (Some(id), None),
      Self::Purchase(id) => (None, Some(id)),
    }
  }

  pub fn purchase_id(self) -> Option<Uuid> {
    match self {
      Self::Purchase(id) => Some(id),
      Self::Cart(_) => None,
    }
  }
}

// ─── Holding ─────────────────────────────────────────────────────────────────

/// One line item: a person holding a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
  pub holding_id:     Uuid,
  pub person_id:      Uuid,
  pub product_id:     Uuid,
  pub choice_ids:     Vec<Uuid>,
  pub quantity:       u32,
  pub owner:          HoldingOwner,
  /// Overrides the product's transferability when set.
  pub transferable:   Option<bool>,
  pub utilized:       Option<DateTime<Utc>>,
  /// Frozen at purchase time.
  pub price_snapshot: Option<PriceBreakdown>,
}

impl Holding {
  pub fn is_purchased(&self) -> bool { matches!(self.owner, HoldingOwner::Purchase(_)) }

  pub fn is_transferable(&self, product: &Product) -> bool {
    self.transferable.unwrap_or(product.transferable)
  }
}

/// Input to [`crate::store::TicketStore::add_to_cart`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHolding {
  pub product_id: Uuid,
  #[serde(default = "one")]
  pub quantity:   u32,
  #[serde(default)]
  pub choice_ids: Vec<Uuid>,
}

fn one() -> u32 { 1 }

impl NewHolding {
  pub fn new(product_id: Uuid) -> Self {
    Self { product_id, quantity: 1, choice_ids: Vec::new() }
  }

  pub fn with_quantity(mut self, quantity: u32) -> Self {
    self.quantity = quantity;
    self
  }

  pub fn with_choices(mut self, choice_ids: Vec<Uuid>) -> Self {
    self.choice_ids = choice_ids;
    self
  }
}

// ─── Cart, purchase, delivery ────────────────────────────────────────────────

/// A person's open basket. Each person has at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingCart {
  pub cart_id:   Uuid,
  pub person_id: Uuid,
}

/// The record created when a cart is bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
  pub purchase_id: Uuid,
  pub person_id:   Uuid,
  pub purchased:   DateTime<Utc>,
  /// Cleared to soft-invalidate the purchase.
  pub valid:       bool,
}

/// A record that a set of holdings had their tickets sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
  pub delivery_id: Uuid,
  pub holding_ids: Vec<Uuid>,
  pub delivered:   DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn owner_requires_exactly_one_column() {
    let cart = Uuid::new_v4();
    let purchase = Uuid::new_v4();

    assert_eq!(
      HoldingOwner::from_columns(Some(cart), None).unwrap(),
      HoldingOwner::Cart(cart)
    );
    assert_eq!(
      HoldingOwner::from_columns(None, Some(purchase)).unwrap(),
      HoldingOwner::Purchase(purchase)
    );
    assert!(matches!(
      HoldingOwner::from_columns(Some(cart), Some(purchase)),
      Err(Error::HoldingWithTwoOwners)
    ));
    assert!(matches!(
      HoldingOwner::from_columns(None, None),
      Err(Error::HoldingWithoutOwner)
    ));
  }

  #[test]
  fn owner_columns_invert() {
    let id = Uuid::new_v4();
    for owner in [HoldingOwner::Cart(id), HoldingOwner::Purchase(id)] {
      let (c, p) = owner.to_columns();
      assert_eq!(HoldingOwner::from_columns(c, p).unwrap(), owner);
    }
  }
}
