//! The product catalog: events, products, ticket types and variations.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Events and categories ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub event_id: Uuid,
  pub name:     String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  pub name:        String,
}

// ─── Product ─────────────────────────────────────────────────────────────────

/// Whether a product is a ticket type (admits to events) or a gadget.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProductKind {
  Ticket,
  Gadget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
  pub product_id:     Uuid,
  pub name:           String,
  pub public_name:    Option<String>,
  pub description:    String,
  pub base_price:     Decimal,
  /// Can more than one unit be held in a single holding?
  pub quantitative:   bool,
  pub published:      bool,
  pub transferable:   bool,
  pub order:          u32,
  /// `None` means no limit.
  pub personal_limit: Option<u32>,
  /// `None` means no limit.
  pub total_limit:    Option<u32>,
  pub categories:     Vec<Uuid>,
  /// Events admitted by this product when it is a ticket type.
  pub ticket_events:  Option<Vec<Uuid>>,
}

impl Product {
  pub fn public_name(&self) -> &str {
    self.public_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.name)
  }

  pub fn is_ticket_type(&self) -> bool { self.ticket_events.is_some() }

  pub fn kind(&self) -> ProductKind {
    if self.is_ticket_type() { ProductKind::Ticket } else { ProductKind::Gadget }
  }

  /// Quantity must be positive, and exactly 1 unless the product is
  /// quantitative.
  pub fn validate_quantity(&self, quantity: u32) -> Result<()> {
    if quantity == 0 {
      return Err(Error::QuantityZero);
    }
    if !self.quantitative && quantity != 1 {
      return Err(Error::QuantityNotOne);
    }
    Ok(())
  }
}

/// Input to [`crate::store::TicketStore::add_product`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
  pub name:           String,
  #[serde(default)]
  pub public_name:    Option<String>,
  #[serde(default)]
  pub description:    String,
  pub base_price:     Decimal,
  #[serde(default)]
  pub quantitative:   bool,
  #[serde(default = "yes")]
  pub published:      bool,
  #[serde(default = "yes")]
  pub transferable:   bool,
  #[serde(default)]
  pub order:          u32,
  #[serde(default = "default_personal_limit")]
  pub personal_limit: Option<u32>,
  #[serde(default)]
  pub total_limit:    Option<u32>,
  #[serde(default)]
  pub categories:     Vec<Uuid>,
  #[serde(default)]
  pub ticket_events:  Option<Vec<Uuid>>,
}

fn yes() -> bool { true }

fn default_personal_limit() -> Option<u32> { Some(1) }

impl NewProduct {
  /// A published, transferable gadget with a personal limit of one.
  pub fn new(name: impl Into<String>, base_price: Decimal) -> Self {
    Self {
      name: name.into(),
      public_name: None,
      description: String::new(),
      base_price,
      quantitative: false,
      published: true,
      transferable: true,
      order: 0,
      personal_limit: default_personal_limit(),
      total_limit: None,
      categories: Vec::new(),
      ticket_events: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::Invalid("product name is required".into()));
    }
    if self.base_price.is_sign_negative() {
      return Err(Error::Invalid("base price must not be negative".into()));
    }
    Ok(())
  }
}

/// Parameters for [`crate::store::TicketStore::list_products`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
  pub published: Option<bool>,
  pub kind:      Option<ProductKind>,
}

// ─── Variations ──────────────────────────────────────────────────────────────

/// One selectable option of a variation, e.g. size "XL" at +20.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationChoice {
  pub choice_id:    Uuid,
  pub variation_id: Uuid,
  pub name:         String,
  pub order:        u32,
  /// Signed price delta; negative for a discount.
  pub delta:        Decimal,
}

/// A named group of choices on a product, e.g. "size".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariation {
  pub variation_id: Uuid,
  pub product_id:   Uuid,
  pub name:         String,
  /// Ordered by `order`.
  pub choices:      Vec<VariationChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChoice {
  pub name:  String,
  #[serde(default)]
  pub order: u32,
  #[serde(default)]
  pub delta: Decimal,
}

/// Resolve `chosen` choice ids against a product's variations.
///
/// Every id must belong to one of the variations and at most one choice may
/// be picked per variation. Returns the resolved choices in input order.
pub fn resolve_choices(
  variations: &[ProductVariation],
  chosen: &[Uuid],
) -> Result<Vec<VariationChoice>> {
  let mut seen_variations = HashSet::new();
  let mut resolved = Vec::with_capacity(chosen.len());

  for id in chosen {
    let choice = variations
      .iter()
      .flat_map(|v| v.choices.iter())
      .find(|c| c.choice_id == *id)
      .ok_or(Error::ForeignChoice(*id))?;
    if !seen_variations.insert(choice.variation_id) {
      return Err(Error::DuplicateVariationChoice(choice.variation_id));
    }
    resolved.push(choice.clone());
  }

  Ok(resolved)
}
