//! Orchestra sign-up: memberships and registration tickets.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, holding::NewHolding};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orchestra {
  pub orchestra_id: Uuid,
  pub name:         String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestraMembership {
  pub person_id:    Uuid,
  pub orchestra_id: Uuid,
  pub active:       bool,
  pub primary:      bool,
}

/// One row of a membership form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipInput {
  pub orchestra_id: Uuid,
  #[serde(default = "yes")]
  pub active:       bool,
  #[serde(default)]
  pub primary:      bool,
}

fn yes() -> bool { true }

/// A person's memberships must name each orchestra once and, unless empty,
/// have exactly one primary.
pub fn validate_memberships(memberships: &[MembershipInput]) -> Result<()> {
  let mut seen = HashSet::new();
  if let Some(dupe) = memberships.iter().find(|m| !seen.insert(m.orchestra_id)) {
    return Err(Error::Invalid(format!(
      "orchestra {} listed more than once",
      dupe.orchestra_id
    )));
  }

  let primaries = memberships.iter().filter(|m| m.primary).count();
  if !memberships.is_empty() && primaries != 1 {
    return Err(Error::Invalid(
      "exactly one orchestra membership must be primary".into(),
    ));
  }
  Ok(())
}

/// A ticket type sold to orchestra members, with optional add-on products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestraTicketType {
  pub ticket_type_id:        Uuid,
  /// The ticket-type product itself.
  pub product_id:            Uuid,
  pub food_product:          Option<Uuid>,
  pub accommodation_product: Option<Uuid>,
  pub dinner_product:        Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrchestraTicketType {
  pub product_id:            Uuid,
  #[serde(default)]
  pub food_product:          Option<Uuid>,
  #[serde(default)]
  pub accommodation_product: Option<Uuid>,
  #[serde(default)]
  pub dinner_product:        Option<Uuid>,
}

/// A member's sign-up: which ticket, which add-ons, which orchestras.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestraRegistration {
  pub ticket_type_id: Uuid,
  #[serde(default)]
  pub food:           bool,
  #[serde(default)]
  pub accommodation:  bool,
  /// The 10th-in-a-row or 25th-overall anniversary dinner.
  #[serde(default)]
  pub dinner:         bool,
  #[serde(default)]
  pub memberships:    Vec<MembershipInput>,
}

impl OrchestraRegistration {
  /// The cart lines this registration adds, ticket first.
  pub fn holdings(&self, ticket_type: &OrchestraTicketType) -> Result<Vec<NewHolding>> {
    let mut lines = vec![NewHolding::new(ticket_type.product_id)];
    for (wanted, product, what) in [
      (self.food, ticket_type.food_product, "food"),
      (self.accommodation, ticket_type.accommodation_product, "accommodation"),
      (self.dinner, ticket_type.dinner_product, "dinner"),
    ] {
      if !wanted {
        continue;
      }
      let product = product.ok_or_else(|| {
        Error::Invalid(format!("{what} is not offered with this ticket type"))
      })?;
      lines.push(NewHolding::new(product));
    }
    Ok(lines)
  }
}
