//! Discounts and price modifiers gated on who the buyer is.
//!
//! A discount attached to a product applies to a person when its
//! [`Eligibility`] rule is met. At purchase time every eligible discount is
//! copied onto the holding as a [`HoldingDiscount`], so later rule edits never
//! change what was paid.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Adjustment ──────────────────────────────────────────────────────────────

/// How a discount changes the unit price. Negative values lower it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Adjustment {
  /// A fixed signed delta.
  Amount(Decimal),
  /// A signed percentage of the pre-modifier unit price.
  Percent(Decimal),
}

impl Adjustment {
  /// The signed delta this adjustment contributes for a unit priced `price`
  /// before modifiers. Percentages round half away from zero to öre.
  pub fn delta(&self, price: Decimal) -> Decimal {
    match self {
      Self::Amount(d) => *d,
      Self::Percent(p) => (price * *p / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    }
  }
}

// ─── Eligibility ─────────────────────────────────────────────────────────────

/// Who a discount applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Eligibility {
  Everyone,
  /// Member of any student union.
  StudentUnionMember,
  MemberOfUnion { union_id: Uuid },
  /// Has a LiU ID that is not blocked.
  LiuIdHolder,
  /// Has at least one active orchestra membership.
  OrchestraMember,
  MemberOfOrchestra { orchestra_id: Uuid },
  Staff,
}

/// The facts about a person that eligibility rules look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityContext {
  pub student_union_id:   Option<Uuid>,
  pub has_valid_liu_id:   bool,
  /// Orchestras with an active membership.
  pub active_orchestras:  Vec<Uuid>,
  pub is_staff:           bool,
}

impl Eligibility {
  pub fn is_met(&self, ctx: &EligibilityContext) -> bool {
    match self {
      Self::Everyone => true,
      Self::StudentUnionMember => ctx.student_union_id.is_some(),
      Self::MemberOfUnion { union_id } => ctx.student_union_id == Some(*union_id),
      Self::LiuIdHolder => ctx.has_valid_liu_id,
      Self::OrchestraMember => !ctx.active_orchestras.is_empty(),
      Self::MemberOfOrchestra { orchestra_id } => {
        ctx.active_orchestras.contains(orchestra_id)
      }
      Self::Staff => ctx.is_staff,
    }
  }
}

// ─── Discount ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
  pub discount_id: Uuid,
  pub name:        String,
  pub adjustment:  Adjustment,
  pub eligibility: Eligibility,
}

/// Input to [`crate::store::TicketStore::add_discount`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiscount {
  pub name:        String,
  pub adjustment:  Adjustment,
  pub eligibility: Eligibility,
}

impl NewDiscount {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::Invalid("discount name is required".into()));
    }
    Ok(())
  }
}

/// Keep only the discounts whose rule `ctx` meets.
pub fn eligible<'a>(
  discounts: impl IntoIterator<Item = &'a Discount>,
  ctx: &EligibilityContext,
) -> Vec<&'a Discount> {
  discounts
    .into_iter()
    .filter(|d| d.eligibility.is_met(ctx))
    .collect()
}

// ─── Frozen copy ─────────────────────────────────────────────────────────────

/// A discount as it was when the holding was purchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingDiscount {
  pub holding_id:  Uuid,
  /// The discount this was copied from. It may since have been edited.
  pub discount_id: Uuid,
  pub name:        String,
  pub adjustment:  Adjustment,
  /// The delta realised at purchase time.
  pub delta:       Decimal,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(s: &str) -> Decimal { s.parse().unwrap() }

  #[test]
  fn amount_is_a_fixed_delta() {
    assert_eq!(Adjustment::Amount(d("-50")).delta(d("300")), d("-50"));
  }

  #[test]
  fn percent_rounds_to_two_places() {
    assert_eq!(Adjustment::Percent(d("-10")).delta(d("250.00")), d("-25.00"));
    assert_eq!(Adjustment::Percent(d("-15")).delta(d("99.90")), d("-14.99"));
    assert_eq!(Adjustment::Percent(d("-50")).delta(d("0.05")), d("-0.03"));
  }

  #[test]
  fn eligibility_rules() {
    let union = Uuid::new_v4();
    let orchestra = Uuid::new_v4();
    let member = EligibilityContext {
      student_union_id:  Some(union),
      has_valid_liu_id:  true,
      active_orchestras: vec![orchestra],
      is_staff:          false,
    };
    let nobody = EligibilityContext::default();

    assert!(Eligibility::Everyone.is_met(&nobody));
    assert!(Eligibility::StudentUnionMember.is_met(&member));
    assert!(!Eligibility::StudentUnionMember.is_met(&nobody));
    assert!(Eligibility::MemberOfUnion { union_id: union }.is_met(&member));
    assert!(!Eligibility::MemberOfUnion { union_id: Uuid::new_v4() }.is_met(&member));
    assert!(Eligibility::LiuIdHolder.is_met(&member));
    assert!(Eligibility::OrchestraMember.is_met(&member));
    assert!(Eligibility::MemberOfOrchestra { orchestra_id: orchestra }.is_met(&member));
    assert!(!Eligibility::OrchestraMember.is_met(&nobody));
    assert!(!Eligibility::Staff.is_met(&member));
  }

  #[test]
  fn eligibility_serialises_with_rule_tag() {
    let json = serde_json::to_value(Eligibility::StudentUnionMember).unwrap();
    assert_eq!(json, serde_json::json!({ "rule": "student_union_member" }));
  }

  #[test]
  fn eligible_filters() {
    let everyone = Discount {
      discount_id: Uuid::new_v4(),
      name:        "early bird".into(),
      adjustment:  Adjustment::Amount(d("-20")),
      eligibility: Eligibility::Everyone,
    };
    let staff = Discount {
      discount_id: Uuid::new_v4(),
      name:        "staff".into(),
      adjustment:  Adjustment::Percent(d("-100")),
      eligibility: Eligibility::Staff,
    };
    let all = [everyone.clone(), staff];
    let picked = eligible(&all, &EligibilityContext::default());
    assert_eq!(picked, vec![&everyone]);
  }
}
