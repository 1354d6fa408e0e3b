//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates are ISO 8601, money is the decimal
//! string form, and structured fields (adjustments, eligibility rules, price
//! snapshots) are compact JSON. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use tickle_core::{
  catalog::{Product, VariationChoice},
  discount::{Discount, HoldingDiscount},
  holding::{Holding, HoldingOwner, Purchase},
  orchestra::{OrchestraMembership, OrchestraTicketType},
  person::{Person, SpecialNutrition, StudentUnion},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_money(d: Decimal) -> String { d.to_string() }

pub fn decode_money(s: &str) -> Result<Decimal> { Ok(s.parse::<Decimal>()?) }

pub fn encode_json<T: Serialize>(value: &T) -> Result<String> { Ok(serde_json::to_string(value)?) }

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> { Ok(serde_json::from_str(s)?) }

// ─── People ──────────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "p.person_id, p.email, p.first_name, p.last_name, \
   p.password_hash, p.birth_date, p.pid_code, p.pid_coordination, p.liu_id, \
   p.liu_id_blocked, p.liu_card_magnet, p.liu_card_rfid, p.student_union_id, \
   p.is_active, p.is_staff, p.is_superuser, p.created_at";

/// Raw values read from a `people` row (columns as in [`PERSON_COLUMNS`]).
pub struct RawPerson {
  pub person_id:        String,
  pub email:            String,
  pub first_name:       String,
  pub last_name:        String,
  pub password_hash:    Option<String>,
  pub birth_date:       Option<String>,
  pub pid_code:         Option<String>,
  pub pid_coordination: bool,
  pub liu_id:           Option<String>,
  pub liu_id_blocked:   Option<bool>,
  pub liu_card_magnet:  String,
  pub liu_card_rfid:    String,
  pub student_union_id: Option<String>,
  pub is_active:        bool,
  pub is_staff:         bool,
  pub is_superuser:     bool,
  pub created_at:       String,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:        row.get(0)?,
      email:            row.get(1)?,
      first_name:       row.get(2)?,
      last_name:        row.get(3)?,
      password_hash:    row.get(4)?,
      birth_date:       row.get(5)?,
      pid_code:         row.get(6)?,
      pid_coordination: row.get(7)?,
      liu_id:           row.get(8)?,
      liu_id_blocked:   row.get(9)?,
      liu_card_magnet:  row.get(10)?,
      liu_card_rfid:    row.get(11)?,
      student_union_id: row.get(12)?,
      is_active:        row.get(13)?,
      is_staff:         row.get(14)?,
      is_superuser:     row.get(15)?,
      created_at:       row.get(16)?,
    })
  }

  /// Nutrition tags live in a join table and are passed in separately.
  pub fn into_person(self, special_nutrition: Vec<Uuid>) -> Result<Person> {
    Ok(Person {
      person_id: decode_uuid(&self.person_id)?,
      email: self.email,
      first_name: self.first_name,
      last_name: self.last_name,
      password_hash: self.password_hash,
      birth_date: self.birth_date.as_deref().map(decode_date).transpose()?,
      pid_code: self.pid_code,
      pid_coordination: self.pid_coordination,
      liu_id: self.liu_id,
      liu_id_blocked: self.liu_id_blocked,
      liu_card_magnet: self.liu_card_magnet,
      liu_card_rfid: self.liu_card_rfid,
      student_union_id: decode_opt_uuid(self.student_union_id.as_deref())?,
      special_nutrition,
      is_active: self.is_active,
      is_staff: self.is_staff,
      is_superuser: self.is_superuser,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub fn union_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String)> {
  Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

pub fn decode_union((id, name, slug): (String, String, String)) -> Result<StudentUnion> {
  Ok(StudentUnion { union_id: decode_uuid(&id)?, name, slug })
}

pub fn decode_nutrition((id, name): (String, String)) -> Result<SpecialNutrition> {
  Ok(SpecialNutrition { nutrition_id: decode_uuid(&id)?, name })
}

// ─── Products ────────────────────────────────────────────────────────────────

pub const PRODUCT_COLUMNS: &str = "p.product_id, p.name, p.public_name, p.description, \
   p.base_price, p.quantitative, p.published, p.transferable, p.sort_order, \
   p.personal_limit, p.total_limit, p.is_ticket_type";

pub struct RawProduct {
  pub product_id:     String,
  pub name:           String,
  pub public_name:    Option<String>,
  pub description:    String,
  pub base_price:     String,
  pub quantitative:   bool,
  pub published:      bool,
  pub transferable:   bool,
  pub order:          u32,
  pub personal_limit: Option<u32>,
  pub total_limit:    Option<u32>,
  pub is_ticket_type: bool,
}

impl RawProduct {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      product_id:     row.get(0)?,
      name:           row.get(1)?,
      public_name:    row.get(2)?,
      description:    row.get(3)?,
      base_price:     row.get(4)?,
      quantitative:   row.get(5)?,
      published:      row.get(6)?,
      transferable:   row.get(7)?,
      order:          row.get(8)?,
      personal_limit: row.get(9)?,
      total_limit:    row.get(10)?,
      is_ticket_type: row.get(11)?,
    })
  }

  pub fn into_product(self, categories: Vec<Uuid>, events: Vec<Uuid>) -> Result<Product> {
    Ok(Product {
      product_id:     decode_uuid(&self.product_id)?,
      name:           self.name,
      public_name:    self.public_name,
      description:    self.description,
      base_price:     decode_money(&self.base_price)?,
      quantitative:   self.quantitative,
      published:      self.published,
      transferable:   self.transferable,
      order:          self.order,
      personal_limit: self.personal_limit,
      total_limit:    self.total_limit,
      categories,
      ticket_events:  self.is_ticket_type.then_some(events),
    })
  }
}

/// `(choice_id, variation_id, name, sort_order, delta)`
pub type RawChoice = (String, String, String, u32, String);

pub fn decode_choice((id, variation_id, name, order, delta): RawChoice) -> Result<VariationChoice> {
  Ok(VariationChoice {
    choice_id: decode_uuid(&id)?,
    variation_id: decode_uuid(&variation_id)?,
    name,
    order,
    delta: decode_money(&delta)?,
  })
}

// ─── Discounts ───────────────────────────────────────────────────────────────

/// `(discount_id, name, adjustment, eligibility)`
pub type RawDiscount = (String, String, String, String);

pub fn decode_discount((id, name, adjustment, eligibility): RawDiscount) -> Result<Discount> {
  Ok(Discount {
    discount_id: decode_uuid(&id)?,
    name,
    adjustment: decode_json(&adjustment)?,
    eligibility: decode_json(&eligibility)?,
  })
}

/// `(holding_id, discount_id, name, adjustment, delta)`
pub type RawHoldingDiscount = (String, String, String, String, String);

pub fn decode_holding_discount(
  (holding_id, discount_id, name, adjustment, delta): RawHoldingDiscount,
) -> Result<HoldingDiscount> {
  Ok(HoldingDiscount {
    holding_id: decode_uuid(&holding_id)?,
    discount_id: decode_uuid(&discount_id)?,
    name,
    adjustment: decode_json(&adjustment)?,
    delta: decode_money(&delta)?,
  })
}

// ─── Holdings and purchases ──────────────────────────────────────────────────

pub const HOLDING_COLUMNS: &str = "h.holding_id, h.person_id, h.product_id, h.quantity, \
   h.cart_id, h.purchase_id, h.transferable, h.utilized, h.price_snapshot";

pub struct RawHolding {
  pub holding_id:     String,
  pub person_id:      String,
  pub product_id:     String,
  pub quantity:       u32,
  pub cart_id:        Option<String>,
  pub purchase_id:    Option<String>,
  pub transferable:   Option<bool>,
  pub utilized:       Option<String>,
  pub price_snapshot: Option<String>,
}

impl RawHolding {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      holding_id:     row.get(0)?,
      person_id:      row.get(1)?,
      product_id:     row.get(2)?,
      quantity:       row.get(3)?,
      cart_id:        row.get(4)?,
      purchase_id:    row.get(5)?,
      transferable:   row.get(6)?,
      utilized:       row.get(7)?,
      price_snapshot: row.get(8)?,
    })
  }

  pub fn into_holding(self, choice_ids: Vec<Uuid>) -> Result<Holding> {
    let owner = HoldingOwner::from_columns(
      decode_opt_uuid(self.cart_id.as_deref())?,
      decode_opt_uuid(self.purchase_id.as_deref())?,
    )?;
    Ok(Holding {
      holding_id: decode_uuid(&self.holding_id)?,
      person_id: decode_uuid(&self.person_id)?,
      product_id: decode_uuid(&self.product_id)?,
      choice_ids,
      quantity: self.quantity,
      owner,
      transferable: self.transferable,
      utilized: self.utilized.as_deref().map(decode_dt).transpose()?,
      price_snapshot: self.price_snapshot.as_deref().map(decode_json).transpose()?,
    })
  }
}

/// `(purchase_id, person_id, purchased, valid)`
pub type RawPurchase = (String, String, String, bool);

pub fn decode_purchase((id, person_id, purchased, valid): RawPurchase) -> Result<Purchase> {
  Ok(Purchase {
    purchase_id: decode_uuid(&id)?,
    person_id: decode_uuid(&person_id)?,
    purchased: decode_dt(&purchased)?,
    valid,
  })
}

// ─── Orchestras ──────────────────────────────────────────────────────────────

/// `(person_id, orchestra_id, active, is_primary)`
pub type RawMembership = (String, String, bool, bool);

pub fn decode_membership(
  (person_id, orchestra_id, active, primary): RawMembership,
) -> Result<OrchestraMembership> {
  Ok(OrchestraMembership {
    person_id: decode_uuid(&person_id)?,
    orchestra_id: decode_uuid(&orchestra_id)?,
    active,
    primary,
  })
}

/// `(ticket_type_id, product_id, food, accommodation, dinner)`
pub type RawOrchestraTicketType =
  (String, String, Option<String>, Option<String>, Option<String>);

pub fn decode_orchestra_ticket_type(
  (id, product_id, food, accommodation, dinner): RawOrchestraTicketType,
) -> Result<OrchestraTicketType> {
  Ok(OrchestraTicketType {
    ticket_type_id:        decode_uuid(&id)?,
    product_id:            decode_uuid(&product_id)?,
    food_product:          decode_opt_uuid(food.as_deref())?,
    accommodation_product: decode_opt_uuid(accommodation.as_deref())?,
    dinner_product:        decode_opt_uuid(dinner.as_deref())?,
  })
}
