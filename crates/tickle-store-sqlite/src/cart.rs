//! Carts, holdings, purchases and limit accounting.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use tickle_core::{
  Error as CoreError,
  catalog::resolve_choices,
  discount::{EligibilityContext, eligible},
  holding::{Delivery, Holding, HoldingOwner, NewHolding, Purchase, ShoppingCart},
  limits::{self, LimitStatus},
  pricing::{self, PriceBreakdown},
};
use uuid::Uuid;

use crate::{
  Result,
  catalog::{insert_holding_discount, product_discounts, require_product, variations},
  encode::{
    HOLDING_COLUMNS, RawHolding, decode_purchase, decode_uuid, encode_dt, encode_json,
    encode_uuid,
  },
  people,
};

// ─── Holdings ────────────────────────────────────────────────────────────────

fn query_holdings<P: rusqlite::Params>(
  conn: &Connection,
  sql: &str,
  params: P,
) -> Result<Vec<Holding>> {
  let raws = {
    let mut stmt = conn.prepare(sql)?;
    stmt
      .query_map(params, RawHolding::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  let mut stmt =
    conn.prepare("SELECT choice_id FROM holding_choices WHERE holding_id = ?1 ORDER BY rowid")?;
  raws
    .into_iter()
    .map(|raw| {
      let choice_ids = stmt
        .query_map(params![raw.holding_id], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<Result<Vec<_>>>()?;
      raw.into_holding(choice_ids)
    })
    .collect()
}

pub fn load_holding(conn: &Connection, id: Uuid) -> Result<Option<Holding>> {
  let sql = format!("SELECT {HOLDING_COLUMNS} FROM holdings h WHERE h.holding_id = ?1");
  Ok(query_holdings(conn, &sql, params![encode_uuid(id)])?.into_iter().next())
}

pub fn require_holding(conn: &Connection, id: Uuid) -> Result<Holding> {
  load_holding(conn, id)?.ok_or_else(|| CoreError::HoldingNotFound(id).into())
}

/// Price a holding: a purchased one keeps its snapshot, a cart one is priced
/// with what the holder is eligible for right now.
pub fn price_holding(conn: &Connection, holding: &Holding) -> Result<PriceBreakdown> {
  if let Some(snapshot) = &holding.price_snapshot {
    return Ok(snapshot.clone());
  }
  let ctx = people::eligibility_context(conn, holding.person_id)?;
  current_price(conn, holding, &ctx)
}

fn current_price(
  conn: &Connection,
  holding: &Holding,
  ctx: &EligibilityContext,
) -> Result<PriceBreakdown> {
  let product = require_product(conn, holding.product_id)?;
  let choices = resolve_choices(&variations(conn, product.product_id)?, &holding.choice_ids)?;
  let discounts = product_discounts(conn, product.product_id)?;
  Ok(pricing::price(&product, &choices, &eligible(&discounts, ctx), holding.quantity)?)
}

// ─── Cart ────────────────────────────────────────────────────────────────────

pub fn ensure_cart(conn: &Connection, person_id: Uuid) -> Result<ShoppingCart> {
  people::require(conn, person_id)?;
  let person_str = encode_uuid(person_id);

  let existing: Option<String> = conn
    .query_row(
      "SELECT cart_id FROM carts WHERE person_id = ?1",
      params![person_str],
      |r| r.get(0),
    )
    .optional()?;
  if let Some(id) = existing {
    return Ok(ShoppingCart { cart_id: decode_uuid(&id)?, person_id });
  }

  let cart = ShoppingCart { cart_id: Uuid::new_v4(), person_id };
  conn.execute(
    "INSERT INTO carts (cart_id, person_id) VALUES (?1, ?2)",
    params![encode_uuid(cart.cart_id), person_str],
  )?;
  Ok(cart)
}

pub fn cart_holdings(conn: &Connection, person_id: Uuid) -> Result<Vec<Holding>> {
  let sql = format!(
    "SELECT {HOLDING_COLUMNS} FROM holdings h
     JOIN carts c ON c.cart_id = h.cart_id
     WHERE c.person_id = ?1
     ORDER BY h.created_at, h.rowid"
  );
  query_holdings(conn, &sql, params![encode_uuid(person_id)])
}

pub fn add_to_cart(conn: &Connection, person_id: Uuid, input: NewHolding) -> Result<Holding> {
  let cart = ensure_cart(conn, person_id)?;
  let product = require_product(conn, input.product_id)?;
  if !product.published {
    return Err(CoreError::Unpublished(product.product_id).into());
  }
  product.validate_quantity(input.quantity)?;
  resolve_choices(&variations(conn, product.product_id)?, &input.choice_ids)?;

  let status = LimitStatus::new(
    &product,
    Some(purchased_quantity(conn, product.product_id, Some(person_id))?),
    purchased_quantity(conn, product.product_id, None)?,
  );
  if status.personal_limit_reached {
    return Err(
      CoreError::PersonalLimitReached {
        product_id: product.product_id,
        limit:      product.personal_limit.unwrap_or_default(),
      }
      .into(),
    );
  }
  if status.total_limit_reached {
    return Err(
      CoreError::TotalLimitReached {
        product_id: product.product_id,
        limit:      product.total_limit.unwrap_or_default(),
      }
      .into(),
    );
  }

  let holding = Holding {
    holding_id: Uuid::new_v4(),
    person_id,
    product_id: product.product_id,
    choice_ids: input.choice_ids,
    quantity: input.quantity,
    owner: HoldingOwner::Cart(cart.cart_id),
    transferable: None,
    utilized: None,
    price_snapshot: None,
  };
  let (cart_id, purchase_id) = holding.owner.to_columns();
  let id_str = encode_uuid(holding.holding_id);
  conn.execute(
    "INSERT INTO holdings (holding_id, person_id, product_id, quantity, cart_id, purchase_id, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      id_str,
      encode_uuid(person_id),
      encode_uuid(holding.product_id),
      holding.quantity,
      cart_id.map(encode_uuid),
      purchase_id.map(encode_uuid),
      encode_dt(Utc::now()),
    ],
  )?;
  for choice in &holding.choice_ids {
    conn.execute(
      "INSERT INTO holding_choices (holding_id, choice_id) VALUES (?1, ?2)",
      params![id_str, encode_uuid(*choice)],
    )?;
  }

  Ok(holding)
}

pub fn remove_from_cart(conn: &Connection, person_id: Uuid, holding_id: Uuid) -> Result<()> {
  let holding = require_holding(conn, holding_id)?;
  if holding.person_id != person_id {
    return Err(CoreError::HoldingNotFound(holding_id).into());
  }
  if holding.is_purchased() {
    return Err(CoreError::Invalid(format!("holding {holding_id} is already purchased")).into());
  }

  let id_str = encode_uuid(holding_id);
  conn.execute("DELETE FROM holding_choices WHERE holding_id = ?1", params![id_str])?;
  conn.execute("DELETE FROM holdings WHERE holding_id = ?1", params![id_str])?;
  Ok(())
}

/// Convert the person's cart into a purchase. The caller runs this inside a
/// transaction; any error leaves the cart untouched once rolled back.
pub fn purchase_cart(conn: &Connection, person_id: Uuid) -> Result<(Purchase, usize)> {
  let holdings = cart_holdings(conn, person_id)?;
  if holdings.is_empty() {
    return Err(CoreError::EmptyCart.into());
  }

  // Limits are checked once per product against everything in the cart.
  let mut requested: Vec<(Uuid, u64)> = Vec::new();
  let mut index: HashMap<Uuid, usize> = HashMap::new();
  for h in &holdings {
    let slot = *index.entry(h.product_id).or_insert_with(|| {
      requested.push((h.product_id, 0));
      requested.len() - 1
    });
    requested[slot].1 += u64::from(h.quantity);
  }
  for (product_id, quantity) in requested {
    let product = require_product(conn, product_id)?;
    limits::check(
      &product,
      purchased_quantity(conn, product_id, Some(person_id))?,
      purchased_quantity(conn, product_id, None)?,
      quantity,
    )?;
  }

  let purchase = Purchase {
    purchase_id: Uuid::new_v4(),
    person_id,
    purchased: Utc::now(),
    valid: true,
  };
  let purchase_str = encode_uuid(purchase.purchase_id);
  conn.execute(
    "INSERT INTO purchases (purchase_id, person_id, purchased, valid) VALUES (?1, ?2, ?3, 1)",
    params![purchase_str, encode_uuid(person_id), encode_dt(purchase.purchased)],
  )?;

  let ctx = people::eligibility_context(conn, person_id)?;
  for holding in &holdings {
    let breakdown = current_price(conn, holding, &ctx)?;
    for applied in &breakdown.discounts {
      insert_holding_discount(conn, &applied.freeze(holding.holding_id))?;
    }
    conn.execute(
      "UPDATE holdings SET cart_id = NULL, purchase_id = ?2, price_snapshot = ?3
       WHERE holding_id = ?1",
      params![encode_uuid(holding.holding_id), purchase_str, encode_json(&breakdown)?],
    )?;
  }

  Ok((purchase, holdings.len()))
}

// ─── Holding lifecycle ───────────────────────────────────────────────────────

/// The purchase a holding belongs to, refusing cart holdings and holdings of
/// invalidated purchases.
fn valid_purchase_of(conn: &Connection, holding: &Holding) -> Result<Purchase> {
  let purchase_id =
    holding.owner.purchase_id().ok_or(CoreError::NotPurchased(holding.holding_id))?;
  let purchase = require_purchase(conn, purchase_id)?;
  if !purchase.valid {
    return Err(CoreError::AlreadyInvalidated(purchase_id).into());
  }
  Ok(purchase)
}

pub fn utilize(conn: &Connection, id: Uuid) -> Result<Holding> {
  let holding = require_holding(conn, id)?;
  valid_purchase_of(conn, &holding)?;
  if holding.utilized.is_some() {
    return Err(CoreError::AlreadyUtilized(id).into());
  }
  conn.execute(
    "UPDATE holdings SET utilized = ?2 WHERE holding_id = ?1",
    params![encode_uuid(id), encode_dt(Utc::now())],
  )?;
  require_holding(conn, id)
}

pub fn transfer(conn: &Connection, id: Uuid, to_person: Uuid) -> Result<Holding> {
  let holding = require_holding(conn, id)?;
  valid_purchase_of(conn, &holding)?;
  let product = require_product(conn, holding.product_id)?;
  if !holding.is_transferable(&product) {
    return Err(CoreError::NotTransferable(id).into());
  }
  if holding.utilized.is_some() {
    return Err(CoreError::AlreadyUtilized(id).into());
  }
  people::require(conn, to_person)?;
  limits::check_personal(
    &product,
    purchased_quantity(conn, holding.product_id, Some(to_person))?,
    u64::from(holding.quantity),
  )?;

  conn.execute(
    "UPDATE holdings SET person_id = ?2 WHERE holding_id = ?1",
    params![encode_uuid(id), encode_uuid(to_person)],
  )?;
  require_holding(conn, id)
}

pub fn record_delivery(conn: &Connection, holding_ids: Vec<Uuid>) -> Result<Delivery> {
  if holding_ids.is_empty() {
    return Err(CoreError::Invalid("a delivery needs at least one holding".into()).into());
  }
  for id in &holding_ids {
    if !require_holding(conn, *id)?.is_purchased() {
      return Err(CoreError::NotPurchased(*id).into());
    }
  }

  let delivery = Delivery { delivery_id: Uuid::new_v4(), holding_ids, delivered: Utc::now() };
  let delivery_str = encode_uuid(delivery.delivery_id);
  conn.execute(
    "INSERT INTO deliveries (delivery_id, delivered) VALUES (?1, ?2)",
    params![delivery_str, encode_dt(delivery.delivered)],
  )?;
  for id in &delivery.holding_ids {
    conn.execute(
      "INSERT OR IGNORE INTO delivery_holdings (delivery_id, holding_id) VALUES (?1, ?2)",
      params![delivery_str, encode_uuid(*id)],
    )?;
  }
  Ok(delivery)
}

// ─── Purchases ───────────────────────────────────────────────────────────────

fn query_purchases<P: rusqlite::Params>(
  conn: &Connection,
  sql: &str,
  params: P,
) -> Result<Vec<Purchase>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode_purchase).collect()
}

pub fn load_purchase(conn: &Connection, id: Uuid) -> Result<Option<Purchase>> {
  Ok(query_purchases(
    conn,
    "SELECT purchase_id, person_id, purchased, valid FROM purchases WHERE purchase_id = ?1",
    params![encode_uuid(id)],
  )?
  .into_iter()
  .next())
}

pub fn require_purchase(conn: &Connection, id: Uuid) -> Result<Purchase> {
  load_purchase(conn, id)?.ok_or_else(|| CoreError::PurchaseNotFound(id).into())
}

pub fn list_purchases(conn: &Connection, person_id: Uuid) -> Result<Vec<Purchase>> {
  query_purchases(
    conn,
    "SELECT purchase_id, person_id, purchased, valid FROM purchases
     WHERE person_id = ?1
     ORDER BY purchased DESC, rowid DESC",
    params![encode_uuid(person_id)],
  )
}

pub fn purchase_holdings(conn: &Connection, purchase_id: Uuid) -> Result<Vec<Holding>> {
  let sql = format!(
    "SELECT {HOLDING_COLUMNS} FROM holdings h
     WHERE h.purchase_id = ?1
     ORDER BY h.created_at, h.rowid"
  );
  query_holdings(conn, &sql, params![encode_uuid(purchase_id)])
}

pub fn invalidate(conn: &Connection, id: Uuid) -> Result<Purchase> {
  let purchase = require_purchase(conn, id)?;
  if !purchase.valid {
    return Err(CoreError::AlreadyInvalidated(id).into());
  }
  conn.execute("UPDATE purchases SET valid = 0 WHERE purchase_id = ?1", params![encode_uuid(id)])?;
  Ok(Purchase { valid: false, ..purchase })
}

// ─── Limits ──────────────────────────────────────────────────────────────────

/// Units of `product_id` in valid purchases, held by `person_id` or by anyone.
pub fn purchased_quantity(
  conn: &Connection,
  product_id: Uuid,
  person_id: Option<Uuid>,
) -> Result<u64> {
  let sum: i64 = conn.query_row(
    "SELECT COALESCE(SUM(h.quantity), 0)
     FROM holdings h
     JOIN purchases pu ON pu.purchase_id = h.purchase_id
     WHERE h.product_id = ?1
       AND pu.valid = 1
       AND (?2 IS NULL OR h.person_id = ?2)",
    params![encode_uuid(product_id), person_id.map(encode_uuid)],
    |r| r.get(0),
  )?;
  Ok(u64::try_from(sum).unwrap_or_default())
}

pub fn limit_status(
  conn: &Connection,
  product_id: Uuid,
  person_id: Option<Uuid>,
) -> Result<LimitStatus> {
  let product = require_product(conn, product_id)?;
  let personal = person_id
    .map(|id| purchased_quantity(conn, product_id, Some(id)))
    .transpose()?;
  let total = purchased_quantity(conn, product_id, None)?;
  Ok(LimitStatus::new(&product, personal, total))
}
