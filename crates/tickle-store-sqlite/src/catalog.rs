//! Events, categories, products, variations and discounts.

use rusqlite::{Connection, OptionalExtension as _, params};
use tickle_core::{
  Error as CoreError,
  catalog::{
    Category, Event, NewChoice, NewProduct, Product, ProductKind, ProductQuery,
    ProductVariation, VariationChoice,
  },
  discount::{Discount, HoldingDiscount, NewDiscount},
  person::Person,
};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    PERSON_COLUMNS, PRODUCT_COLUMNS, RawProduct, decode_choice, decode_discount,
    decode_holding_discount, decode_uuid, encode_json, encode_money, encode_uuid,
  },
  error::unique_violation,
  people::query_people,
};

fn exists(conn: &Connection, sql: &str, id: Uuid) -> Result<bool> {
  Ok(conn.query_row(sql, params![encode_uuid(id)], |_| Ok(())).optional()?.is_some())
}

fn id_list(conn: &Connection, sql: &str, id: &str) -> Result<Vec<Uuid>> {
  let mut stmt = conn.prepare(sql)?;
  let ids = stmt
    .query_map(params![id], |r| r.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  ids.iter().map(|s| decode_uuid(s)).collect()
}

// ─── Events and categories ───────────────────────────────────────────────────

pub fn insert_event(conn: &Connection, name: &str) -> Result<Event> {
  let name = name.trim();
  if name.is_empty() {
    return Err(CoreError::Invalid("event name is required".into()).into());
  }
  let event = Event { event_id: Uuid::new_v4(), name: name.to_owned() };
  conn.execute(
    "INSERT INTO events (event_id, name) VALUES (?1, ?2)",
    params![encode_uuid(event.event_id), event.name],
  )?;
  Ok(event)
}

pub fn list_events(conn: &Connection) -> Result<Vec<Event>> {
  let mut stmt = conn.prepare("SELECT event_id, name FROM events ORDER BY name")?;
  let raws = stmt
    .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws
    .into_iter()
    .map(|(id, name)| Ok(Event { event_id: decode_uuid(&id)?, name }))
    .collect()
}

/// People holding a validly purchased ticket whose ticket type admits to
/// `event_id`.
pub fn event_visitors(conn: &Connection, event_id: Uuid) -> Result<Vec<Person>> {
  if !exists(conn, "SELECT 1 FROM events WHERE event_id = ?1", event_id)? {
    return Err(CoreError::NotFound(format!("event {event_id}")).into());
  }
  let sql = format!(
    "SELECT DISTINCT {PERSON_COLUMNS}
     FROM people p
     JOIN holdings h            ON h.person_id   = p.person_id
     JOIN purchases pu          ON pu.purchase_id = h.purchase_id
     JOIN ticket_type_events te ON te.product_id  = h.product_id
     WHERE te.event_id = ?1 AND pu.valid = 1
     ORDER BY p.first_name, p.last_name"
  );
  query_people(conn, &sql, params![encode_uuid(event_id)])
}

pub fn insert_category(conn: &Connection, name: &str) -> Result<Category> {
  let name = name.trim();
  if name.is_empty() {
    return Err(CoreError::Invalid("category name is required".into()).into());
  }
  let category = Category { category_id: Uuid::new_v4(), name: name.to_owned() };
  conn.execute(
    "INSERT INTO categories (category_id, name) VALUES (?1, ?2)",
    params![encode_uuid(category.category_id), category.name],
  )?;
  Ok(category)
}

// ─── Products ────────────────────────────────────────────────────────────────

fn query_products<P: rusqlite::Params>(
  conn: &Connection,
  sql: &str,
  params: P,
) -> Result<Vec<Product>> {
  let raws = {
    let mut stmt = conn.prepare(sql)?;
    stmt
      .query_map(params, RawProduct::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  raws
    .into_iter()
    .map(|raw| {
      let categories = id_list(
        conn,
        "SELECT category_id FROM product_categories WHERE product_id = ?1 ORDER BY rowid",
        &raw.product_id,
      )?;
      let events = id_list(
        conn,
        "SELECT event_id FROM ticket_type_events WHERE product_id = ?1 ORDER BY rowid",
        &raw.product_id,
      )?;
      raw.into_product(categories, events)
    })
    .collect()
}

pub fn insert_product(conn: &Connection, input: NewProduct) -> Result<Product> {
  input.validate()?;
  for id in &input.categories {
    if !exists(conn, "SELECT 1 FROM categories WHERE category_id = ?1", *id)? {
      return Err(CoreError::NotFound(format!("category {id}")).into());
    }
  }
  for id in input.ticket_events.iter().flatten() {
    if !exists(conn, "SELECT 1 FROM events WHERE event_id = ?1", *id)? {
      return Err(CoreError::NotFound(format!("event {id}")).into());
    }
  }

  let product = Product {
    product_id:     Uuid::new_v4(),
    name:           input.name.trim().to_owned(),
    public_name:    input.public_name.filter(|n| !n.trim().is_empty()),
    description:    input.description,
    base_price:     input.base_price,
    quantitative:   input.quantitative,
    published:      input.published,
    transferable:   input.transferable,
    order:          input.order,
    personal_limit: input.personal_limit,
    total_limit:    input.total_limit,
    categories:     input.categories,
    ticket_events:  input.ticket_events,
  };

  let id_str = encode_uuid(product.product_id);
  conn.execute(
    "INSERT INTO products (
       product_id, name, public_name, description, base_price, quantitative,
       published, transferable, sort_order, personal_limit, total_limit,
       is_ticket_type
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    params![
      id_str,
      product.name,
      product.public_name,
      product.description,
      encode_money(product.base_price),
      product.quantitative,
      product.published,
      product.transferable,
      product.order,
      product.personal_limit,
      product.total_limit,
      product.is_ticket_type(),
    ],
  )?;
  for id in &product.categories {
    conn.execute(
      "INSERT OR IGNORE INTO product_categories (product_id, category_id) VALUES (?1, ?2)",
      params![id_str, encode_uuid(*id)],
    )?;
  }
  for id in product.ticket_events.iter().flatten() {
    conn.execute(
      "INSERT OR IGNORE INTO ticket_type_events (product_id, event_id) VALUES (?1, ?2)",
      params![id_str, encode_uuid(*id)],
    )?;
  }

  Ok(product)
}

pub fn load_product(conn: &Connection, id: Uuid) -> Result<Option<Product>> {
  let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.product_id = ?1");
  Ok(query_products(conn, &sql, params![encode_uuid(id)])?.into_iter().next())
}

pub fn require_product(conn: &Connection, id: Uuid) -> Result<Product> {
  load_product(conn, id)?.ok_or_else(|| CoreError::ProductNotFound(id).into())
}

pub fn list_products(conn: &Connection, query: &ProductQuery) -> Result<Vec<Product>> {
  let mut conds: Vec<&'static str> = vec![];
  match query.published {
    Some(true) => conds.push("p.published = 1"),
    Some(false) => conds.push("p.published = 0"),
    None => {}
  }
  match query.kind {
    Some(ProductKind::Ticket) => conds.push("p.is_ticket_type = 1"),
    Some(ProductKind::Gadget) => conds.push("p.is_ticket_type = 0"),
    None => {}
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  let sql = format!(
    "SELECT {PRODUCT_COLUMNS} FROM products p {where_clause} ORDER BY p.sort_order, p.name"
  );
  query_products(conn, &sql, [])
}

// ─── Variations ──────────────────────────────────────────────────────────────

pub fn insert_variation(
  conn: &Connection,
  product_id: Uuid,
  name: &str,
) -> Result<ProductVariation> {
  require_product(conn, product_id)?;
  let name = name.trim();
  if name.is_empty() {
    return Err(CoreError::Invalid("variation name is required".into()).into());
  }

  let variation = ProductVariation {
    variation_id: Uuid::new_v4(),
    product_id,
    name: name.to_owned(),
    choices: Vec::new(),
  };
  conn
    .execute(
      "INSERT INTO variations (variation_id, product_id, name) VALUES (?1, ?2, ?3)",
      params![encode_uuid(variation.variation_id), encode_uuid(product_id), variation.name],
    )
    .map_err(|e| unique_violation(e, "a variation with that name"))?;
  Ok(variation)
}

pub fn insert_choice(
  conn: &Connection,
  variation_id: Uuid,
  input: NewChoice,
) -> Result<VariationChoice> {
  if !exists(conn, "SELECT 1 FROM variations WHERE variation_id = ?1", variation_id)? {
    return Err(CoreError::NotFound(format!("variation {variation_id}")).into());
  }
  let name = input.name.trim();
  if name.is_empty() {
    return Err(CoreError::Invalid("choice name is required".into()).into());
  }

  let choice = VariationChoice {
    choice_id: Uuid::new_v4(),
    variation_id,
    name: name.to_owned(),
    order: input.order,
    delta: input.delta,
  };
  conn
    .execute(
      "INSERT INTO variation_choices (choice_id, variation_id, name, sort_order, delta)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![
        encode_uuid(choice.choice_id),
        encode_uuid(variation_id),
        choice.name,
        choice.order,
        encode_money(choice.delta),
      ],
    )
    .map_err(|e| unique_violation(e, "a choice with that name"))?;
  Ok(choice)
}

pub fn variations(conn: &Connection, product_id: Uuid) -> Result<Vec<ProductVariation>> {
  let product_str = encode_uuid(product_id);
  let heads = {
    let mut stmt =
      conn.prepare("SELECT variation_id, name FROM variations WHERE product_id = ?1 ORDER BY name")?;
    stmt
      .query_map(params![product_str], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  let mut stmt = conn.prepare(
    "SELECT choice_id, variation_id, name, sort_order, delta
     FROM variation_choices WHERE variation_id = ?1
     ORDER BY sort_order, name",
  )?;
  heads
    .into_iter()
    .map(|(id, name)| {
      let choices = stmt
        .query_map(params![id], |r| {
          Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .map(decode_choice)
        .collect::<Result<Vec<_>>>()?;
      Ok(ProductVariation { variation_id: decode_uuid(&id)?, product_id, name, choices })
    })
    .collect()
}

// ─── Discounts ───────────────────────────────────────────────────────────────

pub fn insert_discount(conn: &Connection, input: NewDiscount) -> Result<Discount> {
  input.validate()?;
  let discount = Discount {
    discount_id: Uuid::new_v4(),
    name:        input.name.trim().to_owned(),
    adjustment:  input.adjustment,
    eligibility: input.eligibility,
  };
  conn.execute(
    "INSERT INTO discounts (discount_id, name, adjustment, eligibility) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(discount.discount_id),
      discount.name,
      encode_json(&discount.adjustment)?,
      encode_json(&discount.eligibility)?,
    ],
  )?;
  Ok(discount)
}

pub fn update_discount(conn: &Connection, discount: Discount) -> Result<Discount> {
  let changed = conn.execute(
    "UPDATE discounts SET name = ?2, adjustment = ?3, eligibility = ?4 WHERE discount_id = ?1",
    params![
      encode_uuid(discount.discount_id),
      discount.name,
      encode_json(&discount.adjustment)?,
      encode_json(&discount.eligibility)?,
    ],
  )?;
  if changed == 0 {
    return Err(CoreError::NotFound(format!("discount {}", discount.discount_id)).into());
  }
  Ok(discount)
}

pub fn attach_discount(conn: &Connection, product_id: Uuid, discount_id: Uuid) -> Result<()> {
  require_product(conn, product_id)?;
  if !exists(conn, "SELECT 1 FROM discounts WHERE discount_id = ?1", discount_id)? {
    return Err(CoreError::NotFound(format!("discount {discount_id}")).into());
  }
  conn.execute(
    "INSERT OR IGNORE INTO product_discounts (product_id, discount_id) VALUES (?1, ?2)",
    params![encode_uuid(product_id), encode_uuid(discount_id)],
  )?;
  Ok(())
}

pub fn product_discounts(conn: &Connection, product_id: Uuid) -> Result<Vec<Discount>> {
  let mut stmt = conn.prepare(
    "SELECT d.discount_id, d.name, d.adjustment, d.eligibility
     FROM discounts d
     JOIN product_discounts pd ON pd.discount_id = d.discount_id
     WHERE pd.product_id = ?1
     ORDER BY pd.rowid",
  )?;
  let raws = stmt
    .query_map(params![encode_uuid(product_id)], |r| {
      Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode_discount).collect()
}

pub fn insert_holding_discount(conn: &Connection, frozen: &HoldingDiscount) -> Result<()> {
  conn.execute(
    "INSERT INTO holding_discounts (holding_id, discount_id, name, adjustment, delta)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(frozen.holding_id),
      encode_uuid(frozen.discount_id),
      frozen.name,
      encode_json(&frozen.adjustment)?,
      encode_money(frozen.delta),
    ],
  )?;
  Ok(())
}

pub fn holding_discounts(conn: &Connection, holding_id: Uuid) -> Result<Vec<HoldingDiscount>> {
  let mut stmt = conn.prepare(
    "SELECT holding_id, discount_id, name, adjustment, delta
     FROM holding_discounts WHERE holding_id = ?1 ORDER BY rowid",
  )?;
  let raws = stmt
    .query_map(params![encode_uuid(holding_id)], |r| {
      Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode_holding_discount).collect()
}
