//! Orchestras, memberships and orchestra registration.

use rusqlite::{Connection, OptionalExtension as _, params};
use tickle_core::{
  Error as CoreError,
  holding::Holding,
  orchestra::{
    MembershipInput, NewOrchestraTicketType, Orchestra, OrchestraMembership,
    OrchestraRegistration, OrchestraTicketType, validate_memberships,
  },
};
use uuid::Uuid;

use crate::{
  Result,
  cart,
  catalog::require_product,
  encode::{decode_membership, decode_orchestra_ticket_type, decode_uuid, encode_uuid},
  error::unique_violation,
  people,
};

pub fn insert(conn: &Connection, name: &str) -> Result<Orchestra> {
  let name = name.trim();
  if name.is_empty() {
    return Err(CoreError::Invalid("orchestra name is required".into()).into());
  }
  let orchestra = Orchestra { orchestra_id: Uuid::new_v4(), name: name.to_owned() };
  conn
    .execute(
      "INSERT INTO orchestras (orchestra_id, name) VALUES (?1, ?2)",
      params![encode_uuid(orchestra.orchestra_id), orchestra.name],
    )
    .map_err(|e| unique_violation(e, "an orchestra with that name"))?;
  Ok(orchestra)
}

pub fn list(conn: &Connection) -> Result<Vec<Orchestra>> {
  let mut stmt = conn.prepare("SELECT orchestra_id, name FROM orchestras ORDER BY name")?;
  let raws = stmt
    .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws
    .into_iter()
    .map(|(id, name)| Ok(Orchestra { orchestra_id: decode_uuid(&id)?, name }))
    .collect()
}

// ─── Memberships ─────────────────────────────────────────────────────────────

pub fn memberships(conn: &Connection, person_id: Uuid) -> Result<Vec<OrchestraMembership>> {
  let mut stmt = conn.prepare(
    "SELECT m.person_id, m.orchestra_id, m.active, m.is_primary
     FROM orchestra_memberships m
     JOIN orchestras o ON o.orchestra_id = m.orchestra_id
     WHERE m.person_id = ?1
     ORDER BY m.is_primary DESC, o.name",
  )?;
  let raws = stmt
    .query_map(params![encode_uuid(person_id)], |r| {
      Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode_membership).collect()
}

/// Replace every membership of `person_id` with `inputs`.
pub fn replace_memberships(
  conn: &Connection,
  person_id: Uuid,
  inputs: &[MembershipInput],
) -> Result<Vec<OrchestraMembership>> {
  validate_memberships(inputs)?;
  people::require(conn, person_id)?;
  let person_str = encode_uuid(person_id);

  conn.execute("DELETE FROM orchestra_memberships WHERE person_id = ?1", params![person_str])?;
  for m in inputs {
    let known = conn
      .query_row(
        "SELECT 1 FROM orchestras WHERE orchestra_id = ?1",
        params![encode_uuid(m.orchestra_id)],
        |_| Ok(()),
      )
      .optional()?
      .is_some();
    if !known {
      return Err(CoreError::NotFound(format!("orchestra {}", m.orchestra_id)).into());
    }
    conn.execute(
      "INSERT INTO orchestra_memberships (person_id, orchestra_id, active, is_primary)
       VALUES (?1, ?2, ?3, ?4)",
      params![person_str, encode_uuid(m.orchestra_id), m.active, m.primary],
    )?;
  }

  memberships(conn, person_id)
}

// ─── Ticket types and registration ───────────────────────────────────────────

const TICKET_TYPE_COLUMNS: &str =
  "ticket_type_id, product_id, food_product, accommodation_product, dinner_product";

pub fn insert_ticket_type(
  conn: &Connection,
  input: NewOrchestraTicketType,
) -> Result<OrchestraTicketType> {
  let product = require_product(conn, input.product_id)?;
  if !product.is_ticket_type() {
    return Err(
      CoreError::Invalid(format!("product {} is not a ticket type", product.product_id)).into(),
    );
  }
  for extra in [input.food_product, input.accommodation_product, input.dinner_product]
    .into_iter()
    .flatten()
  {
    require_product(conn, extra)?;
  }

  let ticket_type = OrchestraTicketType {
    ticket_type_id:        Uuid::new_v4(),
    product_id:            input.product_id,
    food_product:          input.food_product,
    accommodation_product: input.accommodation_product,
    dinner_product:        input.dinner_product,
  };
  conn
    .execute(
      &format!("INSERT INTO orchestra_ticket_types ({TICKET_TYPE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
      params![
        encode_uuid(ticket_type.ticket_type_id),
        encode_uuid(ticket_type.product_id),
        ticket_type.food_product.map(encode_uuid),
        ticket_type.accommodation_product.map(encode_uuid),
        ticket_type.dinner_product.map(encode_uuid),
      ],
    )
    .map_err(|e| unique_violation(e, "an orchestra ticket type for that product"))?;
  Ok(ticket_type)
}

fn query_ticket_types<P: rusqlite::Params>(
  conn: &Connection,
  sql: &str,
  params: P,
) -> Result<Vec<OrchestraTicketType>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode_orchestra_ticket_type).collect()
}

pub fn list_ticket_types(conn: &Connection) -> Result<Vec<OrchestraTicketType>> {
  query_ticket_types(
    conn,
    &format!("SELECT {TICKET_TYPE_COLUMNS} FROM orchestra_ticket_types ORDER BY rowid"),
    [],
  )
}

/// Set memberships and add the ticket plus requested extras to the cart.
/// The caller runs this inside a transaction.
pub fn register(
  conn: &Connection,
  person_id: Uuid,
  registration: OrchestraRegistration,
) -> Result<Vec<Holding>> {
  let ticket_type = query_ticket_types(
    conn,
    &format!("SELECT {TICKET_TYPE_COLUMNS} FROM orchestra_ticket_types WHERE ticket_type_id = ?1"),
    params![encode_uuid(registration.ticket_type_id)],
  )?
  .into_iter()
  .next()
  .ok_or_else(|| {
    CoreError::NotFound(format!("orchestra ticket type {}", registration.ticket_type_id))
  })?;

  let lines = registration.holdings(&ticket_type)?;
  replace_memberships(conn, person_id, &registration.memberships)?;

  lines
    .into_iter()
    .map(|line| cart::add_to_cart(conn, person_id, line))
    .collect()
}
