//! People, student unions and special nutrition.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use tickle_core::{
  Error as CoreError,
  discount::EligibilityContext,
  person::{NewPerson, Person, SpecialNutrition, StudentUnion, slugify},
};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    PERSON_COLUMNS, RawPerson, decode_nutrition, decode_union, decode_uuid, encode_date,
    encode_dt, encode_uuid, union_from_row,
  },
  error::unique_violation,
};

// ─── Reads ───────────────────────────────────────────────────────────────────

fn nutrition_ids(conn: &Connection, person_id: &str) -> Result<Vec<Uuid>> {
  let mut stmt = conn.prepare(
    "SELECT nutrition_id FROM person_nutrition WHERE person_id = ?1 ORDER BY rowid",
  )?;
  let ids = stmt
    .query_map(params![person_id], |r| r.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  ids.iter().map(|s| decode_uuid(s)).collect()
}

/// Run a query selecting [`PERSON_COLUMNS`] and decode every row.
pub fn query_people<P: rusqlite::Params>(
  conn: &Connection,
  sql: &str,
  params: P,
) -> Result<Vec<Person>> {
  let raws = {
    let mut stmt = conn.prepare(sql)?;
    stmt
      .query_map(params, RawPerson::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  raws
    .into_iter()
    .map(|raw| {
      let nutrition = nutrition_ids(conn, &raw.person_id)?;
      raw.into_person(nutrition)
    })
    .collect()
}

pub fn load(conn: &Connection, id: Uuid) -> Result<Option<Person>> {
  let sql = format!("SELECT {PERSON_COLUMNS} FROM people p WHERE p.person_id = ?1");
  Ok(query_people(conn, &sql, params![encode_uuid(id)])?.into_iter().next())
}

pub fn require(conn: &Connection, id: Uuid) -> Result<Person> {
  load(conn, id)?.ok_or_else(|| CoreError::PersonNotFound(id).into())
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<Person>> {
  let sql = format!("SELECT {PERSON_COLUMNS} FROM people p WHERE p.email = ?1 COLLATE NOCASE");
  Ok(query_people(conn, &sql, params![email.trim()])?.into_iter().next())
}

pub fn list(conn: &Connection) -> Result<Vec<Person>> {
  let sql = format!(
    "SELECT {PERSON_COLUMNS} FROM people p ORDER BY p.first_name, p.last_name, p.email"
  );
  query_people(conn, &sql, [])
}

// ─── Writes ──────────────────────────────────────────────────────────────────

fn write_nutrition(conn: &Connection, person_id: &str, nutrition: &[Uuid]) -> Result<()> {
  conn.execute("DELETE FROM person_nutrition WHERE person_id = ?1", params![person_id])?;
  for id in nutrition {
    let exists = conn
      .query_row(
        "SELECT 1 FROM special_nutrition WHERE nutrition_id = ?1",
        params![encode_uuid(*id)],
        |_| Ok(()),
      )
      .optional()?
      .is_some();
    if !exists {
      return Err(CoreError::NotFound(format!("special nutrition {id}")).into());
    }
    conn.execute(
      "INSERT OR IGNORE INTO person_nutrition (person_id, nutrition_id) VALUES (?1, ?2)",
      params![person_id, encode_uuid(*id)],
    )?;
  }
  Ok(())
}

fn email_owner(conn: &Connection, email: &str) -> Result<Option<Uuid>> {
  let owner: Option<String> = conn
    .query_row(
      "SELECT person_id FROM people WHERE email = ?1 COLLATE NOCASE",
      params![email],
      |r| r.get(0),
    )
    .optional()?;
  owner.as_deref().map(decode_uuid).transpose()
}

pub fn insert(conn: &Connection, input: NewPerson) -> Result<Person> {
  input.validate()?;
  let email = input.email.trim().to_owned();
  if email_owner(conn, &email)?.is_some() {
    return Err(CoreError::EmailTaken(email).into());
  }

  let mut person = Person {
    person_id:         Uuid::new_v4(),
    email,
    first_name:        input.first_name.trim().to_owned(),
    last_name:         input.last_name.trim().to_owned(),
    password_hash:     input.password_hash,
    birth_date:        None,
    pid_code:          None,
    pid_coordination:  false,
    liu_id:            input.liu_id.filter(|s| !s.is_empty()),
    liu_id_blocked:    None,
    liu_card_magnet:   String::new(),
    liu_card_rfid:     String::new(),
    student_union_id:  None,
    special_nutrition: input.special_nutrition,
    is_active:         true,
    is_staff:          input.is_staff,
    is_superuser:      input.is_superuser,
    created_at:        Utc::now(),
  };
  if let Some(pid) = input.pid {
    person.set_pid(pid);
  }

  let id_str = encode_uuid(person.person_id);
  conn
    .execute(
      "INSERT INTO people (
         person_id, email, first_name, last_name, password_hash, birth_date,
         pid_code, pid_coordination, liu_id, is_active, is_staff, is_superuser,
         created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
      params![
        id_str,
        person.email,
        person.first_name,
        person.last_name,
        person.password_hash,
        person.birth_date.map(encode_date),
        person.pid_code,
        person.pid_coordination,
        person.liu_id,
        person.is_active,
        person.is_staff,
        person.is_superuser,
        encode_dt(person.created_at),
      ],
    )
    .map_err(|e| unique_violation(e, "a person with that LiU ID or national identity number"))?;
  write_nutrition(conn, &id_str, &person.special_nutrition)?;

  Ok(person)
}

pub fn update(conn: &Connection, person: Person) -> Result<Person> {
  require(conn, person.person_id)?;
  if let Some(owner) = email_owner(conn, person.email.trim())? {
    if owner != person.person_id {
      return Err(CoreError::EmailTaken(person.email.trim().to_owned()).into());
    }
  }

  let id_str = encode_uuid(person.person_id);
  conn
    .execute(
      "UPDATE people SET
         email = ?2, first_name = ?3, last_name = ?4, password_hash = ?5,
         birth_date = ?6, pid_code = ?7, pid_coordination = ?8, liu_id = ?9,
         liu_id_blocked = ?10, liu_card_magnet = ?11, liu_card_rfid = ?12,
         student_union_id = ?13, is_active = ?14, is_staff = ?15, is_superuser = ?16
       WHERE person_id = ?1",
      params![
        id_str,
        person.email.trim(),
        person.first_name,
        person.last_name,
        person.password_hash,
        person.birth_date.map(encode_date),
        person.pid_code.as_deref().filter(|c| !c.is_empty()),
        person.pid_coordination,
        person.liu_id.as_deref().filter(|s| !s.is_empty()),
        person.liu_id_blocked,
        person.liu_card_magnet,
        person.liu_card_rfid,
        person.student_union_id.map(encode_uuid),
        person.is_active,
        person.is_staff,
        person.is_superuser,
      ],
    )
    .map_err(|e| unique_violation(e, "a person with that LiU ID or national identity number"))?;
  write_nutrition(conn, &id_str, &person.special_nutrition)?;

  require(conn, person.person_id)
}

// ─── Lookup tables ───────────────────────────────────────────────────────────

pub fn student_union(conn: &Connection, name: &str) -> Result<StudentUnion> {
  let name = name.trim();
  if name.is_empty() {
    return Err(CoreError::Invalid("student union name is required".into()).into());
  }

  let existing = conn
    .query_row(
      "SELECT union_id, name, slug FROM student_unions WHERE name = ?1",
      params![name],
      union_from_row,
    )
    .optional()?;
  if let Some(raw) = existing {
    return decode_union(raw);
  }

  let union = StudentUnion {
    union_id: Uuid::new_v4(),
    name:     name.to_owned(),
    slug:     slugify(name),
  };
  conn
    .execute(
      "INSERT INTO student_unions (union_id, name, slug) VALUES (?1, ?2, ?3)",
      params![encode_uuid(union.union_id), union.name, union.slug],
    )
    .map_err(|e| unique_violation(e, "a student union with that slug"))?;
  Ok(union)
}

pub fn insert_nutrition(conn: &Connection, name: &str) -> Result<SpecialNutrition> {
  let name = name.trim();
  if name.is_empty() {
    return Err(CoreError::Invalid("nutrition name is required".into()).into());
  }
  let nutrition = SpecialNutrition { nutrition_id: Uuid::new_v4(), name: name.to_owned() };
  conn.execute(
    "INSERT INTO special_nutrition (nutrition_id, name) VALUES (?1, ?2)",
    params![encode_uuid(nutrition.nutrition_id), nutrition.name],
  )?;
  Ok(nutrition)
}

pub fn list_nutrition(conn: &Connection) -> Result<Vec<SpecialNutrition>> {
  let mut stmt = conn.prepare("SELECT nutrition_id, name FROM special_nutrition ORDER BY name")?;
  let raws = stmt
    .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode_nutrition).collect()
}

// ─── Eligibility ─────────────────────────────────────────────────────────────

pub fn eligibility_context(conn: &Connection, person_id: Uuid) -> Result<EligibilityContext> {
  let person = require(conn, person_id)?;

  let mut stmt = conn.prepare(
    "SELECT orchestra_id FROM orchestra_memberships WHERE person_id = ?1 AND active = 1",
  )?;
  let orchestras = stmt
    .query_map(params![encode_uuid(person_id)], |r| r.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(EligibilityContext {
    student_union_id:  person.student_union_id,
    has_valid_liu_id:  person.liu_id.as_deref().is_some_and(|s| !s.is_empty())
      && person.liu_id_blocked != Some(true),
    active_orchestras: orchestras.iter().map(|s| decode_uuid(s)).collect::<Result<_>>()?,
    is_staff:          person.is_staff,
  })
}
