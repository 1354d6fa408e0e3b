//! People: the email-keyed identity that holds carts and purchases.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, pid::Pid};

// ─── Person ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub person_id:         Uuid,
  pub email:             String,
  pub first_name:        String,
  pub last_name:         String,
  /// Argon2 PHC string. Never serialised to clients.
  #[serde(skip_serializing, default)]
  pub password_hash:     Option<String>,
  pub birth_date:        Option<NaiveDate>,
  /// Last four digits of the national identity number.
  pub pid_code:          Option<String>,
  pub pid_coordination:  bool,
  pub liu_id:            Option<String>,
  pub liu_id_blocked:    Option<bool>,
  /// Magnet stripe or barcode card number; empty when the person has no card.
  pub liu_card_magnet:   String,
  pub liu_card_rfid:     String,
  pub student_union_id:  Option<Uuid>,
  pub special_nutrition: Vec<Uuid>,
  pub is_active:         bool,
  pub is_staff:          bool,
  pub is_superuser:      bool,
  pub created_at:        DateTime<Utc>,
}

impl Person {
  pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name) }

  pub fn short_name(&self) -> String {
    match self.last_name.chars().next() {
      Some(initial) => format!("{} {initial}.", self.first_name),
      None => self.first_name.clone(),
    }
  }

  /// `First Last <email>`, suitable for a `To:` header.
  pub fn pretty_email(&self) -> String {
    pretty_email(&self.first_name, &self.last_name, &self.email)
  }

  /// The decomposed national identity number, if a birth date is known.
  pub fn pid_parts(&self) -> Option<Pid> {
    self.birth_date.map(|birth_date| Pid {
      birth_date,
      code: self.pid_code.clone(),
      coordination: self.pid_coordination,
    })
  }

  /// The printed national identity number, e.g. `811218-9876`.
  pub fn pid(&self) -> Option<String> { self.pid_parts().map(|p| p.format()) }

  pub fn set_pid(&mut self, pid: Pid) {
    self.birth_date = Some(pid.birth_date);
    self.pid_code = pid.code.filter(|c| !c.is_empty());
    self.pid_coordination = pid.coordination;
  }
}

pub fn pretty_email(first_name: &str, last_name: &str, email: &str) -> String {
  format!("{first_name} {last_name} <{email}>")
}

/// Join the pretty addresses of `people` into one `; `-separated recipient
/// string.
pub fn pretty_emails<'a>(people: impl IntoIterator<Item = &'a Person>) -> String {
  people
    .into_iter()
    .map(Person::pretty_email)
    .collect::<Vec<_>>()
    .join("; ")
}

// ─── NewPerson ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::TicketStore::add_person`].
#[derive(Debug, Clone, Default)]
pub struct NewPerson {
  pub email:             String,
  pub first_name:        String,
  pub last_name:         String,
  pub password_hash:     Option<String>,
  pub pid:               Option<Pid>,
  pub liu_id:            Option<String>,
  pub special_nutrition: Vec<Uuid>,
  pub is_staff:          bool,
  pub is_superuser:      bool,
}

impl NewPerson {
  pub fn new(
    email: impl Into<String>,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
  ) -> Self {
    Self {
      email: email.into(),
      first_name: first_name.into(),
      last_name: last_name.into(),
      ..Self::default()
    }
  }

  pub fn validate(&self) -> Result<()> {
    let email = self.email.trim();
    if email.is_empty() || !email.contains('@') {
      return Err(Error::Invalid(format!("invalid email address: {:?}", self.email)));
    }
    if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
      return Err(Error::Invalid("first and last name are required".into()));
    }
    Ok(())
  }
}

// ─── Lookup tables ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentUnion {
  pub union_id: Uuid,
  pub name:     String,
  pub slug:     String,
}

/// A dietary preference tag, e.g. "vegetarian".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialNutrition {
  pub nutrition_id: Uuid,
  pub name:         String,
}

/// Lowercase ASCII slug; runs of anything else collapse into one `-`.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  for c in name.chars() {
    let mapped = match c {
      'å' | 'ä' | 'Å' | 'Ä' => Some('a'),
      'ö' | 'Ö' => Some('o'),
      c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
      _ => None,
    };
    match mapped {
      Some(c) => slug.push(c),
      None if !slug.is_empty() && !slug.ends_with('-') => slug.push('-'),
      None => {}
    }
  }
  slug.trim_end_matches('-').to_owned()
}
