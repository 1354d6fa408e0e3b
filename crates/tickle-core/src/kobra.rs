//! Filling person records from the Kobra student register.
//!
//! The HTTP client lives in `tickle-kobra`; this module owns the lookup-key
//! priority, the error policy and how a returned record is merged into a
//! [`Person`].

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, person::Person, pid::Pid};

/// What to search the register by, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum StudentKey {
  LiuId(String),
  PersonalNumber(String),
  RfidNumber(String),
  MagnetNumber(String),
}

impl StudentKey {
  /// Query parameter name and value.
  pub fn param(&self) -> (&'static str, &str) {
    match self {
      Self::LiuId(v) => ("liu_id", v),
      Self::PersonalNumber(v) => ("personal_number", v),
      Self::RfidNumber(v) => ("rfid_number", v),
      Self::MagnetNumber(v) => ("magnet_number", v),
    }
  }

  /// Pick the best key a person has: LiU ID, then national identity number
  /// (only with a known code), then RFID card, then magnet card.
  pub fn for_person(person: &Person) -> Option<Self> {
    if let Some(liu_id) = person.liu_id.as_ref().filter(|s| !s.is_empty()) {
      return Some(Self::LiuId(liu_id.clone()));
    }
    if person.birth_date.is_some() && person.pid_code.is_some() {
      return person.pid().map(Self::PersonalNumber);
    }
    if !person.liu_card_rfid.is_empty() {
      return Some(Self::RfidNumber(person.liu_card_rfid.clone()));
    }
    if !person.liu_card_magnet.is_empty() {
      return Some(Self::MagnetNumber(person.liu_card_magnet.clone()));
    }
    None
  }
}

/// A student record as returned by the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub first_name:      String,
  pub last_name:       String,
  pub personal_number: String,
  pub liu_id:          String,
  pub blocked:         bool,
  pub barcode_number:  Option<String>,
  pub rfid_number:     Option<String>,
  /// Student union name, if the student belongs to one.
  pub union:           Option<String>,
}

/// A source of student records.
///
/// Implementations return [`Error::LookupUnauthorized`] when the service
/// rejects the credentials and [`Error::StudentNotFound`] when nothing
/// matches.
pub trait StudentLookup: Send + Sync {
  fn get_student<'a>(
    &'a self,
    key: &'a StudentKey,
  ) -> impl Future<Output = Result<Student>> + Send + 'a;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FillOptions {
  /// Replace names that are already set.
  pub overwrite_name: bool,
  /// Swallow missing-key, unauthorized and not-found errors.
  pub fail_silently:  bool,
}

/// What [`fill`] did to the person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
  /// Nothing was changed.
  Skipped,
  /// The person was updated. The caller must resolve `union` to a
  /// `StudentUnion` and save the person.
  Filled { union: Option<String> },
}

/// Look `person` up and merge the result into it.
pub async fn fill<L: StudentLookup>(
  lookup: &L,
  person: &mut Person,
  options: FillOptions,
  today: NaiveDate,
) -> Result<FillOutcome> {
  let Some(key) = StudentKey::for_person(person) else {
    return if options.fail_silently {
      Ok(FillOutcome::Skipped)
    } else {
      Err(Error::MissingIdentifier)
    };
  };

  let student = match lookup.get_student(&key).await {
    Ok(student) => student,
    Err(Error::LookupUnauthorized | Error::StudentNotFound) if options.fail_silently => {
      return Ok(FillOutcome::Skipped);
    }
    Err(e) => return Err(e),
  };

  merge(person, &student, options.overwrite_name, today)?;
  Ok(FillOutcome::Filled { union: student.union.clone().filter(|u| !u.is_empty()) })
}

/// Copy a student record onto a person. Names are only replaced when empty
/// or when `overwrite_name` is set; everything else is always overwritten.
pub fn merge(
  person: &mut Person,
  student: &Student,
  overwrite_name: bool,
  today: NaiveDate,
) -> Result<()> {
  let pid = Pid::parse(&student.personal_number, today)?;

  if person.first_name.is_empty() || overwrite_name {
    person.first_name = student.first_name.clone();
  }
  if person.last_name.is_empty() || overwrite_name {
    person.last_name = student.last_name.clone();
  }

  person.set_pid(pid);
  person.liu_id = Some(student.liu_id.clone());
  person.liu_id_blocked = Some(student.blocked);
  // Some people have no LiU card at all.
  person.liu_card_magnet = student.barcode_number.clone().unwrap_or_default();
  person.liu_card_rfid = student.rfid_number.clone().unwrap_or_default();
  Ok(())
}
