//! Swedish national identity numbers (personnummer / samordningsnummer).
//!
//! A person stores the parts separately: birth date, the last four digits and
//! a coordination flag. The printed form is `YYMMDD-NNNC`, where a
//! coordination number adds 60 to the day.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Day offset that marks a coordination number.
pub const COORDINATION_OFFSET: u32 = 60;

/// Placeholder used when the four trailing digits are unknown.
const UNKNOWN_CODE: &str = "0000";

/// The decomposed parts of a national identity number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pid {
  pub birth_date:   NaiveDate,
  /// The last four digits, if known.
  pub code:         Option<String>,
  pub coordination: bool,
}

impl Pid {
  /// Build a number from a birth date and a three-digit serial, computing the
  /// Luhn check digit.
  pub fn with_serial(birth_date: NaiveDate, serial: u16, coordination: bool) -> Self {
    let head = format!(
      "{}{:03}",
      date_digits(birth_date, coordination),
      serial % 1000
    );
    let check = luhn_check_digit(&digits_of(&head));
    Self {
      birth_date,
      code: Some(format!("{:03}{check}", serial % 1000)),
      coordination,
    }
  }

  /// Render as `YYMMDD-NNNC`, using `0000` when the code is unknown.
  pub fn format(&self) -> String {
    format!(
      "{}-{}",
      date_digits(self.birth_date, self.coordination),
      self.code.as_deref().unwrap_or(UNKNOWN_CODE)
    )
  }

  /// Parse any of the accepted spellings. `today` decides the century of
  /// two-digit years: the latest one that does not put the birth date in the
  /// future, minus another hundred years for the `+` separator.
  pub fn parse(input: &str, today: NaiveDate) -> Result<Self> {
    let invalid = || Error::InvalidPid(input.to_owned());
    let trimmed = input.trim();

    let (compact, centenarian) = strip_separator(trimmed).ok_or_else(invalid)?;
    if !compact.chars().all(|c| c.is_ascii_digit()) {
      return Err(invalid());
    }

    let (explicit_year, ten) = match compact.len() {
      12 => (Some(number(&compact[0..4]) as i32), &compact[2..]),
      10 => (None, compact.as_str()),
      _ => return Err(invalid()),
    };

    if luhn_check_digit(&digits_of(&ten[..9])) != digits_of(&ten[9..])[0] {
      return Err(invalid());
    }

    let yy = number(&ten[0..2]) as i32;
    let month = number(&ten[2..4]);
    let mut day = number(&ten[4..6]);
    let coordination = day > COORDINATION_OFFSET;
    if coordination {
      day -= COORDINATION_OFFSET;
    }

    let birth_date = match explicit_year {
      Some(year) => NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?,
      None => {
        let mut year = today.year() - today.year().rem_euclid(100) + yy;
        if year > today.year() {
          year -= 100;
        }
        let mut date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
        if date > today {
          date = NaiveDate::from_ymd_opt(year - 100, month, day).ok_or_else(invalid)?;
        }
        if centenarian {
          date = NaiveDate::from_ymd_opt(date.year() - 100, month, day)
            .ok_or_else(invalid)?;
        }
        date
      }
    };

    Ok(Self {
      birth_date,
      code: Some(ten[6..].to_owned()),
      coordination,
    })
  }
}

/// Remove the one separator a spelling may carry: `-` or `+` after the date
/// of the ten-digit form, `-` after the date of the twelve-digit form. The
/// flag is set for `+`.
fn strip_separator(s: &str) -> Option<(String, bool)> {
  let Some(at) = s.find(['-', '+']) else {
    return Some((s.to_owned(), false));
  };
  let plus = s[at..].starts_with('+');
  match (s.len(), at) {
    (11, 6) => Some((format!("{}{}", &s[..at], &s[at + 1..]), plus)),
    (13, 8) if !plus => Some((format!("{}{}", &s[..at], &s[at + 1..]), false)),
    _ => None,
  }
}

/// Luhn check digit over a digit sequence, weighting from the left with 2, 1,
/// 2, ...
pub fn luhn_check_digit(digits: &[u8]) -> u8 {
  let sum: u32 = digits
    .iter()
    .enumerate()
    .map(|(i, d)| {
      let p = u32::from(*d) * if i % 2 == 0 { 2 } else { 1 };
      p / 10 + p % 10
    })
    .sum();
  ((10 - sum % 10) % 10) as u8
}

fn date_digits(date: NaiveDate, coordination: bool) -> String {
  let day = date.day() + if coordination { COORDINATION_OFFSET } else { 0 };
  format!(
    "{:02}{:02}{:02}",
    date.year().rem_euclid(100),
    date.month(),
    day
  )
}

fn digits_of(s: &str) -> Vec<u8> {
  s.bytes().map(|b| b - b'0').collect()
}

fn number(s: &str) -> u32 {
  s.bytes().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}
