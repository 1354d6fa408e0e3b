//! Transactional email rendering. Transport is somebody else's job.

use serde::{Deserialize, Serialize};

use crate::{catalog::Product, holding::Holding, person::Person};

/// Sender identity and links used in outgoing mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
  /// e.g. `Biljett SOF <biljett@example.com>`
  pub from:         String,
  /// Host used to build links, without scheme.
  pub primary_host: String,
}

/// A rendered message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
  pub to:      Vec<String>,
  pub from:    String,
  pub subject: String,
  pub body:    String,
  pub tags:    Vec<String>,
}

/// The ticket mail for one holding.
pub fn ticket_email(
  person: &Person,
  holding: &Holding,
  product: &Product,
  settings: &MailSettings,
) -> Email {
  let name = product.public_name();
  let quantity = if holding.quantity > 1 {
    format!("{} × ", holding.quantity)
  } else {
    String::new()
  };

  let body = format!(
    "Hi {first},\n\
     \n\
     Here is your ticket: {quantity}{name}.\n\
     \n\
     Ticket code: {code}\n\
     Show this code at the entrance. You can see all your tickets at \
     https://{host}/purchases.\n",
    first = person.first_name,
    code = holding.holding_id.simple(),
    host = settings.primary_host,
  );

  Email {
    to: vec![person.pretty_email()],
    from: settings.from.clone(),
    subject: format!("Your ticket: {name}"),
    body,
    tags: vec!["tickle".into(), "ticket".into()],
  }
}
