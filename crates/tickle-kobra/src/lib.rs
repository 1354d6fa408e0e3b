//! Client for the Kobra student identity service.
//!
//! [`KobraClient`] implements [`tickle_core::kobra::StudentLookup`], so the
//! lookup-key priority and the merge policy stay in `tickle-core`.

mod client;

pub mod error;

pub use client::{KobraClient, KobraConfig};
pub use error::{Error, Result};
