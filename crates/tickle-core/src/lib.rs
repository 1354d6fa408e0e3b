//! Core types and trait definitions for Tickle, an event ticketing and
//! merchandise backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod discount;
pub mod error;
pub mod holding;
pub mod kobra;
pub mod limits;
pub mod mail;
pub mod orchestra;
pub mod person;
pub mod pid;
pub mod pricing;
pub mod store;

pub use error::{Error, Result};
