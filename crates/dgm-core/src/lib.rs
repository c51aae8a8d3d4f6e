//! Core domain model for dgm-bot.
//!
//! This crate defines the concert catalog model (Show, Member, Instrument,
//! Track), the SQLite schema, and the [`schema::Database`] catalog store
//! that owns those entities and their relationships.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
