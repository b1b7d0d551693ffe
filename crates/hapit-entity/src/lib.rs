//! # hapit-entity
//!
//! Domain entities shared across the Hapit crates.

pub mod user;

pub use user::{PublicUser, User};
