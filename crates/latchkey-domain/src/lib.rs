//! Domain types shared across Latchkey crates.
//!
//! Pure value types (ids, email addresses) with no framework dependencies,
//! usable from every layer of a service.

pub mod email;
pub mod id;
