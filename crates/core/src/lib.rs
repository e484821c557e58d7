//! Domain helpers shared by the data-access layer and its tooling.
//!
//! Nothing in this crate talks to the database; it only shapes values that
//! the `carbide-db` repositories turn into SQL.

pub mod error;
pub mod pagination;
pub mod search;
pub mod status;
pub mod types;
