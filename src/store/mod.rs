//! Storage is organized through [record_store::JsonFileStore].
//! The basic idea is:
//!  - One JSON file holds the whole collection of attendance rows.
//!  - A row covers one user for one calendar day and is keyed by the pair.
//!  - Every mutation is a locked load-modify-persist cycle, and writes land through an
//!    atomic rename so the file never appears half-written.

pub mod entities;
pub mod record_store;
