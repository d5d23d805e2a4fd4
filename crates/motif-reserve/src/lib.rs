//! # motif-reserve
//!
//! **Name Reserve**: a FIFO pool of pre-generated, pronounceable, unique
//! names (`"velo-marin"`, `"kaith-osu"`) handed out to newly discovered
//! registry entries.
//!
//! - [`NameReserve::refill`] tops the pool up from a seeded generator.
//! - [`NameReserve::take`] pops the oldest name; it never blocks and never
//!   fails, synthesising a fresh name when the pool is empty.
//! - [`NameReserve::status`] reports pool size, used history and the total
//!   ever generated.
//!
//! The pool is persisted as one pretty-printed JSON file. Writes are
//! whole-file rewrites without locking: one writer per file.

pub mod error;
pub mod generator;
pub mod model;
pub mod reserve;

pub use error::ReserveError;
pub use generator::{generate_name, is_well_formed, MAX_NAME_LEN, MIN_NAME_LEN};
pub use model::{NamePool, ReserveConfig, ReserveStatus};
pub use reserve::NameReserve;
