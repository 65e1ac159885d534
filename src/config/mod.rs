//! Configuration loader and schema types.
//!
//! Settings come from an optional TOML file and `TRACK_DASHBOARD__*`
//! environment variables, on top of struct defaults.

mod load;
mod schema;

pub use schema::*;
