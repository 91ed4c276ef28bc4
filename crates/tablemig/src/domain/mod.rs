//! Domain types shared across the migration passes.

pub mod errors;
pub mod model;
