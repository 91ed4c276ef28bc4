//! Infrastructure adapters for IO, config, logging, signals, and bundled tables.

pub mod config;
pub mod fs;
pub mod interrupt;
pub mod logging;
pub mod tables;
