//! Application layer orchestrating domain logic and infrastructure.

pub mod attributes;
pub mod batch;
pub mod builder;
pub mod columns;
pub mod command;
pub mod imports;
pub mod markup;
pub mod pass;
pub mod region;
pub mod scan;
pub mod slots;
pub mod template;
pub mod transform;
