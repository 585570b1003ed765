//! Platform-specific directory conventions.

pub mod paths;
