//! Database query modules.

pub mod files;
