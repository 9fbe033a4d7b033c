//! Step definitions for migration lifecycle scenarios.

pub mod then;
pub mod world;
