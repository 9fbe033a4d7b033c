//! Repository migration orchestration.
//!
//! A migration copies one repository's full history from a source host
//! (organisation / project / repository) to a namespace on a target host.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
