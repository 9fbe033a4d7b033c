//! Adapter implementations of the migration ports.
//!
//! - [`memory`]: in-process registry, hosts and mirror tool
//! - [`postgres`]: durable registry on `PostgreSQL`
//! - [`azure_devops`] and [`github`]: REST clients for the source and target
//!   hosts
//! - [`git`]: mirror transfers through the `git` executable
//! - [`credentials`]: sealed-box credential unwrapping

pub mod azure_devops;
pub mod credentials;
pub mod git;
pub mod github;
pub mod memory;
pub mod postgres;
