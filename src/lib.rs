//! Mirrorshift: repository migration orchestration.
//!
//! This crate moves complete repositories from Azure DevOps to GitHub by
//! mirror-cloning every ref into a scratch workspace and mirror-pushing it
//! to a freshly ensured target repository. Each migration is tracked as a
//! persistent record whose status and progress are visible while the
//! transfer runs in the background.
//!
//! # Architecture
//!
//! Mirrorshift follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, APIs, git)
//!
//! # Modules
//!
//! - [`migration`]: Migration records, transfer engine and host adapters
//! - [`config`]: Layered runtime settings
//! - [`telemetry`]: Log subscriber installation

pub mod config;
pub mod migration;
pub mod telemetry;
