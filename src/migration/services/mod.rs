//! Application services for migration orchestration.

mod engine;
mod orchestrator;
mod tracker;
mod workspace;

pub use engine::{CredentialSide, TransferEngine, TransferError, TransferPorts};
pub use orchestrator::{
    CreateMigrationRequest, MigrationService, MigrationServiceError, MigrationServiceResult,
    SubmittedMigration,
};
pub use tracker::{StatusTracker, TrackerError, TrackerResult};
pub use workspace::{DEFAULT_WORKSPACE_PREFIX, ScopedWorkspace, WorkspaceError, WorkspaceManager};
