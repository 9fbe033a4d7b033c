//! Then steps for migration lifecycle BDD scenarios.

use super::world::MigrationWorld;
use mirrorshift::migration::{
    domain::{MigrationRecord, MigrationStatus},
    services::MigrationServiceError,
};
use rstest_bdd_macros::then;

fn last_record(world: &MigrationWorld) -> Result<&MigrationRecord, eyre::Report> {
    world
        .last_record
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing migration in scenario world"))
}

#[then(r#"the migration status is "{status}""#)]
fn migration_status_is(world: &MigrationWorld, status: String) -> Result<(), eyre::Report> {
    let expected = MigrationStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let record = last_record(world)?;

    if record.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {} (error: {:?})",
            record.status(),
            record.error()
        ));
    }
    Ok(())
}

#[then("the migration progress is {progress:u8}")]
fn migration_progress_is(world: &MigrationWorld, progress: u8) -> Result<(), eyre::Report> {
    let record = last_record(world)?;
    eyre::ensure!(
        record.progress().value() == progress,
        "expected progress {progress}, found {}",
        record.progress()
    );
    Ok(())
}

#[then(r#"the migration error mentions "{fragment}""#)]
fn migration_error_mentions(world: &MigrationWorld, fragment: String) -> Result<(), eyre::Report> {
    let error = last_record(world)?
        .error()
        .ok_or_else(|| eyre::eyre!("migration has no error"))?;
    eyre::ensure!(error.contains(&fragment), "error {error:?} lacks {fragment:?}");
    Ok(())
}

#[then(r#"the target repository "{full_name}" exists"#)]
fn target_repository_exists(world: &MigrationWorld, full_name: String) -> Result<(), eyre::Report> {
    let (owner, name) = full_name
        .split_once('/')
        .ok_or_else(|| eyre::eyre!("expected owner/name, got {full_name}"))?;
    eyre::ensure!(
        world.target.contains(owner, name)?,
        "target repository {full_name} is missing"
    );
    Ok(())
}

#[then("the submission is rejected as invalid")]
fn submission_rejected(world: &MigrationWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_submission
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing submission result"))?;
    if !matches!(result, Err(MigrationServiceError::Domain(_))) {
        return Err(eyre::eyre!("expected a validation error, got {result:?}"));
    }
    Ok(())
}

#[then("the cancellation is rejected")]
fn cancellation_rejected(world: &MigrationWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_cancellation
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing cancellation result"))?;
    if !matches!(result, Err(MigrationServiceError::Domain(_))) {
        return Err(eyre::eyre!("expected a rejected cancellation, got {result:?}"));
    }
    Ok(())
}
