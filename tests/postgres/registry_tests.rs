//! Migration record persistence in `PostgreSQL`.

use super::helpers::{BoxError, fresh_registry, new_migration};
use mirrorshift::migration::{
    domain::{MigrationId, MigrationRecord, MigrationStatus, PersistedMigrationData, Progress},
    ports::{MigrationRegistry, RegistryError},
};
use mockable::DefaultClock;

#[tokio::test(flavor = "multi_thread")]
async fn created_records_round_trip_with_credentials() -> Result<(), BoxError> {
    let Some(test) = fresh_registry()? else {
        return Ok(());
    };

    let created = test
        .registry
        .create(new_migration("contoso/platform/billing", "org:acme")?)
        .await?;
    let found = test
        .registry
        .find_by_id(created.id())
        .await?
        .ok_or("record not found")?;

    assert_eq!(found.id(), created.id());
    assert_eq!(found.status(), MigrationStatus::Pending);
    assert_eq!(found.source().to_string(), "contoso/platform/billing");
    assert_eq!(found.target().to_string(), "org:acme");
    assert_eq!(found.credentials(), created.credentials());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn updates_persist_status_progress_and_error() -> Result<(), BoxError> {
    let Some(test) = fresh_registry()? else {
        return Ok(());
    };
    let mut record = test
        .registry
        .create(new_migration("contoso/platform/billing", "user:octocat")?)
        .await?;

    record.transition_to(MigrationStatus::InProgress, &DefaultClock)?;
    record.advance_progress(Progress::new(70)?, &DefaultClock)?;
    record.fail("mirror push failed (exit code 128): denied", &DefaultClock)?;
    test.registry.update(&record).await?;

    let stored = test
        .registry
        .find_by_id(record.id())
        .await?
        .ok_or("record not found")?;
    assert_eq!(stored.status(), MigrationStatus::Failed);
    assert_eq!(stored.progress(), Progress::new(70)?);
    assert_eq!(
        stored.error(),
        Some("mirror push failed (exit code 128): denied")
    );
    assert!(stored.started_at().is_some());
    assert!(stored.completed_at().is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn list_orders_by_identifier() -> Result<(), BoxError> {
    let Some(test) = fresh_registry()? else {
        return Ok(());
    };
    for source in ["contoso/platform/a", "contoso/platform/b", "contoso/platform/c"] {
        test.registry
            .create(new_migration(source, "org:acme")?)
            .await?;
    }

    let listed = test.registry.list().await?;

    let sources: Vec<String> = listed
        .iter()
        .map(|record| record.source().to_string())
        .collect();
    assert_eq!(
        sources,
        [
            "contoso/platform/a",
            "contoso/platform/b",
            "contoso/platform/c"
        ]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn updating_an_unknown_record_is_not_found() -> Result<(), BoxError> {
    let Some(test) = fresh_registry()? else {
        return Ok(());
    };
    let record = test
        .registry
        .create(new_migration("contoso/platform/billing", "org:acme")?)
        .await?;
    let missing = MigrationRecord::from_persisted(PersistedMigrationData {
        id: MigrationId::new(record.id().value() + 1000),
        source: record.source().clone(),
        target: record.target().clone(),
        status: record.status(),
        progress: record.progress(),
        error: None,
        started_at: None,
        completed_at: None,
        created_at: record.created_at(),
        updated_at: record.updated_at(),
        credentials: record.credentials().clone(),
    });

    let result = test.registry.update(&missing).await;

    assert!(matches!(result, Err(RegistryError::NotFound(_))));
    assert!(test.registry.find_by_id(missing.id()).await?.is_none());
    Ok(())
}
