use chrono::{Duration, Utc};
use domain::{
    InventoryRepository, InventorySnapshot, MetricsReport, Migration, MigrationPlan,
    MigrationRepository, MigrationStatus, NewMigration, TaskDescriptor,
};
use serde_json::json;
use store::SqliteStore;
use tempfile::TempDir;

fn open_store() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("succession.db"), 4).unwrap();
    (dir, store)
}

fn migration(name: &str) -> Migration {
    Migration::new(NewMigration {
        name: name.to_string(),
        source_agent_id: "agent-src".to_string(),
        target_agent_id: Some("agent-dst".to_string()),
    })
}

#[tokio::test]
async fn test_latest_snapshot_wins() {
    let (_dir, store) = open_store();
    let now = Utc::now();

    let mut older = InventorySnapshot::new("agent-1").with_captured_at(now - Duration::days(2));
    older.total_applications = 3;
    let mut newer = InventorySnapshot::new("agent-1").with_captured_at(now);
    newer.total_applications = 7;
    let other_agent = InventorySnapshot::new("agent-2").with_captured_at(now + Duration::days(1));

    // insertion order must not matter
    store.insert_snapshot(newer.clone()).await.unwrap();
    store.insert_snapshot(older).await.unwrap();
    store.insert_snapshot(other_agent).await.unwrap();

    let latest = store.latest_snapshot("agent-1").await.unwrap().unwrap();
    assert_eq!(latest, newer);
    assert!(store.latest_snapshot("agent-9").await.unwrap().is_none());
}

#[tokio::test]
async fn test_equal_capture_times_prefer_last_insert() {
    let (_dir, store) = open_store();
    let now = Utc::now();
    let first = InventorySnapshot::new("agent-1").with_captured_at(now);
    let second = InventorySnapshot::new("agent-1").with_captured_at(now);

    store.insert_snapshot(first).await.unwrap();
    store.insert_snapshot(second.clone()).await.unwrap();

    let latest = store.latest_snapshot("agent-1").await.unwrap().unwrap();
    assert_eq!(latest.id, second.id);
}

#[tokio::test]
async fn test_update_snapshot_persists_metrics() {
    let (_dir, store) = open_store();
    let mut snapshot = InventorySnapshot::new("agent-1");
    store.insert_snapshot(snapshot.clone()).await.unwrap();

    snapshot.apply_metrics(MetricsReport {
        application_usage: vec![json!({"name": "Outlook", "minutes": 240})],
        file_access: vec![],
        system_performance: json!({"cpu_avg": 31.0}),
    });
    store.update_snapshot(snapshot.clone()).await.unwrap();

    let stored = store.latest_snapshot("agent-1").await.unwrap().unwrap();
    assert_eq!(stored.application_usage, snapshot.application_usage);
    assert_eq!(stored.system_performance["cpu_avg"], 31.0);
}

#[tokio::test]
async fn test_migration_roundtrip_and_idempotent_save() {
    let (_dir, store) = open_store();
    let mut record = migration("Reception PC");
    record
        .attach_plan(MigrationPlan {
            plan: json!("Swap the reception PC over lunch"),
            tasks: vec![
                TaskDescriptor::new("Install Chrome", 1).with_estimate(10),
                TaskDescriptor::new("Copy Desktop", 2).with_estimate(20),
            ],
            estimated_minutes: 30,
            ..Default::default()
        })
        .unwrap();

    store.save(&record).await.unwrap();
    let first = store.get(record.id).await.unwrap().unwrap();
    store.save(&record).await.unwrap();
    let second = store.get(record.id).await.unwrap().unwrap();

    assert_eq!(first, record);
    assert_eq!(first, second);
    assert_eq!(store.list(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_save_overwrites_progress() {
    let (_dir, store) = open_store();
    let mut record = migration("Lab 3");
    record
        .attach_plan(MigrationPlan {
            tasks: vec![TaskDescriptor::new("Backup", 1)],
            ..Default::default()
        })
        .unwrap();
    record.begin_execution(Utc::now()).unwrap();
    store.save(&record).await.unwrap();

    let task = record.tasks()[0].clone();
    record.record_task_started(task.display_name(0), 0.0);
    record.record_task_failed(task, "share unreachable");
    record.finish_execution(Utc::now()).unwrap();
    store.save(&record).await.unwrap();

    let stored = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, MigrationStatus::Failed);
    assert_eq!(stored.failed_tasks.len(), 1);
    assert_eq!(stored.failed_tasks[0].error, "share unreachable");
    assert_eq!(stored.error_message.as_deref(), Some("1 tasks failed"));
    assert_eq!(stored.progress_percent, 100.0);
}

#[tokio::test]
async fn test_list_filters_by_status_in_creation_order() {
    let (_dir, store) = open_store();
    let mut a = migration("a");
    a.created_at = Utc::now() - Duration::minutes(5);
    let b = migration("b");
    let mut c = migration("c");
    c.created_at = Utc::now() - Duration::minutes(10);
    c.fail("no inventory found for agent agent-src", Utc::now())
        .unwrap();

    for record in [&b, &a, &c] {
        store.save(record).await.unwrap();
    }

    let all: Vec<String> = store
        .list(None)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(all, vec!["c", "a", "b"]);

    let planning = store.list(Some(MigrationStatus::Planning)).await.unwrap();
    assert_eq!(planning.len(), 2);
    assert!(planning.iter().all(|m| m.status == MigrationStatus::Planning));
}

#[tokio::test]
async fn test_store_reopens_existing_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("succession.db");
    let record = migration("persisted");

    {
        let store = SqliteStore::open(&path, 2).unwrap();
        store.save(&record).await.unwrap();
    }

    let reopened = SqliteStore::open(&path, 2).unwrap();
    assert_eq!(reopened.get(record.id).await.unwrap(), Some(record));
}

#[tokio::test]
async fn test_conditional_save_is_shared_between_handles() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("succession.db");
    let first = SqliteStore::open(&path, 2).unwrap();
    let second = SqliteStore::open(&path, 2).unwrap();

    let mut record = migration("shared");
    assert!(!first
        .save_if_status(&record, MigrationStatus::Planning)
        .await
        .unwrap());
    first.save(&record).await.unwrap();

    let mut cancelled = record.clone();
    cancelled.cancel("operator", Utc::now()).unwrap();
    assert!(second
        .save_if_status(&cancelled, MigrationStatus::Planning)
        .await
        .unwrap());

    // the other handle still believes the record is planning
    record.fail("late writer", Utc::now()).unwrap();
    assert!(!first
        .save_if_status(&record, MigrationStatus::Planning)
        .await
        .unwrap());

    let stored = first.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, MigrationStatus::Cancelled);
    assert_eq!(stored.error_message.as_deref(), Some("operator"));
}
