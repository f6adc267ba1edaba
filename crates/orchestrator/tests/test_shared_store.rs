//! Two services over one SQLite file, the way separate `succession`
//! processes share a database

use anyhow::Result;
use async_trait::async_trait;
use common::SuccessionError;
use domain::{
    InventoryRepository, InventorySnapshot, Migration, MigrationRepository, MigrationStatus,
    NewMigration, TaskDescriptor,
};
use llm::ReasoningService;
use orchestrator::{MigrationService, SimulatedTaskRunner, TaskRunner, OPERATOR_CANCELLED_MESSAGE};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use store::SqliteStore;
use tempfile::TempDir;
use tokio::sync::Notify;

fn plan_reply(task_names: &[&str]) -> String {
    let tasks: Vec<_> = task_names
        .iter()
        .enumerate()
        .map(|(i, name)| json!({"name": name, "order": i + 1, "estimated_minutes": 10}))
        .collect();
    json!({
        "plan": "Swap the reception PC",
        "tasks": tasks,
        "hardware_spec": {},
        "estimated_minutes": 10 * task_names.len()
    })
    .to_string()
}

/// Answers once the gate opens
struct GatedReasoning {
    gate: Arc<Notify>,
    asked: Arc<AtomicBool>,
    reply: String,
}

#[async_trait]
impl ReasoningService for GatedReasoning {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.asked.store(true, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(self.reply.clone())
    }
}

/// Blocks every task until released
struct GatedRunner {
    gate: Arc<Notify>,
}

#[async_trait]
impl TaskRunner for GatedRunner {
    async fn run(&self, _task: &TaskDescriptor, _migration: &Migration) -> Result<()> {
        self.gate.notified().await;
        Ok(())
    }
}

fn open(path: &Path) -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open(path, 2).unwrap())
}

fn service(
    store: &Arc<SqliteStore>,
    reasoning: Arc<dyn ReasoningService>,
    runner: Arc<dyn TaskRunner>,
) -> Arc<MigrationService> {
    Arc::new(MigrationService::new(store.clone(), store.clone(), reasoning, runner))
}

fn open_gate(reply: String) -> (Arc<Notify>, Arc<AtomicBool>, Arc<dyn ReasoningService>) {
    let gate = Arc::new(Notify::new());
    let asked = Arc::new(AtomicBool::new(false));
    let reasoning = Arc::new(GatedReasoning {
        gate: gate.clone(),
        asked: asked.clone(),
        reply,
    });
    (gate, asked, reasoning)
}

async fn seeded_store(dir: &TempDir) -> Arc<SqliteStore> {
    let store = open(&dir.path().join("succession.db"));
    let mut snapshot = InventorySnapshot::new("agent-src");
    snapshot
        .system_info
        .insert("total_memory_mb".to_string(), json!(8192));
    store.insert_snapshot(snapshot).await.unwrap();
    store
}

fn request() -> NewMigration {
    NewMigration {
        name: "Reception PC".to_string(),
        source_agent_id: "agent-src".to_string(),
        target_agent_id: None,
    }
}

async fn ready(service: &MigrationService, gate: &Notify) -> Result<Migration> {
    let created = service.create(request()).await?;
    gate.notify_one();
    let planned = service.plan(created.id).await?;
    assert_eq!(planned.status, MigrationStatus::Ready);
    Ok(planned)
}

async fn wait_for_current_task(store: &SqliteStore, migration: &Migration, task: &str) {
    for _ in 0..400 {
        let current = store
            .get(migration.id)
            .await
            .unwrap()
            .and_then(|m| m.current_task);
        if current.as_deref() == Some(task) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {task} never started");
}

#[tokio::test]
async fn test_cancel_from_other_handle_stays_terminal() -> Result<()> {
    let dir = TempDir::new()?;
    let store_a = seeded_store(&dir).await;
    let store_b = open(&dir.path().join("succession.db"));

    let (plan_gate, _, reasoning) = open_gate(plan_reply(&["first", "second", "third"]));
    let task_gate = Arc::new(Notify::new());
    let runner_a = service(
        &store_a,
        reasoning,
        Arc::new(GatedRunner {
            gate: task_gate.clone(),
        }),
    );
    let (_, _, idle) = open_gate(String::new());
    let operator_b = service(&store_b, idle, Arc::new(SimulatedTaskRunner::new(Duration::ZERO)));

    let migration = ready(&runner_a, &plan_gate).await?;
    let handle = runner_a.start(migration.id).await?;
    wait_for_current_task(&store_b, &migration, "first").await;

    // this handle holds no claim, so it writes CANCELLED itself
    let cancelled = operator_b.cancel(migration.id).await?;
    assert_eq!(cancelled.status, MigrationStatus::Cancelled);

    task_gate.notify_one();
    let finished = handle.await??;
    assert_eq!(finished.status, MigrationStatus::Cancelled);
    assert_eq!(
        finished.error_message.as_deref(),
        Some(OPERATOR_CANCELLED_MESSAGE)
    );

    let stored = store_a.get(migration.id).await?.unwrap();
    assert_eq!(stored.status, MigrationStatus::Cancelled);
    assert!(stored.success_message.is_none());
    assert!(stored.completed_tasks.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_only_one_handle_can_start() -> Result<()> {
    let dir = TempDir::new()?;
    let store_a = seeded_store(&dir).await;
    let store_b = open(&dir.path().join("succession.db"));

    let (plan_gate, _, reasoning) = open_gate(plan_reply(&["only"]));
    let instant: Arc<dyn TaskRunner> = Arc::new(SimulatedTaskRunner::new(Duration::ZERO));
    let first = service(&store_a, reasoning, instant.clone());
    let (_, _, idle) = open_gate(String::new());
    let second = service(&store_b, idle, instant);

    let migration = ready(&first, &plan_gate).await?;
    let (a, b) = tokio::join!(first.start(migration.id), second.start(migration.id));

    let (winner, loser) = match (a, b) {
        (Ok(handle), Err(err)) | (Err(err), Ok(handle)) => (handle, err),
        (Ok(_), Ok(_)) => panic!("both handles started the migration"),
        (Err(a), Err(b)) => panic!("neither handle started: {a} / {b}"),
    };
    assert!(matches!(loser, SuccessionError::InvalidOperation(_)));

    let done = winner.await??;
    assert_eq!(done.status, MigrationStatus::Completed);
    assert_eq!(done.completed_tasks.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_planning_outcome_dropped_after_cancel_elsewhere() -> Result<()> {
    let dir = TempDir::new()?;
    let store_a = seeded_store(&dir).await;
    let store_b = open(&dir.path().join("succession.db"));

    let (plan_gate, asked, reasoning) = open_gate(plan_reply(&["a", "b"]));
    let instant: Arc<dyn TaskRunner> = Arc::new(SimulatedTaskRunner::new(Duration::ZERO));
    let planner = service(&store_a, reasoning, instant.clone());
    let (_, _, idle) = open_gate(String::new());
    let operator = service(&store_b, idle, instant);

    let created = planner.create(request()).await?;
    let handle = planner.spawn_planning(created.id);
    // wait until the plan request is in flight
    for _ in 0..400 {
        if asked.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let cancelled = operator.cancel(created.id).await?;
    assert_eq!(cancelled.status, MigrationStatus::Cancelled);

    plan_gate.notify_one();
    let planned = handle.await??;
    assert_eq!(planned.status, MigrationStatus::Cancelled);
    assert!(planned.plan.is_none());
    assert_eq!(
        store_b.get(created.id).await?.unwrap().status,
        MigrationStatus::Cancelled
    );
    Ok(())
}
