use async_trait::async_trait;
use domain::{
    DomainError, DomainResult, InventoryRepository, InventorySnapshot, Migration,
    MigrationRepository, MigrationStatus,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store for tests and dry runs
#[derive(Default)]
pub struct InMemoryStore {
    // per agent, in insertion order
    snapshots: RwLock<HashMap<String, Vec<InventorySnapshot>>>,
    // insertion order doubles as the tie-break for equal created_at
    migrations: RwLock<Vec<Migration>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn migration_count(&self) -> usize {
        self.migrations.read().await.len()
    }
}

#[async_trait]
impl InventoryRepository for InMemoryStore {
    async fn insert_snapshot(&self, snapshot: InventorySnapshot) -> DomainResult<()> {
        self.snapshots
            .write()
            .await
            .entry(snapshot.agent_id.clone())
            .or_default()
            .push(snapshot);
        Ok(())
    }

    async fn update_snapshot(&self, snapshot: InventorySnapshot) -> DomainResult<()> {
        let mut snapshots = self.snapshots.write().await;
        let existing = snapshots
            .get_mut(&snapshot.agent_id)
            .and_then(|list| list.iter_mut().find(|s| s.id == snapshot.id))
            .ok_or_else(|| DomainError::NotFound(format!("inventory snapshot {}", snapshot.id)))?;
        *existing = snapshot;
        Ok(())
    }

    async fn latest_snapshot(&self, agent_id: &str) -> DomainResult<Option<InventorySnapshot>> {
        let snapshots = self.snapshots.read().await;
        let latest = snapshots.get(agent_id).and_then(|list| {
            list.iter().fold(None::<&InventorySnapshot>, |best, candidate| match best {
                Some(current) if current.captured_at > candidate.captured_at => Some(current),
                _ => Some(candidate),
            })
        });
        Ok(latest.cloned())
    }
}

#[async_trait]
impl MigrationRepository for InMemoryStore {
    async fn get(&self, id: Uuid) -> DomainResult<Option<Migration>> {
        let migrations = self.migrations.read().await;
        Ok(migrations.iter().find(|m| m.id == id).cloned())
    }

    async fn save(&self, migration: &Migration) -> DomainResult<()> {
        let mut migrations = self.migrations.write().await;
        match migrations.iter_mut().find(|m| m.id == migration.id) {
            Some(existing) => *existing = migration.clone(),
            None => migrations.push(migration.clone()),
        }
        Ok(())
    }

    async fn save_if_status(
        &self,
        migration: &Migration,
        expected: MigrationStatus,
    ) -> DomainResult<bool> {
        let mut migrations = self.migrations.write().await;
        match migrations
            .iter_mut()
            .find(|m| m.id == migration.id && m.status == expected)
        {
            Some(existing) => {
                *existing = migration.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, status: Option<MigrationStatus>) -> DomainResult<Vec<Migration>> {
        let migrations = self.migrations.read().await;
        let mut selected: Vec<Migration> = migrations
            .iter()
            .filter(|m| status.map_or(true, |s| m.status == s))
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal timestamps
        selected.sort_by_key(|m| m.created_at);
        Ok(selected)
    }
}
