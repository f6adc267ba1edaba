//! InventoryRepository - Domain abstraction for snapshot persistence

use async_trait::async_trait;

use crate::entities::InventorySnapshot;
use crate::errors::DomainResult;

/// Repository abstraction for inventory snapshots
///
/// Domain defines the interface, the store crate provides implementations
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Store a new snapshot
    async fn insert_snapshot(&self, snapshot: InventorySnapshot) -> DomainResult<()>;

    /// Overwrite an existing snapshot (metrics merge)
    async fn update_snapshot(&self, snapshot: InventorySnapshot) -> DomainResult<()>;

    /// Most recent snapshot for an agent by capture time
    async fn latest_snapshot(&self, agent_id: &str) -> DomainResult<Option<InventorySnapshot>>;
}
