//! MigrationRepository - Domain abstraction for migration records

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::Migration;
use crate::errors::DomainResult;
use crate::value_objects::MigrationStatus;

/// Repository abstraction for migration records
///
/// `save` is an upsert of the whole record: saving an unchanged record
/// has no observable effect.
#[async_trait]
pub trait MigrationRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> DomainResult<Option<Migration>>;

    async fn save(&self, migration: &Migration) -> DomainResult<()>;

    /// Overwrite the stored record only while its stored status is still
    /// `expected`. Returns false, writing nothing, when the status moved on
    /// or the record does not exist. The check and the write are atomic
    /// across every handle on the same store.
    async fn save_if_status(
        &self,
        migration: &Migration,
        expected: MigrationStatus,
    ) -> DomainResult<bool>;

    /// Records ordered by creation time, optionally filtered by status
    async fn list(&self, status: Option<MigrationStatus>) -> DomainResult<Vec<Migration>>;
}
