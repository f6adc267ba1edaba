use common::{SuccessionError, SuccessionResult};
use domain::{InventoryReport, InventoryRepository, InventorySnapshot, MetricsReport};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Agent-facing inventory operations
pub struct InventoryService {
    inventory: Arc<dyn InventoryRepository>,
}

impl InventoryService {
    pub fn new(inventory: Arc<dyn InventoryRepository>) -> Self {
        Self { inventory }
    }

    /// Store a discovery report as a new snapshot
    #[instrument(skip(self, report))]
    pub async fn ingest(
        &self,
        agent_id: &str,
        report: InventoryReport,
    ) -> SuccessionResult<InventorySnapshot> {
        if agent_id.trim().is_empty() {
            return Err(SuccessionError::invalid_operation("agent id is required"));
        }

        let snapshot = InventorySnapshot::from_report(agent_id, report);
        self.inventory.insert_snapshot(snapshot.clone()).await?;
        info!(
            snapshot_id = %snapshot.id,
            applications = snapshot.total_applications,
            data_mb = snapshot.total_data_size_mb,
            "Inventory ingested"
        );
        Ok(snapshot)
    }

    /// Merge usage metrics into the agent's latest snapshot.
    /// `None` when the agent has not reported an inventory yet.
    #[instrument(skip(self, metrics))]
    pub async fn record_metrics(
        &self,
        agent_id: &str,
        metrics: MetricsReport,
    ) -> SuccessionResult<Option<InventorySnapshot>> {
        let Some(mut snapshot) = self.inventory.latest_snapshot(agent_id).await? else {
            warn!("Metrics received before any inventory, ignoring");
            return Ok(None);
        };

        snapshot.apply_metrics(metrics);
        self.inventory.update_snapshot(snapshot.clone()).await?;
        info!(snapshot_id = %snapshot.id, "Metrics recorded");
        Ok(Some(snapshot))
    }

    pub async fn latest(&self, agent_id: &str) -> SuccessionResult<InventorySnapshot> {
        self.inventory
            .latest_snapshot(agent_id)
            .await?
            .ok_or_else(|| {
                SuccessionError::not_found(format!("no inventory found for agent {agent_id}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use store::InMemoryStore;

    fn service() -> InventoryService {
        InventoryService::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_ingest_then_latest() {
        let service = service();
        let report: InventoryReport = serde_json::from_value(json!({
            "system_info": {"hostname": "FIN-07", "total_memory_mb": 16384},
            "installed_applications": [{"name": "SAP GUI"}, {"name": "Excel"}],
            "user_data_locations": [{"path": "D:/Finance", "size_mb": 5120}]
        }))
        .unwrap();

        let stored = service.ingest("agent-fin", report).await.unwrap();
        let latest = service.latest("agent-fin").await.unwrap();
        assert_eq!(latest, stored);
        assert_eq!(latest.total_applications, 2);
        assert_eq!(latest.total_data_size_mb, 5120);
    }

    #[tokio::test]
    async fn test_blank_agent_is_rejected() {
        let err = service()
            .ingest("  ", InventoryReport::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SuccessionError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_metrics_update_latest_snapshot() {
        let service = service();
        assert!(service
            .record_metrics("agent-1", MetricsReport::default())
            .await
            .unwrap()
            .is_none());

        service
            .ingest("agent-1", InventoryReport::default())
            .await
            .unwrap();
        let updated = service
            .record_metrics(
                "agent-1",
                MetricsReport {
                    application_usage: vec![json!({"name": "Teams", "minutes": 180})],
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.application_usage.len(), 1);
        let latest = service.latest("agent-1").await.unwrap();
        assert_eq!(latest.application_usage, updated.application_usage);
    }

    #[tokio::test]
    async fn test_latest_without_inventory_is_not_found() {
        let err = service().latest("nobody").await.unwrap_err();
        assert_eq!(err.to_string(), "no inventory found for agent nobody");
    }
}
