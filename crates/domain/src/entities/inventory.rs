//! Inventory snapshots reported by endpoint agents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::serde_helpers::{lenient_f64, lenient_string, null_as_default};

/// One user data folder discovered on the source machine
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataLocation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub size_mb: f64,
    /// Agent-specific attributes (file counts, category, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload an agent submits for a full discovery pass
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InventoryReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub system_info: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub installed_applications: Vec<Value>,
    #[serde(default)]
    pub registry_settings: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub certificates: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vpn_connections: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_data_locations: Vec<DataLocation>,
}

/// Usage metrics an agent submits between discovery passes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub application_usage: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_access: Vec<Value>,
    #[serde(default)]
    pub system_performance: Value,
}

/// Point-in-time capture of a machine's software and data state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub id: Uuid,
    pub agent_id: String,
    pub captured_at: DateTime<Utc>,

    #[serde(default)]
    pub system_info: Map<String, Value>,
    #[serde(default)]
    pub installed_applications: Vec<Value>,
    #[serde(default)]
    pub registry_settings: Value,
    #[serde(default)]
    pub certificates: Vec<Value>,
    #[serde(default)]
    pub vpn_connections: Vec<Value>,
    #[serde(default)]
    pub user_data_locations: Vec<DataLocation>,

    // Usage metrics, replaced by the latest metrics report
    #[serde(default)]
    pub application_usage: Vec<Value>,
    #[serde(default)]
    pub file_access: Vec<Value>,
    #[serde(default)]
    pub system_performance: Value,

    #[serde(default)]
    pub total_applications: u32,
    #[serde(default)]
    pub total_data_size_mb: u64,
}

impl InventorySnapshot {
    /// Empty snapshot captured now
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            captured_at: Utc::now(),
            system_info: Map::new(),
            installed_applications: Vec::new(),
            registry_settings: Value::Null,
            certificates: Vec::new(),
            vpn_connections: Vec::new(),
            user_data_locations: Vec::new(),
            application_usage: Vec::new(),
            file_access: Vec::new(),
            system_performance: Value::Null,
            total_applications: 0,
            total_data_size_mb: 0,
        }
    }

    /// Build a snapshot from a discovery report, deriving the totals
    pub fn from_report(agent_id: impl Into<String>, report: InventoryReport) -> Self {
        let mut snapshot = Self::new(agent_id);
        snapshot.total_applications = report.installed_applications.len() as u32;
        snapshot.total_data_size_mb = report
            .user_data_locations
            .iter()
            .map(|location| location.size_mb.max(0.0))
            .sum::<f64>()
            .round() as u64;
        snapshot.system_info = report.system_info;
        snapshot.installed_applications = report.installed_applications;
        snapshot.registry_settings = report.registry_settings;
        snapshot.certificates = report.certificates;
        snapshot.vpn_connections = report.vpn_connections;
        snapshot.user_data_locations = report.user_data_locations;
        snapshot
    }

    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }

    /// Replace usage metrics with the latest report
    pub fn apply_metrics(&mut self, metrics: MetricsReport) {
        self.application_usage = metrics.application_usage;
        self.file_access = metrics.file_access;
        self.system_performance = metrics.system_performance;
    }

    /// Installed RAM in GB read from `system_info`, if the agent reported it
    pub fn memory_gb(&self) -> Option<f64> {
        if let Some(mb) = self.system_info.get("total_memory_mb").and_then(number) {
            return Some(mb / 1024.0);
        }
        self.system_info.get("total_memory_gb").and_then(number)
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite() && *v > 0.0)
}
