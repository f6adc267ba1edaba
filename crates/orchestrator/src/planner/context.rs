//! Bounded inventory summary sent to the reasoning service

use domain::{DataLocation, InventorySnapshot};
use serde::Serialize;
use serde_json::{Map, Value};

/// Installed applications passed through, in reported order
pub const MAX_APPLICATIONS: usize = 50;
/// Application usage entries passed through, in reported order
pub const MAX_USAGE_ENTRIES: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryContext {
    pub system_info: Map<String, Value>,
    pub applications: ApplicationSummary,
    pub usage_patterns: UsagePatterns,
    pub data: DataSummary,
    /// Count only, certificate details stay out of the prompt
    pub certificates: usize,
    pub vpn_connections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationSummary {
    pub total: u32,
    pub list: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsagePatterns {
    pub application_usage: Vec<Value>,
    pub performance: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_size_mb: u64,
    pub locations: Vec<DataLocation>,
}

impl InventoryContext {
    pub fn from_snapshot(snapshot: &InventorySnapshot) -> Self {
        Self {
            system_info: snapshot.system_info.clone(),
            applications: ApplicationSummary {
                total: snapshot.total_applications,
                list: prefix(&snapshot.installed_applications, MAX_APPLICATIONS),
            },
            usage_patterns: UsagePatterns {
                application_usage: prefix(&snapshot.application_usage, MAX_USAGE_ENTRIES),
                performance: snapshot.system_performance.clone(),
            },
            data: DataSummary {
                total_size_mb: snapshot.total_data_size_mb,
                locations: snapshot.user_data_locations.clone(),
            },
            certificates: snapshot.certificates.len(),
            vpn_connections: snapshot.vpn_connections.len(),
        }
    }

    /// Indented JSON as embedded in the prompt
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn prefix(items: &[Value], limit: usize) -> Vec<Value> {
    items.iter().take(limit).cloned().collect()
}
