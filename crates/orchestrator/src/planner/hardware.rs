//! Deterministic hardware recommendation used when the generated plan is unusable

use domain::InventorySnapshot;
use serde_json::{json, Value};

pub const DEFAULT_CURRENT_RAM_GB: f64 = 8.0;
pub const MIN_RAM_GB: u64 = 16;
pub const MIN_STORAGE_GB: u64 = 512;

const CPU_RECOMMENDATION: &str = "Modern multi-core processor (Intel i5/i7 or AMD Ryzen 5/7)";
const GPU_RECOMMENDATION: &str = "Integrated graphics sufficient";

/// RAM: 50% over the current machine, never below 16 GB.
/// Storage: twice the user data, never below 512 GB.
pub fn default_hardware_spec(snapshot: &InventorySnapshot) -> Value {
    let current_ram_gb = snapshot.memory_gb().unwrap_or(DEFAULT_CURRENT_RAM_GB);
    let ram_gb = MIN_RAM_GB.max((current_ram_gb * 1.5).floor() as u64);

    let data_gb = snapshot.total_data_size_mb as f64 / 1024.0;
    let storage_gb = MIN_STORAGE_GB.max((data_gb * 2.0).ceil() as u64);

    json!({
        "cpu": {
            "recommendation": CPU_RECOMMENDATION,
            "justification": "Based on application requirements"
        },
        "ram": {
            "recommendation_gb": ram_gb,
            "justification": format!("Current system has {current_ram_gb:.0}GB, recommended 50% increase")
        },
        "storage": {
            "recommendation_gb": storage_gb,
            "type": "NVMe SSD",
            "justification": "Fast storage for better performance"
        },
        "gpu": {
            "recommendation": GPU_RECOMMENDATION,
            "justification": "No intensive graphics applications detected"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_without_system_info() {
        let spec = default_hardware_spec(&InventorySnapshot::new("agent-1"));
        assert_eq!(spec["ram"]["recommendation_gb"], 16);
        assert_eq!(spec["storage"]["recommendation_gb"], 512);
        assert_eq!(spec["storage"]["type"], "NVMe SSD");
        assert_eq!(spec["cpu"]["recommendation"], CPU_RECOMMENDATION);
        assert_eq!(spec["gpu"]["recommendation"], GPU_RECOMMENDATION);
        assert_eq!(
            spec["ram"]["justification"],
            "Current system has 8GB, recommended 50% increase"
        );
    }

    #[rstest]
    #[case(8192, 16)]
    #[case(16384, 24)]
    #[case(32768, 48)]
    #[case(12000, 17)]
    fn test_ram_scales_with_current_memory(#[case] memory_mb: u64, #[case] expected_gb: u64) {
        let mut snapshot = InventorySnapshot::new("agent-1");
        snapshot
            .system_info
            .insert("total_memory_mb".to_string(), memory_mb.into());
        let spec = default_hardware_spec(&snapshot);
        assert_eq!(spec["ram"]["recommendation_gb"], expected_gb);
    }

    #[rstest]
    #[case(0, 512)]
    #[case(200 * 1024, 512)]
    #[case(300 * 1024, 600)]
    #[case(300 * 1024 + 1, 601)]
    fn test_storage_doubles_user_data(#[case] data_mb: u64, #[case] expected_gb: u64) {
        let mut snapshot = InventorySnapshot::new("agent-1");
        snapshot.total_data_size_mb = data_mb;
        let spec = default_hardware_spec(&snapshot);
        assert_eq!(spec["storage"]["recommendation_gb"], expected_gb);
    }
}
