//! Reasoning-service response parsing
//!
//! Three tiers, each a pure function:
//! 1. structured: the `{...}` span deserializes into a [`MigrationPlan`]
//! 2. unstructured: no span at all, tasks come from the line heuristic
//! 3. degraded: a span exists but is not a plan; heuristic tasks plus the
//!    deterministic hardware spec and a fixed duration
//!
//! Parsing never fails.

use domain::{InventorySnapshot, MigrationPlan, TaskDescriptor};
use serde_json::{json, Value};
use std::fmt;

use super::hardware::default_hardware_spec;

pub const HEURISTIC_TASK_MINUTES: u32 = 30;
pub const DEGRADED_PLAN_MINUTES: u32 = 240;

/// Which parser tier produced a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Structured,
    Unstructured,
    Degraded,
}

impl fmt::Display for PlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanSource::Structured => "structured",
            PlanSource::Unstructured => "unstructured",
            PlanSource::Degraded => "degraded",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPlan {
    pub plan: MigrationPlan,
    pub source: PlanSource,
}

/// Text from the first `{` to the last `}` inclusive
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

pub fn parse_structured(span: &str) -> Option<MigrationPlan> {
    serde_json::from_str::<MigrationPlan>(span).ok()
}

/// One task per line carrying a list marker or the words "step"/"task"
pub fn extract_tasks_from_text(text: &str) -> Vec<TaskDescriptor> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && is_task_line(line))
        .enumerate()
        .map(|(i, line)| {
            TaskDescriptor::new(line, i as u32 + 1).with_estimate(HEURISTIC_TASK_MINUTES)
        })
        .collect()
}

fn is_task_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("step") || lower.contains("task") || has_list_marker(line)
}

/// `<digits>.` or `<digits>)` not glued to a preceding word
fn has_list_marker(line: &str) -> bool {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let at_boundary = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        if bytes[i].is_ascii_digit() && at_boundary {
            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j < bytes.len() && (bytes[j] == b'.' || bytes[j] == b')') {
                return true;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    false
}

pub fn unstructured_plan(text: &str) -> MigrationPlan {
    MigrationPlan {
        plan: Value::String(text.to_string()),
        tasks: extract_tasks_from_text(text),
        hardware_spec: json!({}),
        recommendations: json!({}),
        manual_steps: Vec::new(),
        estimated_minutes: 0,
        risks: Vec::new(),
    }
}

pub fn degraded_plan(text: &str, snapshot: &InventorySnapshot) -> MigrationPlan {
    MigrationPlan {
        plan: Value::String(text.to_string()),
        tasks: extract_tasks_from_text(text),
        hardware_spec: default_hardware_spec(snapshot),
        recommendations: json!({}),
        manual_steps: Vec::new(),
        estimated_minutes: DEGRADED_PLAN_MINUTES,
        risks: Vec::new(),
    }
}

pub fn parse_plan_response(text: &str, snapshot: &InventorySnapshot) -> ParsedPlan {
    match extract_json_span(text) {
        None => ParsedPlan {
            plan: unstructured_plan(text),
            source: PlanSource::Unstructured,
        },
        Some(span) => match parse_structured(span) {
            Some(plan) => ParsedPlan {
                plan,
                source: PlanSource::Structured,
            },
            None => ParsedPlan {
                plan: degraded_plan(text, snapshot),
                source: PlanSource::Degraded,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_extraction() {
        assert_eq!(extract_json_span("Here: {\"a\": 1} done"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_span("{a} and {b}"), Some("{a} and {b}"));
        assert_eq!(extract_json_span("no braces"), None);
        assert_eq!(extract_json_span("} backwards {"), None);
        assert_eq!(extract_json_span("only {"), None);
    }

    #[test]
    fn test_structured_response_is_used_verbatim() {
        let document = json!({
            "plan": "Two-phase cutover",
            "tasks": [
                {"name": "Install Office", "order": 1, "estimated_minutes": 45,
                 "instructions": "Deploy the C2R build", "dependencies": []},
                {"name": "Restore profile", "order": 2, "estimated_minutes": 60,
                 "instructions": "Copy user folders", "dependencies": ["Install Office"]}
            ],
            "hardware_spec": {"ram": {"recommendation_gb": 32}},
            "recommendations": ["Enable BitLocker"],
            "manual_steps": ["Re-activate Adobe licence"],
            "estimated_minutes": 105,
            "risks": [{"risk": "VPN certificate", "mitigation": "Export beforehand"}]
        });
        let response = format!("Sure, here is the plan:\n```json\n{document}\n```");

        let parsed = parse_plan_response(&response, &InventorySnapshot::new("agent-1"));
        assert_eq!(parsed.source, PlanSource::Structured);
        assert_eq!(serde_json::to_value(&parsed.plan).unwrap(), document);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let parsed = parse_plan_response(
            "{\"plan\": \"short\"}",
            &InventorySnapshot::new("agent-1"),
        );
        assert_eq!(parsed.source, PlanSource::Structured);
        assert!(parsed.plan.tasks.is_empty());
        assert_eq!(parsed.plan.estimated_minutes, 0);
    }

    #[test]
    fn test_unstructured_response_uses_line_heuristic() {
        let text = "Migration outline\n\n1. Back up documents\nStep two: install apps\nthen relax\n  Final TASK: verify  ";
        let parsed = parse_plan_response(text, &InventorySnapshot::new("agent-1"));

        assert_eq!(parsed.source, PlanSource::Unstructured);
        assert_eq!(parsed.plan.plan, Value::String(text.to_string()));
        let names: Vec<&str> = parsed.plan.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["1. Back up documents", "Step two: install apps", "Final TASK: verify"]
        );
        for (i, task) in parsed.plan.tasks.iter().enumerate() {
            assert_eq!(task.order, i as u32 + 1);
            assert_eq!(task.estimated_minutes, HEURISTIC_TASK_MINUTES);
            assert_eq!(task.instructions, task.name);
            assert!(task.dependencies.is_empty());
        }
        assert_eq!(parsed.plan.estimated_minutes, 0);
        assert_eq!(parsed.plan.hardware_spec, json!({}));
    }

    #[test]
    fn test_malformed_span_degrades_to_defaults() {
        let text = "Plan {\n1. Install VPN client,\n'tasks': [oops\n}";
        let snapshot = InventorySnapshot::new("agent-1");
        let parsed = parse_plan_response(text, &snapshot);

        assert_eq!(parsed.source, PlanSource::Degraded);
        assert_eq!(parsed.plan.estimated_minutes, DEGRADED_PLAN_MINUTES);
        assert_eq!(parsed.plan.hardware_spec, default_hardware_spec(&snapshot));
        assert_eq!(parsed.plan.tasks.len(), 2);
        assert_eq!(parsed.plan.tasks[0].name, "1. Install VPN client,");
        assert_eq!(parsed.plan.tasks[1].name, "'tasks': [oops");
    }

    #[test]
    fn test_valid_json_of_wrong_shape_degrades() {
        let parsed = parse_plan_response(
            "{\"tasks\": \"install everything\"}",
            &InventorySnapshot::new("agent-1"),
        );
        assert_eq!(parsed.source, PlanSource::Degraded);
    }

    #[test]
    fn test_list_markers() {
        assert!(has_list_marker("1. Install"));
        assert!(has_list_marker("  12) Reboot"));
        assert!(has_list_marker("(3) Verify"));
        assert!(!has_list_marker("Install Office 365"));
        assert!(!has_list_marker("Python3.11 runtime"));
        assert!(!has_list_marker("version 2"));
    }
}
