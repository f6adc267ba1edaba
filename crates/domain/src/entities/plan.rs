//! MigrationPlan and TaskDescriptor
//!
//! The plan is the document a reasoning service returns for one source machine.
//! Fields are deliberately loose (`serde_json::Value`) where the generator is
//! free to answer with prose or nested objects; the task list is typed because
//! the executor consumes it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::serde_helpers::{
    lenient_list, lenient_string, lenient_string_list, lenient_u32, null_as_default,
};

/// One atomic unit of migration work
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskDescriptor {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Position in the execution sequence (1-based by convention)
    #[serde(default, deserialize_with = "lenient_u32")]
    pub order: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub estimated_minutes: u32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub instructions: String,
    /// Advisory only, execution follows list order
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub dependencies: Vec<String>,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        let name = name.into();
        Self {
            instructions: name.clone(),
            name,
            order,
            estimated_minutes: 0,
            dependencies: Vec::new(),
        }
    }

    pub fn with_estimate(mut self, minutes: u32) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    /// Name shown while the task runs; blank names fall back to `Task <n>`
    pub fn display_name(&self, index: usize) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            format!("Task {}", index + 1)
        } else {
            trimmed.to_string()
        }
    }
}

/// Structured migration plan attached to a migration record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Narrative strategy, usually a string
    #[serde(default)]
    pub plan: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<TaskDescriptor>,
    #[serde(default)]
    pub hardware_spec: Value,
    #[serde(default)]
    pub recommendations: Value,
    #[serde(default, deserialize_with = "lenient_list")]
    pub manual_steps: Vec<Value>,
    /// Total duration estimate in minutes
    #[serde(default, deserialize_with = "lenient_u32")]
    pub estimated_minutes: u32,
    #[serde(default, deserialize_with = "lenient_list")]
    pub risks: Vec<Value>,
}

impl MigrationPlan {
    /// Plan narrative as display text
    pub fn narrative(&self) -> String {
        match &self.plan {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Sum of per-task estimates, independent of `estimated_minutes`
    pub fn task_minutes(&self) -> u32 {
        self.tasks
            .iter()
            .fold(0u32, |acc, task| acc.saturating_add(task.estimated_minutes))
    }
}
