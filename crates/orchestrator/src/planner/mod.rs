//! Plan Generator: inventory snapshot -> reasoning service -> structured plan

pub mod context;
pub mod hardware;
pub mod parser;
pub mod prompt;

pub use context::InventoryContext;
pub use hardware::default_hardware_spec;
pub use parser::{parse_plan_response, ParsedPlan, PlanSource};

use common::{OperationTimer, SuccessionError, SuccessionResult};
use domain::{InventoryRepository, MigrationPlan};
use llm::ReasoningService;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct PlanGenerator {
    inventory: Arc<dyn InventoryRepository>,
    reasoning: Arc<dyn ReasoningService>,
}

impl PlanGenerator {
    pub fn new(inventory: Arc<dyn InventoryRepository>, reasoning: Arc<dyn ReasoningService>) -> Self {
        Self {
            inventory,
            reasoning,
        }
    }

    /// Build a plan for the agent's most recent inventory.
    ///
    /// Fails with `NotFound` when the agent never reported, and with
    /// `Generation` when the reasoning service call fails. A response that
    /// cannot be parsed still yields a plan.
    #[instrument(skip(self))]
    pub async fn generate(&self, source_agent_id: &str) -> SuccessionResult<MigrationPlan> {
        let snapshot = self
            .inventory
            .latest_snapshot(source_agent_id)
            .await?
            .ok_or_else(|| {
                SuccessionError::not_found(format!(
                    "no inventory found for agent {source_agent_id}"
                ))
            })?;

        let context = InventoryContext::from_snapshot(&snapshot);
        let prompt = prompt::build_plan_prompt(&context);
        debug!(
            snapshot_id = %snapshot.id,
            prompt_chars = prompt.len(),
            "Submitting inventory to reasoning service"
        );

        let mut timer = OperationTimer::new("plan_generation");
        timer.add_field("agent_id", source_agent_id);
        let response = self
            .reasoning
            .complete(&prompt)
            .await
            .map_err(|e| SuccessionError::Generation(e.to_string()));
        timer.finish_with_result(&response);
        let response = response?;

        let parsed = parse_plan_response(&response, &snapshot);
        match parsed.source {
            PlanSource::Structured => info!(
                response_chars = response.len(),
                tasks = parsed.plan.tasks.len(),
                "Plan parsed from structured response"
            ),
            PlanSource::Unstructured => info!(
                response_chars = response.len(),
                tasks = parsed.plan.tasks.len(),
                "No JSON in response, tasks extracted from text"
            ),
            PlanSource::Degraded => warn!(
                response_chars = response.len(),
                tasks = parsed.plan.tasks.len(),
                "Malformed JSON in response, using default hardware spec"
            ),
        }

        Ok(parsed.plan)
    }
}
