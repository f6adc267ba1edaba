//! Migration orchestration
//!
//! - **PlanGenerator**: latest inventory -> reasoning service -> `MigrationPlan`,
//!   with a three-tier response parser that never fails
//! - **MigrationExecutor**: sequential task loop with per-task failure tracking,
//!   persisting every intermediate state
//! - **TaskRunner**: single-task port, `SimulatedTaskRunner` ships by default
//! - **ExecutionClaims**: one writer per migration, carries cancellation
//! - **MigrationService** / **InventoryService**: use cases over the record stores

pub mod claims;
pub mod executor;
pub mod inventory;
pub mod planner;
pub mod service;

pub use claims::{ClaimGuard, ExecutionClaims};
pub use executor::{MigrationExecutor, SimulatedTaskRunner, TaskRunner};
pub use inventory::InventoryService;
pub use planner::{InventoryContext, ParsedPlan, PlanGenerator, PlanSource};
pub use service::{MigrationService, OPERATOR_CANCELLED_MESSAGE, PLANNING_CANCELLED_MESSAGE};
