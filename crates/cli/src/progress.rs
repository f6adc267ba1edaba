use console::style;
use domain::{Migration, MigrationStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";

/// Progress bar that follows a running migration record
pub struct MigrationProgress {
    bar: ProgressBar,
}

impl MigrationProgress {
    pub fn new(migration: &Migration) -> Self {
        Self::with_bar(ProgressBar::new(100), migration)
    }

    /// Bar that draws nowhere, for tests and non-interactive output
    pub fn hidden(migration: &Migration) -> Self {
        Self::with_bar(ProgressBar::hidden(), migration)
    }

    fn with_bar(bar: ProgressBar, migration: &Migration) -> Self {
        bar.set_length(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        let progress = Self { bar };
        progress.update(migration);
        progress
    }

    pub fn update(&self, migration: &Migration) {
        self.bar.set_position(position(migration));
        self.bar.set_message(current_label(migration));
    }

    pub fn finish(&self, migration: &Migration) {
        self.bar.set_position(position(migration));
        let message = match migration.status {
            MigrationStatus::Completed => style("completed").green().to_string(),
            MigrationStatus::Cancelled => style("cancelled").yellow().to_string(),
            other => style(other.as_str()).red().to_string(),
        };
        self.bar.finish_with_message(message);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }
}

/// Bar position for a record, clamped to 0..=100
pub fn position(migration: &Migration) -> u64 {
    migration.progress_percent.clamp(0.0, 100.0).round() as u64
}

fn current_label(migration: &Migration) -> String {
    let total = migration.tasks().len();
    let done = migration.completed_tasks.len() + migration.failed_tasks.len();
    match &migration.current_task {
        Some(task) => format!("({done}/{total}) {task}"),
        None => format!("({done}/{total}) {}", migration.status),
    }
}

/// Spinner for waits of unknown length
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{MigrationPlan, NewMigration, TaskDescriptor};

    fn running(tasks: usize) -> Migration {
        let mut migration = Migration::new(NewMigration {
            name: "Finance laptop refresh".to_string(),
            source_agent_id: "agent-7".to_string(),
            target_agent_id: None,
        });
        migration
            .attach_plan(MigrationPlan {
                tasks: (1..=tasks)
                    .map(|i| TaskDescriptor::new(format!("Step {i}"), i as u32))
                    .collect(),
                ..MigrationPlan::default()
            })
            .unwrap();
        migration.begin_execution(chrono::Utc::now()).unwrap();
        migration
    }

    #[test]
    fn test_position_is_clamped_and_rounded() {
        let mut migration = running(3);
        migration.progress_percent = 33.4;
        assert_eq!(position(&migration), 33);
        migration.progress_percent = 66.6;
        assert_eq!(position(&migration), 67);
        migration.progress_percent = 140.0;
        assert_eq!(position(&migration), 100);
    }

    #[test]
    fn test_bar_follows_record() {
        let mut migration = running(4);
        let progress = MigrationProgress::hidden(&migration);
        assert_eq!(progress.position(), 0);

        migration.record_task_started("Copy user profile".to_string(), 25.0);
        progress.update(&migration);
        assert_eq!(progress.position(), 25);
        assert_eq!(progress.message(), "(0/4) Copy user profile");

        let task = migration.tasks()[0].clone();
        migration.record_task_completed(task);
        migration.finish_execution(chrono::Utc::now()).unwrap();
        progress.finish(&migration);
        assert_eq!(progress.position(), 100);
    }
}
