use console::{style, StyledObject};
use domain::{InventorySnapshot, Migration, MigrationPlan, MigrationStatus};

pub fn status_label(status: MigrationStatus) -> StyledObject<&'static str> {
    let label = style(status.as_str());
    match status {
        MigrationStatus::Planning => label.cyan(),
        MigrationStatus::Ready => label.blue().bold(),
        MigrationStatus::InProgress => label.yellow(),
        MigrationStatus::Completed => label.green().bold(),
        MigrationStatus::Failed => label.red().bold(),
        MigrationStatus::Cancelled => label.dim(),
    }
}

/// One line per migration for `migration list`
pub fn migration_row(migration: &Migration) -> String {
    format!(
        "{}  {:<12} {:>5.1}%  {}  ({})",
        migration.id,
        status_label(migration.status),
        migration.progress_percent,
        migration.name,
        migration.source_agent_id
    )
}

pub fn print_migration(migration: &Migration) {
    println!("{} {}", style("▶").cyan(), style(&migration.name).bold());
    println!("  id:       {}", migration.id);
    println!("  status:   {}", status_label(migration.status));
    println!("  source:   {}", migration.source_agent_id);
    if let Some(target) = &migration.target_agent_id {
        println!("  target:   {}", target);
    }
    println!("  progress: {:.1}%", migration.progress_percent);
    if let Some(task) = &migration.current_task {
        println!("  current:  {}", task);
    }
    println!("  created:  {}", migration.created_at.to_rfc3339());
    if let Some(started) = migration.started_at {
        println!("  started:  {}", started.to_rfc3339());
    }
    if let Some(completed) = migration.completed_at {
        println!("  finished: {}", completed.to_rfc3339());
    }
    if let Some(message) = &migration.success_message {
        println!("  {} {}", style("✓").green(), message);
    }
    if let Some(message) = &migration.error_message {
        println!("  {} {}", style("✗").red(), message);
    }
    if !migration.failed_tasks.is_empty() {
        println!("  {}", style("failed tasks:").red());
        for failed in &migration.failed_tasks {
            println!("    - {}: {}", failed.task.name, failed.error);
        }
    }
    if let Some(plan) = &migration.plan {
        print_plan(plan);
    }
}

/// Task count and duration; per-task estimates shown when they disagree with the total
pub fn plan_summary(plan: &MigrationPlan) -> String {
    let summary = format!("{} tasks, ~{} min", plan.task_count(), plan.estimated_minutes);
    match plan.task_minutes() {
        0 => summary,
        minutes if minutes == plan.estimated_minutes => summary,
        minutes => format!("{summary} ({minutes} min across tasks)"),
    }
}

pub fn print_plan(plan: &MigrationPlan) {
    println!();
    println!("{} {}", style("Plan:").bold(), plan_summary(plan));
    let narrative = plan.narrative();
    if !narrative.trim().is_empty() {
        for line in narrative.lines().take(12) {
            println!("  {}", style(line).dim());
        }
    }
    for (index, task) in plan.tasks.iter().enumerate() {
        println!(
            "  {:>2}. {} {}",
            task.order,
            task.display_name(index),
            style(format!("({} min)", task.estimated_minutes)).dim()
        );
    }
}

pub fn print_snapshot(snapshot: &InventorySnapshot) {
    println!(
        "{} {}",
        style("Inventory").bold(),
        style(&snapshot.agent_id).cyan()
    );
    println!("  snapshot:     {}", snapshot.id);
    println!("  captured:     {}", snapshot.captured_at.to_rfc3339());
    println!("  applications: {}", snapshot.total_applications);
    println!("  data:         {} MB", snapshot.total_data_size_mb);
    println!("  certificates: {}", snapshot.certificates.len());
    println!("  vpn:          {}", snapshot.vpn_connections.len());
    match snapshot.memory_gb() {
        Some(gb) => println!("  memory:       {:.0} GB", gb),
        None => println!("  memory:       {}", style("unknown").dim()),
    }
    if !snapshot.application_usage.is_empty() {
        println!("  usage rows:   {}", snapshot.application_usage.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{NewMigration, TaskDescriptor};

    #[test]
    fn test_migration_row_contains_identity() {
        console::set_colors_enabled(false);
        let migration = Migration::new(NewMigration {
            name: "Reception PC".to_string(),
            source_agent_id: "agent-3".to_string(),
            target_agent_id: None,
        });

        let row = migration_row(&migration);
        assert!(row.starts_with(&migration.id.to_string()));
        assert!(row.contains("planning"));
        assert!(row.contains("0.0%"));
        assert!(row.ends_with("Reception PC  (agent-3)"));
    }

    #[test]
    fn test_plan_summary_mentions_task_estimates_when_they_differ() {
        let mut plan = MigrationPlan {
            tasks: vec![
                TaskDescriptor::new("Install Office", 1).with_estimate(20),
                TaskDescriptor::new("Copy Documents", 2).with_estimate(15),
            ],
            estimated_minutes: 35,
            ..Default::default()
        };
        assert_eq!(plan_summary(&plan), "2 tasks, ~35 min");

        plan.estimated_minutes = 60;
        assert_eq!(plan_summary(&plan), "2 tasks, ~60 min (35 min across tasks)");

        assert_eq!(plan_summary(&MigrationPlan::default()), "0 tasks, ~0 min");
    }
}
