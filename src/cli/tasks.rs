use console::style;
use crate::cli::commands::TasksArgs;
use crate::cli::context::load_config;
use crate::config::parser::build_catalog;
use crate::errors::FlowscopeError;
use crate::utils::formatting::format_duration;

pub async fn handle_tasks(args: TasksArgs) -> Result<(), FlowscopeError> {
    let config = load_config(args.config.as_deref()).await?;
    let catalog = build_catalog(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(catalog.tasks())?);
        return Ok(());
    }

    for task in catalog.tasks() {
        let mode = match (task.is_live_execution, task.is_file_upload_gated) {
            (false, _) => "simulated",
            (true, false) => "live",
            (true, true) => "live, upload",
        };
        println!(
            "{}  {} ({}, {} steps, ~{})",
            style(&task.task_id).bold(),
            task.title,
            mode,
            task.len(),
            format_duration(task.total_nominal_duration_ms()),
        );
        for step in task.steps() {
            println!("    {} {}", style("·").dim(), step.action_label());
        }
    }
    Ok(())
}
