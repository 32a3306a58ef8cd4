use std::collections::HashSet;
use std::path::Path;
use crate::errors::FlowscopeError;
use crate::workflow::TaskCatalog;
use super::types::FlowscopeConfig;
use tracing::warn;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<FlowscopeConfig, FlowscopeError> {
    if !path.exists() {
        return Err(FlowscopeError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(FlowscopeError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<FlowscopeConfig, FlowscopeError> {
    // An empty file is a valid, all-defaults config.
    if content.trim().is_empty() {
        return Ok(FlowscopeConfig::default());
    }
    let config: FlowscopeConfig = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Semantic checks the typed parse cannot express.
fn validate_config(config: &FlowscopeConfig) -> Result<(), FlowscopeError> {
    if let Some(sim) = &config.simulation {
        if sim.scale_factor == Some(0) {
            return Err(FlowscopeError::Config("simulation.scale_factor must be greater than 0".into()));
        }
        if sim.detail_interval_ms == Some(0) {
            return Err(FlowscopeError::Config("simulation.detail_interval_ms must be greater than 0".into()));
        }
        if let Some(p) = sim.detail_probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(FlowscopeError::Config(format!(
                    "simulation.detail_probability must be within [0, 1], got {}",
                    p
                )));
            }
        }
    }

    if let Some(backend) = &config.backend {
        if let Some(template) = &backend.stream_url_template {
            if !template.contains("{session_id}") {
                return Err(FlowscopeError::Config(
                    "backend.stream_url_template must contain {session_id}".into(),
                ));
            }
        }
        if backend.request_timeout_secs == Some(0) {
            return Err(FlowscopeError::Config("backend.request_timeout_secs must be greater than 0".into()));
        }
    }

    if config.logs.as_ref().and_then(|l| l.capacity) == Some(0) {
        return Err(FlowscopeError::Config("logs.capacity must be at least 1".into()));
    }

    if let Some(tasks) = &config.tasks {
        let mut seen = HashSet::new();
        for task in tasks {
            if !seen.insert(task.task_id.as_str()) {
                return Err(FlowscopeError::Config(format!("Duplicate task id '{}'", task.task_id)));
            }
            if task.is_empty() {
                return Err(FlowscopeError::Config(format!("Task '{}' has no steps", task.task_id)));
            }
            task.validate()
                .map_err(|e| FlowscopeError::Config(e.to_string()))?;
            if task.is_file_upload_gated && !task.is_live_execution {
                warn!(task_id = %task.task_id, "File-gated task is not live; the upload gate has no effect");
            }
        }
    }

    Ok(())
}

/// Built-in tasks plus any the config adds or replaces.
pub fn build_catalog(config: &FlowscopeConfig) -> Result<TaskCatalog, FlowscopeError> {
    let mut catalog = TaskCatalog::builtin();
    if let Some(tasks) = &config.tasks {
        catalog.extend(tasks.clone())?;
    }
    Ok(catalog)
}
