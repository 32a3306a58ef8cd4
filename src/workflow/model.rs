use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use crate::errors::FlowscopeError;

/// One agent action inside a workflow.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub action: String,
    #[serde(default)]
    pub action_label_alt: Option<String>,
    pub nominal_duration_ms: u64,
    #[serde(default)]
    pub detail_pool: Vec<String>,
}

impl WorkflowStep {
    pub fn new(id: &str, agent_id: &str, agent_name: &str, action: &str, nominal_duration_ms: u64) -> Self {
        Self {
            id: id.to_string(),
            agent_id: agent_id.to_string(),
            agent_name: agent_name.to_string(),
            action: action.to_string(),
            action_label_alt: None,
            nominal_duration_ms,
            detail_pool: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: &[&str]) -> Self {
        self.detail_pool = details.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_alt_label(mut self, label: &str) -> Self {
        self.action_label_alt = Some(label.to_string());
        self
    }

    /// Label shown while this step is the active one.
    pub fn action_label(&self) -> String {
        format!("{}: {}", self.agent_name, self.action)
    }
}

/// Static description of a task. Immutable for the lifetime of one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowModel {
    pub task_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_live_execution: bool,
    #[serde(default)]
    pub is_file_upload_gated: bool,
    /// Start the live run as soon as the upload succeeds.
    #[serde(default)]
    pub auto_start: bool,
    /// Scenario identifier sent to the backend's initialize call.
    #[serde(default)]
    pub scenario_id: Option<String>,
    #[serde(default)]
    pub special_task: Option<String>,
    steps: Vec<WorkflowStep>,
}

impl WorkflowModel {
    pub fn new(task_id: &str, steps: Vec<WorkflowStep>) -> Result<Self, FlowscopeError> {
        let model = Self {
            task_id: task_id.to_string(),
            title: task_id.to_string(),
            is_live_execution: false,
            is_file_upload_gated: false,
            auto_start: false,
            scenario_id: None,
            special_task: None,
            steps,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn live(mut self) -> Self {
        self.is_live_execution = true;
        self
    }

    pub fn file_gated(mut self, auto_start: bool) -> Self {
        self.is_file_upload_gated = true;
        self.auto_start = auto_start;
        self
    }

    pub fn with_scenario(mut self, scenario_id: &str) -> Self {
        self.scenario_id = Some(scenario_id.to_string());
        self
    }

    pub fn with_special_task(mut self, special_task: &str) -> Self {
        self.special_task = Some(special_task.to_string());
        self
    }

    /// Step ids must be unique. Nothing else is checked.
    pub fn validate(&self) -> Result<(), FlowscopeError> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(FlowscopeError::InvalidModel(format!(
                    "duplicate step id '{}' in task '{}'",
                    step.id, self.task_id
                )));
            }
        }
        Ok(())
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&WorkflowStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.id.as_str())
    }

    /// Sum of nominal durations. Display only; drivers scale their own timers.
    pub fn total_nominal_duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.nominal_duration_ms).sum()
    }

    pub fn scenario(&self) -> &str {
        self.scenario_id.as_deref().unwrap_or(&self.task_id)
    }
}
