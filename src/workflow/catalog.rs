use std::sync::LazyLock;
use crate::errors::FlowscopeError;
use super::model::{WorkflowModel, WorkflowStep};

/// Built-in demo tasks, created once.
static BUILTIN_TASKS: LazyLock<Vec<WorkflowModel>> = LazyLock::new(|| {
    let mut tasks = Vec::new();

    if let Ok(model) = WorkflowModel::new("contract-review", vec![
        WorkflowStep::new("intake", "coordinator", "Coordinator", "Splitting the contract into clauses", 1500)
            .with_details(&[
                "Detected 42 clauses across 9 sections",
                "Matched governing-law clause to template",
                "Queued indemnity section for legal agent",
            ]),
        WorkflowStep::new("legal", "legal", "Legal Analyst", "Checking liability and indemnity terms", 2500)
            .with_alt_label("Reviewing legal terms")
            .with_details(&[
                "Liability cap below company threshold",
                "Indemnity is mutual, no change needed",
                "Termination notice period is 15 days",
            ]),
        WorkflowStep::new("finance", "finance", "Finance Analyst", "Validating payment schedule", 2000)
            .with_details(&[
                "Net-60 payment terms flagged",
                "Late fee of 1.5% per month found",
            ]),
        WorkflowStep::new("risk", "risk", "Risk Scorer", "Scoring overall contract risk", 1500)
            .with_details(&[
                "Aggregated 3 medium findings",
                "Risk score computed as 6.2 / 10",
            ]),
        WorkflowStep::new("summary", "writer", "Report Writer", "Drafting the review summary", 1000)
            .with_details(&["Summary drafted with 4 recommendations"]),
    ]) {
        tasks.push(model.with_title("Contract review"));
    }

    if let Ok(model) = WorkflowModel::new("market-brief", vec![
        WorkflowStep::new("collect", "scout", "Market Scout", "Collecting competitor announcements", 2000)
            .with_details(&[
                "Found 12 press releases from the last quarter",
                "Two competitors changed pricing",
            ]),
        WorkflowStep::new("trends", "analyst", "Trend Analyst", "Clustering announcements into trends", 2000)
            .with_details(&["Identified 3 dominant themes"]),
        WorkflowStep::new("impact", "strategist", "Strategist", "Estimating impact on our roadmap", 1500),
        WorkflowStep::new("brief", "writer", "Report Writer", "Writing the one-page brief", 1000)
            .with_details(&["Brief ready for review"]),
    ]) {
        tasks.push(model.with_title("Market brief"));
    }

    if let Ok(model) = WorkflowModel::new("document-analysis", vec![
        WorkflowStep::new("parse", "parser", "Document Parser", "Extracting text from the upload", 1500),
        WorkflowStep::new("classify", "classifier", "Classifier", "Classifying document sections", 2000),
        WorkflowStep::new("extract", "extractor", "Entity Extractor", "Extracting parties and dates", 2000),
        WorkflowStep::new("report", "writer", "Report Writer", "Writing the analysis report", 1500),
    ]) {
        tasks.push(
            model
                .with_title("Document analysis")
                .live()
                .file_gated(true)
                .with_scenario("document-analysis")
                .with_special_task("document-analysis"),
        );
    }

    if let Ok(model) = WorkflowModel::new("live-research", vec![
        WorkflowStep::new("plan", "planner", "Planner", "Planning the research questions", 1000),
        WorkflowStep::new("search", "researcher", "Researcher", "Searching sources", 3000),
        WorkflowStep::new("synthesize", "writer", "Report Writer", "Synthesizing findings", 2000),
    ]) {
        tasks.push(model.with_title("Live research").live().with_scenario("research"));
    }

    tasks
});

/// Lookup table of selectable tasks.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    tasks: Vec<WorkflowModel>,
}

impl TaskCatalog {
    pub fn builtin() -> Self {
        Self { tasks: BUILTIN_TASKS.clone() }
    }

    pub fn empty() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Add tasks, replacing built-ins that share a task id.
    pub fn extend(&mut self, tasks: Vec<WorkflowModel>) -> Result<(), FlowscopeError> {
        for task in tasks {
            task.validate()?;
            match self.tasks.iter_mut().find(|t| t.task_id == task.task_id) {
                Some(existing) => *existing = task,
                None => self.tasks.push(task),
            }
        }
        Ok(())
    }

    pub fn get(&self, task_id: &str) -> Option<&WorkflowModel> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn require(&self, task_id: &str) -> Result<WorkflowModel, FlowscopeError> {
        self.get(task_id)
            .cloned()
            .ok_or_else(|| FlowscopeError::UnknownTask(task_id.to_string()))
    }

    pub fn tasks(&self) -> &[WorkflowModel] {
        &self.tasks
    }
}

impl Default for TaskCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
