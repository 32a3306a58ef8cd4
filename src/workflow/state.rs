use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};
use super::log_buffer::LogBuffer;
use super::model::WorkflowModel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStatus {
    /// No task was selected. Recoverable by selecting one.
    NothingToExecute,
    /// File-gated task waiting for its upload or an explicit start.
    AwaitingStart,
    Running,
    Completed,
}

/// Mutable state of one execution attempt.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    pub session_id: String,
    pub status: ExecutionStatus,
    pub current_step_index: usize,
    pub completed_step_ids: BTreeSet<String>,
    pub logs: LogBuffer,
    pub current_action_label: String,
    pub connection_status: ConnectionStatus,
    /// Set while a live start is in flight or running; rolled back on failure.
    pub execution_started: bool,
    pub upload_complete: bool,
    step_order: Vec<String>,
}

impl ExecutionState {
    pub fn new(session_id: &str, model: &WorkflowModel, log_capacity: usize) -> Self {
        Self {
            session_id: session_id.to_string(),
            status: ExecutionStatus::AwaitingStart,
            current_step_index: 0,
            completed_step_ids: BTreeSet::new(),
            logs: LogBuffer::with_capacity(log_capacity),
            current_action_label: String::new(),
            connection_status: ConnectionStatus::Disconnected,
            execution_started: false,
            upload_complete: false,
            step_order: model.step_ids().map(str::to_string).collect(),
        }
    }

    pub fn nothing_to_execute(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            status: ExecutionStatus::NothingToExecute,
            current_step_index: 0,
            completed_step_ids: BTreeSet::new(),
            logs: LogBuffer::new(),
            current_action_label: String::new(),
            connection_status: ConnectionStatus::Disconnected,
            execution_started: false,
            upload_complete: false,
            step_order: Vec::new(),
        }
    }

    pub fn total_steps(&self) -> usize {
        self.step_order.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.prepend(line);
    }

    /// Make `index` the active step. The index never moves backwards.
    pub fn enter_step(&mut self, index: usize, label: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = ExecutionStatus::Running;
        self.current_step_index = self.current_step_index.max(index);
        self.current_action_label = label;
        true
    }

    /// Claim the live start. Returns the connection status at that moment,
    /// or `None` if a start is already in flight or the run is over.
    pub fn mark_started(&mut self) -> Option<ConnectionStatus> {
        if self.execution_started || self.is_terminal() {
            return None;
        }
        self.execution_started = true;
        self.status = ExecutionStatus::Running;
        Some(self.connection_status)
    }

    /// Undo `mark_started` after a failed control-plane request. A run that
    /// already recorded progress stays `Running`.
    pub fn release_start(&mut self) {
        self.execution_started = false;
        if !self.is_terminal() && self.completed_step_ids.is_empty() {
            self.status = ExecutionStatus::AwaitingStart;
        }
    }

    /// Progress arrived from outside; the run is under way.
    pub fn mark_running(&mut self) {
        if !self.is_terminal() {
            self.status = ExecutionStatus::Running;
        }
    }

    pub fn set_label(&mut self, label: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.current_action_label = label;
        true
    }

    /// Record a step as completed. Returns false for unknown or repeated ids.
    pub fn complete_step(&mut self, step_id: &str) -> bool {
        if self.is_terminal() || !self.step_order.iter().any(|id| id == step_id) {
            return false;
        }
        let inserted = self.completed_step_ids.insert(step_id.to_string());
        if self.completed_step_ids.len() == self.step_order.len() {
            self.status = ExecutionStatus::Completed;
        }
        inserted
    }

    /// Mark every step completed and enter the terminal state.
    pub fn complete_all(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.completed_step_ids = self.step_order.iter().cloned().collect();
        self.current_step_index = self.current_step_index.max(self.step_order.len());
        self.status = ExecutionStatus::Completed;
        true
    }

    pub fn advance_past(&mut self, index: usize) {
        self.current_step_index = self.current_step_index.max(index + 1);
    }

    pub fn is_completed(&self, step_id: &str) -> bool {
        self.completed_step_ids.contains(step_id)
    }

    pub fn step_order(&self) -> &[String] {
        &self.step_order
    }

    pub fn view(&self) -> ExecutionView {
        let completed_step_ids = self
            .step_order
            .iter()
            .filter(|id| self.completed_step_ids.contains(*id))
            .cloned()
            .collect();
        ExecutionView {
            session_id: self.session_id.clone(),
            status: self.status,
            current_step_index: self.current_step_index,
            completed_step_ids,
            completed_count: self.completed_step_ids.len(),
            total_steps: self.step_order.len(),
            logs: self.logs.entries(),
            current_action_label: self.current_action_label.clone(),
            connection_status: self.connection_status,
            execution_started: self.execution_started,
        }
    }
}

/// Read-only snapshot handed to presentation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionView {
    pub session_id: String,
    pub status: ExecutionStatus,
    pub current_step_index: usize,
    /// In step order.
    pub completed_step_ids: Vec<String>,
    pub completed_count: usize,
    pub total_steps: usize,
    pub logs: Vec<String>,
    pub current_action_label: String,
    pub connection_status: ConnectionStatus,
    pub execution_started: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::WorkflowStep;

    fn model() -> WorkflowModel {
        WorkflowModel::new("t", vec![
            WorkflowStep::new("s1", "a1", "A", "one", 10),
            WorkflowStep::new("s2", "a2", "B", "two", 10),
        ]).unwrap()
    }

    #[test]
    fn test_complete_step_rejects_unknown_id() {
        let mut state = ExecutionState::new("session_1", &model(), 26);
        assert!(!state.complete_step("elsewhere"));
        assert!(state.completed_step_ids.is_empty());
    }

    #[test]
    fn test_completing_all_steps_is_terminal() {
        let mut state = ExecutionState::new("session_1", &model(), 26);
        assert!(state.complete_step("s2"));
        assert!(!state.is_terminal());
        assert!(state.complete_step("s1"));
        assert!(state.is_terminal());
        assert!(!state.enter_step(1, "late".into()));
        assert!(!state.complete_step("s1"));
    }

    #[test]
    fn test_step_index_never_decreases() {
        let mut state = ExecutionState::new("session_1", &model(), 26);
        state.enter_step(1, "b".into());
        state.enter_step(0, "a".into());
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.current_action_label, "a");
    }

    #[test]
    fn test_complete_all_is_idempotent() {
        let mut state = ExecutionState::new("session_1", &model(), 26);
        assert!(state.complete_all());
        let first = state.view();
        assert!(!state.complete_all());
        assert_eq!(state.view(), first);
        assert_eq!(first.completed_step_ids, vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(first.current_step_index, 2);
    }

    #[test]
    fn test_view_orders_completed_by_step() {
        let mut state = ExecutionState::new("session_1", &model(), 26);
        state.complete_step("s2");
        let view = state.view();
        assert_eq!(view.completed_step_ids, vec!["s2".to_string()]);
        assert_eq!(view.completed_count, 1);
        assert_eq!(view.total_steps, 2);
    }

    #[test]
    fn test_nothing_to_execute_state() {
        let state = ExecutionState::nothing_to_execute("session_1");
        assert_eq!(state.status, ExecutionStatus::NothingToExecute);
        assert_eq!(state.total_steps(), 0);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_live_start_claim_and_release() {
        let mut state = ExecutionState::new("session_1", &model(), 26);
        assert_eq!(state.mark_started(), Some(ConnectionStatus::Disconnected));
        assert_eq!(state.status, ExecutionStatus::Running);
        assert_eq!(state.mark_started(), None);

        state.release_start();
        assert!(!state.execution_started);
        assert_eq!(state.status, ExecutionStatus::AwaitingStart);

        // Progress already recorded keeps the run visible as running.
        state.mark_started();
        state.complete_step("s1");
        state.release_start();
        assert_eq!(state.status, ExecutionStatus::Running);
    }

    #[test]
    fn test_mark_running_leaves_terminal_state() {
        let mut state = ExecutionState::new("session_1", &model(), 26);
        state.mark_running();
        assert_eq!(state.status, ExecutionStatus::Running);
        state.complete_all();
        state.mark_running();
        assert_eq!(state.status, ExecutionStatus::Completed);
        assert_eq!(state.mark_started(), None);
    }
}
