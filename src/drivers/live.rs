use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::stream::StreamEvent;
use crate::utils::formatting::{clock, system_line};
use crate::workflow::{ConnectionStatus, ExecutionState, WorkflowModel};
use super::events::ExecutionEvent;
use super::messages::{self, CompletionResults, LiveMessage, MessageStatus, ProgressMessage};
use super::writer::StateWriter;

pub const COMPLETION_LABEL: &str = "All agents completed the workflow";

/// How an agent's `completed` message is bound to a step when the agent
/// appears more than once in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepResolution {
    /// First step with the agent id, completed or not.
    FirstMatch,
    /// First step with the agent id that is not completed yet.
    #[default]
    FirstUnresolved,
}

impl StepResolution {
    pub fn resolve(&self, model: &WorkflowModel, state: &ExecutionState, agent_id: &str) -> Option<usize> {
        let mut candidates = model
            .steps()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.agent_id == agent_id);
        match self {
            Self::FirstMatch => candidates.next().map(|(i, _)| i),
            Self::FirstUnresolved => candidates
                .find(|(_, s)| !state.is_completed(&s.id))
                .map(|(i, _)| i),
        }
    }
}

/// Drives a workflow from messages on an external event stream.
/// Every log line it writes comes from a received event.
pub struct LiveStepDriver {
    model: Arc<WorkflowModel>,
    resolution: StepResolution,
}

impl LiveStepDriver {
    pub fn new(model: Arc<WorkflowModel>, resolution: StepResolution) -> Self {
        Self { model, resolution }
    }

    pub fn spawn(self, writer: StateWriter, events: mpsc::UnboundedReceiver<StreamEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(writer, events))
    }

    pub async fn run(self, writer: StateWriter, mut events: mpsc::UnboundedReceiver<StreamEvent>) {
        let token = writer.token().clone();
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Some(event) => {
                    if !self.handle(&writer, event).await {
                        break;
                    }
                }
                None => {
                    // Feed dropped without a close frame.
                    self.on_closed(&writer).await;
                    break;
                }
            }
        }
        debug!(task_id = %self.model.task_id, "Live driver stopped");
    }

    /// Apply one stream event. Returns false once the execution is torn down.
    pub async fn handle(&self, writer: &StateWriter, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Opened => {
                let line = system_line("Connected to live event stream");
                let applied = writer
                    .apply(|s| {
                        s.connection_status = ConnectionStatus::Connected;
                        s.log(line.clone());
                        s.session_id.clone()
                    })
                    .await;
                let Some(session_id) = applied else { return false };
                info!(session_id = %session_id, "Live event stream connected");
                writer.emit(ExecutionEvent::ConnectionChanged { status: ConnectionStatus::Connected });
                writer.emit(ExecutionEvent::Log { line });
                true
            }
            StreamEvent::Error(e) => {
                warn!(error = %e, "Live event stream error");
                writer.log(system_line(&format!("Event stream error: {}", e))).await
            }
            StreamEvent::Closed => self.on_closed(writer).await,
            StreamEvent::Message(text) => match messages::parse(&text) {
                LiveMessage::Complete(results) => self.on_complete(writer, results).await,
                LiveMessage::Progress(msg) => self.on_progress(writer, msg).await,
                LiveMessage::Malformed(reason) => {
                    warn!(reason = %reason, "Dropping malformed stream message");
                    !writer.is_cancelled()
                }
            },
        }
    }

    async fn on_closed(&self, writer: &StateWriter) -> bool {
        let line = system_line("Live event stream closed");
        let applied = writer
            .apply(|s| {
                let was_open = s.connection_status != ConnectionStatus::Disconnected;
                s.connection_status = ConnectionStatus::Disconnected;
                if was_open {
                    s.log(line.clone());
                }
                was_open
            })
            .await;
        match applied {
            Some(true) => {
                writer.emit(ExecutionEvent::ConnectionChanged { status: ConnectionStatus::Disconnected });
                writer.emit(ExecutionEvent::Log { line });
                true
            }
            Some(false) => true,
            None => false,
        }
    }

    async fn on_complete(&self, writer: &StateWriter, results: CompletionResults) -> bool {
        let lines = results.summary_lines(&clock());
        let applied = writer
            .apply(|s| {
                if s.is_terminal() {
                    return None;
                }
                let newly: Vec<(usize, String)> = s
                    .step_order()
                    .iter()
                    .enumerate()
                    .filter(|(_, id)| !s.is_completed(id))
                    .map(|(i, id)| (i, id.clone()))
                    .collect();
                s.complete_all();
                s.current_action_label = COMPLETION_LABEL.to_string();
                // Newest-first buffer: prepend in reverse so the header reads on top.
                for line in lines.iter().rev() {
                    s.log(line.clone());
                }
                Some((newly, s.session_id.clone(), s.total_steps()))
            })
            .await;

        let Some(outcome) = applied else { return false };
        let Some((newly, session_id, total)) = outcome else {
            debug!("Ignoring repeated execution-complete message");
            return true;
        };
        for (index, step_id) in newly {
            writer.emit(ExecutionEvent::StepCompleted { index, step_id });
        }
        for line in lines.into_iter().rev() {
            writer.emit(ExecutionEvent::Log { line });
        }
        writer.emit(ExecutionEvent::ExecutionCompleted { session_id, completed_steps: total });
        info!(task_id = %self.model.task_id, "Live execution completed");
        true
    }

    async fn on_progress(&self, writer: &StateWriter, msg: ProgressMessage) -> bool {
        let line = msg.log_line();
        let label = msg.label();
        let model = self.model.clone();
        let resolution = self.resolution;
        let applied = writer
            .apply(|s| {
                if !s.set_label(label.clone()) {
                    return None;
                }
                s.mark_running();
                s.log(line.clone());
                let mut completed = None;
                if msg.status == MessageStatus::Completed {
                    match resolution.resolve(&model, s, &msg.agent_id) {
                        Some(index) => {
                            let step_id = model.steps()[index].id.clone();
                            if s.complete_step(&step_id) {
                                completed = Some((index, step_id));
                            }
                            s.advance_past(index);
                        }
                        None => debug!(agent_id = %msg.agent_id, "No step to resolve for completed agent"),
                    }
                }
                Some((completed, s.is_terminal(), s.session_id.clone()))
            })
            .await;

        let Some(outcome) = applied else { return false };
        let Some((completed, terminal, session_id)) = outcome else {
            debug!(agent_id = %msg.agent_id, "Ignoring progress after completion");
            return true;
        };
        writer.emit(ExecutionEvent::Log { line });
        if let Some((index, step_id)) = completed {
            debug!(step = %step_id, index, "Step completed from stream");
            writer.emit(ExecutionEvent::StepCompleted { index, step_id });
        }
        if terminal {
            writer.emit(ExecutionEvent::ExecutionCompleted {
                session_id,
                completed_steps: model.len(),
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::RwLock;
    use tokio_util::sync::CancellationToken;
    use crate::workflow::{ExecutionStatus, WorkflowStep};

    fn model() -> Arc<WorkflowModel> {
        Arc::new(WorkflowModel::new("live", vec![
            WorkflowStep::new("step0", "a0", "Planner", "plan", 100),
            WorkflowStep::new("step1", "a9", "Reader", "read", 100),
            WorkflowStep::new("step2", "a1", "Writer", "write", 100),
        ]).unwrap())
    }

    fn setup(model: &WorkflowModel) -> (Arc<RwLock<ExecutionState>>, CancellationToken, StateWriter) {
        let state = Arc::new(RwLock::new(ExecutionState::new("session_1", model, 26)));
        let token = CancellationToken::new();
        let writer = StateWriter::new(state.clone(), token.clone());
        (state, token, writer)
    }

    fn msg(agent: &str, action: &str, status: &str) -> StreamEvent {
        StreamEvent::Message(format!(
            r#"{{"timestamp":"t","agentId":"{}","agentName":"N","action":"{}","message":"m","status":"{}"}}"#,
            agent, action, status
        ))
    }

    fn complete() -> StreamEvent {
        StreamEvent::Message(r#"{"type":"execution-complete","results":{"efficiency":"90%"}}"#.to_string())
    }

    #[tokio::test]
    async fn test_completion_resolves_single_matching_step() {
        let model = model();
        let (state, _token, writer) = setup(&model);
        let driver = LiveStepDriver::new(model.clone(), StepResolution::default());
        assert!(driver.handle(&writer, msg("a1", "x", "completed")).await);

        let s = state.read().await;
        assert_eq!(s.completed_step_ids.iter().collect::<Vec<_>>(), vec!["step2"]);
        assert_eq!(s.current_step_index, 3);
        assert_eq!(s.current_action_label, "N: x");
        assert_eq!(s.logs.latest(), Some("[t] [N] m"));
    }

    #[tokio::test]
    async fn test_execution_complete_supersedes_and_is_idempotent() {
        let model = model();
        let (state, _token, writer) = setup(&model);
        let driver = LiveStepDriver::new(model.clone(), StepResolution::default());
        driver.handle(&writer, msg("a0", "plan", "completed")).await;
        driver.handle(&writer, complete()).await;
        let once = state.read().await.view();
        driver.handle(&writer, complete()).await;
        let twice = state.read().await.view();

        assert_eq!(once, twice);
        assert_eq!(once.status, ExecutionStatus::Completed);
        assert_eq!(once.completed_step_ids, vec!["step0", "step1", "step2"]);
        assert_eq!(once.current_action_label, COMPLETION_LABEL);
        assert!(once.logs[0].ends_with("Workflow execution complete"));
        assert!(once.logs[1].ends_with("Efficiency: 90%"));
        assert!(once.logs[3].ends_with("Time saved: n/a"));
    }

    #[tokio::test]
    async fn test_progress_after_completion_is_ignored() {
        let model = model();
        let (state, _token, writer) = setup(&model);
        let driver = LiveStepDriver::new(model.clone(), StepResolution::default());
        driver.handle(&writer, complete()).await;
        let before = state.read().await.view();
        driver.handle(&writer, msg("a0", "late", "running")).await;
        assert_eq!(state.read().await.view(), before);
    }

    #[tokio::test]
    async fn test_malformed_message_leaves_state_untouched() {
        let model = model();
        let (state, _token, writer) = setup(&model);
        let driver = LiveStepDriver::new(model.clone(), StepResolution::default());
        let before = state.read().await.view();
        assert!(driver.handle(&writer, StreamEvent::Message("{broken".into())).await);
        assert!(driver.handle(&writer, StreamEvent::Message(r#"{"type":"heartbeat"}"#.into())).await);
        assert_eq!(state.read().await.view(), before);
    }

    #[tokio::test]
    async fn test_connection_lifecycle() {
        let model = model();
        let (state, _token, writer) = setup(&model);
        let driver = LiveStepDriver::new(model.clone(), StepResolution::default());

        driver.handle(&writer, StreamEvent::Opened).await;
        assert_eq!(state.read().await.connection_status, ConnectionStatus::Connected);

        driver.handle(&writer, StreamEvent::Error("reset".into())).await;
        {
            let s = state.read().await;
            assert_eq!(s.connection_status, ConnectionStatus::Connected);
            assert!(s.logs.latest().unwrap().ends_with("Event stream error: reset"));
        }

        driver.handle(&writer, StreamEvent::Closed).await;
        assert_eq!(state.read().await.connection_status, ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_reused_agent_resolution_modes() {
        let model = Arc::new(WorkflowModel::new("reuse", vec![
            WorkflowStep::new("first", "a1", "A", "x", 1),
            WorkflowStep::new("second", "a1", "A", "y", 1),
        ]).unwrap());

        let (state, _t, writer) = setup(&model);
        let driver = LiveStepDriver::new(model.clone(), StepResolution::FirstUnresolved);
        driver.handle(&writer, msg("a1", "x", "completed")).await;
        driver.handle(&writer, msg("a1", "y", "completed")).await;
        assert!(state.read().await.is_terminal());

        let (state, _t, writer) = setup(&model);
        let driver = LiveStepDriver::new(model.clone(), StepResolution::FirstMatch);
        driver.handle(&writer, msg("a1", "x", "completed")).await;
        driver.handle(&writer, msg("a1", "y", "completed")).await;
        let s = state.read().await;
        assert_eq!(s.completed_step_ids.len(), 1);
        assert_eq!(s.current_step_index, 1);
    }

    #[tokio::test]
    async fn test_running_and_error_do_not_complete() {
        let model = model();
        let (state, _token, writer) = setup(&model);
        let driver = LiveStepDriver::new(model.clone(), StepResolution::default());
        driver.handle(&writer, msg("a0", "plan", "running")).await;
        driver.handle(&writer, msg("a0", "plan", "error")).await;
        let s = state.read().await;
        assert!(s.completed_step_ids.is_empty());
        assert_eq!(s.current_step_index, 0);
        assert_eq!(s.logs.len(), 2);
        assert!(s.logs.latest().unwrap().contains("ERROR"));
        // Any progress means the run is under way, completed or not.
        assert_eq!(s.status, ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let model = model();
        let (state, token, writer) = setup(&model);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = LiveStepDriver::new(model.clone(), StepResolution::default()).spawn(writer, rx);

        tx.send(StreamEvent::Opened).unwrap();
        tx.send(msg("a0", "plan", "completed")).unwrap();
        tokio::task::yield_now().await;
        while state.read().await.completed_step_ids.is_empty() {
            tokio::task::yield_now().await;
        }
        token.cancel();
        handle.await.unwrap();

        let _ = tx.send(msg("a9", "read", "completed"));
        let s = state.read().await;
        assert_eq!(s.completed_step_ids.len(), 1);
    }
}
