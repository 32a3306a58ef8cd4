use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::control_plane::{ControlPlane, ExecuteRequest};
use crate::drivers::{
    DetailSource, EmissionGate, ExecutionEvent, LiveStepDriver, SimulatedStepDriver,
    SimulationSettings, StateWriter, StepResolution,
};
use crate::errors::{with_retry, FlowscopeError, RetryConfig};
use crate::stream::{stream_url, EventTransport};
use crate::utils::formatting::system_line;
use crate::workflow::{
    ConnectionStatus, ExecutionState, ExecutionView, WorkflowModel, DEFAULT_LOG_CAPACITY,
};

pub const DEFAULT_STREAM_URL_TEMPLATE: &str = "ws://localhost:3001/ws/{session_id}";

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub simulation: SimulationSettings,
    pub step_resolution: StepResolution,
    pub log_capacity: usize,
    /// Event-stream URL with a `{session_id}` placeholder.
    pub stream_url_template: String,
    pub retry: RetryConfig,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            simulation: SimulationSettings::default(),
            step_resolution: StepResolution::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            stream_url_template: DEFAULT_STREAM_URL_TEMPLATE.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// Builds the cosmetic sources for each simulated run.
pub type CosmeticsFactory = Arc<dyn Fn() -> (Box<dyn EmissionGate>, Box<dyn DetailSource>) + Send + Sync>;

/// The event-stream connection and the driver reading it.
struct LiveStream {
    token: CancellationToken,
    driver: JoinHandle<()>,
    pump: Option<JoinHandle<()>>,
}

impl LiveStream {
    fn close(self) {
        self.token.cancel();
        self.driver.abort();
        if let Some(pump) = self.pump {
            pump.abort();
        }
    }
}

/// Tasks and token owned by the running execution.
struct ActiveExecution {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    stream: Option<LiveStream>,
}

impl ActiveExecution {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Vec::new(),
            stream: None,
        }
    }

    fn teardown(&mut self) {
        self.token.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
    }
}

impl Drop for ActiveExecution {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// An upload validated by `prepare_upload`, ready to send.
pub struct PendingUpload {
    control_plane: Arc<dyn ControlPlane>,
    writer: StateWriter,
    session_id: String,
    file_name: String,
    auto_start: bool,
}

/// Result of `PendingUpload::send`, handed back to `finish_upload`.
#[derive(Debug, Clone)]
pub struct FinishedUpload {
    pub session_id: String,
    pub accepted: bool,
    auto_start: bool,
}

impl PendingUpload {
    pub async fn send(self, bytes: Vec<u8>) -> FinishedUpload {
        let result = self
            .control_plane
            .upload_document(&self.session_id, &self.file_name, bytes)
            .await;

        let failure = match result {
            Ok(resp) if resp.success => None,
            Ok(resp) => Some(resp.error.unwrap_or_else(|| "upload rejected".to_string())),
            Err(e) => Some(e.to_string()),
        };
        let accepted = match failure {
            Some(reason) => {
                warn!(session_id = %self.session_id, file = %self.file_name, reason = %reason, "Document upload failed");
                self.writer.log(system_line(&format!("Upload failed: {}", reason))).await;
                false
            }
            None => {
                let line = system_line(&format!("Uploaded {}", self.file_name));
                let applied = self
                    .writer
                    .apply(|s| {
                        s.upload_complete = true;
                        s.log(line.clone());
                    })
                    .await;
                self.writer.emit(ExecutionEvent::Log { line });
                info!(session_id = %self.session_id, file = %self.file_name, "Document uploaded");
                applied.is_some()
            }
        };
        FinishedUpload {
            session_id: self.session_id,
            accepted,
            auto_start: self.auto_start,
        }
    }
}

/// Owns the one active driver and the state it feeds.
pub struct ExecutionController {
    settings: ControllerSettings,
    control_plane: Arc<dyn ControlPlane>,
    transport: Arc<dyn EventTransport>,
    event_tx: Option<mpsc::UnboundedSender<ExecutionEvent>>,
    cosmetics: Option<CosmeticsFactory>,
    model: Option<Arc<WorkflowModel>>,
    state: Arc<RwLock<ExecutionState>>,
    session_id: String,
    active: Option<ActiveExecution>,
    last_session_ms: u128,
}

impl ExecutionController {
    pub fn new(
        settings: ControllerSettings,
        control_plane: Arc<dyn ControlPlane>,
        transport: Arc<dyn EventTransport>,
    ) -> Self {
        Self {
            settings,
            control_plane,
            transport,
            event_tx: None,
            cosmetics: None,
            model: None,
            state: Arc::new(RwLock::new(ExecutionState::nothing_to_execute(""))),
            session_id: String::new(),
            active: None,
            last_session_ms: 0,
        }
    }

    /// Attach an event channel for renderers and transcript writers.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Replace the random cosmetic sources used by simulated runs.
    pub fn with_cosmetics(mut self, factory: CosmeticsFactory) -> Self {
        self.cosmetics = Some(factory);
        self
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn model(&self) -> Option<Arc<WorkflowModel>> {
        self.model.clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Shared handle to the current execution's state.
    pub fn state(&self) -> Arc<RwLock<ExecutionState>> {
        self.state.clone()
    }

    pub async fn view(&self) -> ExecutionView {
        self.state.read().await.view()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn next_session_id(&mut self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        // Two starts within one millisecond still get distinct ids.
        let ms = if now <= self.last_session_ms { self.last_session_ms + 1 } else { now };
        self.last_session_ms = ms;
        format!("session_{}", ms)
    }

    fn writer(&self) -> Option<StateWriter> {
        let active = self.active.as_ref()?;
        Some(
            StateWriter::new(self.state.clone(), active.token.child_token())
                .with_event_channel(self.event_tx.clone()),
        )
    }

    fn teardown(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.teardown();
            debug!(session_id = %self.session_id, "Previous execution torn down");
        }
    }

    /// Begin a new execution, tearing down whatever ran before.
    /// Returns the new session id.
    pub async fn start(&mut self, model: Option<WorkflowModel>) -> String {
        self.teardown();
        let session_id = self.next_session_id();
        self.session_id = session_id.clone();

        let Some(model) = model else {
            self.model = None;
            self.state = Arc::new(RwLock::new(ExecutionState::nothing_to_execute(&session_id)));
            info!(session_id = %session_id, "No task selected");
            return session_id;
        };

        let model = Arc::new(model);
        self.state = Arc::new(RwLock::new(ExecutionState::new(
            &session_id,
            &model,
            self.settings.log_capacity,
        )));
        self.model = Some(model.clone());
        self.active = Some(ActiveExecution::new());

        info!(
            session_id = %session_id,
            task_id = %model.task_id,
            steps = model.len(),
            live = model.is_live_execution,
            "Execution started"
        );
        self.emit(ExecutionEvent::ExecutionStarted {
            session_id: session_id.clone(),
            task_id: model.task_id.clone(),
            total_steps: model.len(),
            live: model.is_live_execution,
        });

        if !model.is_live_execution {
            self.spawn_simulated(model);
        } else if !model.is_file_upload_gated {
            self.begin_live().await;
        } else if let Some(writer) = self.writer() {
            writer.log(system_line("Upload a document to begin the workflow")).await;
        }
        session_id
    }

    fn spawn_simulated(&mut self, model: Arc<WorkflowModel>) {
        let Some(writer) = self.writer() else { return };
        let mut driver = SimulatedStepDriver::new(model, self.settings.simulation.clone());
        if let Some(ref factory) = self.cosmetics {
            let (gate, details) = factory();
            driver = driver.with_cosmetics(gate, details);
        }
        let handle = driver.spawn(writer);
        if let Some(active) = self.active.as_mut() {
            active.tasks.push(handle);
        }
    }

    /// Send a document for a file-gated task. Returns whether the backend
    /// accepted it; auto-start tasks begin immediately on success.
    pub async fn upload(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<bool, FlowscopeError> {
        let pending = self.prepare_upload(file_name).await?;
        let finished = pending.send(bytes).await;
        Ok(self.finish_upload(finished).await)
    }

    /// First half of `upload`: validate and log, without touching the network.
    /// The returned handle does not borrow the controller, so callers sharing
    /// it behind a lock can release the lock while the request is in flight.
    pub async fn prepare_upload(&self, file_name: &str) -> Result<PendingUpload, FlowscopeError> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| FlowscopeError::InvalidState("no task selected".into()))?;
        if !model.is_file_upload_gated {
            return Err(FlowscopeError::InvalidState(format!(
                "task '{}' does not take a document upload",
                model.task_id
            )));
        }
        let writer = self
            .writer()
            .ok_or_else(|| FlowscopeError::InvalidState("execution was stopped".into()))?;

        writer.log(system_line(&format!("Uploading {}...", file_name))).await;
        Ok(PendingUpload {
            control_plane: self.control_plane.clone(),
            writer,
            session_id: self.session_id.clone(),
            file_name: file_name.to_string(),
            auto_start: model.auto_start,
        })
    }

    /// Second half of `upload`. Starts auto-start tasks if the upload still
    /// belongs to the current execution.
    pub async fn finish_upload(&mut self, upload: FinishedUpload) -> bool {
        if !upload.accepted {
            return false;
        }
        if upload.session_id != self.session_id || self.active.is_none() {
            debug!(session_id = %upload.session_id, "Upload finished for a replaced execution");
            return false;
        }
        if upload.auto_start {
            self.begin_live().await;
        }
        true
    }

    /// Explicit user start for live tasks. Returns false when refused.
    pub async fn trigger_start(&mut self) -> Result<bool, FlowscopeError> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| FlowscopeError::InvalidState("no task selected".into()))?;
        if !model.is_live_execution {
            debug!(task_id = %model.task_id, "Simulated tasks start on selection");
            return Ok(false);
        }
        let writer = self
            .writer()
            .ok_or_else(|| FlowscopeError::InvalidState("execution was stopped".into()))?;

        if model.is_file_upload_gated {
            let uploaded = writer.apply(|s| s.upload_complete).await.unwrap_or(false);
            if !uploaded {
                writer.log(system_line("Upload a document before starting")).await;
                return Ok(false);
            }
        }
        Ok(self.begin_live().await)
    }

    async fn begin_live(&mut self) -> bool {
        let (Some(model), Some(writer)) = (self.model.clone(), self.writer()) else {
            return false;
        };
        let accepted = writer.apply(|s| s.mark_started()).await;
        let Some(connection) = accepted.flatten() else {
            writer.log(system_line("Execution already started")).await;
            return false;
        };

        let session_id = self.session_id.clone();
        let Some(active) = self.active.as_mut() else { return false };

        // A stream that failed or closed before this attempt has no reader left.
        let stream_alive = active
            .stream
            .as_ref()
            .is_some_and(|st| !st.driver.is_finished())
            && connection != ConnectionStatus::Disconnected;
        if !stream_alive {
            if let Some(dead) = active.stream.take() {
                debug!(session_id = %session_id, "Reopening live event stream");
                dead.close();
            }
            let url = stream_url(&self.settings.stream_url_template, &session_id);
            writer
                .apply(|s| s.connection_status = ConnectionStatus::Connecting)
                .await;
            writer.emit(ExecutionEvent::ConnectionChanged { status: ConnectionStatus::Connecting });
            info!(session_id = %session_id, url = %url, "Opening live event stream");

            let token = active.token.child_token();
            let (events, pump) = self.transport.open(&url, token.child_token());
            let driver_writer = StateWriter::new(self.state.clone(), token.child_token())
                .with_event_channel(self.event_tx.clone());
            let driver = LiveStepDriver::new(model.clone(), self.settings.step_resolution)
                .spawn(driver_writer, events);
            active.stream = Some(LiveStream { token, driver, pump });
        }

        active.tasks.push(tokio::spawn(request_live_start(
            self.control_plane.clone(),
            writer,
            model,
            session_id,
            self.settings.retry.clone(),
        )));
        true
    }

    /// Tear down the active execution. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        active.teardown();
        self.state.write().await.connection_status = ConnectionStatus::Disconnected;
        info!(session_id = %self.session_id, "Execution stopped");
        self.emit(ExecutionEvent::ExecutionStopped { session_id: self.session_id.clone() });
    }
}

/// Initialize then execute on the control plane. Any failure is logged and
/// releases `execution_started` so the user can try again.
async fn request_live_start(
    control_plane: Arc<dyn ControlPlane>,
    writer: StateWriter,
    model: Arc<WorkflowModel>,
    session_id: String,
    retry: RetryConfig,
) {
    let scenario = model.scenario().to_string();
    if !writer.log(system_line(&format!("Initializing workflow '{}'", scenario))).await {
        return;
    }

    let initialized = with_retry("initialize_workflow", &retry, || {
        control_plane.initialize_workflow(&scenario)
    })
    .await;

    let orchestration_id = match initialized {
        Ok(resp) => match resp.orchestration_id() {
            Some(id) => id.to_string(),
            None => {
                let reason = resp.message.unwrap_or_else(|| "no orchestration returned".to_string());
                roll_back(&writer, &session_id, &format!("Workflow initialization failed: {}", reason)).await;
                return;
            }
        },
        Err(e) => {
            roll_back(&writer, &session_id, &format!("Workflow initialization failed: {}", e)).await;
            return;
        }
    };

    let request = ExecuteRequest {
        orchestration_id: orchestration_id.clone(),
        session_id: session_id.clone(),
        special_task: model.special_task.clone(),
    };
    match control_plane.execute_workflow(&request).await {
        Ok(resp) if resp.success => {
            info!(session_id = %session_id, orchestration = %orchestration_id, "Workflow execution requested");
            writer
                .log(system_line(&format!("Workflow execution started ({})", orchestration_id)))
                .await;
        }
        Ok(resp) => {
            let reason = resp.error.unwrap_or_else(|| "execution rejected".to_string());
            roll_back(&writer, &session_id, &format!("Workflow execution failed: {}", reason)).await;
        }
        Err(e) => {
            roll_back(&writer, &session_id, &format!("Workflow execution failed: {}", e)).await;
        }
    }
}

async fn roll_back(writer: &StateWriter, session_id: &str, message: &str) {
    warn!(session_id = %session_id, "{}", message);
    let line = system_line(message);
    let applied = writer
        .apply(|s| {
            s.release_start();
            s.log(line.clone());
        })
        .await;
    if applied.is_some() {
        writer.emit(ExecutionEvent::Log { line });
    }
}
