use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use super::state::{SequencerState, SequencerSummary, Stage, StepCard, StepStatus};
use super::steps::PRE_MEETING_STEPS;

#[derive(Debug, Clone)]
pub struct SequencerTimings {
    pub trigger: Duration,
    pub thinking: Duration,
    pub loading: Duration,
    pub settle: Duration,
    /// Pause between the last step completing and the report.
    pub final_delay: Duration,
}

impl Default for SequencerTimings {
    fn default() -> Self {
        Self {
            trigger: Duration::from_millis(3000),
            thinking: Duration::from_millis(2500),
            loading: Duration::from_millis(5000),
            settle: Duration::from_millis(1000),
            final_delay: Duration::from_millis(2000),
        }
    }
}

impl SequencerTimings {
    pub fn total(&self, steps: usize) -> Duration {
        self.trigger + (self.thinking + self.loading + self.settle) * steps as u32 + self.final_delay
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    StageChanged { stage: Stage },
    StepStatusChanged { index: usize, step_id: String, status: StepStatus },
    Finished { summary: SequencerSummary },
}

/// Three-stage sequencer with its own timer task.
pub struct StageSequencer {
    state: Arc<RwLock<SequencerState>>,
    timings: SequencerTimings,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    event_tx: Option<mpsc::UnboundedSender<SequencerEvent>>,
}

impl StageSequencer {
    pub fn new(steps: Vec<StepCard>, timings: SequencerTimings) -> Self {
        Self::from_state(SequencerState::new(steps), timings)
    }

    pub fn pre_meeting(timings: SequencerTimings) -> Self {
        Self::from_state(SequencerState::from_definitions(PRE_MEETING_STEPS), timings)
    }

    fn from_state(state: SequencerState, timings: SequencerTimings) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            timings,
            token: CancellationToken::new(),
            handle: None,
            event_tx: None,
        }
    }

    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<SequencerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Spawn the timer task. A sequencer runs at most once.
    pub fn start(&mut self) -> bool {
        if self.handle.is_some() || self.token.is_cancelled() {
            return false;
        }
        let run = SequencerRun {
            state: self.state.clone(),
            timings: self.timings.clone(),
            token: self.token.child_token(),
            event_tx: self.event_tx.clone(),
        };
        self.handle = Some(tokio::spawn(run.run()));
        true
    }

    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub async fn snapshot(&self) -> SequencerState {
        self.state.read().await.clone()
    }

    /// Wait for the timer task to end, by finishing or by `stop`.
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for StageSequencer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct SequencerRun {
    state: Arc<RwLock<SequencerState>>,
    timings: SequencerTimings,
    token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<SequencerEvent>>,
}

impl SequencerRun {
    fn emit(&self, event: SequencerEvent) {
        if self.token.is_cancelled() {
            return;
        }
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Sleep unless cancelled first. False when cancelled.
    async fn dwell(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }

    async fn apply<R>(&self, f: impl FnOnce(&mut SequencerState) -> R) -> Option<R> {
        let mut state = self.state.write().await;
        if self.token.is_cancelled() {
            return None;
        }
        Some(f(&mut state))
    }

    async fn enter_stage(&self, stage: Stage) -> bool {
        match self.apply(|s| s.advance_stage(stage)).await {
            Some(true) => {
                debug!(stage = %stage, "Sequencer stage changed");
                self.emit(SequencerEvent::StageChanged { stage });
                true
            }
            _ => false,
        }
    }

    async fn step_to(&self, index: usize, status: StepStatus) -> bool {
        let step_id = self
            .apply(|s| s.set_status(index, status).then(|| s.steps[index].id.clone()))
            .await
            .flatten();
        match step_id {
            Some(step_id) => {
                self.emit(SequencerEvent::StepStatusChanged { index, step_id, status });
                true
            }
            None => false,
        }
    }

    async fn run(self) {
        let started = Instant::now();
        let total = self.state.read().await.steps.len();
        info!(steps = total, "Sequencer started");

        if !self.dwell(self.timings.trigger).await || !self.enter_stage(Stage::Working).await {
            return;
        }

        for index in 0..total {
            if !self.step_to(index, StepStatus::Thinking).await || !self.dwell(self.timings.thinking).await {
                return;
            }
            if !self.step_to(index, StepStatus::Loading).await || !self.dwell(self.timings.loading).await {
                return;
            }
            if !self.step_to(index, StepStatus::Completed).await || !self.dwell(self.timings.settle).await {
                return;
            }
        }

        if !self.dwell(self.timings.final_delay).await {
            return;
        }
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let summary = self
            .apply(|s| {
                if !s.advance_stage(Stage::Report) {
                    return None;
                }
                let summary = SequencerSummary {
                    total_steps: s.steps.len(),
                    completed_steps: s.completed_steps(),
                    elapsed_ms,
                };
                s.summary = Some(summary.clone());
                Some(summary)
            })
            .await
            .flatten();
        if let Some(summary) = summary {
            self.emit(SequencerEvent::StageChanged { stage: Stage::Report });
            info!(completed = summary.completed_steps, elapsed_ms, "Sequencer reached report");
            self.emit(SequencerEvent::Finished { summary });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<SequencerEvent>) -> Vec<SequencerEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_default_total_duration() {
        assert_eq!(SequencerTimings::default().total(5), Duration::from_millis(47_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_report_after_full_schedule() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut seq = StageSequencer::pre_meeting(SequencerTimings::default()).with_event_channel(tx);
        assert!(seq.start());
        assert!(!seq.start());

        sleep(Duration::from_millis(47_400)).await;
        assert_eq!(seq.snapshot().await.stage, Stage::Working);

        sleep(Duration::from_millis(200)).await;
        let snap = seq.snapshot().await;
        assert_eq!(snap.stage, Stage::Report);
        assert_eq!(snap.current_step_index, 4);
        let summary = snap.summary.unwrap();
        assert_eq!(summary.completed_steps, 5);
        assert!(summary.elapsed_ms >= 47_500 && summary.elapsed_ms < 47_550);

        let events = drain(&mut rx);
        for (i, def) in PRE_MEETING_STEPS.iter().enumerate() {
            let statuses: Vec<StepStatus> = events
                .iter()
                .filter_map(|e| match e {
                    SequencerEvent::StepStatusChanged { index, step_id, status } if *index == i => {
                        assert_eq!(step_id, def.id);
                        Some(*status)
                    }
                    _ => None,
                })
                .collect();
            assert_eq!(statuses, vec![StepStatus::Thinking, StepStatus::Loading, StepStatus::Completed]);
        }
        assert!(matches!(events.last(), Some(SequencerEvent::Finished { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_schedule_points() {
        let mut seq = StageSequencer::pre_meeting(SequencerTimings::default());
        seq.start();

        sleep(Duration::from_millis(2_900)).await;
        let snap = seq.snapshot().await;
        assert_eq!(snap.stage, Stage::Trigger);
        assert_eq!(snap.current_step_index, -1);

        // 3000 trigger + 2500 thinking puts step 0 in loading.
        sleep(Duration::from_millis(2_700)).await;
        let snap = seq.snapshot().await;
        assert_eq!(snap.stage, Stage::Working);
        assert_eq!(snap.steps[0].status, StepStatus::Loading);
        assert_eq!(snap.steps[1].status, StepStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_progress() {
        let mut seq = StageSequencer::pre_meeting(SequencerTimings::default());
        seq.start();
        sleep(Duration::from_millis(10_000)).await;
        seq.stop();
        let frozen = seq.snapshot().await;

        sleep(Duration::from_secs(120)).await;
        assert_eq!(seq.snapshot().await, frozen);
        assert_eq!(frozen.stage, Stage::Working);
        assert!(frozen.summary.is_none());
        assert!(!seq.start());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_step_list_goes_straight_to_report() {
        let mut seq = StageSequencer::new(Vec::new(), SequencerTimings::default());
        seq.start();
        seq.join().await;
        let snap = seq.snapshot().await;
        assert!(snap.is_report());
        assert_eq!(snap.summary.unwrap().total_steps, 0);
    }
}
