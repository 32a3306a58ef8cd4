use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, info};
use crate::utils::formatting::clock;
use crate::workflow::WorkflowModel;
use super::cosmetic::{format_detail_line, DetailSource, EmissionGate, ProbabilityGate, RandomDetails};
use super::events::ExecutionEvent;
use super::writer::StateWriter;

#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Multiplier applied to nominal step durations so short steps stay legible.
    pub scale_factor: u32,
    pub detail_interval: Duration,
    pub detail_probability: f64,
    /// Pause between a step completing and the next one starting.
    pub settle: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            scale_factor: 8,
            detail_interval: Duration::from_millis(1500),
            detail_probability: 0.3,
            settle: Duration::from_millis(1000),
        }
    }
}

impl SimulationSettings {
    pub fn scaled(&self, nominal_ms: u64) -> Duration {
        Duration::from_millis(nominal_ms.saturating_mul(self.scale_factor as u64))
    }
}

/// Drives a workflow from local timers, with no network involved.
pub struct SimulatedStepDriver {
    model: Arc<WorkflowModel>,
    settings: SimulationSettings,
    gate: Box<dyn EmissionGate>,
    details: Box<dyn DetailSource>,
}

impl SimulatedStepDriver {
    pub fn new(model: Arc<WorkflowModel>, settings: SimulationSettings) -> Self {
        let gate = Box::new(ProbabilityGate::new(settings.detail_probability));
        Self {
            model,
            settings,
            gate,
            details: Box::new(RandomDetails::new()),
        }
    }

    pub fn with_cosmetics(mut self, gate: Box<dyn EmissionGate>, details: Box<dyn DetailSource>) -> Self {
        self.gate = gate;
        self.details = details;
        self
    }

    pub fn spawn(self, writer: StateWriter) -> JoinHandle<()> {
        tokio::spawn(self.run(writer))
    }

    pub async fn run(mut self, writer: StateWriter) {
        let model = self.model.clone();
        let token = writer.token().clone();
        let total = model.len();
        info!(task_id = %model.task_id, steps = total, "Simulated execution started");

        for (index, step) in model.steps().iter().enumerate() {
            let label = step.action_label();
            match writer.apply(|s| s.enter_step(index, label.clone())).await {
                Some(true) => {}
                _ => return,
            }
            writer.emit(ExecutionEvent::StepStarted {
                index,
                step_id: step.id.clone(),
                label,
            });
            debug!(step = %step.id, index, "Step started");

            let deadline = sleep(self.settings.scaled(step.nominal_duration_ms));
            tokio::pin!(deadline);
            let period = self.settings.detail_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            let mut tick = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(step = %step.id, "Simulated execution cancelled");
                        return;
                    }
                    _ = &mut deadline => break,
                    _ = ticker.tick() => {
                        tick += 1;
                        if step.detail_pool.is_empty() || !self.gate.should_emit(tick) {
                            continue;
                        }
                        if let Some(detail) = self.details.pick(&step.detail_pool) {
                            let words = self.details.word_count();
                            let line = format_detail_line(&clock(), &step.agent_name, &detail, words);
                            if !writer.log(line).await {
                                return;
                            }
                        }
                    }
                }
            }

            if writer.apply(|s| s.complete_step(&step.id)).await.is_none() {
                return;
            }
            writer.emit(ExecutionEvent::StepCompleted {
                index,
                step_id: step.id.clone(),
            });
            debug!(step = %step.id, index, "Step completed");

            if index + 1 == total {
                break;
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = sleep(self.settings.settle) => {}
            }
        }

        // An empty model has nothing to wait for.
        let Some(session_id) = writer
            .apply(|s| {
                s.complete_all();
                s.session_id.clone()
            })
            .await
        else {
            return;
        };
        writer.emit(ExecutionEvent::ExecutionCompleted {
            session_id,
            completed_steps: total,
        });
        info!(task_id = %model.task_id, "Simulated execution completed");
    }
}
