use std::time::{Duration, Instant};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use console::style;
use crate::drivers::ExecutionEvent;
use crate::sequencer::{SequencerEvent, Stage, StepStatus};
use crate::utils::formatting::format_duration;
use crate::workflow::ConnectionStatus;

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

fn spinner_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn multi(visible: bool) -> MultiProgress {
    if visible {
        MultiProgress::new()
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }
}

/// Terminal view of one workflow execution.
pub struct ExecutionProgress {
    multi: MultiProgress,
    step_bar: Option<ProgressBar>,
    status_bar: ProgressBar,
    connection: ConnectionStatus,
    live: bool,
    print_logs: bool,
    start_time: Instant,
}

impl ExecutionProgress {
    pub fn new(visible: bool, print_logs: bool) -> Self {
        let multi = multi(visible);
        let status_bar = multi.add(ProgressBar::new_spinner());
        status_bar.set_style(spinner_style("  {spinner:.cyan} {msg}"));
        status_bar.set_message("Waiting for execution...");
        if visible {
            status_bar.enable_steady_tick(Duration::from_millis(120));
        }

        Self {
            multi,
            step_bar: None,
            status_bar,
            connection: ConnectionStatus::Disconnected,
            live: false,
            print_logs,
            start_time: Instant::now(),
        }
    }

    pub fn handle_event(&mut self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::ExecutionStarted { task_id, total_steps, live, .. } => {
                let bar = self.multi.insert_before(&self.status_bar, ProgressBar::new(*total_steps as u64));
                bar.set_style(bar_style("  {bar:30.cyan/dark_gray} {pos}/{len} steps | {msg}"));
                bar.set_message(task_id.clone());
                self.step_bar = Some(bar);
                self.live = *live;
                self.start_time = Instant::now();
                self.update_status();
            }
            ExecutionEvent::StepStarted { label, .. } => {
                if let Some(bar) = &self.step_bar {
                    bar.set_message(label.clone());
                }
                self.update_status();
            }
            ExecutionEvent::StepCompleted { .. } => {
                if let Some(bar) = &self.step_bar {
                    bar.inc(1);
                }
                self.update_status();
            }
            ExecutionEvent::Log { line } => {
                if self.print_logs {
                    self.println(&format!("  {}", style(line).dim()));
                }
            }
            ExecutionEvent::ConnectionChanged { status } => {
                self.connection = *status;
                self.update_status();
            }
            ExecutionEvent::ExecutionCompleted { completed_steps, .. } => {
                if let Some(bar) = self.step_bar.take() {
                    bar.set_position(*completed_steps as u64);
                    bar.finish_with_message("All steps complete");
                }
                self.status_bar.finish_with_message(format!(
                    "{} Workflow complete: {} steps in {}",
                    style("✓").green(),
                    completed_steps,
                    format_duration(self.start_time.elapsed().as_millis() as u64),
                ));
            }
            ExecutionEvent::ExecutionStopped { .. } => {
                if let Some(bar) = self.step_bar.take() {
                    bar.abandon_with_message("Stopped");
                }
                self.status_bar.finish_with_message("Execution stopped");
            }
        }
    }

    fn update_status(&self) {
        let elapsed = format_duration(self.start_time.elapsed().as_millis() as u64);
        let message = if self.live {
            format!("{} | stream {}", elapsed, self.connection)
        } else {
            format!("{} | simulated", elapsed)
        };
        self.status_bar.set_message(message);
    }

    pub fn println(&self, msg: &str) {
        let _ = self.multi.println(msg);
    }

    pub fn finish(&self) {
        if !self.status_bar.is_finished() {
            self.status_bar.finish_and_clear();
        }
    }
}

/// Terminal view of the pre-meeting sequencer.
pub struct SequenceProgress {
    multi: MultiProgress,
    stage_bar: ProgressBar,
    step_bar: Option<ProgressBar>,
}

impl SequenceProgress {
    pub fn new(visible: bool, total_steps: usize) -> Self {
        let multi = multi(visible);
        let stage_bar = multi.add(ProgressBar::new(total_steps as u64));
        stage_bar.set_style(bar_style("  {bar:30.magenta/dark_gray} {pos}/{len} | {msg}"));
        stage_bar.set_message(format!("stage: {}", Stage::Trigger));
        Self { multi, stage_bar, step_bar: None }
    }

    pub fn handle_event(&mut self, event: &SequencerEvent) {
        match event {
            SequencerEvent::StageChanged { stage } => {
                self.stage_bar.set_message(format!("stage: {}", stage));
            }
            SequencerEvent::StepStatusChanged { step_id, status, .. } => match status {
                StepStatus::Thinking => {
                    let bar = self.multi.insert_before(&self.stage_bar, ProgressBar::new_spinner());
                    bar.set_style(spinner_style("    {spinner:.yellow} {msg}"));
                    bar.set_message(format!("{} (thinking)", step_id));
                    bar.enable_steady_tick(Duration::from_millis(100));
                    self.step_bar = Some(bar);
                }
                StepStatus::Loading => {
                    if let Some(bar) = &self.step_bar {
                        bar.set_message(format!("{} (loading)", step_id));
                    }
                }
                StepStatus::Completed => {
                    if let Some(bar) = self.step_bar.take() {
                        bar.finish_and_clear();
                    }
                    self.stage_bar.inc(1);
                    let _ = self.multi.println(format!("  {} {}", style("✓").green(), step_id));
                }
                StepStatus::Pending => {}
            },
            SequencerEvent::Finished { summary } => {
                self.stage_bar.finish_with_message(format!(
                    "Report ready: {}/{} steps in {}",
                    summary.completed_steps,
                    summary.total_steps,
                    format_duration(summary.elapsed_ms),
                ));
            }
        }
    }
}
