use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::controller::execution::DEFAULT_STREAM_URL_TEMPLATE;
use crate::controller::ControllerSettings;
use crate::drivers::{SimulationSettings, StepResolution};
use crate::errors::RetryConfig;
use crate::sequencer::SequencerTimings;
use crate::workflow::{WorkflowModel, DEFAULT_LOG_CAPACITY};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FlowscopeConfig {
    pub backend: Option<BackendConfig>,
    pub simulation: Option<SimulationConfig>,
    pub live: Option<LiveConfig>,
    pub logs: Option<LogsConfig>,
    pub sequencer: Option<SequencerConfig>,
    /// Extra or replacement tasks. Task fields use camelCase keys.
    pub tasks: Option<Vec<WorkflowModel>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BackendConfig {
    pub base_url: Option<String>,
    pub stream_url_template: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SimulationConfig {
    pub scale_factor: Option<u32>,
    pub detail_interval_ms: Option<u64>,
    pub detail_probability: Option<f64>,
    pub settle_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LiveConfig {
    pub step_resolution: Option<StepResolution>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LogsConfig {
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SequencerConfig {
    pub trigger_ms: Option<u64>,
    pub thinking_ms: Option<u64>,
    pub loading_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub final_ms: Option<u64>,
}

impl FlowscopeConfig {
    pub fn base_url(&self) -> String {
        self.backend
            .as_ref()
            .and_then(|b| b.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .backend
            .as_ref()
            .and_then(|b| b.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn simulation_settings(&self) -> SimulationSettings {
        let mut settings = SimulationSettings::default();
        if let Some(sim) = &self.simulation {
            if let Some(scale) = sim.scale_factor {
                settings.scale_factor = scale;
            }
            if let Some(ms) = sim.detail_interval_ms {
                settings.detail_interval = Duration::from_millis(ms);
            }
            if let Some(p) = sim.detail_probability {
                settings.detail_probability = p;
            }
            if let Some(ms) = sim.settle_ms {
                settings.settle = Duration::from_millis(ms);
            }
        }
        settings
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        let backend = self.backend.clone().unwrap_or_default();
        let mut retry = RetryConfig::default();
        if let Some(n) = backend.max_retries {
            retry.max_retries = n;
        }
        ControllerSettings {
            simulation: self.simulation_settings(),
            step_resolution: self
                .live
                .as_ref()
                .and_then(|l| l.step_resolution)
                .unwrap_or_default(),
            log_capacity: self
                .logs
                .as_ref()
                .and_then(|l| l.capacity)
                .unwrap_or(DEFAULT_LOG_CAPACITY),
            stream_url_template: backend
                .stream_url_template
                .unwrap_or_else(|| DEFAULT_STREAM_URL_TEMPLATE.to_string()),
            retry,
        }
    }

    pub fn sequencer_timings(&self) -> SequencerTimings {
        let mut timings = SequencerTimings::default();
        if let Some(seq) = &self.sequencer {
            let set = |slot: &mut Duration, ms: Option<u64>| {
                if let Some(ms) = ms {
                    *slot = Duration::from_millis(ms);
                }
            };
            set(&mut timings.trigger, seq.trigger_ms);
            set(&mut timings.thinking, seq.thinking_ms);
            set(&mut timings.loading, seq.loading_ms);
            set(&mut timings.settle, seq.settle_ms);
            set(&mut timings.final_delay, seq.final_ms);
        }
        timings
    }
}
