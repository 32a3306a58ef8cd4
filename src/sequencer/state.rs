use serde::{Deserialize, Serialize};
use super::steps::StepDefinition;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Trigger,
    Working,
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::Working => write!(f, "working"),
            Self::Report => write!(f, "report"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Thinking,
    Loading,
    Completed,
}

impl StepStatus {
    /// The only status a step may move to from this one.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Thinking),
            Self::Thinking => Some(Self::Loading),
            Self::Loading => Some(Self::Completed),
            Self::Completed => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
}

impl From<&StepDefinition> for StepCard {
    fn from(def: &StepDefinition) -> Self {
        Self {
            id: def.id.to_string(),
            title: def.title.to_string(),
            description: def.description.to_string(),
            status: StepStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequencerSummary {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequencerState {
    pub stage: Stage,
    /// -1 until the first step begins.
    pub current_step_index: i32,
    pub steps: Vec<StepCard>,
    pub summary: Option<SequencerSummary>,
}

impl SequencerState {
    pub fn new(steps: Vec<StepCard>) -> Self {
        Self {
            stage: Stage::Trigger,
            current_step_index: -1,
            steps,
            summary: None,
        }
    }

    pub fn from_definitions(defs: &[StepDefinition]) -> Self {
        Self::new(defs.iter().map(StepCard::from).collect())
    }

    /// Move to a later stage. Earlier or equal stages are refused.
    pub fn advance_stage(&mut self, stage: Stage) -> bool {
        if stage <= self.stage {
            return false;
        }
        self.stage = stage;
        true
    }

    /// Step `index` to its next status. Anything else is refused.
    pub fn set_status(&mut self, index: usize, status: StepStatus) -> bool {
        let Some(card) = self.steps.get_mut(index) else { return false };
        if card.status.next() != Some(status) {
            return false;
        }
        card.status = status;
        if status == StepStatus::Thinking {
            self.current_step_index = self.current_step_index.max(index as i32);
        }
        true
    }

    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.status == StepStatus::Completed).count()
    }

    pub fn is_report(&self) -> bool {
        self.stage == Stage::Report
    }
}
