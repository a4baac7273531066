//! Step trace
//!
//! One entry per pipeline stage, appended in stage order. An entry moves
//! `pending -> in_progress -> completed | error` and is frozen once it reaches
//! a terminal status.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    Preparing,
    Generating,
}

impl Stage {
    /// Display name recorded in the trace
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validating => "Validating input",
            Self::Preparing => "Preparing input",
            Self::Generating => "Generating code",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// One trace entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append-only record of stage progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepTrace {
    steps: Vec<Step>,
}

impl StepTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step for `stage` and move it to `in_progress`
    pub fn begin(&mut self, stage: Stage) {
        debug!(%stage, "StepTrace::begin: called");
        if let Some(last) = self.steps.last()
            && !last.status.is_terminal()
        {
            warn!(previous = %last.name, "StepTrace::begin: previous step still open");
        }
        self.steps.push(Step {
            name: stage.name().to_string(),
            status: StepStatus::Pending,
            message: None,
        });
        self.transition(StepStatus::InProgress, None);
    }

    /// Mark the open step completed; false if there is none
    pub fn complete(&mut self, message: impl Into<String>) -> bool {
        self.transition(StepStatus::Completed, Some(message.into()))
    }

    /// Mark the open step failed; false if there is none
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        self.transition(StepStatus::Error, Some(message.into()))
    }

    fn transition(&mut self, status: StepStatus, message: Option<String>) -> bool {
        match self.steps.last_mut() {
            Some(step) if !step.status.is_terminal() => {
                debug!(step = %step.name, from = %step.status, to = %status, "StepTrace::transition");
                step.status = status;
                if message.is_some() {
                    step.message = message;
                }
                true
            }
            Some(step) => {
                warn!(step = %step.name, status = %step.status, "StepTrace::transition: step already finished");
                false
            }
            None => {
                warn!("StepTrace::transition: no step to update");
                false
            }
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }
}

impl<'a> IntoIterator for &'a StepTrace {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
