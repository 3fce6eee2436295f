//! Evaluation modes for the Ember evaluator.
//!
//! Parameterizes the driver loop via an `EvalMode` enum so plain runs and
//! sandboxed runs (configuration files, untrusted snippets) share one
//! evaluator. Enum dispatch keeps the mode `Clone + Eq + Hash`, so it can
//! sit inside cache keys.

use crate::errors::Fault;

/// Evaluation mode: determines driver behavior via match dispatch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// Run until the root continuation is reached.
    #[default]
    Interpret,
    /// Run at most `step_budget` trampoline steps, then fault.
    Bounded {
        /// Maximum number of steps before aborting.
        step_budget: u64,
    },
}

impl EvalMode {
    /// Step limit, or `None` for unlimited.
    #[inline]
    pub fn step_budget(&self) -> Option<u64> {
        match self {
            Self::Interpret => None,
            Self::Bounded { step_budget } => Some(*step_budget),
        }
    }
}

/// Per-run step accounting derived from an `EvalMode`.
#[derive(Debug)]
pub(crate) struct StepCounter {
    steps: u64,
    budget: Option<u64>,
}

impl StepCounter {
    pub(crate) fn new(mode: &EvalMode) -> Self {
        StepCounter {
            steps: 0,
            budget: mode.step_budget(),
        }
    }

    /// Count one step, failing once the budget is used up.
    #[inline]
    pub(crate) fn tick(&mut self) -> Result<(), Fault> {
        self.steps = self.steps.saturating_add(1);
        match self.budget {
            Some(budget) if self.steps > budget => Err(Fault::StepBudgetExceeded { budget }),
            _ => Ok(()),
        }
    }

    pub(crate) fn steps(&self) -> u64 {
        self.steps
    }
}
