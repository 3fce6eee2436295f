//! The driver: runs steps until a root continuation is reached.
//!
//! Every entry point builds one initial [`Step`] and hands it to
//! [`Evaluator::drive`], the only loop in the crate that runs steps.

mod builder;

use std::fmt;
use std::sync::Arc;

pub use builder::EvaluatorBuilder;

use crate::continuation::Continuation;
use crate::environment::Environment;
use crate::errors::Fault;
use crate::eval_mode::{EvalMode, StepCounter};
use crate::expr::ExprRef;
use crate::resource::ResourceRegistry;
use crate::trampoline::{Bounce, Outcome, RunContext, Step};
use crate::value::Value;

/// How a suspended computation is resumed.
#[derive(Clone, Debug)]
pub enum Completion {
    /// The awaited operation produced a value.
    Value(Value),
    /// The awaited operation failed; the value is thrown.
    Throw(Value),
}

/// Stateless evaluator configuration: a mode and a resource registry.
///
/// Runs share nothing but the registry, so one evaluator can drive any
/// number of independent computations, from any thread.
pub struct Evaluator {
    mode: EvalMode,
    registry: Arc<dyn ResourceRegistry>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Evaluator {
    /// Evaluator in `Interpret` mode with a fresh `HandleRegistry`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::new()
    }

    pub fn mode(&self) -> &EvalMode {
        &self.mode
    }

    pub fn registry(&self) -> &Arc<dyn ResourceRegistry> {
        &self.registry
    }

    /// Evaluate `expr` in `env` under a fresh root continuation.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn evaluate(&self, expr: &ExprRef, env: &Environment) -> Result<Outcome, Fault> {
        self.drive(Step::eval(expr.clone(), env.clone(), Continuation::root()))
    }

    /// Evaluate `expr` in `env`, delivering to the caller-supplied `k`.
    ///
    /// The run ends when a value or thrown value reaches the root of `k`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn evaluate_under(
        &self,
        expr: &ExprRef,
        env: &Environment,
        k: &Continuation,
    ) -> Result<Outcome, Fault> {
        self.drive(Step::eval(expr.clone(), env.clone(), k.clone()))
    }

    /// Re-enter a saved continuation with the result of a suspended operation.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn resume(&self, k: &Continuation, completion: Completion) -> Result<Outcome, Fault> {
        let step = match completion {
            Completion::Value(value) => k.return_value(value),
            Completion::Throw(value) => k.throw(value),
        };
        self.drive(step)
    }

    /// Apply `procedure` to `args` under a fresh root continuation.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn call(&self, procedure: &Value, args: Vec<Value>) -> Result<Outcome, Fault> {
        self.drive(Step::apply(procedure.clone(), args, Continuation::root()))
    }

    /// Run `step` and everything it leads to.
    pub fn drive(&self, mut step: Step) -> Result<Outcome, Fault> {
        let ctx = RunContext {
            registry: self.registry.as_ref(),
        };
        let mut counter = StepCounter::new(&self.mode);
        loop {
            counter.tick()?;
            match step.run(&ctx)? {
                Bounce::Step(next) => step = next,
                Bounce::Done(outcome) => {
                    tracing::debug!(steps = counter.steps(), outcome = outcome.kind(), "run finished");
                    return Ok(outcome);
                }
            }
        }
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
