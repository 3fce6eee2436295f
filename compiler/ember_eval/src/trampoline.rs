//! Steps and the unit of work the driver loop executes.
//!
//! Every evaluation action produces the next [`Step`] instead of calling
//! into it. The only loop that runs steps is `Evaluator::drive`; nothing in
//! this crate calls `Step::run` from inside another step, so the host stack
//! stays flat no matter how many Scheme-level calls are in flight.

use std::fmt;
use std::sync::Arc;

use crate::apply::apply;
use crate::continuation::Continuation;
use crate::environment::Environment;
use crate::errors::InternalError;
use crate::expr::{eval, ExprRef};
use crate::matcher::{self, Bindings, Failure, Pattern, Success};
use crate::resource::ResourceRegistry;
use crate::value::Value;

/// How a run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The root continuation received a value.
    Value(Value),
    /// A thrown value reached the root uncaught.
    Raised(Value),
}

impl Outcome {
    pub fn is_raised(&self) -> bool {
        matches!(self, Outcome::Raised(_))
    }

    /// The returned value, or `None` if the run raised.
    pub fn value(self) -> Option<Value> {
        match self {
            Outcome::Value(value) => Some(value),
            Outcome::Raised(_) => None,
        }
    }

    /// The raised value, or `None` if the run returned normally.
    pub fn raised(self) -> Option<Value> {
        match self {
            Outcome::Raised(value) => Some(value),
            Outcome::Value(_) => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Outcome::Value(_) => "value",
            Outcome::Raised(_) => "raised",
        }
    }
}

/// One unit of pending work.
///
/// Opaque outside the crate: callers obtain steps from
/// `Continuation::return_value` / `Continuation::throw` and hand them to
/// `Evaluator::drive`.
pub struct Step(pub(crate) StepKind);

pub(crate) enum StepKind {
    Eval {
        expr: ExprRef,
        env: Environment,
        k: Continuation,
    },
    Return {
        k: Continuation,
        value: Value,
    },
    Throw {
        k: Continuation,
        value: Value,
    },
    Apply {
        procedure: Value,
        args: Vec<Value>,
        k: Continuation,
    },
    /// Try `pattern` against `subject`.
    Match {
        pattern: Arc<Pattern>,
        subject: Value,
        bindings: Bindings,
        success: Success,
        failure: Failure,
    },
    /// Deliver completed bindings to a success continuation.
    Succeed {
        success: Success,
        bindings: Bindings,
        failure: Failure,
    },
    /// Invoke a failure continuation.
    Fail(Failure),
}

/// Result of running one step.
pub(crate) enum Bounce {
    Step(Step),
    Done(Outcome),
}

/// Per-run capabilities available to every step.
pub(crate) struct RunContext<'a> {
    pub(crate) registry: &'a dyn ResourceRegistry,
}

impl Step {
    #[inline]
    pub(crate) fn eval(expr: ExprRef, env: Environment, k: Continuation) -> Self {
        Step(StepKind::Eval { expr, env, k })
    }

    #[inline]
    pub(crate) fn ret(k: Continuation, value: Value) -> Self {
        Step(StepKind::Return { k, value })
    }

    #[inline]
    pub(crate) fn throw(k: Continuation, value: Value) -> Self {
        Step(StepKind::Throw { k, value })
    }

    #[inline]
    pub(crate) fn apply(procedure: Value, args: Vec<Value>, k: Continuation) -> Self {
        Step(StepKind::Apply { procedure, args, k })
    }

    pub(crate) fn matching(
        pattern: Arc<Pattern>,
        subject: Value,
        bindings: Bindings,
        success: Success,
        failure: Failure,
    ) -> Self {
        Step(StepKind::Match {
            pattern,
            subject,
            bindings,
            success,
            failure,
        })
    }

    pub(crate) fn succeed(success: Success, bindings: Bindings, failure: Failure) -> Self {
        Step(StepKind::Succeed {
            success,
            bindings,
            failure,
        })
    }

    pub(crate) fn fail(failure: Failure) -> Self {
        Step(StepKind::Fail(failure))
    }

    /// Perform this step's unit of work.
    pub(crate) fn run(self, ctx: &RunContext<'_>) -> Result<Bounce, InternalError> {
        match self.0 {
            StepKind::Eval { expr, env, k } => eval(&expr, env, k).map(Bounce::Step),
            StepKind::Return { k, value } => k.deliver_return(value, ctx),
            StepKind::Throw { k, value } => k.deliver_throw(value, ctx),
            StepKind::Apply { procedure, args, k } => apply(procedure, args, k).map(Bounce::Step),
            StepKind::Match {
                pattern,
                subject,
                bindings,
                success,
                failure,
            } => matcher::try_pattern(&pattern, subject, bindings, success, failure)
                .map(Bounce::Step),
            StepKind::Succeed {
                success,
                bindings,
                failure,
            } => Ok(Bounce::Step(matcher::succeed(success, bindings, failure))),
            StepKind::Fail(failure) => Ok(Bounce::Step(matcher::fail(&failure))),
        }
    }

    fn kind_name(&self) -> &'static str {
        match &self.0 {
            StepKind::Eval { .. } => "eval",
            StepKind::Return { .. } => "return",
            StepKind::Throw { .. } => "throw",
            StepKind::Apply { .. } => "apply",
            StepKind::Match { .. } => "match",
            StepKind::Succeed { .. } => "succeed",
            StepKind::Fail(_) => "fail",
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step({})", self.kind_name())
    }
}
