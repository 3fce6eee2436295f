//! Dual-continuation pattern matching for `match`.
//!
//! Matching runs on the trampoline like everything else. A pattern is tried
//! against a subject with two continuations:
//!
//! - a [`Success`] continuation, receiving the clause's bindings array;
//! - a [`Failure`] continuation, taking nothing and moving on to the next
//!   clause.
//!
//! A pair pattern matches its head with a success continuation that goes on
//! to match the tail, both under the clause's original failure continuation.
//! When the whole pattern succeeds, the guard runs in the clause
//! environment; a `#f` guard moves to the next clause exactly like a failed
//! pattern. Each clause is attempted at most once.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::continuation::{ContFrame, Continuation};
use crate::environment::Environment;
use crate::errors::InternalError;
use crate::expr::ExprRef;
use crate::trampoline::Step;
use crate::value::Value;

/// Bindings captured by one clause, indexed by pattern slot.
pub(crate) type Bindings = SmallVec<[Value; 4]>;

/// Compiled pattern.
#[derive(Debug)]
pub enum Pattern {
    /// Matches values `equal?` to the literal.
    Literal(Value),
    /// Matches anything, storing it in the given slot.
    Bind(usize),
    Wildcard,
    Pair(Arc<Pattern>, Arc<Pattern>),
}

pub struct MatchClause {
    pub(crate) pattern: Arc<Pattern>,
    /// Size of the bindings array and of the clause's environment frame.
    pub(crate) slots: usize,
    pub(crate) guard: Option<ExprRef>,
    pub(crate) body: ExprRef,
}

pub struct MatchExpr {
    pub(crate) subject: ExprRef,
    pub(crate) clauses: Box<[Arc<MatchClause>]>,
    /// Runs when no clause matches; `Constant(Unspecified)` if absent.
    pub(crate) otherwise: ExprRef,
}

/// Position in a match: which clause to try next against which subject.
///
/// Holds no continuation, so it can live inside continuation frames.
#[derive(Clone)]
pub(crate) struct ClauseCursor {
    expr: Arc<MatchExpr>,
    clause: usize,
    subject: Value,
    env: Environment,
}

impl ClauseCursor {
    pub(crate) fn start(expr: Arc<MatchExpr>, subject: Value, env: Environment) -> Self {
        ClauseCursor {
            expr,
            clause: 0,
            subject,
            env,
        }
    }

    #[must_use]
    pub(crate) fn next(&self) -> Self {
        ClauseCursor {
            clause: self.clause + 1,
            ..self.clone()
        }
    }

    /// Try the clause under the cursor, or the else branch if none remain.
    pub(crate) fn attempt(self, k: Continuation) -> Step {
        let Some(clause) = self.expr.clauses.get(self.clause).cloned() else {
            return Step::eval(self.expr.otherwise.clone(), self.env, k);
        };
        let bindings = SmallVec::from_elem(Value::Unspecified, clause.slots);
        let pattern = Arc::clone(&clause.pattern);
        let subject = self.subject.clone();
        let attempt = Arc::new(Attempt {
            clause,
            cursor: self,
            k,
        });
        Step::matching(
            pattern,
            subject,
            bindings,
            Success::Clause(Arc::clone(&attempt)),
            Failure(attempt),
        )
    }
}

/// One clause attempt, shared by its success and failure continuations.
pub(crate) struct Attempt {
    clause: Arc<MatchClause>,
    cursor: ClauseCursor,
    k: Continuation,
}

pub(crate) enum Success {
    /// Pattern complete: run the guard, then the body.
    Clause(Arc<Attempt>),
    /// Head matched: match `subject` against `pattern`, then continue.
    Tail {
        pattern: Arc<Pattern>,
        subject: Value,
        then: Box<Success>,
    },
}

/// Move on to the clause after the attempt's.
pub(crate) struct Failure(Arc<Attempt>);

pub(crate) fn try_pattern(
    pattern: &Pattern,
    subject: Value,
    mut bindings: Bindings,
    success: Success,
    failure: Failure,
) -> Result<Step, InternalError> {
    let step = match pattern {
        Pattern::Literal(literal) => {
            if literal.equal(&subject) {
                Step::succeed(success, bindings, failure)
            } else {
                Step::fail(failure)
            }
        }
        Pattern::Wildcard => Step::succeed(success, bindings, failure),
        Pattern::Bind(slot) => {
            let len = bindings.len();
            let cell = bindings
                .get_mut(*slot)
                .ok_or(InternalError::BindingSlotOutOfRange { slot: *slot, len })?;
            *cell = subject;
            Step::succeed(success, bindings, failure)
        }
        Pattern::Pair(head, tail) => match &subject {
            Value::Pair(pair) => Step::matching(
                Arc::clone(head),
                pair.car.clone(),
                bindings,
                Success::Tail {
                    pattern: Arc::clone(tail),
                    subject: pair.cdr.clone(),
                    then: Box::new(success),
                },
                failure,
            ),
            _ => Step::fail(failure),
        },
    };
    Ok(step)
}

pub(crate) fn succeed(success: Success, bindings: Bindings, failure: Failure) -> Step {
    match success {
        Success::Tail {
            pattern,
            subject,
            then,
        } => Step::matching(pattern, subject, bindings, *then, failure),
        Success::Clause(attempt) => {
            let clause_env = attempt.cursor.env.extend_values(bindings);
            let k = attempt.k.clone();
            match &attempt.clause.guard {
                Some(guard) => {
                    let k = k.push(ContFrame::MatchGuard {
                        body: attempt.clause.body.clone(),
                        clause_env: clause_env.clone(),
                        cursor: attempt.cursor.clone(),
                    });
                    Step::eval(guard.clone(), clause_env, k)
                }
                None => Step::eval(attempt.clause.body.clone(), clause_env, k),
            }
        }
    }
}

pub(crate) fn fail(failure: &Failure) -> Step {
    let Failure(attempt) = failure;
    attempt.cursor.next().attempt(attempt.k.clone())
}
