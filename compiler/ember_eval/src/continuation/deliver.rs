//! What each frame does with a returned or thrown value.

use std::sync::Arc;

use super::{continue_jump, ContFrame, Continuation};
use crate::environment::{Cell, Environment};
use crate::errors::{unbound_dynamic, InternalError};
use crate::expr::ExprRef;
use crate::matcher::ClauseCursor;
use crate::resource::release_all;
use crate::scope::VarRef;
use crate::trampoline::{Bounce, Outcome, RunContext, Step};
use crate::value::Value;

impl Continuation {
    pub(crate) fn deliver_return(
        &self,
        value: Value,
        ctx: &RunContext<'_>,
    ) -> Result<Bounce, InternalError> {
        let Some(parent) = self.parent().cloned() else {
            return Ok(Bounce::Done(Outcome::Value(value)));
        };
        let step = match self.frame() {
            ContFrame::Halt
            | ContFrame::Prompt
            | ContFrame::Catch { .. }
            | ContFrame::DynamicBind { .. } => Step::ret(parent, value),

            ContFrame::If {
                then,
                otherwise,
                env,
            } => {
                let branch = if value.is_true() { then } else { otherwise };
                Step::eval(branch.clone(), env.clone(), parent)
            }

            ContFrame::Sequence { exprs, next, env } => {
                sequence_from(exprs, *next, env.clone(), parent)
            }

            ContFrame::SetLocal { var, env } => {
                env.set(*var, value)?;
                Step::ret(parent, Value::Unspecified)
            }

            ContFrame::Call {
                call,
                evaluated,
                env,
            } => {
                let mut evaluated = evaluated.clone();
                evaluated.push(value);
                // `evaluated[0]` is the operator.
                match call.operands.get(evaluated.len() - 1) {
                    Some(operand) => Step::eval(
                        operand.clone(),
                        env.clone(),
                        parent.push(ContFrame::Call {
                            call: Arc::clone(call),
                            evaluated,
                            env: env.clone(),
                        }),
                    ),
                    None => {
                        let procedure = evaluated.remove(0);
                        Step::apply(procedure, evaluated, parent)
                    }
                }
            }

            ContFrame::Let {
                expr,
                evaluated,
                env,
            } => {
                let mut evaluated = evaluated.clone();
                evaluated.push(value);
                match expr.inits.get(evaluated.len()) {
                    Some(init) => Step::eval(
                        init.clone(),
                        env.clone(),
                        parent.push(ContFrame::Let {
                            expr: Arc::clone(expr),
                            evaluated,
                            env: env.clone(),
                        }),
                    ),
                    None => Step::eval(expr.body.clone(), env.extend_values(evaluated), parent),
                }
            }

            ContFrame::Letrec { expr, index, env } => {
                env.set(
                    VarRef {
                        depth: 0,
                        slot: *index,
                    },
                    value,
                )?;
                let next = index + 1;
                match expr.inits.get(next) {
                    Some(init) => Step::eval(
                        init.clone(),
                        env.clone(),
                        parent.push(ContFrame::Letrec {
                            expr: Arc::clone(expr),
                            index: next,
                            env: env.clone(),
                        }),
                    ),
                    None => Step::eval(expr.body.clone(), env.clone(), parent),
                }
            }

            ContFrame::CatchInstall { body, env } => Step::eval(
                body.clone(),
                env.clone(),
                parent.push(ContFrame::Catch { handler: value }),
            ),

            ContFrame::WindEnter { winder, thunk } => Step::apply(
                thunk.clone(),
                Vec::new(),
                parent.push(ContFrame::Wind(Arc::clone(winder))),
            ),

            ContFrame::Wind(winder) => Step::apply(
                winder.after.clone(),
                Vec::new(),
                parent.push(ContFrame::ReturnValue(value)),
            ),

            ContFrame::ReturnValue(saved) => Step::ret(parent, saved.clone()),
            ContFrame::Rethrow(saved) => Step::throw(parent, saved.clone()),
            ContFrame::Transition { jump, next } => continue_jump(jump, *next),

            ContFrame::UsingInit {
                expr,
                evaluated,
                env,
            } => {
                let mut evaluated = evaluated.clone();
                evaluated.push(value);
                match expr.inits.get(evaluated.len()) {
                    Some(init) => Step::eval(
                        init.clone(),
                        env.clone(),
                        parent.push(ContFrame::UsingInit {
                            expr: Arc::clone(expr),
                            evaluated,
                            env: env.clone(),
                        }),
                    ),
                    None => using_body(&expr.body, env, evaluated, parent),
                }
            }

            ContFrame::UsingBody { values } => {
                let mut failures = release_all(ctx.registry, values).into_iter();
                match failures.next() {
                    None => Step::ret(parent, value),
                    Some(first) => Step::throw(parent, Value::error(first.with_suppressed(failures))),
                }
            }

            ContFrame::DynamicInit {
                expr,
                symbol,
                bound,
                env,
            } => {
                let mut bindings = bound.to_vec();
                bindings.push((*symbol, Cell::new(value)));
                let bindings: Arc<[_]> = bindings.into();
                match expr.bindings.get(bindings.len()) {
                    Some((next, init)) => Step::eval(
                        init.clone(),
                        env.clone(),
                        parent.push(ContFrame::DynamicInit {
                            expr: Arc::clone(expr),
                            symbol: *next,
                            bound: bindings,
                            env: env.clone(),
                        }),
                    ),
                    None => Step::eval(
                        expr.body.clone(),
                        env.clone(),
                        parent.push(ContFrame::DynamicBind { bindings }),
                    ),
                }
            }

            ContFrame::DynamicSet { symbol } => match parent.dynamic_lookup(*symbol) {
                Some(cell) => {
                    cell.set(value);
                    Step::ret(parent, Value::Unspecified)
                }
                None => Step::throw(parent, Value::error(unbound_dynamic(*symbol))),
            },

            ContFrame::MatchSubject { expr, env } => {
                ClauseCursor::start(Arc::clone(expr), value, env.clone()).attempt(parent)
            }

            ContFrame::MatchGuard {
                body,
                clause_env,
                cursor,
            } => {
                if value.is_true() {
                    Step::eval(body.clone(), clause_env.clone(), parent)
                } else {
                    cursor.next().attempt(parent)
                }
            }
        };
        Ok(Bounce::Step(step))
    }

    pub(crate) fn deliver_throw(
        &self,
        value: Value,
        ctx: &RunContext<'_>,
    ) -> Result<Bounce, InternalError> {
        let Some(parent) = self.parent().cloned() else {
            return Ok(Bounce::Done(Outcome::Raised(value)));
        };
        let step = match self.frame() {
            ContFrame::Catch { handler } => Step::apply(handler.clone(), vec![value], parent),
            ContFrame::Wind(winder) => Step::apply(
                winder.after.clone(),
                Vec::new(),
                parent.push(ContFrame::Rethrow(value)),
            ),
            ContFrame::UsingInit {
                evaluated: values, ..
            }
            | ContFrame::UsingBody { values } => {
                Step::throw(parent, release_while_unwinding(ctx, values, value))
            }
            _ => Step::throw(parent, value),
        };
        Ok(Bounce::Step(step))
    }
}

/// Evaluate `exprs[next..]`; the last expression runs in tail position.
pub(crate) fn sequence_from(
    exprs: &Arc<[ExprRef]>,
    next: usize,
    env: Environment,
    k: Continuation,
) -> Step {
    match exprs.get(next) {
        Some(expr) if next + 1 < exprs.len() => {
            let rest = k.push(ContFrame::Sequence {
                exprs: Arc::clone(exprs),
                next: next + 1,
                env: env.clone(),
            });
            Step::eval(expr.clone(), env, rest)
        }
        Some(expr) => Step::eval(expr.clone(), env, k),
        None => Step::ret(k, Value::Unspecified),
    }
}

/// Run a `using` body over `values`, releasing them when it exits.
pub(crate) fn using_body(
    body: &ExprRef,
    env: &Environment,
    values: Vec<Value>,
    k: Continuation,
) -> Step {
    let body_env = env.extend_values(values.iter().cloned());
    Step::eval(
        body.clone(),
        body_env,
        k.push(ContFrame::UsingBody { values }),
    )
}

/// Release `values` while `thrown` propagates.
///
/// The thrown value keeps priority. Release failures are logged, and when the
/// thrown value is an error object they are attached to a copy of it as
/// suppressed errors.
fn release_while_unwinding(ctx: &RunContext<'_>, values: &[Value], thrown: Value) -> Value {
    let failures = release_all(ctx.registry, values);
    if failures.is_empty() {
        return thrown;
    }
    for failure in &failures {
        tracing::warn!(error = %failure, thrown = %thrown, "resource release failed during unwind");
    }
    match thrown.as_error() {
        Some(err) => Value::error(err.clone().with_suppressed(failures)),
        None => thrown,
    }
}
