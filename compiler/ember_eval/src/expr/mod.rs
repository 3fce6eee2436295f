//! Compiled expressions.
//!
//! Produced by `ExprSource::compile`. Variables are `(depth, slot)`
//! addresses into the `Environment`; no name lookup happens at run time
//! except for dynamic variables, which live on the continuation.
//!
//! `eval` performs exactly one step of work: it either produces a value for
//! the continuation or schedules a subexpression under a new frame. It never
//! runs another step itself.

use std::sync::Arc;

use ember_ir::Symbol;

use crate::continuation::{sequence_from, using_body, ContFrame, Continuation};
use crate::environment::{Cell, Environment};
use crate::errors::{unbound_dynamic, InternalError};
use crate::matcher::MatchExpr;
use crate::scope::VarRef;
use crate::trampoline::Step;
use crate::value::{Arity, Closure, Value};

/// Shared handle to a compiled expression.
pub type ExprRef = Arc<Expr>;

pub enum Expr {
    Constant(Value),
    Local(VarRef),
    SetLocal(VarRef, ExprRef),
    If(Arc<IfExpr>),
    /// Non-empty; the last expression is in tail position.
    Sequence(Arc<[ExprRef]>),
    Lambda(Arc<LambdaExpr>),
    Call(Arc<CallExpr>),
    /// Inits run in the outer environment, then one frame holds them all.
    Let(Arc<BindingExpr>),
    /// One frame of cells is created first; inits run inside it, left to
    /// right, each assigned as soon as it is evaluated.
    Letrec(Arc<BindingExpr>),
    /// `handler` is evaluated first; `body` runs with it installed.
    Catch {
        body: ExprRef,
        handler: ExprRef,
    },
    /// Like `Let`, releasing every disposable bound value on exit.
    Using(Arc<BindingExpr>),
    DynamicLet(Arc<DynamicLetExpr>),
    DynamicRef(Symbol),
    DynamicSet(Symbol, ExprRef),
    DynamicBound(Symbol),
    Match(Arc<MatchExpr>),
}

pub struct IfExpr {
    pub(crate) test: ExprRef,
    pub(crate) then: ExprRef,
    pub(crate) otherwise: ExprRef,
}

/// A `lambda` after free-variable analysis.
pub struct LambdaExpr {
    /// Outer addresses of the captured cells, in captured-frame order.
    pub(crate) captures: Box<[VarRef]>,
    pub(crate) arity: Arity,
    pub(crate) body: ExprRef,
    pub(crate) name: Option<Symbol>,
}

pub struct CallExpr {
    pub(crate) operator: ExprRef,
    pub(crate) operands: Box<[ExprRef]>,
}

pub struct BindingExpr {
    pub(crate) inits: Box<[ExprRef]>,
    pub(crate) body: ExprRef,
}

pub struct DynamicLetExpr {
    pub(crate) bindings: Box<[(Symbol, ExprRef)]>,
    pub(crate) body: ExprRef,
}

impl LambdaExpr {
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Number of cells the closure copies from its defining environment.
    pub fn capture_count(&self) -> usize {
        self.captures.len()
    }
}

/// Evaluate `expr` in `env`, delivering to `k`.
pub(crate) fn eval(expr: &ExprRef, env: Environment, k: Continuation) -> Result<Step, InternalError> {
    let step = match &**expr {
        Expr::Constant(value) => Step::ret(k, value.clone()),

        Expr::Local(var) => Step::ret(k, env.get(*var)?),

        Expr::SetLocal(var, value) => {
            let k = k.push(ContFrame::SetLocal {
                var: *var,
                env: env.clone(),
            });
            Step::eval(value.clone(), env, k)
        }

        Expr::If(branch) => {
            let k = k.push(ContFrame::If {
                then: branch.then.clone(),
                otherwise: branch.otherwise.clone(),
                env: env.clone(),
            });
            Step::eval(branch.test.clone(), env, k)
        }

        Expr::Sequence(exprs) => sequence_from(exprs, 0, env, k),

        Expr::Lambda(lambda) => {
            let cells = lambda
                .captures
                .iter()
                .map(|&var| env.cell(var).cloned())
                .collect::<Result<Vec<Cell>, _>>()?;
            let closure = Closure {
                lambda: Arc::clone(lambda),
                env: Environment::empty().extend(cells),
            };
            Step::ret(k, Value::closure(closure))
        }

        Expr::Call(call) => {
            let k = k.push(ContFrame::Call {
                call: Arc::clone(call),
                evaluated: Vec::with_capacity(call.operands.len() + 1),
                env: env.clone(),
            });
            Step::eval(call.operator.clone(), env, k)
        }

        Expr::Let(binding) => match binding.inits.first() {
            Some(init) => {
                let k = k.push(ContFrame::Let {
                    expr: Arc::clone(binding),
                    evaluated: Vec::with_capacity(binding.inits.len()),
                    env: env.clone(),
                });
                Step::eval(init.clone(), env, k)
            }
            None => Step::eval(binding.body.clone(), env.extend(Vec::new()), k),
        },

        Expr::Letrec(binding) => {
            let cells = (0..binding.inits.len())
                .map(|_| Cell::new(Value::Unspecified))
                .collect();
            let env = env.extend(cells);
            match binding.inits.first() {
                Some(init) => {
                    let k = k.push(ContFrame::Letrec {
                        expr: Arc::clone(binding),
                        index: 0,
                        env: env.clone(),
                    });
                    Step::eval(init.clone(), env, k)
                }
                None => Step::eval(binding.body.clone(), env, k),
            }
        }

        Expr::Catch { body, handler } => {
            let k = k.push(ContFrame::CatchInstall {
                body: body.clone(),
                env: env.clone(),
            });
            Step::eval(handler.clone(), env, k)
        }

        Expr::Using(binding) => match binding.inits.first() {
            Some(init) => {
                let k = k.push(ContFrame::UsingInit {
                    expr: Arc::clone(binding),
                    evaluated: Vec::with_capacity(binding.inits.len()),
                    env: env.clone(),
                });
                Step::eval(init.clone(), env, k)
            }
            None => using_body(&binding.body, &env, Vec::new(), k),
        },

        Expr::DynamicLet(dynamic) => match dynamic.bindings.first() {
            Some((symbol, init)) => {
                let k = k.push(ContFrame::DynamicInit {
                    expr: Arc::clone(dynamic),
                    symbol: *symbol,
                    bound: Arc::from(Vec::new()),
                    env: env.clone(),
                });
                Step::eval(init.clone(), env, k)
            }
            None => Step::eval(dynamic.body.clone(), env, k),
        },

        Expr::DynamicRef(symbol) => match k.dynamic_lookup(*symbol) {
            Some(cell) => Step::ret(k, cell.get()),
            None => Step::throw(k, Value::error(unbound_dynamic(*symbol))),
        },

        Expr::DynamicSet(symbol, value) => {
            let k = k.push(ContFrame::DynamicSet { symbol: *symbol });
            Step::eval(value.clone(), env, k)
        }

        Expr::DynamicBound(symbol) => {
            let bound = k.dynamic_lookup(*symbol).is_some();
            Step::ret(k, Value::Bool(bound))
        }

        Expr::Match(matcher) => {
            let k = k.push(ContFrame::MatchSubject {
                expr: Arc::clone(matcher),
                env: env.clone(),
            });
            Step::eval(matcher.subject.clone(), env, k)
        }
    };
    Ok(step)
}
