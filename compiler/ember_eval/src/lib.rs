//! Ember Eval - continuation-passing evaluator core for the Ember runtime.
//!
//! This crate runs compiled Scheme expressions on a trampoline with
//! first-class, reified continuations.
//!
//! # Architecture
//!
//! - `ExprSource`: analyzer output; knows its free variables and compiles
//!   against a `ScopeDescriptor` into an `Expr` addressing `(depth, slot)`
//! - `Environment`: immutable chain of fixed-size frames of shared `Cell`s
//! - `Continuation`: immutable chain of frames; the only place a run ends
//!   is a parentless root
//! - `PartialContinuation`: base-independent copy of a continuation
//!   segment, captured and reattached through an `Association`
//! - `Step`: one unit of work; `Evaluator::drive` is the only loop
//! - `Pattern`: dual-continuation matcher behind `match`
//! - `ResourceRegistry`: capability `using` releases disposables through
//!
//! # Example
//!
//! ```text
//! let toplevel = Toplevel::standard();
//! let expr = toplevel.compile(&ExprSource::call_var("+", vec![ExprSource::int(1), ExprSource::int(2)]))?;
//! let outcome = Evaluator::new().evaluate(&expr, &toplevel.environment())?;
//! assert_eq!(outcome, Outcome::Value(Value::Int(3)));
//! ```

mod apply;
mod builtins;
mod continuation;
mod environment;
pub mod errors;
mod eval_mode;
mod evaluator;
mod expr;
mod matcher;
mod resource;
mod scope;
mod source;
mod toplevel;
mod trampoline;
mod value;

pub use builtins::standard_procedures;
pub use continuation::{Association, Continuation, PartialContinuation};
pub use environment::{Cell, Environment};
pub use errors::{CompileError, EvalError, EvalErrorKind, Fault, InternalError};
pub use eval_mode::EvalMode;
pub use evaluator::{Completion, Evaluator, EvaluatorBuilder};
pub use expr::{Expr, ExprRef, LambdaExpr};
pub use matcher::Pattern;
pub use resource::{Disposable, HandleRegistry, ResourceHandle, ResourceRegistry};
pub use scope::{ScopeDescriptor, VarRef};
pub use source::{Binding, ClauseSource, ExprSource, LambdaSource, PatternSource};
pub use toplevel::Toplevel;
pub use trampoline::{Outcome, Step};
pub use value::{
    Arity, Closure, ContinuationMode, ContinuationProcedure, ControlPrimitive, Heap, NativeFn,
    NativeProcedure, Pair, Procedure, Value,
};

pub use ember_ir::{Symbol, SymbolSet};
