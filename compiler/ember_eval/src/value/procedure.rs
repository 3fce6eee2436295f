//! Callable values.

use std::fmt;
use std::sync::Arc;

use super::{Heap, Value};
use crate::continuation::PartialContinuation;
use crate::environment::Environment;
use crate::errors::{arity_mismatch, EvalError};
use crate::expr::LambdaExpr;

/// Number of arguments a procedure accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arity {
    pub required: usize,
    /// Whether surplus arguments are collected into a rest list.
    pub rest: bool,
}

impl Arity {
    pub const fn exactly(required: usize) -> Self {
        Arity {
            required,
            rest: false,
        }
    }

    pub const fn at_least(required: usize) -> Self {
        Arity {
            required,
            rest: true,
        }
    }

    #[inline]
    pub fn accepts(self, count: usize) -> bool {
        if self.rest {
            count >= self.required
        } else {
            count == self.required
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rest {
            write!(f, "at least {}", self.required)
        } else {
            write!(f, "{}", self.required)
        }
    }
}

/// Host function signature for native procedures.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A procedure implemented by the host.
///
/// Native procedures run to completion inside a single trampoline step: they
/// cannot capture continuations or call back into Scheme. An `Err` result is
/// thrown to the caller's continuation as an error object.
pub struct NativeProcedure {
    pub name: String,
    pub arity: Arity,
    func: Box<NativeFn>,
}

impl NativeProcedure {
    pub fn new(
        name: impl Into<String>,
        arity: Arity,
        func: impl Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        NativeProcedure {
            name: name.into(),
            arity,
            func: Box::new(func),
        }
    }

    /// Call the host function; a wrong argument count is an arity error.
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        if !self.arity.accepts(args.len()) {
            return Err(arity_mismatch(&self.name, self.arity, args.len()));
        }
        (self.func)(args)
    }
}

/// A `lambda` closed over the cells it needs.
///
/// `env` is a single frame holding exactly the lambda's captured cells, in
/// the order its scope descriptor assigned them.
pub struct Closure {
    pub(crate) lambda: Arc<LambdaExpr>,
    pub(crate) env: Environment,
}

impl Closure {
    pub fn arity(&self) -> Arity {
        self.lambda.arity
    }

    pub fn name(&self) -> Option<&str> {
        self.lambda.name.map(ember_ir::Symbol::name)
    }
}

/// Procedures that need the caller's continuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlPrimitive {
    /// `call/cc`: escape-and-reenter continuation, delimited by the nearest prompt.
    CallCc,
    /// `call-with-composable-continuation`: invoking the result extends the
    /// invoker's continuation instead of replacing it.
    CallComposable,
    /// `call-with-prompt`: run a thunk under a continuation delimiter.
    CallWithPrompt,
    /// `dynamic-wind`.
    DynamicWind,
    Apply,
    /// `raise`: throw any value.
    Raise,
}

impl ControlPrimitive {
    pub const ALL: [ControlPrimitive; 6] = [
        ControlPrimitive::CallCc,
        ControlPrimitive::CallComposable,
        ControlPrimitive::CallWithPrompt,
        ControlPrimitive::DynamicWind,
        ControlPrimitive::Apply,
        ControlPrimitive::Raise,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ControlPrimitive::CallCc => "call/cc",
            ControlPrimitive::CallComposable => "call-with-composable-continuation",
            ControlPrimitive::CallWithPrompt => "call-with-prompt",
            ControlPrimitive::DynamicWind => "dynamic-wind",
            ControlPrimitive::Apply => "apply",
            ControlPrimitive::Raise => "raise",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            ControlPrimitive::CallCc
            | ControlPrimitive::CallComposable
            | ControlPrimitive::CallWithPrompt
            | ControlPrimitive::Raise => Arity::exactly(1),
            ControlPrimitive::DynamicWind => Arity::exactly(3),
            ControlPrimitive::Apply => Arity::at_least(2),
        }
    }
}

/// How an invoked continuation relates to the invoker's continuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContinuationMode {
    /// Abandon the invoker's continuation up to its nearest prompt.
    Escape,
    /// Run the captured frames on top of the invoker's continuation.
    Composable,
}

/// A first-class continuation: a detached template plus its invocation mode.
pub struct ContinuationProcedure {
    pub(crate) template: PartialContinuation,
    pub(crate) mode: ContinuationMode,
}

impl ContinuationProcedure {
    pub fn mode(&self) -> ContinuationMode {
        self.mode
    }

    pub fn template(&self) -> &PartialContinuation {
        &self.template
    }
}

#[derive(Clone)]
pub enum Procedure {
    Closure(Heap<Closure>),
    Native(Heap<NativeProcedure>),
    Control(ControlPrimitive),
    Continuation(Heap<ContinuationProcedure>),
}

impl Procedure {
    pub fn name(&self) -> String {
        match self {
            Procedure::Closure(c) => c.name().unwrap_or("anonymous").to_string(),
            Procedure::Native(n) => n.name.clone(),
            Procedure::Control(c) => c.name().to_string(),
            Procedure::Continuation(_) => "continuation".to_string(),
        }
    }

    pub fn ptr_eq(&self, other: &Procedure) -> bool {
        match (self, other) {
            (Procedure::Closure(a), Procedure::Closure(b)) => Heap::ptr_eq(a, b),
            (Procedure::Native(a), Procedure::Native(b)) => Heap::ptr_eq(a, b),
            (Procedure::Control(a), Procedure::Control(b)) => a == b,
            (Procedure::Continuation(a), Procedure::Continuation(b)) => Heap::ptr_eq(a, b),
            _ => false,
        }
    }
}
