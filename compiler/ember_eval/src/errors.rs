//! Error types for compilation and evaluation.
//!
//! Three families, matching how far each one is allowed to travel:
//!
//! - [`EvalError`]: runtime type/arity errors. These are ordinary Scheme values
//!   (`Value::Error`) thrown through the continuation chain and catchable by
//!   `catch`. Built through the `#[cold]` factory functions below.
//! - [`CompileError`]: produced by `ExprSource::compile` when a source tree
//!   cannot be resolved against a scope descriptor.
//! - [`InternalError`]: invariant violations inside the core (slot shape,
//!   association misuse). Returned out of the trampoline as [`Fault::Internal`];
//!   user code never sees them.

use std::fmt;

use ember_ir::Symbol;

use crate::resource::ResourceHandle;
use crate::value::Value;

/// Typed runtime error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Dynamic variable referenced or assigned outside any binding of it.
    UnboundDynamic { name: String },
    ArityMismatch {
        name: String,
        expected: String,
        got: usize,
    },
    NotCallable { type_name: String },
    WrongArgType {
        name: String,
        expected: String,
        got: String,
    },
    /// Raised by the `error` procedure.
    User { message: String },
    /// A disposable resource failed while being released.
    ReleaseFailed { handle: ResourceHandle, reason: String },
    /// Release requested for a handle the registry does not know.
    UnknownResource { handle: ResourceHandle },
    Custom { message: String },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnboundDynamic { name } => write!(f, "unbound dynamic variable: {name}"),
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                if name.is_empty() {
                    write!(f, "expected {expected} arguments, got {got}")
                } else {
                    write!(f, "{name} expects {expected} arguments, got {got}")
                }
            }
            Self::NotCallable { type_name } => write!(f, "{type_name} is not callable"),
            Self::WrongArgType {
                name,
                expected,
                got,
            } => write!(f, "{name} expects a {expected} argument, got {got}"),
            Self::User { message } | Self::Custom { message } => f.write_str(message),
            Self::ReleaseFailed { handle, reason } => {
                write!(f, "releasing {handle} failed: {reason}")
            }
            Self::UnknownResource { handle } => write!(f, "unknown resource {handle}"),
        }
    }
}

/// Runtime error object, carried as `Value::Error`.
#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable message; equals `kind.to_string()`.
    pub message: String,
    /// Extra values attached by `(error msg irritant ...)`.
    pub irritants: Vec<Value>,
    /// Secondary failures that occurred while this error was propagating,
    /// e.g. resources that failed to release during unwind.
    pub suppressed: Vec<EvalError>,
}

impl EvalError {
    /// Create an error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_kind(EvalErrorKind::Custom {
            message: message.into(),
        })
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            irritants: Vec::new(),
            suppressed: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_irritants(mut self, irritants: Vec<Value>) -> Self {
        self.irritants = irritants;
        self
    }

    #[must_use]
    pub fn with_suppressed(mut self, suppressed: impl IntoIterator<Item = EvalError>) -> Self {
        self.suppressed.extend(suppressed);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for irritant in &self.irritants {
            write!(f, " {irritant}")?;
        }
        Ok(())
    }
}

/// Dynamic variable not bound in the current continuation.
#[cold]
pub fn unbound_dynamic(name: Symbol) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnboundDynamic {
        name: name.to_string(),
    })
}

/// Wrong number of arguments.
#[cold]
pub fn arity_mismatch(name: &str, expected: impl fmt::Display, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected: expected.to_string(),
        got,
    })
}

#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn wrong_arg_type(name: &str, expected: &str, got: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::WrongArgType {
        name: name.to_string(),
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    })
}

/// Error raised by the `error` procedure.
#[cold]
pub fn user_error(message: impl Into<String>, irritants: Vec<Value>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::User {
        message: message.into(),
    })
    .with_irritants(irritants)
}

#[cold]
pub fn release_failed(handle: ResourceHandle, reason: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ReleaseFailed {
        handle,
        reason: reason.into(),
    })
}

#[cold]
pub fn unknown_resource(handle: ResourceHandle) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownResource { handle })
}

/// A source tree that cannot be compiled against its scope descriptor.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("unbound variable: {0}")]
    UnboundVariable(Symbol),
    #[error("{0} is bound more than once in the same scope")]
    DuplicateBinding(Symbol),
    #[error("pattern variable {0} appears more than once in one clause")]
    DuplicatePatternVariable(Symbol),
}

/// Which side of a capture-then-attach session an association was pinned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationRole {
    CaptureMark,
    AttachBase,
}

impl fmt::Display for AssociationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssociationRole::CaptureMark => f.write_str("capture mark"),
            AssociationRole::AttachBase => f.write_str("attach base"),
        }
    }
}

/// Invariant violation inside the evaluator core.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    #[error("environment has no frame at depth {depth}")]
    FrameOutOfRange { depth: usize },
    #[error("slot {slot} out of range for frame of {len} cells at depth {depth}")]
    SlotOutOfRange { depth: usize, slot: usize, len: usize },
    #[error("match binding slot {slot} out of range for clause with {len} slots")]
    BindingSlotOutOfRange { slot: usize, len: usize },
    #[error("capture mark is not an ancestor of the captured continuation")]
    MarkNotAncestor,
    #[error("association already pinned to a different {0}")]
    AssociationMismatch(AssociationRole),
}

/// Why a trampoline run stopped without producing an [`Outcome`](crate::Outcome).
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error("step budget of {budget} exhausted")]
    StepBudgetExceeded { budget: u64 },
}

#[cfg(test)]
mod tests;
