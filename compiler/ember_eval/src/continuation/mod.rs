//! Continuations: the rest of the computation as a linked chain of frames.
//!
//! A `Continuation` is an immutable node holding one [`ContFrame`] and a
//! link to its parent. Evaluation never mutates a node; receiving a value
//! either hands it to the parent or pushes a fresh node onto the parent.
//! This is what lets a captured continuation be resumed any number of times.
//!
//! Frames never hold their ancestors. A frame that needs "the continuation
//! below me" uses its node's parent, so a chain rebuilt on a different base
//! by `PartialContinuation::attach` behaves exactly like the original. The
//! one exception is `Transition`, a jump in progress, which holds the chains
//! it moves between.
//!
//! The only parentless node is the root (`Halt`). Values and thrown values
//! reaching it end the run.

mod deliver;
mod invoke;
mod partial;

use std::fmt;
use std::sync::Arc;

use ember_ir::{Symbol, SymbolSet};

use crate::environment::{Cell, Environment};
use crate::expr::{BindingExpr, CallExpr, DynamicLetExpr, ExprRef};
use crate::matcher::{ClauseCursor, MatchExpr};
use crate::scope::VarRef;
use crate::trampoline::Step;
use crate::value::Value;

pub(crate) use deliver::{sequence_from, using_body};
pub(crate) use invoke::{invoke, reify};
use invoke::{continue_jump, Jump};
pub use partial::{Association, PartialContinuation};

/// The `before` and `after` thunks of one `dynamic-wind` activation.
///
/// Compared by identity: frames copied by capture and attach share their
/// `Winder`, which is how a continuation jump recognizes the winds it does
/// not leave.
pub(crate) struct Winder {
    pub(crate) before: Value,
    pub(crate) after: Value,
}

/// Ordered dynamic bindings; later entries shadow earlier ones.
pub(crate) type DynamicBindings = Arc<[(Symbol, Cell)]>;

/// What a continuation node does with the value it receives.
#[derive(Clone)]
pub(crate) enum ContFrame {
    /// End of the run.
    Halt,
    /// Delimiter for captured continuations.
    Prompt,
    If {
        then: ExprRef,
        otherwise: ExprRef,
        env: Environment,
    },
    /// Evaluate `exprs[next..]`, the last one in tail position.
    Sequence {
        exprs: Arc<[ExprRef]>,
        next: usize,
        env: Environment,
    },
    SetLocal {
        var: VarRef,
        env: Environment,
    },
    /// Operator and operands evaluated so far, in order.
    Call {
        call: Arc<CallExpr>,
        evaluated: Vec<Value>,
        env: Environment,
    },
    Let {
        expr: Arc<BindingExpr>,
        evaluated: Vec<Value>,
        env: Environment,
    },
    /// `env` is the recursive frame; `index` is the slot being initialized.
    Letrec {
        expr: Arc<BindingExpr>,
        index: usize,
        env: Environment,
    },
    /// Handler expression evaluated; the body runs next.
    CatchInstall {
        body: ExprRef,
        env: Environment,
    },
    Catch {
        handler: Value,
    },
    /// `before` has run; run `thunk` inside the wind.
    WindEnter {
        winder: Arc<Winder>,
        thunk: Value,
    },
    Wind(Arc<Winder>),
    /// Discard the received value and return the saved one.
    ReturnValue(Value),
    /// Discard the received value and throw the saved one.
    Rethrow(Value),
    /// A wind transition of `jump` has finished; run the one at `next`.
    Transition {
        jump: Arc<Jump>,
        next: usize,
    },
    /// Resource bindings evaluated so far.
    UsingInit {
        expr: Arc<BindingExpr>,
        evaluated: Vec<Value>,
        env: Environment,
    },
    /// Release `values` when the body exits.
    UsingBody {
        values: Vec<Value>,
    },
    /// Evaluating the init for `symbol`, with `bound` already in effect.
    DynamicInit {
        expr: Arc<DynamicLetExpr>,
        symbol: Symbol,
        bound: DynamicBindings,
        env: Environment,
    },
    DynamicBind {
        bindings: DynamicBindings,
    },
    DynamicSet {
        symbol: Symbol,
    },
    MatchSubject {
        expr: Arc<MatchExpr>,
        env: Environment,
    },
    /// Guard of the clause at `cursor` is running in `clause_env`.
    MatchGuard {
        body: ExprRef,
        clause_env: Environment,
        cursor: ClauseCursor,
    },
}

impl ContFrame {
    fn dynamic_bindings(&self) -> Option<&DynamicBindings> {
        match self {
            ContFrame::DynamicInit { bound, .. } => Some(bound),
            ContFrame::DynamicBind { bindings } => Some(bindings),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ContFrame::Halt => "halt",
            ContFrame::Prompt => "prompt",
            ContFrame::If { .. } => "if",
            ContFrame::Sequence { .. } => "begin",
            ContFrame::SetLocal { .. } => "set!",
            ContFrame::Call { .. } => "call",
            ContFrame::Let { .. } => "let",
            ContFrame::Letrec { .. } => "letrec",
            ContFrame::CatchInstall { .. } => "catch-install",
            ContFrame::Catch { .. } => "catch",
            ContFrame::WindEnter { .. } => "wind-enter",
            ContFrame::Wind(_) => "wind",
            ContFrame::ReturnValue(_) => "return-value",
            ContFrame::Rethrow(_) => "rethrow",
            ContFrame::Transition { .. } => "transition",
            ContFrame::UsingInit { .. } => "using-init",
            ContFrame::UsingBody { .. } => "using",
            ContFrame::DynamicInit { .. } => "dynamic-init",
            ContFrame::DynamicBind { .. } => "dynamic-let",
            ContFrame::DynamicSet { .. } => "dynamic-set!",
            ContFrame::MatchSubject { .. } => "match",
            ContFrame::MatchGuard { .. } => "match-guard",
        }
    }
}

struct ContNode {
    frame: ContFrame,
    parent: Option<Continuation>,
    /// Nearest proper ancestor carrying dynamic bindings.
    dynamic: Option<Continuation>,
}

// Deep non-tail recursion builds long chains; dropping them must not recurse.
impl Drop for ContNode {
    fn drop(&mut self) {
        drop(self.dynamic.take());
        let mut next = self.parent.take();
        while let Some(k) = next {
            next = match Arc::try_unwrap(k.0) {
                Ok(mut node) => {
                    drop(node.dynamic.take());
                    node.parent.take()
                }
                Err(_) => None,
            };
        }
    }
}

/// The rest of a computation.
#[derive(Clone)]
pub struct Continuation(Arc<ContNode>);

impl Continuation {
    /// A fresh root: values delivered here end the run.
    pub fn root() -> Self {
        Continuation(Arc::new(ContNode {
            frame: ContFrame::Halt,
            parent: None,
            dynamic: None,
        }))
    }

    /// This continuation under a prompt, delimiting captures made below it.
    #[must_use]
    pub fn prompt(&self) -> Self {
        self.push(ContFrame::Prompt)
    }

    pub(crate) fn push(&self, frame: ContFrame) -> Self {
        let dynamic = if self.0.frame.dynamic_bindings().is_some() {
            Some(self.clone())
        } else {
            self.0.dynamic.clone()
        };
        Continuation(Arc::new(ContNode {
            frame,
            parent: Some(self.clone()),
            dynamic,
        }))
    }

    #[inline]
    pub(crate) fn frame(&self) -> &ContFrame {
        &self.0.frame
    }

    pub fn parent(&self) -> Option<&Continuation> {
        self.0.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Thunk run when control re-enters this node from outside.
    pub fn entry_action(&self) -> Option<&Value> {
        match &self.0.frame {
            ContFrame::Wind(winder) => Some(&winder.before),
            _ => None,
        }
    }

    /// Thunk run when control leaves this node other than by returning.
    pub fn exit_action(&self) -> Option<&Value> {
        match &self.0.frame {
            ContFrame::Wind(winder) => Some(&winder.after),
            _ => None,
        }
    }

    /// Innermost dynamic binding of `symbol` in effect at this continuation.
    pub fn dynamic_lookup(&self, symbol: Symbol) -> Option<Cell> {
        let mut current = if self.0.frame.dynamic_bindings().is_some() {
            Some(self)
        } else {
            self.0.dynamic.as_ref()
        };
        while let Some(k) = current {
            if let Some(bindings) = k.0.frame.dynamic_bindings() {
                if let Some((_, cell)) = bindings.iter().rev().find(|(s, _)| *s == symbol) {
                    return Some(cell.clone());
                }
            }
            current = k.0.dynamic.as_ref();
        }
        None
    }

    /// Every dynamic variable bound at this continuation.
    pub fn dynamic_environment(&self) -> SymbolSet {
        let mut names = SymbolSet::new();
        let mut current = if self.0.frame.dynamic_bindings().is_some() {
            Some(self)
        } else {
            self.0.dynamic.as_ref()
        };
        while let Some(k) = current {
            if let Some(bindings) = k.0.frame.dynamic_bindings() {
                for (symbol, _) in bindings.iter() {
                    names.insert(*symbol);
                }
            }
            current = k.0.dynamic.as_ref();
        }
        names
    }

    /// Step delivering `value` to this continuation.
    pub fn return_value(&self, value: Value) -> Step {
        Step::ret(self.clone(), value)
    }

    /// Step delivering a thrown `value` to this continuation.
    pub fn throw(&self, value: Value) -> Step {
        Step::throw(self.clone(), value)
    }

    /// Nearest enclosing prompt, or the root if there is none.
    pub(crate) fn nearest_prompt(&self) -> Continuation {
        let mut current = self;
        loop {
            match (&current.0.frame, current.parent()) {
                (ContFrame::Prompt, _) | (_, None) => return current.clone(),
                (_, Some(parent)) => current = parent,
            }
        }
    }

    /// Number of nodes from here to the root, inclusive.
    pub fn depth(&self) -> usize {
        self.nodes().count()
    }

    pub fn ptr_eq(a: &Continuation, b: &Continuation) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0).cast()
    }

    fn nodes(&self) -> impl Iterator<Item = &Continuation> {
        let mut current = Some(self);
        std::iter::from_fn(move || {
            let k = current?;
            current = k.parent();
            Some(k)
        })
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes().map(|k| k.0.frame.name()))
            .finish()
    }
}
