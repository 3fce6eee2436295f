//! Runtime values.
//!
//! Every heap-allocated variant goes through [`Heap`], whose constructor is
//! crate-private; outside code builds values with the factory methods below.
//!
//! ```text
//! let pair = Value::cons(Value::Int(1), Value::Null);   // OK
//! let list = Value::list([Value::symbol("a")]);          // OK
//! let pair = Value::Pair(Heap::new(...));                 // ERROR: Heap::new is pub(crate)
//! ```
//!
//! All shared state is `Arc`-based so values, and the continuations holding
//! them, can move between threads.

mod heap;
mod procedure;

use std::fmt;
use std::sync::Arc;

use ember_ir::Symbol;
use ember_stack::ensure_sufficient_stack;

use crate::errors::EvalError;
use crate::resource::ResourceHandle;

pub use heap::Heap;
pub use procedure::{
    Arity, Closure, ContinuationMode, ContinuationProcedure, ControlPrimitive, NativeFn,
    NativeProcedure, Procedure,
};

/// A pair; immutable once built.
pub struct Pair {
    pub car: Value,
    pub cdr: Value,
}

// Long lists would otherwise drop recursively through `cdr`.
impl Drop for Pair {
    fn drop(&mut self) {
        let mut next = std::mem::replace(&mut self.cdr, Value::Null);
        while let Value::Pair(heap) = next {
            match heap.try_unwrap() {
                Ok(mut pair) => next = std::mem::replace(&mut pair.cdr, Value::Null),
                Err(_) => break,
            }
        }
    }
}

/// Runtime value.
#[derive(Clone)]
pub enum Value {
    /// Result of forms whose value is unspecified (`(if #f #f)`, an empty match).
    Unspecified,
    /// The empty list.
    Null,
    Bool(bool),
    /// Fixnum. The numeric tower lives outside the core.
    Int(i64),
    Char(char),
    Str(Heap<str>),
    Symbol(Symbol),
    Pair(Heap<Pair>),
    Vector(Heap<Vec<Value>>),
    Procedure(Procedure),
    /// Error object thrown by the runtime or by `error`.
    Error(Heap<EvalError>),
    /// Handle of a disposable resource owned by a `ResourceRegistry`.
    Resource(ResourceHandle),
}

// Factory Methods (ONLY way to construct heap values)

impl Value {
    #[inline]
    pub fn symbol(name: &str) -> Self {
        Value::Symbol(Symbol::intern(name))
    }

    pub fn string(s: &str) -> Self {
        Value::Str(Heap::from_arc(Arc::from(s)))
    }

    pub fn cons(car: Value, cdr: Value) -> Self {
        Value::Pair(Heap::new(Pair { car, cdr }))
    }

    /// Proper list of `items`.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        Self::list_with_tail(items, Value::Null)
    }

    /// List of `items` ending in `tail` instead of `()`.
    pub fn list_with_tail<I>(items: I, tail: Value) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Value::cons(item, acc))
    }

    pub fn vector(items: Vec<Value>) -> Self {
        Value::Vector(Heap::new(items))
    }

    pub fn error(err: EvalError) -> Self {
        Value::Error(Heap::new(err))
    }

    /// Wrap a host function as a procedure value.
    pub fn native(
        name: impl Into<String>,
        arity: Arity,
        func: impl Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Value::Procedure(Procedure::Native(Heap::new(NativeProcedure::new(
            name, arity, func,
        ))))
    }

    pub(crate) fn closure(closure: Closure) -> Self {
        Value::Procedure(Procedure::Closure(Heap::new(closure)))
    }

    pub(crate) fn continuation(procedure: ContinuationProcedure) -> Self {
        Value::Procedure(Procedure::Continuation(Heap::new(procedure)))
    }
}

impl Value {
    /// Everything except `#f` counts as true.
    #[inline]
    pub fn is_true(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unspecified => "unspecified",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Pair(_) => "pair",
            Value::Vector(_) => "vector",
            Value::Procedure(_) => "procedure",
            Value::Error(_) => "error",
            Value::Resource(_) => "resource",
        }
    }

    pub fn as_pair(&self) -> Option<&Pair> {
        match self {
            Value::Pair(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&EvalError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Elements of a proper list, or `None` for improper lists and non-lists.
    pub fn list_to_vec(&self) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        let mut cursor = self;
        loop {
            match cursor {
                Value::Null => return Some(items),
                Value::Pair(p) => {
                    items.push(p.car.clone());
                    cursor = &p.cdr;
                }
                _ => return None,
            }
        }
    }

    /// `eqv?`: value equality for immediates, identity for heap objects.
    pub fn eqv(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unspecified, Value::Unspecified) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Resource(a), Value::Resource(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Heap::ptr_eq(a, b),
            (Value::Pair(a), Value::Pair(b)) => Heap::ptr_eq(a, b),
            (Value::Vector(a), Value::Vector(b)) => Heap::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Heap::ptr_eq(a, b),
            (Value::Procedure(a), Value::Procedure(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// `equal?`: structural equality over pairs, vectors and strings.
    pub fn equal(&self, other: &Value) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            match (a, b) {
                (Value::Pair(x), Value::Pair(y)) => {
                    if Heap::ptr_eq(x, y) {
                        return true;
                    }
                    if !ensure_sufficient_stack(|| x.car.equal(&y.car)) {
                        return false;
                    }
                    a = &x.cdr;
                    b = &y.cdr;
                }
                (Value::Str(x), Value::Str(y)) => return **x == **y,
                (Value::Vector(x), Value::Vector(y)) => {
                    return x.len() == y.len()
                        && x.iter()
                            .zip(y.iter())
                            .all(|(l, r)| ensure_sufficient_stack(|| l.equal(r)));
                }
                _ => return a.eqv(b),
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

/// Scheme external representation (`write` style).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unspecified => f.write_str("#<unspecified>"),
            Value::Null => f.write_str("()"),
            Value::Bool(true) => f.write_str("#t"),
            Value::Bool(false) => f.write_str("#f"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Char(' ') => f.write_str("#\\space"),
            Value::Char('\n') => f.write_str("#\\newline"),
            Value::Char(c) => write!(f, "#\\{c}"),
            Value::Str(s) => write!(f, "{:?}", &**s),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Pair(p) => {
                f.write_str("(")?;
                ensure_sufficient_stack(|| write!(f, "{}", p.car))?;
                let mut rest = &p.cdr;
                loop {
                    match rest {
                        Value::Null => break,
                        Value::Pair(next) => {
                            f.write_str(" ")?;
                            ensure_sufficient_stack(|| write!(f, "{}", next.car))?;
                            rest = &next.cdr;
                        }
                        tail => {
                            write!(f, " . {tail}")?;
                            break;
                        }
                    }
                }
                f.write_str(")")
            }
            Value::Vector(items) => {
                f.write_str("#(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    ensure_sufficient_stack(|| write!(f, "{item}"))?;
                }
                f.write_str(")")
            }
            Value::Procedure(p) => write!(f, "#<procedure {}>", p.name()),
            Value::Error(e) => write!(f, "#<error {:?}>", e.message),
            Value::Resource(h) => write!(f, "#<{h}>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// `equal?` semantics, so tests can compare values with `assert_eq!`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

#[cfg(test)]
mod tests;
