//! Expression sources: the syntax analyzer's output, before slot assignment.
//!
//! A source tree knows its free variables ([`ExprSource::requirements`]) and
//! compiles against a [`ScopeDescriptor`] into an [`ExprRef`] that refers to
//! variables only by `(depth, slot)`.
//!
//! The constructors below are what an analyzer (or a test) uses to build
//! trees without spelling out every `Box`:
//!
//! ```text
//! // (let ((x 1)) (+ x 2))
//! ExprSource::let_(
//!     vec![("x", ExprSource::int(1))],
//!     ExprSource::call_var("+", vec![ExprSource::var("x"), ExprSource::int(2)]),
//! )
//! ```

mod compile;

use ember_ir::Symbol;

use crate::value::Value;

/// A `(name init)` pair of a binding form.
pub type Binding = (Symbol, ExprSource);

#[derive(Clone, Debug)]
pub struct LambdaSource {
    pub name: Option<Symbol>,
    pub params: Vec<Symbol>,
    /// Collects surplus arguments as a list.
    pub rest: Option<Symbol>,
    pub body: Box<ExprSource>,
}

#[derive(Clone, Debug)]
pub struct ClauseSource {
    pub pattern: PatternSource,
    /// `None` behaves like a guard of `#t`.
    pub guard: Option<ExprSource>,
    pub body: ExprSource,
}

#[derive(Clone, Debug)]
pub enum PatternSource {
    Literal(Value),
    Variable(Symbol),
    /// `_`
    Wildcard,
    Pair(Box<PatternSource>, Box<PatternSource>),
}

#[derive(Clone, Debug)]
pub enum ExprSource {
    /// Self-evaluating datum or `quote`.
    Constant(Value),
    Variable(Symbol),
    Set {
        name: Symbol,
        value: Box<ExprSource>,
    },
    If {
        test: Box<ExprSource>,
        then: Box<ExprSource>,
        otherwise: Option<Box<ExprSource>>,
    },
    Begin(Vec<ExprSource>),
    Lambda(LambdaSource),
    Call {
        operator: Box<ExprSource>,
        operands: Vec<ExprSource>,
    },
    Let {
        bindings: Vec<Binding>,
        body: Box<ExprSource>,
    },
    LetStar {
        bindings: Vec<Binding>,
        body: Box<ExprSource>,
    },
    Letrec {
        bindings: Vec<Binding>,
        body: Box<ExprSource>,
    },
    /// `(catch body handler)`: `handler` evaluates to a one-argument
    /// procedure receiving anything thrown out of `body`.
    Catch {
        body: Box<ExprSource>,
        handler: Box<ExprSource>,
    },
    Using {
        bindings: Vec<Binding>,
        body: Box<ExprSource>,
    },
    UsingStar {
        bindings: Vec<Binding>,
        body: Box<ExprSource>,
    },
    DynamicLet {
        bindings: Vec<Binding>,
        body: Box<ExprSource>,
    },
    /// `(dynamic x)`
    DynamicRef(Symbol),
    /// `(dynamic-set! x value)`
    DynamicSet {
        name: Symbol,
        value: Box<ExprSource>,
    },
    /// `(dynamic-bound? x)`
    DynamicBound(Symbol),
    Match {
        subject: Box<ExprSource>,
        clauses: Vec<ClauseSource>,
        otherwise: Option<Box<ExprSource>>,
    },
}

fn bindings(pairs: Vec<(&str, ExprSource)>) -> Vec<Binding> {
    pairs
        .into_iter()
        .map(|(name, init)| (Symbol::intern(name), init))
        .collect()
}

fn symbols(names: &[&str]) -> Vec<Symbol> {
    names.iter().map(|name| Symbol::intern(name)).collect()
}

impl ExprSource {
    pub fn constant(value: impl Into<Value>) -> Self {
        ExprSource::Constant(value.into())
    }

    pub fn int(n: i64) -> Self {
        ExprSource::Constant(Value::Int(n))
    }

    /// `'name`
    pub fn quote_symbol(name: &str) -> Self {
        ExprSource::Constant(Value::symbol(name))
    }

    pub fn var(name: &str) -> Self {
        ExprSource::Variable(Symbol::intern(name))
    }

    pub fn set(name: &str, value: ExprSource) -> Self {
        ExprSource::Set {
            name: Symbol::intern(name),
            value: Box::new(value),
        }
    }

    pub fn if_(test: ExprSource, then: ExprSource, otherwise: ExprSource) -> Self {
        ExprSource::If {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Some(Box::new(otherwise)),
        }
    }

    /// One-armed `if`; the missing branch yields the unspecified value.
    pub fn when(test: ExprSource, then: ExprSource) -> Self {
        ExprSource::If {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: None,
        }
    }

    pub fn begin(body: Vec<ExprSource>) -> Self {
        ExprSource::Begin(body)
    }

    pub fn lambda(params: &[&str], body: ExprSource) -> Self {
        ExprSource::Lambda(LambdaSource {
            name: None,
            params: symbols(params),
            rest: None,
            body: Box::new(body),
        })
    }

    /// `(lambda (params ... . rest) body)`
    pub fn lambda_rest(params: &[&str], rest: &str, body: ExprSource) -> Self {
        ExprSource::Lambda(LambdaSource {
            name: None,
            params: symbols(params),
            rest: Some(Symbol::intern(rest)),
            body: Box::new(body),
        })
    }

    pub fn call(operator: ExprSource, operands: Vec<ExprSource>) -> Self {
        ExprSource::Call {
            operator: Box::new(operator),
            operands,
        }
    }

    /// Call of the procedure bound to `name`.
    pub fn call_var(name: &str, operands: Vec<ExprSource>) -> Self {
        Self::call(Self::var(name), operands)
    }

    pub fn let_(pairs: Vec<(&str, ExprSource)>, body: ExprSource) -> Self {
        ExprSource::Let {
            bindings: bindings(pairs),
            body: Box::new(body),
        }
    }

    pub fn let_star(pairs: Vec<(&str, ExprSource)>, body: ExprSource) -> Self {
        ExprSource::LetStar {
            bindings: bindings(pairs),
            body: Box::new(body),
        }
    }

    pub fn letrec(pairs: Vec<(&str, ExprSource)>, body: ExprSource) -> Self {
        ExprSource::Letrec {
            bindings: bindings(pairs),
            body: Box::new(body),
        }
    }

    pub fn catch(body: ExprSource, handler: ExprSource) -> Self {
        ExprSource::Catch {
            body: Box::new(body),
            handler: Box::new(handler),
        }
    }

    pub fn using(pairs: Vec<(&str, ExprSource)>, body: ExprSource) -> Self {
        ExprSource::Using {
            bindings: bindings(pairs),
            body: Box::new(body),
        }
    }

    pub fn using_star(pairs: Vec<(&str, ExprSource)>, body: ExprSource) -> Self {
        ExprSource::UsingStar {
            bindings: bindings(pairs),
            body: Box::new(body),
        }
    }

    pub fn dynamic_let(pairs: Vec<(&str, ExprSource)>, body: ExprSource) -> Self {
        ExprSource::DynamicLet {
            bindings: bindings(pairs),
            body: Box::new(body),
        }
    }

    pub fn dynamic(name: &str) -> Self {
        ExprSource::DynamicRef(Symbol::intern(name))
    }

    pub fn dynamic_set(name: &str, value: ExprSource) -> Self {
        ExprSource::DynamicSet {
            name: Symbol::intern(name),
            value: Box::new(value),
        }
    }

    pub fn dynamic_bound(name: &str) -> Self {
        ExprSource::DynamicBound(Symbol::intern(name))
    }

    pub fn match_(
        subject: ExprSource,
        clauses: Vec<ClauseSource>,
        otherwise: Option<ExprSource>,
    ) -> Self {
        ExprSource::Match {
            subject: Box::new(subject),
            clauses,
            otherwise: otherwise.map(Box::new),
        }
    }
}

impl ClauseSource {
    pub fn new(pattern: PatternSource, guard: Option<ExprSource>, body: ExprSource) -> Self {
        ClauseSource {
            pattern,
            guard,
            body,
        }
    }
}

impl PatternSource {
    pub fn var(name: &str) -> Self {
        PatternSource::Variable(Symbol::intern(name))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        PatternSource::Literal(value.into())
    }

    pub fn pair(head: PatternSource, tail: PatternSource) -> Self {
        PatternSource::Pair(Box::new(head), Box::new(tail))
    }

    /// Proper-list pattern: one element pattern per item, ending in `()`.
    pub fn list(items: Vec<PatternSource>) -> Self {
        items
            .into_iter()
            .rev()
            .fold(PatternSource::Literal(Value::Null), |tail, head| {
                PatternSource::pair(head, tail)
            })
    }
}

#[cfg(test)]
mod tests;
