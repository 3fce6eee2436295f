//! Free-variable analysis and slot assignment.

use std::sync::Arc;

use ember_ir::{Symbol, SymbolSet};
use ember_stack::ensure_sufficient_stack;

use super::{Binding, ClauseSource, ExprSource, LambdaSource, PatternSource};
use crate::errors::CompileError;
use crate::expr::{BindingExpr, CallExpr, DynamicLetExpr, Expr, ExprRef, IfExpr, LambdaExpr};
use crate::matcher::{MatchClause, MatchExpr, Pattern};
use crate::scope::ScopeDescriptor;
use crate::value::{Arity, Value};

fn union_all<'a>(exprs: impl IntoIterator<Item = &'a ExprSource>) -> SymbolSet {
    let mut set = SymbolSet::new();
    for expr in exprs {
        set.extend_with(&expr.requirements());
    }
    set
}

fn names(bindings: &[Binding]) -> Vec<Symbol> {
    bindings.iter().map(|(name, _)| *name).collect()
}

fn without(mut set: SymbolSet, names: &[Symbol]) -> SymbolSet {
    for &name in names {
        set.remove(name);
    }
    set
}

fn unspecified() -> ExprRef {
    Arc::new(Expr::Constant(Value::Unspecified))
}

impl LambdaSource {
    fn locals(&self) -> Vec<Symbol> {
        self.params.iter().copied().chain(self.rest).collect()
    }

    fn requirements(&self) -> SymbolSet {
        without(self.body.requirements(), &self.locals())
    }

    fn compile(&self, name: Option<Symbol>, scope: &ScopeDescriptor) -> Result<ExprRef, CompileError> {
        let required = self.requirements();
        let (body_scope, captures) = scope.subset_extend(&required, &self.locals())?;
        let arity = match self.rest {
            Some(_) => Arity::at_least(self.params.len()),
            None => Arity::exactly(self.params.len()),
        };
        Ok(Arc::new(Expr::Lambda(Arc::new(LambdaExpr {
            captures: captures.into_boxed_slice(),
            arity,
            body: self.body.compile(&body_scope)?,
            name: self.name.or(name),
        }))))
    }
}

/// Compile a binding's init, naming an anonymous lambda after its binding.
fn compile_init(
    (name, init): &Binding,
    scope: &ScopeDescriptor,
) -> Result<ExprRef, CompileError> {
    match init {
        ExprSource::Lambda(lambda) => lambda.compile(Some(*name), scope),
        other => other.compile(scope),
    }
}

fn compile_inits(bindings: &[Binding], scope: &ScopeDescriptor) -> Result<Box<[ExprRef]>, CompileError> {
    bindings
        .iter()
        .map(|binding| compile_init(binding, scope))
        .collect()
}

/// `let` and `using`: inits outside, body inside one new frame.
fn compile_parallel(
    bindings: &[Binding],
    body: &ExprSource,
    scope: &ScopeDescriptor,
) -> Result<Arc<BindingExpr>, CompileError> {
    let inits = compile_inits(bindings, scope)?;
    let inner = scope.extend_shadowing(&names(bindings))?;
    Ok(Arc::new(BindingExpr {
        inits,
        body: body.compile(&inner)?,
    }))
}

/// `let*` and `using*`: one single-binding form per binding, nested.
fn compile_sequential(
    bindings: &[Binding],
    body: &ExprSource,
    scope: &ScopeDescriptor,
    wrap: fn(Arc<BindingExpr>) -> Expr,
) -> Result<ExprRef, CompileError> {
    let Some((first, rest)) = bindings.split_first() else {
        return Ok(Arc::new(wrap(compile_parallel(&[], body, scope)?)));
    };
    let init = compile_init(first, scope)?;
    let inner = scope.extend_shadowing(&[first.0])?;
    let body = if rest.is_empty() {
        body.compile(&inner)?
    } else {
        ensure_sufficient_stack(|| compile_sequential(rest, body, &inner, wrap))?
    };
    Ok(Arc::new(wrap(Arc::new(BindingExpr {
        inits: Box::new([init]),
        body,
    }))))
}

fn sequential_requirements(bindings: &[Binding], body: &ExprSource) -> SymbolSet {
    bindings
        .iter()
        .rev()
        .fold(body.requirements(), |mut set, (name, init)| {
            set.remove(*name);
            set.extend_with(&init.requirements());
            set
        })
}

impl PatternSource {
    /// Pattern variables in left-to-right order.
    fn variables(&self, out: &mut Vec<Symbol>) -> Result<(), CompileError> {
        match self {
            PatternSource::Variable(name) => {
                if out.contains(name) {
                    return Err(CompileError::DuplicatePatternVariable(*name));
                }
                out.push(*name);
                Ok(())
            }
            PatternSource::Pair(head, tail) => {
                head.variables(out)?;
                ensure_sufficient_stack(|| tail.variables(out))
            }
            PatternSource::Literal(_) | PatternSource::Wildcard => Ok(()),
        }
    }

    fn compile(&self, variables: &[Symbol]) -> Arc<Pattern> {
        let pattern = match self {
            PatternSource::Literal(value) => Pattern::Literal(value.clone()),
            PatternSource::Wildcard => Pattern::Wildcard,
            PatternSource::Variable(name) => match variables.iter().position(|v| v == name) {
                Some(slot) => Pattern::Bind(slot),
                None => Pattern::Wildcard,
            },
            PatternSource::Pair(head, tail) => Pattern::Pair(
                head.compile(variables),
                ensure_sufficient_stack(|| tail.compile(variables)),
            ),
        };
        Arc::new(pattern)
    }
}

impl ClauseSource {
    fn variables(&self) -> Result<Vec<Symbol>, CompileError> {
        let mut variables = Vec::new();
        self.pattern.variables(&mut variables)?;
        Ok(variables)
    }

    fn requirements(&self) -> SymbolSet {
        let mut set = self.body.requirements();
        if let Some(guard) = &self.guard {
            set.extend_with(&guard.requirements());
        }
        let mut variables = Vec::new();
        // A duplicate variable fails compilation; for analysis the first
        // occurrences are enough.
        let _ = self.pattern.variables(&mut variables);
        without(set, &variables)
    }

    fn compile(&self, scope: &ScopeDescriptor) -> Result<Arc<MatchClause>, CompileError> {
        let variables = self.variables()?;
        let clause_scope = scope.extend_shadowing(&variables)?;
        Ok(Arc::new(MatchClause {
            pattern: self.pattern.compile(&variables),
            slots: variables.len(),
            guard: self
                .guard
                .as_ref()
                .map(|guard| guard.compile(&clause_scope))
                .transpose()?,
            body: self.body.compile(&clause_scope)?,
        }))
    }
}

impl ExprSource {
    /// Free lexical variables of this expression.
    ///
    /// Dynamic variables are not included; they are resolved on the
    /// continuation at run time.
    pub fn requirements(&self) -> SymbolSet {
        ensure_sufficient_stack(|| self.requirements_inner())
    }

    fn requirements_inner(&self) -> SymbolSet {
        match self {
            ExprSource::Constant(_) | ExprSource::DynamicRef(_) | ExprSource::DynamicBound(_) => {
                SymbolSet::new()
            }
            ExprSource::Variable(name) => SymbolSet::singleton(*name),
            ExprSource::Set { name, value } => {
                let mut set = value.requirements();
                set.insert(*name);
                set
            }
            ExprSource::If {
                test,
                then,
                otherwise,
            } => union_all(
                [&**test, &**then]
                    .into_iter()
                    .chain(otherwise.as_deref()),
            ),
            ExprSource::Begin(body) => union_all(body),
            ExprSource::Lambda(lambda) => lambda.requirements(),
            ExprSource::Call { operator, operands } => {
                union_all(std::iter::once(&**operator).chain(operands))
            }
            ExprSource::Let { bindings, body } | ExprSource::Using { bindings, body } => {
                let mut set = without(body.requirements(), &names(bindings));
                set.extend_with(&union_all(bindings.iter().map(|(_, init)| init)));
                set
            }
            ExprSource::LetStar { bindings, body } | ExprSource::UsingStar { bindings, body } => {
                sequential_requirements(bindings, body)
            }
            ExprSource::Letrec { bindings, body } => {
                let mut set = union_all(bindings.iter().map(|(_, init)| init));
                set.extend_with(&body.requirements());
                without(set, &names(bindings))
            }
            ExprSource::Catch { body, handler } => union_all([&**body, &**handler]),
            ExprSource::DynamicLet { bindings, body } => union_all(
                bindings
                    .iter()
                    .map(|(_, init)| init)
                    .chain(std::iter::once(&**body)),
            ),
            ExprSource::DynamicSet { value, .. } => value.requirements(),
            ExprSource::Match {
                subject,
                clauses,
                otherwise,
            } => {
                let mut set = union_all(std::iter::once(&**subject).chain(otherwise.as_deref()));
                for clause in clauses {
                    set.extend_with(&clause.requirements());
                }
                set
            }
        }
    }

    /// Compile against `scope`, resolving every variable to a slot.
    pub fn compile(&self, scope: &ScopeDescriptor) -> Result<ExprRef, CompileError> {
        ensure_sufficient_stack(|| self.compile_inner(scope))
    }

    fn compile_inner(&self, scope: &ScopeDescriptor) -> Result<ExprRef, CompileError> {
        let resolve = |name: Symbol| scope.resolve(name).ok_or(CompileError::UnboundVariable(name));
        let expr = match self {
            ExprSource::Constant(value) => Expr::Constant(value.clone()),
            ExprSource::Variable(name) => Expr::Local(resolve(*name)?),
            ExprSource::Set { name, value } => {
                Expr::SetLocal(resolve(*name)?, value.compile(scope)?)
            }
            ExprSource::If {
                test,
                then,
                otherwise,
            } => Expr::If(Arc::new(IfExpr {
                test: test.compile(scope)?,
                then: then.compile(scope)?,
                otherwise: match otherwise {
                    Some(otherwise) => otherwise.compile(scope)?,
                    None => unspecified(),
                },
            })),
            ExprSource::Begin(body) => match body.as_slice() {
                [] => return Ok(unspecified()),
                [only] => return only.compile(scope),
                body => Expr::Sequence(
                    body.iter()
                        .map(|expr| expr.compile(scope))
                        .collect::<Result<_, _>>()?,
                ),
            },
            ExprSource::Lambda(lambda) => return lambda.compile(None, scope),
            ExprSource::Call { operator, operands } => Expr::Call(Arc::new(CallExpr {
                operator: operator.compile(scope)?,
                operands: operands
                    .iter()
                    .map(|operand| operand.compile(scope))
                    .collect::<Result<_, _>>()?,
            })),
            ExprSource::Let { bindings, body } => Expr::Let(compile_parallel(bindings, body, scope)?),
            ExprSource::LetStar { bindings, body } => {
                return compile_sequential(bindings, body, scope, Expr::Let)
            }
            ExprSource::Letrec { bindings, body } => {
                let inner = scope.extend_shadowing(&names(bindings))?;
                Expr::Letrec(Arc::new(BindingExpr {
                    inits: compile_inits(bindings, &inner)?,
                    body: body.compile(&inner)?,
                }))
            }
            ExprSource::Catch { body, handler } => Expr::Catch {
                body: body.compile(scope)?,
                handler: handler.compile(scope)?,
            },
            ExprSource::Using { bindings, body } => {
                Expr::Using(compile_parallel(bindings, body, scope)?)
            }
            ExprSource::UsingStar { bindings, body } => {
                return compile_sequential(bindings, body, scope, Expr::Using)
            }
            ExprSource::DynamicLet { bindings, body } => Expr::DynamicLet(Arc::new(DynamicLetExpr {
                bindings: bindings
                    .iter()
                    .map(|(name, init)| Ok((*name, init.compile(scope)?)))
                    .collect::<Result<_, CompileError>>()?,
                body: body.compile(scope)?,
            })),
            ExprSource::DynamicRef(name) => Expr::DynamicRef(*name),
            ExprSource::DynamicSet { name, value } => {
                Expr::DynamicSet(*name, value.compile(scope)?)
            }
            ExprSource::DynamicBound(name) => Expr::DynamicBound(*name),
            ExprSource::Match {
                subject,
                clauses,
                otherwise,
            } => Expr::Match(Arc::new(MatchExpr {
                subject: subject.compile(scope)?,
                clauses: clauses
                    .iter()
                    .map(|clause| clause.compile(scope))
                    .collect::<Result<_, _>>()?,
                otherwise: match otherwise {
                    Some(otherwise) => otherwise.compile(scope)?,
                    None => unspecified(),
                },
            })),
        };
        Ok(Arc::new(expr))
    }
}
