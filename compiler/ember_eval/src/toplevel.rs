//! The global frame.
//!
//! A `Toplevel` owns one cell per defined name. Every compile sees all
//! current names in a single frame; since cells are shared, code compiled
//! earlier keeps seeing later redefinitions of the names it already knew.

use ember_ir::Symbol;
use rustc_hash::FxHashMap;

use crate::builtins::standard_procedures;
use crate::environment::{Cell, Environment};
use crate::errors::{CompileError, EvalError};
use crate::expr::ExprRef;
use crate::scope::ScopeDescriptor;
use crate::source::ExprSource;
use crate::value::{Arity, Value};

#[derive(Debug, Default)]
pub struct Toplevel {
    names: Vec<Symbol>,
    cells: Vec<Cell>,
    index: FxHashMap<Symbol, usize>,
}

impl Toplevel {
    /// A toplevel with nothing defined.
    pub fn new() -> Self {
        Self::default()
    }

    /// A toplevel holding the standard procedures.
    pub fn standard() -> Self {
        let mut toplevel = Self::new();
        for (name, value) in standard_procedures() {
            toplevel.define(name, value);
        }
        toplevel
    }

    /// Bind `name` to `value`, reusing its cell if already defined.
    pub fn define(&mut self, name: Symbol, value: Value) {
        if let Some(&slot) = self.index.get(&name) {
            self.cells[slot].set(value);
            return;
        }
        self.index.insert(name, self.names.len());
        self.names.push(name);
        self.cells.push(Cell::new(value));
    }

    /// Define a host procedure under `name`.
    pub fn define_native(
        &mut self,
        name: &str,
        arity: Arity,
        func: impl Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) {
        self.define(Symbol::intern(name), Value::native(name, arity, func));
    }

    pub fn lookup(&self, name: Symbol) -> Option<Value> {
        self.index.get(&name).map(|&slot| self.cells[slot].get())
    }

    /// Scope descriptor matching [`Toplevel::environment`].
    pub fn scope(&self) -> Result<ScopeDescriptor, CompileError> {
        ScopeDescriptor::empty().extend_shadowing(&self.names)
    }

    /// One frame holding every global cell, in definition order.
    pub fn environment(&self) -> Environment {
        Environment::empty().extend(self.cells.clone())
    }

    /// Compile `source` against the current globals.
    pub fn compile(&self, source: &ExprSource) -> Result<ExprRef, CompileError> {
        source.compile(&self.scope()?)
    }
}
