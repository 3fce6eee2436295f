//! Compile-time scope descriptors.
//!
//! A descriptor mirrors, frame for frame, the `Environment` a compiled
//! expression will run against: every frame here becomes a frame of the same
//! length there. Slot numbers handed out by a descriptor are therefore valid
//! for any environment built from it.

use std::fmt;
use std::sync::Arc;

use ember_ir::{Symbol, SymbolSet};
use rustc_hash::FxHashMap;

use crate::errors::CompileError;

/// Resolved variable address: frame depth (0 = innermost) and slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarRef {
    pub depth: usize,
    pub slot: usize,
}

struct ScopeFrame {
    names: Vec<Symbol>,
    index: FxHashMap<Symbol, usize>,
    parent: ScopeDescriptor,
}

/// Persistent chain of name-to-slot tables.
#[derive(Clone, Default)]
pub struct ScopeDescriptor(Option<Arc<ScopeFrame>>);

impl ScopeDescriptor {
    pub fn empty() -> Self {
        ScopeDescriptor(None)
    }

    /// Add a frame binding `names` in order, hiding outer bindings of the
    /// same names.
    pub fn extend_shadowing(&self, names: &[Symbol]) -> Result<Self, CompileError> {
        let mut index = FxHashMap::default();
        index.reserve(names.len());
        for (slot, &name) in names.iter().enumerate() {
            if index.insert(name, slot).is_some() {
                return Err(CompileError::DuplicateBinding(name));
            }
        }
        Ok(ScopeDescriptor(Some(Arc::new(ScopeFrame {
            names: names.to_vec(),
            index,
            parent: self.clone(),
        }))))
    }

    /// Descriptor for a closure body.
    ///
    /// The result has two frames: the captured frame, holding exactly the
    /// symbols of `required` in set order, and the locals frame. The returned
    /// addresses locate each captured symbol in `self`, in the same order, so
    /// the closure can copy those cells into its captured frame.
    pub fn subset_extend(
        &self,
        required: &SymbolSet,
        locals: &[Symbol],
    ) -> Result<(Self, Vec<VarRef>), CompileError> {
        let captures = required
            .iter()
            .map(|symbol| {
                self.resolve(symbol)
                    .ok_or(CompileError::UnboundVariable(symbol))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let captured = ScopeDescriptor::empty().extend_shadowing(required.as_slice())?;
        Ok((captured.extend_shadowing(locals)?, captures))
    }

    /// Address of the innermost binding of `symbol`.
    pub fn resolve(&self, symbol: Symbol) -> Option<VarRef> {
        let mut current = self.0.as_deref();
        let mut depth = 0;
        while let Some(frame) = current {
            if let Some(&slot) = frame.index.get(&symbol) {
                return Some(VarRef { depth, slot });
            }
            current = frame.parent.0.as_deref();
            depth += 1;
        }
        None
    }

    /// Length of each frame, innermost first.
    pub fn frame_sizes(&self) -> Vec<usize> {
        self.frames().map(|frame| frame.names.len()).collect()
    }

    pub fn depth(&self) -> usize {
        self.frames().count()
    }

    fn frames(&self) -> impl Iterator<Item = &ScopeFrame> {
        let mut current = self.0.as_deref();
        std::iter::from_fn(move || {
            let frame = current?;
            current = frame.parent.0.as_deref();
            Some(frame)
        })
    }
}

impl fmt::Debug for ScopeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.frames().map(|frame| &frame.names))
            .finish()
    }
}
