//! Runtime environments: chains of fixed-size frames of mutable cells.
//!
//! Compiled expressions address variables by `(depth, slot)` only; names
//! never reach this module. A frame is allocated once with all its cells and
//! is never resized, and a parent link is never rewritten, so an
//! `Environment` can be cloned and shared freely (closures, continuation
//! frames, other threads).

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::InternalError;
use crate::scope::VarRef;
use crate::value::Value;

/// A single mutable storage location.
///
/// Cloning a `Cell` shares the location: closures capture cells, not values,
/// so `set!` through any owner is visible to all of them.
#[repr(transparent)]
#[derive(Clone)]
pub struct Cell(Arc<Mutex<Value>>);

impl Cell {
    #[inline]
    pub fn new(value: Value) -> Self {
        Cell(Arc::new(Mutex::new(value)))
    }

    #[inline]
    pub fn get(&self) -> Value {
        self.0.lock().clone()
    }

    #[inline]
    pub fn set(&self, value: Value) {
        // Drop the old value after the lock is released.
        let old = std::mem::replace(&mut *self.0.lock(), value);
        drop(old);
    }

    pub fn ptr_eq(a: &Cell, b: &Cell) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cell").field(&*self.0.lock()).finish()
    }
}

struct Frame {
    cells: Box<[Cell]>,
    parent: Environment,
}

/// Immutable chain of frames; depth 0 is the innermost frame.
#[derive(Clone, Default)]
pub struct Environment(Option<Arc<Frame>>);

impl Environment {
    /// The environment with no frames.
    pub fn empty() -> Self {
        Environment(None)
    }

    /// Child environment whose innermost frame is `cells`.
    #[must_use]
    pub fn extend(&self, cells: Vec<Cell>) -> Self {
        Environment(Some(Arc::new(Frame {
            cells: cells.into_boxed_slice(),
            parent: self.clone(),
        })))
    }

    /// Child environment with one fresh cell per value.
    #[must_use]
    pub fn extend_values<I>(&self, values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.extend(values.into_iter().map(Cell::new).collect())
    }

    fn frame(&self, depth: usize) -> Result<&Frame, InternalError> {
        let mut current = self.0.as_deref();
        for _ in 0..depth {
            current = current.and_then(|frame| frame.parent.0.as_deref());
        }
        current.ok_or(InternalError::FrameOutOfRange { depth })
    }

    /// The cell addressed by `var`.
    pub fn cell(&self, var: VarRef) -> Result<&Cell, InternalError> {
        let frame = self.frame(var.depth)?;
        frame
            .cells
            .get(var.slot)
            .ok_or(InternalError::SlotOutOfRange {
                depth: var.depth,
                slot: var.slot,
                len: frame.cells.len(),
            })
    }

    #[inline]
    pub fn get(&self, var: VarRef) -> Result<Value, InternalError> {
        self.cell(var).map(Cell::get)
    }

    #[inline]
    pub fn set(&self, var: VarRef, value: Value) -> Result<(), InternalError> {
        self.cell(var).map(|cell| cell.set(value))
    }

    /// Number of cells in each frame, innermost first.
    pub fn shape(&self) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut current = self.0.as_deref();
        while let Some(frame) = current {
            sizes.push(frame.cells.len());
            current = frame.parent.0.as_deref();
        }
        sizes
    }

    pub fn depth(&self) -> usize {
        self.shape().len()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("shape", &self.shape())
            .finish()
    }
}
