//! Detached continuation templates.
//!
//! `capture` copies the frames between a live continuation and a marked
//! ancestor into a chain of partial nodes; `attach` rebuilds live nodes from
//! those frames on top of any base. Both walks consult an [`Association`]
//! keyed by node identity, so a suffix shared by several chains is copied
//! once per session and stays shared in the result.
//!
//! ```text
//!   live:     a ─┐                    template:  a' ─┐
//!                ├─ s ─ mark ─ ...                   ├─ s'
//!             b ─┘                               b' ─┘
//! ```

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{ContFrame, Continuation};
use crate::errors::{AssociationRole, InternalError};

struct PartialNode {
    frame: ContFrame,
    /// `None` marks the point where the template meets its base.
    parent: Option<Arc<PartialNode>>,
}

impl Drop for PartialNode {
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(node) = next {
            next = match Arc::try_unwrap(node) {
                Ok(mut node) => node.parent.take(),
                Err(_) => None,
            };
        }
    }
}

/// An immutable, base-independent copy of part of a continuation.
#[derive(Clone)]
pub struct PartialContinuation {
    head: Option<Arc<PartialNode>>,
}

/// Memo table for one capture-then-attach session.
///
/// The first capture pins the mark and the first attach pins the base;
/// using the same association with a different mark or base is rejected,
/// since the memoized nodes would silently splice unrelated chains together.
#[derive(Default)]
pub struct Association {
    mark: Option<Continuation>,
    base: Option<Continuation>,
    // Keys are node addresses; the values keep those nodes alive so an
    // address cannot be reused within the session.
    captured: FxHashMap<*const (), (Continuation, Arc<PartialNode>)>,
    attached: FxHashMap<*const (), (Arc<PartialNode>, Continuation)>,
}

impl Association {
    pub fn new() -> Self {
        Self::default()
    }

    fn pin(
        slot: &mut Option<Continuation>,
        k: &Continuation,
        role: AssociationRole,
    ) -> Result<(), InternalError> {
        match slot {
            Some(pinned) if !Continuation::ptr_eq(pinned, k) => {
                Err(InternalError::AssociationMismatch(role))
            }
            Some(_) => Ok(()),
            None => {
                *slot = Some(k.clone());
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Association")
            .field("captured", &self.captured.len())
            .field("attached", &self.attached.len())
            .finish_non_exhaustive()
    }
}

fn partial_addr(node: &Arc<PartialNode>) -> *const () {
    Arc::as_ptr(node).cast()
}

impl PartialContinuation {
    /// Copy the frames from `start` down to (excluding) `mark`.
    ///
    /// `mark` must be `start` itself or one of its ancestors.
    pub fn capture(
        start: &Continuation,
        mark: &Continuation,
        association: &mut Association,
    ) -> Result<Self, InternalError> {
        Association::pin(&mut association.mark, mark, AssociationRole::CaptureMark)?;

        let mut pending = Vec::new();
        let mut tail = None;
        let mut current = start;
        while !Continuation::ptr_eq(current, mark) {
            if let Some((_, partial)) = association.captured.get(&current.addr()) {
                tail = Some(Arc::clone(partial));
                break;
            }
            pending.push(current);
            current = current.parent().ok_or(InternalError::MarkNotAncestor)?;
        }

        let built = pending.len();
        for k in pending.into_iter().rev() {
            let partial = Arc::new(PartialNode {
                frame: k.frame().clone(),
                parent: tail.take(),
            });
            association
                .captured
                .insert(k.addr(), (k.clone(), Arc::clone(&partial)));
            tail = Some(partial);
        }
        tracing::trace!(built, "captured partial continuation");
        Ok(PartialContinuation { head: tail })
    }

    /// Rebuild this template as a live chain on top of `base`.
    pub fn attach(
        &self,
        base: &Continuation,
        association: &mut Association,
    ) -> Result<Continuation, InternalError> {
        Association::pin(&mut association.base, base, AssociationRole::AttachBase)?;

        let mut pending = Vec::new();
        let mut live = base.clone();
        let mut current = self.head.as_ref();
        while let Some(node) = current {
            if let Some((_, built)) = association.attached.get(&partial_addr(node)) {
                live = built.clone();
                break;
            }
            pending.push(node);
            current = node.parent.as_ref();
        }

        let built = pending.len();
        for node in pending.into_iter().rev() {
            live = live.push(node.frame.clone());
            association
                .attached
                .insert(partial_addr(node), (Arc::clone(node), live.clone()));
        }
        tracing::trace!(built, "attached partial continuation");
        Ok(live)
    }

    /// Number of frames in the template.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut current = self.head.as_deref();
        while let Some(node) = current {
            count += 1;
            current = node.parent.as_deref();
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Whether both templates start at the same partial node.
    pub fn ptr_eq(a: &PartialContinuation, b: &PartialContinuation) -> bool {
        match (&a.head, &b.head) {
            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for PartialContinuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut frames = Vec::new();
        let mut current = self.head.as_deref();
        while let Some(node) = current {
            frames.push(node.frame.name());
            current = node.parent.as_deref();
        }
        f.debug_tuple("PartialContinuation").field(&frames).finish()
    }
}
