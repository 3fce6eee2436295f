//! First-class continuations: reifying the current continuation and jumping
//! into a reified one.

use std::sync::Arc;

use super::{Association, ContFrame, Continuation, PartialContinuation, Winder};
use crate::errors::InternalError;
use crate::trampoline::Step;
use crate::value::{ContinuationMode, ContinuationProcedure, Value};

/// Capture `k` up to its nearest prompt as a procedure value.
pub(crate) fn reify(k: &Continuation, mode: ContinuationMode) -> Result<Value, InternalError> {
    let mark = k.nearest_prompt();
    let template = PartialContinuation::capture(k, &mark, &mut Association::new())?;
    Ok(Value::continuation(ContinuationProcedure { template, mode }))
}

/// Deliver `value` through `procedure` from the invoking continuation `k`.
///
/// An escaping continuation replaces `k` up to its nearest prompt: the
/// `after` thunks of the winds being left run innermost first, then the
/// `before` thunks of the winds being entered run outermost first. Winds
/// present on both sides are neither left nor entered. A composable
/// continuation is stacked on top of `k` and only enters its own winds.
///
/// Each thunk runs under the continuation just outside its own wind, so a
/// throw from it unwinds only the winds still in effect at that point.
pub(crate) fn invoke(
    procedure: &ContinuationProcedure,
    value: Value,
    k: Continuation,
) -> Result<Step, InternalError> {
    let mut association = Association::new();
    let (target, transitions) = match procedure.mode {
        ContinuationMode::Escape => {
            let base = k.nearest_prompt();
            let target = procedure.template.attach(&base, &mut association)?;
            let leaving = winders_between(&k, &base);
            let entering = winders_between(&target, &base);
            let mut transitions: Vec<_> = leaving
                .iter()
                .filter(|(w, _)| !contains(&entering, w))
                .map(|(w, outside)| (w.after.clone(), outside.clone()))
                .collect();
            transitions.extend(
                entering
                    .iter()
                    .rev()
                    .filter(|(w, _)| !contains(&leaving, w))
                    .map(|(w, outside)| (w.before.clone(), outside.clone())),
            );
            (target, transitions)
        }
        ContinuationMode::Composable => {
            let target = procedure.template.attach(&k, &mut association)?;
            let transitions = winders_between(&target, &k)
                .into_iter()
                .rev()
                .map(|(w, outside)| (w.before.clone(), outside))
                .collect();
            (target, transitions)
        }
    };
    tracing::trace!(
        mode = ?procedure.mode,
        transitions = transitions.len(),
        "invoking continuation"
    );
    let jump = Arc::new(Jump {
        transitions: transitions.into_boxed_slice(),
        target,
        value,
    });
    Ok(continue_jump(&jump, 0))
}

/// A continuation jump whose wind transitions are still running.
pub(crate) struct Jump {
    /// Thunk to call and the continuation it runs under, in order.
    transitions: Box<[(Value, Continuation)]>,
    target: Continuation,
    value: Value,
}

/// Run transition `next` of `jump`, or finish the jump once all have run.
pub(crate) fn continue_jump(jump: &Arc<Jump>, next: usize) -> Step {
    match jump.transitions.get(next) {
        Some((thunk, outside)) => Step::apply(
            thunk.clone(),
            Vec::new(),
            outside.push(ContFrame::Transition {
                jump: Arc::clone(jump),
                next: next + 1,
            }),
        ),
        None => Step::ret(jump.target.clone(), jump.value.clone()),
    }
}

type WindEntry = (Arc<Winder>, Continuation);

/// Wind frames from `from` down to (excluding) `base`, innermost first,
/// each with the continuation just outside it.
fn winders_between(from: &Continuation, base: &Continuation) -> Vec<WindEntry> {
    let mut winders = Vec::new();
    let mut current = Some(from);
    while let Some(k) = current {
        if Continuation::ptr_eq(k, base) {
            break;
        }
        if let (ContFrame::Wind(winder), Some(outside)) = (k.frame(), k.parent()) {
            winders.push((Arc::clone(winder), outside.clone()));
        }
        current = k.parent();
    }
    winders
}

fn contains(winders: &[WindEntry], winder: &Arc<Winder>) -> bool {
    winders.iter().any(|(w, _)| Arc::ptr_eq(w, winder))
}
