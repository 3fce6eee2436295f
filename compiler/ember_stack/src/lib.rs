//! Stack growth for the parts of Ember that still recurse on the host stack.
//!
//! Evaluation itself never recurses: the trampoline returns every step to its
//! driver loop. Two walks are structurally recursive over user-supplied trees,
//! though, and a deeply nested program can exhaust the native stack in either:
//!
//! - `ExprSource::compile` / `ExprSource::requirements` over source trees
//! - structural walks over values (`equal?`, printing) on long or deep pairs
//!
//! Those walks wrap each level in [`ensure_sufficient_stack`].
//!
//! # Platform Support
//!
//! - **Native targets**: `stacker` grows the stack on demand.
//! - **WASM targets**: passthrough.

/// Remaining stack below which a new segment is allocated (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
///
/// ```text
/// fn depth(source: &ExprSource) -> usize {
///     ensure_sufficient_stack(|| match source {
///         ExprSource::If { then, .. } => 1 + depth(then),
///         _ => 1,
///     })
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// WASM version: call directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
