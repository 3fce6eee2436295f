//! Disposable resources and the registry capability used by `using`.
//!
//! The evaluator does not own resources. The embedding layer (the async I/O
//! scheduler, in a full runtime) registers each disposable object and hands
//! Scheme code an opaque [`ResourceHandle`]. `using` asks the registry which
//! bound values are live handles and releases them when its scope exits.
//!
//! The registry is not assumed to tolerate double release; the core calls
//! [`ResourceRegistry::release`] at most once per handle per scope exit.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{release_failed, unknown_resource, EvalError};
use crate::value::Value;

/// Opaque handle naming a registered resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    pub const fn from_raw(raw: u64) -> Self {
        ResourceHandle(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource {}", self.0)
    }
}

/// Something that can be released exactly once.
pub trait Disposable: Send {
    fn dispose(self: Box<Self>) -> Result<(), EvalError>;
}

impl<F> Disposable for F
where
    F: FnOnce() -> Result<(), EvalError> + Send,
{
    fn dispose(self: Box<Self>) -> Result<(), EvalError> {
        (*self)()
    }
}

/// Registry capability consumed by the resource-scope construct.
pub trait ResourceRegistry: Send + Sync {
    /// Take ownership of `resource` and return its handle.
    fn register(&self, resource: Box<dyn Disposable>) -> ResourceHandle;

    /// Whether `handle` names a resource that has not been released.
    fn contains(&self, handle: ResourceHandle) -> bool;

    /// Release the resource named by `handle`.
    fn release(&self, handle: ResourceHandle) -> Result<(), EvalError>;

    /// The handle `value` denotes, if it is a live disposable resource.
    fn disposable(&self, value: &Value) -> Option<ResourceHandle> {
        match value {
            Value::Resource(handle) if self.contains(*handle) => Some(*handle),
            _ => None,
        }
    }
}

/// In-memory registry: a handle table guarded by a mutex.
pub struct HandleRegistry {
    next: AtomicU64,
    live: Mutex<FxHashMap<ResourceHandle, Box<dyn Disposable>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        HandleRegistry {
            next: AtomicU64::new(1),
            live: Mutex::new(FxHashMap::default()),
        }
    }

    /// Register `resource` and return the handle as a Scheme value.
    pub fn open(&self, resource: impl Disposable + 'static) -> Value {
        Value::Resource(self.register(Box::new(resource)))
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry for HandleRegistry {
    fn register(&self, resource: Box<dyn Disposable>) -> ResourceHandle {
        let handle = ResourceHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.live.lock().insert(handle, resource);
        handle
    }

    fn contains(&self, handle: ResourceHandle) -> bool {
        self.live.lock().contains_key(&handle)
    }

    fn release(&self, handle: ResourceHandle) -> Result<(), EvalError> {
        // Dispose outside the lock: disposal may register or release others.
        let resource = self.live.lock().remove(&handle);
        match resource {
            Some(resource) => resource.dispose(),
            None => Err(unknown_resource(handle)),
        }
    }
}

/// Release every live resource among `values`, each handle at most once.
///
/// Every release is attempted even after a failure; the failures are
/// returned in binding order, each wrapped as a release failure of its handle.
pub(crate) fn release_all(registry: &dyn ResourceRegistry, values: &[Value]) -> Vec<EvalError> {
    let mut seen = FxHashSet::default();
    let mut failures = Vec::new();
    for value in values {
        let Some(handle) = registry.disposable(value) else {
            continue;
        };
        if !seen.insert(handle) {
            continue;
        }
        tracing::trace!(%handle, "releasing resource");
        if let Err(err) = registry.release(handle) {
            failures.push(release_failed(handle, err.message));
        }
    }
    failures
}
