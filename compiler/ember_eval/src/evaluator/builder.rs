//! `EvaluatorBuilder` for creating `Evaluator` instances.

use std::sync::Arc;

use super::Evaluator;
use crate::eval_mode::EvalMode;
use crate::resource::{HandleRegistry, ResourceRegistry};

/// Builder for creating Evaluator instances with various configurations.
///
/// Defaults to `EvalMode::Interpret` and a private `HandleRegistry`. Embedders
/// that open resources from native procedures pass the registry those
/// procedures register with.
#[derive(Default)]
pub struct EvaluatorBuilder {
    mode: EvalMode,
    registry: Option<Arc<dyn ResourceRegistry>>,
}

impl EvaluatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the evaluation mode.
    #[must_use]
    pub fn mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the registry `using` consults and releases through.
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn ResourceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Evaluator {
        Evaluator {
            mode: self.mode,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(HandleRegistry::new())),
        }
    }
}
