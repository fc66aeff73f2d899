//! The function body rewrite pipeline.
//!
//! Every function, method and `main` goes through the same ordered list of
//! stages. A stage sees the complete definition text as left by the stages
//! before it and returns the new text; input it does not recognize is
//! returned unchanged. State that outlives one unit lives in
//! [`RewriteContext`].

mod alloc;
mod calls;
mod fnptr;
mod input;
mod math;
mod output;
mod swap;

pub use alloc::AllocationStage;
pub use calls::MethodCallStage;
pub use fnptr::FunctionPointerStage;
pub use input::FormattedInputStage;
pub use math::MathNamespaceStage;
pub use output::FormattedOutputStage;
pub use swap::SwapIdiomStage;

use crate::catalog::Catalog;
use crate::headers::HeaderRequirements;
use crate::scan;
use c2cpp_config::StageKind;
use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use tracing::debug;

/// How a heap variable was allocated, which decides its `delete` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocShape {
    Scalar,
    Array,
}

/// Mutable state of one translation, shared by all units.
///
/// Allocation shapes are keyed by the variable text and accumulate across the
/// whole translation unit, so a variable allocated in one function and freed
/// in another is still matched.
#[derive(Debug)]
pub struct RewriteContext<'c> {
    pub catalog: &'c Catalog,
    pub allocations: IndexMap<String, AllocShape>,
    /// A `std::function` was introduced.
    pub needs_functional: bool,
    /// Functions replaced wholesale by an idiom, whose C prototypes must go.
    pub replaced_idioms: IndexSet<SmolStr>,
}

impl<'c> RewriteContext<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            allocations: IndexMap::new(),
            needs_functional: false,
            replaced_idioms: IndexSet::new(),
        }
    }

    /// Record an allocation shape. Array wins over scalar for good.
    pub fn record_allocation(&mut self, var: &str, shape: AllocShape) {
        let entry = self.allocations.entry(var.to_string()).or_insert(shape);
        if shape == AllocShape::Array {
            *entry = AllocShape::Array;
        }
    }

    pub fn allocation(&self, var: &str) -> Option<AllocShape> {
        self.allocations.get(var).copied()
    }

    pub fn header_requirements(&self) -> HeaderRequirements {
        HeaderRequirements {
            iomanip: self.catalog.needs_iomanip,
            functional: self.needs_functional,
        }
    }
}

/// One textual rewrite over a complete function definition.
pub trait RewriteStage: Send + Sync {
    fn kind(&self) -> StageKind;

    fn rewrite(&self, text: &str, cx: &mut RewriteContext<'_>) -> String;
}

/// Build the stage for a kind.
pub fn stage_for(kind: StageKind) -> Box<dyn RewriteStage> {
    match kind {
        StageKind::Allocation => Box::new(AllocationStage),
        StageKind::FormattedOutput => Box::new(FormattedOutputStage),
        StageKind::FormattedInput => Box::new(FormattedInputStage),
        StageKind::MathNamespace => Box::new(MathNamespaceStage),
        StageKind::SwapIdiom => Box::new(SwapIdiomStage),
        StageKind::FunctionPointer => Box::new(FunctionPointerStage),
        StageKind::MethodCall => Box::new(MethodCallStage),
    }
}

/// A statement-position call `name(args);` found in `masked`.
pub(crate) struct StatementCall {
    pub start: usize,
    /// Index just past the terminating `;`.
    pub end: usize,
    pub open: usize,
    pub close: usize,
}

/// Every statement-position call to `name` whose result is discarded.
pub(crate) fn statement_calls(masked: &str, name: &str) -> Vec<StatementCall> {
    let mut calls = Vec::new();
    for id in scan::identifiers(masked) {
        if !id.is_bare() || id.text(masked) != name || !scan::at_statement_start(masked, id.start) {
            continue;
        }
        let Some((open, b'(')) = scan::next_non_ws(masked, id.end) else {
            continue;
        };
        let Some(close) = scan::matching_close(masked, open) else {
            continue;
        };
        let Some((semi, b';')) = scan::next_non_ws(masked, close + 1) else {
            continue;
        };
        calls.push(StatementCall {
            start: id.start,
            end: semi + 1,
            open,
            close,
        });
    }
    calls
}

/// An ordered list of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn RewriteStage>>,
}

impl Pipeline {
    pub fn new(kinds: &[StageKind]) -> Self {
        Self {
            stages: kinds.iter().copied().map(stage_for).collect(),
        }
    }

    /// All stages in their default order.
    pub fn standard() -> Self {
        Self::new(&StageKind::default_order())
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    /// Run every stage, in order, over one unit.
    pub fn run(&self, unit: &str, cx: &mut RewriteContext<'_>) -> String {
        let mut text = unit.to_string();
        for stage in &self.stages {
            let next = stage.rewrite(&text, cx);
            if next != text {
                debug!(stage = %stage.kind(), "stage rewrote unit");
                text = next;
            }
        }
        text
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_order() {
        assert_eq!(Pipeline::standard().kinds(), StageKind::default_order());
    }

    #[test]
    fn test_array_shape_wins() {
        let catalog = Catalog::default();
        let mut cx = RewriteContext::new(&catalog);
        cx.record_allocation("buf", AllocShape::Array);
        cx.record_allocation("buf", AllocShape::Scalar);
        cx.record_allocation("node", AllocShape::Scalar);
        assert_eq!(cx.allocation("buf"), Some(AllocShape::Array));
        assert_eq!(cx.allocation("node"), Some(AllocShape::Scalar));
        assert_eq!(cx.allocation("other"), None);
    }

    #[test]
    fn test_pipeline_runs_only_configured_stages() {
        let unit = "void swap_ints(int *a, int *b) {\n    int t = *a;\n    *a = *b;\n    *b = t;\n}";
        let catalog = Catalog::default();

        let mut cx = RewriteContext::new(&catalog);
        let out = Pipeline::new(&[StageKind::SwapIdiom]).run(unit, &mut cx);
        assert!(out.contains("std::swap(*a, *b);"));
        assert!(cx.replaced_idioms.contains("swap_ints"));

        let mut cx = RewriteContext::new(&catalog);
        let out = Pipeline::new(&[StageKind::Allocation]).run(unit, &mut cx);
        assert_eq!(out, unit);
        assert!(cx.replaced_idioms.is_empty());
    }
}
