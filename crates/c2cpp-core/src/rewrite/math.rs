//! `<cmath>` calls qualified with `std::`.

use super::{RewriteContext, RewriteStage};
use crate::edit::{apply_edits, Edit};
use crate::scan;
use c2cpp_config::StageKind;

const MATH_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "sinh", "cosh", "tanh", "exp", "log",
    "log10", "pow", "sqrt", "ceil", "floor", "fabs", "fmod",
];

/// Math namespacing. Active only when the unit includes `<math.h>`.
pub struct MathNamespaceStage;

impl RewriteStage for MathNamespaceStage {
    fn kind(&self) -> StageKind {
        StageKind::MathNamespace
    }

    fn rewrite(&self, text: &str, cx: &mut RewriteContext<'_>) -> String {
        if !cx.catalog.includes_math() {
            return text.to_string();
        }
        let masked = scan::mask_code(text);
        let edits = scan::identifiers(&masked)
            .into_iter()
            .filter(|id| id.is_bare() && MATH_FUNCTIONS.contains(&id.text(&masked)))
            .filter(|id| matches!(scan::next_non_ws(&masked, id.end), Some((_, b'('))))
            .map(|id| Edit::new(id.start, id.start, "std::"))
            .collect();
        apply_edits(text, edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_qualifies_calls_only() {
        let catalog = Catalog::build("#include <math.h>\n");
        let mut cx = RewriteContext::new(&catalog);
        let out = MathNamespaceStage.rewrite(
            "double r = sqrt(pow(x, 2)) + std::floor(y) + v.sin(1) + cosine(2) + log10 (z); int exp = 1; puts(\"sin(x)\");",
            &mut cx,
        );
        assert_eq!(
            out,
            "double r = std::sqrt(std::pow(x, 2)) + std::floor(y) + v.sin(1) + cosine(2) + std::log10 (z); int exp = 1; puts(\"sin(x)\");"
        );
    }

    #[test]
    fn test_inactive_without_math_header() {
        let catalog = Catalog::build("#include <stdio.h>\n");
        let mut cx = RewriteContext::new(&catalog);
        assert_eq!(MathNamespaceStage.rewrite("y = sqrt(x);", &mut cx), "y = sqrt(x);");
    }
}
