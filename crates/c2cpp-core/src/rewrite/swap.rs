//! Pointer-swap functions replaced by a `std::swap` template.

use super::{RewriteContext, RewriteStage};
use crate::scan;
use c2cpp_config::StageKind;
use regex::Regex;
use smol_str::SmolStr;
use std::sync::LazyLock;
use tracing::debug;

static SWAP_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^\s*(?P<quals>(?:static\s+|inline\s+)*)void\s+(?P<name>[A-Za-z_]\w*)\s*
        \(\s*(?P<ty_a>[A-Za-z_][\w\s]*?)\s*\*\s*(?P<a>[A-Za-z_]\w*)\s*,
          \s*(?P<ty_b>[A-Za-z_][\w\s]*?)\s*\*\s*(?P<b>[A-Za-z_]\w*)\s*\)\s*
        \{\s*
            (?P<ty_tmp>[A-Za-z_][\w\s]*?)\s+(?P<tmp>[A-Za-z_]\w*)\s*=\s*\*\s*(?P<first>[A-Za-z_]\w*)\s*;\s*
            \*\s*(?P<lhs>[A-Za-z_]\w*)\s*=\s*\*\s*(?P<rhs>[A-Za-z_]\w*)\s*;\s*
            \*\s*(?P<last>[A-Za-z_]\w*)\s*=\s*(?P<tmp_use>[A-Za-z_]\w*)\s*;\s*
        \}\s*$",
    )
    .expect("swap regex")
});

/// Swap idiom recognition.
pub struct SwapIdiomStage;

impl RewriteStage for SwapIdiomStage {
    fn kind(&self) -> StageKind {
        StageKind::SwapIdiom
    }

    fn rewrite(&self, text: &str, cx: &mut RewriteContext<'_>) -> String {
        let masked = scan::mask_code(text);
        let Some(caps) = SWAP_FUNCTION.captures(&masked) else {
            return text.to_string();
        };

        let name = &caps["name"];
        let (a, b) = (&caps["a"], &caps["b"]);
        let ty = scan::normalize_ws(&caps["ty_a"]);
        let canonical = name.to_ascii_lowercase().contains("swap")
            && a != b
            && scan::normalize_ws(&caps["ty_b"]) == ty
            && scan::normalize_ws(&caps["ty_tmp"]) == ty
            && caps["tmp_use"] == caps["tmp"]
            && caps["first"] == caps["lhs"]
            && caps["rhs"] == caps["last"]
            && ((&caps["first"], &caps["rhs"]) == (a, b) || (&caps["first"], &caps["rhs"]) == (b, a));
        if !canonical {
            return text.to_string();
        }

        debug!(name, "swap function replaced by std::swap");
        cx.replaced_idioms.insert(SmolStr::new(name));
        format!(
            "template<typename T>\n{}void {}(T* {}, T* {}) {{\n    std::swap(*{}, *{});\n}}",
            &caps["quals"], name, a, b, a, b
        )
    }
}
