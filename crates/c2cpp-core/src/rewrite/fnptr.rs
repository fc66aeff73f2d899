//! Function pointer declarations to `std::function`.

use super::{RewriteContext, RewriteStage};
use crate::edit::{apply_edits, Edit};
use crate::scan;
use c2cpp_config::StageKind;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

static FUNCTION_POINTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<ret>[A-Za-z_][\w\s]*?\**)\s*\(\s*\*\s*(?P<name>[A-Za-z_]\w*)\s*\)\s*\((?P<params>[^()]*)\)\s*(?:=\s*(?P<init>[^;]+?)\s*)?;",
    )
    .expect("function pointer regex")
});

const NOT_TYPES: &[&str] = &["return", "else", "do", "case", "goto", "sizeof", "typedef"];

/// Function pointer translation.
pub struct FunctionPointerStage;

impl RewriteStage for FunctionPointerStage {
    fn kind(&self) -> StageKind {
        StageKind::FunctionPointer
    }

    fn rewrite(&self, text: &str, cx: &mut RewriteContext<'_>) -> String {
        let masked = scan::mask_code(text);
        let mut edits = Vec::new();

        for caps in FUNCTION_POINTER.captures_iter(&masked) {
            let (Some(whole), Some(ret), Some(name), Some(params)) = (
                caps.get(0),
                caps.name("ret"),
                caps.name("name"),
                caps.name("params"),
            ) else {
                continue;
            };
            let ret = scan::normalize_ws(&text[ret.range()]);
            if !scan::at_statement_start(&masked, whole.start())
                || ret.split_whitespace().any(|w| NOT_TYPES.contains(&w))
            {
                continue;
            }

            let params = scan::normalize_ws(&text[params.range()]);
            let name = &text[name.range()];
            let declaration = match caps.name("init") {
                Some(init) => format!(
                    "function<{}({})> {} = {};",
                    ret,
                    params,
                    name,
                    text[init.range()].trim()
                ),
                None => format!("function<{}({})> {};", ret, params, name),
            };
            trace!(%declaration, "function pointer to std::function");
            cx.needs_functional = true;
            edits.push(Edit::new(whole.start(), whole.end(), declaration));
        }

        apply_edits(text, edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn rewrite(text: &str) -> (String, bool) {
        let catalog = Catalog::default();
        let mut cx = RewriteContext::new(&catalog);
        let out = FunctionPointerStage.rewrite(text, &mut cx);
        (out, cx.needs_functional)
    }

    #[test]
    fn test_initialized_pointer() {
        let (out, functional) = rewrite("    int (*op)(int, int) = add;\n    op(1, 2);");
        assert_eq!(out, "    function<int(int, int)> op = add;\n    op(1, 2);");
        assert!(functional);
    }

    #[test]
    fn test_uninitialized_and_pointer_return() {
        let (out, _) = rewrite("char * (*pick)(const char *s);");
        assert_eq!(out, "function<char *(const char *s)> pick;");
    }

    #[test]
    fn test_calls_through_pointers_untouched() {
        let src = "return (*op)(a, b);\nx = y * (*f)(z);";
        let (out, functional) = rewrite(src);
        assert_eq!(out, src);
        assert!(!functional);
    }
}
