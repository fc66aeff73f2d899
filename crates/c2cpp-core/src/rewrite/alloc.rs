//! `malloc`/`calloc`/`free` to `new`/`delete`.

use super::{AllocShape, RewriteContext, RewriteStage};
use crate::edit::{apply_edits, Edit};
use crate::scan;
use c2cpp_config::StageKind;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

static MALLOC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<lhs>[A-Za-z_][\w.\[\]>-]*?)\s*=\s*(?:\(\s*(?P<cast>[A-Za-z_][\w\s]*?)\s*\*\s*\)\s*)?malloc\s*\(\s*(?P<arg>[^;]*?)\s*\)\s*;",
    )
    .expect("malloc regex")
});

static CALLOC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<lhs>[A-Za-z_][\w.\[\]>-]*?)\s*=\s*(?:\(\s*(?P<cast>[A-Za-z_][\w\s]*?)\s*\*\s*\)\s*)?calloc\s*\(\s*(?P<count>[^,;]+?)\s*,\s*sizeof\s*\(\s*(?P<ty>[^()]+?)\s*\)\s*\)\s*;",
    )
    .expect("calloc regex")
});

static FREE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfree\s*\(\s*(?P<var>[^;]+?)\s*\)\s*;").expect("free regex")
});

static SIZEOF_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^sizeof\s*\(\s*(?P<ty>[^()]+?)\s*\)$").expect("sizeof regex")
});

static SIZEOF_TIMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^sizeof\s*\(\s*(?P<ty>[^()]+?)\s*\)\s*\*\s*(?P<count>.+)$").expect("sizeof regex")
});

static TIMES_SIZEOF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<count>.+?)\s*\*\s*sizeof\s*\(\s*(?P<ty>[^()]+?)\s*\)$").expect("sizeof regex")
});

static TYPE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][\w\s]*\**$").expect("type name regex")
});

/// Allocation and deallocation translation.
pub struct AllocationStage;

/// Variable text with whitespace removed, used as the shape key.
fn var_key(lhs: &str) -> String {
    lhs.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Prefer the `sizeof` operand as the element type, falling back to the cast
/// when the operand is an expression such as `*p`.
fn element_type(sizeof_operand: &str, cast: Option<&str>) -> Option<String> {
    let operand = scan::normalize_ws(sizeof_operand);
    if TYPE_NAME.is_match(&operand) {
        return Some(operand);
    }
    cast.map(scan::normalize_ws)
}

/// The `new` expression and shape for a `malloc` argument.
fn malloc_replacement(arg: &str, cast: Option<&str>) -> Option<(String, AllocShape)> {
    if let Some(caps) = SIZEOF_ONLY.captures(arg) {
        let ty = element_type(&caps["ty"], cast)?;
        return Some((format!("new {}", ty), AllocShape::Scalar));
    }
    let caps = SIZEOF_TIMES
        .captures(arg)
        .or_else(|| TIMES_SIZEOF.captures(arg))?;
    let ty = element_type(&caps["ty"], cast)?;
    Some((
        format!("new {}[{}]", ty, caps["count"].trim()),
        AllocShape::Array,
    ))
}

/// Whether `var` is indexed anywhere in `masked`.
fn is_indexed(masked: &str, var: &str) -> bool {
    let pattern = format!(r"(?:^|[^\w.>]){}\s*\[", regex::escape(var));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(masked))
}

/// `free` reached through a member (`pool.free(x)`) is not the C library call.
fn is_member_call(masked: &str, at: usize) -> bool {
    let before = masked[..at].trim_end();
    before.ends_with('.') || before.ends_with("->")
}

impl RewriteStage for AllocationStage {
    fn kind(&self) -> StageKind {
        StageKind::Allocation
    }

    fn rewrite(&self, text: &str, cx: &mut RewriteContext<'_>) -> String {
        let masked = scan::mask_code(text);
        let mut edits = Vec::new();

        for caps in MALLOC.captures_iter(&masked) {
            let (Some(whole), Some(lhs), Some(arg)) =
                (caps.get(0), caps.name("lhs"), caps.name("arg"))
            else {
                continue;
            };
            let cast = caps.name("cast").map(|m| &text[m.range()]);
            let Some((expr, shape)) = malloc_replacement(&text[arg.range()], cast) else {
                continue;
            };
            let lhs = &text[lhs.range()];
            trace!(var = lhs, ?shape, "malloc to new");
            cx.record_allocation(&var_key(lhs), shape);
            edits.push(Edit::new(whole.start(), whole.end(), format!("{} = {};", lhs, expr)));
        }

        for caps in CALLOC.captures_iter(&masked) {
            let (Some(whole), Some(lhs), Some(count), Some(ty)) =
                (caps.get(0), caps.name("lhs"), caps.name("count"), caps.name("ty"))
            else {
                continue;
            };
            let cast = caps.name("cast").map(|m| &text[m.range()]);
            let Some(ty) = element_type(&text[ty.range()], cast) else {
                continue;
            };
            let lhs = &text[lhs.range()];
            trace!(var = lhs, "calloc to new[]");
            cx.record_allocation(&var_key(lhs), AllocShape::Array);
            edits.push(Edit::new(
                whole.start(),
                whole.end(),
                format!("{} = new {}[{}]();", lhs, ty, text[count.range()].trim()),
            ));
        }

        let indexed: Vec<String> = cx
            .allocations
            .keys()
            .filter(|var| is_indexed(&masked, var))
            .cloned()
            .collect();
        for var in indexed {
            cx.record_allocation(&var, AllocShape::Array);
        }

        for caps in FREE.captures_iter(&masked) {
            let (Some(whole), Some(var)) = (caps.get(0), caps.name("var")) else {
                continue;
            };
            if is_member_call(&masked, whole.start()) {
                continue;
            }
            let var = &text[var.range()];
            let replacement = match cx.allocation(&var_key(var)) {
                Some(AllocShape::Array) => format!("delete[] {};", var),
                Some(AllocShape::Scalar) => format!("delete {};", var),
                None => continue,
            };
            trace!(var, "free to delete");
            edits.push(Edit::new(whole.start(), whole.end(), replacement));
        }

        apply_edits(text, edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn rewrite(text: &str) -> String {
        let catalog = Catalog::default();
        let mut cx = RewriteContext::new(&catalog);
        AllocationStage.rewrite(text, &mut cx)
    }

    #[test]
    fn test_array_allocation() {
        let out = rewrite("p = (int*) malloc(sizeof(int) * 10);\nuse(p);\nfree(p);");
        assert_eq!(out, "p = new int[10];\nuse(p);\ndelete[] p;");
    }

    #[test]
    fn test_scalar_allocation() {
        let out = rewrite("p = (int*) malloc(sizeof(int));\n*p = 3;\nfree(p);");
        assert_eq!(out, "p = new int;\n*p = 3;\ndelete p;");
    }

    #[test]
    fn test_count_first_and_declaration() {
        let out = rewrite("double *xs = malloc(n * sizeof(double));\nfree(xs);");
        assert_eq!(out, "double *xs = new double[n];\ndelete[] xs;");
    }

    #[test]
    fn test_indexing_upgrades_scalar() {
        let out = rewrite("buf = (char *) malloc(sizeof(char));\nbuf[0] = 'a';\nfree(buf);");
        assert_eq!(out, "buf = new char;\nbuf[0] = 'a';\ndelete[] buf;");
    }

    #[test]
    fn test_calloc_and_member_target() {
        let out = rewrite(
            "list->items = (struct Item *) calloc(count, sizeof(struct Item));\nfree(list->items);",
        );
        assert_eq!(
            out,
            "list->items = new struct Item[count]();\ndelete[] list->items;"
        );
    }

    #[test]
    fn test_unrecognized_shapes_untouched() {
        let src = "p = malloc(len);\nq = malloc(sizeof(*q));\nfree(p);\npool.free(q);";
        assert_eq!(rewrite(src), src);
    }

    #[test]
    fn test_shapes_span_units() {
        let catalog = Catalog::default();
        let mut cx = RewriteContext::new(&catalog);
        let first = AllocationStage.rewrite("g = (int *)malloc(sizeof(int) * 4);", &mut cx);
        let second = AllocationStage.rewrite("free(g);", &mut cx);
        assert_eq!(first, "g = new int[4];");
        assert_eq!(second, "delete[] g;");
    }
}
