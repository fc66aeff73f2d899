//! Calls to struct-associated functions become member calls.

use super::{RewriteContext, RewriteStage};
use crate::edit::{apply_edits, Edit};
use crate::scan;
use c2cpp_config::StageKind;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// A receiver expression simple enough to put in front of `.` or `->`.
static RECEIVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_]\w*(?:\s*(?:\.|->)\s*[A-Za-z_]\w*|\s*\[[^\[\]]*\])*$")
        .expect("receiver regex")
});

/// Rewriting stops after this many passes even if nested calls remain.
const MAX_PASSES: usize = 8;

/// Method call translation: `m(&x, ...)` to `x.m(...)` and `m(p, ...)` to
/// `p->m(...)` for every cataloged method `m`.
pub struct MethodCallStage;

fn rewrite_once(text: &str, cx: &RewriteContext<'_>) -> String {
    let owners = cx.catalog.method_owners();
    let masked = scan::mask_code(text);
    let mut edits = Vec::new();

    for id in scan::identifiers(&masked) {
        let name = id.text(&masked);
        if !id.is_bare() || !owners.contains_key(name) {
            continue;
        }
        let Some((open, b'(')) = scan::next_non_ws(&masked, id.end) else {
            continue;
        };
        let Some(close) = scan::matching_close(&masked, open) else {
            continue;
        };
        let args = scan::split_args(&masked[open + 1..close], &text[open + 1..close]);
        let Some((first, rest)) = args.split_first() else {
            continue;
        };

        let call = if let Some(target) = first.strip_prefix('&').map(str::trim) {
            if !RECEIVER.is_match(target) {
                continue;
            }
            format!("{}.{}({})", target, name, rest.join(", "))
        } else if RECEIVER.is_match(first) {
            format!("{}->{}({})", first, name, rest.join(", "))
        } else {
            continue;
        };
        trace!(%call, "method call");
        edits.push(Edit::new(id.start, close + 1, call));
    }

    apply_edits(text, edits)
}

impl RewriteStage for MethodCallStage {
    fn kind(&self) -> StageKind {
        StageKind::MethodCall
    }

    fn rewrite(&self, text: &str, cx: &mut RewriteContext<'_>) -> String {
        if cx.catalog.method_count() == 0 {
            return text.to_string();
        }
        let mut current = text.to_string();
        for _ in 0..MAX_PASSES {
            let next = rewrite_once(&current, cx);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}
