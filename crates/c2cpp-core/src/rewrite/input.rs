//! `scanf` to `cin` extractions.

use super::{statement_calls, RewriteContext, RewriteStage};
use crate::edit::{apply_edits, Edit};
use crate::scan;
use c2cpp_config::StageKind;
use tracing::trace;

/// Formatted input translation. The format string is dropped and the targets
/// are read by one chained extraction, so the result stays a single statement.
pub struct FormattedInputStage;

impl RewriteStage for FormattedInputStage {
    fn kind(&self) -> StageKind {
        StageKind::FormattedInput
    }

    fn rewrite(&self, text: &str, _cx: &mut RewriteContext<'_>) -> String {
        let masked = scan::mask_code(text);
        let mut edits = Vec::new();

        for call in statement_calls(&masked, "scanf") {
            let inner = call.open + 1..call.close;
            let args = scan::split_args(&masked[inner.clone()], &text[inner]);
            if args.len() < 2 {
                continue;
            }
            let targets: String = args[1..]
                .iter()
                .map(|arg| format!(" >> {}", arg.strip_prefix('&').unwrap_or(arg).trim()))
                .collect();
            let statement = format!("cin{};", targets);
            trace!(%statement, "scanf to cin");
            edits.push(Edit::new(call.start, call.end, statement));
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
        FormattedInputStage.rewrite(text, &mut cx)
    }

    #[test]
    fn test_targets_become_extractions() {
        assert_eq!(rewrite(r#"scanf("%d %d", &a, & b);"#), "cin >> a >> b;");
        assert_eq!(rewrite(r#"scanf("%s", name);"#), "cin >> name;");
        assert_eq!(rewrite(r#"scanf("%d", &pts[i].x);"#), "cin >> pts[i].x;");
    }

    #[test]
    fn test_untouched_forms() {
        let src = r#"scanf("%d"); if (scanf("%d", &n) != 1) return 1; (void)scanf("%d", &n);"#;
        assert_eq!(rewrite(src), src);
    }

    #[test]
    fn test_unbraced_body_stays_one_statement() {
        assert_eq!(
            rewrite(r#"if (ok) scanf("%d %d", &a, &b); else n = 0;"#),
            "if (ok) cin >> a >> b; else n = 0;"
        );
        assert_eq!(
            rewrite(r#"while (more) scanf("%d%d", &x, &y);"#),
            "while (more) cin >> x >> y;"
        );
    }
}
