//! `printf` to `cout` chains.

use super::{statement_calls, RewriteContext, RewriteStage};
use crate::edit::{apply_edits, Edit};
use crate::scan;
use c2cpp_config::StageKind;
use tracing::trace;

/// Formatted output translation.
pub struct FormattedOutputStage;

/// One piece of a parsed format string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    /// Literal text, still escaped as in the source.
    Text(String),
    Spec {
        /// Precision of a `%.<n>f` or `%.<n>g` conversion.
        precision: Option<u32>,
        /// Extra arguments consumed by `*` width or precision.
        star_args: usize,
    },
}

const FLAGS: &[u8] = b"-+ #0";
const LENGTHS: &[&str] = &["hh", "ll", "h", "l", "L", "z", "j", "t"];
const CONVERSIONS: &[u8] = b"diouxXeEfFgGaAcspn";

/// Parse one conversion starting after its `%`. Returns the piece and the
/// index just past the conversion character.
fn parse_spec(fmt: &[u8], mut i: usize) -> Option<(Piece, usize)> {
    let bare_precision = fmt.get(i) == Some(&b'.');
    let mut star_args = 0;
    while fmt.get(i).is_some_and(|b| FLAGS.contains(b)) {
        i += 1;
    }
    if fmt.get(i) == Some(&b'*') {
        star_args += 1;
        i += 1;
    } else {
        while fmt.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
    }

    let mut precision = None;
    if fmt.get(i) == Some(&b'.') {
        i += 1;
        if fmt.get(i) == Some(&b'*') {
            star_args += 1;
            i += 1;
        } else {
            let start = i;
            while fmt.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
            precision = std::str::from_utf8(&fmt[start..i])
                .ok()
                .and_then(|digits| digits.parse::<u32>().ok());
        }
    }

    let length = LENGTHS
        .iter()
        .find(|l| fmt.get(i..).is_some_and(|rest| rest.starts_with(l.as_bytes())));
    if let Some(len) = length {
        i += len.len();
    }

    let conversion = *fmt.get(i)?;
    if !CONVERSIONS.contains(&conversion) {
        return None;
    }
    // only the plain `%.<n>f` / `%.<n>g` form carries its precision over
    let precision =
        precision.filter(|_| bare_precision && length.is_none() && matches!(conversion, b'f' | b'g'));
    Some((
        Piece::Spec {
            precision,
            star_args,
        },
        i + 1,
    ))
}

/// Split a format string (the text between the quotes) into pieces.
fn parse_format(fmt: &str) -> Vec<Piece> {
    let bytes = fmt.as_bytes();
    let mut pieces = Vec::new();
    let mut text = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                text.extend_from_slice(&bytes[i..i + 2]);
                i += 2;
            }
            b'%' if bytes.get(i + 1) == Some(&b'%') => {
                text.push(b'%');
                i += 2;
            }
            b'%' => match parse_spec(bytes, i + 1) {
                Some((piece, next)) => {
                    if !text.is_empty() {
                        pieces.push(Piece::Text(String::from_utf8_lossy(&text).into_owned()));
                        text.clear();
                    }
                    pieces.push(piece);
                    i = next;
                }
                None => {
                    text.push(b'%');
                    i += 1;
                }
            },
            b => {
                text.push(b);
                i += 1;
            }
        }
    }
    if !text.is_empty() {
        pieces.push(Piece::Text(String::from_utf8_lossy(&text).into_owned()));
    }
    pieces
}

/// Parenthesize arguments whose top-level operators bind looser than `<<`.
fn stream_operand(arg: &str) -> String {
    let masked = scan::mask_code(arg).replace("->", "  ");
    let mut depth = 0i32;
    let loose = masked.bytes().any(|b| {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            _ => {}
        }
        depth == 0 && b"?|^&<>=,".contains(&b)
    });
    if loose {
        format!("({})", arg)
    } else {
        arg.to_string()
    }
}

/// Build the `cout` statement for a format and its arguments.
fn cout_statement(fmt: &str, args: &[&str]) -> String {
    let mut pieces = parse_format(fmt);

    let mut trailing_newline = false;
    if let Some(Piece::Text(last)) = pieces.last_mut() {
        if let Some(rest) = last.strip_suffix("\\n") {
            let escaped = rest.bytes().rev().take_while(|b| *b == b'\\').count() % 2 == 1;
            if !escaped {
                trailing_newline = true;
                *last = rest.to_string();
                if last.is_empty() {
                    pieces.pop();
                }
            }
        }
    }

    let mut parts = Vec::new();
    let mut args = args.iter();
    for piece in pieces {
        match piece {
            Piece::Text(text) => parts.push(format!("\"{}\"", text)),
            Piece::Spec {
                precision,
                star_args,
            } => {
                for _ in 0..star_args {
                    args.next();
                }
                let Some(arg) = args.next() else {
                    continue;
                };
                let operand = stream_operand(arg);
                parts.push(match precision {
                    Some(n) => format!("fixed << setprecision({}) << {}", n, operand),
                    None => operand,
                });
            }
        }
    }
    if trailing_newline {
        parts.push("endl".to_string());
    }
    if parts.is_empty() {
        parts.push("\"\"".to_string());
    }

    format!("cout << {};", parts.join(" << "))
}

/// The contents of `arg` when it is exactly one string literal, possibly
/// surrounded by whitespace or comments. Positions come from `masked_arg`.
fn single_literal<'a>(arg: &'a str, masked_arg: &str) -> Option<&'a str> {
    let open = masked_arg.find('"')?;
    let close = masked_arg.rfind('"')?;
    let outside_blank = masked_arg[..open].trim().is_empty()
        && masked_arg[close + 1..].trim().is_empty();
    if close > open && outside_blank && masked_arg.matches('"').count() == 2 {
        arg.get(open + 1..close)
    } else {
        None
    }
}

impl RewriteStage for FormattedOutputStage {
    fn kind(&self) -> StageKind {
        StageKind::FormattedOutput
    }

    fn rewrite(&self, text: &str, _cx: &mut RewriteContext<'_>) -> String {
        let masked = scan::mask_code(text);
        let mut edits = Vec::new();

        for call in statement_calls(&masked, "printf") {
            let inner = call.open + 1..call.close;
            let pieces = scan::split_top_level(&masked[inner.clone()], b',');
            let Some(first) = pieces.first() else {
                continue;
            };
            let base = inner.start;
            let fmt_range = base + first.start..base + first.end;
            let Some(fmt) = single_literal(&text[fmt_range.clone()], &masked[fmt_range]) else {
                continue;
            };
            let args: Vec<&str> = pieces[1..]
                .iter()
                .map(|r| text[base + r.start..base + r.end].trim())
                .collect();

            let statement = cout_statement(fmt, &args);
            trace!(%statement, "printf to cout");
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
        FormattedOutputStage.rewrite(text, &mut cx)
    }

    #[test]
    fn test_value_with_newline() {
        assert_eq!(
            rewrite(r#"printf("Value: %d\n", x);"#),
            r#"cout << "Value: " << x << endl;"#
        );
    }

    #[test]
    fn test_plain_and_empty() {
        assert_eq!(rewrite(r#"printf("Hello, World!\n");"#), r#"cout << "Hello, World!" << endl;"#);
        assert_eq!(rewrite(r#"printf("\n");"#), "cout << endl;");
        assert_eq!(rewrite(r#"printf("");"#), r#"cout << "";"#);
    }

    #[test]
    fn test_precision_and_percent() {
        assert_eq!(
            rewrite(r#"printf("%.2f%% of %s\n", ratio * 100, name);"#),
            r#"cout << fixed << setprecision(2) << ratio * 100 << "% of " << name << endl;"#
        );
    }

    #[test]
    fn test_argument_count_mismatch() {
        assert_eq!(rewrite(r#"printf("%d and %d", a);"#), r#"cout << a << " and ";"#);
        assert_eq!(rewrite(r#"printf("%d", a, b);"#), "cout << a;");
    }

    #[test]
    fn test_star_width_and_operator_args() {
        assert_eq!(
            rewrite(r#"printf("[%*d] %d\n", w, n, a < b);"#),
            r#"cout << "[" << n << "] " << (a < b) << endl;"#
        );
        assert_eq!(rewrite(r#"printf("%d", p->n);"#), "cout << p->n;");
        assert_eq!(rewrite(r#"printf("%d", max(a, b));"#), "cout << max(a, b);");
        assert_eq!(rewrite(r#"printf("%d", x & 1);"#), "cout << (x & 1);");
    }

    #[test]
    fn test_non_statement_and_non_literal_untouched() {
        let src = r#"int n = printf("x"); printf(fmt, 1); printf("a" "b"); obj.printf("c");"#;
        assert_eq!(rewrite(src), src);
    }

    #[test]
    fn test_comment_around_format() {
        assert_eq!(
            rewrite("printf(/* c */ \"x\\n\");"),
            "cout << \"x\" << endl;"
        );
        assert_eq!(
            rewrite("printf(\"%d\" /* count */, n);"),
            "cout << n;"
        );
    }

    #[test]
    fn test_cast_discarded_call_untouched() {
        let src = r#"(void) printf("x\n"); (void)printf("%d", n);"#;
        assert_eq!(rewrite(src), src);
    }

    #[test]
    fn test_inside_control_flow() {
        assert_eq!(
            rewrite("if (ok) printf(\"yes\\n\"); else printf(\"no\");"),
            "if (ok) cout << \"yes\" << endl; else cout << \"no\";"
        );
    }

    #[test]
    fn test_parse_format_pieces() {
        assert_eq!(
            parse_format("%5.1lf|%-3s%q"),
            vec![
                Piece::Spec {
                    precision: None,
                    star_args: 0
                },
                Piece::Text("|".into()),
                Piece::Spec {
                    precision: None,
                    star_args: 0
                },
                Piece::Text("%q".into()),
            ]
        );
        assert_eq!(
            parse_format("%.3g"),
            vec![Piece::Spec {
                precision: Some(3),
                star_args: 0
            }]
        );
    }
}
