//! Lexical scanning over raw C text.
//!
//! Nothing here tokenizes fully. Structural matching runs on a *masked* copy
//! of the source: same byte length, with comments and the contents of string
//! and character literals blanked to spaces. A span found in the masked text
//! is valid in the original, so callers match on one and slice the other.

use c2cpp_common::Span;
use std::ops::Range;

/// Blank comments and the contents of string/char literals.
///
/// Quote characters and newlines are kept, so line structure and literal
/// positions survive.
pub fn mask_code(src: &str) -> String {
    mask(src, true)
}

/// Blank comments only; literal contents are kept.
pub fn strip_comments(src: &str) -> String {
    mask(src, false)
}

fn mask(src: &str, blank_literals: bool) -> String {
    let bytes = src.as_bytes();
    let len = bytes.len();
    let mut out = Vec::with_capacity(len);
    let mut i = 0;

    // Multi-byte characters are copied or blanked byte-by-byte. UTF-8
    // continuation bytes never collide with the ASCII bytes matched below.
    let blank = |b: u8| if b == b'\n' { b'\n' } else { b' ' };

    while i < len {
        let b = bytes[i];
        match b {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < len && bytes[i] != b'\n' {
                    out.push(b' ');
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.extend_from_slice(b"  ");
                i += 2;
                while i < len && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    out.push(blank(bytes[i]));
                    i += 1;
                }
                if i < len {
                    out.extend_from_slice(b"  ");
                    i += 2;
                }
            }
            b'"' | b'\'' => {
                let quote = b;
                out.push(quote);
                i += 1;
                while i < len {
                    let c = bytes[i];
                    if c == b'\\' && i + 1 < len && bytes[i + 1] != b'\n' {
                        if blank_literals {
                            out.extend_from_slice(b"  ");
                        } else {
                            out.push(c);
                            out.push(bytes[i + 1]);
                        }
                        i += 2;
                        continue;
                    }
                    if c == quote {
                        out.push(c);
                        i += 1;
                        break;
                    }
                    if c == b'\n' {
                        // unterminated literal ends at the line break
                        break;
                    }
                    out.push(if blank_literals { b' ' } else { c });
                    i += 1;
                }
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Find the delimiter closing the one at `open`.
///
/// `masked` must come from [`mask_code`]. Supports `()`, `[]` and `{}`;
/// only the delimiter kind found at `open` is counted. Returns `None` when the
/// byte at `open` is not an opening delimiter or the block never closes.
pub fn matching_close(masked: &str, open: usize) -> Option<usize> {
    let bytes = masked.as_bytes();
    let (o, c) = match bytes.get(open)? {
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        b'{' => (b'{', b'}'),
        _ => return None,
    };

    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if b == o {
            depth += 1;
        } else if b == c {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split `masked` on `sep` occurring at nesting depth zero.
///
/// Empty input yields no pieces. Ranges are relative to `masked`.
pub fn split_top_level(masked: &str, sep: u8) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    if masked.trim().is_empty() {
        return pieces;
    }

    let mut depth = 0i32;
    let mut start = 0;
    for (i, b) in masked.bytes().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ if b == sep && depth == 0 => {
                pieces.push(start..i);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(start..masked.len());
    pieces
}

/// Split comma-separated arguments, returning each one trimmed.
///
/// `masked` drives the splitting, `original` supplies the text.
pub fn split_args<'a>(masked: &str, original: &'a str) -> Vec<&'a str> {
    split_top_level(masked, b',')
        .into_iter()
        .map(|r| original[r].trim())
        .collect()
}

/// Collapse every whitespace run to one space and trim.
pub fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub fn is_identifier(text: &str) -> bool {
    let mut bytes = text.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic() || b == b'_') && bytes.all(is_ident_byte)
}

/// How an identifier occurrence is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentAccess {
    /// A bare name.
    Bare,
    /// After `.` or `->`.
    Member,
    /// After `::`.
    Qualified,
}

/// One identifier occurrence in masked text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentRef {
    pub start: usize,
    pub end: usize,
    pub access: IdentAccess,
}

impl IdentRef {
    pub fn is_bare(&self) -> bool {
        self.access == IdentAccess::Bare
    }

    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }
}

/// Every identifier in `masked`, in order. Numbers (`1e5`, `0x1f`) are skipped.
pub fn identifiers(masked: &str) -> Vec<IdentRef> {
    let bytes = masked.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !is_ident_byte(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && is_ident_byte(bytes[i]) {
            i += 1;
        }
        if bytes[start].is_ascii_digit() {
            continue;
        }

        let before = masked[..start].trim_end();
        let access = if before.ends_with("::") {
            IdentAccess::Qualified
        } else if before.ends_with("->") || (before.ends_with('.') && !before.ends_with("..")) {
            IdentAccess::Member
        } else {
            IdentAccess::Bare
        };
        out.push(IdentRef { start, end: i, access });
    }

    out
}

/// First non-whitespace byte at or after `pos`, with its index.
pub fn next_non_ws(masked: &str, pos: usize) -> Option<(usize, u8)> {
    masked
        .bytes()
        .enumerate()
        .skip(pos)
        .find(|(_, b)| !b.is_ascii_whitespace())
}

/// Whether a call starting at `pos` stands at the beginning of a statement,
/// rather than inside an expression.
pub fn at_statement_start(masked: &str, pos: usize) -> bool {
    let before = masked[..pos].trim_end();
    match before.bytes().last() {
        None => true,
        Some(b';' | b'{' | b'}' | b':') => true,
        Some(b')') => closes_condition(before),
        Some(_) => ends_with_keyword(before, "else") || ends_with_keyword(before, "do"),
    }
}

/// `text` ends with the `)` of an `if`, `for`, `while` or `switch` header.
/// A cast such as `(void)` does not count.
fn closes_condition(text: &str) -> bool {
    let Some(open) = matching_open(text, text.len() - 1) else {
        return false;
    };
    let head = text[..open].trim_end();
    ["if", "for", "while", "switch"]
        .iter()
        .any(|kw| ends_with_keyword(head, kw))
}

/// Find the `(` opening the `)` at `close`, scanning backwards.
fn matching_open(masked: &str, close: usize) -> Option<usize> {
    let bytes = masked.as_bytes();
    if bytes.get(close) != Some(&b')') {
        return None;
    }
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn ends_with_keyword(text: &str, keyword: &str) -> bool {
    text.ends_with(keyword)
        && text[..text.len() - keyword.len()]
            .bytes()
            .last()
            .map_or(true, |b| !is_ident_byte(b))
}

/// A top-level piece of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// A preprocessor line, including backslash continuations.
    Directive,
    /// `header { ... }` with balanced braces.
    Block { open: usize, close: usize },
    /// Text up to and including a depth-0 `;`.
    Statement,
    /// `header { ...` that never closes; runs to the end of input.
    Unterminated { open: usize },
}

/// A top-level segment with its span in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub span: Span,
}

impl Segment {
    /// Text before the opening brace of a block, or the whole segment.
    pub fn header<'a>(&self, src: &'a str) -> &'a str {
        match self.kind {
            SegmentKind::Block { open, .. } | SegmentKind::Unterminated { open } => {
                &src[self.span.start as usize..open]
            }
            _ => self.span.slice(src),
        }
    }

    /// Text between the braces of a block.
    pub fn body<'a>(&self, src: &'a str) -> Option<&'a str> {
        match self.kind {
            SegmentKind::Block { open, close } => Some(&src[open + 1..close]),
            _ => None,
        }
    }

    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        self.span.slice(src)
    }
}

/// Split a translation unit into top-level segments.
///
/// A brace block whose header ends in `=` is an aggregate initializer and
/// stays part of its statement.
pub fn segments(src: &str) -> Vec<Segment> {
    let masked = mask_code(src);
    let bytes = masked.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < len {
        let b = bytes[i];
        let seg_start = match start {
            Some(s) => s,
            None => {
                if b.is_ascii_whitespace() {
                    i += 1;
                    continue;
                }
                if b == b'#' {
                    let end = directive_end(bytes, i);
                    out.push(Segment {
                        kind: SegmentKind::Directive,
                        span: Span::new(i, end),
                    });
                    i = end;
                    continue;
                }
                start = Some(i);
                i
            }
        };

        match b {
            b';' => {
                out.push(Segment {
                    kind: SegmentKind::Statement,
                    span: Span::new(seg_start, i + 1),
                });
                start = None;
                i += 1;
            }
            b'{' => match matching_close(&masked, i) {
                None => {
                    out.push(Segment {
                        kind: SegmentKind::Unterminated { open: i },
                        span: Span::new(seg_start, len),
                    });
                    return out;
                }
                Some(close) if masked[seg_start..i].trim_end().ends_with('=') => {
                    i = close + 1;
                }
                Some(close) => {
                    out.push(Segment {
                        kind: SegmentKind::Block { open: i, close },
                        span: Span::new(seg_start, close + 1),
                    });
                    start = None;
                    i = close + 1;
                }
            },
            _ => i += 1,
        }
    }

    if let Some(s) = start {
        let tail = masked[s..].trim_end();
        if !tail.is_empty() {
            out.push(Segment {
                kind: SegmentKind::Statement,
                span: Span::new(s, s + tail.len()),
            });
        }
    }

    out
}

fn directive_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let continued = bytes[from..i]
                .iter()
                .rev()
                .find(|b| **b != b' ' && **b != b'\t' && **b != b'\r')
                == Some(&b'\\');
            if !continued {
                break;
            }
        }
        i += 1;
    }
    // trailing whitespace and `\r` are not part of the directive
    while i > from && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_keeps_length_and_blanks_literals() {
        let src = "printf(\"a { b\"); // }\nchar c = '}'; /* { */ x";
        let masked = mask_code(src);
        assert_eq!(masked.len(), src.len());
        assert!(!masked.contains('}'));
        assert!(!masked.contains("a { b"));
        assert!(masked.starts_with("printf(\""));
        assert!(masked.ends_with(" x"));
        assert_eq!(masked.matches('\n').count(), 1);
    }

    #[test]
    fn test_strip_comments_keeps_literals() {
        let src = "#define MSG \"hi // there\" // note";
        let stripped = strip_comments(src);
        assert_eq!(stripped.trim_end(), "#define MSG \"hi // there\"");
    }

    #[test]
    fn test_escaped_quote_does_not_end_literal() {
        let src = r#"s = "say \"{\""; t = 1;"#;
        let masked = mask_code(src);
        assert!(!masked.contains('{'));
        assert!(masked.ends_with("t = 1;"));
    }

    #[test]
    fn test_matching_close_nested() {
        let src = "f() { if (x) { y(); } else { z(); } } tail";
        let masked = mask_code(src);
        let open = src.find('{').unwrap();
        let close = matching_close(&masked, open).unwrap();
        assert_eq!(&src[close + 1..], " tail");

        let paren = src.find('(').unwrap();
        assert_eq!(matching_close(&masked, paren), Some(paren + 1));
    }

    #[test]
    fn test_matching_close_unbalanced() {
        let masked = mask_code("{ { }");
        assert_eq!(matching_close(&masked, 0), None);
        assert_eq!(matching_close(&masked, 2), Some(4));
        assert_eq!(matching_close(&masked, 3), None);
    }

    #[test]
    fn test_split_top_level_respects_nesting() {
        let text = "a, f(b, c), d[1,2]";
        let pieces: Vec<_> = split_top_level(text, b',')
            .into_iter()
            .map(|r| text[r].trim())
            .collect();
        assert_eq!(pieces, vec!["a", "f(b, c)", "d[1,2]"]);
        assert!(split_top_level("  ", b',').is_empty());
    }

    #[test]
    fn test_split_args_uses_original_text() {
        let src = r#""a, b", x"#;
        let masked = mask_code(src);
        assert_eq!(split_args(&masked, src), vec![r#""a, b""#, "x"]);
    }

    #[test]
    fn test_identifiers_classify_access() {
        let masked = mask_code("p->x + q.y + std::z + w + 1e5");
        let ids: Vec<_> = identifiers(&masked)
            .into_iter()
            .map(|id| (id.text(&masked).to_string(), id.access))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("p".to_string(), IdentAccess::Bare),
                ("x".to_string(), IdentAccess::Member),
                ("q".to_string(), IdentAccess::Bare),
                ("y".to_string(), IdentAccess::Member),
                ("std".to_string(), IdentAccess::Bare),
                ("z".to_string(), IdentAccess::Qualified),
                ("w".to_string(), IdentAccess::Bare),
            ]
        );
    }

    #[test]
    fn test_at_statement_start() {
        let masked = mask_code("x = 1; printf(); if (a) b(); y = c(); else d();");
        assert!(at_statement_start(&masked, masked.find("printf").unwrap()));
        assert!(at_statement_start(&masked, masked.find("b()").unwrap()));
        assert!(!at_statement_start(&masked, masked.find("c()").unwrap()));
        assert!(at_statement_start(&masked, masked.find("d()").unwrap()));
    }

    #[test]
    fn test_cast_is_not_a_statement_start() {
        let masked = mask_code("(void) f(); (void)g(); while (f(x)) h(); for (;;) k(); sz = (int) m();");
        assert!(!at_statement_start(&masked, masked.find("f()").unwrap()));
        assert!(!at_statement_start(&masked, masked.find("g()").unwrap()));
        assert!(at_statement_start(&masked, masked.find("h()").unwrap()));
        assert!(at_statement_start(&masked, masked.find("k()").unwrap()));
        assert!(!at_statement_start(&masked, masked.find("m()").unwrap()));
    }

    #[test]
    fn test_segments_classify_top_level() {
        let src = "#include <stdio.h>\n#define SQ(x) \\\n  ((x)*(x))\nint g = 3;\nint t[] = {1, 2};\nstruct P { int x; };\nint main() { return 0; }\n";
        let segs = segments(src);
        let kinds: Vec<_> = segs
            .iter()
            .map(|s| match s.kind {
                SegmentKind::Directive => "directive",
                SegmentKind::Block { .. } => "block",
                SegmentKind::Statement => "statement",
                SegmentKind::Unterminated { .. } => "unterminated",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "directive",
                "directive",
                "statement",
                "statement",
                "block",
                "statement",
                "block"
            ]
        );
        assert_eq!(segs[1].text(src), "#define SQ(x) \\\n  ((x)*(x))");
        assert_eq!(segs[3].text(src), "int t[] = {1, 2};");
        assert_eq!(segs[4].header(src).trim(), "struct P");
        assert_eq!(segs[4].body(src), Some(" int x; "));
        assert_eq!(segs[5].text(src), ";");
        assert_eq!(segs[6].header(src).trim(), "int main()");
    }

    #[test]
    fn test_segments_skip_comments_and_report_unterminated() {
        let src = "// int lost;\nvoid f() { /* } */ if (x) {\n";
        let segs = segments(src);
        assert_eq!(segs.len(), 1);
        assert!(matches!(segs[0].kind, SegmentKind::Unterminated { .. }));
        assert_eq!(segs[0].header(src).trim(), "void f()");
    }

    #[test]
    fn test_normalize_and_identifier_checks() {
        assert_eq!(normalize_ws("  int \n *  p "), "int * p");
        assert!(is_identifier("_tmp1"));
        assert!(!is_identifier("1tmp"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(""));
    }
}
