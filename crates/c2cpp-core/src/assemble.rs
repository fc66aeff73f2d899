//! Program assembly: locate `main`, rewrite every unit, emit the sections.

use crate::catalog::Catalog;
use crate::classes;
use crate::constants;
use crate::error::{Result, TranslateError};
use crate::headers;
use crate::rewrite::{Pipeline, RewriteContext};
use crate::scan;
use c2cpp_common::Span;
use c2cpp_config::OutputConfig;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static MAIN_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bint\s+main\s*\(").expect("main regex"));

const DEFAULT_MAIN_PARAMS: &str = "int argc, char* argv[]";

/// The located `main` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MainFunction {
    /// Parameter list as written, whitespace-normalized.
    pub params: String,
    /// Text between the braces.
    pub body: String,
    pub span: Span,
}

impl MainFunction {
    /// `int main(...) { ... }` with the emitted parameter list.
    pub fn definition(&self) -> String {
        let params = if self.params.is_empty() || self.params == "void" {
            DEFAULT_MAIN_PARAMS
        } else {
            self.params.as_str()
        };
        format!("int main({}) {{{}}}", params, self.body)
    }
}

/// Find the `main` definition, skipping prototypes.
pub(crate) fn locate_main(src: &str) -> Result<MainFunction> {
    let masked = scan::mask_code(src);

    for m in MAIN_SIGNATURE.find_iter(&masked) {
        let open = m.end() - 1;
        let Some(close) = scan::matching_close(&masked, open) else {
            continue;
        };
        match scan::next_non_ws(&masked, close + 1) {
            Some((brace, b'{')) => {
                let Some(end) = scan::matching_close(&masked, brace) else {
                    return Err(TranslateError::UnbalancedMain {
                        span: Span::new(m.start(), masked.len()).into(),
                    });
                };
                return Ok(MainFunction {
                    params: scan::normalize_ws(&src[open + 1..close]),
                    body: src[brace + 1..end].to_string(),
                    span: Span::new(m.start(), end + 1),
                });
            }
            _ => continue,
        }
    }

    Err(TranslateError::MissingMain)
}

/// Output lines grouped into blank-line separated sections.
struct Emitter<'a> {
    lines: Vec<String>,
    config: &'a OutputConfig,
}

impl<'a> Emitter<'a> {
    fn new(config: &'a OutputConfig) -> Self {
        Self {
            lines: Vec::new(),
            config,
        }
    }

    fn comment(&mut self, comment: &str) {
        if self.config.section_comments {
            self.lines.push(comment.to_string());
        }
    }

    /// Lines followed by a blank line; nothing when empty.
    fn block(&mut self, body: Vec<String>) {
        if body.is_empty() {
            return;
        }
        self.lines.extend(body);
        self.lines.push(String::new());
    }

    /// A commented block; skipped entirely when empty.
    fn section<I>(&mut self, comment: &str, body: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let body: Vec<String> = body.into_iter().map(Into::into).collect();
        if !body.is_empty() {
            self.comment(comment);
            self.block(body);
        }
    }

    fn finish(mut self) -> String {
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Translate one unit whose catalog is already built.
pub(crate) fn assemble(
    src: &str,
    catalog: &Catalog,
    pipeline: &Pipeline,
    config: &OutputConfig,
) -> Result<String> {
    let main = locate_main(src)?;
    classes::validate(catalog)?;

    // Rewrite everything before emitting anything, so header requirements
    // found by late stages are known when the include block is written.
    let mut cx = RewriteContext::new(catalog);
    let methods: Vec<(String, Vec<String>)> = catalog
        .structs
        .values()
        .map(|def| {
            let bodies = def
                .methods
                .iter()
                .map(|m| pipeline.run(&classes::method_definition(m), &mut cx))
                .collect();
            (def.name.to_string(), bodies)
        })
        .collect();
    let functions: Vec<String> = catalog
        .functions
        .iter()
        .map(|f| pipeline.run(&f.definition, &mut cx))
        .collect();
    let main_definition = pipeline.run(&main.definition(), &mut cx);

    let mut out = Emitter::new(config);
    out.section(
        "// C++ style includes",
        headers::include_lines(&catalog.includes, cx.header_requirements()),
    );
    out.section(
        "// Constants (converted from #define)",
        constants::constant_decls(catalog),
    );
    out.section(
        "// Preprocessor directives",
        catalog.directives.iter().map(|d| d.text.clone()),
    );
    out.section("// Using standard namespace", ["using namespace std;"]);
    out.section(
        "// Common math constants",
        constants::math_constant_decls(catalog),
    );
    out.section("// Type declarations", catalog.type_decls.iter().cloned());

    for (def, (name, bodies)) in catalog.structs.values().zip(methods) {
        out.block(classes::class_declaration(
            def,
            &config.indent,
            config.section_comments,
        ));
        if !bodies.is_empty() {
            out.comment(&format!("// Method implementations for class {}", name));
            for body in bodies {
                out.block(vec![body]);
            }
        }
    }

    let prototypes = catalog.prototypes.iter().filter(|p| {
        !p.struct_associated && p.name != "main" && !cx.replaced_idioms.contains(&p.name)
    });
    out.section(
        "// Global declarations",
        catalog
            .globals
            .iter()
            .cloned()
            .chain(prototypes.map(|p| p.text.clone())),
    );

    for function in functions {
        out.section("// C++ style function", [function]);
    }
    out.section("// Main function", [main_definition]);

    debug!(
        classes = catalog.structs.len(),
        functions = catalog.functions.len(),
        replaced = cx.replaced_idioms.len(),
        main_at = main.span.start,
        "assembled program"
    );
    Ok(out.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_main_skips_prototypes_and_comments() {
        let src = "int main(void);\n/* int main() { */\nint main(int argc, char **argv) {\n  if (argc) { return 1; }\n  return 0;\n}\n";
        let main = locate_main(src).expect("main");
        assert_eq!(main.params, "int argc, char **argv");
        assert_eq!(main.body, "\n  if (argc) { return 1; }\n  return 0;\n");
        assert_eq!(
            main.definition(),
            "int main(int argc, char **argv) {\n  if (argc) { return 1; }\n  return 0;\n}"
        );
    }

    #[test]
    fn test_default_main_params() {
        let main = locate_main("int main() { return 0; }").expect("main");
        assert_eq!(main.definition(), "int main(int argc, char* argv[]) { return 0; }");
        let main = locate_main("int main( void ) {}").expect("main");
        assert_eq!(main.definition(), "int main(int argc, char* argv[]) {}");
    }

    #[test]
    fn test_extraction_failures() {
        assert_eq!(
            locate_main("void helper(void) {}\n// int main() {}\n"),
            Err(TranslateError::MissingMain)
        );
        assert_eq!(
            locate_main("int x;\nint main() {\n  if (x) {\n"),
            Err(TranslateError::UnbalancedMain {
                span: (7, 24).into()
            })
        );
    }
}
