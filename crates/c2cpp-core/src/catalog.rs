//! The source catalog: every construct recognized in one translation unit.
//!
//! The catalog is built once per translation from a top-level segmentation of
//! the input (see [`crate::scan::segments`]) and is read by every later
//! component. It owns copies of the source text it needs, so it outlives
//! neither more nor less than the request that built it.

use crate::scan::{self, Segment, SegmentKind};
use c2cpp_common::Span;
use indexmap::IndexMap;
use regex::Regex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::sync::LazyLock;
use tracing::debug;

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^#\s*include\s*([<"])([^>"]+)[>"]"#).expect("include regex")
});

// Object-like macros only: a parameter list would follow the name directly.
static DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#\s*define\s+([A-Za-z_]\w*)[ \t]+(\S.*)$").expect("define regex")
});

static PRECISION_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\.[0-9]+[fg]").expect("precision regex"));

static STRUCT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(typedef\s+)?struct(?:\s+([A-Za-z_]\w*))?$").expect("struct header regex")
});

static SELF_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(const\s+)?(?:struct\s+)?([A-Za-z_]\w*)\s*\*\s*(?:const\s+)?([A-Za-z_]\w*)$")
        .expect("self parameter regex")
});

const TYPE_KEYWORDS: &[&str] = &["enum", "union", "typedef", "struct"];

const NOT_FUNCTION_NAMES: &[&str] = &[
    "if", "while", "for", "switch", "return", "sizeof", "do", "else", "case",
];

/// An `#include` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub name: SmolStr,
    /// `#include "x.h"` rather than `#include <x.h>`.
    pub quoted: bool,
    pub span: Span,
}

/// Shape of a macro value, judged from its text alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineKind {
    String,
    Floating,
    Integer,
    Opaque,
}

/// An object-like `#define NAME VALUE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: SmolStr,
    pub value: String,
    pub span: Span,
}

impl Define {
    pub fn kind(&self) -> DefineKind {
        let v = self.value.as_str();
        if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
            DefineKind::String
        } else if v.contains('.') {
            DefineKind::Floating
        } else if !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) {
            DefineKind::Integer
        } else {
            DefineKind::Opaque
        }
    }
}

/// A verbatim preprocessor line that is neither an include nor a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub text: String,
    pub span: Span,
}

/// A struct definition, the future class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    /// Class name: the struct tag, or the typedef alias of an anonymous struct.
    pub name: SmolStr,
    /// Typedef alias when it differs from `name`.
    pub alias: Option<SmolStr>,
    /// Field declarations without their trailing `;`.
    pub fields: Vec<String>,
    pub methods: Vec<MethodDef>,
    pub span: Span,
}

impl StructDef {
    fn answers_to(&self, ty: &str) -> bool {
        self.name == ty || self.alias.as_deref() == Some(ty)
    }
}

/// A function whose first parameter is a pointer to a cataloged struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub owner: SmolStr,
    pub name: SmolStr,
    pub return_type: String,
    pub self_param: SmolStr,
    /// The self parameter pointed to `const`.
    pub self_const: bool,
    /// Parameters after the self parameter, comma-joined.
    pub params: String,
    pub body: String,
    pub span: Span,
}

/// Any other function definition except `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeFunction {
    pub name: SmolStr,
    pub return_type: String,
    pub params: String,
    pub body: String,
    /// The whole definition as written.
    pub definition: String,
    pub span: Span,
}

/// A top-level function declaration without a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    pub name: SmolStr,
    /// First parameter names a cataloged struct pointer.
    pub struct_associated: bool,
    pub text: String,
    pub span: Span,
}

/// Everything recognized in one translation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Includes in first-appearance order, without repeats.
    pub includes: Vec<Include>,
    /// Constants in first-appearance order.
    pub defines: IndexMap<SmolStr, Define>,
    pub directives: Vec<Directive>,
    pub structs: IndexMap<SmolStr, StructDef>,
    pub functions: Vec<FreeFunction>,
    pub prototypes: Vec<Prototype>,
    /// Enums, unions, non-struct typedefs and unrecognized top-level blocks.
    pub type_decls: Vec<String>,
    /// Depth-0 variable declarations.
    pub globals: Vec<String>,
    /// Some `%.<n>f` or `%.<n>g` appears in the source.
    pub needs_iomanip: bool,
}

struct FunctionHeader<'a> {
    return_type: &'a str,
    name: &'a str,
    params: Vec<&'a str>,
}

/// Split `ret name(params)` written on one logical line.
fn parse_function_header(header: &str) -> Option<FunctionHeader<'_>> {
    let header = header.trim();
    let masked = scan::mask_code(header);
    if !masked.ends_with(')') {
        return None;
    }

    // walk back to the `(` that opens the parameter list
    let close = masked.len() - 1;
    let mut depth = 0i32;
    let mut open = None;
    for (i, b) in masked.bytes().enumerate().rev() {
        match b {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    open = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let open = open?;

    let before = header[..open].trim_end();
    let name_start = before
        .bytes()
        .rposition(|b| !scan::is_ident_byte(b))
        .map_or(0, |p| p + 1);
    let name = &before[name_start..];
    let return_type = before[..name_start].trim();

    if !scan::is_identifier(name)
        || NOT_FUNCTION_NAMES.contains(&name)
        || return_type.is_empty()
        || return_type.contains(['(', ')', '=', ',', ';'])
        || NOT_FUNCTION_NAMES.contains(&return_type)
    {
        return None;
    }

    let params_masked = &masked[open + 1..close];
    let params_text = &header[open + 1..close];
    let mut params = scan::split_args(params_masked, params_text);
    if params.len() == 1 && (params[0].is_empty() || params[0] == "void") {
        params.clear();
    }

    Some(FunctionHeader {
        return_type,
        name,
        params,
    })
}

impl Catalog {
    /// Scan `src` and catalog every recognized construct.
    pub fn build(src: &str) -> Self {
        let segments = scan::segments(src);
        let stripped = scan::strip_comments(src);
        let mut catalog = Catalog {
            needs_iomanip: PRECISION_SPEC.is_match(src),
            ..Catalog::default()
        };

        // Structs first, so a function may be associated with a struct that
        // is defined after it.
        let mut consumed = vec![false; segments.len()];
        for (i, seg) in segments.iter().enumerate() {
            if let SegmentKind::Block { .. } = seg.kind {
                if let Some(trailer) = catalog.collect_struct(&stripped, seg, segments.get(i + 1)) {
                    consumed[i] = true;
                    if trailer {
                        consumed[i + 1] = true;
                    }
                }
            }
        }

        let mut i = 0;
        while i < segments.len() {
            let seg = &segments[i];
            if consumed[i] {
                i += 1;
                continue;
            }
            match seg.kind {
                SegmentKind::Directive => catalog.collect_directive(src, &stripped, seg),
                SegmentKind::Block { .. } => {
                    let next = segments.get(i + 1).filter(|_| !consumed.get(i + 1).copied().unwrap_or(true));
                    if catalog.collect_block(src, &stripped, seg, next) {
                        i += 1;
                    }
                }
                SegmentKind::Statement => catalog.collect_statement(src, &stripped, seg),
                SegmentKind::Unterminated { .. } => {}
            }
            i += 1;
        }

        debug!(
            includes = catalog.includes.len(),
            defines = catalog.defines.len(),
            structs = catalog.structs.len(),
            methods = catalog.method_count(),
            functions = catalog.functions.len(),
            globals = catalog.globals.len(),
            "built source catalog"
        );
        catalog
    }

    fn collect_directive(&mut self, src: &str, stripped: &str, seg: &Segment) {
        let text = seg.text(stripped).trim();

        if let Some(caps) = INCLUDE.captures(text) {
            let include = Include {
                name: SmolStr::new(caps[2].trim()),
                quoted: &caps[1] == "\"",
                span: seg.span,
            };
            if !self
                .includes
                .iter()
                .any(|i| i.name == include.name && i.quoted == include.quoted)
            {
                self.includes.push(include);
            }
            return;
        }

        if !text.contains('\n') {
            if let Some(caps) = DEFINE.captures(text) {
                let name = SmolStr::new(&caps[1]);
                let value = caps[2].trim().to_string();
                match self.defines.get_mut(&name) {
                    Some(existing) => existing.value = value,
                    None => {
                        self.defines.insert(
                            name.clone(),
                            Define {
                                name,
                                value,
                                span: seg.span,
                            },
                        );
                    }
                }
                return;
            }
        }

        self.directives.push(Directive {
            text: seg.text(src).to_string(),
            span: seg.span,
        });
    }

    /// Catalog a struct definition. Returns `Some(true)` when the following
    /// statement (typedef alias or declarators) was consumed too.
    fn collect_struct(
        &mut self,
        stripped: &str,
        seg: &Segment,
        next: Option<&Segment>,
    ) -> Option<bool> {
        let header = scan::normalize_ws(seg.header(stripped));
        let caps = STRUCT_HEADER.captures(&header)?;
        let is_typedef = caps.get(1).is_some();
        let tag = caps.get(2).map(|m| SmolStr::new(m.as_str()));

        let trailer = next
            .filter(|n| n.kind == SegmentKind::Statement)
            .map(|n| n.text(stripped).trim().trim_end_matches(';').trim().to_string());
        let consumed_trailer = trailer.is_some();

        let (name, alias, declarators) = match (is_typedef, tag, trailer) {
            (true, tag, Some(t)) => {
                let alias = t
                    .split(',')
                    .map(str::trim)
                    .find(|d| scan::is_identifier(d))
                    .map(SmolStr::new);
                match (tag, alias) {
                    (Some(tag), alias) => {
                        let alias = alias.filter(|a| *a != tag);
                        (tag, alias, None)
                    }
                    (None, Some(alias)) => (alias, None, None),
                    (None, None) => return None,
                }
            }
            (false, Some(tag), t) => (tag, None, t.filter(|d| !d.is_empty())),
            _ => return None,
        };

        if let Some(declarators) = declarators {
            self.globals.push(format!("{} {};", name, declarators));
        }

        if self.structs.contains_key(&name) {
            debug!(name = %name, "dropped repeated struct definition");
            return Some(consumed_trailer);
        }

        let body_stripped = seg.body(stripped).unwrap_or("");
        let body_masked = scan::mask_code(body_stripped);
        let fields = scan::split_top_level(&body_masked, b';')
            .into_iter()
            .map(|r| scan::normalize_ws(&body_stripped[r]))
            .filter(|f| !f.is_empty())
            .collect();

        debug!(name = %name, alias = ?alias, "cataloged struct");
        self.structs.insert(
            name.clone(),
            StructDef {
                name,
                alias,
                fields,
                methods: Vec::new(),
                span: seg.span,
            },
        );
        Some(consumed_trailer)
    }

    /// Catalog a function definition or keep an unrecognized block verbatim.
    /// Returns `true` when `next` (the block's `;` or declarators) was
    /// consumed as part of the block.
    fn collect_block(&mut self, src: &str, stripped: &str, seg: &Segment, next: Option<&Segment>) -> bool {
        let header = scan::normalize_ws(seg.header(stripped));
        let Some(func) = parse_function_header(&header) else {
            let trailer = next.filter(|n| {
                n.kind == SegmentKind::Statement
                    && (TYPE_KEYWORDS.iter().any(|k| header.starts_with(k))
                        || n.text(stripped).trim() == ";")
            });
            let end = trailer.map_or(seg.span.end, |n| n.span.end) as usize;
            self.type_decls.push(src[seg.span.start as usize..end].to_string());
            return trailer.is_some();
        };
        if func.name == "main" {
            return false;
        }
        let body = seg.body(src).unwrap_or("").to_string();

        if let Some((owner, self_param, self_const)) = self.self_parameter(&func.params) {
            let method = MethodDef {
                owner: owner.clone(),
                name: SmolStr::new(func.name),
                return_type: func.return_type.to_string(),
                self_param,
                self_const,
                params: func.params[1..].join(", "),
                body,
                span: seg.span,
            };
            if let Some(def) = self.structs.get_mut(&owner) {
                def.methods.push(method);
            }
            return false;
        }

        self.functions.push(FreeFunction {
            name: SmolStr::new(func.name),
            return_type: func.return_type.to_string(),
            params: func.params.join(", "),
            body,
            definition: seg.text(src).to_string(),
            span: seg.span,
        });
        false
    }

    fn collect_statement(&mut self, src: &str, stripped: &str, seg: &Segment) {
        let code = scan::normalize_ws(seg.text(stripped));
        if code == ";" || code.is_empty() {
            return;
        }
        let text = seg.text(src).to_string();

        if code.starts_with("typedef ") || code.starts_with("enum ") || code.starts_with("union ") {
            self.type_decls.push(text);
            return;
        }
        if code.starts_with("struct ") && !code.contains('=') && code.split_whitespace().count() == 2 {
            // forward declaration `struct S;`
            self.type_decls.push(text);
            return;
        }

        if !code.contains('=') {
            let decl = code.trim_end_matches(';').trim_end();
            if let Some(func) = parse_function_header(decl) {
                let struct_associated = self.self_parameter(&func.params).is_some();
                self.prototypes.push(Prototype {
                    name: SmolStr::new(func.name),
                    struct_associated,
                    text,
                    span: seg.span,
                });
                return;
            }
        }

        self.globals.push(text);
    }

    /// Owner, receiver name and constness when the first parameter is a
    /// pointer to a cataloged struct.
    fn self_parameter(&self, params: &[&str]) -> Option<(SmolStr, SmolStr, bool)> {
        let first = scan::normalize_ws(params.first()?);
        let caps = SELF_PARAM.captures(&first)?;
        let owner = self.resolve_struct(&caps[2])?;
        Some((
            owner.name.clone(),
            SmolStr::new(&caps[3]),
            caps.get(1).is_some(),
        ))
    }

    /// Find a struct by class name or typedef alias.
    pub fn resolve_struct(&self, ty: &str) -> Option<&StructDef> {
        self.structs.values().find(|s| s.answers_to(ty))
    }

    pub fn has_include(&self, name: &str) -> bool {
        self.includes.iter().any(|i| i.name == name)
    }

    /// `<math.h>` (or `<cmath>`) was included.
    pub fn includes_math(&self) -> bool {
        self.has_include("math.h") || self.has_include("cmath")
    }

    pub fn method_count(&self) -> usize {
        self.structs.values().map(|s| s.methods.len()).sum()
    }

    /// Method name to owning class name.
    pub fn method_owners(&self) -> FxHashMap<&str, &str> {
        self.structs
            .values()
            .flat_map(|s| s.methods.iter().map(move |m| (m.name.as_str(), s.name.as_str())))
            .collect()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.structs.values().flat_map(|s| s.methods.iter())
    }
}
