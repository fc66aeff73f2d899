//! `#define` constants to typed C++ constants.

use crate::catalog::{Catalog, Define, DefineKind};

const MATH_CONSTANTS: &[(&str, &str)] = &[
    ("PI", "3.14159265358979323846"),
    ("E", "2.71828182845904523536"),
];

/// The typed declaration replacing one constant.
pub fn constant_decl(define: &Define) -> String {
    let ty = match define.kind() {
        DefineKind::String => "string",
        DefineKind::Floating => "double",
        DefineKind::Integer => "int",
        DefineKind::Opaque => "auto",
    };
    format!("const {} {} = {};", ty, define.name, define.value)
}

/// Declarations for every cataloged constant, in source order.
pub fn constant_decls(catalog: &Catalog) -> Vec<String> {
    catalog.defines.values().map(constant_decl).collect()
}

/// `PI` and `E` for programs using `<math.h>` that do not define them.
pub fn math_constant_decls(catalog: &Catalog) -> Vec<String> {
    if !catalog.includes_math() {
        return Vec::new();
    }
    MATH_CONSTANTS
        .iter()
        .filter(|(name, _)| !catalog.defines.contains_key(*name))
        .map(|(name, value)| format!("const double {} = {};", name, value))
        .collect()
}
