//! C header to C++ header mapping.

use crate::catalog::Include;
use rustc_hash::FxHashSet;

/// C headers with a direct C++ counterpart.
const HEADER_TABLE: &[(&str, &str)] = &[
    ("stdio.h", "iostream"),
    ("stdlib.h", "cstdlib"),
    ("string.h", "string"),
    ("math.h", "cmath"),
    ("time.h", "ctime"),
    ("assert.h", "cassert"),
    ("ctype.h", "cctype"),
    ("float.h", "cfloat"),
    ("limits.h", "climits"),
    ("locale.h", "clocale"),
    ("signal.h", "csignal"),
    ("stdarg.h", "cstdarg"),
    ("stdbool.h", "cstdbool"),
    ("stddef.h", "cstddef"),
    ("stdint.h", "cstdint"),
];

/// Whether the table knows a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderClass {
    Known(&'static str),
    Unknown,
}

pub fn classify(name: &str) -> HeaderClass {
    HEADER_TABLE
        .iter()
        .find(|(c, _)| *c == name)
        .map_or(HeaderClass::Unknown, |(_, cpp)| HeaderClass::Known(cpp))
}

/// The C++ name for `name`, or `name` itself.
pub fn map_header(name: &str) -> &str {
    match classify(name) {
        HeaderClass::Known(cpp) => cpp,
        HeaderClass::Unknown => name,
    }
}

/// Headers needed by constructs the rewrite introduced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderRequirements {
    /// `fixed`/`setprecision` are used.
    pub iomanip: bool,
    /// `std::function` is used.
    pub functional: bool,
}

/// `#include` lines for the translated program, each at most once.
pub fn include_lines(includes: &[Include], required: HeaderRequirements) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut lines = Vec::new();
    let mut emit = |name: &str, quoted: bool| {
        if seen.insert((name.to_string(), quoted)) {
            lines.push(if quoted {
                format!("#include \"{}\"", name)
            } else {
                format!("#include <{}>", name)
            });
        }
    };

    if required.iomanip {
        emit("iomanip", false);
    }
    if required.functional {
        emit("functional", false);
    }
    emit("algorithm", false);

    for include in includes {
        if include.quoted {
            emit(include.name.as_str(), true);
        } else {
            emit(map_header(include.name.as_str()), false);
        }
    }

    lines
}
