//! Types shared by the c2cpp crates: source spans and loaded source files.

mod span;
mod source;

pub use span::Span;
pub use source::{Language, Location, SourceFile};
