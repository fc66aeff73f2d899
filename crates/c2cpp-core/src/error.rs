//! Errors that abort a translation.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Result type for translation operations.
pub type Result<T> = std::result::Result<T, TranslateError>;

/// A fatal translation failure. No partial output accompanies it.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum TranslateError {
    /// No `int main(...) { ... }` definition in the input.
    #[error("no `main` function found")]
    #[diagnostic(
        code(c2cpp::extract::missing_main),
        help("the translator emits a whole program and needs an `int main(...)` definition")
    )]
    MissingMain,

    /// `main` was found but its body never closes.
    #[error("the body of `main` has unbalanced braces")]
    #[diagnostic(code(c2cpp::extract::unbalanced_main))]
    UnbalancedMain {
        #[label("this block is never closed")]
        span: SourceSpan,
    },

    /// A method was attached to a struct the catalog does not contain.
    #[error("method `{method}` refers to struct `{owner}`, which is not in the catalog")]
    #[diagnostic(code(c2cpp::invariant::unknown_struct))]
    UnknownStruct { owner: String, method: String },
}

impl TranslateError {
    /// `main` could not be located or delimited.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            TranslateError::MissingMain | TranslateError::UnbalancedMain { .. }
        )
    }
}
