//! Source-to-source translation of C programs into idiomatic C++.
//!
//! This crate provides:
//! - A lexical scanner that works on comment- and literal-masked text
//! - The source catalog, built once per translation unit
//! - Header mapping, constant emission and struct-to-class promotion
//! - An ordered, configurable pipeline of function body rewrites
//! - Program assembly into a single C++ translation unit
//!
//! # Architecture
//!
//! ```text
//! C source → Catalog → classes / rewritten units → C++ source
//!                ↑              ↑
//!             scan          RewriteContext
//! ```
//!
//! Nothing here touches the file system; see `c2cpp-driver` for that.

pub mod catalog;
pub mod classes;
pub mod constants;
pub mod headers;
pub mod rewrite;
pub mod scan;

mod assemble;
mod edit;
mod error;

pub use catalog::Catalog;
pub use error::{Result, TranslateError};
pub use rewrite::{Pipeline, RewriteContext, RewriteStage};

use c2cpp_config::TranslatorConfig;

/// A configured translator. Holds no per-translation state, so one instance
/// can translate any number of inputs.
#[derive(Debug)]
pub struct Translator {
    config: TranslatorConfig,
    pipeline: Pipeline,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        let pipeline = Pipeline::new(&config.pipeline.stages);
        Self { config, pipeline }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate one C translation unit.
    ///
    /// Fails without partial output when `main` cannot be located or
    /// delimited, or when the catalog is inconsistent.
    pub fn translate(&self, source: &str) -> Result<String> {
        let catalog = Catalog::build(source);
        assemble::assemble(source, &catalog, &self.pipeline, &self.config.output)
    }

    /// The catalog the translator would work from.
    pub fn catalog(&self, source: &str) -> Catalog {
        Catalog::build(source)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(TranslatorConfig::default())
    }
}

/// Translate with the default configuration.
pub fn translate(source: &str) -> Result<String> {
    Translator::default().translate(source)
}
