//! File-level orchestration for the c2cpp translator.
//!
//! The core engine works on strings. The driver reads `.c` files, attaches
//! the source to any diagnostic, and writes the translated `.cpp` next to the
//! input or wherever the caller asks.

use c2cpp_common::{Language, SourceFile};
use c2cpp_config::TranslatorConfig;
use c2cpp_core::{Catalog, Translator};
use miette::{NamedSource, Report, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Translation driver that reads and writes files.
pub struct Driver {
    translator: Translator,
}

impl Driver {
    pub fn new() -> Self {
        Self::with_config(TranslatorConfig::default())
    }

    pub fn with_config(config: TranslatorConfig) -> Self {
        Self {
            translator: Translator::new(config),
        }
    }

    /// Use `c2cpp.toml` from `dir` when present, the defaults otherwise.
    pub fn for_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config = TranslatorConfig::discover(dir)
            .map_err(|e| miette::miette!("Invalid configuration in {}: {}", dir.display(), e))?;
        Ok(Self::with_config(config))
    }

    pub fn config(&self) -> &TranslatorConfig {
        self.translator.config()
    }

    /// Read a C source file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<SourceFile> {
        let path = path.as_ref();
        let language = Language::from_path(path).unwrap_or(Language::C);
        if language == Language::Cpp {
            return Err(miette::miette!(
                "{} is already a C++ source file",
                path.display()
            ));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?;
        debug!(path = %path.display(), lines = content.lines().count(), "loaded source");
        Ok(SourceFile::new(path.to_path_buf(), content, language))
    }

    /// Translate an already loaded source. Errors carry the source text so
    /// labelled spans render.
    pub fn translate_source(&self, source: &SourceFile) -> Result<String> {
        self.translator.translate(&source.content).map_err(|e| {
            Report::new(e).with_source_code(NamedSource::new(source.name(), source.content.clone()))
        })
    }

    /// Translate a C file and return the C++ text.
    pub fn translate_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let source = self.load(path)?;
        let output = self.translate_source(&source)?;
        info!(file = %source.name(), lines = output.lines().count(), "translated");
        Ok(output)
    }

    /// Translate `input` and write the result to `output`.
    pub fn translate_to_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<()> {
        let output = output.as_ref();
        let text = self.translate_file(input)?;
        std::fs::write(output, text)
            .map_err(|e| miette::miette!("Failed to write {}: {}", output.display(), e))?;
        info!(output = %output.display(), "wrote translation");
        Ok(())
    }

    /// Where the translation of `input` goes by default: same stem, `.cpp`.
    pub fn output_path_for(input: impl AsRef<Path>) -> PathBuf {
        input.as_ref().with_extension(Language::Cpp.extension())
    }

    /// The catalog of a C file, for inspection.
    pub fn catalog_for_file(&self, path: impl AsRef<Path>) -> Result<(SourceFile, Catalog)> {
        let source = self.load(path)?;
        let catalog = self.translator.catalog(&source.content);
        Ok((source, catalog))
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}
