//! Configuration for the c2cpp translator.
//!
//! This crate provides:
//! - The translator configuration format (`c2cpp.toml`)
//! - The names of the body-rewrite stages, so the pipeline order can be
//!   chosen from configuration
//!
//! # Example
//!
//! ```toml
//! # c2cpp.toml
//! [output]
//! indent = "  "
//! section_comments = false
//!
//! [pipeline]
//! stages = ["allocation", "formatted_output", "formatted_input"]
//! ```

mod config;
mod error;

pub use config::{OutputConfig, PipelineConfig, StageKind, TranslatorConfig, CONFIG_FILE_NAME};
pub use error::{ConfigError, Result};
