//! Translator configuration types (c2cpp.toml format).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// File name looked up next to the input when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "c2cpp.toml";

/// Root translator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Layout of the generated C++ text.
    #[serde(default)]
    pub output: OutputConfig,

    /// Body-rewrite pipeline.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Output layout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Indentation used for class members.
    #[serde(default = "default_indent")]
    pub indent: String,

    /// Emit the explanatory section comments (`// C++ style includes`, ...).
    #[serde(default = "default_true")]
    pub section_comments: bool,
}

/// Body-rewrite pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stages in execution order.
    #[serde(default = "StageKind::default_order")]
    pub stages: Vec<StageKind>,
}

/// A body-rewrite stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// `malloc`/`calloc`/`free` to `new`/`delete`.
    Allocation,
    /// `printf` to `cout` chains.
    FormattedOutput,
    /// `scanf` to `cin` extractions.
    FormattedInput,
    /// Bare `<math.h>` calls to `std::` calls.
    MathNamespace,
    /// Hand-written pointer swap to `std::swap`.
    SwapIdiom,
    /// C function pointers to `std::function`.
    FunctionPointer,
    /// Struct-function calls to member calls.
    MethodCall,
}

fn default_indent() -> String {
    "    ".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            section_comments: true,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: StageKind::default_order(),
        }
    }
}

impl StageKind {
    pub const ALL: [StageKind; 7] = [
        StageKind::Allocation,
        StageKind::FormattedOutput,
        StageKind::FormattedInput,
        StageKind::MathNamespace,
        StageKind::SwapIdiom,
        StageKind::FunctionPointer,
        StageKind::MethodCall,
    ];

    /// The standard stage order.
    pub fn default_order() -> Vec<StageKind> {
        Self::ALL.to_vec()
    }

    /// Name as written in `c2cpp.toml`.
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Allocation => "allocation",
            StageKind::FormattedOutput => "formatted_output",
            StageKind::FormattedInput => "formatted_input",
            StageKind::MathNamespace => "math_namespace",
            StageKind::SwapIdiom => "swap_idiom",
            StageKind::FunctionPointer => "function_pointer",
            StageKind::MethodCall => "method_call",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TranslatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| crate::ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TranslatorConfig =
            toml::from_str(&content).map_err(|source| crate::ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `c2cpp.toml` from `dir` if present, otherwise the defaults.
    pub fn discover(dir: &Path) -> crate::Result<Self> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject configurations the translator cannot honor.
    pub fn validate(&self) -> crate::Result<()> {
        if self.output.indent.is_empty() || !self.output.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(crate::ConfigError::Validation(format!(
                "output.indent must be non-empty whitespace, got {:?}",
                self.output.indent
            )));
        }

        let mut seen = Vec::with_capacity(self.pipeline.stages.len());
        for stage in &self.pipeline.stages {
            if seen.contains(stage) {
                return Err(crate::ConfigError::Validation(format!(
                    "pipeline stage `{}` listed more than once",
                    stage
                )));
            }
            seen.push(*stage);
        }

        Ok(())
    }

    /// Builder-style stage override.
    pub fn with_stages(mut self, stages: &[StageKind]) -> Self {
        self.pipeline.stages = stages.to_vec();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: TranslatorConfig = toml::from_str("").unwrap();
        assert_eq!(config, TranslatorConfig::default());
        assert_eq!(config.output.indent, "    ");
        assert_eq!(config.pipeline.stages.len(), 7);
        assert_eq!(config.pipeline.stages[0], StageKind::Allocation);
        assert_eq!(config.pipeline.stages[6], StageKind::MethodCall);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[output]
indent = "  "
section_comments = false

[pipeline]
stages = ["math_namespace", "swap_idiom", "function_pointer"]
        "#;

        let config: TranslatorConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.output.indent, "  ");
        assert!(!config.output.section_comments);
        assert_eq!(
            config.pipeline.stages,
            vec![
                StageKind::MathNamespace,
                StageKind::SwapIdiom,
                StageKind::FunctionPointer
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_stage_is_parse_error() {
        let toml = r#"
[pipeline]
stages = ["allocation", "goto_elimination"]
        "#;
        assert!(toml::from_str::<TranslatorConfig>(toml).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_indent() {
        let config = TranslatorConfig::default()
            .with_stages(&[StageKind::Allocation, StageKind::Allocation]);
        assert!(matches!(
            config.validate(),
            Err(crate::ConfigError::Validation(msg)) if msg.contains("allocation")
        ));

        let mut config = TranslatorConfig::default();
        config.output.indent = "xx".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            TranslatorConfig::discover(dir.path()).unwrap(),
            TranslatorConfig::default()
        );

        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[pipeline]\nstages = [\"allocation\"]").unwrap();

        let config = TranslatorConfig::discover(dir.path()).unwrap();
        assert_eq!(config.pipeline.stages, vec![StageKind::Allocation]);
        assert_eq!(TranslatorConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_bad_toml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[output\nindent = 1").unwrap();

        let err = TranslatorConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, crate::ConfigError::Parse { .. }));
        assert!(err.to_string().contains("c2cpp.toml"));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = TranslatorConfig::from_file(Path::new("/nonexistent/c2cpp.toml")).unwrap_err();
        assert!(matches!(err, crate::ConfigError::Read { .. }));
        assert!(err.to_string().starts_with("cannot read /nonexistent/c2cpp.toml"));
    }
}
