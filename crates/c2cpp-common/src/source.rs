use crate::Span;
use std::fmt;
use std::path::{Path, PathBuf};

/// The language of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "c++" | "hpp" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
    }

    /// Canonical file extension for emitted files of this language.
    pub fn extension(self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }
}

/// A loaded translation unit.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    pub language: Language,
    /// Byte offset of the first character of every line.
    line_offsets: Vec<usize>,
}

/// A 1-based line and column, as printed in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl SourceFile {
    pub fn new(path: PathBuf, content: String, language: Language) -> Self {
        let mut line_offsets = vec![0];
        line_offsets.extend(
            content
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            path,
            content,
            language,
            line_offsets,
        }
    }

    /// Display name used in diagnostics.
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// Where `span` starts. Offsets past the end land on the last line.
    pub fn location(&self, span: Span) -> Location {
        let offset = (span.start as usize).min(self.content.len());
        let index = match self.line_offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        Location {
            line: index + 1,
            column: offset - self.line_offsets[index] + 1,
        }
    }

    /// Text of the 1-based `line` without its newline; empty when out of range.
    pub fn line_text(&self, line: usize) -> &str {
        let Some(&start) = line.checked_sub(1).and_then(|i| self.line_offsets.get(i)) else {
            return "";
        };
        let rest = &self.content[start..];
        rest.split_once('\n').map_or(rest, |(text, _)| text)
    }

    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("prog.c")), Some(Language::C));
        assert_eq!(Language::from_path(Path::new("out.cpp")), Some(Language::Cpp));
        assert_eq!(Language::from_path(Path::new("notes.txt")), None);
        assert_eq!(Language::Cpp.extension(), "cpp");
    }

    #[test]
    fn test_location_and_line_text() {
        let file = SourceFile::new(
            PathBuf::from("a.c"),
            "int x;\nint main() {\n}\n".to_string(),
            Language::C,
        );
        assert_eq!(file.location(Span::new(0, 1)), Location { line: 1, column: 1 });
        assert_eq!(file.location(Span::new(11, 15)).to_string(), "2:5");
        assert_eq!(file.location(Span::new(7, 7)).line, 2);
        assert_eq!(file.line_text(2), "int main() {");
        assert_eq!(file.line_text(0), "");
        assert_eq!(file.line_text(9), "");
        assert_eq!(file.line_count(), 4);
    }
}
