use miette::SourceSpan;
use std::ops::Range;

/// A byte range in a single translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Slice `text` with this span. Returns an empty string when the span
    /// does not fit the text.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.range()).unwrap_or("")
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new((span.start as usize).into(), span.len() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_slice() {
        let span = Span::new(2, 9);
        assert_eq!(span.len(), 7);
        assert!(!span.is_empty());
        assert!(Span::default().is_empty());
        assert_eq!(Span::new(0, 3).slice("int x;"), "int");
        assert_eq!(Span::new(4, 40).slice("int x;"), "");
    }

    #[test]
    fn test_into_source_span() {
        let span: SourceSpan = Span::new(3, 8).into();
        assert_eq!(span.offset(), 3);
        assert_eq!(span.len(), 5);
    }
}
