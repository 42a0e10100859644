use std::{fmt, ops::Range, rc::Rc};

use codespan_reporting::files::{Files, Location};

/// Byte range within a single source file.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn to_range(self) -> Range<usize> {
        Range::from(self)
    }

    pub fn join(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn get_input<'a>(&self, input: &'a str) -> &'a str {
        &input[self.to_range()]
    }
}

impl From<Span> for Range<usize> {
    fn from(value: Span) -> Self {
        value.start..value.end
    }
}

impl From<Range<usize>> for Span {
    fn from(value: Range<usize>) -> Self {
        Self {
            start: value.start,
            end: value.end,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Range::from(*self), f)
    }
}

/// Implemented by all syntax nodes and tokens that know where they came from.
pub trait Spanned {
    fn span(&self) -> Span;
}

impl Spanned for Span {
    fn span(&self) -> Span {
        *self
    }
}

impl<S> Spanned for Box<S>
where
    S: Spanned,
{
    fn span(&self) -> Span {
        (**self).span()
    }
}

impl<S> Spanned for Vec<S>
where
    S: Spanned,
{
    fn span(&self) -> Span {
        self.first()
            .zip(self.last())
            .map(|(first, last)| first.span().join(&last.span()))
            .unwrap_or_default()
    }
}

/// Decodes legacy single-byte text. Every ISO-8859-1 byte maps onto the Unicode code point
/// with the same value, so decoding cannot fail.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub filename: String,
    pub source: Rc<str>,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(filename: String, source: Rc<str>) -> Self {
        Self {
            filename,
            line_starts: codespan_reporting::files::line_starts(&source).collect(),
            source,
        }
    }

    fn line_start(&self, line_index: usize) -> Result<usize, codespan_reporting::files::Error> {
        use std::cmp::Ordering;

        match line_index.cmp(&self.line_starts.len()) {
            Ordering::Less => Ok(self.line_starts[line_index]),
            Ordering::Equal => Ok(self.source.len()),
            Ordering::Greater => Err(codespan_reporting::files::Error::LineTooLarge {
                given: line_index,
                max: self.line_starts.len() - 1,
            }),
        }
    }
}

/// All files taking part in one translation: the main program, its includes, and the
/// preprocessed text the main parser runs over.
#[derive(Debug, Clone, Default)]
pub struct SourceFileSet {
    source_files: Vec<SourceFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceFileId(usize);

impl SourceFileSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add(&mut self, file: SourceFile) -> SourceFileId {
        let id = SourceFileId(self.source_files.len());
        self.source_files.push(file);
        id
    }

    pub fn get(&self, id: SourceFileId) -> &SourceFile {
        &self.source_files[id.0]
    }

    pub fn source(&self, id: SourceFileId) -> &str {
        &self.source_files[id.0].source
    }

    pub fn len(&self) -> usize {
        self.source_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_files.is_empty()
    }

    /// One-based line and column of a byte offset, for dumps and log messages.
    pub fn line_column(&self, id: SourceFileId, byte_index: usize) -> Option<(usize, usize)> {
        self.location(id, byte_index)
            .ok()
            .map(|Location { line_number, column_number }| (line_number, column_number))
    }
}

impl<'f> Files<'f> for SourceFileSet {
    type FileId = SourceFileId;
    type Name = &'f str;
    type Source = &'f str;

    fn name(&'f self, id: Self::FileId) -> Result<Self::Name, codespan_reporting::files::Error> {
        Ok(&self.source_files[id.0].filename)
    }

    fn source(
        &'f self,
        id: Self::FileId,
    ) -> Result<Self::Source, codespan_reporting::files::Error> {
        Ok(&self.source_files[id.0].source)
    }

    fn line_index(
        &'f self,
        id: Self::FileId,
        byte_index: usize,
    ) -> Result<usize, codespan_reporting::files::Error> {
        Ok(self.source_files[id.0]
            .line_starts
            .binary_search(&byte_index)
            .unwrap_or_else(|next_line| next_line - 1))
    }

    fn line_range(
        &'f self,
        id: Self::FileId,
        line_index: usize,
    ) -> Result<Range<usize>, codespan_reporting::files::Error> {
        let file = &self.source_files[id.0];
        let line_start = file.line_start(line_index)?;
        let next_line_start = file.line_start(line_index + 1)?;
        Ok(line_start..next_line_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_bytes_map_to_same_code_points() {
        assert_eq!(decode_latin1(b"caf\xe9"), "café");
        assert_eq!(decode_latin1(&[0xA3, b'1']), "£1");
    }

    #[test]
    fn line_and_column_are_one_based() {
        let mut files = SourceFileSet::new();
        let id = files.add(SourceFile::new("test.prg".into(), "x = 1\ny = 2\n".into()));
        assert_eq!(files.line_column(id, 0), Some((1, 1)));
        assert_eq!(files.line_column(id, 8), Some((2, 3)));
    }

    #[test]
    fn joined_spans_cover_both() {
        let span = Span::new(4, 6).join(&Span::new(1, 2));
        assert_eq!(span, Span::new(1, 6));
    }
}
