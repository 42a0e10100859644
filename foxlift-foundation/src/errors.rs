use std::io;

pub use codespan_reporting::diagnostic::LabelStyle;
pub use codespan_reporting::diagnostic::Severity;
use codespan_reporting::term::{
    self,
    termcolor::{ColorChoice, NoColor, StandardStream, WriteColor},
};

use crate::source::{SourceFileId, SourceFileSet, Span, Spanned};

#[derive(Debug, Clone)]
pub struct Label {
    pub style: LabelStyle,
    pub span: Span,
    pub message: String,
    pub file: Option<SourceFileId>,
}

impl Label {
    pub fn new<O, M>(style: LabelStyle, span: &impl Spanned, message: O) -> Self
    where
        O: Into<Option<M>>,
        M: Into<String>,
    {
        Self {
            style,
            span: span.span(),
            message: message.into().map(|x| x.into()).unwrap_or_default(),
            file: None,
        }
    }

    pub fn primary<O, M>(span: &impl Spanned, message: O) -> Self
    where
        O: Into<Option<M>>,
        M: Into<String>,
    {
        Self::new(LabelStyle::Primary, span, message)
    }

    pub fn secondary<O, M>(span: &impl Spanned, message: O) -> Self
    where
        O: Into<Option<M>>,
        M: Into<String>,
    {
        Self::new(LabelStyle::Secondary, span, message)
    }

    pub fn in_file(mut self, file: SourceFileId) -> Self {
        self.file = Some(file);
        self
    }
}

/// A fatal or informational message about a source file.
///
/// Every translation stage fails with one of these. The translator never recovers from an error,
/// so a `Diagnostic` travelling up through `?` always ends the run.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub source_file: SourceFileId,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, source_file: SourceFileId, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            source_file,
            labels: vec![],
            notes: vec![],
        }
    }

    pub fn bug(file: SourceFileId, error: impl ToString) -> Self {
        Self::new(Severity::Bug, file, error.to_string())
    }

    pub fn error(file: SourceFileId, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, file, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn emit(
        &self,
        writer: &mut dyn WriteColor,
        files: &SourceFileSet,
    ) -> Result<(), codespan_reporting::files::Error> {
        term::emit(writer, &term::Config::default(), files, &self.clone().into())
    }

    pub fn emit_to_stderr(&self, files: &SourceFileSet) -> Result<(), codespan_reporting::files::Error> {
        self.emit(&mut StandardStream::stderr(ColorChoice::Auto), files)
    }

    /// Renders the diagnostic without colors. Used by tests and log output.
    pub fn render(&self, files: &SourceFileSet) -> String {
        let mut buffer = NoColor::new(Vec::new());
        match self.emit(&mut buffer, files) {
            Ok(()) => String::from_utf8_lossy(&buffer.into_inner()).into_owned(),
            Err(error) => format!("{}: {error}", self.message),
        }
    }

    /// Wraps an I/O failure that happened while reading a file on behalf of `source_file`.
    pub fn io(source_file: SourceFileId, span: Span, path: &str, error: io::Error) -> Self {
        Self::error(source_file, format!("cannot read `{path}`: {error}"))
            .with_label(Label::primary(&span, "requested here"))
    }
}

impl From<Diagnostic> for codespan_reporting::diagnostic::Diagnostic<SourceFileId> {
    fn from(diag: Diagnostic) -> Self {
        Self {
            severity: diag.severity,
            code: diag.code,
            message: diag.message,
            labels: diag
                .labels
                .into_iter()
                .map(|label| codespan_reporting::diagnostic::Label {
                    style: label.style,
                    file_id: label.file.unwrap_or(diag.source_file),
                    range: label.span.to_range(),
                    message: label.message,
                })
                .collect(),
            notes: diag.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::source::SourceFile;

    use super::*;

    #[test]
    fn rendered_diagnostic_points_at_label() {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new(
            "main.prg".into(),
            indoc! {"
                x = 1
                #undef NOPE
            "}
            .into(),
        ));
        let diagnostic = Diagnostic::error(file, "`NOPE` was never defined")
            .with_label(Label::primary(&Span::new(13, 17), "undefined here"));
        let rendered = diagnostic.render(&files);
        assert!(rendered.contains("error: `NOPE` was never defined"));
        assert!(rendered.contains("main.prg:2:8"));
        assert_eq!(diagnostic.to_string(), "`NOPE` was never defined");
    }
}
