use std::fmt;

/// One entry of a generated Python statement list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Line(String),
    Blank,
    /// Body of the preceding line, indented one level deeper.
    Block(Vec<Statement>),
}

impl Statement {
    pub fn line(line: impl fmt::Display) -> Self {
        Self::Line(line.to_string())
    }

    /// Comments and blank lines do not count as statements when deciding whether a Python block
    /// needs a `pass`.
    pub fn is_filler(&self) -> bool {
        match self {
            Statement::Line(line) => line.starts_with('#'),
            Statement::Blank => true,
            Statement::Block(_) => false,
        }
    }
}

/// Appends `pass` to a block that would otherwise have no statements.
pub fn ensure_not_empty(block: &mut Vec<Statement>) {
    if block.iter().all(Statement::is_filler) {
        block.push(Statement::line("pass"));
    }
}
