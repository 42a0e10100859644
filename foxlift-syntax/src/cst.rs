mod expr;
mod program;
mod stmt;

use foxlift_foundation::source::{Span, Spanned};
use foxlift_lexer::token::Token;

pub use expr::*;
pub use program::*;
pub use stmt::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    /// Name as written in the source.
    pub text: String,
    pub span: Span,
}

impl Ident {
    pub fn from_token(token: &Token) -> Self {
        Self {
            text: token.text.clone(),
            span: token.span,
        }
    }

    /// FoxPro names are case-insensitive; the translated program uses them lowercased.
    pub fn lowercase(&self) -> String {
        self.text.to_lowercase()
    }

    pub fn is(&self, keyword: &str) -> bool {
        self.text.eq_ignore_ascii_case(keyword)
    }
}

impl Spanned for Ident {
    fn span(&self) -> Span {
        self.span
    }
}

/// A `*` or `NOTE` comment occupying a whole line.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Raw text, including the comment marker and the line break.
    pub text: String,
    pub span: Span,
}

impl Spanned for Comment {
    fn span(&self) -> Span {
        self.span
    }
}
