use std::fmt;

use foxlift_foundation::source::{SourceFileId, Span, Spanned};

use crate::token_stream::Channel;

/// Index of a token within the token list it was lexed into.
pub type TokenId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token. The preprocessor rewrites this for comments; kind and span
    /// always stay those the lexer produced.
    pub text: String,
    pub channel: Channel,
    pub span: Span,
    pub file: SourceFileId,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span, file: SourceFileId) -> Self {
        Self {
            kind,
            text: text.into(),
            channel: kind.channel(),
            span,
            file,
        }
    }

    /// An end of file marker placed at `offset`.
    pub fn end_of_file(file: SourceFileId, offset: usize) -> Self {
        Self::new(TokenKind::EndOfFile, "", Span::new(offset, offset), file)
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Ident && self.text.eq_ignore_ascii_case(keyword)
    }
}

impl Spanned for Token {
    fn span(&self) -> Span {
        self.span
    }
}

macro_rules! define_tokens {
    ($($name:tt = $pretty_name:tt),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum TokenKind {
            $($name),*
        }

        impl TokenKind {
            pub fn name(&self) -> &'static str {
                match self {
                    $(TokenKind::$name => $pretty_name),*
                }
            }
        }
    };
}

define_tokens! {
    Space         = "whitespace",
    Continuation  = "line continuation `;`",
    NewLine       = "end of line",
    LineComment   = "comment",
    InlineComment = "`&&` comment",

    Ident  = "identifier",
    Number = "number literal",
    String = "string literal",
    Bool   = "logical literal",
    Null   = "`.NULL.`",
    Date   = "date literal",

    And = "`.AND.`",
    Or  = "`.OR.`",
    Not = "`.NOT.`",

    Add          = "`+`",
    Sub          = "`-`",
    Mul          = "`*`",
    Div          = "`/`",
    Rem          = "`%`",
    Pow          = "`^`",
    Assign       = "`=`",
    Equal        = "`==`",
    NotEqual     = "`<>`",
    Less         = "`<`",
    Greater      = "`>`",
    LessEqual    = "`<=`",
    GreaterEqual = "`>=`",
    Dollar       = "`$`",

    Question     = "`?`",
    LeftParen    = "`(`",
    RightParen   = "`)`",
    LeftBracket  = "`[`",
    RightBracket = "`]`",
    Comma        = "`,`",
    Dot          = "`.`",
    Colon        = "`:`",
    Backslash    = "`\\`",
    At           = "`@`",
    Ampersand    = "`&`",
    Hash         = "`#`",

    EndOfFile = "end of file",
}

impl TokenKind {
    pub const fn channel(&self) -> Channel {
        match self {
            TokenKind::Space | TokenKind::Continuation => Channel::SPACE,
            TokenKind::LineComment | TokenKind::InlineComment => Channel::COMMENT,
            _ => Channel::CODE,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::InlineComment)
    }

    /// Whether a `[` following this token indexes into it rather than opening a string.
    pub fn can_be_indexed(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident | TokenKind::RightParen | TokenKind::RightBracket
        )
    }
}

/// Lightweight handle to a token yielded by a [`TokenStream`](crate::token_stream::TokenStream).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AnyToken {
    pub kind: TokenKind,
    pub id: TokenId,
}

impl fmt::Debug for AnyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.id)
    }
}
