use foxlift_foundation::{
    errors::{Diagnostic, Label},
    source::{SourceFileId, Span},
};
use foxlift_lexer::{
    token::{AnyToken, Token, TokenKind},
    token_stream::{Channel, MultichannelTokenStream, TokenStream},
};

use crate::cst::{Comment, Ident};

pub type ParseResult<T> = Result<T, Diagnostic>;

pub struct Parser<'a> {
    pub file: SourceFileId,
    pub tokens: &'a mut MultichannelTokenStream,
}

impl<'a> Parser<'a> {
    pub fn new(file: SourceFileId, tokens: &'a mut MultichannelTokenStream) -> Self {
        Self { file, tokens }
    }

    pub fn next_token(&mut self) -> AnyToken {
        self.tokens.next()
    }

    pub fn peek_token(&mut self) -> AnyToken {
        self.tokens.peek()
    }

    pub fn token(&self, token: AnyToken) -> &Token {
        self.tokens.token(token.id)
    }

    pub fn text(&self, token: AnyToken) -> &str {
        &self.token(token).text
    }

    pub fn span(&self, token: AnyToken) -> Span {
        self.token(token).span
    }

    /// Whether `right` starts exactly where `left` ends, with nothing in between.
    pub fn hugs(&self, left: AnyToken, right: AnyToken) -> bool {
        let (left, right) = (self.token(left), self.token(right));
        left.file == right.file && left.span.end == right.span.start
    }

    pub fn is_keyword(&self, token: AnyToken, keyword: &str) -> bool {
        self.token(token).is_keyword(keyword)
    }

    pub fn peek_keyword(&mut self, keyword: &str) -> bool {
        let token = self.peek_token();
        self.is_keyword(token, keyword)
    }

    pub fn peek_any_keyword(&mut self, keywords: &[&str]) -> bool {
        let token = self.peek_token();
        keywords.iter().any(|keyword| self.is_keyword(token, keyword))
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> Option<AnyToken> {
        self.peek_keyword(keyword).then(|| self.next_token())
    }

    pub fn eat_any_keyword(&mut self, keywords: &[&str]) -> Option<AnyToken> {
        self.peek_any_keyword(keywords).then(|| self.next_token())
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> ParseResult<AnyToken> {
        let token = self.next_token();
        if self.is_keyword(token, keyword) {
            Ok(token)
        } else {
            self.bail(
                token,
                format!("`{}` expected", keyword.to_ascii_uppercase()),
                format!(
                    "`{}` expected here, but found {}",
                    keyword.to_ascii_uppercase(),
                    self.describe(token)
                ),
            )
        }
    }

    pub fn eat(&mut self, kind: TokenKind) -> Option<AnyToken> {
        (self.peek_token().kind == kind).then(|| self.next_token())
    }

    pub fn expect(&mut self, kind: TokenKind) -> ParseResult<AnyToken> {
        let token = self.next_token();
        if token.kind == kind {
            Ok(token)
        } else {
            self.bail(
                token,
                format!("{} expected", kind.name()),
                format!(
                    "{} expected here, but found {}",
                    kind.name(),
                    self.describe(token)
                ),
            )
        }
    }

    pub fn ident(&mut self) -> ParseResult<Ident> {
        let token = self.expect(TokenKind::Ident)?;
        Ok(Ident::from_token(self.token(token)))
    }

    pub fn at_end_of_statement(&mut self) -> bool {
        matches!(
            self.peek_token().kind,
            TokenKind::NewLine | TokenKind::EndOfFile
        )
    }

    /// Consumes the line break ending a statement. The end of the file also ends a statement, but
    /// is left in the stream.
    pub fn expect_end_of_statement(&mut self) -> ParseResult<()> {
        let token = self.peek_token();
        match token.kind {
            TokenKind::NewLine => {
                self.next_token();
                Ok(())
            }
            TokenKind::EndOfFile => Ok(()),
            _ => self.bail(
                token,
                "end of line expected",
                format!(
                    "the statement should end here, but found {}",
                    self.describe(token)
                ),
            ),
        }
    }

    pub fn expect_end_of_input(&mut self) -> ParseResult<()> {
        while self.eat(TokenKind::NewLine).is_some() {}
        self.expect(TokenKind::EndOfFile).map(|_| ())
    }

    /// Span of the last token consumed on the code channel.
    pub fn previous_span(&self) -> Span {
        let position = self.tokens.position();
        position
            .checked_sub(1)
            .and_then(|index| self.tokens.previous_token_on_channel(index))
            .map(|index| self.tokens.token(index).span)
            .unwrap_or_default()
    }

    /// Reads a line comment, if the next token on the comment channel is one. Only valid at the
    /// start of a statement.
    pub fn comment(&mut self) -> Option<Comment> {
        self.tokens.enable_channel(Channel::COMMENT);
        let token = self.peek_token();
        let comment = (token.kind == TokenKind::LineComment).then(|| {
            self.next_token();
            let token = self.token(token);
            Comment {
                text: token.text.clone(),
                span: token.span,
            }
        });
        self.tokens.disable_channel(Channel::COMMENT);
        comment
    }

    pub fn describe(&self, token: AnyToken) -> String {
        match token.kind {
            TokenKind::NewLine | TokenKind::EndOfFile => token.kind.name().to_owned(),
            _ => format!("`{}`", self.text(token)),
        }
    }

    pub fn error(
        &self,
        token: AnyToken,
        message: impl Into<String>,
        label: impl Into<String>,
    ) -> Diagnostic {
        let token = self.token(token);
        Diagnostic::error(self.file, message)
            .with_label(Label::primary(&token.span, label.into()).in_file(token.file))
    }

    pub fn bail<T>(
        &self,
        token: AnyToken,
        message: impl Into<String>,
        label: impl Into<String>,
    ) -> ParseResult<T> {
        Err(self.error(token, message, label))
    }
}
