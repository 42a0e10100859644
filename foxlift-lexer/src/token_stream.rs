use std::ops::Range;

use bitflags::bitflags;

use crate::token::{AnyToken, Token, TokenId, TokenKind};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Channel: u8 {
        /// Everything the parsers look at, including line breaks.
        const CODE    = 0x1;
        /// Blanks and `;` line continuations. Only the preprocessor's line reconstruction reads
        /// these.
        const SPACE   = 0x2;
        /// `*`, `NOTE` and `&&` comments. Carried through to the output as Python comments.
        const COMMENT = 0x4;
    }
}

pub trait TokenStream {
    type Position;

    fn next(&mut self) -> AnyToken;

    fn position(&self) -> Self::Position;

    fn set_position(&mut self, position: Self::Position);

    fn peek(&mut self) -> AnyToken {
        let position = self.position();
        let token = self.next();
        self.set_position(position);
        token
    }
}

impl<T> TokenStream for &mut T
where
    T: TokenStream,
{
    type Position = T::Position;

    fn next(&mut self) -> AnyToken {
        <T as TokenStream>::next(self)
    }

    fn position(&self) -> Self::Position {
        <T as TokenStream>::position(self)
    }

    fn set_position(&mut self, position: Self::Position) {
        <T as TokenStream>::set_position(self, position)
    }
}

/// Token list with a switchable set of visible channels.
///
/// Preprocessor directives, code and comments all live in the same token list. Directive parsing
/// wants to see code only, while reconstructing a line of output also wants the blanks and
/// comments between code tokens. Rather than splitting the list, the stream skips over tokens
/// whose channel is currently disabled.
#[derive(Debug, Clone)]
pub struct MultichannelTokenStream {
    tokens: Vec<Token>,
    channels: Channel,
    cursor: TokenId,
}

impl MultichannelTokenStream {
    /// Creates a stream with only [`Channel::CODE`] enabled. The token list must end with an
    /// [`TokenKind::EndOfFile`] token, as produced by the lexer.
    pub fn new(tokens: Vec<Token>) -> Self {
        assert!(
            tokens.last().map(|token| token.kind) == Some(TokenKind::EndOfFile),
            "token list must be terminated by an end of file token"
        );
        Self {
            tokens,
            channels: Channel::CODE,
            cursor: 0,
        }
    }

    pub fn channels(&self) -> Channel {
        self.channels
    }

    pub fn enable_channel(&mut self, channel: Channel) {
        self.channels.insert(channel);
    }

    pub fn disable_channel(&mut self, channel: Channel) {
        self.channels.remove(channel);
    }

    fn is_visible(&self, token: &Token) -> bool {
        token.kind == TokenKind::EndOfFile || self.channels.intersects(token.channel)
    }

    /// Scans forward from `index` (inclusive) for the first token on an enabled channel.
    /// The end of file token counts as visible, so this only fails past the end of the list.
    pub fn next_token_on_channel(&self, index: TokenId) -> Option<TokenId> {
        (index..self.tokens.len()).find(|&i| self.is_visible(&self.tokens[i]))
    }

    /// Scans backward from `index` (inclusive) for the first token on an enabled channel.
    pub fn previous_token_on_channel(&self, index: TokenId) -> Option<TokenId> {
        let end = index.checked_add(1)?.min(self.tokens.len());
        (0..end).rev().find(|&i| self.is_visible(&self.tokens[i]))
    }

    /// The run of tokens directly before `index` that are not on an enabled channel.
    pub fn hidden_tokens_to_left(&self, index: TokenId) -> Range<TokenId> {
        let index = index.min(self.tokens.len());
        let start = (0..index)
            .rev()
            .take_while(|&i| !self.is_visible(&self.tokens[i]))
            .last()
            .unwrap_or(index);
        start..index
    }

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id]
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    fn end_of_file(&self) -> TokenId {
        self.tokens.len() - 1
    }
}

impl TokenStream for MultichannelTokenStream {
    type Position = TokenId;

    fn next(&mut self) -> AnyToken {
        let id = self
            .next_token_on_channel(self.cursor)
            .unwrap_or_else(|| self.end_of_file());
        if id < self.end_of_file() {
            self.cursor = id + 1;
        } else {
            self.cursor = id;
        }
        AnyToken {
            kind: self.tokens[id].kind,
            id,
        }
    }

    fn position(&self) -> Self::Position {
        self.cursor
    }

    fn set_position(&mut self, position: Self::Position) {
        self.cursor = position;
    }
}

#[cfg(test)]
mod tests {
    use foxlift_foundation::source::{SourceFile, SourceFileSet};

    use crate::Lexer;

    use super::*;

    fn stream(input: &str) -> MultichannelTokenStream {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), input.into()));
        MultichannelTokenStream::new(Lexer::new(file, input).lex().expect("input should lex"))
    }

    #[test]
    fn skips_disabled_channels() {
        let mut stream = stream("a  b && c\n");
        let kinds: Vec<_> = std::iter::from_fn(|| {
            let token = stream.next();
            (token.kind != TokenKind::EndOfFile).then_some(token.kind)
        })
        .collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::NewLine]
        );
        // End of file repeats once reached.
        assert_eq!(stream.next().kind, TokenKind::EndOfFile);
        assert_eq!(stream.next().kind, TokenKind::EndOfFile);
    }

    #[test]
    fn toggling_channels_changes_the_view() {
        let mut stream = stream("a && c\n");
        assert_eq!(stream.next_token_on_channel(1), Some(3));
        stream.enable_channel(Channel::COMMENT);
        stream.enable_channel(Channel::COMMENT);
        assert_eq!(stream.next_token_on_channel(1), Some(2));
        assert_eq!(stream.token(2).kind, TokenKind::InlineComment);
        stream.disable_channel(Channel::COMMENT);
        assert_eq!(stream.channels(), Channel::CODE);
        assert_eq!(stream.next_token_on_channel(99), None);
    }

    #[test]
    fn previous_token_scans_backwards() {
        let stream = stream("a  b\n");
        assert_eq!(stream.previous_token_on_channel(1), Some(0));
        assert_eq!(stream.previous_token_on_channel(2), Some(2));
    }

    #[test]
    fn hidden_tokens_to_left_of_line() {
        let stream = stream("* comment\n  x\n");
        // `* comment\n`, `  `, `x`
        assert_eq!(stream.hidden_tokens_to_left(2), 0..2);
        assert_eq!(stream.hidden_tokens_to_left(0), 0..0);
    }

    #[test]
    fn peek_does_not_advance() {
        let mut stream = stream("a b");
        assert_eq!(stream.peek().id, 0);
        assert_eq!(stream.next().id, 0);
        assert_eq!(stream.peek().id, 2);
    }
}
