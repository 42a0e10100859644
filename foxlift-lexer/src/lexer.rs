use std::ops::Range;

use foxlift_foundation::{
    errors::{Diagnostic, Label},
    source::{SourceFileId, Span},
};
use tracing::info_span;

use crate::token::{Token, TokenKind};

#[derive(Debug)]
pub struct Lexer<'a> {
    pub file: SourceFileId,
    pub input: &'a str,
    pub position: usize,

    tokens: Vec<Token>,
    /// No code has been seen on the current line yet. `*` and `NOTE` only start a comment here.
    at_line_start: bool,
    last_code: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(file: SourceFileId, input: &'a str) -> Self {
        Self {
            file,
            input,
            position: 0,
            tokens: vec![],
            at_line_start: true,
            last_code: None,
        }
    }

    /// Splits the whole input into tokens. The concatenated token texts reproduce the input, and
    /// the list always ends with an end of file token.
    pub fn lex(mut self) -> Result<Vec<Token>, Diagnostic> {
        let _span = info_span!("lex", len = self.input.len()).entered();
        while self.position < self.input.len() {
            let kind = self.next_token()?;
            match kind {
                TokenKind::NewLine | TokenKind::LineComment => self.at_line_start = true,
                TokenKind::Space | TokenKind::Continuation => (),
                _ => self.at_line_start = false,
            }
            if kind.channel() == crate::token_stream::Channel::CODE {
                self.last_code = Some(kind);
            }
        }
        self.tokens
            .push(Token::end_of_file(self.file, self.input.len()));
        Ok(self.tokens)
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.input[self.position..].chars().nth(offset)
    }

    fn advance_char(&mut self) {
        if let Some(char) = self.current_char() {
            self.position += char.len_utf8();
        }
    }

    fn advance_while(&mut self, test: impl Fn(char) -> bool) {
        while self.current_char().map(&test).unwrap_or(false) {
            self.advance_char();
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn range(&self, start: usize) -> Range<usize> {
        start..self.position
    }

    fn create_token(&mut self, kind: TokenKind, range: Range<usize>) -> TokenKind {
        let text = &self.input[range.clone()];
        self.tokens
            .push(Token::new(kind, text, Span::from(range), self.file));
        kind
    }

    fn single(&mut self, kind: TokenKind, len: usize) -> TokenKind {
        let start = self.position;
        for _ in 0..len {
            self.advance_char();
        }
        self.create_token(kind, self.range(start))
    }

    fn error(&self, message: &str, span: Span, label: &str) -> Diagnostic {
        Diagnostic::error(self.file, message).with_label(Label::primary(&span, label))
    }

    fn line_end(&self) -> usize {
        self.rest()
            .find('\n')
            .map(|offset| self.position + offset)
            .unwrap_or(self.input.len())
    }

    fn starts_with_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        rest.len() >= keyword.len()
            && rest.is_char_boundary(keyword.len())
            && rest[..keyword.len()].eq_ignore_ascii_case(keyword)
            && !rest[keyword.len()..]
                .chars()
                .next()
                .map(is_identifier_char)
                .unwrap_or(false)
    }

    fn next_token(&mut self) -> Result<TokenKind, Diagnostic> {
        let start = self.position;
        let Some(char) = self.current_char() else {
            return Ok(self.create_token(TokenKind::EndOfFile, self.range(start)));
        };

        if self.at_line_start && (char == '*' || self.starts_with_keyword("note")) {
            return Ok(self.line_comment(start));
        }

        Ok(match char {
            ' ' | '\t' | '\r' => {
                self.advance_while(|c| matches!(c, ' ' | '\t' | '\r'));
                self.create_token(TokenKind::Space, self.range(start))
            }
            '\n' => self.single(TokenKind::NewLine, 1),
            '&' if self.char_at(1) == Some('&') => {
                self.advance_while(|c| c != '\n');
                self.create_token(TokenKind::InlineComment, self.range(start))
            }
            ';' => return self.continuation(start),
            c if is_identifier_start(c) => {
                self.advance_while(is_identifier_char);
                self.create_token(TokenKind::Ident, self.range(start))
            }
            '0'..='9' => self.number(start),
            '.' if self.char_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                self.number(start)
            }
            '.' => self.dotted_word(start),
            '"' | '\'' => return self.quoted_string(start, char),
            '[' => self.bracket(start),
            '{' => return self.date(start),
            _ => return self.punctuation(start, char),
        })
    }

    fn line_comment(&mut self, start: usize) -> TokenKind {
        loop {
            let line_end = self.line_end();
            let continued = self.input[self.position..line_end]
                .trim_end()
                .ends_with(';');
            self.position = line_end;
            if self.current_char() == Some('\n') {
                self.advance_char();
            } else {
                break;
            }
            if !continued {
                break;
            }
        }
        self.create_token(TokenKind::LineComment, self.range(start))
    }

    fn continuation(&mut self, start: usize) -> Result<TokenKind, Diagnostic> {
        self.advance_char();
        self.advance_while(|c| matches!(c, ' ' | '\t' | '\r'));
        match self.current_char() {
            Some('\n') => {
                self.advance_char();
                Ok(self.create_token(TokenKind::Continuation, self.range(start)))
            }
            None => Ok(self.create_token(TokenKind::Continuation, self.range(start))),
            Some(_) => Err(self.error(
                "`;` is only allowed at the end of a line",
                Span::new(start, start + 1),
                "expected a line break after this",
            )),
        }
    }

    fn number(&mut self, start: usize) -> TokenKind {
        if self.current_char() == Some('0') && matches!(self.char_at(1), Some('x' | 'X')) {
            self.advance_char();
            self.advance_char();
            self.advance_while(|c| c.is_ascii_hexdigit());
            return self.create_token(TokenKind::Number, self.range(start));
        }

        self.advance_while(|c| c.is_ascii_digit());
        if self.current_char() == Some('.')
            && self.char_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            self.advance_char();
            self.advance_while(|c| c.is_ascii_digit());
        }
        if let Some('e' | 'E') = self.current_char() {
            let signed_digits = matches!(self.char_at(1), Some('+' | '-'))
                && self.char_at(2).map(|c| c.is_ascii_digit()).unwrap_or(false);
            let after = self.char_at(1);
            if signed_digits {
                self.advance_char();
                self.advance_char();
                self.advance_while(|c| c.is_ascii_digit());
            } else if after.map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance_char();
                self.advance_while(|c| c.is_ascii_digit());
            } else if !after.map(is_identifier_char).unwrap_or(false) {
                // A bare trailing exponent marker, `1e`, is still a number.
                self.advance_char();
            }
        }
        self.create_token(TokenKind::Number, self.range(start))
    }

    /// `.T.`, `.NULL.`, `.AND.` and friends, or a plain `.`.
    fn dotted_word(&mut self, start: usize) -> TokenKind {
        const WORDS: &[(&str, TokenKind)] = &[
            (".t.", TokenKind::Bool),
            (".f.", TokenKind::Bool),
            (".y.", TokenKind::Bool),
            (".n.", TokenKind::Bool),
            (".null.", TokenKind::Null),
            (".and.", TokenKind::And),
            (".or.", TokenKind::Or),
            (".not.", TokenKind::Not),
        ];
        let rest = self.rest();
        for &(word, kind) in WORDS {
            if rest.len() >= word.len()
                && rest.is_char_boundary(word.len())
                && rest[..word.len()].eq_ignore_ascii_case(word)
            {
                self.position += word.len();
                return self.create_token(kind, self.range(start));
            }
        }
        self.single(TokenKind::Dot, 1)
    }

    fn quoted_string(&mut self, start: usize, quote: char) -> Result<TokenKind, Diagnostic> {
        self.advance_char();
        self.advance_while(|c| c != quote && c != '\n');
        if self.current_char() == Some(quote) {
            self.advance_char();
            Ok(self.create_token(TokenKind::String, self.range(start)))
        } else {
            Err(self.error(
                "string literal is missing its closing quote",
                Span::from(self.range(start)),
                "the string starts here",
            ))
        }
    }

    /// `[` opens a string unless it follows something that can be indexed.
    fn bracket(&mut self, start: usize) -> TokenKind {
        let indexes = self
            .last_code
            .map(|kind| kind.can_be_indexed())
            .unwrap_or(false);
        let line = &self.input[self.position..self.line_end()];
        match line.find(']') {
            Some(close) if !indexes => {
                self.position += close + 1;
                self.create_token(TokenKind::String, self.range(start))
            }
            _ => self.single(TokenKind::LeftBracket, 1),
        }
    }

    fn date(&mut self, start: usize) -> Result<TokenKind, Diagnostic> {
        self.advance_char();
        self.advance_while(|c| c != '}' && c != '\n');
        if self.current_char() == Some('}') {
            self.advance_char();
            Ok(self.create_token(TokenKind::Date, self.range(start)))
        } else {
            Err(self.error(
                "date literal is missing its closing `}`",
                Span::from(self.range(start)),
                "the date starts here",
            ))
        }
    }

    fn punctuation(&mut self, start: usize, char: char) -> Result<TokenKind, Diagnostic> {
        let next = self.char_at(1);
        Ok(match (char, next) {
            ('*', Some('*')) => self.single(TokenKind::Pow, 2),
            ('=', Some('=')) => self.single(TokenKind::Equal, 2),
            ('<', Some('>')) => self.single(TokenKind::NotEqual, 2),
            ('!', Some('=')) => self.single(TokenKind::NotEqual, 2),
            ('<', Some('=')) => self.single(TokenKind::LessEqual, 2),
            ('>', Some('=')) => self.single(TokenKind::GreaterEqual, 2),
            ('?', Some('?')) => self.single(TokenKind::Question, 2),
            ('*', _) => self.single(TokenKind::Mul, 1),
            ('^', _) => self.single(TokenKind::Pow, 1),
            ('+', _) => self.single(TokenKind::Add, 1),
            ('-', _) => self.single(TokenKind::Sub, 1),
            ('/', _) => self.single(TokenKind::Div, 1),
            ('%', _) => self.single(TokenKind::Rem, 1),
            ('=', _) => self.single(TokenKind::Assign, 1),
            ('<', _) => self.single(TokenKind::Less, 1),
            ('>', _) => self.single(TokenKind::Greater, 1),
            ('!', _) => self.single(TokenKind::Not, 1),
            ('#', _) => self.single(TokenKind::Hash, 1),
            ('$', _) => self.single(TokenKind::Dollar, 1),
            ('?', _) => self.single(TokenKind::Question, 1),
            ('(', _) => self.single(TokenKind::LeftParen, 1),
            (')', _) => self.single(TokenKind::RightParen, 1),
            (']', _) => self.single(TokenKind::RightBracket, 1),
            (',', _) => self.single(TokenKind::Comma, 1),
            (':', _) => self.single(TokenKind::Colon, 1),
            ('\\', _) => self.single(TokenKind::Backslash, 1),
            ('@', _) => self.single(TokenKind::At, 1),
            ('&', _) => self.single(TokenKind::Ampersand, 1),
            _ => {
                return Err(self.error(
                    &format!("unexpected character {char:?}"),
                    Span::new(start, start + char.len_utf8()),
                    "this character is not valid here",
                ))
            }
        })
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use foxlift_foundation::source::{SourceFile, SourceFileSet};
    use indoc::indoc;

    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), input.into()));
        Lexer::new(file, input).lex().expect("input should lex")
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input)
            .into_iter()
            .filter(|token| token.kind != TokenKind::Space)
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn tokens_reproduce_input() {
        let input = indoc! {"
            * header ;
              still header
            x = 1.5e+3 && trailing
            ? [hello], 'a' + \"b\" ;
               , .T. .AND. .null.
        "};
        let text: String = lex(input).iter().map(|token| token.text.as_str()).collect();
        assert_eq!(text, input);
    }

    #[test]
    fn assignment() {
        assert_eq!(
            kinds("x = 1 + 2\n"),
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Add,
                TokenKind::Number,
                TokenKind::NewLine,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn star_is_a_comment_only_at_line_start() {
        assert_eq!(
            kinds("  * note\nx = 2 * 3\n"),
            vec![
                TokenKind::LineComment,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Mul,
                TokenKind::Number,
                TokenKind::NewLine,
                TokenKind::EndOfFile,
            ]
        );
        assert_eq!(kinds("NOTE old style\n")[0], TokenKind::LineComment);
        assert_eq!(kinds("notes = 1\n")[0], TokenKind::Ident);
    }

    #[test]
    fn line_comment_continues_after_semicolon() {
        let tokens = lex("* one ;\n  two\nx\n");
        assert_eq!(tokens[0].kind, TokenKind::LineComment);
        assert_eq!(tokens[0].text, "* one ;\n  two\n");
        assert_eq!(tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn brackets_are_strings_unless_indexing() {
        assert_eq!(kinds("? [abc]")[1], TokenKind::String);
        assert_eq!(
            kinds("a[1]"),
            vec![
                TokenKind::Ident,
                TokenKind::LeftBracket,
                TokenKind::Number,
                TokenKind::RightBracket,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn dotted_words() {
        assert_eq!(
            kinds(".T. .f. .NULL. .AND. .Or. .not. a.b"),
            vec![
                TokenKind::Bool,
                TokenKind::Bool,
                TokenKind::Null,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn numbers() {
        let texts: Vec<String> = lex("1 2.5 .5 1e5 1e-5 1e 0x1F 3.")
            .into_iter()
            .filter(|token| !matches!(token.kind, TokenKind::Space | TokenKind::EndOfFile))
            .map(|token| token.text)
            .collect();
        assert_eq!(
            texts,
            vec!["1", "2.5", ".5", "1e5", "1e-5", "1e", "0x1F", "3", "."]
        );
    }

    #[test]
    fn continuation_is_hidden_whitespace() {
        let tokens = lex("x = 1 + ;\n 2\n");
        let continuation = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Continuation)
            .expect("continuation token");
        assert_eq!(continuation.text, ";\n");
        assert_eq!(
            tokens
                .iter()
                .filter(|token| token.kind == TokenKind::NewLine)
                .count(),
            1
        );
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("a <> b != c # d == e ** f ^ g"),
            vec![
                TokenKind::Ident,
                TokenKind::NotEqual,
                TokenKind::Ident,
                TokenKind::NotEqual,
                TokenKind::Ident,
                TokenKind::Hash,
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::Ident,
                TokenKind::Pow,
                TokenKind::Ident,
                TokenKind::Pow,
                TokenKind::Ident,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), "x = 'abc\n".into()));
        let error = Lexer::new(file, "x = 'abc\n").lex().unwrap_err();
        assert_eq!(error.message, "string literal is missing its closing quote");
        assert_eq!(error.labels[0].span, Span::new(4, 8));
    }

    #[test]
    fn unknown_character_is_an_error() {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), "x = `".into()));
        assert!(Lexer::new(file, "x = `").lex().is_err());
    }
}
