//! The directive structure of a file, parsed from its code tokens.

use std::ops::Range;

use foxlift_foundation::source::Span;
use foxlift_lexer::{
    token::{TokenId, TokenKind},
    token_stream::TokenStream,
};
use foxlift_syntax::{cst::Ident, ParseResult, Parser};

/// Directives and ordinary lines of one file, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessorCode(pub Vec<Directive>);

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `#DEFINE name body`. The body is every token after the name up to the end of the line.
    Define { name: Ident, body: Range<TokenId> },
    /// `#UNDEF name`
    Undefine { name: Ident },
    /// `#INCLUDE file`. The file name is parsed only after macros in it have been substituted.
    Include { path: Range<TokenId>, span: Span },
    /// `#IF`, `#IFDEF` or `#IFNDEF`, with an optional `#ELSE` branch.
    If {
        condition: Condition,
        then: PreprocessorCode,
        otherwise: Option<PreprocessorCode>,
    },
    /// Any other line, from its first code token up to and including its line break.
    Line(Range<TokenId>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `#IF expr`. Like include paths, the expression is parsed after substitution.
    Expr { tokens: Range<TokenId>, span: Span },
    Defined(Ident),
    NotDefined(Ident),
}

const DIRECTIVES: &[&str] = &[
    "define", "undef", "include", "if", "ifdef", "ifndef", "else", "endif",
];

impl PreprocessorCode {
    pub fn parse(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let (code, _) = Self::parse_until(parser, &[])?;
        Ok(code)
    }

    /// Parses until the end of the file or one of the `terminators` (`else` or `endif`), which is
    /// consumed and returned. Reaching the end of the file is an error while terminators are
    /// expected.
    fn parse_until(
        parser: &mut Parser<'_>,
        terminators: &[&str],
    ) -> ParseResult<(Self, Option<&'static str>)> {
        let mut directives = vec![];
        loop {
            let token = parser.peek_token();
            match token.kind {
                TokenKind::EndOfFile => {
                    return match terminators.last() {
                        Some(terminator) => parser.bail(
                            token,
                            format!("`#{}` expected", terminator.to_ascii_uppercase()),
                            "the file ends inside a conditional block",
                        ),
                        None => Ok((Self(directives), None)),
                    };
                }
                TokenKind::Hash => {
                    parser.next_token();
                    let keyword = parser.next_token();
                    let Some(&directive) = DIRECTIVES
                        .iter()
                        .find(|directive| parser.is_keyword(keyword, directive))
                    else {
                        return parser.bail(
                            keyword,
                            "unknown preprocessor directive",
                            format!(
                                "a directive such as `DEFINE` or `IF` was expected, but found {}",
                                parser.describe(keyword)
                            ),
                        );
                    };

                    match directive {
                        "else" | "endif" => {
                            if !terminators.contains(&directive) {
                                return parser.bail(
                                    keyword,
                                    format!(
                                        "`#{}` without a matching `#IF`",
                                        directive.to_ascii_uppercase()
                                    ),
                                    "no conditional block is open here",
                                );
                            }
                            parser.expect_end_of_statement()?;
                            return Ok((Self(directives), Some(directive)));
                        }
                        "define" => {
                            let name = parser.expect(TokenKind::Ident)?;
                            let (tokens, _) = rest_of_line(parser);
                            directives.push(Directive::Define {
                                name: Ident::from_token(parser.token(name)),
                                body: name.id + 1..tokens.end,
                            });
                        }
                        "undef" => {
                            let name = parser.ident()?;
                            parser.expect_end_of_statement()?;
                            directives.push(Directive::Undefine { name });
                        }
                        "include" => {
                            let (path, span) = rest_of_line(parser);
                            let Some(span) = span else {
                                return parser.bail(
                                    keyword,
                                    "file name expected",
                                    "`#INCLUDE` needs the name of the file to include",
                                );
                            };
                            directives.push(Directive::Include { path, span });
                        }
                        _ => {
                            let condition = match directive {
                                "ifdef" | "ifndef" => {
                                    let name = parser.ident()?;
                                    parser.expect_end_of_statement()?;
                                    if directive == "ifdef" {
                                        Condition::Defined(name)
                                    } else {
                                        Condition::NotDefined(name)
                                    }
                                }
                                _ => {
                                    let (tokens, span) = rest_of_line(parser);
                                    let Some(span) = span else {
                                        return parser.bail(
                                            keyword,
                                            "condition expected",
                                            "`#IF` needs an expression to test",
                                        );
                                    };
                                    Condition::Expr { tokens, span }
                                }
                            };
                            let (then, terminator) = Self::parse_until(parser, &["else", "endif"])?;
                            let otherwise = match terminator {
                                Some("else") => Some(Self::parse_until(parser, &["endif"])?.0),
                                _ => None,
                            };
                            directives.push(Directive::If {
                                condition,
                                then,
                                otherwise,
                            });
                        }
                    }
                }
                _ => directives.push(Directive::Line(line(parser))),
            }
        }
    }
}

/// Consumes the rest of a directive line. Returns the range of tokens before the line break
/// (hidden ones included) and the span of the code tokens among them, if there are any.
fn rest_of_line(parser: &mut Parser<'_>) -> (Range<TokenId>, Option<Span>) {
    let start = parser.tokens.position();
    let mut span: Option<Span> = None;
    loop {
        let token = parser.peek_token();
        match token.kind {
            TokenKind::NewLine => {
                parser.next_token();
                return (start..token.id, span);
            }
            TokenKind::EndOfFile => return (start..token.id, span),
            _ => {
                parser.next_token();
                let token_span = parser.span(token);
                span = Some(match span {
                    Some(span) => span.join(&token_span),
                    None => token_span,
                });
            }
        }
    }
}

/// Consumes an ordinary line. A last line without a line break extends up to the end of file
/// token, so that trailing blanks and comments stay with it.
fn line(parser: &mut Parser<'_>) -> Range<TokenId> {
    let start = parser.peek_token().id;
    loop {
        let token = parser.next_token();
        match token.kind {
            TokenKind::NewLine => return start..token.id + 1,
            TokenKind::EndOfFile => return start..token.id,
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use foxlift_foundation::source::{SourceFile, SourceFileSet};
    use foxlift_lexer::{token_stream::MultichannelTokenStream, Lexer};
    use indoc::indoc;

    use super::*;

    fn parse(source: &str) -> ParseResult<PreprocessorCode> {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), source.into()));
        let mut stream = MultichannelTokenStream::new(Lexer::new(file, source).lex()?);
        let mut parser = Parser::new(file, &mut stream);
        PreprocessorCode::parse(&mut parser)
    }

    #[test]
    fn lines_and_definitions() {
        let code = parse(indoc! {"
            #DEFINE answer 42
            x = answer
        "})
        .unwrap();
        // `#`, `DEFINE`, ` `, `answer`, ` `, `42`, `\n`, `x`, ...
        assert_eq!(code.0.len(), 2);
        let Directive::Define { name, body } = &code.0[0] else {
            panic!("expected a definition, got {:?}", code.0[0]);
        };
        assert_eq!(name.text, "answer");
        assert_eq!(*body, 4..6);
        assert_eq!(code.0[1], Directive::Line(7..13));
    }

    #[test]
    fn nested_conditionals() {
        let code = parse(indoc! {"
            #IFDEF debug
                #IF level > 1
                    ? 'verbose'
                #ENDIF
            #ELSE
                ? 'quiet'
            #ENDIF
        "})
        .unwrap();
        let [Directive::If {
            condition: Condition::Defined(name),
            then,
            otherwise: Some(otherwise),
        }] = code.0.as_slice()
        else {
            panic!("expected one conditional, got {:?}", code.0);
        };
        assert!(name.is("debug"));
        assert!(matches!(
            then.0.as_slice(),
            [Directive::If {
                condition: Condition::Expr { .. },
                otherwise: None,
                ..
            }]
        ));
        assert!(matches!(otherwise.0.as_slice(), [Directive::Line(_)]));
    }

    #[test]
    fn ifndef_and_undef() {
        let code = parse("#ifndef x\n#undef x\n#endif\n").unwrap();
        let [Directive::If {
            condition: Condition::NotDefined(_),
            then,
            otherwise: None,
        }] = code.0.as_slice()
        else {
            panic!("expected one conditional, got {:?}", code.0);
        };
        assert!(matches!(then.0.as_slice(), [Directive::Undefine { .. }]));
    }

    #[test]
    fn last_line_without_line_break() {
        let code = parse("? 1 && done").unwrap();
        // `?`, ` `, `1`, ` `, `&& done`, end of file
        assert_eq!(code.0, vec![Directive::Line(0..5)]);
    }

    #[test]
    fn errors() {
        assert_eq!(
            parse("#IF .T.\nx = 1\n").unwrap_err().message,
            "`#ENDIF` expected"
        );
        assert_eq!(
            parse("#IF .T.\n#ELSE\n#ELSE\n#ENDIF\n")
                .unwrap_err()
                .message,
            "`#ELSE` without a matching `#IF`"
        );
        assert_eq!(
            parse("#ENDIF\n").unwrap_err().message,
            "`#ENDIF` without a matching `#IF`"
        );
        assert_eq!(
            parse("#PRAGMA once\n").unwrap_err().message,
            "unknown preprocessor directive"
        );
        assert_eq!(
            parse("#INCLUDE  \n").unwrap_err().message,
            "file name expected"
        );
    }
}
