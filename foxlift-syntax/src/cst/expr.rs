use std::cmp::Ordering;

use foxlift_foundation::{
    errors::Label,
    source::{Span, Spanned},
};
use foxlift_lexer::token::{AnyToken, TokenKind};

use crate::{ParseResult, Parser};

use super::Ident;

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    /// Kept as source text; the code generator decides between integers and floats.
    Number { text: String, span: Span },
    /// Contents without the delimiters.
    String { value: String, span: Span },
    Bool { value: bool, span: Span },
    Null { span: Span },
    Date { text: String, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Lit),
    IdAttr(IdAttr),
    Paren {
        inner: Box<Expr>,
        span: Span,
    },
    /// Trailers applied to something other than a name, like `(x).y`.
    Trailed {
        atom: Box<Expr>,
        trailers: Vec<Trailer>,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
}

/// A name followed by any number of calls, subscripts and member accesses.
#[derive(Debug, Clone, PartialEq)]
pub struct IdAttr {
    pub ident: Ident,
    pub trailers: Vec<Trailer>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trailer {
    /// `(args)` or `[args]`. FoxPro does not distinguish calls from array subscripts.
    Args { args: Vec<Expr>, span: Span },
    Member(Ident),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    /// `=`, which compares inside expressions.
    Assign,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    /// `a $ b`, substring test.
    Contains,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Rem
                | BinaryOp::Pow
                | BinaryOp::Contains
        )
    }
}

/// Operand of commands taking a file or table name: a parenthesized name expression, an
/// expression starting with a literal, or a bare path like `data\customers.dbf`.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialExpr {
    Expr(Expr),
    Path { text: String, span: Span },
}

impl Spanned for Lit {
    fn span(&self) -> Span {
        match self {
            Lit::Number { span, .. }
            | Lit::String { span, .. }
            | Lit::Bool { span, .. }
            | Lit::Null { span }
            | Lit::Date { span, .. } => *span,
        }
    }
}

impl Spanned for Expr {
    fn span(&self) -> Span {
        match self {
            Expr::Lit(lit) => lit.span(),
            Expr::IdAttr(id_attr) => id_attr.span,
            Expr::Paren { span, .. }
            | Expr::Trailed { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. } => *span,
        }
    }
}

impl Spanned for Trailer {
    fn span(&self) -> Span {
        match self {
            Trailer::Args { span, .. } => *span,
            Trailer::Member(ident) => ident.span,
        }
    }
}

impl Spanned for SpecialExpr {
    fn span(&self) -> Span {
        match self {
            SpecialExpr::Expr(expr) => expr.span(),
            SpecialExpr::Path { span, .. } => *span,
        }
    }
}

/// Binding strength of an infix operator. Lower numbers bind tighter; [`Precedence::None`]
/// means the token does not continue an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    None,
    Some(u8),
}

impl Precedence {
    pub const POW: Self = Self::Some(10);
    pub const PRODUCT: Self = Self::Some(20);
    pub const SUM: Self = Self::Some(30);
    pub const COMPARISON: Self = Self::Some(40);
    pub const NOT: Self = Self::Some(50);
    pub const AND: Self = Self::Some(60);
    pub const OR: Self = Self::Some(70);

    pub const EXPR: Self = Self::Some(u8::MAX);
}

impl PartialOrd for Precedence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let this = Option::<u8>::from(*self).map(|x| u8::MAX - x);
        let other = Option::<u8>::from(*other).map(|x| u8::MAX - x);
        this.partial_cmp(&other)
    }
}

impl From<Precedence> for Option<u8> {
    fn from(value: Precedence) -> Self {
        match value {
            Precedence::None => None,
            Precedence::Some(x) => Some(x),
        }
    }
}

impl Parser<'_> {
    fn infix_operator(&self, token: AnyToken) -> Option<(BinaryOp, Precedence)> {
        Some(match token.kind {
            TokenKind::Pow => (BinaryOp::Pow, Precedence::POW),
            TokenKind::Mul => (BinaryOp::Mul, Precedence::PRODUCT),
            TokenKind::Div => (BinaryOp::Div, Precedence::PRODUCT),
            TokenKind::Rem => (BinaryOp::Rem, Precedence::PRODUCT),
            TokenKind::Add => (BinaryOp::Add, Precedence::SUM),
            TokenKind::Sub => (BinaryOp::Sub, Precedence::SUM),
            TokenKind::Assign => (BinaryOp::Assign, Precedence::COMPARISON),
            TokenKind::Equal => (BinaryOp::Equal, Precedence::COMPARISON),
            TokenKind::NotEqual | TokenKind::Hash => (BinaryOp::NotEqual, Precedence::COMPARISON),
            TokenKind::Less => (BinaryOp::Less, Precedence::COMPARISON),
            TokenKind::Greater => (BinaryOp::Greater, Precedence::COMPARISON),
            TokenKind::LessEqual => (BinaryOp::LessEqual, Precedence::COMPARISON),
            TokenKind::GreaterEqual => (BinaryOp::GreaterEqual, Precedence::COMPARISON),
            TokenKind::Dollar => (BinaryOp::Contains, Precedence::COMPARISON),
            TokenKind::And => (BinaryOp::And, Precedence::AND),
            TokenKind::Or => (BinaryOp::Or, Precedence::OR),
            // FoxPro also accepts the logical operators spelled out without dots.
            TokenKind::Ident if self.is_keyword(token, "and") => (BinaryOp::And, Precedence::AND),
            TokenKind::Ident if self.is_keyword(token, "or") => (BinaryOp::Or, Precedence::OR),
            _ => return None,
        })
    }
}

impl Expr {
    pub fn parse(parser: &mut Parser<'_>) -> ParseResult<Self> {
        Self::precedence_parse(parser, Precedence::EXPR)
    }

    pub fn precedence_parse(parser: &mut Parser<'_>, precedence: Precedence) -> ParseResult<Self> {
        let prefix = Self::parse_prefix(parser)?;
        Self::continue_parse(parser, prefix, precedence)
    }

    /// Continues parsing infix operators after an already parsed left operand.
    pub fn continue_parse(
        parser: &mut Parser<'_>,
        mut chain: Expr,
        precedence: Precedence,
    ) -> ParseResult<Self> {
        loop {
            let token = parser.peek_token();
            let Some((operator, operator_precedence)) = parser.infix_operator(token) else {
                break;
            };
            if !(precedence < operator_precedence) {
                break;
            }
            parser.next_token();
            let right = Self::precedence_parse(parser, operator_precedence)?;
            let span = chain.span().join(&right.span());
            chain = Expr::Binary {
                left: Box::new(chain),
                operator,
                right: Box::new(right),
                span,
            };
        }
        Ok(chain)
    }

    fn parse_prefix(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let token = parser.next_token();
        let span = parser.span(token);
        let text = parser.text(token).to_owned();
        Ok(match token.kind {
            TokenKind::Number => Expr::Lit(Lit::Number { text, span }),
            TokenKind::String => {
                let value = text[1..text.len() - 1].to_owned();
                Self::trailed(parser, Expr::Lit(Lit::String { value, span }))?
            }
            TokenKind::Bool => Expr::Lit(Lit::Bool {
                value: matches!(text.as_bytes()[1], b't' | b'T' | b'y' | b'Y'),
                span,
            }),
            TokenKind::Null => Expr::Lit(Lit::Null { span }),
            TokenKind::Date => Expr::Lit(Lit::Date { text, span }),

            TokenKind::LeftParen => {
                let inner = Self::parse(parser)?;
                let close = parser.next_token();
                if close.kind != TokenKind::RightParen {
                    return Err(parser
                        .error(
                            close,
                            "missing `)` to close grouped expression",
                            "`)` expected here...",
                        )
                        .with_label(Label::secondary(
                            &span,
                            "...to close this `(`",
                        )));
                }
                let paren = Expr::Paren {
                    inner: Box::new(inner),
                    span: span.join(&parser.span(close)),
                };
                Self::trailed(parser, paren)?
            }

            TokenKind::Not => Self::unary(parser, UnaryOp::Not, span, Precedence::NOT)?,
            TokenKind::Ident if parser.is_keyword(token, "not") => {
                Self::unary(parser, UnaryOp::Not, span, Precedence::NOT)?
            }
            TokenKind::Sub => {
                let operand = Self::parse_prefix(parser)?;
                Self::build_unary(UnaryOp::Neg, span, operand)
            }
            TokenKind::Add => {
                let operand = Self::parse_prefix(parser)?;
                Self::build_unary(UnaryOp::Plus, span, operand)
            }

            TokenKind::Ident => Expr::IdAttr(IdAttr::parse_rest(parser, token)?),

            _ => parser.bail(
                token,
                "expression expected",
                format!(
                    "{} does not start an expression",
                    parser.describe(token)
                ),
            )?,
        })
    }

    fn unary(
        parser: &mut Parser<'_>,
        operator: UnaryOp,
        span: Span,
        precedence: Precedence,
    ) -> ParseResult<Self> {
        let operand = Self::precedence_parse(parser, precedence)?;
        Ok(Self::build_unary(operator, span, operand))
    }

    fn build_unary(operator: UnaryOp, span: Span, operand: Expr) -> Self {
        Expr::Unary {
            operator,
            span: span.join(&operand.span()),
            operand: Box::new(operand),
        }
    }

    fn trailed(parser: &mut Parser<'_>, atom: Expr) -> ParseResult<Self> {
        let trailers = Trailer::parse_many(parser)?;
        if trailers.is_empty() {
            Ok(atom)
        } else {
            let span = atom.span().join(&trailers.span());
            Ok(Expr::Trailed {
                atom: Box::new(atom),
                trailers,
                span,
            })
        }
    }

    pub fn as_id_attr(&self) -> Option<&IdAttr> {
        match self {
            Expr::IdAttr(id_attr) => Some(id_attr),
            _ => None,
        }
    }
}

impl IdAttr {
    pub fn parse(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let token = parser.expect(TokenKind::Ident)?;
        Self::parse_rest(parser, token)
    }

    /// Parses the trailers following an already consumed identifier.
    pub fn parse_rest(parser: &mut Parser<'_>, ident: AnyToken) -> ParseResult<Self> {
        let ident = Ident::from_token(parser.token(ident));
        let trailers = Trailer::parse_many(parser)?;
        let span = match trailers.last() {
            Some(last) => ident.span.join(&last.span()),
            None => ident.span,
        };
        Ok(Self {
            ident,
            trailers,
            span,
        })
    }

    /// Dotted parts of the name, if it consists only of member accesses.
    pub fn dotted_path(&self) -> Option<Vec<&Ident>> {
        let mut path = vec![&self.ident];
        for trailer in &self.trailers {
            match trailer {
                Trailer::Member(ident) => path.push(ident),
                Trailer::Args { .. } => return None,
            }
        }
        Some(path)
    }
}

impl Trailer {
    fn parse_many(parser: &mut Parser<'_>) -> ParseResult<Vec<Self>> {
        let mut trailers = vec![];
        loop {
            let token = parser.peek_token();
            match token.kind {
                TokenKind::LeftParen => {
                    parser.next_token();
                    trailers.push(Self::args(parser, token, TokenKind::RightParen)?);
                }
                TokenKind::LeftBracket => {
                    parser.next_token();
                    trailers.push(Self::args(parser, token, TokenKind::RightBracket)?);
                }
                TokenKind::Dot => {
                    parser.next_token();
                    trailers.push(Trailer::Member(parser.ident()?));
                }
                _ => break,
            }
        }
        Ok(trailers)
    }

    fn args(parser: &mut Parser<'_>, open: AnyToken, close: TokenKind) -> ParseResult<Self> {
        let open_span = parser.span(open);
        let mut args = vec![];
        if let Some(close) = parser.eat(close) {
            return Ok(Trailer::Args {
                args,
                span: open_span.join(&parser.span(close)),
            });
        }
        loop {
            args.push(Expr::parse(parser)?);
            let token = parser.next_token();
            if token.kind == close {
                return Ok(Trailer::Args {
                    args,
                    span: open_span.join(&parser.span(token)),
                });
            } else if token.kind != TokenKind::Comma {
                return parser.bail(
                    token,
                    format!("`,` or {} expected after argument", close.name()),
                    format!("found {} in the argument list", parser.describe(token)),
                );
            }
        }
    }
}

/// Comma-separated expressions, as taken by `?` and `DO ... WITH`.
pub fn parse_args(parser: &mut Parser<'_>) -> ParseResult<Vec<Expr>> {
    let mut args = vec![Expr::parse(parser)?];
    while parser.eat(TokenKind::Comma).is_some() {
        args.push(Expr::parse(parser)?);
    }
    Ok(args)
}

impl SpecialExpr {
    pub fn parse(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let token = parser.peek_token();
        match token.kind {
            TokenKind::LeftParen => {
                parser.next_token();
                let expr = Expr::parse(parser)?;
                parser.expect(TokenKind::RightParen)?;
                Ok(SpecialExpr::Expr(expr))
            }
            TokenKind::Number
            | TokenKind::String
            | TokenKind::Bool
            | TokenKind::Null
            | TokenKind::Date => Ok(SpecialExpr::Expr(Expr::parse(parser)?)),
            _ => Self::path(parser),
        }
    }

    /// A run of tokens not separated by whitespace.
    fn path(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let first = parser.next_token();
        if Self::ends_path(first.kind) {
            return parser.bail(
                first,
                "file name expected",
                format!("found {} instead of a name", parser.describe(first)),
            );
        }
        let mut text = parser.text(first).to_owned();
        let mut span = parser.span(first);
        let mut last = first;
        loop {
            let next = parser.peek_token();
            if Self::ends_path(next.kind) || !parser.hugs(last, next) {
                break;
            }
            parser.next_token();
            text.push_str(parser.text(next));
            span = span.join(&parser.span(next));
            last = next;
        }
        Ok(SpecialExpr::Path { text, span })
    }

    fn ends_path(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::NewLine
                | TokenKind::EndOfFile
                | TokenKind::Comma
                | TokenKind::LeftParen
                | TokenKind::RightParen
        )
    }
}
