use foxlift_foundation::source::{Span, Spanned};
use foxlift_lexer::token::TokenKind;

use crate::{ParseResult, Parser};

use super::{parse_lines, Comment, Expr, IdAttr, Ident, Stmt};

/// A whole `.prg` file.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Statements outside of any procedure or class, in source order.
    pub lines: Vec<Stmt>,
    pub classes: Vec<ClassDef>,
    pub functions: Vec<FuncDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: Ident,
    pub parent: Option<Ident>,
    pub stmts: Vec<ClassStmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassStmt {
    Comment(Comment),
    /// A property initializer, `Caption = "OK"`.
    Assign {
        target: IdAttr,
        value: Expr,
        span: Span,
    },
    /// `ADD OBJECT name AS class WITH prop = value, ...`
    AddObject {
        name: Ident,
        class: Ident,
        properties: Vec<(Ident, Expr)>,
        span: Span,
    },
    Method(FuncDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    /// Dotted names like `cmdOk.Click` define event handlers of contained objects.
    pub name: Vec<Ident>,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Ident,
    /// Declared type, `AS Integer`. Ignored by the translation.
    pub ty: Option<Ident>,
}

impl Spanned for ClassDef {
    fn span(&self) -> Span {
        self.span
    }
}

impl Spanned for FuncDef {
    fn span(&self) -> Span {
        self.span
    }
}

impl FuncDef {
    pub fn is_dotted(&self) -> bool {
        self.name.len() > 1
    }
}

const FUNCTION_END: &[&str] = &[
    "endproc",
    "endfunc",
    "procedure",
    "function",
    "define",
    "enddefine",
];

impl Program {
    pub fn parse(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let mut program = Program {
            lines: vec![],
            classes: vec![],
            functions: vec![],
        };
        loop {
            if let Some(comment) = parser.comment() {
                program.lines.push(Stmt::comment(comment));
                continue;
            }
            if parser.eat(TokenKind::NewLine).is_some() {
                continue;
            }
            if parser.peek_token().kind == TokenKind::EndOfFile {
                break;
            }
            if parser.peek_keyword("define") {
                program.classes.push(ClassDef::parse(parser)?);
            } else if parser.peek_any_keyword(&["procedure", "function"]) {
                program.functions.push(FuncDef::parse(parser)?);
            } else {
                program.lines.push(Stmt::parse(parser)?);
                parser.expect_end_of_statement()?;
            }
        }
        Ok(program)
    }
}

impl ClassDef {
    pub fn parse(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let define = parser.expect_keyword("define")?;
        parser.expect_keyword("class")?;
        let name = parser.ident()?;
        let parent = match parser.eat_keyword("as") {
            Some(_) => Some(parser.ident()?),
            None => None,
        };
        parser.eat_keyword("olepublic");
        parser.expect_end_of_statement()?;

        let mut stmts = vec![];
        loop {
            if let Some(comment) = parser.comment() {
                stmts.push(ClassStmt::Comment(comment));
                continue;
            }
            if parser.eat(TokenKind::NewLine).is_some() {
                continue;
            }
            let token = parser.peek_token();
            if parser.eat_keyword("enddefine").is_some() {
                break;
            } else if parser.peek_any_keyword(&["procedure", "function"]) {
                stmts.push(ClassStmt::Method(FuncDef::parse(parser)?));
            } else if parser.peek_keyword("add") {
                stmts.push(ClassStmt::parse_add_object(parser)?);
            } else if token.kind == TokenKind::Ident {
                let target = IdAttr::parse(parser)?;
                parser.expect(TokenKind::Assign)?;
                let value = Expr::parse(parser)?;
                parser.expect_end_of_statement()?;
                stmts.push(ClassStmt::Assign {
                    span: target.span.join(&value.span()),
                    target,
                    value,
                });
            } else {
                return parser.bail(
                    token,
                    "`ENDDEFINE` expected",
                    format!(
                        "found {} inside the class definition",
                        parser.describe(token)
                    ),
                );
            }
        }
        let span = parser.span(define).join(&parser.previous_span());
        parser.expect_end_of_statement()?;

        Ok(ClassDef {
            name,
            parent,
            stmts,
            span,
        })
    }
}

impl ClassStmt {
    fn parse_add_object(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let add = parser.expect_keyword("add")?;
        parser.expect_keyword("object")?;
        let name = parser.ident()?;
        parser.expect_keyword("as")?;
        let class = parser.ident()?;
        let mut properties = vec![];
        if parser.eat_keyword("with").is_some() {
            loop {
                let property = parser.ident()?;
                parser.expect(TokenKind::Assign)?;
                properties.push((property, Expr::parse(parser)?));
                if parser.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let span = parser.span(add).join(&parser.previous_span());
        parser.expect_end_of_statement()?;
        Ok(ClassStmt::AddObject {
            name,
            class,
            properties,
            span,
        })
    }
}

impl FuncDef {
    pub fn parse(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let keyword = parser.next_token();
        let mut name = vec![parser.ident()?];
        while parser.eat(TokenKind::Dot).is_some() {
            name.push(parser.ident()?);
        }

        let mut parameters = vec![];
        if parser.eat(TokenKind::LeftParen).is_some() {
            if parser.eat(TokenKind::RightParen).is_none() {
                parameters = Parameter::parse_list(parser)?;
                parser.expect(TokenKind::RightParen)?;
            }
        }
        parser.expect_end_of_statement()?;
        if parser
            .eat_any_keyword(&["lparameters", "lparameter", "parameters"])
            .is_some()
        {
            parameters.extend(Parameter::parse_list(parser)?);
            parser.expect_end_of_statement()?;
        }

        let body = parse_lines(parser, FUNCTION_END, true)?;
        let span = parser.span(keyword).join(&parser.previous_span());
        if parser.eat_any_keyword(&["endproc", "endfunc"]).is_some() {
            parser.expect_end_of_statement()?;
        }

        Ok(FuncDef {
            name,
            parameters,
            body,
            span,
        })
    }
}

impl Parameter {
    pub fn parse_list(parser: &mut Parser<'_>) -> ParseResult<Vec<Self>> {
        let mut parameters = vec![];
        loop {
            let name = parser.ident()?;
            let ty = match parser.eat_keyword("as") {
                Some(_) => Some(parser.ident()?),
                None => None,
            };
            parameters.push(Parameter { name, ty });
            if parser.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(parameters)
    }
}
