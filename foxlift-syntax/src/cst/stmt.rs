use foxlift_foundation::source::{Span, Spanned};
use foxlift_lexer::token::TokenKind;

use crate::{ParseResult, Parser};

use super::{parse_args, Comment, Expr, IdAttr, Ident, Parameter, Precedence, SpecialExpr};

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Comment(Comment),
    /// `? a, b`
    Print {
        args: Vec<Expr>,
    },
    If {
        condition: Expr,
        then: Vec<Stmt>,
        otherwise: Option<Vec<Stmt>>,
    },
    Case {
        clauses: Vec<CaseClause>,
        otherwise: Option<Vec<Stmt>>,
    },
    For {
        variable: IdAttr,
        start: Expr,
        stop: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    ForEach {
        variable: IdAttr,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    Exit,
    Loop,
    Declare {
        scope: DeclScope,
        names: Vec<Parameter>,
    },
    /// `DIMENSION a(rows [, columns])`
    Dimension {
        name: Ident,
        dimensions: Vec<Expr>,
    },
    /// `STORE value TO a, b`
    Store {
        value: Expr,
        targets: Vec<IdAttr>,
    },
    Assign {
        target: IdAttr,
        value: Expr,
    },
    Return {
        value: Option<Expr>,
    },
    Directory {
        action: DirectoryAction,
        path: SpecialExpr,
    },
    DeleteFile {
        path: Option<SpecialExpr>,
        recycle: bool,
    },
    Quit,
    Clear(ClearTarget),
    OnError {
        handler: Option<Box<Stmt>>,
    },
    Release(ReleaseTarget),
    Wait(WaitClauses),
    CreateTable {
        kind: TableKind,
        name: SpecialExpr,
        free: bool,
        fields: Vec<FieldDef>,
    },
    Select {
        table: SpecialExpr,
    },
    Go {
        record: GoRecord,
        area: Option<IdAttr>,
    },
    Use {
        table: Option<SpecialExpr>,
        area: Option<Expr>,
        shared: bool,
        exclusive: bool,
    },
    Append {
        blank: bool,
        table: Option<IdAttr>,
    },
    Replace {
        field: IdAttr,
        value: Expr,
        scope: Option<ReplaceScope>,
    },
    ReportForm {
        form: SpecialExpr,
    },
    Set {
        setting: Ident,
        args: Vec<SetArg>,
    },
    /// `DO proc [IN file] [WITH args]`
    Do {
        target: IdAttr,
        library: Option<SpecialExpr>,
        args: Vec<Expr>,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseClause {
    Comment(Comment),
    Case { condition: Expr, body: Vec<Stmt> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclScope {
    Public,
    Private,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryAction {
    Make,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClearTarget {
    Screen,
    All,
    Dlls(Vec<Expr>),
    Macros,
    Events,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseTarget {
    All,
    Names(Vec<Ident>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaitClauses {
    pub message: Option<Expr>,
    pub to: Option<Expr>,
    /// `WINDOW`, with optional `AT row, column`.
    pub window: Option<Option<(Expr, Expr)>>,
    pub nowait: bool,
    pub clear: bool,
    pub noclear: bool,
    pub timeout: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Table,
    Dbf,
}

/// Column of `CREATE TABLE`: name, type letter and optional width and precision.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: Ident,
    pub ty: Ident,
    pub size: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GoRecord {
    Top,
    Bottom,
    Record(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplaceScope {
    All,
    Rest,
    Next(Expr),
    Record(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetArg {
    Keyword(Ident),
    Value(SpecialExpr),
}

const SET_KEYWORDS: &[&str] = &[
    "on", "off", "to", "prompt", "additive", "default", "name",
];

/// Keywords closing a block. Seeing one where a statement should start means the block it closes
/// was never opened.
const BLOCK_ENDS: &[&str] = &[
    "else",
    "endif",
    "case",
    "otherwise",
    "endcase",
    "enddo",
    "endfor",
    "next",
    "endproc",
    "endfunc",
    "enddefine",
];

impl Spanned for Stmt {
    fn span(&self) -> Span {
        self.span
    }
}

/// Parses statements and comments up to one of `terminators`, which is left in the stream.
/// The last terminator names the keyword reported when the input ends early.
pub fn parse_lines(
    parser: &mut Parser<'_>,
    terminators: &[&str],
    allow_end_of_file: bool,
) -> ParseResult<Vec<Stmt>> {
    let mut lines = vec![];
    loop {
        if let Some(comment) = parser.comment() {
            lines.push(Stmt::comment(comment));
            continue;
        }
        if parser.eat(TokenKind::NewLine).is_some() {
            continue;
        }
        if parser.peek_any_keyword(terminators) {
            break;
        }
        let token = parser.peek_token();
        if token.kind == TokenKind::EndOfFile {
            if allow_end_of_file {
                break;
            }
            let expected = terminators.last().copied().unwrap_or_default();
            return parser.bail(
                token,
                format!("`{}` expected", expected.to_ascii_uppercase()),
                "the file ends before the block is closed",
            );
        }
        lines.push(Stmt::parse(parser)?);
        parser.expect_end_of_statement()?;
    }
    Ok(lines)
}

impl Stmt {
    pub fn comment(comment: Comment) -> Self {
        Stmt {
            span: comment.span,
            kind: StmtKind::Comment(comment),
        }
    }

    /// Parses one statement, leaving the line break after it in the stream.
    pub fn parse(parser: &mut Parser<'_>) -> ParseResult<Self> {
        let first = parser.peek_token();
        let start = parser.span(first);
        let kind = Self::parse_kind(parser)?;
        Ok(Stmt {
            kind,
            span: start.join(&parser.previous_span()),
        })
    }

    fn parse_kind(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        let token = parser.peek_token();
        match token.kind {
            TokenKind::Question => {
                parser.next_token();
                let args = if parser.at_end_of_statement() {
                    vec![]
                } else {
                    parse_args(parser)?
                };
                return Ok(StmtKind::Print { args });
            }
            // `= expr` evaluates an expression and discards the result.
            TokenKind::Assign => {
                parser.next_token();
                return Ok(StmtKind::Expr(Expr::parse(parser)?));
            }
            TokenKind::Ident => (),
            _ => return Ok(StmtKind::Expr(Expr::parse(parser)?)),
        }

        let keyword = parser.text(token).to_ascii_lowercase();
        if BLOCK_ENDS.contains(&keyword.as_str()) {
            return parser.bail(
                token,
                format!(
                    "`{}` without a matching opening statement",
                    keyword.to_ascii_uppercase()
                ),
                "nothing to close here",
            );
        }

        match keyword.as_str() {
            "if" => Self::parse_if(parser),
            "do" => Self::parse_do(parser),
            "for" => Self::parse_for(parser),
            "exit" => {
                parser.next_token();
                Ok(StmtKind::Exit)
            }
            "loop" => {
                parser.next_token();
                Ok(StmtKind::Loop)
            }
            "public" | "private" | "local" => {
                parser.next_token();
                let scope = match keyword.as_str() {
                    "public" => DeclScope::Public,
                    "private" => DeclScope::Private,
                    _ => DeclScope::Local,
                };
                Ok(StmtKind::Declare {
                    scope,
                    names: Parameter::parse_list(parser)?,
                })
            }
            "dimension" | "declare" => Self::parse_dimension(parser),
            "store" => {
                parser.next_token();
                let value = Expr::parse(parser)?;
                parser.expect_keyword("to")?;
                let mut targets = vec![IdAttr::parse(parser)?];
                while parser.eat(TokenKind::Comma).is_some() {
                    targets.push(IdAttr::parse(parser)?);
                }
                Ok(StmtKind::Store { value, targets })
            }
            "return" => {
                parser.next_token();
                let value = if parser.at_end_of_statement() {
                    None
                } else {
                    Some(Expr::parse(parser)?)
                };
                Ok(StmtKind::Return { value })
            }
            "md" | "mkdir" | "rd" | "rmdir" => {
                parser.next_token();
                let action = if keyword.starts_with('m') {
                    DirectoryAction::Make
                } else {
                    DirectoryAction::Remove
                };
                Ok(StmtKind::Directory {
                    action,
                    path: SpecialExpr::parse(parser)?,
                })
            }
            "delete" => {
                parser.next_token();
                parser.expect_keyword("file")?;
                let path = if parser.at_end_of_statement() || parser.peek_keyword("recycle") {
                    None
                } else {
                    Some(SpecialExpr::parse(parser)?)
                };
                let recycle = parser.eat_keyword("recycle").is_some();
                Ok(StmtKind::DeleteFile { path, recycle })
            }
            "quit" => {
                parser.next_token();
                Ok(StmtKind::Quit)
            }
            "clear" => Self::parse_clear(parser),
            "on" => {
                parser.next_token();
                parser.expect_keyword("error")?;
                let handler = if parser.at_end_of_statement() {
                    None
                } else {
                    Some(Box::new(Stmt::parse(parser)?))
                };
                Ok(StmtKind::OnError { handler })
            }
            "release" => {
                parser.next_token();
                if parser.eat_keyword("all").is_some() {
                    return Ok(StmtKind::Release(ReleaseTarget::All));
                }
                let mut names = vec![parser.ident()?];
                while parser.eat(TokenKind::Comma).is_some() {
                    names.push(parser.ident()?);
                }
                Ok(StmtKind::Release(ReleaseTarget::Names(names)))
            }
            "wait" => Self::parse_wait(parser),
            "create" => Self::parse_create_table(parser),
            "select" => {
                parser.next_token();
                Ok(StmtKind::Select {
                    table: SpecialExpr::parse(parser)?,
                })
            }
            "go" | "goto" => Self::parse_go(parser),
            "use" => Self::parse_use(parser),
            "append" => Self::parse_append(parser),
            "replace" => Self::parse_replace(parser),
            "report" => {
                parser.next_token();
                parser.expect_keyword("form")?;
                Ok(StmtKind::ReportForm {
                    form: SpecialExpr::parse(parser)?,
                })
            }
            "set" => {
                parser.next_token();
                let setting = parser.ident()?;
                let mut args = vec![];
                while !parser.at_end_of_statement() {
                    if let Some(keyword) = parser.eat_any_keyword(SET_KEYWORDS) {
                        args.push(SetArg::Keyword(Ident::from_token(parser.token(keyword))));
                    } else {
                        args.push(SetArg::Value(SpecialExpr::parse(parser)?));
                    }
                }
                Ok(StmtKind::Set { setting, args })
            }
            _ => Self::parse_assign_or_expr(parser),
        }
    }

    fn parse_assign_or_expr(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        let target = IdAttr::parse(parser)?;
        if parser.eat(TokenKind::Assign).is_some() {
            let value = Expr::parse(parser)?;
            Ok(StmtKind::Assign { target, value })
        } else {
            let expr = Expr::continue_parse(parser, Expr::IdAttr(target), Precedence::EXPR)?;
            Ok(StmtKind::Expr(expr))
        }
    }

    fn parse_if(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.expect_keyword("if")?;
        let condition = Expr::parse(parser)?;
        parser.eat_keyword("then");
        parser.expect_end_of_statement()?;
        let then = parse_lines(parser, &["else", "endif"], false)?;
        let otherwise = if parser.eat_keyword("else").is_some() {
            parser.expect_end_of_statement()?;
            Some(parse_lines(parser, &["endif"], false)?)
        } else {
            None
        };
        parser.expect_keyword("endif")?;
        Ok(StmtKind::If {
            condition,
            then,
            otherwise,
        })
    }

    fn parse_do(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.expect_keyword("do")?;
        if parser.eat_keyword("case").is_some() {
            return Self::parse_case(parser);
        }
        if parser.eat_keyword("while").is_some() {
            let condition = Expr::parse(parser)?;
            parser.expect_end_of_statement()?;
            let body = parse_lines(parser, &["enddo"], false)?;
            parser.expect_keyword("enddo")?;
            return Ok(StmtKind::While { condition, body });
        }

        let target = IdAttr::parse(parser)?;
        let library = match parser.eat_keyword("in") {
            Some(_) => Some(SpecialExpr::parse(parser)?),
            None => None,
        };
        let args = match parser.eat_keyword("with") {
            Some(_) => parse_args(parser)?,
            None => vec![],
        };
        Ok(StmtKind::Do {
            target,
            library,
            args,
        })
    }

    fn parse_case(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.expect_end_of_statement()?;
        let mut clauses = vec![];
        let mut otherwise = None;
        loop {
            if let Some(comment) = parser.comment() {
                clauses.push(CaseClause::Comment(comment));
                continue;
            }
            if parser.eat(TokenKind::NewLine).is_some() {
                continue;
            }
            if parser.eat_keyword("case").is_some() {
                let condition = Expr::parse(parser)?;
                parser.expect_end_of_statement()?;
                let body = parse_lines(parser, &["case", "otherwise", "endcase"], false)?;
                clauses.push(CaseClause::Case { condition, body });
            } else if parser.eat_keyword("otherwise").is_some() {
                parser.expect_end_of_statement()?;
                otherwise = Some(parse_lines(parser, &["endcase"], false)?);
                parser.expect_keyword("endcase")?;
                break;
            } else if parser.eat_keyword("endcase").is_some() {
                break;
            } else {
                let token = parser.peek_token();
                return parser.bail(
                    token,
                    "`CASE`, `OTHERWISE` or `ENDCASE` expected",
                    format!("found {} inside `DO CASE`", parser.describe(token)),
                );
            }
        }
        Ok(StmtKind::Case { clauses, otherwise })
    }

    fn parse_for(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.expect_keyword("for")?;
        let kind = if parser.eat_keyword("each").is_some() {
            let variable = IdAttr::parse(parser)?;
            parser.expect_keyword("in")?;
            let iterable = Expr::parse(parser)?;
            parser.expect_end_of_statement()?;
            StmtKind::ForEach {
                variable,
                iterable,
                body: parse_lines(parser, &["endfor", "next"], false)?,
            }
        } else {
            let variable = IdAttr::parse(parser)?;
            parser.expect(TokenKind::Assign)?;
            let start = Expr::parse(parser)?;
            parser.expect_keyword("to")?;
            let stop = Expr::parse(parser)?;
            let step = match parser.eat_keyword("step") {
                Some(_) => Some(Expr::parse(parser)?),
                None => None,
            };
            parser.expect_end_of_statement()?;
            StmtKind::For {
                variable,
                start,
                stop,
                step,
                body: parse_lines(parser, &["endfor", "next"], false)?,
            }
        };
        parser.next_token();
        if parser.peek_token().kind == TokenKind::Ident {
            parser.next_token();
        }
        Ok(kind)
    }

    fn parse_dimension(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.next_token();
        let name = parser.ident()?;
        let close = if parser.eat(TokenKind::LeftBracket).is_some() {
            TokenKind::RightBracket
        } else {
            parser.expect(TokenKind::LeftParen)?;
            TokenKind::RightParen
        };
        let mut dimensions = vec![Expr::parse(parser)?];
        if parser.eat(TokenKind::Comma).is_some() {
            dimensions.push(Expr::parse(parser)?);
        }
        parser.expect(close)?;
        Ok(StmtKind::Dimension { name, dimensions })
    }

    fn parse_clear(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.expect_keyword("clear")?;
        let target = if parser.eat_keyword("all").is_some() {
            ClearTarget::All
        } else if parser.eat_keyword("dlls").is_some() {
            if parser.at_end_of_statement() {
                ClearTarget::Dlls(vec![])
            } else {
                ClearTarget::Dlls(parse_args(parser)?)
            }
        } else if parser.eat_keyword("macros").is_some() {
            ClearTarget::Macros
        } else if parser.eat_keyword("events").is_some() {
            ClearTarget::Events
        } else {
            ClearTarget::Screen
        };
        Ok(StmtKind::Clear(target))
    }

    fn parse_wait(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.expect_keyword("wait")?;
        let mut clauses = WaitClauses::default();
        while !parser.at_end_of_statement() {
            if parser.eat_keyword("to").is_some() {
                clauses.to = Some(Expr::parse(parser)?);
            } else if parser.eat_keyword("window").is_some() {
                clauses.window = Some(if parser.eat_keyword("at").is_some() {
                    let row = Expr::parse(parser)?;
                    parser.expect(TokenKind::Comma)?;
                    Some((row, Expr::parse(parser)?))
                } else {
                    None
                });
            } else if parser.eat_keyword("nowait").is_some() {
                clauses.nowait = true;
            } else if parser.eat_keyword("clear").is_some() {
                clauses.clear = true;
            } else if parser.eat_keyword("noclear").is_some() {
                clauses.noclear = true;
            } else if parser.eat_keyword("timeout").is_some() {
                clauses.timeout = Some(Expr::parse(parser)?);
            } else {
                clauses.message = Some(Expr::parse(parser)?);
            }
        }
        Ok(StmtKind::Wait(clauses))
    }

    fn parse_create_table(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.expect_keyword("create")?;
        let kind = if parser.eat_keyword("table").is_some() {
            TableKind::Table
        } else {
            parser.expect_keyword("dbf")?;
            TableKind::Dbf
        };
        let name = SpecialExpr::parse(parser)?;
        let free = parser.eat_keyword("free").is_some();

        parser.expect(TokenKind::LeftParen)?;
        let mut fields = vec![];
        loop {
            let name = parser.ident()?;
            let ty = parser.ident()?;
            let mut size = vec![];
            if parser.eat(TokenKind::LeftParen).is_some() {
                size.push(Expr::parse(parser)?);
                if parser.eat(TokenKind::Comma).is_some() {
                    size.push(Expr::parse(parser)?);
                }
                parser.expect(TokenKind::RightParen)?;
            }
            fields.push(FieldDef { name, ty, size });
            if parser.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        parser.expect(TokenKind::RightParen)?;

        Ok(StmtKind::CreateTable {
            kind,
            name,
            free,
            fields,
        })
    }

    fn parse_go(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.next_token();
        let record = if parser.eat_keyword("top").is_some() {
            GoRecord::Top
        } else if parser.eat_keyword("bottom").is_some() {
            GoRecord::Bottom
        } else {
            parser.eat_keyword("record");
            GoRecord::Record(Expr::parse(parser)?)
        };
        let area = match parser.eat_keyword("in") {
            Some(_) => Some(IdAttr::parse(parser)?),
            None => None,
        };
        Ok(StmtKind::Go { record, area })
    }

    fn parse_use(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        const OPTIONS: &[&str] = &["in", "shared", "excl", "exclusive"];

        parser.expect_keyword("use")?;
        let table = if parser.at_end_of_statement() || parser.peek_any_keyword(OPTIONS) {
            None
        } else {
            Some(SpecialExpr::parse(parser)?)
        };
        let (mut area, mut shared, mut exclusive) = (None, false, false);
        while !parser.at_end_of_statement() {
            if parser.eat_keyword("in").is_some() {
                area = Some(Expr::parse(parser)?);
            } else if parser.eat_keyword("shared").is_some() {
                shared = true;
            } else if parser.eat_any_keyword(&["excl", "exclusive"]).is_some() {
                exclusive = true;
            } else {
                let token = parser.peek_token();
                return parser.bail(
                    token,
                    "`IN`, `SHARED` or `EXCLUSIVE` expected",
                    format!("found {} in `USE`", parser.describe(token)),
                );
            }
        }
        Ok(StmtKind::Use {
            table,
            area,
            shared,
            exclusive,
        })
    }

    fn parse_append(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.expect_keyword("append")?;
        if parser.peek_keyword("from") {
            let token = parser.peek_token();
            return parser.bail(
                token,
                "`APPEND FROM` is not supported",
                "importing records from a file cannot be translated",
            );
        }
        let blank = parser.eat_keyword("blank").is_some();
        let table = match parser.eat_keyword("in") {
            Some(_) => Some(IdAttr::parse(parser)?),
            None => None,
        };
        Ok(StmtKind::Append { blank, table })
    }

    fn parse_replace(parser: &mut Parser<'_>) -> ParseResult<StmtKind> {
        parser.expect_keyword("replace")?;
        let field = IdAttr::parse(parser)?;
        parser.expect_keyword("with")?;
        let value = Expr::parse(parser)?;
        let scope = if parser.eat_keyword("all").is_some() {
            Some(ReplaceScope::All)
        } else if parser.eat_keyword("rest").is_some() {
            Some(ReplaceScope::Rest)
        } else if parser.eat_keyword("next").is_some() {
            Some(ReplaceScope::Next(Expr::parse(parser)?))
        } else if parser.eat_keyword("record").is_some() {
            Some(ReplaceScope::Record(Expr::parse(parser)?))
        } else {
            None
        };
        Ok(StmtKind::Replace {
            field,
            value,
            scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use foxlift_foundation::source::{SourceFile, SourceFileSet};
    use foxlift_lexer::Lexer;
    use indoc::indoc;

    use crate::{cst::*, parse_program};

    fn parse(input: &str) -> Result<Program, foxlift_foundation::errors::Diagnostic> {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), input.into()));
        let tokens = Lexer::new(file, input).lex()?;
        parse_program(file, tokens)
    }

    fn kinds(program: &Program) -> Vec<&StmtKind> {
        program.lines.iter().map(|stmt| &stmt.kind).collect()
    }

    #[test]
    fn assignment_and_expression_statements() {
        let program = parse(indoc! {"
            x = 1 + 2
            obj.show()
        "})
        .unwrap();
        let kinds = kinds(&program);
        assert!(matches!(kinds[0], StmtKind::Assign { .. }));
        assert!(matches!(kinds[1], StmtKind::Expr(Expr::IdAttr(_))));
    }

    #[test]
    fn comments_are_kept_as_lines() {
        let program = parse(indoc! {"
            * first

            x = 1 && trailing
              * second
        "})
        .unwrap();
        let kinds = kinds(&program);
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], StmtKind::Comment(c) if c.text == "* first\n"));
        assert!(matches!(kinds[2], StmtKind::Comment(_)));
    }

    #[test]
    fn if_else() {
        let program = parse(indoc! {"
            IF x > 1 THEN
                ? 'big'
            ELSE
                ? 'small'
            ENDIF
        "})
        .unwrap();
        let StmtKind::If { then, otherwise, .. } = &program.lines[0].kind else {
            panic!("expected IF, got {:?}", program.lines[0]);
        };
        assert_eq!(then.len(), 1);
        assert_eq!(otherwise.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn do_case_with_comment_clause() {
        let program = parse(indoc! {"
            DO CASE
            * about the cases
            CASE a = 1
                b = 2
            OTHERWISE
                b = 3
            ENDCASE
        "})
        .unwrap();
        let StmtKind::Case { clauses, otherwise } = &program.lines[0].kind else {
            panic!("expected DO CASE");
        };
        assert!(matches!(clauses[0], CaseClause::Comment(_)));
        assert!(matches!(clauses[1], CaseClause::Case { .. }));
        assert!(otherwise.is_some());
    }

    #[test]
    fn for_loop_with_step() {
        let program = parse("FOR i = 1 TO 10 STEP 2\n  ? i\nENDFOR\n").unwrap();
        let StmtKind::For { step, body, .. } = &program.lines[0].kind else {
            panic!("expected FOR");
        };
        assert!(step.is_some());
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn precedence_of_operators() {
        let program = parse("x = a + b * c = d .AND. e\n").unwrap();
        let StmtKind::Assign { value, .. } = &program.lines[0].kind else {
            panic!("expected assignment");
        };
        let Expr::Binary {
            operator: BinaryOp::And,
            left,
            ..
        } = value
        else {
            panic!("AND should bind loosest: {value:?}");
        };
        let Expr::Binary {
            operator: BinaryOp::Assign,
            left,
            ..
        } = &**left
        else {
            panic!("comparison should bind looser than arithmetic");
        };
        assert!(matches!(
            &**left,
            Expr::Binary {
                operator: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn functions_and_classes() {
        let program = parse(indoc! {"
            DEFINE CLASS myform AS form
                Caption = 'Hello'
                ADD OBJECT btn AS commandbutton WITH Caption = 'OK', Left = 10
                PROCEDURE btn.Click
                    ? 'clicked'
                ENDPROC
            ENDDEFINE

            PROCEDURE main
            LPARAMETERS a, b AS Integer
                RETURN a
            ENDPROC

            FUNCTION other(c)
                RETURN c
        "})
        .unwrap();
        assert!(program.lines.is_empty());
        assert_eq!(program.classes.len(), 1);
        let class = &program.classes[0];
        assert_eq!(class.stmts.len(), 3);
        let ClassStmt::AddObject { properties, .. } = &class.stmts[1] else {
            panic!("expected ADD OBJECT");
        };
        assert_eq!(properties.len(), 2);
        let ClassStmt::Method(method) = &class.stmts[2] else {
            panic!("expected a method");
        };
        assert!(method.is_dotted());

        assert_eq!(program.functions.len(), 2);
        assert_eq!(program.functions[0].parameters.len(), 2);
        assert_eq!(program.functions[1].parameters[0].name.text, "c");
    }

    #[test]
    fn path_operands() {
        let program = parse("USE data\\customers.dbf IN 2 SHARED\n").unwrap();
        let StmtKind::Use {
            table: Some(SpecialExpr::Path { text, .. }),
            area: Some(_),
            shared: true,
            exclusive: false,
        } = &program.lines[0].kind
        else {
            panic!("unexpected {:?}", program.lines[0].kind);
        };
        assert_eq!(text, "data\\customers.dbf");
    }

    #[test]
    fn wait_clauses() {
        let program = parse("WAIT WINDOW AT 1, 2 'Working' NOWAIT TIMEOUT 5\n").unwrap();
        let StmtKind::Wait(clauses) = &program.lines[0].kind else {
            panic!("expected WAIT");
        };
        assert!(matches!(clauses.window, Some(Some(_))));
        assert!(clauses.nowait);
        assert!(clauses.message.is_some());
        assert!(clauses.timeout.is_some());
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let error = parse("IF x\n  y = 1\n").unwrap_err();
        assert_eq!(error.message, "`ENDIF` expected");
    }

    #[test]
    fn stray_block_end_is_an_error() {
        let error = parse("ENDDO\n").unwrap_err();
        assert_eq!(error.message, "`ENDDO` without a matching opening statement");
    }

    #[test]
    fn unexpected_token_is_an_error() {
        let error = parse("x = )\n").unwrap_err();
        assert_eq!(error.message, "expression expected");
    }
}
