//! Preprocessor that sits between the lexer and the parser.
//!
//! It handles `#DEFINE`, `#UNDEF`, `#INCLUDE`, `#IF`, `#IFDEF` and `#IFNDEF`, and rewrites comments
//! into plain `*` line comments. The output is a flat token list whose concatenated text is the
//! program the main parser sees.
//!
//! Macro substitution is a single pass: the tokens a macro expands to are never searched for
//! further macro names.

mod comments;
pub mod directive;
pub mod loader;

use std::{collections::HashMap, ops::Range, rc::Rc};

use foxlift_codegen::value::Value;
use foxlift_foundation::{
    errors::{Diagnostic, Label},
    ident::CaseInsensitive,
    source::{SourceFile, SourceFileId, SourceFileSet, Span},
};
use foxlift_lexer::{
    token::{Token, TokenId, TokenKind},
    token_stream::MultichannelTokenStream,
    Lexer,
};
use foxlift_syntax::{
    cst::{Ident, SpecialExpr},
    Parser,
};
use indoc::indoc;
use tracing::{info_span, trace};

use directive::{Condition, Directive, PreprocessorCode};
use loader::IncludeLoader;

/// Includes nested deeper than this are assumed to be cyclic.
const MAX_INCLUDE_DEPTH: usize = 64;

/// A map of definitions. These may be constructed externally, to provide the preprocessor with
/// symbols such as `DEBUG`.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub map: HashMap<CaseInsensitive<String>, Definition>,
}

/// A single preprocessor definition.
#[derive(Debug, Clone)]
pub struct Definition {
    /// Tokens the name is replaced with, blanks before the first one removed.
    pub body: Vec<Token>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, body: Vec<Token>) {
        let body = body
            .into_iter()
            .skip_while(|token| token.kind == TokenKind::Space)
            .collect();
        self.map
            .insert(CaseInsensitive::new(name.to_owned()), Definition { body });
    }

    /// Defines `name` as the tokens of `text`, as if written after `#DEFINE name`.
    pub fn define_text(
        &mut self,
        files: &mut SourceFileSet,
        name: &str,
        text: &str,
    ) -> Result<(), Diagnostic> {
        let file = files.add(SourceFile::new(
            format!("<definition of {name}>"),
            text.into(),
        ));
        let mut tokens = Lexer::new(file, text).lex()?;
        tokens.pop();
        self.define(name, tokens);
        Ok(())
    }

    pub fn undefine(&mut self, name: &str) -> Option<Definition> {
        self.map.remove(CaseInsensitive::new_ref(name))
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.map.get(CaseInsensitive::new_ref(name))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.map.contains_key(CaseInsensitive::new_ref(name))
    }
}

/// The tokens of the file being preprocessed.
struct Unit<'s> {
    file: SourceFileId,
    stream: &'s MultichannelTokenStream,
}

impl Unit<'_> {
    fn tokens(&self, range: Range<TokenId>) -> &[Token] {
        &self.stream.tokens()[range]
    }
}

pub struct Preprocessor<'a> {
    pub definitions: &'a mut Definitions,
    files: &'a mut SourceFileSet,
    loader: &'a dyn IncludeLoader,
    depth: usize,
}

impl<'a> Preprocessor<'a> {
    pub fn new(
        definitions: &'a mut Definitions,
        files: &'a mut SourceFileSet,
        loader: &'a dyn IncludeLoader,
    ) -> Self {
        Self {
            definitions,
            files,
            loader,
            depth: 0,
        }
    }

    /// Preprocesses a file already registered in the file set, including the files it includes.
    pub fn preprocess(&mut self, file: SourceFileId) -> Result<Vec<Token>, Diagnostic> {
        let source = Rc::clone(&self.files.get(file).source);
        let _span = info_span!("preprocess", file = %self.files.get(file).filename).entered();

        let mut stream = MultichannelTokenStream::new(Lexer::new(file, &source).lex()?);
        let code = {
            let mut parser = Parser::new(file, &mut stream);
            PreprocessorCode::parse(&mut parser)?
        };

        let unit = Unit {
            file,
            stream: &stream,
        };
        let mut out = vec![];
        self.process(&unit, &code, &mut out)?;

        // Comments after the last line. When that line has no line break of its own, they are
        // part of it already.
        let tokens = stream.tokens();
        let trailing = stream.hidden_tokens_to_left(tokens.len() - 1);
        if trailing.start == 0 || tokens[trailing.start - 1].kind == TokenKind::NewLine {
            self.emit(&tokens[trailing], &mut out);
        }
        Ok(out)
    }

    fn process(
        &mut self,
        unit: &Unit<'_>,
        code: &PreprocessorCode,
        out: &mut Vec<Token>,
    ) -> Result<(), Diagnostic> {
        for directive in &code.0 {
            match directive {
                Directive::Define { name, body } => {
                    trace!(name = %name.text, "macro defined");
                    self.definitions
                        .define(&name.text, unit.tokens(body.clone()).to_vec());
                }
                Directive::Undefine { name } => self.undefine(unit, name)?,
                Directive::Include { path, span } => {
                    let path = self.include_path(unit, path.clone(), *span)?;
                    self.include(unit.file, *span, &path, out)?;
                }
                Directive::If {
                    condition,
                    then,
                    otherwise,
                } => {
                    let taken = match condition {
                        Condition::Expr { tokens, span } => {
                            self.condition(unit, tokens.clone(), *span)?
                        }
                        Condition::Defined(name) => self.definitions.is_defined(&name.text),
                        Condition::NotDefined(name) => !self.definitions.is_defined(&name.text),
                    };
                    trace!(?condition, taken, "conditional evaluated");
                    if taken {
                        self.process(unit, then, out)?;
                    } else if let Some(otherwise) = otherwise {
                        self.process(unit, otherwise, out)?;
                    }
                }
                Directive::Line(range) => {
                    let hidden = unit.stream.hidden_tokens_to_left(range.start);
                    let tokens: Vec<_> = unit
                        .tokens(hidden)
                        .iter()
                        .chain(unit.tokens(range.clone()))
                        .cloned()
                        .collect();
                    self.emit(&tokens, out);
                }
            }
        }
        Ok(())
    }

    /// The tokens a macro name expands to.
    fn expansion(&self, token: &Token) -> Option<&[Token]> {
        if token.kind != TokenKind::Ident {
            return None;
        }
        self.definitions
            .get(&token.text)
            .map(|definition| definition.body.as_slice())
    }

    /// Emits one line: macros are substituted and comments normalized. Comments after code on
    /// the line move in front of it.
    fn emit(&self, tokens: &[Token], out: &mut Vec<Token>) {
        let mut comments = vec![];
        let mut line = vec![];
        for token in tokens {
            if let Some(body) = self.expansion(token) {
                line.extend(body.iter().cloned());
                continue;
            }
            let mut token = token.clone();
            match token.kind {
                TokenKind::InlineComment => {
                    token.text = comments::inline_comment(&token.text);
                    comments.push(token);
                }
                TokenKind::LineComment => {
                    token.text = comments::line_comment(&token.text);
                    line.push(token);
                }
                _ => line.push(token),
            }
        }
        out.extend(comments);
        out.extend(line);
    }

    fn undefine(&mut self, unit: &Unit<'_>, name: &Ident) -> Result<(), Diagnostic> {
        const NOTE: &str = indoc! {"
            note: `#UNDEF` can only remove a name defined earlier, like:
                      #DEFINE EXAMPLE 1
                      #UNDEF EXAMPLE
        "};

        trace!(name = %name.text, "macro undefined");
        match self.definitions.undefine(&name.text) {
            Some(_) => Ok(()),
            None => Err(Diagnostic::error(
                unit.file,
                format!("`{}` is not defined", name.text),
            )
            .with_label(Label::primary(name, "no macro of this name exists here"))
            .with_note(NOTE)),
        }
    }

    /// Substitutes macros in the tokens of a directive argument, then parses them on their own.
    fn argument_parser_input(&self, unit: &Unit<'_>, range: Range<TokenId>) -> Vec<Token> {
        let mut tokens = vec![];
        for token in unit.tokens(range.clone()) {
            match self.expansion(token) {
                Some(body) => tokens.extend(body.iter().cloned()),
                None => tokens.push(token.clone()),
            }
        }
        let end = unit.stream.token(range.end).span.start;
        tokens.push(Token::end_of_file(unit.file, end));
        tokens
    }

    fn condition(
        &self,
        unit: &Unit<'_>,
        range: Range<TokenId>,
        span: Span,
    ) -> Result<bool, Diagnostic> {
        let tokens = self.argument_parser_input(unit, range);
        let expr = foxlift_syntax::parse_expr(unit.file, tokens)?;
        let value = foxlift_codegen::evaluate_expression(unit.file, &expr)?;
        value.truthiness().ok_or_else(|| {
            Diagnostic::error(unit.file, "`#IF` condition is not a constant").with_label(
                Label::primary(
                    &span,
                    format!("this can only be evaluated at run time, as `{value}`"),
                ),
            )
        })
    }

    fn include_path(
        &self,
        unit: &Unit<'_>,
        range: Range<TokenId>,
        span: Span,
    ) -> Result<String, Diagnostic> {
        let mut stream = MultichannelTokenStream::new(self.argument_parser_input(unit, range));
        let mut parser = Parser::new(unit.file, &mut stream);
        let path = SpecialExpr::parse(&mut parser)?;
        parser.expect_end_of_input()?;

        match path {
            SpecialExpr::Path { text, .. } => Ok(text),
            SpecialExpr::Expr(expr) => {
                let value = foxlift_codegen::lower_expression(unit.file, &expr)?;
                value
                    .as_text()
                    .map(str::to_owned)
                    .ok_or_else(|| not_a_file_name(unit.file, span, &value))
            }
        }
    }

    fn include(
        &mut self,
        from: SourceFileId,
        span: Span,
        path: &str,
        out: &mut Vec<Token>,
    ) -> Result<(), Diagnostic> {
        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(Diagnostic::error(from, "`#INCLUDE` nested too deeply")
                .with_label(Label::primary(&span, "this include is part of a cycle"))
                .with_note(format!(
                    "note: includes may be nested at most {MAX_INCLUDE_DEPTH} levels deep"
                )));
        }

        let including = self.files.get(from).filename.clone();
        let loaded = self
            .loader
            .load(&including, path)
            .map_err(|error| Diagnostic::io(from, span, path, error))?;
        trace!(path, filename = %loaded.filename, "including file");
        let file = self
            .files
            .add(SourceFile::new(loaded.filename, loaded.source.into()));

        self.depth += 1;
        let tokens = self.preprocess(file);
        self.depth -= 1;
        out.extend(tokens?);
        Ok(())
    }
}

fn not_a_file_name(file: SourceFileId, span: Span, value: &Value) -> Diagnostic {
    Diagnostic::error(file, "`#INCLUDE` file name is not a constant string")
        .with_label(Label::primary(&span, format!("this evaluates to `{value}`")))
}

/// Preprocesses `file` with a fresh copy of `definitions`, returning the expanded tokens and the
/// definitions in effect at the end of the file.
pub fn preprocess(
    files: &mut SourceFileSet,
    loader: &dyn IncludeLoader,
    file: SourceFileId,
    definitions: &Definitions,
) -> Result<(Vec<Token>, Definitions), Diagnostic> {
    let mut definitions = definitions.clone();
    let tokens = Preprocessor::new(&mut definitions, files, loader).preprocess(file)?;
    Ok((tokens, definitions))
}

/// Concatenates preprocessed tokens into the text the main parser runs over.
pub fn tokens_to_source(tokens: &[Token]) -> String {
    tokens
        .iter()
        .flat_map(|token| token.text.chars())
        .filter(|&c| c != '\r')
        .collect()
}
