//! Concrete syntax tree for FoxPro programs and the parser producing it.
//!
//! The parser is strict: the first token it cannot make sense of ends parsing with a
//! [`Diagnostic`]. There is no recovery.

pub mod cst;
mod parsing;

use foxlift_foundation::{errors::Diagnostic, source::SourceFileId};
use foxlift_lexer::{token::Token, token_stream::MultichannelTokenStream};
use tracing::info_span;

pub use parsing::*;

/// Parses a whole program from lexed tokens.
pub fn parse_program(file: SourceFileId, tokens: Vec<Token>) -> Result<cst::Program, Diagnostic> {
    let _span = info_span!("parse").entered();
    let mut stream = MultichannelTokenStream::new(tokens);
    let mut parser = Parser::new(file, &mut stream);
    cst::Program::parse(&mut parser)
}

/// Parses a single expression followed by the end of input.
pub fn parse_expr(file: SourceFileId, tokens: Vec<Token>) -> Result<cst::Expr, Diagnostic> {
    let mut stream = MultichannelTokenStream::new(tokens);
    let mut parser = Parser::new(file, &mut stream);
    let expr = cst::Expr::parse(&mut parser)?;
    parser.expect_end_of_input()?;
    Ok(expr)
}
