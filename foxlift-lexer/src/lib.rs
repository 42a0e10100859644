//! Tokens of FoxPro source text and the channel-aware stream both parsers walk over.

pub mod lexer;
pub mod token;
pub mod token_stream;

pub use lexer::Lexer;
