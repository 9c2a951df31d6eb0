//! Command-language front end for the kbctl administrative client:
//! tokenizer, recursive-descent parser and the typed command model the
//! execution layer consumes.

mod command;
mod error;
mod lexer;
mod parser;
mod token;

pub use command::{Command, CommandKind, Statement, Value};
pub use error::{ParseError, Result};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{lookup_keyword, Token, TokenKind};
