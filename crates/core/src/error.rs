use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error: expected {expected}, found {found}")]
    Syntax { expected: String, found: String },
}

impl ParseError {
    pub fn syntax(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ParseError::Syntax {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
