use crate::token::{lookup_keyword, Token, TokenKind};

/// Byte-oriented lexer over a single input line.
///
/// The lexer never fails: bytes that match no rule become `Illegal` tokens
/// and the stream always terminates with `Eof`. Unterminated quoted strings
/// run to end of input rather than erroring, matching the interactive
/// client's lenient behavior.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            pos: 0,
            done: false,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize) -> &'a str {
        // The lexer only groups bytes along ASCII boundaries, so any
        // multi-byte UTF-8 content stays inside quoted strings intact.
        std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("")
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let literal = self.slice(start);
        let upper = literal.to_ascii_uppercase();
        match lookup_keyword(&upper) {
            Some(kind) => Token::new(kind, literal),
            None => Token::new(TokenKind::Identifier, literal),
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        Token::new(TokenKind::Number, self.slice(start))
    }

    fn read_quoted(&mut self, delim: u8) -> Token {
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b == delim {
                break;
            }
            self.pos += 1;
        }
        let literal = self.slice(start);
        if self.peek_byte() == Some(delim) {
            self.pos += 1;
        }
        Token::new(TokenKind::QuotedString, literal)
    }

    fn read_meta(&mut self) -> Token {
        let start = self.pos;
        self.pos += 1;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphabetic() || b == b'?') {
            self.pos += 1;
        }
        Token::new(TokenKind::MetaCommand, self.slice(start))
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let b = match self.peek_byte() {
            Some(b) => b,
            None => return Token::eof(),
        };
        match b {
            b';' => {
                self.pos += 1;
                Token::new(TokenKind::Semicolon, ";")
            }
            b',' => {
                self.pos += 1;
                Token::new(TokenKind::Comma, ",")
            }
            b'\'' | b'"' => self.read_quoted(b),
            b'\\' => self.read_meta(),
            b if b.is_ascii_digit() => self.read_number(),
            b if b.is_ascii_alphabetic() => self.read_identifier(),
            _ => {
                let start = self.pos;
                self.pos += 1;
                Token::new(TokenKind::Illegal, self.slice(start))
            }
        }
    }

    /// Lexes the whole input, including the trailing `Eof` token.
    pub fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if eof {
                return tokens;
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let tok = self.next_token();
        if tok.kind == TokenKind::Eof {
            self.done = true;
        }
        Some(tok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_fold_case() {
        assert_eq!(
            kinds("login USER Ping"),
            vec![
                TokenKind::Login,
                TokenKind::User,
                TokenKind::Ping,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn identifier_allows_dash_dot_underscore() {
        let tokens = Lexer::tokenize("my-role.v2_x");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].literal, "my-role.v2_x");
    }

    #[test]
    fn quoted_string_strips_delimiters() {
        let tokens = Lexer::tokenize("'a@b.com' \"two words\"");
        assert_eq!(tokens[0].kind, TokenKind::QuotedString);
        assert_eq!(tokens[0].literal, "a@b.com");
        assert_eq!(tokens[1].literal, "two words");
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let tokens = Lexer::tokenize("login 'abc");
        assert_eq!(tokens[1].kind, TokenKind::QuotedString);
        assert_eq!(tokens[1].literal, "abc");
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn illegal_byte_advances_one_byte() {
        let tokens = Lexer::tokenize("@@ping");
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
        assert_eq!(tokens[0].literal, "@");
        assert_eq!(tokens[1].kind, TokenKind::Illegal);
        assert_eq!(tokens[2].kind, TokenKind::Ping);
    }

    #[test]
    fn meta_command_includes_backslash_and_question_mark() {
        let tokens = Lexer::tokenize("\\? arg1 'quoted arg'");
        assert_eq!(tokens[0].kind, TokenKind::MetaCommand);
        assert_eq!(tokens[0].literal, "\\?");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].kind, TokenKind::QuotedString);
    }

    #[test]
    fn numbers_are_unsigned_digit_runs() {
        let tokens = Lexer::tokenize("benchmark 8 1000");
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].literal, "8");
        assert_eq!(tokens[2].literal, "1000");
    }

    #[test]
    fn iterator_stops_after_eof() {
        let collected: Vec<Token> = Lexer::new("ping;").collect();
        assert_eq!(collected.last().map(|t| t.kind), Some(TokenKind::Eof));
        assert_eq!(collected.len(), 3);
    }
}
