use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Lexical classes. Keywords are a closed set; the lexer folds identifiers
/// to uppercase and consults [`lookup_keyword`] before falling back to
/// `Identifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Login,
    Register,
    List,
    Services,
    Show,
    Create,
    Service,
    Shutdown,
    Startup,
    Restart,
    Users,
    Drop,
    User,
    Alter,
    Active,
    Admin,
    Password,
    Dataset,
    Datasets,
    Of,
    Agents,
    Role,
    Roles,
    Description,
    Grant,
    Revoke,
    All,
    Permission,
    To,
    From,
    For,
    Resources,
    On,
    Set,
    Reset,
    Version,
    Var,
    Vars,
    Configs,
    Envs,
    Key,
    Keys,
    Generate,
    Model,
    Models,
    Provider,
    Providers,
    Default,
    Chats,
    Chat,
    Files,
    As,
    Parse,
    Import,
    Into,
    With,
    Parser,
    Pipeline,
    Search,
    Current,
    Llm,
    Vlm,
    Embedding,
    Reranker,
    Asr,
    Tts,
    Async,
    Sync,
    Benchmark,
    Ping,

    Identifier,
    QuotedString,
    Number,
    Semicolon,
    Comma,
    MetaCommand,
    Illegal,
    Eof,
}

impl TokenKind {
    /// True for the fixed keyword classes, false for literals and punctuation.
    pub fn is_keyword(self) -> bool {
        !matches!(
            self,
            TokenKind::Identifier
                | TokenKind::QuotedString
                | TokenKind::Number
                | TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::MetaCommand
                | TokenKind::Illegal
                | TokenKind::Eof
        )
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind::*;
    HashMap::from([
        ("LOGIN", Login),
        ("REGISTER", Register),
        ("LIST", List),
        ("SERVICES", Services),
        ("SHOW", Show),
        ("CREATE", Create),
        ("SERVICE", Service),
        ("SHUTDOWN", Shutdown),
        ("STARTUP", Startup),
        ("RESTART", Restart),
        ("USERS", Users),
        ("DROP", Drop),
        ("USER", User),
        ("ALTER", Alter),
        ("ACTIVE", Active),
        ("ADMIN", Admin),
        ("PASSWORD", Password),
        ("DATASET", Dataset),
        ("DATASETS", Datasets),
        ("OF", Of),
        ("AGENTS", Agents),
        ("ROLE", Role),
        ("ROLES", Roles),
        ("DESCRIPTION", Description),
        ("GRANT", Grant),
        ("REVOKE", Revoke),
        ("ALL", All),
        ("PERMISSION", Permission),
        ("TO", To),
        ("FROM", From),
        ("FOR", For),
        ("RESOURCES", Resources),
        ("ON", On),
        ("SET", Set),
        ("RESET", Reset),
        ("VERSION", Version),
        ("VAR", Var),
        ("VARS", Vars),
        ("CONFIGS", Configs),
        ("ENVS", Envs),
        ("KEY", Key),
        ("KEYS", Keys),
        ("GENERATE", Generate),
        ("MODEL", Model),
        ("MODELS", Models),
        ("PROVIDER", Provider),
        ("PROVIDERS", Providers),
        ("DEFAULT", Default),
        ("CHATS", Chats),
        ("CHAT", Chat),
        ("FILES", Files),
        ("AS", As),
        ("PARSE", Parse),
        ("IMPORT", Import),
        ("INTO", Into),
        ("WITH", With),
        ("PARSER", Parser),
        ("PIPELINE", Pipeline),
        ("SEARCH", Search),
        ("CURRENT", Current),
        ("LLM", Llm),
        ("VLM", Vlm),
        ("EMBEDDING", Embedding),
        ("RERANKER", Reranker),
        ("ASR", Asr),
        ("TTS", Tts),
        ("ASYNC", Async),
        ("SYNC", Sync),
        ("BENCHMARK", Benchmark),
        ("PING", Ping),
    ])
});

/// O(1) keyword lookup over the uppercased identifier text.
pub fn lookup_keyword(upper: &str) -> Option<TokenKind> {
    KEYWORDS.get(upper).copied()
}

/// One lexed token. `literal` preserves the input spelling; for quoted
/// strings it is the content without the delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>) -> Self {
        Token {
            kind,
            literal: literal.into(),
        }
    }

    pub fn eof() -> Self {
        Token::new(TokenKind::Eof, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_is_exact_uppercase() {
        assert_eq!(lookup_keyword("LOGIN"), Some(TokenKind::Login));
        assert_eq!(lookup_keyword("login"), None);
        assert_eq!(lookup_keyword("LOGINX"), None);
    }

    #[test]
    fn keyword_table_is_closed() {
        assert_eq!(KEYWORDS.len(), 70);
    }

    #[test]
    fn punctuation_kinds_are_not_keywords() {
        assert!(TokenKind::Benchmark.is_keyword());
        assert!(!TokenKind::Semicolon.is_keyword());
        assert!(!TokenKind::Eof.is_keyword());
    }
}
