use tracing::trace;

use crate::command::{Command, CommandKind, Statement};
use crate::error::{ParseError, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Recursive-descent parser over one line's token stream. Single-token
/// lookahead, with keyword peeks where the grammar needs them (optional
/// clauses, the three ALTER USER forms, LIST ... [OF ...]).
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let tokens = if tokens.is_empty() {
            vec![Token::eof()]
        } else {
            tokens
        };
        Parser { tokens, pos: 0 }
    }

    /// Lex and parse one raw input line. Empty input yields `None`.
    pub fn parse_line(input: &str) -> Result<Option<Command>> {
        Parser::new(Lexer::tokenize(input)).parse()
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let tok = self.cur().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn found(&self) -> String {
        match self.cur().kind {
            TokenKind::Eof => "end of input".to_owned(),
            _ => format!("'{}'", self.cur().literal),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.cur().kind == kind {
            Ok(self.bump())
        } else {
            Err(ParseError::syntax(expected, self.found()))
        }
    }

    fn quoted(&mut self, expected: &str) -> Result<String> {
        Ok(self.expect(TokenKind::QuotedString, expected)?.literal)
    }

    fn number(&mut self, expected: &str) -> Result<u64> {
        let tok = self.expect(TokenKind::Number, expected)?;
        tok.literal
            .parse::<u64>()
            .map_err(|_| ParseError::syntax(expected, format!("'{}'", tok.literal)))
    }

    /// A bare word: an identifier, a digit run, or any keyword spelling
    /// (role names like `admin` and statuses like `on` lex as keywords).
    fn word(&mut self, expected: &str) -> Result<String> {
        match self.cur().kind {
            TokenKind::Identifier | TokenKind::Number => Ok(self.bump().literal),
            kind if kind.is_keyword() => Ok(self.bump().literal),
            _ => Err(ParseError::syntax(expected, self.found())),
        }
    }

    fn word_list(&mut self, expected: &str) -> Result<Vec<String>> {
        let mut items = vec![self.word(expected)?];
        while self.cur().kind == TokenKind::Comma {
            self.bump();
            items.push(self.word(expected)?);
        }
        Ok(items)
    }

    fn semicolon(&mut self) -> Result<()> {
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(())
    }

    pub fn parse(&mut self) -> Result<Option<Command>> {
        match self.cur().kind {
            TokenKind::Eof => Ok(None),
            TokenKind::MetaCommand => Ok(Some(self.meta_command())),
            TokenKind::Benchmark => {
                let cmd = self.benchmark()?;
                self.semicolon()?;
                self.expect(TokenKind::Eof, "end of input")?;
                Ok(Some(cmd))
            }
            _ => {
                let stmt = self.statement()?;
                self.semicolon()?;
                self.expect(TokenKind::Eof, "end of input")?;
                trace!(kind = stmt.kind.as_str(), "parsed statement");
                Ok(Some(Command::Statement(stmt)))
            }
        }
    }

    fn meta_command(&mut self) -> Command {
        let tok = self.bump();
        let name = tok.literal.trim_start_matches('\\').to_lowercase();
        let mut args = Vec::new();
        while self.cur().kind != TokenKind::Eof {
            args.push(self.bump().literal);
        }
        Command::Meta { name, args }
    }

    fn benchmark(&mut self) -> Result<Command> {
        self.bump();
        let concurrency = self.number("a concurrency number")?;
        let iterations = self.number("an iteration number")?;
        if self.cur().kind == TokenKind::Benchmark {
            return Err(ParseError::syntax("a benchmarkable statement", self.found()));
        }
        let inner = self.statement()?;
        if !inner.kind.is_benchmarkable() {
            return Err(ParseError::syntax(
                "a benchmarkable statement",
                inner.kind.as_str(),
            ));
        }
        Ok(Command::Benchmark {
            concurrency,
            iterations,
            inner,
        })
    }

    fn statement(&mut self) -> Result<Statement> {
        match self.cur().kind {
            TokenKind::Login => self.login(),
            TokenKind::Ping => {
                self.bump();
                Ok(Statement::new(CommandKind::PingServer))
            }
            TokenKind::List => self.list(),
            TokenKind::Show => self.show(),
            TokenKind::Startup => self.service_action(CommandKind::StartupService),
            TokenKind::Shutdown => self.service_action(CommandKind::ShutdownService),
            TokenKind::Restart => self.service_action(CommandKind::RestartService),
            TokenKind::Register => self.register(),
            TokenKind::Create => self.create(),
            TokenKind::Drop => self.drop_target(),
            TokenKind::Alter => self.alter(),
            TokenKind::Grant => self.grant(),
            TokenKind::Revoke => self.revoke(),
            TokenKind::Set => self.set(),
            TokenKind::Reset => self.reset(),
            TokenKind::Generate => self.generate_key(),
            TokenKind::Import => self.import_docs(),
            TokenKind::Search => self.search(),
            TokenKind::Parse => self.parse_docs(),
            _ => Err(ParseError::syntax("a statement", self.found())),
        }
    }

    fn login(&mut self) -> Result<Statement> {
        self.bump();
        self.expect(TokenKind::User, "USER")?;
        let email = self.quoted("a quoted email")?;
        Ok(Statement::new(CommandKind::LoginUser).with_param("email", email))
    }

    fn service_action(&mut self, kind: CommandKind) -> Result<Statement> {
        self.bump();
        self.expect(TokenKind::Service, "SERVICE")?;
        let id = self.number("a service id")?;
        Ok(Statement::new(kind).with_param("number", id))
    }

    fn register(&mut self) -> Result<Statement> {
        self.bump();
        self.expect(TokenKind::User, "USER")?;
        let user_name = self.quoted("a quoted user name")?;
        self.expect(TokenKind::As, "AS")?;
        let nickname = self.quoted("a quoted nickname")?;
        self.expect(TokenKind::Password, "PASSWORD")?;
        let password = self.quoted("a quoted password")?;
        Ok(Statement::new(CommandKind::RegisterUser)
            .with_param("user_name", user_name)
            .with_param("nickname", nickname)
            .with_param("password", password))
    }

    fn list(&mut self) -> Result<Statement> {
        self.bump();
        match self.cur().kind {
            TokenKind::Services => {
                self.bump();
                Ok(Statement::new(CommandKind::ListServices))
            }
            TokenKind::Users => {
                self.bump();
                Ok(Statement::new(CommandKind::ListUsers))
            }
            TokenKind::Roles => {
                self.bump();
                Ok(Statement::new(CommandKind::ListRoles))
            }
            TokenKind::Vars => {
                self.bump();
                Ok(Statement::new(CommandKind::ListVariables))
            }
            TokenKind::Configs => {
                self.bump();
                Ok(Statement::new(CommandKind::ListConfigs))
            }
            TokenKind::Envs => {
                self.bump();
                Ok(Statement::new(CommandKind::ListEnvironments))
            }
            TokenKind::Chats => {
                self.bump();
                Ok(Statement::new(CommandKind::ListUserChats))
            }
            TokenKind::Datasets => {
                self.bump();
                if self.cur().kind == TokenKind::Of {
                    self.bump();
                    let user_name = self.quoted("a quoted user name")?;
                    Ok(Statement::new(CommandKind::ListDatasets)
                        .with_param("user_name", user_name))
                } else {
                    Ok(Statement::new(CommandKind::ListUserDatasets))
                }
            }
            TokenKind::Agents => {
                self.bump();
                if self.cur().kind == TokenKind::Of {
                    self.bump();
                    let user_name = self.quoted("a quoted user name")?;
                    Ok(Statement::new(CommandKind::ListAgents).with_param("user_name", user_name))
                } else {
                    Ok(Statement::new(CommandKind::ListUserAgents))
                }
            }
            TokenKind::Keys => {
                self.bump();
                self.expect(TokenKind::Of, "OF")?;
                let user_name = self.quoted("a quoted user name")?;
                Ok(Statement::new(CommandKind::ListKeys).with_param("user_name", user_name))
            }
            TokenKind::Files => {
                self.bump();
                self.expect(TokenKind::Of, "OF")?;
                self.expect(TokenKind::Dataset, "DATASET")?;
                let dataset_name = self.quoted("a quoted dataset name")?;
                Ok(Statement::new(CommandKind::ListUserDatasetFiles)
                    .with_param("dataset_name", dataset_name))
            }
            TokenKind::Model => {
                self.bump();
                self.expect(TokenKind::Providers, "PROVIDERS")?;
                Ok(Statement::new(CommandKind::ListUserModelProviders))
            }
            TokenKind::Default => {
                self.bump();
                self.expect(TokenKind::Models, "MODELS")?;
                Ok(Statement::new(CommandKind::ListUserDefaultModels))
            }
            _ => Err(ParseError::syntax("a listable target", self.found())),
        }
    }

    fn show(&mut self) -> Result<Statement> {
        self.bump();
        match self.cur().kind {
            TokenKind::Service => {
                self.bump();
                let id = self.number("a service id")?;
                Ok(Statement::new(CommandKind::ShowService).with_param("number", id))
            }
            TokenKind::User => {
                self.bump();
                if self.cur().kind == TokenKind::Permission {
                    self.bump();
                    let user_name = self.quoted("a quoted user name")?;
                    Ok(Statement::new(CommandKind::ShowUserPermission)
                        .with_param("user_name", user_name))
                } else {
                    let user_name = self.quoted("a quoted user name")?;
                    Ok(Statement::new(CommandKind::ShowUser).with_param("user_name", user_name))
                }
            }
            TokenKind::Role => {
                self.bump();
                let role_name = self.word("a role name")?;
                Ok(Statement::new(CommandKind::ShowRole).with_param("role_name", role_name))
            }
            TokenKind::Version => {
                self.bump();
                Ok(Statement::new(CommandKind::ShowVersion))
            }
            TokenKind::Var => {
                self.bump();
                let var_name = self.word("a variable name")?;
                Ok(Statement::new(CommandKind::ShowVariable).with_param("var_name", var_name))
            }
            TokenKind::Current => {
                self.bump();
                self.expect(TokenKind::User, "USER")?;
                Ok(Statement::new(CommandKind::ShowCurrentUser))
            }
            _ => Err(ParseError::syntax("a showable target", self.found())),
        }
    }

    fn create(&mut self) -> Result<Statement> {
        self.bump();
        match self.cur().kind {
            TokenKind::User => {
                self.bump();
                let user_name = self.quoted("a quoted user name")?;
                let password = self.quoted("a quoted password")?;
                Ok(Statement::new(CommandKind::CreateUser)
                    .with_param("user_name", user_name)
                    .with_param("password", password)
                    .with_param("role", "user"))
            }
            TokenKind::Role => {
                self.bump();
                let role_name = self.word("a role name")?;
                let mut stmt =
                    Statement::new(CommandKind::CreateRole).with_param("role_name", role_name);
                if self.cur().kind == TokenKind::Description {
                    self.bump();
                    let description = self.quoted("a quoted description")?;
                    stmt = stmt.with_param("description", description);
                }
                Ok(stmt)
            }
            TokenKind::Model => {
                self.bump();
                self.expect(TokenKind::Provider, "PROVIDER")?;
                let provider_name = self.quoted("a quoted provider name")?;
                let provider_key = self.quoted("a quoted provider key")?;
                Ok(Statement::new(CommandKind::CreateModelProvider)
                    .with_param("provider_name", provider_name)
                    .with_param("provider_key", provider_key))
            }
            TokenKind::Dataset => {
                self.bump();
                let dataset_name = self.quoted("a quoted dataset name")?;
                self.expect(TokenKind::With, "WITH")?;
                self.expect(TokenKind::Embedding, "EMBEDDING")?;
                let embedding = self.quoted("a quoted embedding model")?;
                let stmt = Statement::new(CommandKind::CreateUserDataset)
                    .with_param("dataset_name", dataset_name)
                    .with_param("embedding", embedding);
                match self.cur().kind {
                    TokenKind::Parser => {
                        self.bump();
                        let parser_type = self.quoted("a quoted parser type")?;
                        Ok(stmt.with_param("parser_type", parser_type))
                    }
                    TokenKind::Pipeline => {
                        self.bump();
                        let pipeline = self.quoted("a quoted pipeline")?;
                        Ok(stmt.with_param("pipeline", pipeline))
                    }
                    _ => Err(ParseError::syntax("PARSER or PIPELINE", self.found())),
                }
            }
            TokenKind::Chat => {
                self.bump();
                let chat_name = self.quoted("a quoted chat name")?;
                Ok(Statement::new(CommandKind::CreateUserChat).with_param("chat_name", chat_name))
            }
            _ => Err(ParseError::syntax("a creatable target", self.found())),
        }
    }

    fn drop_target(&mut self) -> Result<Statement> {
        self.bump();
        match self.cur().kind {
            TokenKind::User => {
                self.bump();
                let user_name = self.quoted("a quoted user name")?;
                Ok(Statement::new(CommandKind::DropUser).with_param("user_name", user_name))
            }
            TokenKind::Role => {
                self.bump();
                let role_name = self.word("a role name")?;
                Ok(Statement::new(CommandKind::DropRole).with_param("role_name", role_name))
            }
            TokenKind::Key => {
                self.bump();
                let key = self.quoted("a quoted key")?;
                self.expect(TokenKind::Of, "OF")?;
                let user_name = self.quoted("a quoted user name")?;
                Ok(Statement::new(CommandKind::DropKey)
                    .with_param("key", key)
                    .with_param("user_name", user_name))
            }
            TokenKind::Model => {
                self.bump();
                self.expect(TokenKind::Provider, "PROVIDER")?;
                let provider_name = self.quoted("a quoted provider name")?;
                Ok(Statement::new(CommandKind::DropModelProvider)
                    .with_param("provider_name", provider_name))
            }
            TokenKind::Dataset => {
                self.bump();
                let dataset_name = self.quoted("a quoted dataset name")?;
                Ok(Statement::new(CommandKind::DropUserDataset)
                    .with_param("dataset_name", dataset_name))
            }
            TokenKind::Chat => {
                self.bump();
                let chat_name = self.quoted("a quoted chat name")?;
                Ok(Statement::new(CommandKind::DropUserChat).with_param("chat_name", chat_name))
            }
            _ => Err(ParseError::syntax("a droppable target", self.found())),
        }
    }

    fn alter(&mut self) -> Result<Statement> {
        self.bump();
        match self.cur().kind {
            TokenKind::User => {
                self.bump();
                match self.cur().kind {
                    TokenKind::Password => {
                        self.bump();
                        let user_name = self.quoted("a quoted user name")?;
                        let password = self.quoted("a quoted password")?;
                        Ok(Statement::new(CommandKind::AlterUser)
                            .with_param("user_name", user_name)
                            .with_param("password", password))
                    }
                    TokenKind::Active => {
                        self.bump();
                        let user_name = self.quoted("a quoted user name")?;
                        let status = self.word("an activate status")?;
                        Ok(Statement::new(CommandKind::ActivateUser)
                            .with_param("user_name", user_name)
                            .with_param("activate_status", status))
                    }
                    TokenKind::QuotedString => {
                        let user_name = self.quoted("a quoted user name")?;
                        self.expect(TokenKind::Set, "SET")?;
                        self.expect(TokenKind::Role, "ROLE")?;
                        let role_name = self.word("a role name")?;
                        Ok(Statement::new(CommandKind::AlterUserRole)
                            .with_param("user_name", user_name)
                            .with_param("role_name", role_name))
                    }
                    _ => Err(ParseError::syntax(
                        "PASSWORD, ACTIVE or a quoted user name",
                        self.found(),
                    )),
                }
            }
            TokenKind::Role => {
                self.bump();
                let role_name = self.word("a role name")?;
                self.expect(TokenKind::Set, "SET")?;
                self.expect(TokenKind::Description, "DESCRIPTION")?;
                let description = self.quoted("a quoted description")?;
                Ok(Statement::new(CommandKind::AlterRole)
                    .with_param("role_name", role_name)
                    .with_param("description", description))
            }
            _ => Err(ParseError::syntax("USER or ROLE", self.found())),
        }
    }

    fn grant(&mut self) -> Result<Statement> {
        self.bump();
        if self.cur().kind == TokenKind::Admin && self.peek().kind == TokenKind::QuotedString {
            self.bump();
            let user_name = self.quoted("a quoted user name")?;
            return Ok(Statement::new(CommandKind::GrantAdmin).with_param("user_name", user_name));
        }
        let actions = self.word_list("an action name")?;
        self.expect(TokenKind::On, "ON")?;
        let resource = self.word("a resource name")?;
        self.expect(TokenKind::To, "TO")?;
        self.expect(TokenKind::Role, "ROLE")?;
        let role_name = self.word("a role name")?;
        Ok(Statement::new(CommandKind::GrantPermission)
            .with_param("role_name", role_name)
            .with_param("resource", resource)
            .with_param("actions", actions))
    }

    fn revoke(&mut self) -> Result<Statement> {
        self.bump();
        if self.cur().kind == TokenKind::Admin && self.peek().kind == TokenKind::QuotedString {
            self.bump();
            let user_name = self.quoted("a quoted user name")?;
            return Ok(Statement::new(CommandKind::RevokeAdmin).with_param("user_name", user_name));
        }
        let actions = self.word_list("an action name")?;
        self.expect(TokenKind::On, "ON")?;
        let resource = self.word("a resource name")?;
        self.expect(TokenKind::From, "FROM")?;
        self.expect(TokenKind::Role, "ROLE")?;
        let role_name = self.word("a role name")?;
        Ok(Statement::new(CommandKind::RevokePermission)
            .with_param("role_name", role_name)
            .with_param("resource", resource)
            .with_param("actions", actions))
    }

    fn model_type(&mut self) -> Result<&'static str> {
        let field = match self.cur().kind {
            TokenKind::Llm => "llm_id",
            TokenKind::Vlm => "img2txt_id",
            TokenKind::Embedding => "embd_id",
            TokenKind::Reranker => "reranker_id",
            TokenKind::Asr => "asr_id",
            TokenKind::Tts => "tts_id",
            _ => return Err(ParseError::syntax("a model type", self.found())),
        };
        self.bump();
        Ok(field)
    }

    fn set(&mut self) -> Result<Statement> {
        self.bump();
        match self.cur().kind {
            TokenKind::Var => {
                self.bump();
                let var_name = self.word("a variable name")?;
                let var_value = self.word("a variable value")?;
                Ok(Statement::new(CommandKind::SetVariable)
                    .with_param("var_name", var_name)
                    .with_param("var_value", var_value))
            }
            TokenKind::Default => {
                self.bump();
                let model_type = self.model_type()?;
                let model_id = self.quoted("a quoted model id")?;
                Ok(Statement::new(CommandKind::SetDefaultModel)
                    .with_param("model_type", model_type)
                    .with_param("model_id", model_id))
            }
            _ => Err(ParseError::syntax("VAR or DEFAULT", self.found())),
        }
    }

    fn reset(&mut self) -> Result<Statement> {
        self.bump();
        self.expect(TokenKind::Default, "DEFAULT")?;
        let model_type = self.model_type()?;
        Ok(Statement::new(CommandKind::ResetDefaultModel).with_param("model_type", model_type))
    }

    fn generate_key(&mut self) -> Result<Statement> {
        self.bump();
        self.expect(TokenKind::Key, "KEY")?;
        self.expect(TokenKind::For, "FOR")?;
        self.expect(TokenKind::User, "USER")?;
        let user_name = self.quoted("a quoted user name")?;
        Ok(Statement::new(CommandKind::GenerateKey).with_param("user_name", user_name))
    }

    fn import_docs(&mut self) -> Result<Statement> {
        self.bump();
        let docs = self.quoted("a quoted document list")?;
        self.expect(TokenKind::Into, "INTO")?;
        self.expect(TokenKind::Dataset, "DATASET")?;
        let dataset_name = self.quoted("a quoted dataset name")?;
        Ok(Statement::new(CommandKind::ImportDocsIntoDataset)
            .with_param("dataset_name", dataset_name)
            .with_param("document_paths", split_list(&docs)))
    }

    fn search(&mut self) -> Result<Statement> {
        self.bump();
        let question = self.quoted("a quoted question")?;
        self.expect(TokenKind::On, "ON")?;
        self.expect(TokenKind::Datasets, "DATASETS")?;
        let datasets = self.quoted("a quoted dataset list")?;
        Ok(Statement::new(CommandKind::SearchOnDatasets)
            .with_param("datasets", split_list(&datasets))
            .with_param("question", question))
    }

    fn parse_docs(&mut self) -> Result<Statement> {
        self.bump();
        match self.cur().kind {
            TokenKind::Dataset => {
                self.bump();
                let dataset_name = self.quoted("a quoted dataset name")?;
                let method = match self.cur().kind {
                    TokenKind::Sync => "sync",
                    TokenKind::Async => "async",
                    _ => return Err(ParseError::syntax("SYNC or ASYNC", self.found())),
                };
                self.bump();
                Ok(Statement::new(CommandKind::ParseDataset)
                    .with_param("dataset_name", dataset_name)
                    .with_param("method", method))
            }
            TokenKind::QuotedString => {
                let docs = self.quoted("a quoted document list")?;
                self.expect(TokenKind::Of, "OF")?;
                self.expect(TokenKind::Dataset, "DATASET")?;
                let dataset_name = self.quoted("a quoted dataset name")?;
                Ok(Statement::new(CommandKind::ParseDatasetDocs)
                    .with_param("dataset_name", dataset_name)
                    .with_param("document_names", split_list(&docs)))
            }
            _ => Err(ParseError::syntax(
                "DATASET or a quoted document list",
                self.found(),
            )),
        }
    }
}

/// Splits a quoted list literal on commas; a single comma-free segment is
/// split on spaces instead.
fn split_list(raw: &str) -> Vec<String> {
    let parts: Vec<String> = raw.split(',').map(str::to_owned).collect();
    if parts.len() == 1 {
        parts[0].split(' ').map(str::to_owned).collect()
    } else {
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Value;

    fn parse(input: &str) -> Result<Option<Command>> {
        Parser::parse_line(input)
    }

    fn statement(input: &str) -> Statement {
        match parse(input).unwrap().unwrap() {
            Command::Statement(stmt) => stmt,
            other => panic!("expected a statement, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \t").unwrap(), None);
    }

    #[test]
    fn ping_has_no_params() {
        let stmt = statement("PING;");
        assert_eq!(stmt.kind, CommandKind::PingServer);
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn login_user_captures_email() {
        let stmt = statement("LOGIN USER 'a@b.com';");
        assert_eq!(stmt.kind, CommandKind::LoginUser);
        assert_eq!(stmt.str_param("email"), Some("a@b.com"));
    }

    #[test]
    fn login_without_user_keyword_names_user() {
        let err = parse("LOGIN 'x';").unwrap_err();
        match err {
            ParseError::Syntax { expected, found } => {
                assert_eq!(expected, "USER");
                assert_eq!(found, "'x'");
            }
        }
    }

    #[test]
    fn missing_semicolon_is_an_error() {
        let err = parse("PING").unwrap_err();
        match err {
            ParseError::Syntax { expected, .. } => assert_eq!(expected, "';'"),
        }
    }

    #[test]
    fn one_statement_per_line() {
        let err = parse("PING; LIST USERS;").unwrap_err();
        match err {
            ParseError::Syntax { expected, found } => {
                assert_eq!(expected, "end of input");
                assert_eq!(found, "'LIST'");
            }
        }
        assert!(parse("PING; @@@ nonsense").is_err());
        assert!(parse("BENCHMARK 1 1 PING; extra").is_err());
    }

    #[test]
    fn benchmark_wraps_a_nested_statement() {
        let cmd = parse("BENCHMARK 4 100 PING;").unwrap().unwrap();
        match cmd {
            Command::Benchmark {
                concurrency,
                iterations,
                inner,
            } => {
                assert_eq!(concurrency, 4);
                assert_eq!(iterations, 100);
                assert_eq!(inner.kind, CommandKind::PingServer);
            }
            other => panic!("expected benchmark, got {other:?}"),
        }
    }

    #[test]
    fn benchmark_never_nests() {
        let err = parse("BENCHMARK 2 5 BENCHMARK 1 1 PING;;").unwrap_err();
        match err {
            ParseError::Syntax { expected, .. } => {
                assert_eq!(expected, "a benchmarkable statement");
            }
        }
    }

    #[test]
    fn benchmark_rejects_admin_statements() {
        let err = parse("BENCHMARK 2 5 LIST USERS;").unwrap_err();
        match err {
            ParseError::Syntax { expected, found } => {
                assert_eq!(expected, "a benchmarkable statement");
                assert_eq!(found, "list_users");
            }
        }
    }

    #[test]
    fn create_dataset_with_parser() {
        let stmt = statement("CREATE DATASET 'd' WITH EMBEDDING 'e' PARSER 'naive';");
        assert_eq!(stmt.kind, CommandKind::CreateUserDataset);
        assert_eq!(stmt.str_param("dataset_name"), Some("d"));
        assert_eq!(stmt.str_param("embedding"), Some("e"));
        assert_eq!(stmt.str_param("parser_type"), Some("naive"));
        assert_eq!(stmt.str_param("pipeline"), None);
    }

    #[test]
    fn create_dataset_with_pipeline() {
        let stmt = statement("CREATE DATASET 'd' WITH EMBEDDING 'e' PIPELINE 'p';");
        assert_eq!(stmt.str_param("pipeline"), Some("p"));
        assert_eq!(stmt.str_param("parser_type"), None);
    }

    #[test]
    fn create_dataset_requires_parser_or_pipeline() {
        let err = parse("CREATE DATASET 'd' WITH EMBEDDING 'e';").unwrap_err();
        match err {
            ParseError::Syntax { expected, .. } => assert_eq!(expected, "PARSER or PIPELINE"),
        }
    }

    #[test]
    fn list_datasets_dispatches_on_of() {
        assert_eq!(statement("LIST DATASETS;").kind, CommandKind::ListUserDatasets);
        let stmt = statement("LIST DATASETS OF 'a@b.com';");
        assert_eq!(stmt.kind, CommandKind::ListDatasets);
        assert_eq!(stmt.str_param("user_name"), Some("a@b.com"));
    }

    #[test]
    fn alter_user_three_forms() {
        let pw = statement("ALTER USER PASSWORD 'u' 'new';");
        assert_eq!(pw.kind, CommandKind::AlterUser);
        assert_eq!(pw.str_param("password"), Some("new"));

        let active = statement("ALTER USER ACTIVE 'u' off;");
        assert_eq!(active.kind, CommandKind::ActivateUser);
        assert_eq!(active.str_param("activate_status"), Some("off"));

        let role = statement("ALTER USER 'u' SET ROLE admin;");
        assert_eq!(role.kind, CommandKind::AlterUserRole);
        assert_eq!(role.str_param("role_name"), Some("admin"));
    }

    #[test]
    fn grant_admin_vs_grant_permission() {
        let admin = statement("GRANT ADMIN 'a@b.com';");
        assert_eq!(admin.kind, CommandKind::GrantAdmin);

        let perm = statement("GRANT read,write ON datasets TO ROLE editor;");
        assert_eq!(perm.kind, CommandKind::GrantPermission);
        assert_eq!(
            perm.params.get("actions"),
            Some(&Value::List(vec!["read".into(), "write".into()]))
        );
        assert_eq!(perm.str_param("resource"), Some("datasets"));
        assert_eq!(perm.str_param("role_name"), Some("editor"));
    }

    #[test]
    fn set_default_translates_model_keyword() {
        let stmt = statement("SET DEFAULT VLM 'qwen-vl';");
        assert_eq!(stmt.kind, CommandKind::SetDefaultModel);
        assert_eq!(stmt.str_param("model_type"), Some("img2txt_id"));
        assert_eq!(stmt.str_param("model_id"), Some("qwen-vl"));

        let reset = statement("RESET DEFAULT TTS;");
        assert_eq!(reset.kind, CommandKind::ResetDefaultModel);
        assert_eq!(reset.str_param("model_type"), Some("tts_id"));
    }

    #[test]
    fn document_lists_split_on_commas_then_spaces() {
        let commas = statement("PARSE 'a.pdf,b.pdf' OF DATASET 'd';");
        assert_eq!(
            commas.list_param("document_names"),
            Some(&["a.pdf".to_owned(), "b.pdf".to_owned()][..])
        );

        let spaces = statement("PARSE 'a.pdf b.pdf' OF DATASET 'd';");
        assert_eq!(
            spaces.list_param("document_names"),
            Some(&["a.pdf".to_owned(), "b.pdf".to_owned()][..])
        );
    }

    #[test]
    fn search_collects_datasets_and_question() {
        let stmt = statement("SEARCH 'what is x' ON DATASETS 'd1,d2';");
        assert_eq!(stmt.kind, CommandKind::SearchOnDatasets);
        assert_eq!(
            stmt.list_param("datasets"),
            Some(&["d1".to_owned(), "d2".to_owned()][..])
        );
        assert_eq!(stmt.str_param("question"), Some("what is x"));
    }

    #[test]
    fn parse_dataset_sync_and_async() {
        let sync = statement("PARSE DATASET 'd' SYNC;");
        assert_eq!(sync.kind, CommandKind::ParseDataset);
        assert_eq!(sync.str_param("method"), Some("sync"));
        let not_async = statement("PARSE DATASET 'd' ASYNC;");
        assert_eq!(not_async.str_param("method"), Some("async"));
    }

    #[test]
    fn register_user_collects_all_three_strings() {
        let stmt = statement("REGISTER USER 'a@b.com' AS 'ab' PASSWORD 'pw';");
        assert_eq!(stmt.kind, CommandKind::RegisterUser);
        assert_eq!(stmt.str_param("user_name"), Some("a@b.com"));
        assert_eq!(stmt.str_param("nickname"), Some("ab"));
        assert_eq!(stmt.str_param("password"), Some("pw"));
    }

    #[test]
    fn meta_command_captures_verb_and_args() {
        let cmd = parse("\\? topic 'quoted arg'").unwrap().unwrap();
        match cmd {
            Command::Meta { name, args } => {
                assert_eq!(name, "?");
                assert_eq!(args, vec!["topic".to_owned(), "quoted arg".to_owned()]);
            }
            other => panic!("expected meta, got {other:?}"),
        }
    }

    #[test]
    fn service_statements_take_numbers() {
        let stmt = statement("RESTART SERVICE 3;");
        assert_eq!(stmt.kind, CommandKind::RestartService);
        assert_eq!(stmt.int_param("number"), Some(3));
        assert!(parse("RESTART SERVICE x;").is_err());
    }

    #[test]
    fn drop_key_collects_key_and_owner() {
        let stmt = statement("DROP KEY 'k-1/2' OF 'a@b.com';");
        assert_eq!(stmt.kind, CommandKind::DropKey);
        assert_eq!(stmt.str_param("key"), Some("k-1/2"));
        assert_eq!(stmt.str_param("user_name"), Some("a@b.com"));
    }

    #[test]
    fn reparse_yields_equal_command() {
        let a = parse("GRANT read,write ON datasets TO ROLE editor;").unwrap();
        let b = parse("grant read , write on datasets to role editor ;").unwrap();
        assert_eq!(a, b);
    }
}
