use indexmap::IndexMap;
use serde::Serialize;

/// A parameter value attached to a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Int(u64),
    List(Vec<String>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Int(n)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// Every command tag the grammar can produce for a simple statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    LoginUser,
    PingServer,
    ListServices,
    ShowService,
    StartupService,
    ShutdownService,
    RestartService,
    RegisterUser,
    ListUsers,
    ShowUser,
    DropUser,
    AlterUser,
    CreateUser,
    ActivateUser,
    ListDatasets,
    ListAgents,
    CreateRole,
    DropRole,
    AlterRole,
    ListRoles,
    ShowRole,
    GrantPermission,
    RevokePermission,
    AlterUserRole,
    ShowUserPermission,
    ShowVersion,
    GrantAdmin,
    RevokeAdmin,
    SetVariable,
    ShowVariable,
    ListVariables,
    ListConfigs,
    ListEnvironments,
    GenerateKey,
    ListKeys,
    DropKey,
    ShowCurrentUser,
    SetDefaultModel,
    ResetDefaultModel,
    CreateModelProvider,
    DropModelProvider,
    CreateUserDataset,
    DropUserDataset,
    ListUserDatasets,
    ListUserDatasetFiles,
    ListUserAgents,
    ListUserChats,
    CreateUserChat,
    DropUserChat,
    ListUserModelProviders,
    ListUserDefaultModels,
    ParseDatasetDocs,
    ParseDataset,
    ImportDocsIntoDataset,
    SearchOnDatasets,
}

impl CommandKind {
    /// The snake_case tag used in diagnostics and the benchmark summary.
    pub fn as_str(self) -> &'static str {
        use CommandKind::*;
        match self {
            LoginUser => "login_user",
            PingServer => "ping_server",
            ListServices => "list_services",
            ShowService => "show_service",
            StartupService => "startup_service",
            ShutdownService => "shutdown_service",
            RestartService => "restart_service",
            RegisterUser => "register_user",
            ListUsers => "list_users",
            ShowUser => "show_user",
            DropUser => "drop_user",
            AlterUser => "alter_user",
            CreateUser => "create_user",
            ActivateUser => "activate_user",
            ListDatasets => "list_datasets",
            ListAgents => "list_agents",
            CreateRole => "create_role",
            DropRole => "drop_role",
            AlterRole => "alter_role",
            ListRoles => "list_roles",
            ShowRole => "show_role",
            GrantPermission => "grant_permission",
            RevokePermission => "revoke_permission",
            AlterUserRole => "alter_user_role",
            ShowUserPermission => "show_user_permission",
            ShowVersion => "show_version",
            GrantAdmin => "grant_admin",
            RevokeAdmin => "revoke_admin",
            SetVariable => "set_variable",
            ShowVariable => "show_variable",
            ListVariables => "list_variables",
            ListConfigs => "list_configs",
            ListEnvironments => "list_environments",
            GenerateKey => "generate_key",
            ListKeys => "list_keys",
            DropKey => "drop_key",
            ShowCurrentUser => "show_current_user",
            SetDefaultModel => "set_default_model",
            ResetDefaultModel => "reset_default_model",
            CreateModelProvider => "create_model_provider",
            DropModelProvider => "drop_model_provider",
            CreateUserDataset => "create_user_dataset",
            DropUserDataset => "drop_user_dataset",
            ListUserDatasets => "list_user_datasets",
            ListUserDatasetFiles => "list_user_dataset_files",
            ListUserAgents => "list_user_agents",
            ListUserChats => "list_user_chats",
            CreateUserChat => "create_user_chat",
            DropUserChat => "drop_user_chat",
            ListUserModelProviders => "list_user_model_providers",
            ListUserDefaultModels => "list_user_default_models",
            ParseDatasetDocs => "parse_dataset_docs",
            ParseDataset => "parse_dataset",
            ImportDocsIntoDataset => "import_docs_into_dataset",
            SearchOnDatasets => "search_on_datasets",
        }
    }

    /// Statements BENCHMARK may wrap. Session-management and admin-side
    /// statements are excluded; another BENCHMARK never nests.
    pub fn is_benchmarkable(self) -> bool {
        use CommandKind::*;
        matches!(
            self,
            PingServer
                | ShowCurrentUser
                | CreateModelProvider
                | DropModelProvider
                | SetDefaultModel
                | ResetDefaultModel
                | CreateUserDataset
                | DropUserDataset
                | ListUserDatasets
                | ListUserDatasetFiles
                | ListUserAgents
                | ListUserChats
                | CreateUserChat
                | DropUserChat
                | ListUserModelProviders
                | ListUserDefaultModels
                | ParseDatasetDocs
                | ParseDataset
                | ImportDocsIntoDataset
                | SearchOnDatasets
        )
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed simple statement: a tag plus its named parameters in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(flatten)]
    pub params: IndexMap<String, Value>,
}

impl Statement {
    pub fn new(kind: CommandKind) -> Self {
        Statement {
            kind,
            params: IndexMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_owned(), value.into());
        self
    }

    pub fn str_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    pub fn int_param(&self, name: &str) -> Option<u64> {
        self.params.get(name).and_then(Value::as_u64)
    }

    pub fn list_param(&self, name: &str) -> Option<&[String]> {
        self.params.get(name).and_then(Value::as_list)
    }
}

/// The result of parsing one input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Backslash directive, e.g. `\q` or `\? topic`.
    Meta { name: String, args: Vec<String> },
    Statement(Statement),
    Benchmark {
        concurrency: u64,
        iterations: u64,
        inner: Statement,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_snake_case() {
        assert_eq!(CommandKind::LoginUser.as_str(), "login_user");
        assert_eq!(CommandKind::SearchOnDatasets.as_str(), "search_on_datasets");
    }

    #[test]
    fn params_keep_insertion_order() {
        let stmt = Statement::new(CommandKind::RegisterUser)
            .with_param("user_name", "a@b.com")
            .with_param("nickname", "ab")
            .with_param("password", "pw");
        let keys: Vec<&str> = stmt.params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["user_name", "nickname", "password"]);
    }

    #[test]
    fn statement_serializes_with_type_tag() {
        let stmt = Statement::new(CommandKind::LoginUser).with_param("email", "a@b.com");
        let json = serde_json::to_value(&stmt).unwrap();
        assert_eq!(json["type"], "login_user");
        assert_eq!(json["email"], "a@b.com");
    }

    #[test]
    fn benchmarkable_excludes_admin_statements() {
        assert!(CommandKind::PingServer.is_benchmarkable());
        assert!(CommandKind::ListUserDatasets.is_benchmarkable());
        assert!(!CommandKind::LoginUser.is_benchmarkable());
        assert!(!CommandKind::DropUser.is_benchmarkable());
    }
}
