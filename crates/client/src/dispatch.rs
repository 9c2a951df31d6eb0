use std::time::{Duration, Instant};

use reqwest::blocking::multipart::Form;
use reqwest::Method;
use serde_json::{json, Map, Value as Json};
use tracing::debug;

use kbctl_core::{CommandKind, Statement};

use crate::crypto;
use crate::error::{ClientError, Result};
use crate::http::{AuthKind, HttpClient, Mode, Response};
use crate::transport::ApiBase;

/// What an executed statement hands back to the presentation layer.
#[derive(Debug)]
pub enum Output {
    /// Row-shaped JSON for table rendering.
    Rows(Json),
    Message(String),
    None,
}

/// Which session mode a statement is meant for. `None` means the statement
/// is mode-agnostic. Running a statement in the wrong mode warns but still
/// sends the request; the server is the authority.
pub fn required_mode(kind: CommandKind) -> Option<Mode> {
    use CommandKind::*;
    match kind {
        ListServices | ShowService | StartupService | ShutdownService | RestartService
        | ListUsers | ShowUser | DropUser | AlterUser | CreateUser | ActivateUser
        | ListDatasets | ListAgents | CreateRole | DropRole | AlterRole | ListRoles
        | ShowRole | GrantPermission | RevokePermission | AlterUserRole | ShowUserPermission
        | GrantAdmin | RevokeAdmin | SetVariable | ShowVariable | ListVariables
        | ListConfigs | ListEnvironments | GenerateKey | ListKeys | DropKey => Some(Mode::Admin),

        ShowCurrentUser | SetDefaultModel | ResetDefaultModel | CreateModelProvider
        | DropModelProvider | CreateUserDataset | DropUserDataset | ListUserDatasets
        | ListUserDatasetFiles | ListUserAgents | ListUserChats | CreateUserChat
        | DropUserChat | ListUserModelProviders | ListUserDefaultModels | ParseDatasetDocs
        | ParseDataset | ImportDocsIntoDataset | SearchOnDatasets => Some(Mode::User),

        LoginUser | PingServer | ShowVersion | RegisterUser => None,
    }
}

/// Per-command success check used by the benchmark engine. The health probe
/// wants an exact body; everything else wants a 200 with an "ok" envelope.
pub fn success_predicate(kind: CommandKind) -> fn(&Response) -> bool {
    match kind {
        CommandKind::PingServer => |r| r.status == 200 && r.body == b"pong",
        _ => |r| r.status == 200 && r.code() == Some(0),
    }
}

/// A statement resolved to one plain HTTP call.
#[derive(Debug)]
struct Route {
    method: Method,
    base: ApiBase,
    path: String,
    body: Option<Json>,
    auth: AuthKind,
}

impl Route {
    fn admin(method: Method, path: impl Into<String>) -> Self {
        Route {
            method,
            base: ApiBase::Admin,
            path: path.into(),
            body: None,
            auth: AuthKind::Admin,
        }
    }

    fn web(method: Method, path: impl Into<String>) -> Self {
        Route {
            method,
            base: ApiBase::Web,
            path: path.into(),
            body: None,
            auth: AuthKind::Web,
        }
    }

    fn with_body(mut self, body: Json) -> Self {
        self.body = Some(body);
        self
    }
}

/// Percent-encodes one path segment (API keys can carry `/` and `+`).
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Maps parsed statements onto protocol calls. One statement, one operation;
/// kinds with no mapping fail with [`ClientError::Unsupported`].
pub struct Dispatcher {
    http: HttpClient,
    mode: Mode,
}

impl Dispatcher {
    pub fn new(http: HttpClient, mode: Mode) -> Self {
        Dispatcher { http, mode }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn http_mut(&mut self) -> &mut HttpClient {
        &mut self.http
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn str_arg<'a>(stmt: &'a Statement, name: &str) -> Result<&'a str> {
        stmt.str_param(name)
            .ok_or_else(|| ClientError::InvalidArgument(format!("missing parameter '{name}'")))
    }

    fn list_arg<'a>(stmt: &'a Statement, name: &str) -> Result<&'a [String]> {
        stmt.list_param(name)
            .ok_or_else(|| ClientError::InvalidArgument(format!("missing parameter '{name}'")))
    }

    /// Resolves simple statements to a single route. Composite operations
    /// (anything that needs a lookup first) return `None` and are handled
    /// in [`Dispatcher::call`].
    fn route(&self, stmt: &Statement) -> Result<Option<Route>> {
        use CommandKind::*;
        let route = match stmt.kind {
            ListServices => Route::admin(Method::GET, "/admin/services"),
            ShowService => {
                let id = stmt.int_param("number").unwrap_or(0);
                Route::admin(Method::GET, format!("/admin/services/{id}"))
            }
            ListUsers => Route::admin(Method::GET, "/admin/users"),
            ShowUser => {
                let user = Self::str_arg(stmt, "user_name")?;
                Route::admin(Method::GET, format!("/admin/users/{}", encode_segment(user)))
            }
            DropUser => {
                let user = Self::str_arg(stmt, "user_name")?;
                Route::admin(
                    Method::DELETE,
                    format!("/admin/users/{}", encode_segment(user)),
                )
            }
            AlterUser => {
                let user = Self::str_arg(stmt, "user_name")?;
                let password = Self::str_arg(stmt, "password")?;
                Route::admin(
                    Method::PUT,
                    format!("/admin/users/{}/password", encode_segment(user)),
                )
                .with_body(json!({ "new_password": crypto::encrypt_password(password)? }))
            }
            CreateUser => {
                let user = Self::str_arg(stmt, "user_name")?;
                let password = Self::str_arg(stmt, "password")?;
                let role = stmt.str_param("role").unwrap_or("user");
                Route::admin(Method::POST, "/admin/users").with_body(json!({
                    "username": user,
                    "password": crypto::encrypt_password(password)?,
                    "role": role,
                }))
            }
            ActivateUser => {
                let user = Self::str_arg(stmt, "user_name")?;
                let status = Self::str_arg(stmt, "activate_status")?.to_lowercase();
                if status != "on" && status != "off" {
                    return Err(ClientError::InvalidArgument(format!(
                        "unknown activate status: {status}"
                    )));
                }
                Route::admin(
                    Method::PUT,
                    format!("/admin/users/{}/activate", encode_segment(user)),
                )
                .with_body(json!({ "activate_status": status }))
            }
            GrantAdmin => {
                let user = Self::str_arg(stmt, "user_name")?;
                Route::admin(
                    Method::PUT,
                    format!("/admin/users/{}/admin", encode_segment(user)),
                )
            }
            RevokeAdmin => {
                let user = Self::str_arg(stmt, "user_name")?;
                Route::admin(
                    Method::DELETE,
                    format!("/admin/users/{}/admin", encode_segment(user)),
                )
            }
            CreateRole => {
                let role = Self::str_arg(stmt, "role_name")?;
                let description = stmt.str_param("description").unwrap_or("");
                Route::admin(Method::POST, "/admin/roles")
                    .with_body(json!({ "role_name": role, "description": description }))
            }
            DropRole => {
                let role = Self::str_arg(stmt, "role_name")?;
                Route::admin(Method::DELETE, format!("/admin/roles/{}", encode_segment(role)))
            }
            AlterRole => {
                let role = Self::str_arg(stmt, "role_name")?;
                let description = Self::str_arg(stmt, "description")?;
                Route::admin(Method::PUT, format!("/admin/roles/{}", encode_segment(role)))
                    .with_body(json!({ "description": description }))
            }
            ListRoles => Route::admin(Method::GET, "/admin/roles"),
            ShowRole => {
                let role = Self::str_arg(stmt, "role_name")?;
                Route::admin(
                    Method::GET,
                    format!("/admin/roles/{}/permission", encode_segment(role)),
                )
            }
            GrantPermission | RevokePermission => {
                let role = Self::str_arg(stmt, "role_name")?;
                let resource = Self::str_arg(stmt, "resource")?;
                let actions = Self::list_arg(stmt, "actions")?;
                let method = if stmt.kind == GrantPermission {
                    Method::POST
                } else {
                    Method::DELETE
                };
                Route::admin(
                    method,
                    format!("/admin/roles/{}/permission", encode_segment(role)),
                )
                .with_body(json!({ "actions": actions, "resource": resource }))
            }
            AlterUserRole => {
                let user = Self::str_arg(stmt, "user_name")?;
                let role = Self::str_arg(stmt, "role_name")?;
                Route::admin(
                    Method::PUT,
                    format!("/admin/users/{}/role", encode_segment(user)),
                )
                .with_body(json!({ "role_name": role }))
            }
            ShowUserPermission => {
                let user = Self::str_arg(stmt, "user_name")?;
                Route::admin(
                    Method::GET,
                    format!("/admin/users/{}/permission", encode_segment(user)),
                )
            }
            GenerateKey => {
                let user = Self::str_arg(stmt, "user_name")?;
                Route::admin(
                    Method::POST,
                    format!("/admin/users/{}/keys", encode_segment(user)),
                )
            }
            ListKeys => {
                let user = Self::str_arg(stmt, "user_name")?;
                Route::admin(
                    Method::GET,
                    format!("/admin/users/{}/keys", encode_segment(user)),
                )
            }
            DropKey => {
                let user = Self::str_arg(stmt, "user_name")?;
                let key = Self::str_arg(stmt, "key")?;
                Route::admin(
                    Method::DELETE,
                    format!(
                        "/admin/users/{}/keys/{}",
                        encode_segment(user),
                        encode_segment(key)
                    ),
                )
            }
            SetVariable => {
                let name = Self::str_arg(stmt, "var_name")?;
                let value = Self::str_arg(stmt, "var_value")?;
                Route::admin(Method::PUT, "/admin/variables")
                    .with_body(json!({ "var_name": name, "var_value": value }))
            }
            ShowVariable => {
                let name = Self::str_arg(stmt, "var_name")?;
                Route::admin(Method::GET, "/admin/variables")
                    .with_body(json!({ "var_name": name }))
            }
            ListVariables => Route::admin(Method::GET, "/admin/variables"),
            ListConfigs => Route::admin(Method::GET, "/admin/configs"),
            ListEnvironments => Route::admin(Method::GET, "/admin/environments"),
            ListDatasets => {
                let user = Self::str_arg(stmt, "user_name")?;
                Route::admin(
                    Method::GET,
                    format!("/admin/users/{}/datasets", encode_segment(user)),
                )
            }
            ListAgents => {
                let user = Self::str_arg(stmt, "user_name")?;
                Route::admin(
                    Method::GET,
                    format!("/admin/users/{}/agents", encode_segment(user)),
                )
            }
            ShowVersion => match self.mode {
                Mode::Admin => Route::admin(Method::GET, "/admin/version"),
                Mode::User => Route::web(Method::GET, "/system/version"),
            },
            RegisterUser => {
                let user = Self::str_arg(stmt, "user_name")?;
                let nickname = Self::str_arg(stmt, "nickname")?;
                let password = Self::str_arg(stmt, "password")?;
                let mut route = Route::web(Method::POST, "/user/register").with_body(json!({
                    "email": user,
                    "nickname": nickname,
                    "password": crypto::encrypt_password(password)?,
                }));
                route.auth = AuthKind::None;
                route
            }

            ShowCurrentUser => Route::web(Method::GET, "/user/info"),
            ListUserDatasets => Route::web(Method::POST, "/kb/list"),
            ListUserAgents => Route::web(Method::GET, "/canvas/list"),
            ListUserChats => Route::web(Method::POST, "/dialog/next"),
            ListUserModelProviders => Route::web(Method::GET, "/llm/my_llms"),
            ListUserDefaultModels => Route::web(Method::GET, "/user/tenant_info"),
            CreateModelProvider => {
                let name = Self::str_arg(stmt, "provider_name")?;
                let key = Self::str_arg(stmt, "provider_key")?;
                Route::web(Method::POST, "/llm/set_api_key")
                    .with_body(json!({ "llm_factory": name, "api_key": key }))
            }
            DropModelProvider => {
                let name = Self::str_arg(stmt, "provider_name")?;
                Route::web(Method::POST, "/llm/delete_factory")
                    .with_body(json!({ "llm_factory": name }))
            }
            CreateUserDataset => {
                let name = Self::str_arg(stmt, "dataset_name")?;
                let embedding = Self::str_arg(stmt, "embedding")?;
                let mut body = json!({ "name": name, "embd_id": embedding });
                if let Some(parser) = stmt.str_param("parser_type") {
                    body["parser_id"] = Json::from(parser);
                } else if let Some(pipeline) = stmt.str_param("pipeline") {
                    body["pipeline_id"] = Json::from(pipeline);
                }
                Route::web(Method::POST, "/kb/create").with_body(body)
            }
            CreateUserChat => {
                let name = Self::str_arg(stmt, "chat_name")?;
                Route::web(Method::POST, "/dialog/set").with_body(json!({ "name": name }))
            }

            // Everything else needs a lookup first or is not a plain call.
            _ => return Ok(None),
        };
        Ok(Some(route))
    }

    /// Performs the statement's protocol work and returns the decisive
    /// response. Composite operations resolve names to ids first; the
    /// response returned is the one the success predicate should judge.
    pub fn call(&self, stmt: &Statement) -> Result<Response> {
        use CommandKind::*;
        if let Some(route) = self.route(stmt)? {
            return self
                .http
                .request(route.method, route.base, &route.path, route.body.as_ref(), route.auth);
        }
        match stmt.kind {
            PingServer => self.http.ping(),
            DropUserDataset => {
                let name = Self::str_arg(stmt, "dataset_name")?;
                let id = self.dataset_id(name)?;
                self.web_post("/kb/rm", json!({ "kb_id": id }))
            }
            ListUserDatasetFiles => {
                let name = Self::str_arg(stmt, "dataset_name")?;
                let id = self.dataset_id(name)?;
                self.http.request(
                    Method::GET,
                    ApiBase::Web,
                    &format!("/document/list?kb_id={id}"),
                    None,
                    AuthKind::Web,
                )
            }
            DropUserChat => {
                let name = Self::str_arg(stmt, "chat_name")?;
                let id = self.chat_id(name)?;
                self.web_post("/dialog/rm", json!({ "dialog_ids": [id] }))
            }
            ImportDocsIntoDataset => self.import_docs(stmt),
            SearchOnDatasets => {
                let question = Self::str_arg(stmt, "question")?;
                let names = Self::list_arg(stmt, "datasets")?;
                let ids = names
                    .iter()
                    .map(|n| self.dataset_id(n))
                    .collect::<Result<Vec<_>>>()?;
                self.web_post(
                    "/chunk/retrieval_test",
                    json!({ "kb_id": ids, "question": question, "page": 1, "size": 10 }),
                )
            }
            ParseDataset => {
                let name = Self::str_arg(stmt, "dataset_name")?;
                let sync = stmt.str_param("method") == Some("sync");
                let id = self.dataset_id(name)?;
                let docs = self.document_ids(&id, None)?;
                let resp = self.run_parse(&docs)?;
                if sync {
                    self.wait_for_parse(&id)?;
                }
                Ok(resp)
            }
            ParseDatasetDocs => {
                let name = Self::str_arg(stmt, "dataset_name")?;
                let wanted = Self::list_arg(stmt, "document_names")?;
                let id = self.dataset_id(name)?;
                let docs = self.document_ids(&id, Some(wanted))?;
                self.run_parse(&docs)
            }
            SetDefaultModel | ResetDefaultModel => {
                let field = Self::str_arg(stmt, "model_type")?;
                let model_id = stmt.str_param("model_id").unwrap_or("");
                self.set_tenant_model(field, model_id)
            }
            other => Err(ClientError::Unsupported(other.as_str().to_owned())),
        }
    }

    /// Executes a statement and shapes the result for display.
    pub fn execute(&self, stmt: &Statement) -> Result<Output> {
        use CommandKind::*;
        match stmt.kind {
            StartupService => Ok(Output::Message("Startup service isn't implemented".into())),
            ShutdownService => Ok(Output::Message("Shutdown service isn't implemented".into())),
            RestartService => Ok(Output::Message("Restart service isn't implemented".into())),
            LoginUser => Err(ClientError::Unsupported("login_user".into())),
            PingServer => {
                let resp = self.call(stmt)?;
                if resp.status == 200 && resp.body == b"pong" {
                    Ok(Output::Message("pong".into()))
                } else {
                    Ok(Output::Message(format!(
                        "ping failed, status: {}",
                        resp.status
                    )))
                }
            }
            _ => {
                let resp = self.call(stmt)?;
                self.render(stmt, &resp)
            }
        }
    }

    /// Native batching hook for the benchmark engine. Only the health probe
    /// supports it: the whole batch runs here and the aggregate is returned.
    pub fn execute_batch(
        &self,
        stmt: &Statement,
        iterations: u64,
    ) -> Result<Option<(Duration, Vec<Response>)>> {
        if stmt.kind != CommandKind::PingServer {
            return Ok(None);
        }
        let started = Instant::now();
        let mut responses = Vec::with_capacity(iterations as usize);
        for _ in 0..iterations {
            responses.push(self.http.ping().unwrap_or_else(|_| Response::failed()));
        }
        Ok(Some((started.elapsed(), responses)))
    }

    fn web_post(&self, path: &str, body: Json) -> Result<Response> {
        self.http
            .request(Method::POST, ApiBase::Web, path, Some(&body), AuthKind::Web)
    }

    /// Looks a dataset id up by its display name.
    fn dataset_id(&self, name: &str) -> Result<String> {
        let resp = self.web_post("/kb/list", json!({}))?;
        let envelope = resp.json()?;
        let data = &envelope["data"];
        let items = data
            .as_array()
            .or_else(|| data["kbs"].as_array())
            .ok_or_else(|| ClientError::InvalidArgument("cannot list datasets".into()))?;
        for item in items {
            if item["name"].as_str() == Some(name) {
                if let Some(id) = item["id"].as_str() {
                    return Ok(id.to_owned());
                }
            }
        }
        Err(ClientError::InvalidArgument(format!(
            "dataset '{name}' not found"
        )))
    }

    fn chat_id(&self, name: &str) -> Result<String> {
        let resp = self.web_post("/dialog/next", json!({}))?;
        let envelope = resp.json()?;
        let items = envelope["data"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        for item in &items {
            if item["name"].as_str() == Some(name) {
                if let Some(id) = item["id"].as_str() {
                    return Ok(id.to_owned());
                }
            }
        }
        Err(ClientError::InvalidArgument(format!(
            "chat '{name}' not found"
        )))
    }

    /// Document ids of a dataset, optionally filtered by display name.
    fn document_ids(&self, kb_id: &str, names: Option<&[String]>) -> Result<Vec<String>> {
        let resp = self.http.request(
            Method::GET,
            ApiBase::Web,
            &format!("/document/list?kb_id={kb_id}"),
            None,
            AuthKind::Web,
        )?;
        let envelope = resp.json()?;
        let data = &envelope["data"];
        let docs = data
            .as_array()
            .or_else(|| data["docs"].as_array())
            .ok_or_else(|| ClientError::InvalidArgument("cannot list documents".into()))?;
        let mut ids = Vec::new();
        for doc in docs {
            let keep = match names {
                Some(wanted) => doc["name"]
                    .as_str()
                    .map(|n| wanted.iter().any(|w| w == n))
                    .unwrap_or(false),
                None => true,
            };
            if keep {
                if let Some(id) = doc["id"].as_str() {
                    ids.push(id.to_owned());
                }
            }
        }
        if ids.is_empty() {
            return Err(ClientError::InvalidArgument(
                "no matching documents".into(),
            ));
        }
        Ok(ids)
    }

    fn run_parse(&self, doc_ids: &[String]) -> Result<Response> {
        self.web_post(
            "/document/run",
            json!({ "doc_ids": doc_ids, "run": 1, "delete": false }),
        )
    }

    /// Polls the document list until every document finishes parsing, up to
    /// a minute.
    fn wait_for_parse(&self, kb_id: &str) -> Result<()> {
        for _ in 0..60 {
            std::thread::sleep(Duration::from_secs(1));
            let resp = self.http.request(
                Method::GET,
                ApiBase::Web,
                &format!("/document/list?kb_id={kb_id}"),
                None,
                AuthKind::Web,
            )?;
            let envelope = resp.json()?;
            let data = &envelope["data"];
            let docs = match data.as_array().or_else(|| data["docs"].as_array()) {
                Some(docs) => docs,
                None => return Ok(()),
            };
            let done = docs.iter().all(|d| {
                d["progress"]
                    .as_f64()
                    .map(|p| p >= 1.0 || p < 0.0)
                    .unwrap_or(true)
            });
            if done {
                return Ok(());
            }
            debug!(kb_id, "parse still running");
        }
        Ok(())
    }

    /// Reads tenant defaults, replaces one model field and writes them back.
    fn set_tenant_model(&self, field: &str, model_id: &str) -> Result<Response> {
        let resp = self.http.request(
            Method::GET,
            ApiBase::Web,
            "/user/tenant_info",
            None,
            AuthKind::Web,
        )?;
        let envelope = resp.json()?;
        let mut info = envelope["data"].as_object().cloned().unwrap_or_default();
        info.insert(field.to_owned(), Json::from(model_id));
        self.web_post("/user/set_tenant_info", Json::Object(info))
    }

    fn render(&self, stmt: &Statement, resp: &Response) -> Result<Output> {
        use CommandKind::*;
        let envelope = resp.json()?;
        let code = envelope.get("code").and_then(|c| c.as_i64());
        if resp.status != 200 || code != Some(0) {
            let message = envelope
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("request failed");
            return Ok(Output::Message(format!(
                "request failed, code: {}, message: {message}",
                code.unwrap_or(-1)
            )));
        }
        let data = envelope.get("data").cloned().unwrap_or(Json::Null);
        let output = match stmt.kind {
            DropUser | GrantAdmin | RevokeAdmin | AlterUser | ActivateUser | SetVariable
            | DropKey | DropUserDataset | DropUserChat | DropModelProvider | SetDefaultModel
            | ResetDefaultModel | ImportDocsIntoDataset | ParseDataset | ParseDatasetDocs
            | RegisterUser => {
                let message = envelope
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("success");
                Output::Message(message.to_owned())
            }
            ShowUser | ListDatasets | ListAgents => Output::Rows(strip_avatar(data)),
            ListUserModelProviders => Output::Rows(provider_rows(&data)),
            ListUserDefaultModels => Output::Rows(default_model_rows(&data)),
            ListUserDatasetFiles => {
                let docs = data["docs"].clone();
                if docs.is_array() {
                    Output::Rows(docs)
                } else {
                    Output::Rows(data)
                }
            }
            SearchOnDatasets => {
                let chunks = data["chunks"].clone();
                if chunks.is_array() {
                    Output::Rows(chunks)
                } else {
                    Output::Rows(data)
                }
            }
            ListUserDatasets => {
                let kbs = data["kbs"].clone();
                if kbs.is_array() {
                    Output::Rows(strip_avatar(kbs))
                } else {
                    Output::Rows(strip_avatar(data))
                }
            }
            ShowVersion if self.mode == Mode::User => {
                Output::Rows(json!({ "version": data }))
            }
            _ => {
                if data.is_null() {
                    Output::Message(
                        envelope
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or("success")
                            .to_owned(),
                    )
                } else {
                    Output::Rows(data)
                }
            }
        };
        Ok(output)
    }

    fn import_docs(&self, stmt: &Statement) -> Result<Response> {
        let name = Self::str_arg(stmt, "dataset_name")?;
        let paths = Self::list_arg(stmt, "document_paths")?;
        let id = self.dataset_id(name)?;
        let mut last = Response::failed();
        for path in paths {
            let form = Form::new()
                .text("kb_id", id.clone())
                .file("file", path)?;
            last = self
                .http
                .upload(ApiBase::Web, "/document/upload", form, AuthKind::Web)?;
            debug!(%path, status = last.status, "uploaded document");
        }
        Ok(last)
    }
}

/// Drops the bulky avatar field from a row or a row list before display.
fn strip_avatar(mut data: Json) -> Json {
    fn strip_one(obj: &mut Map<String, Json>) {
        obj.remove("avatar");
    }
    match &mut data {
        Json::Object(obj) => strip_one(obj),
        Json::Array(items) => {
            for item in items {
                if let Json::Object(obj) = item {
                    strip_one(obj);
                }
            }
        }
        _ => {}
    }
    data
}

/// `{provider: [models]}` map into displayable rows.
fn provider_rows(data: &Json) -> Json {
    let mut rows = Vec::new();
    if let Some(map) = data.as_object() {
        for (provider, models) in map {
            rows.push(json!({ "model provider": provider, "models": models }));
        }
    }
    Json::Array(rows)
}

/// Tenant default-model fields into category/name rows, skipping unset ones.
fn default_model_rows(data: &Json) -> Json {
    const FIELDS: [(&str, &str); 6] = [
        ("asr_id", "ASR"),
        ("embd_id", "Embedding"),
        ("llm_id", "LLM"),
        ("rerank_id", "Reranker"),
        ("tts_id", "TTS"),
        ("img2txt_id", "VLM"),
    ];
    let mut rows = Vec::new();
    if let Some(map) = data.as_object() {
        for (field, category) in FIELDS {
            if let Some(value) = map.get(field).and_then(|v| v.as_str()) {
                if !value.is_empty() {
                    rows.push(json!({ "model_category": category, "model_name": value }));
                }
            }
        }
    }
    Json::Array(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbctl_core::Statement;

    #[test]
    fn ping_predicate_wants_exact_body() {
        let pred = success_predicate(CommandKind::PingServer);
        let ok = Response {
            status: 200,
            body: b"pong".to_vec(),
            headers: Default::default(),
        };
        let wrong_body = Response {
            status: 200,
            body: b"PONG".to_vec(),
            headers: Default::default(),
        };
        assert!(pred(&ok));
        assert!(!pred(&wrong_body));
        assert!(!pred(&Response::failed()));
    }

    #[test]
    fn json_predicate_wants_ok_envelope() {
        let pred = success_predicate(CommandKind::ListUserDatasets);
        let ok = Response {
            status: 200,
            body: br#"{"code":0,"data":[]}"#.to_vec(),
            headers: Default::default(),
        };
        let bad_code = Response {
            status: 200,
            body: br#"{"code":102}"#.to_vec(),
            headers: Default::default(),
        };
        let not_json = Response {
            status: 200,
            body: b"pong".to_vec(),
            headers: Default::default(),
        };
        assert!(pred(&ok));
        assert!(!pred(&bad_code));
        assert!(!pred(&not_json));
    }

    #[test]
    fn required_mode_splits_the_surfaces() {
        assert_eq!(required_mode(CommandKind::ListUsers), Some(Mode::Admin));
        assert_eq!(
            required_mode(CommandKind::ListUserDatasets),
            Some(Mode::User)
        );
        assert_eq!(required_mode(CommandKind::PingServer), None);
        assert_eq!(required_mode(CommandKind::ShowVersion), None);
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_segment("a@b.com"), "a%40b.com");
        assert_eq!(encode_segment("k-1/2+x"), "k-1%2F2%2Bx");
        assert_eq!(encode_segment("plain-name_0.9~"), "plain-name_0.9~");
    }

    #[test]
    fn avatar_is_stripped_from_rows() {
        let rows = json!([
            { "name": "a", "avatar": "xxxx" },
            { "name": "b" }
        ]);
        let cleaned = strip_avatar(rows);
        assert!(cleaned[0].get("avatar").is_none());
        assert_eq!(cleaned[1]["name"], "b");
    }

    #[test]
    fn default_model_rows_skip_empty_fields() {
        let data = json!({
            "llm_id": "gpt", "embd_id": "", "rerank_id": "bge", "tenant_id": "t"
        });
        let rows = default_model_rows(&data);
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["model_category"], "LLM");
        assert_eq!(rows[1]["model_category"], "Reranker");
    }

    #[test]
    fn activate_status_is_validated_before_any_call() {
        let http = HttpClient::new(crate::transport::Transport::default()).unwrap();
        let dispatcher = Dispatcher::new(http, Mode::Admin);
        let stmt = Statement::new(CommandKind::ActivateUser)
            .with_param("user_name", "u")
            .with_param("activate_status", "maybe");
        let err = dispatcher.route(&stmt).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }
}
