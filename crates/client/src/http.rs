use reqwest::blocking::multipart::Form;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Method;
use serde_json::json;
use tracing::debug;

use crate::crypto;
use crate::error::{ClientError, Result};
use crate::transport::{ApiBase, Transport};

/// Which credential a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    /// Login token, attached verbatim.
    Web,
    /// Login token, attached verbatim (administrative surface).
    Admin,
    None,
}

/// Which side of the service the session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Admin,
    User,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Admin => "admin",
            Mode::User => "user",
        }
    }

    fn login_route(self) -> (ApiBase, &'static str) {
        match self {
            Mode::Admin => (ApiBase::Admin, "/admin/login"),
            Mode::User => (ApiBase::Web, "/user/login"),
        }
    }
}

/// One HTTP exchange's result. Owned by the caller; benchmark workers
/// never share these.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: HeaderMap,
}

impl Response {
    /// Synthetic stand-in for a call that never produced a response.
    pub fn failed() -> Self {
        Response {
            status: 0,
            body: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The service-level status code carried in the JSON envelope.
    pub fn code(&self) -> Option<i64> {
        self.json().ok()?.get("code")?.as_i64()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking HTTP client bound to one transport target, holding the session
/// credential obtained at login.
pub struct HttpClient {
    transport: Transport,
    client: Client,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(transport: Transport) -> Result<Self> {
        let client = Client::builder()
            .timeout(transport.timeout)
            .danger_accept_invalid_certs(transport.accept_invalid_certs)
            .user_agent(concat!("kbctl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpClient {
            transport,
            client,
            token: None,
        })
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn url(&self, base: ApiBase, path: &str) -> String {
        format!("{}{}{}", self.transport.base_url(), base.prefix(), path)
    }

    pub fn request(
        &self,
        method: Method,
        base: ApiBase,
        path: &str,
        body: Option<&serde_json::Value>,
        auth: AuthKind,
    ) -> Result<Response> {
        let url = self.url(base, path);
        debug!(%method, %url, "sending request");
        let mut req = self.client.request(method, &url);
        match auth {
            AuthKind::Web | AuthKind::Admin => {
                if let Some(token) = &self.token {
                    req = req.header(AUTHORIZATION, token.clone());
                }
            }
            AuthKind::None => {}
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send()?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes()?.to_vec();
        Ok(Response {
            status,
            body,
            headers,
        })
    }

    /// Multipart upload, used for importing documents into a dataset.
    pub fn upload(&self, base: ApiBase, path: &str, form: Form, auth: AuthKind) -> Result<Response> {
        let url = self.url(base, path);
        debug!(%url, "uploading");
        let mut req = self.client.post(&url).multipart(form);
        if matches!(auth, AuthKind::Web | AuthKind::Admin) {
            if let Some(token) = &self.token {
                req = req.header(AUTHORIZATION, token.clone());
            }
        }
        let resp = req.send()?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes()?.to_vec();
        Ok(Response {
            status,
            body,
            headers,
        })
    }

    /// Health probe: `GET /v1/ping` must answer 200 with the exact body
    /// `pong`.
    pub fn ping(&self) -> Result<Response> {
        self.request(Method::GET, ApiBase::Web, "/ping", None, AuthKind::None)
    }

    pub fn is_alive(&self) -> bool {
        match self.ping() {
            Ok(resp) => resp.status == 200 && resp.body == b"pong",
            Err(_) => false,
        }
    }

    /// Full login flow: health precheck, password encryption, then the
    /// role-appropriate login endpoint. The session token comes back in the
    /// `Authorization` response header; its absence fails the login even if
    /// the body claims success.
    pub fn login(&mut self, mode: Mode, email: &str, password: &str) -> Result<()> {
        if !self.is_alive() {
            return Err(ClientError::Auth(format!(
                "server {} is not reachable",
                self.transport.base_url()
            )));
        }
        let encrypted = crypto::encrypt_password(password)?;
        let (base, path) = mode.login_route();
        let body = json!({ "email": email, "password": encrypted });
        let resp = self.request(Method::POST, base, path, Some(&body), AuthKind::None)?;
        let envelope = resp.json().unwrap_or(serde_json::Value::Null);
        let code = envelope.get("code").and_then(|c| c.as_i64());
        if resp.status != 200 || code != Some(0) {
            let message = envelope
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("login rejected");
            return Err(ClientError::Auth(message.to_owned()));
        }
        let token = resp
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| {
                ClientError::Auth("no authorization token in login response".to_owned())
            })?;
        self.token = Some(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_response_is_status_zero() {
        let resp = Response::failed();
        assert_eq!(resp.status, 0);
        assert!(resp.json().is_err());
        assert_eq!(resp.code(), None);
    }

    #[test]
    fn code_reads_the_json_envelope() {
        let resp = Response {
            status: 200,
            body: br#"{"code": 0, "message": "ok"}"#.to_vec(),
            headers: HeaderMap::new(),
        };
        assert_eq!(resp.code(), Some(0));
    }

    #[test]
    fn non_json_body_is_a_protocol_error() {
        let resp = Response {
            status: 200,
            body: b"pong".to_vec(),
            headers: HeaderMap::new(),
        };
        assert!(matches!(resp.json(), Err(ClientError::Protocol(_))));
    }

    #[test]
    fn login_routes_differ_by_mode() {
        assert_eq!(Mode::Admin.login_route(), (ApiBase::Admin, "/admin/login"));
        assert_eq!(Mode::User.login_route(), (ApiBase::Web, "/user/login"));
    }
}
