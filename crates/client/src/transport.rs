use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9381;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable connection target. Benchmark workers clone this freely;
/// session state (the login token) never lives here.
#[derive(Debug, Clone)]
pub struct Transport {
    pub host: String,
    pub port: u16,
    pub https: bool,
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
}

impl Default for Transport {
    fn default() -> Self {
        Transport {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            https: false,
            accept_invalid_certs: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Transport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Transport {
            host: host.into(),
            port,
            ..Transport::default()
        }
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

/// Which URL prefix an operation goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiBase {
    /// Administrative surface, `/api/v1`.
    Admin,
    /// Regular web surface, `/v1`.
    Web,
}

impl ApiBase {
    pub fn prefix(self) -> &'static str {
        match self {
            ApiBase::Admin => "/api/v1",
            ApiBase::Web => "/v1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_reflects_scheme() {
        let mut t = Transport::new("example.com", 9381);
        assert_eq!(t.base_url(), "http://example.com:9381");
        t.https = true;
        assert_eq!(t.base_url(), "https://example.com:9381");
    }

    #[test]
    fn api_prefixes() {
        assert_eq!(ApiBase::Admin.prefix(), "/api/v1");
        assert_eq!(ApiBase::Web.prefix(), "/v1");
    }
}
