//! WebUntis source configuration.

use std::time::Duration;
use url::Url;

/// Configuration for the WebUntis source.
#[derive(Clone)]
pub struct WebUntisConfig {
    /// JSON-RPC endpoint, including the `school` query parameter.
    pub endpoint: Url,

    /// School name as used in the login URL.
    pub school: String,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: String,

    /// Client identifier sent with every request.
    pub client_name: String,

    /// Maximum number of days per `getTimetable` request.
    pub chunk_days: u32,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl WebUntisConfig {
    /// Default days per timetable request.
    pub const DEFAULT_CHUNK_DAYS: u32 = 28;

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for `server` and `school`.
    ///
    /// `server` is a host name such as `mese.webuntis.com`; an explicit
    /// `http://` or `https://` prefix is kept as given.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting endpoint URL is invalid.
    pub fn new(server: impl AsRef<str>, school: impl Into<String>) -> Result<Self, url::ParseError> {
        let school = school.into();
        let endpoint = endpoint_url(server.as_ref(), &school)?;
        Ok(Self {
            endpoint,
            school,
            username: String::new(),
            password: String::new(),
            client_name: "untiscal".to_string(),
            chunk_days: Self::DEFAULT_CHUNK_DAYS,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("untiscal/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Sets the credentials for authentication.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the number of days per timetable request.
    pub fn with_chunk_days(mut self, days: u32) -> Self {
        self.chunk_days = days.max(1);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the endpoint as a string.
    pub fn endpoint_str(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Returns true if credentials are configured.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for WebUntisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebUntisConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("chunk_days", &self.chunk_days)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn endpoint_url(server: &str, school: &str) -> Result<Url, url::ParseError> {
    let server = server.trim().trim_end_matches('/');
    let base = if server.contains("://") {
        server.to_string()
    } else {
        format!("https://{server}")
    };
    let mut url = Url::parse(&format!("{base}/WebUntis/jsonrpc.do"))?;
    url.query_pairs_mut().append_pair("school", school);
    Ok(url)
}
