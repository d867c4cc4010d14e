//! Settings for the reqwest-backed transport.

use std::time::Duration;

/// How [`ReqwestTransport`](crate::ReqwestTransport) builds its client and
/// resolves GraphQL endpoints.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Server origin that relative endpoints such as `/graphql` are joined onto.
    pub base_url: Option<String>,
    /// Upper bound on one whole HTTP exchange, body included.
    pub timeout: Duration,
    /// Upper bound on establishing the TCP/TLS connection to the GraphQL server.
    pub connect_timeout: Duration,
    /// How long a kept-alive connection to the server may sit unused.
    pub pool_idle_timeout: Duration,
    /// Kept-alive connections reused across GraphQL calls to one server.
    pub pool_max_idle_per_host: usize,
    /// Headers attached to every call the transport sends.
    pub default_headers: Vec<(String, String)>,
    /// `User-Agent` reported to the GraphQL server.
    pub user_agent: String,
    /// Accept gzip-compressed response bodies.
    pub gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            default_headers: Vec::new(),
            user_agent: format!("relay-network-http/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
        }
    }
}

impl HttpClientConfig {
    /// Start from the defaults and adjust with a builder.
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Defaults plus the server origin relative endpoints resolve against.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }
}

/// Step-by-step construction of an [`HttpClientConfig`].
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Server origin for relative endpoints.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Limit a whole HTTP exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Limit connection setup.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// How long unused kept-alive connections survive.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// How many kept-alive connections to hold for reuse.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Attach a header to every call.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    /// Override the reported `User-Agent`.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Toggle gzip response decoding.
    pub fn gzip(mut self, enable: bool) -> Self {
        self.config.gzip = enable;
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HttpClientConfig::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.gzip);
        assert!(config.user_agent.starts_with("relay-network-http/"));
    }

    #[test]
    fn test_builder() {
        let config = HttpClientConfig::builder()
            .base_url("http://localhost:4000")
            .timeout(Duration::from_secs(5))
            .default_header("X-Client", "relay")
            .gzip(false)
            .build();

        assert_eq!(config.base_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(
            config.default_headers,
            vec![("X-Client".to_string(), "relay".to_string())]
        );
        assert!(!config.gzip);
    }
}
