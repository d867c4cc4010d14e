//! Network layer configuration.

/// Network layer configuration.
#[derive(Debug, Clone)]
pub struct NetworkLayerConfig {
    /// GraphQL endpoint URL, absolute or relative to the transport's base URL.
    pub endpoint: String,
    /// Endpoint for batched queries. Defaults to `<endpoint>/batch`.
    pub batch_endpoint: Option<String>,
    /// Headers added to every call.
    pub default_headers: Vec<(String, String)>,
    /// Send several queries in one call.
    pub batching: bool,
    /// Maximum number of queries per batched call.
    pub max_batch_size: usize,
}

impl Default for NetworkLayerConfig {
    fn default() -> Self {
        Self {
            endpoint: "/graphql".to_string(),
            batch_endpoint: None,
            default_headers: Vec::new(),
            batching: false,
            max_batch_size: 10,
        }
    }
}

impl NetworkLayerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> NetworkLayerConfigBuilder {
        NetworkLayerConfigBuilder::default()
    }

    /// Create configuration for a specific endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Endpoint used for batched calls.
    pub fn batch_endpoint(&self) -> String {
        match &self.batch_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("{}/batch", self.endpoint.trim_end_matches('/')),
        }
    }
}

/// Builder for [`NetworkLayerConfig`].
#[derive(Debug, Default)]
pub struct NetworkLayerConfigBuilder {
    config: NetworkLayerConfig,
}

impl NetworkLayerConfigBuilder {
    /// Set the GraphQL endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the endpoint for batched calls.
    pub fn batch_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.batch_endpoint = Some(endpoint.into());
        self
    }

    /// Add a header sent with every call.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .default_headers
            .push((name.into(), value.into()));
        self
    }

    /// Enable query batching.
    pub fn batching(mut self, enabled: bool) -> Self {
        self.config.batching = enabled;
        self
    }

    /// Set maximum batch size.
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.config.max_batch_size = size;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> NetworkLayerConfig {
        self.config
    }
}
