//! Settings for [`HyperTransport`](crate::HyperTransport).

use std::time::Duration;

/// Default size of the chunks an upload body is streamed in.
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// Timeouts, connection pooling and upload chunking of a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Deadline for a whole exchange, response body included.
    pub timeout: Duration,
    /// Deadline for establishing the TCP and TLS connection.
    pub connect_timeout: Duration,
    /// Idle keep-alive connections kept per host.
    pub pool_idle_per_host: usize,
    /// How long an idle connection stays in the pool.
    pub pool_idle_timeout: Duration,
    /// Size of the chunks a request body is streamed in; one upload progress
    /// event is reported per chunk.
    pub upload_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Start from the defaults.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`]; unset values keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Deadline for a whole exchange.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Deadline for connecting.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Idle connections kept per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config.pool_idle_per_host = count;
        self
    }

    /// Lifetime of an idle pooled connection.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Upload chunk size in bytes. Zero is treated as one.
    #[must_use]
    pub const fn upload_chunk_size(mut self, size: usize) -> Self {
        self.config.upload_chunk_size = size;
        self
    }

    /// Finish the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            upload_chunk_size: self.config.upload_chunk_size.max(1),
            ..self.config
        }
    }
}
