use std::time::Duration;

/// Settings for the shared outbound HTTP client.
///
/// Per-request deadlines come from the caller; `request_timeout` is only the
/// upper bound for requests that do not set one.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builds the HTTP client shared by the provider transport and the token
/// exchange.
///
/// # Features
/// - **Connection pooling**: idle connections are kept per host for reuse
/// - **Compression**: gzip, deflate, brotli and zstd responses
/// - **HTTP/2**: adaptive window sizing and keep-alive pings
/// - **Security**: Rustls for TLS, no OpenSSL dependency
pub fn build_http_client(config: &HttpClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        // Timeouts
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        // Connection pooling
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        // HTTP/2 settings
        .http2_adaptive_window(true)
        .http2_keep_alive_interval(Duration::from_secs(10))
        .http2_keep_alive_timeout(Duration::from_secs(20))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .zstd(true)
        .user_agent(config.user_agent.as_str())
        .build()
}
