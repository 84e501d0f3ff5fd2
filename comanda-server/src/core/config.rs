use std::time::Duration;

/// Server configuration
///
/// # Environment variables
///
/// Every setting can be overridden through the environment:
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | HTTP_PORT | 3000 | HTTP API port |
/// | PUSH_TCP_PORT | 8081 | Push channel TCP port |
/// | EVENT_QUEUE_CAPACITY | 64 | Per-subscriber event queue capacity |
/// | HEARTBEAT_INTERVAL_SECS | 20 | Push channel keep-alive interval |
/// | STORE_TIMEOUT_MS | 5000 | Order store call timeout |
/// | ENVIRONMENT | development | development \| staging \| production |
///
/// # Example
///
/// ```ignore
/// HTTP_PORT=8080 PUSH_TCP_PORT=9090 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API port
    pub http_port: u16,
    /// TCP push channel port (subscription channels)
    pub push_tcp_port: u16,
    /// Bounded capacity of each subscriber's event queue
    pub event_queue_capacity: usize,
    /// Idle keep-alive interval on push channels (seconds)
    pub heartbeat_interval_secs: u64,
    /// Bounded timeout for order store calls (milliseconds)
    pub store_timeout_ms: u64,
    /// Runtime environment: development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            push_tcp_port: std::env::var("PUSH_TCP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8081),
            event_queue_capacity: std::env::var("EVENT_QUEUE_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(64),
            heartbeat_interval_secs: std::env::var("HEARTBEAT_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(20),
            store_timeout_ms: std::env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Override ports, commonly used by tests
    pub fn with_ports(http_port: u16, push_tcp_port: u16) -> Self {
        let mut config = Self::from_env();
        config.http_port = http_port;
        config.push_tcp_port = push_tcp_port;
        config
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
