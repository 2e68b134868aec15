use std::time::Duration;

/// Server configuration, read from the environment at startup and injected
/// into `build_app` so tests can construct their own.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub max_connections: u32,
    /// When true, X/O assignment is a coin flip instead of creator-is-X.
    pub randomize_symbols: bool,
    /// Optional endpoint that receives a JSON summary of each finished match.
    pub match_report_url: Option<String>,
    /// How often the cleanup task scans the registry.
    pub cleanup_interval: Duration,
    /// A room nobody ever joined sticks around this long.
    pub waiting_room_ttl: Duration,
    /// A finished room lingers this long so the players can negotiate a
    /// rematch.
    pub finished_room_ttl: Duration,
    /// Unanswered draw/rematch offers expire after this.
    pub offer_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 4000,
            max_connections: 100,
            randomize_symbols: true,
            match_report_url: None,
            cleanup_interval: Duration::from_secs(30),
            waiting_room_ttl: Duration::from_secs(600),
            finished_room_ttl: Duration::from_secs(120),
            offer_ttl: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            max_connections: std::env::var("GOMOKU_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            randomize_symbols: std::env::var("GOMOKU_RANDOMIZE_SYMBOLS")
                .map(|v| !matches!(v.as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.randomize_symbols),
            match_report_url: std::env::var("GOMOKU_MATCH_REPORT_URL").ok(),
            ..defaults
        }
    }
}
