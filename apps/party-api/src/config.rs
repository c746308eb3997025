/// Party API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// How many recent chat messages the party detail view returns.
    pub chat_history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4100,
            chat_history_limit: 50,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every knob has a default, so a bare environment works.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4100),
            chat_history_limit: std::env::var("CHAT_HISTORY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
        }
    }
}
