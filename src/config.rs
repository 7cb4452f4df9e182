/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory for `cache/` and `history/`.
    pub data_dir: String,
    /// Whether successful upstream fetches are also archived under `history/`.
    pub save_history: bool,
    pub user_agent: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            save_history: std::env::var("SAVE_HISTORY")
                .map(|v| v == "1")
                .unwrap_or(false),
            user_agent: std::env::var("YR_USER_AGENT").unwrap_or_else(|_| {
                "LedCast/0.1 github.com/LC-Zurich-Doppelstock/ledcast".to_string()
            }),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
        }
    }
}
