use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the message API, e.g. "http://localhost:5000/api"
    pub base_url: String,
    /// Wallet address forwarded with reveal/delete requests, if known
    pub wallet_address: Option<String>,
    /// Transport-level request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Countdown evaluation period in seconds (default: 1)
    pub tick_interval_secs: u64,
    /// How long a transient notice stays visible in seconds (default: 3)
    pub notice_ttl_secs: u64,
    /// Directory revealed documents are saved into
    pub download_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            api: ApiConfig {
                base_url: std::env::var("API_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:5000/api".to_string()),
                wallet_address: std::env::var("WALLET_ADDRESS").ok(),
                request_timeout_secs: std::env::var("API_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
            engine: EngineConfig {
                tick_interval_secs: std::env::var("TICK_INTERVAL_SECS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
                notice_ttl_secs: std::env::var("NOTICE_TTL_SECS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                download_dir: std::env::var("DOWNLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(".")),
            },
        })
    }
}
