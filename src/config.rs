use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquitySource {
    Yahoo,
    Finnhub,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_db: String,

    pub refresh_interval: Duration,
    pub http_timeout: Duration,
    pub shutdown_grace: Duration,

    pub static_dir: String,

    pub equity_source: EquitySource,
    pub finnhub_api_key: String,
    pub yahoo_base_url: String,
    pub finnhub_base_url: String,
    pub coingecko_base_url: String,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_secs(name: &str, default: u64) -> Duration {
    let secs = env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let host = env_str("HOST", "127.0.0.1");

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or(8080);

    let store_backend = match env_str("STORE_BACKEND", "mongo").to_lowercase().as_str() {
        "memory" => StoreBackend::Memory,
        _ => StoreBackend::Mongo,
    };

    let finnhub_api_key = env::var("FINNHUB_API_KEY").unwrap_or_default();

    // finnhub needs a key; without one we stay on the keyless chart API
    let equity_source = match env_str("EQUITY_SOURCE", "yahoo").to_lowercase().as_str() {
        "finnhub" if !finnhub_api_key.trim().is_empty() => EquitySource::Finnhub,
        _ => EquitySource::Yahoo,
    };

    Settings {
        host,
        port,
        store_backend,
        mongodb_uri: env_str("MONGODB_URI", "mongodb://localhost:27017"),
        mongodb_db: env_str("MONGODB_DB", "portfoliopulse"),
        refresh_interval: env_secs("REFRESH_INTERVAL_SECS", 30),
        http_timeout: env_secs("HTTP_TIMEOUT_SECS", 10),
        shutdown_grace: env_secs("SHUTDOWN_GRACE_SECS", 8),
        static_dir: env_str("STATIC_DIR", "web/dist"),
        equity_source,
        finnhub_api_key,
        yahoo_base_url: env_str("YAHOO_BASE_URL", "https://query2.finance.yahoo.com"),
        finnhub_base_url: env_str("FINNHUB_BASE_URL", "https://finnhub.io"),
        coingecko_base_url: env_str("COINGECKO_BASE_URL", "https://api.coingecko.com"),
    }
}

impl Settings {
    /// Settings for tests and embedded use: in-memory store, no env lookup.
    pub fn for_tests() -> Self {
        Settings {
            host: "127.0.0.1".to_string(),
            port: 0,
            store_backend: StoreBackend::Memory,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "portfoliopulse_test".to_string(),
            refresh_interval: Duration::from_secs(30),
            http_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(1),
            static_dir: "web/dist".to_string(),
            equity_source: EquitySource::Yahoo,
            finnhub_api_key: String::new(),
            yahoo_base_url: "http://127.0.0.1:9".to_string(),
            finnhub_base_url: "http://127.0.0.1:9".to_string(),
            coingecko_base_url: "http://127.0.0.1:9".to_string(),
        }
    }
}
