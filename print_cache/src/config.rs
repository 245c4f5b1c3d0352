//! Cache and HTTP configuration
//!
//! Defaults can be overridden through environment variables:
//! - `SCRYFALL_DATA_DIR`: directory holding the bulk files
//! - `SCRYFALL_UA`: User-Agent sent to Scryfall
//! - `SCRYFALL_HTTP_RETRIES`, `SCRYFALL_HTTP_BACKOFF`: retry budget and backoff factor (seconds)
//! - `SCRYFALL_HTTP_STATUS_FORCELIST`: comma-separated status codes that trigger a retry

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "D2D-Automations-PrintCache/1.0";
pub const BULK_INDEX_URL: &str = "https://api.scryfall.com/bulk-data";
pub const API_BASE_URL: &str = "https://api.scryfall.com";
/// Upper bound for the backoff factor, in seconds
pub const MAX_BACKOFF_FACTOR: f64 = 60.0;
pub const DEFAULT_STATUS_FORCELIST: [u16; 5] = [429, 500, 502, 503, 504];
pub const DEFAULT_CARDS_FILE: &str = "scryfall_default_cards.json";
pub const RULINGS_FILE: &str = "scryfall_rulings.json";
/// Bulk files older than this are reported as stale
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 3600);

/// HTTP client settings for the bulk download manager
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub bulk_index_url: String,
    /// Base URL for single-card lookups
    pub api_base_url: String,
    /// Retries on top of the first attempt
    pub max_retries: u32,
    /// Backoff factor in seconds; retry `n` waits about `factor * 2^n`
    pub backoff_factor: f64,
    pub status_forcelist: Vec<u16>,
    pub metadata_timeout: Duration,
    pub download_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bulk_index_url: BULK_INDEX_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            max_retries: 5,
            backoff_factor: 0.5,
            status_forcelist: DEFAULT_STATUS_FORCELIST.to_vec(),
            metadata_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(600),
        }
    }
}

impl HttpConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(ua) = std::env::var("SCRYFALL_UA") {
            if !ua.trim().is_empty() {
                config.user_agent = ua.trim().to_string();
            }
        }
        if let Some(retries) = env_parse::<u32>("SCRYFALL_HTTP_RETRIES") {
            config.max_retries = retries;
        }
        if let Ok(raw) = std::env::var("SCRYFALL_HTTP_BACKOFF") {
            match parse_backoff(&raw) {
                Some(factor) => config.backoff_factor = factor,
                None => log::warn!("Ignoring invalid value for SCRYFALL_HTTP_BACKOFF: {:?}", raw),
            }
        }
        if let Ok(raw) = std::env::var("SCRYFALL_HTTP_STATUS_FORCELIST") {
            config.status_forcelist = parse_status_list(&raw);
        }
        config
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    /// Base delay for the exponential retry backoff.
    ///
    /// The factor is clamped to `0..=MAX_BACKOFF_FACTOR`; non-finite values
    /// mean no delay.
    pub fn base_delay(&self) -> Duration {
        if !self.backoff_factor.is_finite() {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.backoff_factor.clamp(0.0, MAX_BACKOFF_FACTOR))
            .unwrap_or_default()
    }
}

/// Parse a backoff factor in seconds.
/// Negative values become zero and large ones are capped at `MAX_BACKOFF_FACTOR`.
pub fn parse_backoff(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    value
        .is_finite()
        .then(|| value.clamp(0.0, MAX_BACKOFF_FACTOR))
}

/// Parse a comma-separated status list, ignoring invalid tokens.
/// Falls back to the default list when nothing valid remains.
pub fn parse_status_list(raw: &str) -> Vec<u16> {
    let codes: Vec<u16> = raw
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse().ok())
        .collect();
    if codes.is_empty() {
        DEFAULT_STATUS_FORCELIST.to_vec()
    } else {
        codes
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

/// Where bulk files live and how the engine talks to Scryfall
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub data_dir: PathBuf,
    pub prints_path: PathBuf,
    pub rulings_path: PathBuf,
    pub max_age: Duration,
    pub http: HttpConfig,
}

impl CacheConfig {
    /// Configuration rooted at `data_dir` with default file names
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            prints_path: data_dir.join(DEFAULT_CARDS_FILE),
            rulings_path: data_dir.join(RULINGS_FILE),
            data_dir,
            max_age: DEFAULT_MAX_AGE,
            http: HttpConfig::default(),
        }
    }

    pub fn from_env() -> Self {
        let data_dir = std::env::var_os("SCRYFALL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        Self {
            http: HttpConfig::from_env(),
            ..Self::with_data_dir(data_dir)
        }
    }

    /// On-disk location for a bulk dataset kind
    pub fn dataset_path(&self, kind: &str) -> PathBuf {
        match kind {
            "default_cards" => self.prints_path.clone(),
            "rulings" => self.rulings_path.clone(),
            other => self.data_dir.join(format!("{}.json", other)),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Returns the default data directory: ~/.local/share/print_cache
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("print_cache")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_list_ignores_garbage() {
        assert_eq!(parse_status_list("429, 503,abc,,500"), vec![429, 503, 500]);
    }

    #[test]
    fn empty_status_list_falls_back_to_default() {
        assert_eq!(parse_status_list(""), DEFAULT_STATUS_FORCELIST.to_vec());
        assert_eq!(parse_status_list("x,y"), DEFAULT_STATUS_FORCELIST.to_vec());
    }

    #[test]
    fn base_delay_follows_backoff_factor() {
        let http = HttpConfig::default();
        assert_eq!(http.base_delay(), Duration::from_millis(500));
    }

    #[test]
    fn base_delay_survives_out_of_range_factors() {
        for factor in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN, -3.0] {
            let http = HttpConfig {
                backoff_factor: factor,
                ..HttpConfig::default()
            };
            assert_eq!(http.base_delay(), Duration::ZERO, "factor {factor}");
        }
        let http = HttpConfig {
            backoff_factor: 1e300,
            ..HttpConfig::default()
        };
        assert_eq!(
            http.base_delay(),
            Duration::from_secs_f64(MAX_BACKOFF_FACTOR)
        );
    }

    #[test]
    fn backoff_parsing_rejects_non_finite_values() {
        assert_eq!(parse_backoff(" 1.5 "), Some(1.5));
        assert_eq!(parse_backoff("-2"), Some(0.0));
        assert_eq!(parse_backoff("1e300"), Some(MAX_BACKOFF_FACTOR));
        assert_eq!(parse_backoff("inf"), None);
        assert_eq!(parse_backoff("NaN"), None);
        assert_eq!(parse_backoff("soon"), None);
    }

    #[test]
    fn dataset_paths() {
        let config = CacheConfig::with_data_dir("/tmp/data");
        assert_eq!(
            config.dataset_path("default_cards"),
            PathBuf::from("/tmp/data/scryfall_default_cards.json")
        );
        assert_eq!(
            config.dataset_path("rulings"),
            PathBuf::from("/tmp/data/scryfall_rulings.json")
        );
        assert_eq!(
            config.dataset_path("oracle_cards"),
            PathBuf::from("/tmp/data/oracle_cards.json")
        );
    }
}
