use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_WATCHLIST_PATH: &str = "polyscan_watchlist.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root of the analysis service; the stream lives at `{base}/api/analyze`.
    pub analyzer_base_url: String,
    pub watchlist_path: PathBuf,
    pub connect_timeout: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let analyzer_base_url = env::var("ANALYZER_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        if !analyzer_base_url.starts_with("http://") && !analyzer_base_url.starts_with("https://")
        {
            anyhow::bail!("ANALYZER_BASE_URL must be an http(s) URL, got {analyzer_base_url}");
        }

        let connect_timeout_secs: u64 = env::var("CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .map_err(|e| anyhow::anyhow!("CONNECT_TIMEOUT_SECS must be an integer: {e}"))?;

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".into())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            analyzer_base_url,
            watchlist_path: env::var("WATCHLIST_PATH")
                .unwrap_or_else(|_| DEFAULT_WATCHLIST_PATH.into())
                .into(),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            log_format,
        })
    }

    /// Full URL of the SSE analysis endpoint.
    pub fn stream_endpoint(&self) -> String {
        format!("{}/api/analyze", self.analyzer_base_url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analyzer_base_url: DEFAULT_BASE_URL.into(),
            watchlist_path: DEFAULT_WATCHLIST_PATH.into(),
            connect_timeout: Duration::from_secs(10),
            log_format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_endpoint() {
        let config = AppConfig {
            analyzer_base_url: "https://scan.example.com".into(),
            ..AppConfig::default()
        };
        assert_eq!(config.stream_endpoint(), "https://scan.example.com/api/analyze");
    }
}
