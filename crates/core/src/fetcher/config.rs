//! Configuration for the fetcher module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration shared by the media fetchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// HTTP download timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// yt-dlp download timeout in seconds.
    #[serde(default = "default_ytdlp_timeout")]
    pub ytdlp_timeout_secs: u64,

    /// Proxy URL for downloads (e.g. "http://127.0.0.1:7890").
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Comma-separated hosts that bypass the proxy.
    #[serde(default)]
    pub proxy_bypass: Option<String>,

    /// Path to the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Cookies file passed to yt-dlp (for login-gated media).
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,

    /// yt-dlp player client. "android" requires a po_token.
    #[serde(default = "default_player_client")]
    pub player_client: String,

    /// Proof-of-origin token for the android player client.
    #[serde(default)]
    pub po_token: Option<String>,
}

fn default_timeout() -> u64 {
    60
}

fn default_ytdlp_timeout() -> u64 {
    1800 // 30 minutes
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_player_client() -> String {
    "default".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            ytdlp_timeout_secs: default_ytdlp_timeout(),
            proxy_url: None,
            proxy_bypass: None,
            ytdlp_path: default_ytdlp_path(),
            cookies_file: None,
            player_client: default_player_client(),
            po_token: None,
        }
    }
}

impl FetcherConfig {
    /// Proxy URL if it looks valid. Guards against "true"/"false" leaking in
    /// from environment configuration.
    pub fn effective_proxy(&self) -> Option<&str> {
        self.proxy_url.as_deref().filter(|url| {
            url.starts_with("http://")
                || url.starts_with("https://")
                || url.starts_with("socks5://")
                || url.starts_with("socks5h://")
        })
    }

    /// Player client, falling back to "default" when "android" is configured
    /// without the po_token it needs.
    pub fn effective_player_client(&self) -> &str {
        if self.player_client.eq_ignore_ascii_case("android") && self.po_token.is_none() {
            "default"
        } else {
            &self.player_client
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetcherConfig::default();
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.ytdlp_timeout_secs, 1800);
        assert_eq!(config.ytdlp_path, PathBuf::from("yt-dlp"));
        assert!(config.proxy_url.is_none());
    }

    #[test]
    fn test_effective_proxy_rejects_garbage() {
        let mut config = FetcherConfig::default();
        config.proxy_url = Some("true".to_string());
        assert!(config.effective_proxy().is_none());

        config.proxy_url = Some("http://127.0.0.1:7890".to_string());
        assert_eq!(config.effective_proxy(), Some("http://127.0.0.1:7890"));

        config.proxy_url = Some("socks5://127.0.0.1:1080".to_string());
        assert!(config.effective_proxy().is_some());
    }

    #[test]
    fn test_android_client_without_token_falls_back() {
        let mut config = FetcherConfig::default();
        config.player_client = "android".to_string();
        assert_eq!(config.effective_player_client(), "default");

        config.po_token = Some("android.gvs+XXXX".to_string());
        assert_eq!(config.effective_player_client(), "android");
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: FetcherConfig = toml::from_str("").unwrap();
        assert_eq!(config.player_client, "default");
    }
}
