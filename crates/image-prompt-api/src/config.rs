use std::env;

use ref_image_store::StoreConfig;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `*` allows any origin
    pub allow_origins: Vec<String>,
    /// When set, generate requests must carry a Referer from this origin
    pub wp_origin: Option<String>,
    pub max_upload_mb: usize,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            allow_origins: vec!["*".to_string()],
            wp_origin: None,
            max_upload_mb: 20,
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let allow_origins = env::var("ALLOW_ORIGINS")
            .map(|s| parse_origins(&s))
            .unwrap_or(defaults.allow_origins);

        let wp_origin = env::var("WP_ORIGIN")
            .ok()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty());

        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_upload_mb);

        Self {
            port,
            allow_origins,
            wp_origin,
            max_upload_mb,
            store: StoreConfig::from_env(),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.max(1) * 1024 * 1024
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allow_origins.iter().any(|o| o == "*")
    }
}

/// Comma-separated origins with trailing slashes stripped; empty means `*`
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}
