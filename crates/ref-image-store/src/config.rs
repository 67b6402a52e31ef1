use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Reference store configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub dir: PathBuf,
    /// Largest allowed image side in pixels before downscaling
    pub max_side: u32,
    /// Maximum file age; `<= 0` disables expiry
    pub ttl_hours: i64,
    /// Storage ceiling; `<= 0` disables the quota
    pub max_storage_mb: i64,
    pub clean_interval_min: i64,
    /// Reject undecodable uploads instead of storing them as-is
    pub strict_decode: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/refs"),
            max_side: 1600,
            ttl_hours: 24,
            max_storage_mb: 500,
            clean_interval_min: 30,
            strict_decode: false,
        }
    }
}

impl StoreConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let dir = env::var("REF_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.dir);

        let max_side = parse_var("MAX_REF_SIDE").unwrap_or(defaults.max_side);
        let ttl_hours = parse_var("REF_TTL_HOURS").unwrap_or(defaults.ttl_hours);
        let max_storage_mb = parse_var("MAX_REF_STORAGE_MB").unwrap_or(defaults.max_storage_mb);
        let clean_interval_min =
            parse_var("CLEAN_INTERVAL_MIN").unwrap_or(defaults.clean_interval_min);

        let strict_decode = env::var("REF_STRICT_DECODE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.strict_decode);

        Self {
            dir,
            max_side,
            ttl_hours,
            max_storage_mb,
            clean_interval_min,
            strict_decode,
        }
    }

    /// Quota in bytes, or `None` when disabled
    pub fn max_storage_bytes(&self) -> Option<u64> {
        (self.max_storage_mb > 0)
            .then(|| (self.max_storage_mb as u64).saturating_mul(1024 * 1024))
    }

    /// Janitor period, never shorter than one minute
    pub fn clean_interval(&self) -> Duration {
        Duration::from_secs((self.clean_interval_min.max(1) as u64).saturating_mul(60))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
