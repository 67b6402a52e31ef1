//! Response types for the image prompt API

use ref_image_store::StoreStats;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub uptime_secs: u64,
    pub refs: StoreStats,
}
