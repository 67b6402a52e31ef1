//! Content-addressed reference image store
//!
//! Accepts uploaded or base64-encoded images, downsizes oversized ones,
//! stores them on disk under a hash of their contents, and reclaims space
//! with TTL expiry and an oldest-first storage quota. A background janitor
//! re-applies the retention policy on a timer.

mod config;
mod data_url;
mod error;
mod janitor;
mod normalize;
mod public_url;
mod retention;
mod store;
mod types;

pub use config::StoreConfig;
pub use data_url::decode_data_url_or_base64;
pub use error::{Result, StoreError};
pub use janitor::Janitor;
pub use normalize::{inspect, normalize, Normalized};
pub use public_url::{ref_url, resolve_public_base, RequestOrigin};
pub use retention::RetentionPolicy;
pub use store::RefStore;
pub use types::{ImageKind, StoreStats, StoredImage, StoredRef, SweepReport};
