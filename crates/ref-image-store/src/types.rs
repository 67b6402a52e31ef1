//! Store types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image format family, derived from a declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageKind {
    /// Map a declared content type to a format family; unknown types are PNG.
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => ImageKind::Jpeg,
            "image/webp" => ImageKind::Webp,
            "image/gif" => ImageKind::Gif,
            _ => ImageKind::Png,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "png" => Some(ImageKind::Png),
            "jpg" => Some(ImageKind::Jpeg),
            "webp" => Some(ImageKind::Webp),
            "gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    /// File extension used in stored filenames
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Webp => "image/webp",
            ImageKind::Gif => "image/gif",
        }
    }
}

/// A file currently held in the store directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredImage {
    pub filename: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// Result of ingesting one reference image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRef {
    pub filename: String,
    pub content_hash: String,
    pub kind: ImageKind,
    pub size_bytes: u64,
    /// True when identical content was already on disk and nothing was written
    pub deduplicated: bool,
}

/// Statistics about the store directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub entries: usize,
    pub total_size: u64,
}

/// What a retention pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub removed: usize,
    pub freed_bytes: u64,
}

impl SweepReport {
    pub fn merge(self, other: SweepReport) -> SweepReport {
        SweepReport {
            removed: self.removed + other.removed,
            freed_bytes: self.freed_bytes + other.freed_bytes,
        }
    }
}
