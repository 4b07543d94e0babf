//! Fetcher data types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Kind of media source, controlling which fetcher variant handles it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Plain HTTP/HTTPS download.
    Url,
    /// YouTube link, fetched through yt-dlp.
    Youtube,
}

impl SourceKind {
    /// Classify a URL when no explicit hint was given.
    pub fn classify(url: &str) -> SourceKind {
        static YOUTUBE_RE: OnceLock<regex_lite::Regex> = OnceLock::new();
        let re = YOUTUBE_RE
            .get_or_init(|| regex_lite::Regex::new(r"(?i)youtube\.com|youtu\.be").unwrap());
        if re.is_match(url) {
            SourceKind::Youtube
        } else {
            SourceKind::Url
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Url => "url",
            SourceKind::Youtube => "youtube",
        }
    }
}

/// A fetch request handed to the fetcher by the pipeline.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Remote media URL.
    pub url: String,
    /// Explicit source kind; classified from the URL when absent.
    pub source_kind: Option<SourceKind>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source_kind: None,
        }
    }

    /// Resolve the effective source kind.
    pub fn kind(&self) -> SourceKind {
        self.source_kind
            .unwrap_or_else(|| SourceKind::classify(&self.url))
    }
}

/// Media downloaded into the task's working directory.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    /// Local path of the downloaded file.
    pub path: PathBuf,
    /// Title or filename base derived from the source.
    pub title: String,
    /// Downloaded size in bytes.
    pub size_bytes: u64,
}
