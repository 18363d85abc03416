use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::AnalyzeError;

/// Source platform, decided by substring heuristics on the absolute URL.
/// Misclassification is accepted behavior; the pipeline only uses this to
/// pick extraction strategies, not to gate anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    GitHub,
    Shopping,
    Generic,
}

impl Platform {
    /// Checked in priority order: video platforms first, then code hosting,
    /// then storefront markers.
    pub fn classify(absolute: &str) -> Self {
        let lower = absolute.to_ascii_lowercase();
        if lower.contains("youtube.com") || lower.contains("youtu.be") {
            Platform::YouTube
        } else if lower.contains("github.com") {
            Platform::GitHub
        } else if lower.contains("amazon") || lower.contains("amzn") || lower.contains("ebay") {
            Platform::Shopping
        } else {
            Platform::Generic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::GitHub => "github",
            Platform::Shopping => "shopping",
            Platform::Generic => "web",
        }
    }
}

/// A raw input string canonicalized into an absolute URL with its platform
/// classification. All relative-URL resolution downstream joins against
/// `url`, so this must exist before any fetch or parse happens.
#[derive(Debug, Clone)]
pub struct NormalizedUrl {
    pub raw: String,
    pub url: Url,
    pub platform: Platform,
}

impl NormalizedUrl {
    pub fn parse(raw: &str) -> Result<Self, AnalyzeError> {
        let trimmed = raw.trim();
        let absolute = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        let url = Url::parse(&absolute).map_err(|_| AnalyzeError::InvalidUrl(raw.to_string()))?;
        let platform = Platform::classify(url.as_str());
        Ok(Self {
            raw: raw.to_string(),
            url,
            platform,
        })
    }

    pub fn absolute(&self) -> &str {
        self.url.as_str()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

static YOUTUBE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtu\.be/|[?&]v=|/embed/|/v/|/shorts/)([A-Za-z0-9_-]{11})")
        .expect("YOUTUBE_ID_RE should compile")
});

pub fn youtube_video_id(absolute: &str) -> Option<&str> {
    YOUTUBE_ID_RE
        .captures(absolute)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Embed URL for recognized video platforms, None for everything else.
pub fn video_embed_url(target: &NormalizedUrl) -> Option<String> {
    let host = target.host().to_ascii_lowercase();
    if host.contains("youtube.com") || host.contains("youtu.be") {
        return youtube_video_id(target.absolute())
            .map(|id| format!("https://www.youtube.com/embed/{id}"));
    }
    if host.contains("vimeo.com") {
        let id = target
            .url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .filter(|s| s.chars().all(|c| c.is_ascii_digit()))?;
        return Some(format!("https://player.vimeo.com/video/{id}"));
    }
    None
}
