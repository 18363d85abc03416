pub mod ai;
pub mod assemble;
pub mod extract;
pub mod fetch;
pub mod images;
pub mod platform;
pub mod sanitize;
pub mod utils;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::FetchError;

/// Fatal pipeline errors. Everything else degrades to a fallback value and
/// never reaches the caller.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("invalid URL `{0}`")]
    InvalidUrl(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Videos,
    Coding,
    Shopping,
    Research,
    Articles,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Videos => "Videos",
            Category::Coding => "Coding",
            Category::Shopping => "Shopping",
            Category::Research => "Research",
            Category::Articles => "Articles",
        }
    }

    /// Case-insensitive parse, tolerant of singular/plural variants the
    /// model tends to produce. Anything else is rejected so the caller can
    /// fall back to the heuristic category.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "videos" | "video" => Some(Category::Videos),
            "coding" | "code" => Some(Category::Coding),
            "shopping" => Some(Category::Shopping),
            "research" => Some(Category::Research),
            "articles" | "article" => Some(Category::Articles),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Advanced => "Advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "beginner" => Some(Difficulty::Easy),
            "medium" | "intermediate" => Some(Difficulty::Medium),
            "advanced" | "hard" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

/// Platform fields surfaced on the result record. Scraped values are
/// authoritative; the model may only fill gaps (e.g. likes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// The normalized content record produced for every analyzed URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub title: String,
    /// Sanitized reader-mode HTML, never empty.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub images: Vec<String>,
    pub video_embed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_description: Option<String>,
    pub summary: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub reading_time: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specifications: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResultMetadata>,
    pub date: String,
    pub used_model: String,
}
