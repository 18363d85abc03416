//! Final assembly: merges extractor outputs into the result record, with an
//! AI pass when configured and a heuristic fallback otherwise. AI failure is
//! absorbed here; only the upstream fetch can fail an analysis.

use chrono::Utc;
use scraper::Html;

use crate::ai::{AiAnalysis, AiAnalyzer, AnalysisInput};
use crate::extract::{self, PageMetadata};
use crate::fetch::{Fetcher, OEmbed};
use crate::images;
use crate::platform::{NormalizedUrl, Platform};
use crate::sanitize;
use crate::utils;
use crate::{AnalyzeError, Category, Difficulty, ExtractionResult, ResultMetadata};

pub const MANUAL_FALLBACK_MODEL: &str = "Manual Fallback";

const MAX_AI_CONTEXT_CHARS: usize = 20_000;
const MAX_CAROUSEL_IMAGES: usize = 8;
const WORDS_PER_MINUTE: usize = 200;
const LONG_READ_MINUTES: usize = 10;

const EASY_WORD_LIMIT: usize = 800;
const MEDIUM_WORD_LIMIT: usize = 1500;

const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Coding,
        &["code", "programming", "developer", "software", "api", "function", "library", "framework", "compiler", "debugging"],
    ),
    (
        Category::Research,
        &["study", "research", "paper", "analysis", "university", "journal", "experiment", "findings", "dataset", "hypothesis"],
    ),
    (
        Category::Shopping,
        &["price", "buy", "cart", "shipping", "discount", "deal", "checkout", "order"],
    ),
    (
        Category::Videos,
        &["video", "watch", "episode", "stream", "channel"],
    ),
];

const TUTORIAL_MARKERS: &[&str] = &["tutorial", "how to", "step by step", "getting started"];

/// Everything derived from one parsed document. Produced synchronously so no
/// parse state crosses an await point; discarded after assembly.
#[derive(Debug, Clone)]
pub struct DocumentParts {
    pub metadata: PageMetadata,
    pub images: Vec<String>,
    pub content: String,
    pub text: String,
}

/// Parse + sanitize + extract, in one synchronous pass.
pub fn extract_document(
    html: &str,
    target: &NormalizedUrl,
    oembed: Option<&OEmbed>,
) -> DocumentParts {
    let document = Html::parse_document(html);
    let metadata = extract::extract_metadata(&document, target, oembed);
    let images = images::collect_images(&document, target, metadata.image.as_deref());
    let content = sanitize::reader_content(&document, &target.url);
    let text = sanitize::visible_text(&document);
    DocumentParts {
        metadata,
        images,
        content,
        text,
    }
}

/// The text block handed to the model: a compact structured block for
/// videos (page text is mostly chrome there), capped visible text otherwise.
pub fn ai_context(parts: &DocumentParts, target: &NormalizedUrl) -> String {
    match target.platform {
        Platform::YouTube => format!(
            "Video title: {}\nChannel: {}\nDescription: {}",
            parts.metadata.title,
            parts.metadata.author.as_deref().unwrap_or("Unknown"),
            parts.metadata.description,
        ),
        _ => utils::truncate_chars(&parts.text, MAX_AI_CONTEXT_CHARS).to_string(),
    }
}

pub struct ContentPipeline {
    fetcher: Fetcher,
    ai: Option<AiAnalyzer>,
}

impl ContentPipeline {
    pub fn new(ai: Option<AiAnalyzer>) -> Result<Self, AnalyzeError> {
        Ok(Self {
            fetcher: Fetcher::new()?,
            ai,
        })
    }

    /// Run the full pipeline for one URL. Only input and fetch errors
    /// surface; extraction and AI problems degrade inside the record.
    pub async fn analyze(&self, raw_url: &str) -> Result<ExtractionResult, AnalyzeError> {
        let target = NormalizedUrl::parse(raw_url)?;

        // Independent requests; both must land before extraction starts.
        let (html, oembed) = futures::join!(
            self.fetcher.fetch_html(&target),
            self.fetcher.fetch_oembed(&target)
        );
        let html = html?;

        let parts = extract_document(&html, &target, oembed.as_ref());

        let ai_result = match &self.ai {
            Some(analyzer) => {
                let context = ai_context(&parts, &target);
                let input = AnalysisInput {
                    url: target.absolute(),
                    platform: target.platform.name(),
                    title: &parts.metadata.title,
                    context: &context,
                    stars: parts.metadata.stars.as_deref(),
                    forks: parts.metadata.forks.as_deref(),
                    author: parts.metadata.author.as_deref(),
                    price: parts.metadata.price.as_deref(),
                };
                match analyzer.analyze(&input).await {
                    Ok(analysis) => Some(analysis),
                    Err(e) => {
                        tracing::warn!("AI analysis unavailable, using manual fallback: {e}");
                        None
                    }
                }
            }
            None => None,
        };

        Ok(assemble(&target, parts, ai_result))
    }
}

/// Merge everything into the final record. `ai` of None means the manual
/// fallback path.
pub fn assemble(
    target: &NormalizedUrl,
    parts: DocumentParts,
    ai: Option<AiAnalysis>,
) -> ExtractionResult {
    let DocumentParts {
        metadata,
        mut images,
        content,
        text,
    } = parts;

    images.truncate(MAX_CAROUSEL_IMAGES);

    let word_count = text.split_whitespace().count();
    let minutes = reading_minutes(word_count);
    let manual_category = fallback_category(target.platform, &text);
    let manual_difficulty = difficulty_for(word_count);
    let manual_tags = fallback_tags(manual_category, target.platform, &text, minutes);
    let manual_summary = fallback_summary(&metadata.description, &text);

    let mut result_metadata = ResultMetadata {
        stars: metadata.stars.clone(),
        forks: metadata.forks.clone(),
        author: metadata.author.clone(),
        price: metadata.price.clone(),
        platform: Some(target.platform.name().to_string()),
        ..ResultMetadata::default()
    };

    let (summary, category, difficulty, reading_time, tags, specifications, used_model) = match ai {
        Some(analysis) => {
            // Scraped fields stay authoritative; the model may only add.
            if let Some(likes) = analysis
                .metadata
                .as_ref()
                .and_then(|m| m["likes"].as_str())
                .filter(|l| !l.is_empty())
            {
                result_metadata.likes = Some(likes.to_string());
            }
            (
                analysis
                    .summary
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(manual_summary),
                analysis
                    .category
                    .as_deref()
                    .and_then(Category::parse)
                    .unwrap_or(manual_category),
                analysis
                    .difficulty
                    .as_deref()
                    .and_then(Difficulty::parse)
                    .unwrap_or(manual_difficulty),
                analysis
                    .reading_time
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| format_reading_time(minutes)),
                if analysis.tags.is_empty() {
                    manual_tags
                } else {
                    analysis.tags
                },
                analysis.specifications,
                analysis.model,
            )
        }
        None => (
            manual_summary,
            manual_category,
            manual_difficulty,
            format_reading_time(minutes),
            manual_tags,
            None,
            MANUAL_FALLBACK_MODEL.to_string(),
        ),
    };

    ExtractionResult {
        title: metadata.title,
        content,
        image: metadata.image,
        images,
        video_embed: metadata.embed_url,
        original_description: Some(metadata.description).filter(|d| !d.is_empty()),
        summary,
        category,
        difficulty,
        reading_time,
        tags,
        specifications,
        metadata: Some(result_metadata),
        date: Utc::now().to_rfc3339(),
        used_model,
    }
}

/// Platform decides directly where it can; generic pages fall back to
/// keyword frequency.
pub fn fallback_category(platform: Platform, text: &str) -> Category {
    match platform {
        Platform::YouTube => Category::Videos,
        Platform::GitHub => Category::Coding,
        Platform::Shopping => Category::Shopping,
        Platform::Generic => keyword_category(text),
    }
}

fn keyword_category(text: &str) -> Category {
    let lower = text.to_lowercase();
    let mut best = (Category::Articles, 0usize);
    for (category, keywords) in CATEGORY_KEYWORDS {
        let score: usize = keywords.iter().map(|k| lower.matches(k).count()).sum();
        if score > best.1 {
            best = (*category, score);
        }
    }
    best.0
}

pub fn reading_minutes(word_count: usize) -> usize {
    let minutes = (word_count + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;
    minutes.max(1)
}

pub fn format_reading_time(minutes: usize) -> String {
    format!("{minutes} min")
}

pub fn difficulty_for(word_count: usize) -> Difficulty {
    if word_count < EASY_WORD_LIMIT {
        Difficulty::Easy
    } else if word_count < MEDIUM_WORD_LIMIT {
        Difficulty::Medium
    } else {
        Difficulty::Advanced
    }
}

pub fn fallback_tags(
    category: Category,
    platform: Platform,
    text: &str,
    minutes: usize,
) -> Vec<String> {
    let mut tags = vec![category.as_str().to_ascii_lowercase()];
    match platform {
        Platform::YouTube => tags.push("youtube".to_string()),
        Platform::GitHub => tags.push("github".to_string()),
        _ => {}
    }
    if minutes > LONG_READ_MINUTES {
        tags.push("long-read".to_string());
    }
    let lower = text.to_lowercase();
    if TUTORIAL_MARKERS.iter().any(|marker| lower.contains(marker)) {
        tags.push("tutorial".to_string());
    }
    tags
}

fn fallback_summary(description: &str, text: &str) -> String {
    if !description.trim().is_empty() {
        return description.trim().to_string();
    }
    let lead = utils::truncate_chars(text, 300);
    if lead.is_empty() {
        "No summary available.".to_string()
    } else if lead.len() < text.len() {
        format!("{lead}…")
    } else {
        lead.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> NormalizedUrl {
        NormalizedUrl::parse(url).unwrap()
    }

    fn parts_from(html: &str, target: &NormalizedUrl) -> DocumentParts {
        extract_document(html, target, None)
    }

    #[test]
    fn reading_time_has_one_minute_floor_and_is_monotonic() {
        assert_eq!(reading_minutes(0), 1);
        assert_eq!(reading_minutes(1), 1);
        assert_eq!(reading_minutes(200), 1);
        assert_eq!(reading_minutes(201), 2);

        let mut last = 0;
        for words in (0..5000).step_by(137) {
            let minutes = reading_minutes(words);
            assert!(minutes >= last, "reading time decreased at {words} words");
            last = minutes;
        }
    }

    #[test]
    fn difficulty_thresholds() {
        assert_eq!(difficulty_for(100), Difficulty::Easy);
        assert_eq!(difficulty_for(799), Difficulty::Easy);
        assert_eq!(difficulty_for(800), Difficulty::Medium);
        assert_eq!(difficulty_for(1499), Difficulty::Medium);
        assert_eq!(difficulty_for(1500), Difficulty::Advanced);
    }

    #[test]
    fn platform_drives_fallback_category() {
        assert_eq!(fallback_category(Platform::YouTube, ""), Category::Videos);
        assert_eq!(fallback_category(Platform::GitHub, ""), Category::Coding);
        assert_eq!(fallback_category(Platform::Shopping, ""), Category::Shopping);
    }

    #[test]
    fn keyword_frequency_categorizes_generic_text() {
        let research = "This study presents research findings from a controlled experiment. \
                        The paper includes a dataset and further analysis.";
        assert_eq!(fallback_category(Platform::Generic, research), Category::Research);

        let plain = "A quiet morning walk along the river with nothing remarkable.";
        assert_eq!(fallback_category(Platform::Generic, plain), Category::Articles);
    }

    #[test]
    fn tutorial_and_long_read_tags() {
        let tags = fallback_tags(Category::Coding, Platform::Generic, "a step by step guide", 3);
        assert!(tags.contains(&"coding".to_string()));
        assert!(tags.contains(&"tutorial".to_string()));
        assert!(!tags.contains(&"long-read".to_string()));

        let tags = fallback_tags(Category::Articles, Platform::Generic, "plain text", 11);
        assert!(tags.contains(&"long-read".to_string()));
    }

    #[test]
    fn manual_fallback_produces_complete_record() {
        let target = target("https://example.com/post");
        let parts = parts_from(
            "<html><head><title>A Post</title></head><body><article><p>Some words here.</p></article></body></html>",
            &target,
        );
        let result = assemble(&target, parts, None);

        assert_eq!(result.used_model, MANUAL_FALLBACK_MODEL);
        assert_eq!(result.title, "A Post");
        assert!(!result.content.is_empty());
        assert!(!result.summary.is_empty());
        assert_eq!(result.reading_time, "1 min");
        assert!(Category::parse(result.category.as_str()).is_some());
    }

    #[test]
    fn ai_fields_merge_with_clamped_enums() {
        let target = target("https://example.com/post");
        let parts = parts_from(
            "<html><head><title>T</title></head><body><p>body text</p></body></html>",
            &target,
        );
        let analysis = AiAnalysis {
            summary: Some("model summary".into()),
            category: Some("coding".into()),
            difficulty: Some("definitely-not-a-difficulty".into()),
            reading_time: Some("4 min".into()),
            tags: vec!["rust".into()],
            model: "gemini-1.5-flash".into(),
            ..AiAnalysis::default()
        };
        let result = assemble(&target, parts, Some(analysis));

        assert_eq!(result.used_model, "gemini-1.5-flash");
        assert_eq!(result.summary, "model summary");
        assert_eq!(result.category, Category::Coding);
        // unparseable difficulty falls back to the heuristic
        assert_eq!(result.difficulty, Difficulty::Easy);
        assert_eq!(result.reading_time, "4 min");
        assert_eq!(result.tags, vec!["rust".to_string()]);
    }

    #[test]
    fn scraped_metadata_stays_authoritative_over_ai() {
        let target = target("https://github.com/rust-lang/rust");
        let parts = parts_from(
            r#"<html><body><span id="repo-stars-counter-star">1.2k</span><p>about</p></body></html>"#,
            &target,
        );
        let analysis = AiAnalysis {
            metadata: Some(serde_json::json!({"stars": "999", "likes": "42"})),
            model: "gemini-1.5-flash".into(),
            ..AiAnalysis::default()
        };
        let result = assemble(&target, parts, Some(analysis));
        let metadata = result.metadata.unwrap();

        assert_eq!(metadata.stars.as_deref(), Some("1.2k"));
        assert_eq!(metadata.likes.as_deref(), Some("42"));
        assert_eq!(metadata.platform.as_deref(), Some("github"));
    }

    #[test]
    fn github_stars_survive_manual_fallback() {
        let target = target("https://github.com/rust-lang/rust");
        let parts = parts_from(
            r#"<html><head><title>rust-lang/rust</title></head><body><span id="repo-stars-counter-star">1.2k</span><p>The Rust language</p></body></html>"#,
            &target,
        );
        let result = assemble(&target, parts, None);

        assert_eq!(result.category, Category::Coding);
        assert_eq!(result.used_model, MANUAL_FALLBACK_MODEL);
        assert_eq!(result.metadata.unwrap().stars.as_deref(), Some("1.2k"));
    }

    #[test]
    fn carousel_is_capped() {
        let imgs: String = (0..20)
            .map(|i| format!(r#"<img src="/photo{i}.jpg">"#))
            .collect();
        let target = target("https://example.com");
        let parts = parts_from(&format!("<html><body>{imgs}</body></html>"), &target);
        let result = assemble(&target, parts, None);
        assert_eq!(result.images.len(), 8);
    }

    #[test]
    fn youtube_context_is_structured() {
        let target = target("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        let parts = DocumentParts {
            metadata: PageMetadata {
                title: "Video Title".into(),
                description: "About the video".into(),
                author: Some("The Channel".into()),
                ..PageMetadata::default()
            },
            images: Vec::new(),
            content: String::new(),
            text: "chrome chrome chrome".into(),
        };
        let context = ai_context(&parts, &target);
        assert!(context.contains("Video Title"));
        assert!(context.contains("The Channel"));
        assert!(!context.contains("chrome"));
    }

    #[test]
    fn generic_context_is_capped_visible_text() {
        let target = target("https://example.com");
        let long_text = "word ".repeat(10_000);
        let parts = DocumentParts {
            metadata: PageMetadata::default(),
            images: Vec::new(),
            content: String::new(),
            text: long_text,
        };
        let context = ai_context(&parts, &target);
        assert_eq!(context.chars().count(), 20_000);
    }
}
