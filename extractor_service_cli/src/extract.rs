//! Field extraction over the parsed document.
//!
//! Every field is an ordered fallback chain: first non-empty candidate wins,
//! and any individual miss (absent element, malformed blob, bad selector)
//! degrades that one field without touching its siblings.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::fetch::OEmbed;
use crate::platform::{self, NormalizedUrl, Platform};
use crate::utils;

// Star/fork counters have moved between markup generations; the ladder keeps
// every shape that has been observed in the wild.
const GITHUB_STAR_SELECTORS: &[&str] = &[
    "#repo-stars-counter-star",
    "a[href$='/stargazers'] strong",
    "a[href$='/stargazers'] span.Counter",
    "span.Counter.js-social-count",
];

const GITHUB_FORK_SELECTORS: &[&str] = &[
    "#repo-network-counter",
    "a[href$='/forks'] strong",
    "a[href$='/forks'] span.Counter",
];

const GITHUB_AUTHOR_SELECTORS: &[&str] = &["span.author a", ".author a", "a[rel='author']"];

const PRICE_SELECTORS: &[&str] = &[
    "#priceblock_ourprice",
    "#priceblock_dealprice",
    "span.a-price span.a-offscreen",
    "div.x-price-primary span.ux-textspans",
    "#prcIsum",
    "span.price",
    ".price",
];

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

static SHOPPING_RESIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\._[^/.]+_\.").expect("SHOPPING_RESIZE_RE should compile"));

static SCRIPT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("script selector should compile"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector should compile"));

/// Everything the metadata stage knows about a page.
#[derive(Debug, Clone, Default)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub embed_url: Option<String>,
    pub stars: Option<String>,
    pub forks: Option<String>,
    pub author: Option<String>,
    pub price: Option<String>,
}

pub fn extract_metadata(
    document: &Html,
    target: &NormalizedUrl,
    oembed: Option<&OEmbed>,
) -> PageMetadata {
    let mut metadata = PageMetadata {
        title: extract_title(document, target, oembed),
        description: extract_description(document, target),
        image: extract_image(document, target, oembed),
        embed_url: platform::video_embed_url(target),
        ..PageMetadata::default()
    };

    match target.platform {
        Platform::GitHub => {
            metadata.stars = first_text(document, GITHUB_STAR_SELECTORS);
            metadata.forks = first_text(document, GITHUB_FORK_SELECTORS);
            metadata.author = first_text(document, GITHUB_AUTHOR_SELECTORS)
                .or_else(|| repo_owner_from_url(target));
        }
        Platform::YouTube => {
            metadata.author = oembed.and_then(|o| o.author_name.clone());
        }
        Platform::Shopping => {
            metadata.price = first_text(document, PRICE_SELECTORS);
        }
        Platform::Generic => {}
    }

    metadata
}

/// oEmbed title → og:title → `<title>` → raw input URL. Never empty.
fn extract_title(document: &Html, target: &NormalizedUrl, oembed: Option<&OEmbed>) -> String {
    if let Some(title) = oembed.and_then(|o| o.title.clone()).filter(|t| !t.trim().is_empty()) {
        return title.trim().to_string();
    }
    if let Some(title) = meta_content(document, "og:title") {
        return title;
    }
    if let Some(element) = document.select(&TITLE_SEL).next() {
        let title = element.text().collect::<String>().trim().to_string();
        if !title.is_empty() {
            return title;
        }
    }
    target.raw.clone()
}

fn extract_description(document: &Html, target: &NormalizedUrl) -> String {
    if target.platform == Platform::YouTube {
        if let Some(description) = player_response_description(document) {
            return description;
        }
    }
    meta_content(document, "og:description")
        .or_else(|| meta_content(document, "description"))
        .unwrap_or_default()
}

fn extract_image(document: &Html, target: &NormalizedUrl, oembed: Option<&OEmbed>) -> Option<String> {
    let image = oembed
        .and_then(|o| o.thumbnail_url.clone())
        .filter(|u| !u.trim().is_empty())
        .or_else(|| meta_content(document, "og:image"))?;
    Some(match target.platform {
        Platform::Shopping => clean_shopping_image(&image),
        _ => image,
    })
}

/// Deep extraction of the embedded player-state blob. Fails independently:
/// any miss here falls back to meta-tag description.
fn player_response_description(document: &Html) -> Option<String> {
    for script in document.select(&SCRIPT_SEL) {
        let text = script.text().collect::<String>();
        let Some(marker) = text.find(PLAYER_RESPONSE_MARKER) else {
            continue;
        };
        let Some(blob) = utils::first_json_object(&text[marker..]) else {
            tracing::debug!("player response marker found but no balanced object followed");
            continue;
        };
        match serde_json::from_str::<serde_json::Value>(blob) {
            Ok(value) => {
                if let Some(description) = value["videoDetails"]["shortDescription"]
                    .as_str()
                    .filter(|d| !d.trim().is_empty())
                {
                    return Some(description.to_string());
                }
            }
            Err(e) => {
                tracing::debug!("player response blob did not decode: {e}");
            }
        }
    }
    None
}

/// Strip storefront resize modifiers (`._AC_SX679_.` and friends) so
/// differently-sized variants collapse to the canonical asset.
pub fn clean_shopping_image(image_url: &str) -> String {
    SHOPPING_RESIZE_RE.replace_all(image_url, ".").into_owned()
}

/// Meta lookup by `name` then `property`, first non-empty content wins.
pub fn meta_content(document: &Html, name: &str) -> Option<String> {
    for attr in ["name", "property"] {
        let selector_str = format!("meta[{attr}='{name}']");
        let Ok(selector) = Selector::parse(&selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            if let Some(content) = element.value().attr("content") {
                let trimmed = content.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

/// First selector in the ladder that matches an element with non-empty text.
fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            tracing::debug!("selector `{selector_str}` did not parse");
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn repo_owner_from_url(target: &NormalizedUrl) -> Option<String> {
    target
        .url
        .path_segments()
        .and_then(|mut segments| segments.next())
        .filter(|owner| !owner.is_empty())
        .map(String::from)
}
