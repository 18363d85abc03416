//! Candidate image collection for the carousel.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::extract;
use crate::platform::{NormalizedUrl, Platform};
use crate::sanitize;

// Heuristic against non-content imagery. Applied after canonicalization so
// resize variants cannot dodge the markers.
const EXCLUDE_MARKERS: &[&str] = &["icon", "logo", "avatar", ".gif"];

static IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("img selector should compile"));

/// Ordered, deduplicated candidate image URLs. The primary image (when
/// known) leads; all entries are absolute. Callers cap the list for
/// presentation.
pub fn collect_images(
    document: &Html,
    target: &NormalizedUrl,
    primary: Option<&str>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    if let Some(primary) = primary.filter(|p| !p.is_empty()) {
        seen.insert(primary.to_string());
        images.push(primary.to_string());
    }

    for element in document.select(&IMG_SEL) {
        if sanitize::in_stripped_subtree(element) {
            continue;
        }
        let Some(src) = sanitize::resolve_image_src(element.value(), &target.url) else {
            continue;
        };
        let src = match target.platform {
            Platform::Shopping => extract::clean_shopping_image(&src),
            _ => src,
        };
        let lower = src.to_ascii_lowercase();
        if EXCLUDE_MARKERS.iter().any(|marker| lower.contains(marker)) {
            continue;
        }
        if seen.insert(src.clone()) {
            images.push(src);
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn target(url: &str) -> NormalizedUrl {
        NormalizedUrl::parse(url).unwrap()
    }

    #[test]
    fn candidates_are_absolute() {
        let document = Html::parse_document(
            r#"<html><body><img src="/a.jpg"><img src="https://cdn.example.com/b.png"></body></html>"#,
        );
        let images = collect_images(&document, &target("https://example.com/post"), None);
        assert_eq!(
            images,
            vec![
                "https://example.com/a.jpg".to_string(),
                "https://cdn.example.com/b.png".to_string(),
            ]
        );
        for image in &images {
            assert!(Url::parse(image).is_ok(), "{image} is not absolute");
        }
    }

    #[test]
    fn duplicates_collapse_after_canonicalization() {
        let document = Html::parse_document(concat!(
            "<html><body>",
            r#"<img src="https://m.media-amazon.com/images/I/71abc._AC_SX300_.jpg">"#,
            r#"<img src="https://m.media-amazon.com/images/I/71abc._AC_SL1500_.jpg">"#,
            "</body></html>",
        ));
        let images = collect_images(&document, &target("https://www.amazon.com/dp/B0TEST"), None);
        assert_eq!(images, vec!["https://m.media-amazon.com/images/I/71abc.jpg".to_string()]);
    }

    #[test]
    fn non_content_markers_are_excluded() {
        let document = Html::parse_document(concat!(
            "<html><body>",
            r#"<img src="/site-logo.png">"#,
            r#"<img src="/users/avatar42.jpg">"#,
            r#"<img src="/favicon-icon.png">"#,
            r#"<img src="/loader.gif">"#,
            r#"<img src="/photo.jpg">"#,
            "</body></html>",
        ));
        let images = collect_images(&document, &target("https://example.com"), None);
        assert_eq!(images, vec!["https://example.com/photo.jpg".to_string()]);
    }

    #[test]
    fn primary_image_leads_even_when_collected_later() {
        let document = Html::parse_document(
            r#"<html><body><img src="/one.jpg"><img src="/two.jpg"></body></html>"#,
        );
        let images = collect_images(
            &document,
            &target("https://example.com"),
            Some("https://example.com/two.jpg"),
        );
        assert_eq!(
            images,
            vec![
                "https://example.com/two.jpg".to_string(),
                "https://example.com/one.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn primary_image_is_added_when_absent_from_document() {
        let document = Html::parse_document("<html><body></body></html>");
        let images = collect_images(
            &document,
            &target("https://example.com"),
            Some("https://cdn.example.com/hero.jpg"),
        );
        assert_eq!(images, vec!["https://cdn.example.com/hero.jpg".to_string()]);
    }

    #[test]
    fn images_inside_stripped_subtrees_are_ignored() {
        let document = Html::parse_document(
            r#"<html><body><nav><img src="/nav-banner.jpg"></nav><img src="/content.jpg"></body></html>"#,
        );
        let images = collect_images(&document, &target("https://example.com"), None);
        assert_eq!(images, vec!["https://example.com/content.jpg".to_string()]);
    }

    #[test]
    fn data_urls_are_skipped() {
        let document = Html::parse_document(
            r#"<html><body><img src="data:image/png;base64,abc"><img src="/real.jpg"></body></html>"#,
        );
        let images = collect_images(&document, &target("https://example.com"), None);
        assert_eq!(images, vec!["https://example.com/real.jpg".to_string()]);
    }
}
