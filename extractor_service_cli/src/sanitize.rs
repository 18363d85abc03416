//! Sanitizing pass over the parsed document.
//!
//! `scraper` documents are immutable, so sanitization is a filtered
//! re-serialization: denylisted elements are skipped, image sources are
//! resolved to absolute URLs (preferring lazy-load attributes), anchors are
//! absolutized and retargeted. Every downstream consumer of document content
//! goes through these helpers, never the raw markup.

use std::sync::LazyLock;

use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

const STRIP_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "iframe", "noscript", "form",
];

// Class tokens that mark advertisement containers. Exact-token match so
// e.g. "download" survives.
const AD_CLASS_MARKERS: &[&str] = &["ad", "ads", "advert", "advertisement", "sponsored", "banner", "promo"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub const EMPTY_CONTENT_PLACEHOLDER: &str = "<p>No readable content could be extracted.</p>";

static ARTICLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article").expect("article selector should compile"));
static MAIN_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main").expect("main selector should compile"));
static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("body selector should compile"));

fn is_stripped(element: &Element) -> bool {
    STRIP_TAGS.contains(&element.name())
        || element.classes().any(|class| {
            let class = class.to_ascii_lowercase();
            AD_CLASS_MARKERS.iter().any(|marker| class == *marker)
        })
}

/// True when the element sits inside a subtree the sanitizer removes.
pub fn in_stripped_subtree(element: ElementRef) -> bool {
    element.ancestors().any(|node| match node.value() {
        Node::Element(e) => is_stripped(e),
        _ => false,
    })
}

/// The "real" image source: lazy-load attributes win over `src`, data URLs
/// are dropped, the rest is resolved against the document base.
pub fn resolve_image_src(element: &Element, base: &Url) -> Option<String> {
    let raw = element
        .attr("data-src")
        .or_else(|| element.attr("data-original"))
        .or_else(|| element.attr("src"))
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    if raw.starts_with("data:") {
        return None;
    }
    base.join(raw).ok().map(String::from)
}

/// Reader-mode HTML: `<article>` wins over `<main>` wins over `<body>`, and
/// a document with none of these gets an explicit placeholder.
pub fn reader_content(document: &Html, base: &Url) -> String {
    for selector in [&*ARTICLE_SEL, &*MAIN_SEL, &*BODY_SEL] {
        if let Some(element) = document.select(selector).next() {
            let html = sanitized_inner_html(element, base);
            let trimmed = html.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    EMPTY_CONTENT_PLACEHOLDER.to_string()
}

/// Sanitized inner HTML of an element.
pub fn sanitized_inner_html(root: ElementRef, base: &Url) -> String {
    let mut out = String::new();
    write_children(root, base, &mut out);
    out
}

fn write_children(parent: ElementRef, base: &Url, out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_text(&text.text)),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(element, base, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef, base: &Url, out: &mut String) {
    let value = element.value();
    let name = value.name();

    if is_stripped(value) {
        return;
    }

    if name == "img" {
        let Some(src) = resolve_image_src(value, base) else {
            return;
        };
        out.push_str("<img src=\"");
        out.push_str(&escape_attr(&src));
        out.push('"');
        if let Some(alt) = value.attr("alt") {
            out.push_str(" alt=\"");
            out.push_str(&escape_attr(alt));
            out.push('"');
        }
        out.push('>');
        return;
    }

    out.push('<');
    out.push_str(name);

    if name == "a" {
        if let Some(abs) = value.attr("href").and_then(|href| base.join(href).ok()) {
            out.push_str(" href=\"");
            out.push_str(&escape_attr(abs.as_str()));
            out.push('"');
        }
        out.push_str(" target=\"_blank\" rel=\"noopener noreferrer\"");
    }

    for (attr, attr_value) in value.attrs() {
        // srcset may still hold unresolved relative paths; loading markers
        // fight the reader view; anchor link attributes were rewritten above.
        if attr == "srcset" || attr == "loading" || attr.starts_with("on") {
            continue;
        }
        if name == "a" && (attr == "href" || attr == "target" || attr == "rel") {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&escape_attr(attr_value));
        out.push('"');
    }
    out.push('>');

    if VOID_TAGS.contains(&name) {
        return;
    }

    write_children(element, base, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Visible text of the document with denylisted subtrees skipped and
/// whitespace collapsed. Feeds categorization and the AI context.
pub fn visible_text(document: &Html) -> String {
    let Some(body) = document.select(&BODY_SEL).next() else {
        return String::new();
    };
    let mut out = String::new();
    collect_text(body, &mut out);
    crate::utils::collapse_whitespace(&out)
}

fn collect_text(parent: ElementRef, out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(&text.text);
                out.push(' ');
            }
            Node::Element(e) => {
                if is_stripped(e) {
                    continue;
                }
                if let Some(element) = ElementRef::wrap(child) {
                    collect_text(element, out);
                }
            }
            _ => {}
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/posts/1").unwrap()
    }

    #[test]
    fn article_takes_precedence_and_junk_is_stripped() {
        let doc = Html::parse_document(
            "<html><body><nav>menu</nav><article><p>Hello</p></article><footer>legal</footer></body></html>",
        );
        assert_eq!(reader_content(&doc, &base()), "<p>Hello</p>");
    }

    #[test]
    fn falls_back_through_main_to_body() {
        let doc = Html::parse_document("<html><body><main><p>Main</p></main></body></html>");
        assert_eq!(reader_content(&doc, &base()), "<p>Main</p>");

        let doc = Html::parse_document("<html><body><p>Body</p></body></html>");
        assert_eq!(reader_content(&doc, &base()), "<p>Body</p>");
    }

    #[test]
    fn placeholder_when_nothing_remains() {
        let doc = Html::parse_document("<html><body><script>var x;</script></body></html>");
        assert_eq!(reader_content(&doc, &base()), EMPTY_CONTENT_PLACEHOLDER);
    }

    #[test]
    fn scripts_styles_and_ad_classes_never_appear() {
        let doc = Html::parse_document(
            r#"<html><body><article><p>Keep</p><script>x()</script><style>p{}</style><div class="ad"><p>Buy now</p></div><aside>related</aside></article></body></html>"#,
        );
        let content = reader_content(&doc, &base());
        assert_eq!(content, "<p>Keep</p>");
    }

    #[test]
    fn lazy_load_attributes_win_over_src() {
        let doc = Html::parse_document(
            r#"<html><body><article><img src="data:image/gif;base64,xyz" data-src="/images/real.jpg" srcset="a 1x" loading="lazy"></article></body></html>"#,
        );
        let content = reader_content(&doc, &base());
        assert_eq!(content, r#"<img src="https://example.com/images/real.jpg">"#);
    }

    #[test]
    fn image_without_usable_source_is_dropped() {
        let doc = Html::parse_document(
            r#"<html><body><article><p>text</p><img src="data:image/png;base64,abc"></article></body></html>"#,
        );
        assert_eq!(reader_content(&doc, &base()), "<p>text</p>");
    }

    #[test]
    fn anchors_are_absolutized_and_retargeted() {
        let doc = Html::parse_document(
            r#"<html><body><article><a href="/about">About</a></article></body></html>"#,
        );
        assert_eq!(
            reader_content(&doc, &base()),
            r#"<a href="https://example.com/about" target="_blank" rel="noopener noreferrer">About</a>"#
        );
    }

    #[test]
    fn visible_text_collapses_whitespace_and_skips_junk() {
        let doc = Html::parse_document(
            "<html><body><nav>menu</nav><p>one\n   two</p><script>ignore()</script><p>three</p></body></html>",
        );
        assert_eq!(visible_text(&doc), "one two three");
    }

    #[test]
    fn text_nodes_are_escaped() {
        let doc = Html::parse_document("<html><body><article><p>a &lt; b</p></article></body></html>");
        assert_eq!(reader_content(&doc, &base()), "<p>a &lt; b</p>");
    }
}
