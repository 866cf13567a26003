//! HTML link rewriter
//!
//! This module parses a fetched page into an element tree and rewrites every
//! link-bearing construct so the mirrored page works offline:
//! - `<a href>`, `<link href>`, `<script src>`, `<img src>`, `<source src>`
//! - every `srcset` attribute, descriptor by descriptor
//! - `url(...)` tokens inside inline `style` attributes
//!
//! Internal references are enqueued in the [`Frontier`] and replaced by the relative
//! link to the file they will be stored at. External references, data URIs and
//! non-http(s) schemes are left byte-identical.
//!
//! Pages are decoded with their declared or detected character set and written back in
//! the same one, so a `<meta charset>` in the document stays truthful.

use crate::crawler::decode::decode_document;
use crate::crawler::{Frontier, ReferenceContext};
use crate::storage::{path_for, relative_link};
use crate::url::is_non_navigable;
use ego_tree::NodeId;
use encoding_rs::Encoding;
use regex::{Captures, Regex};
use scraper::{Html, Node, Selector};
use std::borrow::Cow;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors raised while rewriting a page
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("Failed to parse document at {url}: {message}")]
    Parse { url: String, message: String },
}

/// A rewritten page ready to be stored
#[derive(Debug, Clone)]
pub struct RewrittenPage {
    /// Serialized, mutated document
    pub html: String,

    /// Character set the page was decoded from
    pub encoding: &'static Encoding,

    /// Internal URLs this page added to the frontier
    pub newly_queued: usize,
}

impl RewrittenPage {
    /// The document encoded back into its source character set
    ///
    /// Characters the set cannot represent become numeric character references.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        let (bytes, _, _) = self.encoding.encode(&self.html);
        bytes
    }
}

/// Which rewrite applies to the values matched by a selector
#[derive(Debug, Clone, Copy)]
enum Pass {
    Anchor,
    Link,
    Script,
    Image,
    Source,
    Srcset,
    Style,
}

/// Passes in the order they are applied
const PASSES: [(&str, &str, Pass); 7] = [
    ("a[href]", "href", Pass::Anchor),
    ("link[href]", "href", Pass::Link),
    ("script[src]", "src", Pass::Script),
    ("img[src]", "src", Pass::Image),
    ("source[src]", "src", Pass::Source),
    ("[srcset]", "srcset", Pass::Srcset),
    ("[style]", "style", Pass::Style),
];

/// [`PASSES`] with their selectors compiled once
fn compiled_passes() -> &'static [(Selector, &'static str, Pass)] {
    static COMPILED: OnceLock<Vec<(Selector, &'static str, Pass)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PASSES
            .iter()
            .map(|&(selector, attr, pass)| {
                let selector = Selector::parse(selector).expect("pass selector is valid");
                (selector, attr, pass)
            })
            .collect()
    })
}

fn style_url_regex() -> &'static Regex {
    static STYLE_URL: OnceLock<Regex> = OnceLock::new();
    STYLE_URL.get_or_init(|| {
        Regex::new(r#"url\s*\(\s*['"]?([^'")]+)['"]?\s*\)"#).expect("style url pattern is valid")
    })
}

/// Rewrites one HTML page
///
/// # Arguments
///
/// * `bytes` - Raw document bytes
/// * `content_type` - Content-Type header of the response, empty when absent
/// * `page_url` - URL the document was fetched from, used to resolve references
/// * `page_path` - Task-root relative path the page will be stored at
/// * `frontier` - Frontier receiving every internal reference
///
/// # Returns
///
/// * `Ok(RewrittenPage)` - The rewritten document
/// * `Err(RewriteError)` - The bytes are malformed for the selected character set
///
/// # Example
///
/// ```
/// use sumi_mirror::crawler::{rewrite_page, Frontier};
/// use sumi_mirror::url::BaseDomain;
/// use url::Url;
///
/// let page = Url::parse("https://example.test/").unwrap();
/// let mut frontier = Frontier::new(BaseDomain::from_url(&page).unwrap());
/// frontier.seed(page.clone());
///
/// let html = br#"<html><head><title>Home</title></head><body><a href="/about">About</a></body></html>"#;
/// let rewritten = rewrite_page(html, "text/html", &page, "index.html", &mut frontier).unwrap();
/// assert!(rewritten.html.contains(r#"href="about/""#));
/// assert_eq!(rewritten.newly_queued, 1);
/// ```
pub fn rewrite_page(
    bytes: &[u8],
    content_type: &str,
    page_url: &Url,
    page_path: &str,
    frontier: &mut Frontier,
) -> Result<RewrittenPage, RewriteError> {
    let decoded = decode_document(bytes, content_type);
    if decoded.had_errors {
        return Err(RewriteError::Parse {
            url: page_url.to_string(),
            message: format!("malformed {} byte sequence", decoded.encoding.name()),
        });
    }

    let mut document = Html::parse_document(&decoded.text);

    let mut rewriter = Rewriter {
        page_url,
        page_path,
        frontier,
        newly_queued: 0,
    };

    for (selector, attr, pass) in compiled_passes() {
        let (attr, pass) = (*attr, *pass);
        let mut updates: Vec<(NodeId, String)> = Vec::new();
        for element in document.select(selector) {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            let rewritten = match pass {
                Pass::Anchor => rewriter.reference(value, ReferenceContext::Anchor),
                Pass::Link => {
                    let context = link_context(element.value().attr("rel"));
                    rewriter.reference(value, context)
                }
                Pass::Script => rewriter.reference(value, ReferenceContext::Script),
                Pass::Image | Pass::Source => rewriter.reference(value, ReferenceContext::Media),
                Pass::Srcset => rewriter.srcset(value),
                Pass::Style => rewriter.style(value),
            };
            if let Some(new_value) = rewritten {
                if new_value != value {
                    updates.push((element.id(), new_value));
                }
            }
        }

        for (id, new_value) in updates {
            set_attribute(&mut document, id, attr, &new_value);
        }
    }

    debug!(
        "Rewrote {} as {} ({} new URLs queued)",
        page_url,
        decoded.encoding.name(),
        rewriter.newly_queued
    );

    Ok(RewrittenPage {
        html: document.html(),
        encoding: decoded.encoding,
        newly_queued: rewriter.newly_queued,
    })
}

/// Extracts the page title from raw bytes without rewriting anything
///
/// Malformed sequences are tolerated here; a title is informational.
pub fn extract_title_from_bytes(bytes: &[u8]) -> Option<String> {
    let decoded = decode_document(bytes, "");
    extract_title(&Html::parse_document(&decoded.text))
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Maps a `<link rel>` value onto the construct it represents
fn link_context(rel: Option<&str>) -> ReferenceContext {
    let rel = rel.unwrap_or_default().to_ascii_lowercase();

    if rel.split_ascii_whitespace().any(|t| t == "stylesheet") {
        ReferenceContext::Stylesheet
    } else if rel.split_ascii_whitespace().any(|t| t.contains("icon")) {
        ReferenceContext::Icon
    } else {
        ReferenceContext::Link
    }
}

fn set_attribute(document: &mut Html, id: NodeId, attr: &str, new_value: &str) {
    let Some(mut node) = document.tree.get_mut(id) else {
        return;
    };
    if let Node::Element(element) = node.value() {
        for (name, value) in element.attrs.iter_mut() {
            if &*name.local == attr {
                *value = new_value.into();
            }
        }
    }
}

struct Rewriter<'a> {
    page_url: &'a Url,
    page_path: &'a str,
    frontier: &'a mut Frontier,
    newly_queued: usize,
}

impl Rewriter<'_> {
    /// Rewrites a single reference; `None` leaves the value untouched
    fn reference(&mut self, raw: &str, context: ReferenceContext) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || is_non_navigable(trimmed) {
            return None;
        }

        let enqueued = self.frontier.enqueue(trimmed, self.page_url, context)?;
        if enqueued.newly_queued {
            self.newly_queued += 1;
        }

        let target = path_for(&enqueued.url, enqueued.class);
        let mut link = relative_link(self.page_path, &target);
        if let Some(fragment) = enqueued.fragment {
            link.push('#');
            link.push_str(&fragment);
        }
        Some(link)
    }

    /// Rewrites every candidate of a `srcset`, keeping each descriptor
    fn srcset(&mut self, value: &str) -> Option<String> {
        let candidates: Vec<&str> = value
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        // data URIs contain commas of their own; splitting them is not safe
        if candidates
            .iter()
            .any(|c| c.to_ascii_lowercase().starts_with("data:"))
        {
            return None;
        }

        let mut changed = false;
        let mut rewritten = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let (url, descriptor) = match candidate.split_once(char::is_whitespace) {
                Some((url, descriptor)) => (url, descriptor.trim()),
                None => (candidate, ""),
            };

            let url = match self.reference(url, ReferenceContext::Media) {
                Some(new_url) => {
                    changed = true;
                    new_url
                }
                None => url.to_string(),
            };

            if descriptor.is_empty() {
                rewritten.push(url);
            } else {
                rewritten.push(format!("{} {}", url, descriptor));
            }
        }

        changed.then(|| rewritten.join(", "))
    }

    /// Rewrites the URL token of every `url(...)` in an inline style
    fn style(&mut self, value: &str) -> Option<String> {
        let regex = style_url_regex();
        if !regex.is_match(value) {
            return None;
        }

        let rewritten = regex.replace_all(value, |caps: &Captures| {
            let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
                return String::new();
            };
            match self.reference(token.as_str(), ReferenceContext::Media) {
                Some(new_url) => {
                    let start = token.start() - whole.start();
                    let end = token.end() - whole.start();
                    let text = whole.as_str();
                    format!("{}{}{}", &text[..start], new_url, &text[end..])
                }
                None => whole.as_str().to_string(),
            }
        });

        Some(rewritten.into_owned())
    }
}
