//! Frontier for managing the URLs of one mirroring task
//!
//! This module handles:
//! - The FIFO queue of URLs waiting to be fetched (breadth-first order)
//! - The discovered set guaranteeing each URL is enqueued at most once
//! - The visited set of URLs already handed to the fetcher
//! - The base domain gate separating internal from external references
//! - The classification pinned for every discovered URL

use crate::crawler::{Classification, ReferenceContext};
use crate::url::{is_fetchable, resolve_reference, BaseDomain};
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

/// An internal reference accepted by the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    /// Normalized absolute URL (no fragment)
    pub url: Url,

    /// Fragment of the raw reference, re-appended by the rewriter
    pub fragment: Option<String>,

    /// Classification pinned when the URL was first discovered
    pub class: Classification,

    /// True if this call added the URL to the queue
    pub newly_queued: bool,
}

/// Single-writer frontier owned by the task's crawl loop
#[derive(Debug)]
pub struct Frontier {
    base: BaseDomain,
    queue: VecDeque<Url>,
    discovered: HashSet<Url>,
    visited: HashSet<Url>,
    pinned: HashMap<Url, Classification>,
}

impl Frontier {
    /// Creates an empty frontier confined to `base`
    pub fn new(base: BaseDomain) -> Self {
        Self {
            base,
            queue: VecDeque::new(),
            discovered: HashSet::new(),
            visited: HashSet::new(),
            pinned: HashMap::new(),
        }
    }

    /// Seeds the frontier with the start URL, pinned as an HTML page
    ///
    /// # Returns
    ///
    /// True if the URL was accepted (same origin and not yet discovered)
    pub fn seed(&mut self, url: Url) -> bool {
        self.admit(url, Classification::Html).1
    }

    /// Resolves a raw reference and enqueues it if it is internal
    ///
    /// # Arguments
    ///
    /// * `raw` - Attribute value as found in the document
    /// * `page` - URL of the page the reference was found on
    /// * `context` - Construct that carried the reference, used for the classification hint
    ///
    /// # Returns
    ///
    /// * `Some(Enqueued)` - The reference is internal; carries the pinned classification
    /// * `None` - The reference is external, unresolvable or not http(s)
    pub fn enqueue(&mut self, raw: &str, page: &Url, context: ReferenceContext) -> Option<Enqueued> {
        let resolved = resolve_reference(raw, page)?;
        if !is_fetchable(&resolved.url) || !self.base.contains(&resolved.url) {
            return None;
        }

        let hint = Classification::infer(&resolved.url, context);
        let (class, newly_queued) = self.admit(resolved.url.clone(), hint);

        Some(Enqueued {
            url: resolved.url,
            fragment: resolved.fragment,
            class,
            newly_queued,
        })
    }

    /// Adds an already normalized URL; returns the pinned class and whether it was queued
    fn admit(&mut self, mut url: Url, hint: Classification) -> (Classification, bool) {
        url.set_fragment(None);
        if !is_fetchable(&url) || !self.base.contains(&url) {
            return (hint, false);
        }

        if let Some(class) = self.pinned.get(&url) {
            return (*class, false);
        }

        self.pinned.insert(url.clone(), hint);
        self.discovered.insert(url.clone());
        self.queue.push_back(url);
        (hint, true)
    }

    /// Removes the earliest-enqueued URL that has not been visited and marks it visited
    ///
    /// # Returns
    ///
    /// The URL with its pinned classification, or `None` once the queue is drained
    pub fn pop(&mut self) -> Option<(Url, Classification)> {
        while let Some(url) = self.queue.pop_front() {
            if !self.visited.insert(url.clone()) {
                continue;
            }
            let class = self.pinned.get(&url).copied().unwrap_or(Classification::Html);
            return Some((url, class));
        }
        None
    }

    /// Classification pinned for a URL, if it was ever discovered
    pub fn pinned(&self, url: &Url) -> Option<Classification> {
        self.pinned.get(url).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of URLs waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of URLs ever enqueued
    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    /// Number of URLs ever popped
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontier() -> (Frontier, Url) {
        let start = Url::parse("https://example.test/").unwrap();
        let mut frontier = Frontier::new(BaseDomain::from_url(&start).unwrap());
        assert!(frontier.seed(start.clone()));
        (frontier, start)
    }

    #[test]
    fn test_seed_is_html_and_popped_first() {
        let (mut frontier, start) = frontier();
        assert_eq!(frontier.pinned(&start), Some(Classification::Html));
        assert_eq!(frontier.pop(), Some((start, Classification::Html)));
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_enqueue_once() {
        let (mut frontier, start) = frontier();

        let first = frontier.enqueue("/about", &start, ReferenceContext::Anchor).unwrap();
        let second = frontier.enqueue("about", &start, ReferenceContext::Anchor).unwrap();
        let third = frontier
            .enqueue("https://example.test/about#team", &start, ReferenceContext::Anchor)
            .unwrap();

        assert!(first.newly_queued);
        assert!(!second.newly_queued);
        assert!(!third.newly_queued);
        assert_eq!(third.fragment.as_deref(), Some("team"));
        assert_eq!(frontier.discovered_count(), 2);
        assert_eq!(frontier.pending(), 2);
    }

    #[test]
    fn test_external_and_non_http_not_enqueued() {
        let (mut frontier, start) = frontier();

        assert!(frontier
            .enqueue("https://other.test/", &start, ReferenceContext::Anchor)
            .is_none());
        assert!(frontier
            .enqueue("http://example.test/", &start, ReferenceContext::Anchor)
            .is_none());
        assert!(frontier
            .enqueue("mailto:a@example.test", &start, ReferenceContext::Anchor)
            .is_none());
        assert!(frontier
            .enqueue("ftp://example.test/file", &start, ReferenceContext::Anchor)
            .is_none());
        assert_eq!(frontier.discovered_count(), 1);
    }

    #[test]
    fn test_first_classification_is_pinned() {
        let (mut frontier, start) = frontier();

        let as_image = frontier
            .enqueue("/asset", &start, ReferenceContext::Media)
            .unwrap();
        let as_anchor = frontier
            .enqueue("/asset", &start, ReferenceContext::Anchor)
            .unwrap();

        assert_eq!(as_image.class, Classification::Image);
        assert_eq!(as_anchor.class, Classification::Image);
    }

    #[test]
    fn test_pop_is_fifo() {
        let (mut frontier, start) = frontier();
        frontier.enqueue("/a", &start, ReferenceContext::Anchor);
        frontier.enqueue("/b.css", &start, ReferenceContext::Stylesheet);
        frontier.enqueue("/c", &start, ReferenceContext::Anchor);

        let order: Vec<String> = std::iter::from_fn(|| frontier.pop())
            .map(|(url, _)| url.path().to_string())
            .collect();

        assert_eq!(order, vec!["/", "/a", "/b.css", "/c"]);
        assert_eq!(frontier.visited_count(), 4);
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_visited_url_is_not_requeued() {
        let (mut frontier, start) = frontier();
        frontier.pop();

        let again = frontier.enqueue("/", &start, ReferenceContext::Anchor).unwrap();

        assert!(!again.newly_queued);
        assert!(frontier.is_empty());
    }
}
