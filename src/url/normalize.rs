use crate::UrlError;
use url::Url;

/// Schemes whose references never point at a mirrorable document
const NON_NAVIGABLE_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// A reference resolved against the page it was found on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Absolute URL with the fragment removed
    pub url: Url,

    /// Fragment of the original reference, without the leading `#`
    pub fragment: Option<String>,
}

/// Normalizes the start URL of a mirroring task
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Prepend `http://` when the input carries no `http://` or `https://` scheme
/// 3. Parse the URL; reject if malformed
/// 4. Reject anything other than HTTP and HTTPS
/// 5. Require a host
/// 6. Remove the fragment
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::normalize_start_url;
///
/// let url = normalize_start_url("example.com/docs#intro").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/docs");
/// ```
pub fn normalize_start_url(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if lower.contains("://") {
        let scheme = trimmed.split("://").next().unwrap_or_default();
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            scheme
        )));
    } else {
        format!("http://{}", trimmed)
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves a raw attribute value against the page it was discovered on
///
/// Uses standard URL resolution (the same rules a browser applies), then strips the
/// fragment. Returns `None` for empty values and values that cannot be resolved.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::url::resolve_reference;
///
/// let page = Url::parse("https://example.test/gallery/").unwrap();
/// let resolved = resolve_reference("a.jpg#top", &page).unwrap();
/// assert_eq!(resolved.url.as_str(), "https://example.test/gallery/a.jpg");
/// assert_eq!(resolved.fragment.as_deref(), Some("top"));
/// ```
pub fn resolve_reference(raw: &str, page: &Url) -> Option<ResolvedReference> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mut url = page.join(raw).ok()?;
    let fragment = url.fragment().map(str::to_string);
    url.set_fragment(None);

    Some(ResolvedReference { url, fragment })
}

/// Returns true if the reference uses a scheme that is never mirrored
/// (`javascript:`, `mailto:`, `tel:`, `data:`)
pub fn is_non_navigable(raw: &str) -> bool {
    let lower = raw.trim_start().to_ascii_lowercase();
    NON_NAVIGABLE_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Returns true if the URL can be fetched by the crawler
pub fn is_fetchable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
