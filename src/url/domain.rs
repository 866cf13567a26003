use crate::{UrlError, UrlResult};
use std::fmt;
use url::{Origin, Url};

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// The origin a mirroring task is confined to
///
/// Derived once from the start URL and fixed for the lifetime of the task. A URL is
/// internal iff its scheme, host and port all match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDomain {
    origin: Origin,
    host: String,
    port: Option<u16>,
}

impl BaseDomain {
    /// Derives the base domain from a normalized start URL
    ///
    /// # Returns
    ///
    /// * `Ok(BaseDomain)` - The scheme/host/port triple of the URL
    /// * `Err(UrlError::MissingDomain)` - The URL has no host
    pub fn from_url(url: &Url) -> UrlResult<Self> {
        let host = extract_domain(url).ok_or(UrlError::MissingDomain)?;
        Ok(Self {
            origin: url.origin(),
            host,
            port: url.port(),
        })
    }

    /// Returns true if the URL shares this origin (scheme, host and effective port)
    pub fn contains(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    /// Lowercase host without the port
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host plus an explicit non-default port, e.g. `127.0.0.1:8080`
    pub fn host_with_port(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// File-name friendly form used for archive names: every non-alphanumeric
    /// character of `host[:port]` becomes `_`
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use sumi_mirror::url::BaseDomain;
    ///
    /// let url = Url::parse("https://www.example.com/").unwrap();
    /// let domain = BaseDomain::from_url(&url).unwrap();
    /// assert_eq!(domain.archive_stem(), "www_example_com");
    /// ```
    pub fn archive_stem(&self) -> String {
        self.host_with_port()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for BaseDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin.ascii_serialization())
    }
}
