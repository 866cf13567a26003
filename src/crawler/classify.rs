//! Resource classification
//!
//! Every fetched payload and every discovered reference is assigned exactly one
//! [`Classification`]. Fetched payloads are classified from their `Content-Type`;
//! references are classified ahead of time from their extension and the HTML construct
//! that carried them.

use serde::Serialize;
use std::fmt;
use url::Url;

/// Extensions recognised as fonts regardless of the declared content type
const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];

const HTML_EXTENSIONS: &[&str] = &["htm", "html", "xhtml", "php", "asp", "aspx", "jsp", "shtml"];
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "bmp", "avif", "tif", "tiff",
];

/// Closed set of resource kinds a mirror stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Html,
    Css,
    Js,
    Image,
    Font,
    Other,
}

/// The HTML construct a reference was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceContext {
    /// `<a href>`
    Anchor,
    /// `<link rel="stylesheet" href>`
    Stylesheet,
    /// `<link rel="icon" href>` and its variants
    Icon,
    /// Any other `<link href>` (canonical, alternate, preload, ...)
    Link,
    /// `<script src>`
    Script,
    /// `<img src>`, `<source src>`, `srcset` and inline-style `url()`
    Media,
}

impl Classification {
    /// Classifies a fetched payload
    ///
    /// The content type is matched case-insensitively in a fixed order; the URL is only
    /// consulted for font extensions, which servers frequently mislabel.
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use sumi_mirror::Classification;
    ///
    /// let url = Url::parse("https://example.test/").unwrap();
    /// assert_eq!(
    ///     Classification::from_content_type("text/html; charset=utf-8", &url),
    ///     Classification::Html
    /// );
    /// ```
    pub fn from_content_type(content_type: &str, url: &Url) -> Self {
        let ct = content_type.to_ascii_lowercase();

        if ct.contains("text/html") || ct.contains("application/xhtml") {
            Self::Html
        } else if ct.contains("text/css") {
            Self::Css
        } else if ct.contains("javascript") || ct.contains("text/js") {
            Self::Js
        } else if ct.starts_with("image/") {
            Self::Image
        } else if ct.starts_with("font/")
            || ct.contains("font-woff")
            || ct.contains("x-font")
            || has_extension(url, FONT_EXTENSIONS)
        {
            Self::Font
        } else {
            Self::Other
        }
    }

    /// Infers the classification of a reference before it is fetched
    ///
    /// A recognised extension wins over the construct; otherwise the construct decides.
    pub fn infer(url: &Url, context: ReferenceContext) -> Self {
        if let Some(class) = Self::from_extension(url) {
            return class;
        }

        match context {
            ReferenceContext::Anchor => Self::Html,
            ReferenceContext::Stylesheet => Self::Css,
            ReferenceContext::Icon | ReferenceContext::Media => Self::Image,
            ReferenceContext::Script => Self::Js,
            ReferenceContext::Link => Self::Other,
        }
    }

    fn from_extension(url: &Url) -> Option<Self> {
        Self::from_file_extension(&extension(url)?)
    }

    /// Classifies a file by its extension alone (case-insensitive, without the dot)
    ///
    /// Returns `None` for extensions that do not identify a class.
    pub fn from_file_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        let ext = ext.as_str();

        if HTML_EXTENSIONS.contains(&ext) {
            Some(Self::Html)
        } else if ext == "css" {
            Some(Self::Css)
        } else if ext == "js" || ext == "mjs" {
            Some(Self::Js)
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Self::Image)
        } else if FONT_EXTENSIONS.contains(&ext) {
            Some(Self::Font)
        } else {
            None
        }
    }

    /// Subdirectory of the task root holding this class, `None` for html and other
    pub fn subtree(&self) -> Option<&'static str> {
        match self {
            Self::Css => Some("css"),
            Self::Js => Some("js"),
            Self::Image => Some("images"),
            Self::Font => Some("fonts"),
            Self::Html | Self::Other => None,
        }
    }

    /// Stem used when a URL has no usable file name
    pub fn fallback_stem(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Js => "js",
            Self::Image => "img",
            Self::Font => "font",
            Self::Html => "index",
            Self::Other => "file",
        }
    }

    /// Extension appended when a URL carries none
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Css => ".css",
            Self::Js => ".js",
            Self::Image => ".jpg",
            Self::Font => ".woff",
            Self::Html => ".html",
            Self::Other => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
            Self::Image => "image",
            Self::Font => "font",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase extension of the final path segment, if any
fn extension(url: &Url) -> Option<String> {
    let segment = url.path().rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn has_extension(url: &Url, candidates: &[&str]) -> bool {
    extension(url).map_or(false, |ext| candidates.contains(&ext.as_str()))
}
