use serde::{Deserialize, Serialize};

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of URLs processed by one task
    #[serde(rename = "max-urls", default = "default_max_urls")]
    pub max_urls: u32,

    /// Pause between two fetches of the same task (milliseconds)
    #[serde(rename = "throttle-ms", default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Whole-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connection establishment timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms", default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Extra attempts for timeouts and 5xx responses
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// Delay between two attempts of the same fetch (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Shared working directory; every task gets `<work-dir>/<task-id>/`
    #[serde(rename = "work-dir", default = "default_work_dir")]
    pub work_dir: String,
}

/// Which engine produces the mirrored tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Built-in fetch/rewrite loop
    #[default]
    Native,
    /// Shell out to an external recursive mirroring tool (wget)
    External,
}

/// Mirroring strategy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub kind: StrategyKind,

    /// Executable used by the external strategy
    #[serde(rename = "wget-path", default = "default_wget_path")]
    pub wget_path: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_urls: default_max_urls(),
            throttle_ms: default_throttle_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: StrategyKind::default(),
            wget_path: default_wget_path(),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::External => f.write_str("external"),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Mozilla/5.0 (compatible; Name/Version; +ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "Mozilla/5.0 (compatible; {}/{}; +{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

fn default_max_urls() -> u32 {
    15
}

fn default_throttle_ms() -> u64 {
    100
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_crawler_name() -> String {
    "SumiMirror".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://example.com/about".to_string()
}

fn default_work_dir() -> String {
    "temp".to_string()
}

fn default_wget_path() -> String {
    "wget".to_string()
}
