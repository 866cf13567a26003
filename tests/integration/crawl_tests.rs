//! Integration tests for the mirror
//!
//! These tests use wiremock to create mock HTTP servers and run whole
//! mirroring tasks end-to-end, inspecting the resulting tree and archive.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sumi_mirror::config::{Config, StrategyKind};
use sumi_mirror::output::{ChannelSubscriber, EventKind, NullSubscriber, ProgressSubscriber};
use sumi_mirror::storage::{path_for, REDIRECTS_FILE, REDIRECTS_RULE};
use sumi_mirror::{Classification, MirrorError, TaskRegistry, TaskRequest, TaskStatus};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `work_dir`, without throttling
fn create_test_config(work_dir: &Path) -> Config {
    let mut config = Config::default();
    config.output.work_dir = work_dir.to_string_lossy().into_owned();
    config.crawler.throttle_ms = 0;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

fn registry(work_dir: &Path) -> TaskRegistry {
    TaskRegistry::new(create_test_config(work_dir), Arc::new(NullSubscriber))
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn archive_entries(archive: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

fn archive_entry(archive: &Path, name: &str) -> String {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

#[tokio::test]
async fn test_full_mirror_single_site() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title>
        <link rel="stylesheet" href="/style.css">
        </head><body>
        <a href="/about">About</a>
        <a href="https://other.test/">Elsewhere</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/about",
        r#"<html><head><title>About</title></head><body><a href="/">Home</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/style.css"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"body { color: #333; }".to_vec(), "text/css"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path());
    let handle = registry
        .create(&TaskRequest::new(format!("{}/", base_url)))
        .unwrap();

    let snapshot = handle.wait().await;
    assert_eq!(snapshot.status, TaskStatus::Completed, "{:?}", snapshot.error);
    assert_eq!(snapshot.stats.processed_urls, 3);
    assert_eq!(snapshot.stats.failed_urls, 0);
    assert_eq!(snapshot.stats.resources.html, 2);
    assert_eq!(snapshot.stats.resources.css, 1);
    assert_eq!(snapshot.stats.files_written, 3);

    let stylesheet = Url::parse(&format!("{}/style.css", base_url)).unwrap();
    let css_path = path_for(&stylesheet, Classification::Css);
    assert!(css_path.starts_with("css/style_"));
    assert!(css_path.ends_with(".css"));

    let root = handle.root();
    assert!(root.join("about/index.html").exists());
    assert!(root.join(&css_path).exists());
    assert_eq!(
        std::fs::read_to_string(root.join(REDIRECTS_FILE)).unwrap(),
        REDIRECTS_RULE
    );

    let index = std::fs::read_to_string(root.join("index.html")).unwrap();
    assert!(index.contains(r#"href="about/""#));
    assert!(index.contains(r#"href="https://other.test/""#));
    assert!(index.contains(&format!(r#"href="{}""#, css_path)));

    let about = std::fs::read_to_string(root.join("about/index.html")).unwrap();
    assert!(about.contains(r#"href="../""#));

    let archive = registry.download(handle.id()).unwrap();
    let entries = archive_entries(&archive);
    assert_eq!(entries.first().map(String::as_str), Some(REDIRECTS_FILE));
    assert_eq!(
        entries.iter().filter(|e| e.as_str() == REDIRECTS_FILE).count(),
        1
    );
    assert!(entries.contains(&"index.html".to_string()));
    assert!(entries.contains(&"about/index.html".to_string()));
    assert!(entries.contains(&css_path));
    assert_eq!(
        archive_entry(&archive, &css_path),
        "body { color: #333; }"
    );

    let preview = registry.preview(handle.id()).await.unwrap();
    let titles: Vec<&str> = preview.pages.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["About", "Home"]);
    assert_eq!(preview.resources.css, 1);
}

#[tokio::test]
async fn test_image_timeout_is_recorded_and_crawl_continues() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><body><img src="/slow.png"><a href="/next">Next</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/next", "<p>next</p>").await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(vec![0u8; 16], "image/png")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.request_timeout_ms = 300;
    let registry = TaskRegistry::new(config, Arc::new(NullSubscriber));

    let handle = registry
        .create(&TaskRequest::new(format!("{}/", server.uri())))
        .unwrap();
    let snapshot = handle.wait().await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.stats.processed_urls, 3);
    assert_eq!(snapshot.stats.failed_urls, 1);
    assert_eq!(snapshot.stats.resources.html, 2);
    assert_eq!(snapshot.stats.resources.images, 0);
    assert_eq!(snapshot.failed, vec![format!("{}/slow.png", server.uri())]);
    assert!(registry.download(handle.id()).unwrap().exists());
}

#[tokio::test]
async fn test_max_urls_bounds_the_crawl() {
    let server = MockServer::start().await;

    let links: String = (1..=6)
        .map(|i| format!(r#"<a href="/page{}">Page {}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &format!("<html><body>{}</body></html>", links)).await;
    for i in 1..=6 {
        mount_page(&server, &format!("/page{}", i), "<p>page</p>").await;
    }

    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path());
    let handle = registry
        .create(&TaskRequest::new(format!("{}/", server.uri())).with_max_urls(3))
        .unwrap();

    let snapshot = handle.wait().await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.stats.processed_urls, 3);
    assert_eq!(snapshot.stats.total_urls, 7);
    assert!(handle.root().join("page2/index.html").exists());
    assert!(!handle.root().join("page3/index.html").exists());
}

#[tokio::test]
async fn test_srcset_candidates_rewritten() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/gallery/",
        r#"<html><body><img src="a.jpg" srcset="a.jpg 1x, b.jpg 2x"></body></html>"#,
    )
    .await;
    for image in ["/gallery/a.jpg", "/gallery/b.jpg"] {
        Mock::given(method("GET"))
            .and(path(image))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0xffu8, 0xd8], "image/jpeg"))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path());
    let handle = registry
        .create(&TaskRequest::new(format!("{}/gallery/", server.uri())))
        .unwrap();
    let snapshot = handle.wait().await;
    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.stats.resources.images, 2);

    let page = Url::parse(&format!("{}/gallery/", server.uri())).unwrap();
    let a = path_for(&page.join("a.jpg").unwrap(), Classification::Image);
    let b = path_for(&page.join("b.jpg").unwrap(), Classification::Image);

    let gallery = std::fs::read_to_string(handle.root().join("gallery/index.html")).unwrap();
    assert!(gallery.contains(&format!(r#"srcset="../{} 1x, ../{} 2x""#, a, b)));
    assert!(gallery.contains(&format!(r#"src="../{}""#, a)));
    assert!(handle.root().join(&a).exists());
    assert!(handle.root().join(&b).exists());
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r##"<a href="/about">1</a><a href="/about#team">2</a><a href="about">3</a>"##,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(r#"<a href="/">Home</a><a href="/about">Self</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path());
    let handle = registry
        .create(&TaskRequest::new(format!("{}/", server.uri())))
        .unwrap();
    let snapshot = handle.wait().await;

    assert_eq!(snapshot.stats.total_urls, 2);
    assert_eq!(snapshot.stats.processed_urls, 2);

    let index = std::fs::read_to_string(handle.root().join("index.html")).unwrap();
    assert!(index.contains(r##"href="about/#team""##));
}

#[tokio::test]
async fn test_progress_events_end_with_terminal_event() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
    mount_page(&server, "/a", "<p>a</p>").await;
    mount_page(&server, "/b", "<p>b</p>").await;

    let dir = TempDir::new().unwrap();
    let (subscriber, mut events) = ChannelSubscriber::channel();
    let subscriber: Arc<dyn ProgressSubscriber> = Arc::new(subscriber);
    let registry = TaskRegistry::new(create_test_config(dir.path()), subscriber);

    let handle = registry
        .create(&TaskRequest::new(format!("{}/", server.uri())))
        .unwrap();
    handle.wait().await;

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert_eq!(received[0].message, "Started crawling");
    assert_eq!(received[0].progress_percent, 0);
    assert!(received
        .iter()
        .any(|e| e.message == format!("Processing: {}/", server.uri())));
    assert!(received.iter().any(|e| e.message == "ZIP file created"));
    assert!(received
        .iter()
        .filter(|e| e.kind == EventKind::Progress)
        .all(|e| e.progress_percent < 100));

    let terminal: Vec<_> = received.iter().filter(|e| e.kind.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(terminal[0].kind, EventKind::Completed);
    assert_eq!(terminal[0].progress_percent, 100);
    assert_eq!(terminal[0].stats.processed_urls, 3);
    assert_eq!(received.last().map(|e| e.kind), Some(EventKind::Completed));
}

#[tokio::test]
async fn test_unreachable_start_page_still_yields_archive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path());
    let handle = registry
        .create(&TaskRequest::new(format!("{}/", server.uri())))
        .unwrap();
    let snapshot = handle.wait().await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.stats.failed_urls, 1);

    let archive = registry.download(handle.id()).unwrap();
    assert_eq!(archive_entries(&archive), vec![REDIRECTS_FILE.to_string()]);
}

#[tokio::test]
async fn test_download_requires_completion() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path());
    let handle = registry
        .create(&TaskRequest::new(format!("{}/", server.uri())))
        .unwrap();

    assert!(matches!(
        registry.download(handle.id()),
        Err(MirrorError::TaskNotReady { .. })
    ));

    handle.wait().await;
    assert!(registry.download(handle.id()).is_ok());
}

#[tokio::test]
async fn test_external_strategy_failure() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.strategy.wget_path = "/nonexistent/bin/wget-missing".to_string();
    let registry = TaskRegistry::new(config, Arc::new(NullSubscriber));

    let handle = registry
        .create(&TaskRequest::new("example.test").with_strategy(StrategyKind::External))
        .unwrap();
    let snapshot = handle.wait().await;

    assert_eq!(snapshot.status, TaskStatus::Failed);
    assert_eq!(snapshot.strategy, StrategyKind::External);
    assert!(snapshot
        .error
        .as_deref()
        .unwrap_or_default()
        .starts_with("External mirroring tool failed"));
    assert!(matches!(
        registry.download(handle.id()),
        Err(MirrorError::TaskNotReady {
            status: TaskStatus::Failed,
            ..
        })
    ));
}

#[tokio::test]
async fn test_cleanup_removes_tree_and_archive() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<title>Home</title>").await;

    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path());
    let handle = registry
        .create(&TaskRequest::new(format!("{}/", server.uri())))
        .unwrap();
    handle.wait().await;

    let archive = registry.download(handle.id()).unwrap();
    assert!(archive.exists());
    assert!(handle.root().exists());

    registry.cleanup(handle.id()).await.unwrap();

    assert!(!archive.exists());
    assert!(!handle.root().exists());
    assert!(matches!(
        registry.status(handle.id()),
        Err(MirrorError::TaskNotFound(_))
    ));
}

#[tokio::test]
async fn test_cancelled_task_still_completes() {
    let server = MockServer::start().await;
    let links: String = (1..=5).map(|i| format!(r#"<a href="/p{}">x</a>"#, i)).collect();
    mount_page(&server, "/", &links).await;
    for i in 1..=5 {
        mount_page(&server, &format!("/p{}", i), "<p>x</p>").await;
    }

    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path());
    let handle = registry
        .create(&TaskRequest::new(format!("{}/", server.uri())).with_throttle_ms(200))
        .unwrap();
    handle.cancel();

    let snapshot = handle.wait().await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert!(snapshot.stats.processed_urls <= 1);
    assert!(registry.download(handle.id()).unwrap().exists());
}
