//! End-to-end tests against a live server on an ephemeral port

use filedeck::events::EventBroadcaster;
use filedeck::tree::FlattenedRow;
use filedeck::watch::FileWatcher;
use filedeck::web::server::{router, RouterOptions};
use filedeck::{Explorer, Sandbox};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct TestServer {
    base: String,
    root: PathBuf,
    client: reqwest::Client,
    _watcher: Option<FileWatcher>,
    _temp: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        Self::launch(false).await
    }

    /// Same as `start`, with a filesystem watcher feeding the event stream
    async fn start_watched() -> Self {
        Self::launch(true).await
    }

    async fn launch(watch: bool) -> Self {
        let temp = TempDir::new().unwrap();
        let sandbox = Sandbox::open(temp.path()).unwrap();
        let root = sandbox.root().to_path_buf();
        let events = EventBroadcaster::new(64);

        let watcher = watch.then(|| {
            FileWatcher::new(root.clone(), events.clone(), Duration::from_millis(100)).unwrap()
        });

        let app = router(
            Arc::new(Explorer::new(sandbox)),
            events,
            RouterOptions::default(),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            root,
            client: reqwest::Client::new(),
            _watcher: watcher,
            _temp: temp,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

fn rows(body: &Value) -> Vec<FlattenedRow> {
    serde_json::from_value(body["flattenedNodes"].clone()).unwrap()
}

fn row<'a>(rows: &'a [FlattenedRow], path: &str) -> &'a FlattenedRow {
    rows.iter()
        .find(|r| r.path == path)
        .unwrap_or_else(|| panic!("no row for {:?}", path))
}

/// Read SSE chunks until one contains `needle`
async fn wait_for(response: &mut reqwest::Response, needle: &str) -> String {
    let mut seen = String::new();
    let found = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(chunk) = response.chunk().await.unwrap() {
            seen.push_str(&String::from_utf8_lossy(&chunk));
            if seen.contains(needle) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);
    assert!(found, "never saw {:?}; got {:?}", needle, seen);
    seen
}

#[tokio::test]
async fn test_files_lists_tree_and_rows() {
    let server = TestServer::start().await;
    std::fs::create_dir(server.root.join("a")).unwrap();
    std::fs::write(server.root.join("a").join("b.txt"), "b").unwrap();

    let body: Value = server
        .client
        .get(server.url("/files"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["fileTree"]["id"], 0);
    assert_eq!(body["fileTree"]["isOpen"], true);
    assert_eq!(body["fileTree"]["children"][0]["name"], "a");

    let rows = rows(&body);
    assert_eq!(rows.len(), 3);
    assert!(rows[0].is_visible);
    assert!(row(&rows, "a").is_visible);
    assert!(!row(&rows, "a").is_open);
    assert!(!row(&rows, "a/b.txt").is_visible);
}

#[tokio::test]
async fn test_toggle_opens_directory() {
    let server = TestServer::start().await;
    std::fs::create_dir(server.root.join("a")).unwrap();
    std::fs::write(server.root.join("a").join("b.txt"), "b").unwrap();

    let response = server
        .client
        .post(server.url("/files/toggle"))
        .json(&json!({ "path": "a" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["toggled"], true);
    let listed = rows(&body);
    assert!(row(&listed, "a").is_open);
    assert!(row(&listed, "a/b.txt").is_visible);

    // The returned open set reproduces the same view
    let body: Value = server
        .client
        .post(server.url("/files/tree"))
        .json(&json!({ "openPaths": body["openPaths"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(row(&rows(&body), "a/b.txt").is_visible);
}

#[tokio::test]
async fn test_toggle_unknown_path_is_signalled() {
    let server = TestServer::start().await;

    let body: Value = server
        .client
        .post(server.url("/files/toggle"))
        .json(&json!({ "path": "nope" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["toggled"], false);
    assert_eq!(body["openPaths"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_read_delete_round_trip() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/files/create"))
        .json(&json!({ "filePath": "x/y/z.txt", "content": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "File created: x/y/z.txt");
    let depths: Vec<usize> = rows(&body).iter().map(|r| r.depth).collect();
    assert_eq!(depths, vec![0, 1, 2, 3]);

    let body: Value = server
        .client
        .get(server.url("/files/content"))
        .query(&[("path", "x/y/z.txt")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["content"], "hi");
    assert_eq!(body["fileInfo"]["name"], "z.txt");
    assert_eq!(body["fileInfo"]["size"], 2);
    assert_eq!(body["fileInfo"]["extension"], ".txt");

    let response = server
        .client
        .delete(server.url("/files/delete"))
        .json(&json!({ "path": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Directory deleted");
    assert_eq!(rows(&body).len(), 1);

    let response = server
        .client
        .delete(server.url("/files/delete"))
        .json(&json!({ "path": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "File or directory not found");
}

#[tokio::test]
async fn test_create_directory_with_alias_fields() {
    let server = TestServer::start().await;

    let body: Value = server
        .client
        .post(server.url("/files/create"))
        .json(&json!({ "path": "docs", "isDir": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["message"], "Directory created: docs");
    assert!(server.root.join("docs").is_dir());
}

#[tokio::test]
async fn test_validation_and_sandbox_errors() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/files/create"))
        .json(&json!({ "content": "orphan" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "File path is required");

    let response = server
        .client
        .post(server.url("/files/toggle"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .get(server.url("/files/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .delete(server.url("/files/delete"))
        .json(&json!({ "path": "../outside" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_raw_and_legacy_content() {
    let server = TestServer::start().await;
    std::fs::write(server.root.join("pixel.png"), [0x89, b'P', b'N', b'G']).unwrap();
    std::fs::write(server.root.join("note.md"), "# hi").unwrap();

    let response = server
        .client
        .get(server.url("/files/content"))
        .query(&[("path", "pixel.png"), ("raw", "true")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.bytes().await.unwrap().as_ref(), &[0x89, b'P', b'N', b'G']);

    let body: Value = server
        .client
        .get(server.url("/content"))
        .query(&[("path", "note.md")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["content"], "# hi");
    assert_eq!(body["size"], 4);
    assert!(body["modifiedTime"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_collaborate_reads_absolute_path() {
    let server = TestServer::start().await;
    std::fs::write(server.root.join("shared.txt"), "together").unwrap();

    let absolute = server.root.join("shared.txt");
    let body: Value = server
        .client
        .get(server.url(&format!("/collaborate{}", absolute.display())))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["content"], "together");
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let body: Value = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_realtime_terminal_echo() {
    let server = TestServer::start().await;

    let mut stream = server.client.get(server.url("/events")).send().await.unwrap();
    assert_eq!(stream.status(), StatusCode::OK);
    let greeting = wait_for(&mut stream, "node-pty removed").await;
    assert!(greeting.contains("terminal:data"));

    let response = server
        .client
        .post(server.url("/events"))
        .json(&json!({ "event": "terminal:write", "data": "ls" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    wait_for(&mut stream, "> ls").await;
}

#[tokio::test]
async fn test_realtime_file_change_writes_and_refreshes() {
    let server = TestServer::start().await;

    let mut stream = server.client.get(server.url("/events")).send().await.unwrap();
    wait_for(&mut stream, "node-pty removed").await;

    let response = server
        .client
        .post(server.url("/events"))
        .json(&json!({
            "event": "file:change",
            "data": { "path": "src/app.js", "content": "console.log(1)" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = wait_for(&mut stream, "file:refresh").await;
    assert!(seen.contains("app.js"));
    assert_eq!(
        std::fs::read_to_string(server.root.join("src").join("app.js")).unwrap(),
        "console.log(1)"
    );

    server
        .client
        .post(server.url("/events"))
        .json(&json!({ "event": "file:run", "data": { "path": "src/app.js" } }))
        .send()
        .await
        .unwrap();
    wait_for(&mut stream, "Console output would appear here").await;
}

#[tokio::test]
async fn test_create_over_http_reaches_watchers() {
    let server = TestServer::start_watched().await;

    let mut stream = server.client.get(server.url("/events")).send().await.unwrap();
    wait_for(&mut stream, "node-pty removed").await;

    let response = server
        .client
        .post(server.url("/files/create"))
        .json(&json!({ "filePath": "fresh.txt", "content": "new" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = wait_for(&mut stream, "fresh.txt").await;
    assert!(seen.contains("event: file:refresh"));
}

#[tokio::test]
async fn test_open_paths_accept_relative_entries() {
    let server = TestServer::start().await;
    std::fs::create_dir(server.root.join("a")).unwrap();
    std::fs::write(server.root.join("a").join("b.txt"), "b").unwrap();

    let body: Value = server
        .client
        .post(server.url("/files/tree"))
        .json(&json!({ "openPaths": ["/", "a"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(row(&rows(&body), "a").is_open);
    assert!(row(&rows(&body), "a/b.txt").is_visible);

    let body: Value = server
        .client
        .post(server.url("/files/toggle"))
        .json(&json!({ "path": "a", "openPaths": ["/", "a"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["toggled"], true);
    assert!(!row(&rows(&body), "a").is_open);
    assert_eq!(body["openPaths"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_entry_below_a_file_is_404() {
    let server = TestServer::start().await;
    std::fs::write(server.root.join("file.txt"), "x").unwrap();

    let response = server
        .client
        .delete(server.url("/files/delete"))
        .json(&json!({ "path": "file.txt/child" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .client
        .get(server.url("/files/content"))
        .query(&[("path", "file.txt/child")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vanished_sandbox_is_500() {
    let server = TestServer::start().await;
    std::fs::remove_dir(&server.root).unwrap();

    let response = server.client.get(server.url("/files")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to read directory");
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_sandbox_is_403() {
    let server = TestServer::start().await;
    let outside = TempDir::new().unwrap();
    std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
    std::os::unix::fs::symlink(outside.path(), server.root.join("link")).unwrap();

    let response = server
        .client
        .get(server.url("/files/content"))
        .query(&[("path", "link/secret.txt"), ("raw", "true")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .client
        .post(server.url("/files/create"))
        .json(&json!({ "filePath": "link/planted.txt", "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!outside.path().join("planted.txt").exists());
}

#[tokio::test]
async fn test_raw_content_streams_large_files() {
    let server = TestServer::start().await;
    let blob: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(server.root.join("big.bin"), &blob).unwrap();

    let response = server
        .client
        .get(server.url("/files/content"))
        .query(&[("path", "big.bin"), ("raw", "true")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-length"], "300000");
    assert_eq!(response.headers()["content-type"], "application/octet-stream");
    assert_eq!(response.bytes().await.unwrap().as_ref(), blob.as_slice());
}
