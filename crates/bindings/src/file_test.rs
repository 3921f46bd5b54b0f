//! Tests for the file binding fetcher

use std::fs;

use tempfile::TempDir;

use super::*;

fn write(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("bindings.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn test_reads_bindings() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        r#"
[[bindings]]
application_id = "app-1"
hostname = "host-1"
drain_url = "tcp://127.0.0.1:3459"

[[bindings]]
application_id = "app-2"
hostname = "host-2"
drain_url = "tcp://127.0.0.1:3460"
"#,
    );

    let bindings = FileBindingFetcher::new(path).fetch_bindings().await.unwrap();

    assert_eq!(
        bindings,
        vec![
            Binding::new("app-1", "host-1", "tcp://127.0.0.1:3459"),
            Binding::new("app-2", "host-2", "tcp://127.0.0.1:3460"),
        ]
    );
}

#[tokio::test]
async fn test_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let fetcher = FileBindingFetcher::new(dir.path().join("absent.toml"));

    assert!(fetcher.fetch_bindings().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "");

    assert!(FileBindingFetcher::new(path).fetch_bindings().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_toml_is_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "[[bindings]\napplication_id = ");

    let err = FileBindingFetcher::new(path).fetch_bindings().await.unwrap_err();
    assert!(matches!(err, BindingError::Parse { .. }));
}

#[tokio::test]
async fn test_missing_application_id_is_error() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        r#"
[[bindings]]
application_id = ""
hostname = "h"
drain_url = "tcp://127.0.0.1:1"
"#,
    );

    let err = FileBindingFetcher::new(path).fetch_bindings().await.unwrap_err();
    assert!(matches!(err, BindingError::Invalid { .. }));
}

#[tokio::test]
async fn test_invalid_drain_url_is_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        r#"
[[bindings]]
application_id = "bad"
hostname = "h"
drain_url = "not a url"

[[bindings]]
application_id = "good"
hostname = "h"
drain_url = "tcp://127.0.0.1:3459"
"#,
    );

    let bindings = FileBindingFetcher::new(path).fetch_bindings().await.unwrap();

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].application_id, "good");
}

#[tokio::test]
async fn test_reflects_latest_contents() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "[[bindings]]\napplication_id = \"a\"\nhostname = \"h\"\ndrain_url = \"tcp://127.0.0.1:1\"\n",
    );
    let fetcher = FileBindingFetcher::new(&path);
    assert_eq!(fetcher.fetch_bindings().await.unwrap().len(), 1);

    fs::write(&path, "").unwrap();
    assert!(fetcher.fetch_bindings().await.unwrap().is_empty());
}
