use chrono::Utc;
use hwmon_storage::{AlertStore, FileAlertStore};
use hwmon_types::{Alert, Status};
use std::sync::Arc;
use tempfile::TempDir;

fn alert(metric: &str, status: Status, count: u32) -> Alert {
    Alert::new(
        metric,
        status,
        format!("{}: High {}: 91.0", status.label(), metric),
        Utc::now(),
        count,
    )
}

#[tokio::test]
async fn test_file_store_append_and_recent() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileAlertStore::new(temp_dir.path().join("nested/alerts.jsonl"));

    store.record(&alert("cpu", Status::Warning, 1)).await.unwrap();
    store.record(&alert("cpu", Status::Critical, 1)).await.unwrap();
    store.record(&alert("disk", Status::Warning, 1)).await.unwrap();

    let recent = store.recent(5).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].metric_id, "disk");
    assert_eq!(recent[1].status, Status::Critical);
    assert_eq!(recent[2].status, Status::Warning);

    let limited = store.recent(1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].metric_id, "disk");
}

#[tokio::test]
async fn test_file_store_missing_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileAlertStore::new(temp_dir.path().join("alerts.jsonl"));

    let recent = tokio_test::assert_ok!(store.recent(5).await);
    assert!(recent.is_empty());
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("alerts.jsonl");

    {
        let store = FileAlertStore::new(&path);
        store.record(&alert("ram", Status::Critical, 2)).await.unwrap();
    }

    let store = FileAlertStore::new(&path);
    store.record(&alert("ram", Status::Critical, 3)).await.unwrap();

    let recent = store.recent(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].notification_count, 3);
    assert_eq!(recent[1].notification_count, 2);
}

#[tokio::test]
async fn test_file_store_skips_truncated_line() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("alerts.jsonl");
    let store = FileAlertStore::new(&path);

    store.record(&alert("cpu", Status::Warning, 1)).await.unwrap();
    let mut content = tokio::fs::read_to_string(&path).await.unwrap();
    content.push_str("{\"metric_id\":\"cpu\",\"sta");
    tokio::fs::write(&path, content).await.unwrap();

    let recent = store.recent(5).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].metric_id, "cpu");
}

#[tokio::test]
async fn test_file_store_concurrent_writes_keep_lines_intact() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileAlertStore::new(temp_dir.path().join("alerts.jsonl")));

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.record(&alert(&format!("metric{}", i), Status::Warning, 1)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let recent = store.recent(100).await.unwrap();
    assert_eq!(recent.len(), 10);
}

#[tokio::test]
async fn test_file_store_recent_reads_from_tail() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileAlertStore::new(temp_dir.path().join("alerts.jsonl"));

    for count in 1..=500 {
        store.record(&alert("cpu", Status::Critical, count)).await.unwrap();
    }

    let recent = store.recent(3).await.unwrap();
    let counts: Vec<u32> = recent.iter().map(|a| a.notification_count).collect();
    assert_eq!(counts, vec![500, 499, 498]);

    let all = store.recent(1000).await.unwrap();
    assert_eq!(all.len(), 500);
    assert_eq!(all[0].notification_count, 500);
    assert_eq!(all[499].notification_count, 1);

    assert!(store.recent(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_store_line_longer_than_read_chunk() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileAlertStore::new(temp_dir.path().join("alerts.jsonl"));

    let long = Alert::new("disk", Status::Warning, "x".repeat(20_000), Utc::now(), 1);
    store.record(&alert("cpu", Status::Warning, 1)).await.unwrap();
    store.record(&long).await.unwrap();
    store.record(&alert("ram", Status::Critical, 1)).await.unwrap();

    let recent = store.recent(10).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].metric_id, "ram");
    assert_eq!(recent[1].message.len(), 20_000);
    assert_eq!(recent[2].metric_id, "cpu");
}
