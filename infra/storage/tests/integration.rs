use bazaar_storage::*;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

async fn open(temp: &TempDir) -> Storage {
    Storage::builder().root(temp.path()).connect().await.unwrap()
}

#[tokio::test]
async fn test_set_get_overwrite() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.set("token", b"first").await.unwrap();
    storage.set("token", b"second").await.unwrap();

    assert_eq!(storage.get("token").await.unwrap().as_deref(), Some(&b"second"[..]));
    assert_eq!(storage.get_string("token").await.unwrap().as_deref(), Some("second"));
}

#[tokio::test]
async fn test_missing_key_is_none() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    assert_eq!(storage.get("token").await.unwrap(), None);
    assert_eq!(storage.get_string("token").await.unwrap(), None);
    assert!(!storage.contains("token").await.unwrap());
}

#[tokio::test]
async fn test_remove_reports_presence() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.set("draft", "hello").await.unwrap();
    assert!(storage.contains("draft").await.unwrap());

    assert!(storage.remove("draft").await.unwrap());
    assert!(!storage.remove("draft").await.unwrap());
    assert!(!storage.contains("draft").await.unwrap());
}

#[tokio::test]
async fn test_invalid_keys_never_touch_disk() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    for key in ["../escape", "nested/key", ".hidden", ""] {
        let err = storage.set(key, b"x").await.expect_err(key);
        assert!(matches!(err, StorageError::InvalidKey { .. }), "{key}: {err}");
        assert!(matches!(storage.get(key).await, Err(StorageError::InvalidKey { .. })));
    }

    assert!(storage.keys().await.unwrap().is_empty());
    assert!(!temp.path().parent().unwrap().join("escape").exists());
}

#[tokio::test]
async fn test_keys_skip_temp_and_foreign_entries() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.set("b", "2").await.unwrap();
    storage.set("a", "1").await.unwrap();
    std::fs::write(temp.path().join(".b.bazaartmp.77.1"), b"partial").unwrap();
    std::fs::create_dir(temp.path().join("subdir")).unwrap();

    assert_eq!(storage.keys().await.unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_non_utf8_value_is_an_error_for_get_string() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.set("blob", [0xff_u8, 0xfe, 0x00]).await.unwrap();

    assert!(storage.get("blob").await.unwrap().is_some());
    let err = storage.get_string("blob").await.expect_err("invalid utf-8");
    assert!(matches!(err, StorageError::Io { .. }));
}

#[tokio::test]
async fn test_connect_without_create_requires_existing_root() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");

    let err = Storage::builder().root(&missing).create(false).connect().await.expect_err("missing");
    assert!(matches!(err, StorageError::DirectoryNotFound { .. }));
    assert!(!missing.exists());
}

#[tokio::test]
async fn test_connect_creates_nested_root() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("a").join("b");

    let storage = Storage::builder().root(&nested).connect().await.unwrap();
    storage.set("token", "t").await.unwrap();

    assert!(nested.join("token").is_file());
    assert_eq!(storage.root(), nested.canonicalize().unwrap());
}

#[tokio::test]
async fn test_connect_purges_stale_temp_files() {
    let temp = TempDir::new().unwrap();
    let orphan = temp.path().join(".token.bazaartmp.1.1");
    let file = std::fs::File::create(&orphan).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(3600)).unwrap();
    drop(file);

    let storage = open(&temp).await;

    assert!(!orphan.exists());
    assert!(storage.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clones_share_the_same_root() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;
    let clone = storage.clone();

    let writer = tokio::spawn(async move { clone.set("shared", "yes").await });
    writer.await.unwrap().unwrap();

    assert_eq!(storage.get_string("shared").await.unwrap().as_deref(), Some("yes"));
}
