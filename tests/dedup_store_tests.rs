mod common;

use fetchline::DedupStore;
use std::sync::Arc;

#[test]
fn missing_file_is_created_with_header() {
    let path = common::unique_dir("dedup_header").join("nested").join("finished.txt");

    let store = DedupStore::open(&path).expect("open store");
    assert!(store.is_empty());

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with('#'), "expected header, got {contents:?}");
}

#[test]
fn added_items_survive_reopen() {
    let path = common::unique_dir("dedup_reopen").join("finished.txt");

    let store = DedupStore::open(&path).unwrap();
    assert!(!store.contains("https://a.test/1"));
    assert!(store.add("https://a.test/1").unwrap());
    assert!(store.add("https://a.test/2").unwrap());
    assert!(store.contains("https://a.test/1"));
    drop(store);

    let reopened = DedupStore::open(&path).unwrap();
    assert!(reopened.contains("https://a.test/1"));
    assert!(reopened.contains("https://a.test/2"));
    assert_eq!(reopened.len(), 2);
}

#[test]
fn preexisting_entries_and_comments() {
    let path = common::unique_dir("dedup_preload").join("finished.txt");
    std::fs::write(&path, "# written by hand\nabcde\n\n  fghij  \n").unwrap();

    let store = DedupStore::open(&path).unwrap();
    assert!(store.contains("abcde"));
    assert!(store.contains("fghij"));
    assert!(!store.contains("# written by hand"));
    assert_eq!(store.len(), 2);
}

#[test]
fn duplicate_add_writes_nothing() {
    let path = common::unique_dir("dedup_dup").join("finished.txt");
    let store = DedupStore::open(&path).unwrap();

    assert!(store.add("abcde").unwrap());
    assert!(!store.add("abcde").unwrap());

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().filter(|l| *l == "abcde").count(), 1);
}

#[test]
fn concurrent_adds_persist_each_item_once() {
    let path = common::unique_dir("dedup_concurrent").join("finished.txt");
    let store = Arc::new(DedupStore::open(&path).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || {
                // Every thread races on the same 50 items.
                for i in 0..50 {
                    store.add(&format!("item-{i}")).unwrap();
                }
                t
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 50);
    let contents = std::fs::read_to_string(&path).unwrap();
    let persisted: Vec<_> = contents.lines().filter(|l| l.starts_with("item-")).collect();
    assert_eq!(persisted.len(), 50);
}
