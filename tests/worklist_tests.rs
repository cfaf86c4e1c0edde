mod common;

use chrono::{TimeZone, Utc};
use fetchline::store::worklist;
use fetchline::{ResultLog, WorkQueue};
use reqwest::StatusCode;
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn missing_work_list_is_created_empty() {
    let path = common::unique_dir("worklist_missing").join("worklist.txt");

    let items = worklist::load(&path).unwrap();
    assert!(items.is_empty());
    assert!(std::fs::read_to_string(&path).unwrap().starts_with('#'));
}

#[test]
fn work_list_skips_comments_and_duplicates() {
    let path = common::unique_dir("worklist_dupes").join("worklist.txt");
    std::fs::write(&path, "# urls\nb\na\n\n# a note\nb\nc\n").unwrap();

    assert_eq!(worklist::load(&path).unwrap(), vec!["b", "a", "c"]);
}

#[test]
fn queue_hands_out_each_item_once_across_threads() {
    let items: Vec<String> = (0..500).map(|i| format!("item-{i}")).collect();
    let queue = Arc::new(WorkQueue::new(items));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            std::thread::spawn(move || {
                let mut taken = Vec::new();
                while let Some(item) = queue.take() {
                    taken.push(item);
                }
                taken
            })
        })
        .collect();

    let mut all = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for item in handle.join().unwrap() {
            total += 1;
            all.insert(item);
        }
    }
    assert_eq!(total, 500);
    assert_eq!(all.len(), 500);
    assert_eq!(queue.remaining(), 0);
}

#[test]
fn result_log_appends_dated_entries() {
    let dir = common::unique_dir("results");
    let log = ResultLog::new(&dir, 5);
    let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();

    let path = log
        .append_at(at, "https://a.test/x", StatusCode::OK, "abcdefghij")
        .unwrap();
    log.append_at(at, "https://a.test/y", StatusCode::CREATED, "{}")
        .unwrap();

    assert_eq!(path, dir.join("results-2026-03-14.log"));
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "[2026-03-14T09:26:53+00:00] https://a.test/x status=200\nabcde\n---\n\
         [2026-03-14T09:26:53+00:00] https://a.test/y status=201\n{}\n---\n"
    );
}
