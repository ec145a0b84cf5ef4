//! Journal tests against a real on-disk SQLite file, mirroring the donor's `tests/db_tests.rs`
//! convention of exercising persistence separately from the in-memory unit tests in
//! `src/journal/mod.rs`.

use chrono::Utc;
use nefax_tier::journal::Journal;
use nefax_tier::types::{ActionType, MovementRecord, ScanSummaryRecord};

fn movement(source: &str, dest: &str, action: ActionType) -> MovementRecord {
    let now = Utc::now();
    MovementRecord {
        source_path: source.to_string(),
        destination_path: dest.to_string(),
        created: now,
        accessed: now,
        modified: now,
        size: 2048,
        action,
        event_time: now,
    }
}

#[test]
fn movements_and_cooldown_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("journal.db");

    {
        let mut journal = Journal::open(&db_path).unwrap();
        journal
            .record_movements(&[movement(
                r"\\host\share1\a.pdf",
                r"\\host\archive1\a.pdf",
                ActionType::MovedToArchive,
            )])
            .unwrap();
        journal
            .record_scan_summary(&ScanSummaryRecord {
                share: "share1".into(),
                files_scanned: 5,
                files_archived: 1,
                files_restored: 0,
                filters_used: None,
                triggered_by_user: true,
                timestamp: Utc::now(),
            })
            .unwrap();
    }

    // Reopen: the WAL file and schema must already exist, and prior rows must be visible.
    let journal = Journal::open(&db_path).unwrap();
    assert_eq!(journal.unique_archived_count(r"\\host\share1").unwrap(), 1);
    assert!(journal.in_cooldown("share1", 24, Utc::now()).unwrap());

    let found = journal.lookup_original(r"\\host\archive1\a.pdf").unwrap().unwrap();
    assert_eq!(found.source_path, r"\\host\share1\a.pdf");
}

#[test]
fn opening_the_same_path_twice_does_not_corrupt_the_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("journal.db");

    let _first = Journal::open(&db_path).unwrap();
    let second = Journal::open(&db_path).unwrap();
    assert_eq!(second.unique_archived_count("").unwrap(), 0);
}
