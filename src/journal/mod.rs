//! Cooldown & Journal Store (C4), adapted from the donor's `engine::db_ops` (schema, WAL
//! pragmas, transactional batch writes) but with this spec's three append-only tables in place
//! of the donor's `paths`/`diskinfo` index tables.

mod schema;

pub use schema::SCHEMA;

use crate::error::JournalError;
use crate::types::{ActionType, EvaluationRecord, MovementRecord, ScanSummaryRecord};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// WAL tuning mirrors the donor's `open_db`: durability is relaxed to `NORMAL` since WAL mode
/// itself guarantees consistency on crash, trading a narrow fsync window for throughput on a
/// journal that writes in small batches.
const WAL_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA wal_autocheckpoint = 1000;
";

pub struct Journal {
    conn: Connection,
}

impl Journal {
    pub fn open(path: &Path) -> Result<Journal, JournalError> {
        let conn = Connection::open(path).map_err(|source| JournalError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch(WAL_PRAGMAS)
            .map_err(|source| JournalError::Open { path: path.to_path_buf(), source })?;
        conn.execute_batch(SCHEMA)
            .map_err(|source| JournalError::Open { path: path.to_path_buf(), source })?;
        Ok(Journal { conn })
    }

    pub fn open_in_memory() -> Result<Journal, JournalError> {
        let conn = Connection::open_in_memory().map_err(|source| JournalError::Open {
            path: Path::new(":memory:").to_path_buf(),
            source,
        })?;
        conn.execute_batch(SCHEMA)
            .map_err(|source| JournalError::Open { path: Path::new(":memory:").to_path_buf(), source })?;
        Ok(Journal { conn })
    }

    /// One transaction per batch; commit on success, roll back and report on failure (§4.4).
    pub fn record_movements(&mut self, batch: &[MovementRecord]) -> Result<(), JournalError> {
        let tx = self.conn.transaction().map_err(|source| JournalError::Transaction { source })?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO movements
                     (source_path, destination_path, created_ns, accessed_ns, modified_ns, size, action, event_time_ns)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(|source| JournalError::Transaction { source })?;
            for record in batch {
                stmt.execute(params![
                    record.source_path,
                    record.destination_path,
                    record.created.timestamp_nanos_opt().unwrap_or_default(),
                    record.accessed.timestamp_nanos_opt().unwrap_or_default(),
                    record.modified.timestamp_nanos_opt().unwrap_or_default(),
                    record.size as i64,
                    action_code(record.action),
                    record.event_time.timestamp_nanos_opt().unwrap_or_default(),
                ])
                .map_err(|source| JournalError::Transaction { source })?;
            }
        }
        tx.commit().map_err(|source| JournalError::Transaction { source })?;
        Ok(())
    }

    pub fn record_evaluation(&self, record: &EvaluationRecord) -> Result<(), JournalError> {
        let raw = serde_json::to_string(&record.raw_scores).unwrap_or_default();
        let weighted = serde_json::to_string(&record.weighted_scores).unwrap_or_default();
        self.conn
            .execute(
                "INSERT INTO evaluations
                 (share, volume, mode, should_scan, score, reason, raw_scores, weighted_scores,
                  cold_file_count, restore_file_count, timestamp_ns)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.share,
                    record.volume,
                    record.mode.to_string(),
                    record.should_scan,
                    record.score,
                    record.reason,
                    raw,
                    weighted,
                    record.cold_file_count as i64,
                    record.restore_file_count as i64,
                    record.timestamp.timestamp_nanos_opt().unwrap_or_default(),
                ],
            )
            .map_err(|source| JournalError::Transaction { source })?;
        Ok(())
    }

    pub fn record_scan_summary(&self, record: &ScanSummaryRecord) -> Result<(), JournalError> {
        let filters = record.filters_used.as_ref().map(|v| v.to_string());
        self.conn
            .execute(
                "INSERT INTO scan_summaries
                 (share, files_scanned, files_archived, files_restored, filters_used,
                  triggered_by_user, timestamp_ns)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.share,
                    record.files_scanned as i64,
                    record.files_archived as i64,
                    record.files_restored as i64,
                    filters,
                    record.triggered_by_user,
                    record.timestamp.timestamp_nanos_opt().unwrap_or_default(),
                ],
            )
            .map_err(|source| JournalError::Transaction { source })?;
        Ok(())
    }

    /// Max timestamp of ScanSummaryRecord for `share` (§4.4).
    pub fn last_scan_time(&self, share: &str) -> Result<Option<DateTime<Utc>>, JournalError> {
        let ns: Option<i64> = self
            .conn
            .query_row(
                "SELECT MAX(timestamp_ns) FROM scan_summaries WHERE share = ?1",
                params![share],
                |row| row.get(0),
            )
            .optional()
            .map_err(|source| JournalError::Query { source })?
            .flatten();
        Ok(ns.and_then(ns_to_datetime))
    }

    /// `true` iff `now - last_scan_time < hours`. A share with no history is not in cooldown
    /// (§4.4).
    pub fn in_cooldown(&self, share: &str, hours: i64, now: DateTime<Utc>) -> Result<bool, JournalError> {
        match self.last_scan_time(share)? {
            None => Ok(false),
            Some(last) => Ok(now - last < chrono::Duration::hours(hours)),
        }
    }

    /// Count of distinct files (identified by their data-side path) whose latest action was
    /// `moved_to_archive` (§4.4).
    ///
    /// `source_path` switches role by action: on a `moved_to_archive` row it's the data-side
    /// path, but on a `restored_from_archive` row it's the archive-side path the restore read
    /// from (`destination_path` holds the data-side path there, see `executor::restore_one`).
    /// Grouping on the raw `source_path` column therefore treats those two rows as different
    /// files instead of two events on the same one, leaving a stale `moved_to_archive` row as
    /// the apparent "latest" after a restore. Derive a role-normalised `logical_path` (always
    /// the data-side path) before grouping so "latest action per file" is computed correctly.
    pub fn unique_archived_count(&self, share_prefix: &str) -> Result<u64, JournalError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM (
                    SELECT logical_path, action
                    FROM (
                        SELECT
                            CASE WHEN action = 'moved_to_archive' THEN source_path ELSE destination_path END AS logical_path,
                            action,
                            event_time_ns
                        FROM movements
                    )
                    WHERE logical_path LIKE ?1 || '%'
                    GROUP BY logical_path
                    HAVING MAX(event_time_ns) = event_time_ns
                 ) WHERE action = ?2",
                params![share_prefix, action_code(ActionType::MovedToArchive)],
                |row| row.get(0),
            )
            .map_err(|source| JournalError::Query { source })?;
        Ok(count.max(0) as u64)
    }

    /// Most-recent `moved_to_archive` row whose `destination_path` equals `archive_path`
    /// (§4.4, §9 open-question resolution: lookup is by destination_path, not source_path).
    pub fn lookup_original(&self, archive_path: &str) -> Result<Option<MovementRecord>, JournalError> {
        let row = self
            .conn
            .query_row(
                "SELECT source_path, destination_path, created_ns, accessed_ns, modified_ns, size, event_time_ns
                 FROM movements
                 WHERE destination_path = ?1 AND action = ?2
                 ORDER BY event_time_ns DESC
                 LIMIT 1",
                params![archive_path, action_code(ActionType::MovedToArchive)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(|source| JournalError::Query { source })?;

        Ok(row.map(|(source_path, destination_path, created_ns, accessed_ns, modified_ns, size, event_time_ns)| {
            MovementRecord {
                source_path,
                destination_path,
                created: ns_to_datetime(created_ns).unwrap_or_else(Utc::now),
                accessed: ns_to_datetime(accessed_ns).unwrap_or_else(Utc::now),
                modified: ns_to_datetime(modified_ns).unwrap_or_else(Utc::now),
                size: size.max(0) as u64,
                action: ActionType::MovedToArchive,
                event_time: ns_to_datetime(event_time_ns).unwrap_or_else(Utc::now),
            }
        }))
    }
}

fn action_code(action: ActionType) -> &'static str {
    match action {
        ActionType::MovedToArchive => "moved_to_archive",
        ActionType::RestoredFromArchive => "restored_from_archive",
    }
}

fn ns_to_datetime(ns: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_nanos_opt(ns).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(action: ActionType, source: &str, dest: &str, t: DateTime<Utc>) -> MovementRecord {
        MovementRecord {
            source_path: source.to_string(),
            destination_path: dest.to_string(),
            created: t,
            accessed: t,
            modified: t,
            size: 100,
            action,
            event_time: t,
        }
    }

    #[test]
    fn cooldown_law() {
        let mut j = Journal::open_in_memory().unwrap();
        let t0 = Utc::now();
        j.record_scan_summary(&ScanSummaryRecord {
            share: "share1".into(),
            files_scanned: 10,
            files_archived: 1,
            files_restored: 0,
            filters_used: None,
            triggered_by_user: false,
            timestamp: t0,
        })
        .unwrap();

        assert!(j.in_cooldown("share1", 6, t0 + chrono::Duration::hours(5)).unwrap());
        assert!(!j.in_cooldown("share1", 6, t0 + chrono::Duration::hours(6)).unwrap());
        assert!(!j.in_cooldown("share-without-history", 6, t0).unwrap());
    }

    #[test]
    fn lookup_original_uses_destination_path() {
        let mut j = Journal::open_in_memory().unwrap();
        let t0 = Utc::now();
        j.record_movements(&[record(
            ActionType::MovedToArchive,
            r"\\host\share\a.pdf",
            r"\\host\archive\a.pdf",
            t0,
        )])
        .unwrap();

        let found = j.lookup_original(r"\\host\archive\a.pdf").unwrap().unwrap();
        assert_eq!(found.source_path, r"\\host\share\a.pdf");
        assert!(j.lookup_original(r"\\host\share\a.pdf").unwrap().is_none());
    }

    #[test]
    fn unique_archived_count_tracks_latest_action_per_path() {
        let mut j = Journal::open_in_memory().unwrap();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(1);
        j.record_movements(&[record(
            ActionType::MovedToArchive,
            r"\\host\share\a.pdf",
            r"\\host\archive\a.pdf",
            t0,
        )])
        .unwrap();
        assert_eq!(j.unique_archived_count(r"\\host\share").unwrap(), 1);

        j.record_movements(&[record(
            ActionType::RestoredFromArchive,
            r"\\host\archive\a.pdf",
            r"\\host\share\a.pdf",
            t1,
        )])
        .unwrap();
        assert_eq!(j.unique_archived_count(r"\\host\share").unwrap(), 0);
    }

    #[test]
    fn batch_commit_is_all_or_nothing() {
        let mut j = Journal::open_in_memory().unwrap();
        let t0 = Utc::now();
        let batch = vec![
            record(ActionType::MovedToArchive, "a", "archive/a", t0),
            record(ActionType::MovedToArchive, "b", "archive/b", t0),
        ];
        j.record_movements(&batch).unwrap();
        assert_eq!(j.unique_archived_count("").unwrap(), 2);
    }
}
