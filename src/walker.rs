//! Share Walker & Stat Collector (C1), adapted from the donor's walk-thread pipeline
//! (`pipeline::walk`, `pipeline::metadata`): here the "walk thread" drives the `FileService`
//! trait instead of `jwalk`/`walkdir` directly, since the share lives behind that boundary.

use crate::config::Settings;
use crate::file_service::{is_stub_path, FileService, WalkEntry};
use crate::types::{FileMeta, FileSource, ScanStats};
use chrono::{DateTime, Utc};

/// Traverse `share_root` via `service`, classifying files against `settings`' blacklist and the
/// cold/old thresholds derived from the mode (§4.1).
///
/// A directory matching a blacklist token is skipped whole (not descended into); the walker
/// itself doesn't prune descent (the `FileService::walk` contract yields a flat list), so this
/// function filters by directory-prefix membership instead. Launcher stubs are excluded from
/// every count.
pub fn walk_share(
    service: &dyn FileService,
    share_root: &str,
    settings: &Settings,
    cold_days: i64,
    old_days: i64,
) -> ScanStats {
    let entries = match service.walk(share_root) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("walk of share root '{share_root}' failed to initialise: {e}");
            return ScanStats::default();
        }
    };

    let mut blacklisted_dirs: Vec<String> = Vec::new();
    let mut blacklisted_files_skipped: u64 = 0;
    let mut total_file_count: u64 = 0;
    let mut total_file_size: u64 = 0;
    let mut cold_files: Vec<FileMeta> = Vec::new();
    let mut old_file_count: u64 = 0;

    let now = Utc::now();

    for entry in &entries {
        if let WalkEntry::Dir(dir_path) = entry
            && settings.is_blacklisted(dir_path)
        {
            blacklisted_dirs.push(dir_path.clone());
        }
    }

    for entry in entries {
        let meta = match entry {
            WalkEntry::Dir(_) => continue,
            WalkEntry::File(meta) => meta,
        };

        if is_stub_path(&meta.path) {
            continue;
        }

        if blacklisted_dirs.iter().any(|d| meta.path.starts_with(d.as_str())) {
            blacklisted_files_skipped += 1;
            continue;
        }

        total_file_count += 1;
        total_file_size += meta.size;

        if is_cold(&meta, now, cold_days) {
            cold_files.push(FileMeta {
                source: Some(FileSource::Data),
                ..meta.clone()
            });
        }
        if is_old(&meta, now, old_days) {
            old_file_count += 1;
        }
    }

    let total_considered = total_file_count + blacklisted_files_skipped;
    let blacklist_ratio_percent = if total_considered > 0 {
        (blacklisted_files_skipped as f64 / total_considered as f64) * 100.0
    } else {
        0.0
    };

    ScanStats {
        total_file_count,
        total_file_size,
        cold_files,
        old_file_count,
        blacklisted_dirs: blacklisted_dirs.len() as u64,
        blacklisted_files_skipped,
        blacklist_ratio_percent,
        fullness_percent: 0.0, // filled in by the caller from telemetry (§4.2/§4.3)
        size_access_ratio_score: 0.5,
        restorable_file_count: 0,
    }
}

/// Walk an archive share, returning its files tagged `FileSource::Archive` with `original_path`
/// resolved via `original_path_lookup` (typically the journal's `lookup_original`, §4.4/§4.5).
pub fn walk_archive(
    service: &dyn FileService,
    archive_root: &str,
    original_path_lookup: impl Fn(&str) -> Option<String>,
) -> Vec<FileMeta> {
    let entries = match service.walk(archive_root) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("walk of archive root '{archive_root}' failed to initialise: {e}");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match entry {
            WalkEntry::File(meta) if !is_stub_path(&meta.path) => {
                let original_path = original_path_lookup(&meta.path);
                Some(FileMeta {
                    source: Some(FileSource::Archive),
                    original_path,
                    ..meta
                })
            }
            _ => None,
        })
        .collect()
}

/// A file whose last-access time is in the future is treated as "now" for cold calculations
/// (§9 "Clock skew"), avoiding a negative-age underflow.
fn effective_accessed(meta: &FileMeta, now: DateTime<Utc>) -> DateTime<Utc> {
    meta.accessed.min(now)
}

fn is_cold(meta: &FileMeta, now: DateTime<Utc>, cold_days: i64) -> bool {
    let cutoff = now - chrono::Duration::days(cold_days);
    effective_accessed(meta, now) <= cutoff
}

fn is_old(meta: &FileMeta, now: DateTime<Utc>, old_days: i64) -> bool {
    let cutoff = now - chrono::Duration::days(old_days);
    effective_accessed(meta, now) <= cutoff && meta.modified.min(now) <= cutoff
}
