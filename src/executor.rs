//! Migration Executor (C6), adapted from the donor's `utils::tempfiles` staging pattern
//! (temp-path-then-atomic-rename) generalised to stream-through-local-staging archive/restore
//! moves against the `FileService` boundary.

use crate::error::MigrationError;
use crate::file_service::{stub_path_for, FileService};
use crate::types::{ActionType, FileMeta, MigrationFailure, MovementRecord};
use chrono::Utc;
use std::path::Path;

pub struct ArchiveOutcome {
    pub movements: Vec<MovementRecord>,
    pub failures: Vec<MigrationFailure>,
}

/// Archive a batch of data-side files to `archive_root` (§4.6).
///
/// Each file is independent: a failure is recorded and processing continues. Movement records
/// are returned pending (not yet journaled); the caller commits them in one transaction after
/// the whole batch completes (§4.6 "Batch semantics").
pub fn archive_batch(
    service: &dyn FileService,
    files: &[FileMeta],
    archive_root: &str,
    staging_dir: &Path,
) -> ArchiveOutcome {
    let mut movements = Vec::new();
    let mut failures = Vec::new();

    for file in files {
        match archive_one(service, file, archive_root, staging_dir) {
            Ok(record) => movements.push(record),
            Err(e) => failures.push(MigrationFailure {
                path: file.path.clone(),
                reason: e.reason_code().to_string(),
            }),
        }
    }

    ArchiveOutcome { movements, failures }
}

fn archive_one(
    service: &dyn FileService,
    file: &FileMeta,
    archive_root: &str,
    staging_dir: &Path,
) -> Result<MovementRecord, MigrationError> {
    let size = service.probe_readable(&file.path).map_err(|e| classify_read_error(&file.path, &e))?;
    if size == 0 {
        return Err(MigrationError::ZeroSizeSource { path: file.path.clone() });
    }

    let destination = destination_path(&file.path, archive_root);
    let staging_path = staging_dir.join(staging_name(&file.path));

    service
        .download(&file.path, &staging_path)
        .map_err(|e| MigrationError::DownloadFailed { path: file.path.clone(), reason: e.to_string() })?;

    let upload_result = service.upload(&staging_path, &destination);
    let _ = std::fs::remove_file(&staging_path);
    upload_result.map_err(|e| MigrationError::UploadFailed { path: file.path.clone(), reason: e.to_string() })?;

    service
        .remove(&file.path)
        .map_err(|e| MigrationError::SourceDeleteFailed { path: file.path.clone(), reason: e.to_string() })?;

    // Stamp destination times to preserve recency; failures here don't abort the move.
    if let Err(e) = service.set_times(&destination, file.accessed, file.modified) {
        log::warn!("failed to stamp times on {destination}: {e}");
    }

    // Stub creation failure is logged but not fatal; the journal still reflects the move (§4.6).
    if let Err(e) = service.write_stub(&stub_path_for(&file.path), &destination) {
        log::warn!("failed to write stub launcher for {}: {e}", file.path);
    }

    let now = Utc::now();
    Ok(MovementRecord {
        source_path: file.path.clone(),
        destination_path: destination,
        created: file.created,
        accessed: file.accessed,
        modified: file.modified,
        size,
        action: ActionType::MovedToArchive,
        event_time: now,
    })
}

pub struct RestoreOutcome {
    pub movements: Vec<MovementRecord>,
    pub failures: Vec<MigrationFailure>,
}

/// One archive-side file plus the original (data-side) path to restore it to.
pub struct RestoreRequest {
    pub archived: FileMeta,
    pub original_path: String,
}

/// Restore a batch of archive-side files back to their original paths (§4.6).
pub fn restore_batch(
    service: &dyn FileService,
    requests: &[RestoreRequest],
    staging_dir: &Path,
) -> RestoreOutcome {
    let mut movements = Vec::new();
    let mut failures = Vec::new();

    for request in requests {
        match restore_one(service, request, staging_dir) {
            Ok(record) => movements.push(record),
            Err(e) => failures.push(MigrationFailure {
                path: request.archived.path.clone(),
                reason: e.reason_code().to_string(),
            }),
        }
    }

    RestoreOutcome { movements, failures }
}

fn restore_one(
    service: &dyn FileService,
    request: &RestoreRequest,
    staging_dir: &Path,
) -> Result<MovementRecord, MigrationError> {
    let archived = &request.archived;
    let size = service
        .probe_readable(&archived.path)
        .map_err(|e| classify_read_error(&archived.path, &e))?;

    let staging_path = staging_dir.join(staging_name(&archived.path));
    service
        .download(&archived.path, &staging_path)
        .map_err(|e| MigrationError::DownloadFailed { path: archived.path.clone(), reason: e.to_string() })?;

    let upload_result = service.upload(&staging_path, &request.original_path);
    let _ = std::fs::remove_file(&staging_path);
    upload_result.map_err(|e| MigrationError::UploadFailed {
        path: archived.path.clone(),
        reason: e.to_string(),
    })?;

    if let Err(e) = service.set_times(&request.original_path, archived.accessed, archived.modified) {
        log::warn!("failed to stamp times on {}: {e}", request.original_path);
    }

    if let Err(e) = service.remove(&archived.path) {
        return Err(MigrationError::SourceDeleteFailed { path: archived.path.clone(), reason: e.to_string() });
    }

    let stub = stub_path_for(&request.original_path);
    if service.exists(&stub) {
        if let Err(e) = service.remove(&stub) {
            log::warn!("failed to remove stub launcher {stub}: {e}");
        }
    }

    Ok(MovementRecord {
        source_path: archived.path.clone(),
        destination_path: request.original_path.clone(),
        created: archived.created,
        accessed: archived.accessed,
        modified: archived.modified,
        size,
        action: ActionType::RestoredFromArchive,
        event_time: Utc::now(),
    })
}

fn destination_path(source_path: &str, archive_root: &str) -> String {
    // Replace the share segment of the UNC path with the archive root, preserving the
    // remainder of the path under the share.
    let trimmed = source_path.trim_start_matches('\\');
    let mut parts = trimmed.splitn(3, '\\');
    let _host = parts.next();
    let _share = parts.next();
    let rest = parts.next().unwrap_or_default();
    format!("{}\\{}", archive_root.trim_end_matches('\\'), rest)
}

fn staging_name(path: &str) -> String {
    path.chars()
        .map(|c| if c.is_alphanumeric() || c == '.' { c } else { '_' })
        .collect()
}

fn classify_read_error(path: &str, err: &std::io::Error) -> MigrationError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => MigrationError::PermissionDenied { path: path.to_string() },
        std::io::ErrorKind::NotFound => MigrationError::SourceNotFound { path: path.to_string() },
        std::io::ErrorKind::TimedOut => MigrationError::Timeout { path: path.to_string() },
        _ => MigrationError::FatalUnexpected { path: path.to_string(), reason: err.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_service::LocalFileService;
    use chrono::Utc;

    fn meta(path: &str, size_hint: u64) -> FileMeta {
        let now = Utc::now();
        FileMeta {
            path: path.to_string(),
            size: size_hint,
            created: now,
            accessed: now,
            modified: now,
            source: None,
            original_path: None,
        }
    }

    #[test]
    fn archive_then_restore_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let svc = LocalFileService::new(root.path());

        // seed the source file
        std::fs::create_dir_all(root.path().join("host/share1/proj")).unwrap();
        std::fs::write(root.path().join("host/share1/proj/report.pdf"), b"payload").unwrap();

        let source = r"\\host\share1\proj\report.pdf";
        let file = meta(source, 7);

        let outcome = archive_batch(&svc, &[file.clone()], r"\\host\archive1", staging.path());
        assert_eq!(outcome.failures.len(), 0, "{:?}", outcome.failures);
        assert_eq!(outcome.movements.len(), 1);
        let mv = &outcome.movements[0];
        assert_eq!(mv.action, ActionType::MovedToArchive);
        assert!(!svc.exists(source));
        assert!(svc.exists(&mv.destination_path));
        assert!(svc.exists(&stub_path_for(source)));

        let restore_req = RestoreRequest {
            archived: FileMeta { path: mv.destination_path.clone(), ..file },
            original_path: source.to_string(),
        };
        let restored = restore_batch(&svc, &[restore_req], staging.path());
        assert_eq!(restored.failures.len(), 0, "{:?}", restored.failures);
        assert!(svc.exists(source));
        let bytes = std::fs::read(root.path().join("host/share1/proj/report.pdf")).unwrap();
        assert_eq!(bytes, b"payload");
    }

    #[test]
    fn zero_size_source_fails_with_reason() {
        let root = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let svc = LocalFileService::new(root.path());
        std::fs::create_dir_all(root.path().join("host/share1")).unwrap();
        std::fs::write(root.path().join("host/share1/empty.dat"), b"").unwrap();

        let file = meta(r"\\host\share1\empty.dat", 0);
        let outcome = archive_batch(&svc, &[file], r"\\host\archive1", staging.path());
        assert_eq!(outcome.movements.len(), 0);
        assert_eq!(outcome.failures[0].reason, "zero-size-source");
    }

    #[test]
    fn middle_file_failure_does_not_abort_batch() {
        let root = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let svc = LocalFileService::new(root.path());
        std::fs::create_dir_all(root.path().join("host/share1")).unwrap();
        std::fs::write(root.path().join("host/share1/a.dat"), b"a").unwrap();
        std::fs::write(root.path().join("host/share1/c.dat"), b"c").unwrap();
        // b.dat deliberately missing -> source-not-found

        let files = vec![
            meta(r"\\host\share1\a.dat", 1),
            meta(r"\\host\share1\b.dat", 1),
            meta(r"\\host\share1\c.dat", 1),
        ];
        let outcome = archive_batch(&svc, &files, r"\\host\archive1", staging.path());
        assert_eq!(outcome.movements.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].path, r"\\host\share1\b.dat");
    }
}
