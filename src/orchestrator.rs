//! Scheduler & Orchestrator (C7), adapted from the donor's `pipeline::orchestrator` worker-pool
//! shape: there, N worker threads consume paths from a bounded channel; here, N worker threads
//! consume shares from a bounded channel, each running the full C1-C6 pipeline for one share.
//! Cancellation reuses the donor's `Ctrl+C` -> `Arc<AtomicBool>` -> cooperative-check pattern.

use crate::config::Settings;
use crate::executor::{archive_batch, restore_batch, RestoreRequest};
use crate::file_service::FileService;
use crate::journal::Journal;
use crate::planner::build_plan;
use crate::scoring::{build_feature_vector, should_scan};
use crate::telemetry::TelemetryProvider;
use crate::types::{
    AdminFilters, EvaluationRecord, FileSource, ScanSummaryRecord, ShareDescriptor,
};
use crate::walker::{walk_archive, walk_share};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Cooperative cancellation handle, mirroring the donor's `setup_ctrlc_handler` /
/// `check_for_cancel` pair (§5 "treat these as cancellable").
#[derive(Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-share outcome returned to the caller (§4.7 step 6 "per-share decision-log entry").
#[derive(Debug)]
pub struct ShareOutcome {
    pub evaluation: EvaluationRecord,
    pub files_archived: u64,
    pub files_restored: u64,
    pub failures: Vec<crate::types::MigrationFailure>,
}

pub struct Orchestrator<'a> {
    settings: &'a Settings,
    file_service: &'a dyn FileService,
    telemetry: &'a dyn TelemetryProvider,
    journal: Arc<Mutex<Journal>>,
    staging_dir: std::path::PathBuf,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        settings: &'a Settings,
        file_service: &'a dyn FileService,
        telemetry: &'a dyn TelemetryProvider,
        journal: Journal,
        staging_dir: std::path::PathBuf,
    ) -> Self {
        Orchestrator {
            settings,
            file_service,
            telemetry,
            journal: Arc::new(Mutex::new(journal)),
            staging_dir,
        }
    }

    /// One tick: evaluate and (if warranted) act on every share returned by the telemetry
    /// provider's share inventory. `triggered_by_user` distinguishes a manual trigger from a
    /// scheduled tick in the written `ScanSummaryRecord` (§3).
    ///
    /// Per-share concurrency is bounded by `worker_count`; within one share, files are
    /// processed sequentially by `archive_batch`/`restore_batch` (§5 "never two migrations
    /// touching the same path").
    pub fn run_tick(
        &self,
        worker_count: usize,
        triggered_by_user: bool,
        cancel: &CancellationToken,
    ) -> Vec<ShareOutcome> {
        self.run_tick_with(worker_count, triggered_by_user, false, false, &AdminFilters::default(), cancel)
    }

    /// Like `run_tick`, but with `preview` skipping C6 execution entirely (plan only), `force`
    /// bypassing the cooldown check for this tick (`nefax-tier scan --force`, §5.1), and
    /// `filters` the admin filters (§4.5 step 3, §6) to apply to the candidate set.
    pub fn run_tick_with(
        &self,
        worker_count: usize,
        triggered_by_user: bool,
        preview: bool,
        force: bool,
        filters: &AdminFilters,
        cancel: &CancellationToken,
    ) -> Vec<ShareOutcome> {
        let shares = self.telemetry.list_shares();
        let (tx, rx) = crossbeam_channel::bounded::<ShareDescriptor>(shares.len().max(1));
        for share in shares {
            let _ = tx.send(share);
        }
        drop(tx);

        let outcomes: Arc<Mutex<Vec<ShareOutcome>>> = Arc::new(Mutex::new(Vec::new()));

        std::thread::scope(|scope| {
            for _ in 0..worker_count.max(1) {
                let rx = rx.clone();
                let outcomes = Arc::clone(&outcomes);
                scope.spawn(|| {
                    while let Ok(share) = rx.recv() {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let outcome = self.process_share(&share, triggered_by_user, preview, force, filters, cancel);
                        outcomes.lock().unwrap().push(outcome);
                    }
                });
            }
        });

        Arc::try_unwrap(outcomes).map(|m| m.into_inner().unwrap()).unwrap_or_default()
    }

    fn process_share(
        &self,
        share: &ShareDescriptor,
        triggered_by_user: bool,
        preview: bool,
        force: bool,
        filters: &AdminFilters,
        cancel: &CancellationToken,
    ) -> ShareOutcome {
        let mode_config = match self.settings.mode_config(self.settings.mode) {
            Ok(m) => m,
            Err(e) => return self.evaluation_only_failure(share, &format!("config error: {e}")),
        };

        let journal = self.journal.lock().unwrap();
        let in_cooldown = !force
            && journal
                .in_cooldown(&share.share_name, mode_config.thresholds.min_hours_between_scans, Utc::now())
                .unwrap_or(false);
        drop(journal);

        if in_cooldown {
            let evaluation = EvaluationRecord {
                share: share.share_name.clone(),
                volume: share.volume_name.clone(),
                mode: self.settings.mode,
                should_scan: false,
                score: 0.0,
                reason: "In cooldown window".to_string(),
                raw_scores: Default::default(),
                weighted_scores: Default::default(),
                cold_file_count: 0,
                restore_file_count: 0,
                timestamp: Utc::now(),
            };
            self.write_decision(&evaluation, 0, 0, 0, triggered_by_user);
            return ShareOutcome { evaluation, files_archived: 0, files_restored: 0, failures: vec![] };
        }

        let mut stats = walk_share(
            self.file_service,
            &share.endpoint,
            self.settings,
            mode_config.thresholds.min_cold_file_age_days,
            mode_config.thresholds.min_old_file_age_days,
        );

        let capacity = self.telemetry.capacity(&share.volume_name);
        stats.fullness_percent = capacity.map(|c| c.percent_used).unwrap_or(0.0);
        let performance = self.telemetry.performance(&share.share_name);

        let vector = build_feature_vector(&stats, capacity, performance, &mode_config);
        let decision = should_scan(&vector, &mode_config);

        let evaluation = EvaluationRecord {
            share: share.share_name.clone(),
            volume: share.volume_name.clone(),
            mode: self.settings.mode,
            should_scan: decision,
            score: vector.score,
            reason: if decision { "score met threshold".to_string() } else { "score below threshold".to_string() },
            raw_scores: vector.raw.clone(),
            weighted_scores: vector.weighted.clone(),
            cold_file_count: stats.cold_files.len() as u64,
            restore_file_count: stats.restorable_file_count,
            timestamp: Utc::now(),
        };

        if !decision {
            self.write_decision(&evaluation, stats.total_file_count, 0, 0, triggered_by_user);
            return ShareOutcome { evaluation, files_archived: 0, files_restored: 0, failures: vec![] };
        }

        let free = self.telemetry.free(&share.archive_volume_name);
        let free_bytes = free.map(|f| f.bytes_free).unwrap_or(0);

        let journal = self.journal.lock().unwrap();
        let archive_files = walk_archive(self.file_service, &share.archive_share_name, |archive_path| {
            journal.lookup_original(archive_path).ok().flatten().map(|m| m.source_path)
        });
        drop(journal);

        let plan = build_plan(
            stats.cold_files.clone(),
            archive_files,
            free_bytes,
            filters,
            &self.settings.blacklist,
            |archive_path| {
                self.journal
                    .lock()
                    .unwrap()
                    .lookup_original(archive_path)
                    .ok()
                    .flatten()
                    .map(|m| m.source_path)
            },
        );

        if preview {
            self.write_decision(&evaluation, stats.total_file_count, 0, 0, triggered_by_user);
            return ShareOutcome { evaluation, files_archived: 0, files_restored: 0, failures: vec![] };
        }

        // Restores first (frees data-side room), then archives (§4.7 step 4).
        let restore_requests: Vec<RestoreRequest> = plan
            .restore_candidates
            .into_iter()
            .map(|c| RestoreRequest { archived: c.archived, original_path: c.original_path })
            .collect();

        let mut failures = Vec::new();
        let mut files_restored = 0u64;
        let mut files_archived = 0u64;

        if !cancel.is_cancelled() {
            let restored = restore_batch(self.file_service, &restore_requests, &self.staging_dir);
            files_restored = restored.movements.len() as u64;
            failures.extend(restored.failures);
            if !restored.movements.is_empty() {
                let mut journal = self.journal.lock().unwrap();
                if let Err(e) = journal.record_movements(&restored.movements) {
                    log::error!("journal commit failed for restores on {}: {e}", share.share_name);
                }
            }
        }

        if !cancel.is_cancelled() {
            let data_side_candidates: Vec<_> = plan
                .archive_candidates
                .into_iter()
                .filter(|f| f.source == Some(FileSource::Data))
                .collect();
            let archived = archive_batch(self.file_service, &data_side_candidates, &share.archive_share_name, &self.staging_dir);
            files_archived = archived.movements.len() as u64;
            failures.extend(archived.failures);
            if !archived.movements.is_empty() {
                let mut journal = self.journal.lock().unwrap();
                if let Err(e) = journal.record_movements(&archived.movements) {
                    log::error!("journal commit failed for archives on {}: {e}", share.share_name);
                }
            }
        }

        self.write_decision(&evaluation, stats.total_file_count, files_archived, files_restored, triggered_by_user);

        ShareOutcome { evaluation, files_archived, files_restored, failures }
    }

    fn write_decision(
        &self,
        evaluation: &EvaluationRecord,
        files_scanned: u64,
        files_archived: u64,
        files_restored: u64,
        triggered_by_user: bool,
    ) {
        let journal = self.journal.lock().unwrap();
        if let Err(e) = journal.record_evaluation(evaluation) {
            log::error!("failed to record evaluation for {}: {e}", evaluation.share);
        }
        let summary = ScanSummaryRecord {
            share: evaluation.share.clone(),
            files_scanned,
            files_archived,
            files_restored,
            filters_used: None,
            triggered_by_user,
            timestamp: evaluation.timestamp,
        };
        if let Err(e) = journal.record_scan_summary(&summary) {
            log::error!("failed to record scan summary for {}: {e}", evaluation.share);
        }
    }

    fn evaluation_only_failure(&self, share: &ShareDescriptor, reason: &str) -> ShareOutcome {
        let evaluation = EvaluationRecord {
            share: share.share_name.clone(),
            volume: share.volume_name.clone(),
            mode: self.settings.mode,
            should_scan: false,
            score: 0.0,
            reason: reason.to_string(),
            raw_scores: Default::default(),
            weighted_scores: Default::default(),
            cold_file_count: 0,
            restore_file_count: 0,
            timestamp: Utc::now(),
        };
        self.write_decision(&evaluation, 0, 0, 0, false);
        ShareOutcome { evaluation, files_archived: 0, files_restored: 0, failures: vec![] }
    }
}

/// Install the Ctrl+C handler, mirroring the donor's `engine::tools::setup_ctrlc_handler`.
pub fn install_ctrlc_handler(token: CancellationToken) {
    let token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::warn!("received interrupt, finishing in-flight operations before exiting");
        token.cancel();
    }) {
        log::warn!("failed to install Ctrl+C handler: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyModeKey;
    use crate::file_service::LocalFileService;
    use crate::telemetry::{Capacity, Free, Performance};
    use crate::telemetry::FixtureTelemetryProvider;
    use crate::types::{ModeConfig, PolicyMode, Thresholds, Weights};
    use std::collections::HashMap;

    fn settings() -> Settings {
        let mut modes = HashMap::new();
        modes.insert(
            PolicyModeKey::Default,
            ModeConfig { weights: Weights::default(), thresholds: Thresholds::default() },
        );
        Settings { mode: PolicyMode::Default, blacklist: vec![], modes }
    }

    #[test]
    fn idempotence_second_tick_is_cooldown_noop() {
        let dir = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let svc = LocalFileService::new(dir.path());
        std::fs::create_dir_all(dir.path().join("host/share1")).unwrap();
        std::fs::write(dir.path().join("host/share1/a.dat"), vec![0u8; 1024]).unwrap();

        let mut telemetry = FixtureTelemetryProvider::default();
        telemetry.shares.push(ShareDescriptor {
            share_name: "share1".into(),
            volume_name: "vol1".into(),
            archive_share_name: r"\\host\archive1".into(),
            archive_volume_name: "archvol1".into(),
            endpoint: r"\\host\share1".into(),
        });
        telemetry.capacities.insert("vol1".into(), Capacity { size_bytes: 100, used_bytes: 10, percent_used: 10.0 });
        telemetry.performances.insert("share1".into(), Performance { iops: 0.0, latency_ms: 0.0 });
        telemetry.frees.insert("archvol1".into(), Free { bytes_free: 0 });

        let settings = settings();
        let journal = Journal::open_in_memory().unwrap();
        let orch = Orchestrator::new(&settings, &svc, &telemetry, journal, staging.path().to_path_buf());
        let cancel = CancellationToken::new();

        let first = orch.run_tick(1, false, &cancel);
        assert_eq!(first.len(), 1);

        let second = orch.run_tick(1, false, &cancel);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].evaluation.reason, "In cooldown window");
        assert_eq!(second[0].evaluation.score, 0.0);
        assert_eq!(second[0].files_archived, 0);
        assert_eq!(second[0].files_restored, 0);
    }
}
