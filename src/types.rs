//! Public data model shared across every component (§3 of the spec).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which side of the archive boundary a file currently lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSource {
    Data,
    Archive,
}

/// One scanned file. Immutable within a scan pass.
#[derive(Clone, Debug, PartialEq)]
pub struct FileMeta {
    /// Absolute UNC-style path, e.g. `\\host\share\proj\report.pdf`.
    pub path: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub source: Option<FileSource>,
    /// When this file lives on an archive share, the original data-side path it was moved from.
    pub original_path: Option<String>,
}

impl FileMeta {
    /// Extension including the leading dot, lowercased, or `None` if the path has none.
    pub fn extension(&self) -> Option<String> {
        PathBuf::from(&self.path)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
    }
}

/// Logical identity of a data share and its paired archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareDescriptor {
    pub share_name: String,
    pub volume_name: String,
    pub archive_share_name: String,
    pub archive_volume_name: String,
    pub endpoint: String,
}

/// Aggregate result of one share walk (C1 output).
#[derive(Clone, Debug, Default)]
pub struct ScanStats {
    pub total_file_count: u64,
    pub total_file_size: u64,
    pub cold_files: Vec<FileMeta>,
    pub old_file_count: u64,
    pub blacklisted_dirs: u64,
    pub blacklisted_files_skipped: u64,
    pub blacklist_ratio_percent: f64,
    pub fullness_percent: f64,
    /// Pre-supplied size-vs-recency balance, default 0.5 per spec §4.3.
    pub size_access_ratio_score: f64,
    /// Count of archive-side files recently accessed (restore pressure), filled in by the caller
    /// before scoring; zero when the share has no paired archive history yet.
    pub restorable_file_count: u64,
}

/// Ordered named set of raw feature values plus weighted contributions (C3 output).
#[derive(Clone, Debug, Default, Serialize)]
pub struct FeatureVector {
    pub raw: FeatureValues,
    pub weighted: FeatureValues,
    pub score: f64,
}

/// The nine named features from spec §3/§4.3, always present and always in this order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FeatureValues {
    pub small_volume: f64,
    pub iops: f64,
    pub latency: f64,
    pub fullness: f64,
    pub cold_ratio: f64,
    pub old_ratio: f64,
    pub blacklist: f64,
    pub restore: f64,
    pub size_access_ratio: f64,
}

impl FeatureValues {
    /// Sum of all nine fields, used both to compute the score and to check the
    /// "sum of weighted contributions equals the score" invariant in tests.
    pub fn sum(&self) -> f64 {
        self.small_volume
            + self.iops
            + self.latency
            + self.fullness
            + self.cold_ratio
            + self.old_ratio
            + self.blacklist
            + self.restore
            + self.size_access_ratio
    }
}

/// Per-feature weights for one policy mode.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Weights {
    pub small_volume_weight: f64,
    pub iops_weight: f64,
    pub latency_weight: f64,
    pub fullness_weight: f64,
    pub cold_file_ratio_weight: f64,
    pub old_file_ratio_weight: f64,
    pub blacklist_file_ratio_weight: f64,
    pub restore_pressure_weight: f64,
    pub size_access_ratio_weight: f64,
}

/// Per-mode thresholds controlling both scoring and classification.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Thresholds {
    pub small_volume_threshold_gb: f64,
    pub iops_idle_threshold: f64,
    pub latency_idle_threshold_ms: f64,
    pub scan_score_threshold: f64,
    pub min_hours_between_scans: i64,
    pub min_cold_file_age_days: i64,
    pub min_old_file_age_days: i64,
}

/// One named policy mode: weights + thresholds, treated as data (spec §9 "scorer polymorphism").
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ModeConfig {
    pub weights: Weights,
    pub thresholds: Thresholds,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    Default,
    Eco,
    Super,
}

impl std::fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PolicyMode::Default => "default",
            PolicyMode::Eco => "eco",
            PolicyMode::Super => "super",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    MovedToArchive,
    RestoredFromArchive,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionType::MovedToArchive => "moved_to_archive",
            ActionType::RestoredFromArchive => "restored_from_archive",
        };
        write!(f, "{s}")
    }
}

/// One journaled archive or restore action. Append-only (§3 invariants).
#[derive(Clone, Debug)]
pub struct MovementRecord {
    pub source_path: String,
    pub destination_path: String,
    pub created: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub size: u64,
    pub action: ActionType,
    pub event_time: DateTime<Utc>,
}

/// Per-share decision log entry, written for every share on every tick regardless of outcome.
#[derive(Clone, Debug, Serialize)]
pub struct EvaluationRecord {
    pub share: String,
    pub volume: String,
    pub mode: PolicyMode,
    pub should_scan: bool,
    pub score: f64,
    pub reason: String,
    pub raw_scores: FeatureValues,
    pub weighted_scores: FeatureValues,
    pub cold_file_count: u64,
    pub restore_file_count: u64,
    pub timestamp: DateTime<Utc>,
}

/// Per-scan aggregate, used to compute cooldown and history (C4).
#[derive(Clone, Debug)]
pub struct ScanSummaryRecord {
    pub share: String,
    pub files_scanned: u64,
    pub files_archived: u64,
    pub files_restored: u64,
    pub filters_used: Option<serde_json::Value>,
    pub triggered_by_user: bool,
    pub timestamp: DateTime<Utc>,
}

/// Admin filters applied by the planner (C5 step 3).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AdminFilters {
    /// Extensions to match, e.g. `[".pdf", ".docx"]`. Empty means "match any".
    #[serde(default)]
    pub file_types: Vec<String>,
    /// Inclusive date range on `created`.
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
    /// Inclusive date range on `accessed`.
    #[serde(default)]
    pub accessed_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accessed_before: Option<DateTime<Utc>>,
    /// Inclusive date range on `modified`.
    #[serde(default)]
    pub modified_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub min_size: Option<u64>,
    #[serde(default)]
    pub max_size: Option<u64>,
}

/// Outcome of one failed per-file migration (§4.6 failure taxonomy).
#[derive(Clone, Debug)]
pub struct MigrationFailure {
    pub path: String,
    pub reason: String,
}

/// Terminal status returned by manual admin endpoints (§7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    PartialSuccess,
    NoFiles,
    NoMatches,
    NoSpace,
    Error,
}
