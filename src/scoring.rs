//! Feature Extractor & Scorer (C3), grounded in the donor backend's
//! `feature_vector.build_feature_vector` / `should_scan_volume`.
//!
//! Pure functions: same `ScanStats` + telemetry + mode always produce the same `FeatureVector`.

use crate::telemetry::{Capacity, Performance};
use crate::types::{FeatureValues, FeatureVector, ModeConfig, ScanStats};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Build the feature vector for one share evaluation (§4.3).
///
/// `capacity` is `None` when the telemetry provider has no data for the volume ("unknown" per
/// §4.2), which this function treats as a zero `fullness` contribution rather than an error.
pub fn build_feature_vector(
    stats: &ScanStats,
    capacity: Option<Capacity>,
    performance: Performance,
    mode: &ModeConfig,
) -> FeatureVector {
    let weights = &mode.weights;
    let thresholds = &mode.thresholds;

    let file_count = stats.total_file_count as f64;
    let cold_count = stats.cold_files.len() as f64;
    let old_count = stats.old_file_count as f64;

    let small_volume = if (stats.total_file_size as f64) >= thresholds.small_volume_threshold_gb * BYTES_PER_GIB {
        1.0
    } else {
        0.0
    };

    let iops = normalize_idle(performance.iops, thresholds.iops_idle_threshold);
    let latency = normalize_idle(performance.latency_ms, thresholds.latency_idle_threshold_ms);

    let fullness = match capacity {
        Some(c) => (c.percent_used / 100.0).min(1.0).max(0.0),
        None => 0.0,
    };

    let cold_ratio = if file_count > 0.0 { cold_count / file_count } else { 0.0 };
    let old_ratio = if file_count > 0.0 { old_count / file_count } else { 0.0 };
    let blacklist = (stats.blacklist_ratio_percent / 100.0).min(1.0).max(0.0);
    let restore = if file_count > 0.0 {
        1.0 - (stats.restorable_file_count as f64 / file_count).min(1.0)
    } else {
        1.0
    };
    let size_access_ratio = stats.size_access_ratio_score;

    let raw = FeatureValues {
        small_volume,
        iops,
        latency,
        fullness,
        cold_ratio,
        old_ratio,
        blacklist,
        restore,
        size_access_ratio,
    };

    let weighted = FeatureValues {
        small_volume: weights.small_volume_weight * raw.small_volume,
        iops: weights.iops_weight * raw.iops,
        latency: weights.latency_weight * raw.latency,
        fullness: weights.fullness_weight * raw.fullness,
        cold_ratio: weights.cold_file_ratio_weight * raw.cold_ratio,
        old_ratio: weights.old_file_ratio_weight * raw.old_ratio,
        blacklist: weights.blacklist_file_ratio_weight * raw.blacklist,
        restore: weights.restore_pressure_weight * raw.restore,
        size_access_ratio: weights.size_access_ratio_weight * raw.size_access_ratio,
    };

    let score = round4(weighted.sum());

    FeatureVector { raw, weighted, score }
}

/// `1 - min(value/threshold, 1)`, with non-finite or non-positive thresholds coercing to 0
/// (§4.3 "Non-numeric telemetry coerces to feature 0").
fn normalize_idle(value: f64, threshold: f64) -> f64 {
    if !value.is_finite() || !threshold.is_finite() || threshold <= 0.0 {
        return 0.0;
    }
    1.0 - (value / threshold).min(1.0).max(0.0)
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// `should_scan := score >= scan_score_threshold` (§4.3).
pub fn should_scan(vector: &FeatureVector, mode: &ModeConfig) -> bool {
    vector.score >= mode.thresholds.scan_score_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Thresholds, Weights};

    fn mode(weights: Weights, thresholds: Thresholds) -> ModeConfig {
        ModeConfig { weights, thresholds }
    }

    fn zero_weights() -> Weights {
        Weights {
            small_volume_weight: 0.0,
            iops_weight: 0.0,
            latency_weight: 0.0,
            fullness_weight: 0.0,
            cold_file_ratio_weight: 0.0,
            old_file_ratio_weight: 0.0,
            blacklist_file_ratio_weight: 0.0,
            restore_pressure_weight: 0.0,
            size_access_ratio_weight: 0.0,
        }
    }

    #[test]
    fn deterministic_scoring() {
        let stats = ScanStats {
            total_file_count: 100,
            total_file_size: 2 * 1024 * 1024 * 1024,
            old_file_count: 10,
            blacklist_ratio_percent: 0.0,
            size_access_ratio_score: 0.5,
            restorable_file_count: 0,
            ..Default::default()
        };
        let capacity = Some(Capacity { size_bytes: 100, used_bytes: 50, percent_used: 50.0 });
        let perf = Performance { iops: 5.0, latency_ms: 2.0 };
        let m = mode(Weights::default(), Thresholds::default());

        let a = build_feature_vector(&stats, capacity, perf, &m);
        let b = build_feature_vector(&stats, capacity, perf, &m);
        assert_eq!(a.score, b.score);
        assert_eq!(format!("{:?}", a.raw), format!("{:?}", b.raw));

        let expected_sum = round4(a.weighted.sum());
        assert_eq!(a.score, expected_sum);
    }

    #[test]
    fn feature_bounds_and_nonnumeric_coercion() {
        let stats = ScanStats::default();
        let perf = Performance { iops: f64::NAN, latency_ms: f64::INFINITY };
        let m = mode(Weights::default(), Thresholds::default());
        let v = build_feature_vector(&stats, None, perf, &m);
        assert_eq!(v.raw.iops, 0.0);
        assert_eq!(v.raw.latency, 0.0);
        assert_eq!(v.raw.fullness, 0.0);
        let fields = [
            v.raw.small_volume,
            v.raw.iops,
            v.raw.latency,
            v.raw.fullness,
            v.raw.cold_ratio,
            v.raw.old_ratio,
            v.raw.blacklist,
            v.raw.restore,
            v.raw.size_access_ratio,
        ];
        for f in fields {
            assert!((0.0..=1.0).contains(&f), "feature out of bounds: {f}");
        }
    }

    #[test]
    fn tiny_share_suppression_scenario() {
        // Scenario 1: 512 MiB share, threshold 1 GiB -> small_volume = 0, score stays low.
        let stats = ScanStats {
            total_file_count: 10,
            total_file_size: 512 * 1024 * 1024,
            ..Default::default()
        };
        let mut thresholds = Thresholds::default();
        thresholds.small_volume_threshold_gb = 1.0;
        thresholds.scan_score_threshold = 0.5;
        let m = mode(Weights::default(), thresholds);
        let v = build_feature_vector(&stats, None, Performance::default(), &m);
        assert_eq!(v.raw.small_volume, 0.0);
        assert!(!should_scan(&v, &m));
    }

    #[test]
    fn idle_full_share_scenario() {
        // Scenario 2: 100 files, 80 cold, fullness 92%, iops=0, latency=0ms.
        let cold_files: Vec<crate::types::FileMeta> = Vec::new(); // count only matters here
        let stats = ScanStats {
            total_file_count: 100,
            total_file_size: 50 * 1024 * 1024 * 1024,
            cold_files: {
                // we only need len() == 80 for the ratio; build 80 placeholder metas
                let now = chrono::Utc::now();
                (0..80)
                    .map(|i| crate::types::FileMeta {
                        path: format!(r"\\host\share\f{i}"),
                        size: 1024,
                        created: now,
                        accessed: now,
                        modified: now,
                        source: None,
                        original_path: None,
                    })
                    .collect()
            },
            ..Default::default()
        };
        let _ = cold_files;
        let capacity = Some(Capacity { size_bytes: 100, used_bytes: 92, percent_used: 92.0 });
        let perf = Performance { iops: 0.0, latency_ms: 0.0 };

        let mut weights = zero_weights();
        weights.cold_file_ratio_weight = 0.3;
        weights.fullness_weight = 0.3;
        weights.iops_weight = 0.2;
        weights.latency_weight = 0.2;
        let mut thresholds = Thresholds::default();
        thresholds.scan_score_threshold = 0.5;
        let m = mode(weights, thresholds);

        let v = build_feature_vector(&stats, capacity, perf, &m);
        assert!(v.score >= 0.5, "expected idle full share to clear threshold, got {}", v.score);
        assert!(should_scan(&v, &m));
    }
}
