//! Decision Planner (C5), grounded in the donor's `check::check_dir` merge-by-path diffing
//! pattern and in the donor backend's `scan_manager.scan_all_volumes_and_process` archive/restore
//! split, implementing the deterministic algorithm of spec §4.5.

use crate::types::{AdminFilters, FileMeta, FileSource};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, Default)]
pub struct Plan {
    pub archive_candidates: Vec<FileMeta>,
    pub restore_candidates: Vec<RestoreCandidate>,
    pub stay_in_archive: Vec<FileMeta>,
}

/// A restore candidate carries both its archived path and the data-side path it originated
/// from (§4.5 step 7).
#[derive(Clone, Debug)]
pub struct RestoreCandidate {
    pub archived: FileMeta,
    pub original_path: String,
}

/// Resolve the original (data-side) path for an archive-side file: its own `original_path` if
/// already known, otherwise via `lookup_original` (typically the journal, §4.4).
pub fn build_plan(
    cold_files: Vec<FileMeta>,
    existing_archive_files: Vec<FileMeta>,
    free_bytes: u64,
    filters: &AdminFilters,
    blacklist: &[String],
    lookup_original: impl Fn(&str) -> Option<String>,
) -> Plan {
    // Step 1+2: tag and merge. cold_files are already tagged Data by the walker; archive files
    // tagged Archive. Re-tag defensively so the planner doesn't depend on caller discipline.
    let mut merged: Vec<FileMeta> = Vec::with_capacity(cold_files.len() + existing_archive_files.len());
    merged.extend(cold_files.into_iter().map(|mut f| {
        f.source = Some(FileSource::Data);
        f
    }));
    merged.extend(existing_archive_files.into_iter().map(|mut f| {
        f.source = Some(FileSource::Archive);
        f
    }));

    let mut survivors: Vec<FileMeta> = Vec::new();
    let mut forced_restores: Vec<FileMeta> = Vec::new();
    let mut filtered_out_archive: Vec<FileMeta> = Vec::new();

    for file in merged {
        let is_archive = file.source == Some(FileSource::Archive);
        let blacklist_hit = blacklist
            .iter()
            .any(|token| file.path.to_lowercase().contains(&token.to_lowercase()));

        if blacklist_hit && is_archive {
            // Step 3: blacklist match on an archive-side file is a forced restore, not an
            // exclusion (§4.5 step 3, testable property "Forced-restore").
            forced_restores.push(file);
            continue;
        }
        if blacklist_hit {
            // Data-side blacklist hit: plain exclusion.
            continue;
        }

        if !passes_filters(&file, filters) {
            if is_archive {
                // Step 4: archive-side files filtered out become restore candidates.
                filtered_out_archive.push(file);
            }
            // Data-side files filtered out are simply excluded.
            continue;
        }

        survivors.push(file);
    }

    // Step 5: sort survivors by last-access ascending, path lexicographic as tie-break.
    survivors.sort_by(|a, b| a.accessed.cmp(&b.accessed).then_with(|| a.path.cmp(&b.path)));

    // Step 6+7: one running budget shared across new archive candidates and existing archive
    // contents, in merge order (data-side first). A file archived earlier in this pass can push
    // later archive-side files into demotion within the same tick (see SPEC_FULL.md §9).
    let mut archive_candidates = Vec::new();
    let mut stay_in_archive = Vec::new();
    let mut demoted_to_restore = Vec::new();
    let mut used_bytes: u64 = 0;

    for file in survivors {
        match file.source {
            Some(FileSource::Data) => {
                let would_use = used_bytes.saturating_add(file.size);
                if would_use <= free_bytes {
                    used_bytes = would_use;
                    archive_candidates.push(file);
                }
                // Files that would exceed the budget are simply not archived this round;
                // they remain cold data-side files and will be reconsidered next tick.
            }
            Some(FileSource::Archive) => {
                let would_use = used_bytes.saturating_add(file.size);
                if would_use <= free_bytes {
                    used_bytes = would_use;
                    stay_in_archive.push(file);
                } else {
                    demoted_to_restore.push(file);
                }
            }
            None => {}
        }
    }

    let mut restore_candidates: Vec<RestoreCandidate> = Vec::new();
    for file in forced_restores
        .into_iter()
        .chain(filtered_out_archive)
        .chain(demoted_to_restore)
    {
        let original_path = file
            .original_path
            .clone()
            .or_else(|| lookup_original(&file.path))
            .unwrap_or_else(|| file.path.clone());
        restore_candidates.push(RestoreCandidate { archived: file, original_path });
    }
    restore_candidates.sort_by(|a, b| {
        a.archived
            .accessed
            .cmp(&b.archived.accessed)
            .then_with(|| a.archived.path.cmp(&b.archived.path))
    });

    Plan { archive_candidates, restore_candidates, stay_in_archive }
}

fn passes_filters(file: &FileMeta, filters: &AdminFilters) -> bool {
    if !filters.file_types.is_empty() {
        let ext = file.extension();
        let matches = ext.as_deref().map(|e| filters.file_types.iter().any(|t| t.eq_ignore_ascii_case(e))).unwrap_or(false);
        if !matches {
            return false;
        }
    }
    if !in_range(file.created, filters.created_after, filters.created_before) {
        return false;
    }
    if !in_range(file.accessed, filters.accessed_after, filters.accessed_before) {
        return false;
    }
    if !in_range(file.modified, filters.modified_after, filters.modified_before) {
        return false;
    }
    if let Some(min) = filters.min_size
        && file.size < min
    {
        return false;
    }
    if let Some(max) = filters.max_size
        && file.size > max
    {
        return false;
    }
    true
}

fn in_range(value: DateTime<Utc>, after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> bool {
    if let Some(after) = after
        && value < after
    {
        return false;
    }
    if let Some(before) = before
        && value > before
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, size: u64, accessed_days_ago: i64, source: FileSource) -> FileMeta {
        let now = Utc::now();
        FileMeta {
            path: path.to_string(),
            size,
            created: now,
            accessed: now - chrono::Duration::days(accessed_days_ago),
            modified: now,
            source: Some(source),
            original_path: None,
        }
    }

    #[test]
    fn source_disjointness_and_budget_law() {
        let cold = vec![
            file(r"\\h\s\a.pdf", 1 * 1024 * 1024 * 1024, 400, FileSource::Data),
            file(r"\\h\s\b.pdf", 1 * 1024 * 1024 * 1024, 300, FileSource::Data),
            file(r"\\h\s\c.pdf", 1 * 1024 * 1024 * 1024, 200, FileSource::Data),
        ];
        let free_bytes = 2 * 1024 * 1024 * 1024; // fits only two of the three 1 GiB files
        let plan = build_plan(cold, vec![], free_bytes, &AdminFilters::default(), &[], |_| None);

        let archived_total: u64 = plan.archive_candidates.iter().map(|f| f.size).sum();
        assert!(archived_total <= free_bytes);
        assert_eq!(plan.archive_candidates.len(), 2);
        // oldest-access-first: a.pdf (400d) then b.pdf (300d)
        assert_eq!(plan.archive_candidates[0].path, r"\\h\s\a.pdf");
        assert_eq!(plan.archive_candidates[1].path, r"\\h\s\b.pdf");

        let archive_paths: std::collections::HashSet<_> =
            plan.archive_candidates.iter().map(|f| f.path.clone()).collect();
        let restore_paths: std::collections::HashSet<_> =
            plan.restore_candidates.iter().map(|r| r.archived.path.clone()).collect();
        assert!(archive_paths.is_disjoint(&restore_paths));
        assert!(plan.archive_candidates.iter().all(|f| f.source == Some(FileSource::Data)));
        assert!(plan
            .restore_candidates
            .iter()
            .all(|r| r.archived.source == Some(FileSource::Archive)));
    }

    #[test]
    fn forced_restore_on_blacklist_hit() {
        let archive_files = vec![file(r"\\h\archive1\proj\secret\report.pdf", 100, 10, FileSource::Archive)];
        let filters = AdminFilters { file_types: vec![".pdf".into()], ..Default::default() };
        let plan = build_plan(vec![], archive_files, 1_000_000, &filters, &["secret".to_string()], |_| None);

        assert_eq!(plan.restore_candidates.len(), 1);
        assert!(plan.archive_candidates.is_empty());
        assert_eq!(plan.restore_candidates[0].archived.path, r"\\h\archive1\proj\secret\report.pdf");
    }

    #[test]
    fn free_space_clamp_scenario() {
        // 16 files totalling 5 GiB, free_bytes = 2 GiB.
        let mut cold = Vec::new();
        for i in 0..16 {
            cold.push(file(&format!(r"\\h\s\f{i}.dat"), 320 * 1024 * 1024, 16 - i, FileSource::Data));
        }
        let free_bytes = 2 * 1024 * 1024 * 1024u64;
        let plan = build_plan(cold, vec![], free_bytes, &AdminFilters::default(), &[], |_| None);

        let total: u64 = plan.archive_candidates.iter().map(|f| f.size).sum();
        assert!(total <= free_bytes);
        // oldest (f0, 16 days ago) must be included first
        assert_eq!(plan.archive_candidates[0].path, r"\\h\s\f0.dat");
    }

    #[test]
    fn restore_candidate_resolves_original_path_via_lookup() {
        let mut archived = file(r"\\h\archive1\a.pdf", 10, 5, FileSource::Archive);
        archived.original_path = None;
        let filters = AdminFilters { min_size: Some(1_000_000), ..Default::default() };
        let plan = build_plan(
            vec![],
            vec![archived],
            1_000_000,
            &filters,
            &[],
            |p| Some(format!("original-for:{p}")),
        );
        assert_eq!(plan.restore_candidates.len(), 1);
        assert_eq!(
            plan.restore_candidates[0].original_path,
            "original-for:\\\\h\\archive1\\a.pdf"
        );
    }
}
