//! Append-only schema for the three journal tables (§3, §6). Columns use enumerated string
//! codes for `action`/`mode` rather than integer codes, matching the donor's preference for
//! human-readable stored values over packed enums.

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS movements (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    source_path      TEXT NOT NULL,
    destination_path TEXT NOT NULL,
    created_ns       INTEGER NOT NULL,
    accessed_ns      INTEGER NOT NULL,
    modified_ns      INTEGER NOT NULL,
    size             INTEGER NOT NULL,
    action           TEXT NOT NULL,
    event_time_ns    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_movements_destination ON movements (destination_path, action, event_time_ns);
CREATE INDEX IF NOT EXISTS idx_movements_source ON movements (source_path, event_time_ns);

CREATE TABLE IF NOT EXISTS evaluations (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    share              TEXT NOT NULL,
    volume             TEXT NOT NULL,
    mode               TEXT NOT NULL,
    should_scan        INTEGER NOT NULL,
    score              REAL NOT NULL,
    reason             TEXT NOT NULL,
    raw_scores         TEXT NOT NULL,
    weighted_scores    TEXT NOT NULL,
    cold_file_count    INTEGER NOT NULL,
    restore_file_count INTEGER NOT NULL,
    timestamp_ns       INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_evaluations_share ON evaluations (share, timestamp_ns);

CREATE TABLE IF NOT EXISTS scan_summaries (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    share             TEXT NOT NULL,
    files_scanned     INTEGER NOT NULL,
    files_archived    INTEGER NOT NULL,
    files_restored    INTEGER NOT NULL,
    filters_used      TEXT,
    triggered_by_user INTEGER NOT NULL,
    timestamp_ns      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scan_summaries_share ON scan_summaries (share, timestamp_ns);
";
