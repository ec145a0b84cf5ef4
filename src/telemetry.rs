//! Telemetry Adapter (C2). The storage-array telemetry provider itself is out of scope (§1);
//! this module defines the trait boundary plus a fixture implementation for tests, grounded in
//! the shape of per-volume capacity/IOPS/latency reported by the donor backend's
//! `netapp_volume_stats.get_volume_space_metrics` / `get_volume_performance_by_share`.

use crate::types::ShareDescriptor;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default)]
pub struct Capacity {
    pub size_bytes: u64,
    pub used_bytes: u64,
    pub percent_used: f64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Performance {
    pub iops: f64,
    pub latency_ms: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct Free {
    pub bytes_free: u64,
}

/// §4.2: capacity, performance, free-space, and share/volume name maps. Zeroed when
/// unavailable; the scorer treats zero IOPS/latency as "idle" and a missing capacity lookup as
/// "unknown" (score contribution 0), per §4.2/§4.3.
pub trait TelemetryProvider: Send + Sync {
    fn capacity(&self, volume: &str) -> Option<Capacity>;
    fn performance(&self, share: &str) -> Performance;
    fn free(&self, archive_volume: &str) -> Option<Free>;
    fn list_shares(&self) -> Vec<ShareDescriptor>;
}

/// In-memory fixture backing tests and local experimentation, analogous to the donor's
/// `open_db_in_memory` stand-in for a real persistence layer.
#[derive(Default)]
pub struct FixtureTelemetryProvider {
    pub capacities: HashMap<String, Capacity>,
    pub performances: HashMap<String, Performance>,
    pub frees: HashMap<String, Free>,
    pub shares: Vec<ShareDescriptor>,
}

impl TelemetryProvider for FixtureTelemetryProvider {
    fn capacity(&self, volume: &str) -> Option<Capacity> {
        self.capacities.get(volume).copied()
    }

    fn performance(&self, share: &str) -> Performance {
        self.performances.get(share).copied().unwrap_or_default()
    }

    fn free(&self, archive_volume: &str) -> Option<Free> {
        self.frees.get(archive_volume).copied()
    }

    fn list_shares(&self) -> Vec<ShareDescriptor> {
        self.shares.clone()
    }
}
