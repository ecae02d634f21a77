// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Process-wide arena accounting.
//!
//! Every arena reservation and release is counted here so tests can
//! assert the no-leak lifecycle invariants: after a failed model
//! construction, the live-block count must be back where it started.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

static LIVE_BLOCKS: AtomicU64 = AtomicU64::new(0);
static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
static TOTAL_CREATED: AtomicU64 = AtomicU64::new(0);
static TOTAL_RELEASED: AtomicU64 = AtomicU64::new(0);

/// A snapshot of the process-wide arena accounting counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ArenaStats {
    /// Number of arena blocks currently alive.
    pub live_blocks: u64,
    /// Bytes currently held by live arena blocks.
    pub live_bytes: usize,
    /// High-water mark of `live_bytes`.
    pub peak_live_bytes: usize,
    /// Total blocks ever reserved.
    pub total_created: u64,
    /// Total blocks ever released.
    pub total_released: u64,
}

impl ArenaStats {
    /// Takes a snapshot of the current counters.
    pub fn snapshot() -> Self {
        Self {
            live_blocks: LIVE_BLOCKS.load(Ordering::Acquire),
            live_bytes: LIVE_BYTES.load(Ordering::Acquire),
            peak_live_bytes: PEAK_LIVE_BYTES.load(Ordering::Acquire),
            total_created: TOTAL_CREATED.load(Ordering::Acquire),
            total_released: TOTAL_RELEASED.load(Ordering::Acquire),
        }
    }
}

pub(crate) fn record_create(bytes: usize) {
    LIVE_BLOCKS.fetch_add(1, Ordering::Release);
    TOTAL_CREATED.fetch_add(1, Ordering::Release);
    let now = LIVE_BYTES.fetch_add(bytes, Ordering::Release) + bytes;
    PEAK_LIVE_BYTES.fetch_max(now, Ordering::Release);
}

pub(crate) fn record_release(bytes: usize) {
    LIVE_BLOCKS.fetch_sub(1, Ordering::Release);
    TOTAL_RELEASED.fetch_add(1, Ordering::Release);
    LIVE_BYTES.fetch_sub(bytes, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arena;

    // Tests share the process-wide counters with every other test in
    // this binary, so assertions here are monotonic. The exact
    // created-equals-released leak check lives in the runtime crate's
    // isolated lifecycle suite.

    #[test]
    fn test_create_release_counted() {
        let before = ArenaStats::snapshot();

        {
            let _a = Arena::with_capacity(2048).unwrap();
            let mid = ArenaStats::snapshot();
            assert!(mid.total_created >= before.total_created + 1);
            assert!(mid.peak_live_bytes >= 2048);
        }

        let after = ArenaStats::snapshot();
        assert!(after.total_released >= before.total_released + 1);
    }

    #[test]
    fn test_failed_reservation_not_counted() {
        let before = ArenaStats::snapshot();
        assert!(Arena::with_capacity(usize::MAX).is_err());
        let after = ArenaStats::snapshot();
        // The failed reservation itself must not register as a create;
        // peak cannot have moved by anything near the refused request.
        assert!(after.peak_live_bytes < usize::MAX / 2);
        assert!(after.total_created >= before.total_created);
    }

    #[test]
    fn test_serialize_snapshot() {
        let snap = ArenaStats::snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("live_blocks"));
    }
}
