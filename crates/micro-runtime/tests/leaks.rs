// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocator-accounting proof that failed constructions and disposals
//! leak nothing.
//!
//! This suite is deliberately a single test in its own binary: the
//! arena counters are process-wide, and keeping this process free of
//! concurrent arena users makes exact before/after comparisons valid.

use memory_arena::ArenaStats;
use micro_runtime::reference::{ReferenceEngine, ReferenceModelBuilder};
use micro_runtime::ModelRuntime;
use quant_codec::ElemType;
use std::sync::Arc;

#[test]
fn no_arena_or_engine_leaks_across_failures_and_disposal() {
    let backend = Arc::new(ReferenceEngine::new());
    let before = ArenaStats::snapshot();

    // 1. Malformed model bytes: engine creation fails after the arena
    //    was reserved.
    for _ in 0..3 {
        assert!(ModelRuntime::load(backend.clone(), b"not a model".to_vec(), 4096).is_err());
    }

    // 2. Truncated model bytes.
    let mut truncated = ReferenceModelBuilder::new().build();
    truncated.truncate(8);
    assert!(ModelRuntime::load(backend.clone(), truncated, 4096).is_err());

    // 3. Tensor allocation failure: arena too small for the model's
    //    declared demand.
    let big = ReferenceModelBuilder::new()
        .input(ElemType::Float32, &[256])
        .output(ElemType::Float32, &[256])
        .arena_demand(64 * 1024);
    assert!(ModelRuntime::load(backend.clone(), big.build(), 4096).is_err());

    // 4. Unsupported element type: failure after tensors allocated.
    let unsupported = ReferenceModelBuilder::new()
        .input(ElemType::Int64, &[1])
        .output(ElemType::Int64, &[1])
        .build();
    assert!(ModelRuntime::load(backend.clone(), unsupported, 4096).is_err());

    // 5. Zero-capacity arena: failure before the engine exists.
    assert!(
        ModelRuntime::load(backend.clone(), ReferenceModelBuilder::new().build(), 0).is_err()
    );

    let after_failures = ArenaStats::snapshot();
    assert_eq!(after_failures.live_blocks, before.live_blocks);
    assert_eq!(after_failures.live_bytes, before.live_bytes);
    assert_eq!(
        after_failures.total_created - before.total_created,
        after_failures.total_released - before.total_released,
    );
    assert_eq!(backend.live_handles(), 0);

    // A successful lifecycle balances the books too, whether torn down
    // by dispose() or by drop.
    let mut runtime =
        ModelRuntime::load(backend.clone(), ReferenceModelBuilder::new().build(), 4096)
            .unwrap();
    let live = ArenaStats::snapshot();
    assert_eq!(live.live_blocks, before.live_blocks + 1);
    runtime.dispose();

    {
        let _runtime =
            ModelRuntime::load(backend.clone(), ReferenceModelBuilder::new().build(), 4096)
                .unwrap();
    }

    let end = ArenaStats::snapshot();
    assert_eq!(end.live_blocks, before.live_blocks);
    assert_eq!(end.live_bytes, before.live_bytes);
    assert_eq!(backend.live_handles(), 0);
}
