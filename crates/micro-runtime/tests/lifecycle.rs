// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: the full load → set input → predict → read →
//! dispose flow against the reference engine, including the regression
//! scenarios the original hardware demos exercised (a quantized
//! single-feature curve model and a two-class detector).

use micro_runtime::reference::{ReferenceEngine, ReferenceModelBuilder};
use micro_runtime::{ModelRuntime, RuntimeError, RuntimeStatus};
use quant_codec::{dequantize, quantize, ElemType, QuantizationParams};
use std::f32::consts::TAU;
use std::sync::Arc;

// ── Helpers ────────────────────────────────────────────────────

/// Builds a lookup table mapping quantized x to quantized sin(x),
/// the shape of the classic single-feature regression model.
fn sine_table(
    input_quant: QuantizationParams,
    output_quant: QuantizationParams,
) -> [i8; 256] {
    let mut table = [0i8; 256];
    for (k, slot) in table.iter_mut().enumerate() {
        let q_in = (k as i16 - 128) as i8;
        let x = dequantize(q_in, input_quant);
        *slot = quantize(x.sin(), output_quant);
    }
    table
}

fn f32_scalar_runtime() -> ModelRuntime {
    let model = ReferenceModelBuilder::new()
        .input(ElemType::Float32, &[1])
        .output(ElemType::Float32, &[1])
        .identity()
        .build();
    ModelRuntime::load(Arc::new(ReferenceEngine::new()), model, 4 * 1024).unwrap()
}

// ── End-to-end regression scenarios ────────────────────────────

#[test]
fn float_scalar_sweep_matches_reference() {
    // Sweep x = i/N * RANGE through a pass-through float model; every
    // output must reproduce its input to regression tolerance.
    const N: usize = 32;
    const RANGE: f32 = TAU;

    let mut runtime = f32_scalar_runtime();
    assert_eq!(runtime.input_quantization(), QuantizationParams::new(1.0, 0));

    for i in 0..N {
        let x = i as f32 / N as f32 * RANGE;
        runtime.set_input_f32(&[x]).unwrap();
        let output = runtime.predict().unwrap();
        let y = output.dequantized(0).unwrap();
        assert!(
            (y - x).abs() < 1e-6,
            "step {i}: expected {x}, got {y}"
        );
    }
    runtime.dispose();
}

#[test]
fn quantized_sine_sweep_matches_reference_table() {
    const N: usize = 32;
    const RANGE: f32 = TAU;

    // x spans one full period across the i8 input range.
    let input_quant = QuantizationParams::new(RANGE / 255.0, -128);
    let output_quant = QuantizationParams::new(1.0 / 127.0, 0);
    let table = sine_table(input_quant, output_quant);

    let model = ReferenceModelBuilder::new()
        .input(ElemType::Int8, &[1])
        .output(ElemType::Int8, &[1])
        .input_quantization(input_quant)
        .output_quantization(output_quant)
        .lookup_table(table)
        .build();
    let mut runtime =
        ModelRuntime::load(Arc::new(ReferenceEngine::new()), model, 4 * 1024).unwrap();

    for i in 0..N {
        let x = i as f32 / N as f32 * RANGE;
        runtime.set_input_real(&[x]).unwrap();
        let output = runtime.predict().unwrap();
        let y = output.dequantized(0).unwrap();

        // The reference value is what the table itself maps x to.
        let q = quantize(x, runtime.input_quantization());
        let expected = dequantize(table[(q as i16 + 128) as usize], output_quant);
        assert!(
            (y - expected).abs() < 1e-6,
            "step {i}: expected {expected}, got {y}"
        );
        // And the model tracks the true curve to one quantization step.
        assert!((y - x.sin()).abs() <= output_quant.scale + input_quant.scale);
    }
}

#[test]
fn two_class_detector_classifies() {
    let model = ReferenceModelBuilder::new()
        .input(ElemType::Int8, &[2])
        .output(ElemType::Int8, &[2])
        .identity()
        .build();
    let mut runtime =
        ModelRuntime::load(Arc::new(ReferenceEngine::new()), model, 4 * 1024).unwrap();

    // Clear winner for class 1.
    runtime.set_input_i8(&[-50, 90]).unwrap();
    assert_eq!(runtime.predict().unwrap().classify().unwrap(), 1);

    // Clear winner for class 0.
    runtime.set_input_i8(&[90, -50]).unwrap();
    assert_eq!(runtime.predict().unwrap().classify().unwrap(), 0);

    // Ties fall to class 0: class 1 requires a strict win.
    runtime.set_input_i8(&[33, 33]).unwrap();
    assert_eq!(runtime.predict().unwrap().classify().unwrap(), 0);
}

// ── Lifecycle invariants ───────────────────────────────────────

#[test]
fn malformed_model_fails_construction_without_leaking() {
    let backend = Arc::new(ReferenceEngine::new());

    let result = ModelRuntime::load(backend.clone(), b"garbage".to_vec(), 4 * 1024);
    assert!(matches!(
        result,
        Err(RuntimeError::Construction(
            micro_runtime::ConstructionError::EngineInit(_)
        ))
    ));

    let mut truncated = ReferenceModelBuilder::new().build();
    truncated.truncate(truncated.len() - 5);
    let result = ModelRuntime::load(backend.clone(), truncated, 4 * 1024);
    assert!(result.is_err());

    // No engine object survived the failed constructions.
    assert_eq!(backend.live_handles(), 0);
}

#[test]
fn undersized_arena_fails_tensor_allocation() {
    let backend = Arc::new(ReferenceEngine::new());
    let builder = ReferenceModelBuilder::new()
        .input(ElemType::Float32, &[64])
        .output(ElemType::Float32, &[64])
        .arena_demand(1024);

    let result = ModelRuntime::load(
        backend.clone(),
        builder.build(),
        builder.min_arena_capacity() - 1,
    );
    assert!(matches!(
        result,
        Err(RuntimeError::Construction(
            micro_runtime::ConstructionError::TensorAllocation(RuntimeStatus::Error)
        ))
    ));
    assert_eq!(backend.live_handles(), 0);

    // The same model loads once the arena meets the demand.
    let runtime = ModelRuntime::load(backend, builder.build(), builder.min_arena_capacity());
    assert!(runtime.is_ok());
}

#[test]
fn double_dispose_is_safe() {
    let mut runtime = f32_scalar_runtime();
    runtime.dispose();
    runtime.dispose();
    assert!(runtime.is_disposed());
}

#[test]
fn predict_before_set_input_runs_over_zeros() {
    let model = ReferenceModelBuilder::new()
        .input(ElemType::Float32, &[3])
        .output(ElemType::Float32, &[3])
        .identity()
        .build();
    let mut runtime =
        ModelRuntime::load(Arc::new(ReferenceEngine::new()), model, 4 * 1024).unwrap();

    // Never wrote an input: the pass runs over the zeroed buffers.
    let output = runtime.predict().unwrap();
    for i in 0..3 {
        assert_eq!(output.f32_at(i).unwrap(), 0.0);
    }
}

#[test]
fn failed_invoke_surfaces_status_and_stays_usable() {
    // Identity over mismatched tensor types cannot be resolved by the
    // engine, so every invoke reports UnresolvedOps.
    let model = ReferenceModelBuilder::new()
        .input(ElemType::Float32, &[1])
        .output(ElemType::Int8, &[4])
        .identity()
        .build();
    let mut runtime =
        ModelRuntime::load(Arc::new(ReferenceEngine::new()), model, 4 * 1024).unwrap();

    let err = runtime.predict().unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::InferenceFailed(RuntimeStatus::UnresolvedOps)
    ));
    assert_eq!(runtime.last_status(), Some(RuntimeStatus::UnresolvedOps));

    // The failure is reported, not poisoning: the caller may retry.
    assert!(matches!(
        runtime.predict(),
        Err(RuntimeError::InferenceFailed(RuntimeStatus::UnresolvedOps))
    ));
    runtime.dispose();
}

#[test]
fn outputs_stable_between_predicts() {
    let mut runtime = f32_scalar_runtime();

    runtime.set_input_f32(&[5.0]).unwrap();
    let output = runtime.predict().unwrap();
    assert_eq!(output.f32_at(0).unwrap(), 5.0);
    // Re-reading the same view is stable until the next pass.
    assert_eq!(output.f32_at(0).unwrap(), 5.0);

    // The next pass re-fetches the output descriptor and sees the new
    // result.
    runtime.set_input_f32(&[9.0]).unwrap();
    let output = runtime.predict().unwrap();
    assert_eq!(output.f32_at(0).unwrap(), 9.0);
}

#[test]
fn arena_capacity_failure_is_construction_error() {
    let result = ModelRuntime::load(
        Arc::new(ReferenceEngine::new()),
        ReferenceModelBuilder::new().build(),
        0,
    );
    assert!(matches!(
        result,
        Err(RuntimeError::Construction(
            micro_runtime::ConstructionError::Arena(_)
        ))
    ));
}
