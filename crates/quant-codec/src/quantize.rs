// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Affine quantization parameters and the conversion codec.

use std::fmt;

/// Parameters of the affine mapping between real values and their
/// quantized 8-bit storage representation.
///
/// Fixed per tensor for the life of the engine that produced them. The
/// mapping is `real = (quantized - zero_point) * scale`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuantizationParams {
    /// Scale factor applied to quantized values.
    pub scale: f32,
    /// Zero-point offset applied to quantized values.
    pub zero_point: i32,
}

impl QuantizationParams {
    /// The identity mapping: quantized values pass through unscaled.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        zero_point: 0,
    };

    /// Creates parameters from a scale and zero-point.
    pub fn new(scale: f32, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }
}

impl Default for QuantizationParams {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for QuantizationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scale={}, zero_point={}", self.scale, self.zero_point)
    }
}

/// Converts a real value to its quantized 8-bit representation.
///
/// Computes `round(real / scale) + zero_point` and narrows the result
/// to `i8` by wraparound, matching the engine's native 8-bit storage
/// width. Values whose quantized form falls outside the `i8` range
/// wrap rather than saturate; callers must pre-validate the input
/// range where saturation is semantically required.
///
/// Total: never fails, for any input including non-finite reals.
pub fn quantize(real: f32, params: QuantizationParams) -> i8 {
    let steps = (real / params.scale).round() as i32;
    steps.wrapping_add(params.zero_point) as i8
}

/// Converts a quantized 8-bit value back to its real representation.
///
/// Computes `(quantized - zero_point) * scale`. Total: never fails.
pub fn dequantize(quantized: i8, params: QuantizationParams) -> f32 {
    (quantized as i32 - params.zero_point) as f32 * params.scale
}
