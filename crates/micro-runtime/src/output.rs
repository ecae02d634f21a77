// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Read-only typed access to a completed prediction.

use crate::{RuntimeError, TensorView};
use quant_codec::{dequantize, ElemType, ElemValue, QuantizationParams};

/// A read-only view over the output tensor of one completed
/// prediction.
///
/// Borrowed from the [`ModelRuntime`](crate::ModelRuntime) that
/// produced it, so it stays valid exactly until the next `predict()`
/// or `dispose()` — the borrow checker refuses anything longer.
pub struct ModelOutput<'m> {
    view: TensorView<'m>,
    quant: QuantizationParams,
}

impl<'m> ModelOutput<'m> {
    pub(crate) fn new(view: TensorView<'m>, quant: QuantizationParams) -> Self {
        Self { view, quant }
    }

    /// Number of elements in the output tensor.
    pub fn len(&self) -> usize {
        self.view.len()
    }

    /// Returns `true` if the output tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// The output tensor's element type.
    pub fn elem_type(&self) -> ElemType {
        self.view.elem_type()
    }

    /// The output tensor's quantization parameters.
    pub fn quantization(&self) -> QuantizationParams {
        self.quant
    }

    /// Reads the element at `index` in the tensor's native type.
    pub fn value(&self, index: usize) -> Result<ElemValue, RuntimeError> {
        self.view.value_at(index)
    }

    /// Reads the `f32` element at `index`.
    pub fn f32_at(&self, index: usize) -> Result<f32, RuntimeError> {
        self.view.f32_at(index)
    }

    /// Reads the quantized `i8` element at `index`.
    pub fn i8_at(&self, index: usize) -> Result<i8, RuntimeError> {
        self.view.i8_at(index)
    }

    /// Reads the element at `index` as a real value: the affine
    /// dequantization of an `i8` element, or the raw value of an `f32`
    /// element.
    pub fn dequantized(&self, index: usize) -> Result<f32, RuntimeError> {
        match self.view.elem_type() {
            ElemType::Float32 => self.view.f32_at(index),
            ElemType::Int8 => Ok(dequantize(self.view.i8_at(index)?, self.quant)),
            other => Err(RuntimeError::UnsupportedType(other)),
        }
    }

    /// Scans indices `0..length` and returns the first index attaining
    /// the strict maximum, with its value. Ties keep the earliest
    /// index.
    pub fn argmax(&self, length: usize) -> Result<(usize, ElemValue), RuntimeError> {
        if length == 0 {
            return Err(RuntimeError::InvalidInput(
                "argmax over zero elements".into(),
            ));
        }
        if length > self.len() {
            return Err(RuntimeError::ContractViolation(format!(
                "argmax length {length} exceeds output length {}",
                self.len()
            )));
        }

        let mut best_index = 0;
        let mut best = self.value(0)?;
        for index in 1..length {
            let candidate = self.value(index)?;
            // Strictly-greater keeps the earliest index on ties.
            if candidate > best {
                best = candidate;
                best_index = index;
            }
        }
        Ok((best_index, best))
    }

    /// Two-class decision over `[no, yes]`-style outputs: returns
    /// class 1 iff `output[1] > output[0]` strictly, else class 0.
    pub fn classify(&self) -> Result<usize, RuntimeError> {
        let (index, _) = self.argmax(2)?;
        Ok(index)
    }
}

impl std::fmt::Debug for ModelOutput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelOutput")
            .field("elem", &self.elem_type())
            .field("len", &self.len())
            .finish()
    }
}
