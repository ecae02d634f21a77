// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed, bounds-checked access to one engine tensor.

use crate::backend::{EngineBackend, TensorHandle};
use crate::RuntimeError;
use quant_codec::{ElemType, ElemValue, QuantizationParams};

/// A borrowed, typed accessor over a single tensor's backing storage.
///
/// Views are obtained from [`Engine::input_tensor`](crate::Engine::input_tensor)
/// and [`Engine::output_tensor`](crate::Engine::output_tensor) and are
/// lifetime-bound to the engine that produced them, so a view can never
/// outlive the interpreter whose tensor it names. Shape and element
/// type are fixed once tensors are allocated; only element values
/// change between invocations.
///
/// Element access is bounds-checked and type-checked: an out-of-range
/// index or a read at the wrong element type is a contract violation
/// surfaced as an error, never a silent coercion.
pub struct TensorView<'e> {
    backend: &'e dyn EngineBackend,
    handle: TensorHandle,
    elem: ElemType,
    len: usize,
}

impl<'e> TensorView<'e> {
    pub(crate) fn new(backend: &'e dyn EngineBackend, handle: TensorHandle) -> Self {
        let elem = backend.tensor_elem_type(handle);
        let len = backend.tensor_byte_len(handle) / elem.size_bytes();
        Self {
            backend,
            handle,
            elem,
            len,
        }
    }

    /// The tensor's element type.
    pub fn elem_type(&self) -> ElemType {
        self.elem
    }

    /// Number of elements in the tensor.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing storage in bytes.
    pub fn byte_len(&self) -> usize {
        self.backend.tensor_byte_len(self.handle)
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.backend.tensor_rank(self.handle)
    }

    /// Size of dimension `index`, or `None` out of range.
    pub fn dim(&self, index: usize) -> Option<usize> {
        if index < self.rank() {
            Some(self.backend.tensor_dim(self.handle, index))
        } else {
            None
        }
    }

    /// The full dimension list.
    pub fn dims(&self) -> Vec<usize> {
        (0..self.rank())
            .map(|i| self.backend.tensor_dim(self.handle, i))
            .collect()
    }

    /// The tensor's quantization parameters.
    pub fn quantization(&self) -> QuantizationParams {
        self.backend.tensor_quantization(self.handle)
    }

    /// Reads the `f32` element at `index`.
    pub fn f32_at(&self, index: usize) -> Result<f32, RuntimeError> {
        self.check(index, ElemType::Float32)?;
        Ok(self.backend.tensor_f32(self.handle, index))
    }

    /// Writes the `f32` element at `index`.
    pub fn set_f32(&self, index: usize, value: f32) -> Result<(), RuntimeError> {
        self.check(index, ElemType::Float32)?;
        self.backend.tensor_set_f32(self.handle, index, value);
        Ok(())
    }

    /// Reads the `i8` element at `index`.
    pub fn i8_at(&self, index: usize) -> Result<i8, RuntimeError> {
        self.check(index, ElemType::Int8)?;
        Ok(self.backend.tensor_i8(self.handle, index))
    }

    /// Writes the `i8` element at `index`.
    pub fn set_i8(&self, index: usize, value: i8) -> Result<(), RuntimeError> {
        self.check(index, ElemType::Int8)?;
        self.backend.tensor_set_i8(self.handle, index, value);
        Ok(())
    }

    /// Reads the element at `index` as a tagged value.
    ///
    /// Fails with [`RuntimeError::UnsupportedType`] for tensors whose
    /// element type is outside the marshaled `f32`/`i8` set.
    pub fn value_at(&self, index: usize) -> Result<ElemValue, RuntimeError> {
        match self.elem {
            ElemType::Float32 => Ok(ElemValue::F32(self.f32_at(index)?)),
            ElemType::Int8 => Ok(ElemValue::I8(self.i8_at(index)?)),
            other => Err(RuntimeError::UnsupportedType(other)),
        }
    }

    // ── Private helpers ────────────────────────────────────────

    fn check(&self, index: usize, expected: ElemType) -> Result<(), RuntimeError> {
        if self.elem != expected {
            return Err(RuntimeError::ContractViolation(format!(
                "{expected} access on a {} tensor",
                self.elem
            )));
        }
        if index >= self.len {
            return Err(RuntimeError::ContractViolation(format!(
                "element index {index} out of range (len {})",
                self.len
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for TensorView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorView")
            .field("elem", &self.elem)
            .field("len", &self.len)
            .field("dims", &self.dims())
            .finish()
    }
}
