// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The foreign-engine boundary.
//!
//! The inference engine itself — op resolution, convolution, quantized
//! matmul — is an external collaborator reached through a C-style
//! surface of opaque handles and status codes. [`EngineBackend`]
//! captures that surface as an object-safe trait so the lifecycle
//! layer above it ([`Engine`](crate::Engine)) is written once against
//! the contract, whether the handles come from a linked native library
//! or from the in-process [`reference`](crate::reference) engine used
//! in tests.
//!
//! # Handle Ownership
//!
//! Each handle type names exactly one kind of engine object. Handles
//! are ownership-tagged: whoever received a handle from a `*_create`
//! call destroys it exactly once via the matching `*_destroy`.
//! Destroying an already-destroyed or never-created handle is a no-op,
//! not an error — teardown must never fail. Tensor handles are
//! borrowed, never owned: they carry no destruction responsibility and
//! must not be used after the interpreter that produced them is gone
//! (the safe wrappers enforce this with lifetimes).

use crate::RuntimeStatus;
use quant_codec::{ElemType, QuantizationParams};

macro_rules! opaque_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw engine handle value.
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw engine handle value.
            pub fn as_raw(self) -> u64 {
                self.0
            }
        }
    };
}

opaque_handle!(
    /// Opaque handle to a loaded model bound to an arena.
    ModelHandle
);
opaque_handle!(
    /// Opaque handle to an interpreter-options object.
    OptionsHandle
);
opaque_handle!(
    /// Opaque handle to an interpreter.
    InterpreterHandle
);
opaque_handle!(
    /// Opaque, borrowed handle to one tensor of an interpreter.
    TensorHandle
);

/// The synchronous foreign surface of the inference engine.
///
/// Every call returns a handle (`None` for the engine's null handle),
/// a scalar, or a [`RuntimeStatus`]; no call suspends or calls back.
/// Implementations must tolerate `*_destroy` on unknown handles (the
/// teardown-is-a-no-op rule) and must keep tensor element get/set
/// in-bounds for the indices the safe layer has validated.
pub trait EngineBackend: Send + Sync + std::fmt::Debug {
    /// Loads a model from raw bytes, binding it to the given arena for
    /// all of the engine's working allocations.
    ///
    /// Returns `None` if the engine rejects the bytes.
    ///
    /// # Safety
    ///
    /// A conforming implementation retains `model_ptr` and `arena_ptr`
    /// inside the returned handle without copying. The caller must
    /// guarantee both regions stay valid and unmoved until the handle
    /// is destroyed — and destroy every dependent options/interpreter
    /// handle first.
    unsafe fn model_create(
        &self,
        arena_ptr: *mut u8,
        arena_len: usize,
        model_ptr: *const u8,
        model_len: usize,
    ) -> Option<ModelHandle>;

    /// Destroys a model handle. No-op for unknown handles.
    fn model_destroy(&self, model: ModelHandle);

    /// Creates an interpreter-options object for a model, or `None` on
    /// failure.
    fn options_create(&self, model: ModelHandle) -> Option<OptionsHandle>;

    /// Destroys an options handle. No-op for unknown handles.
    fn options_destroy(&self, options: OptionsHandle);

    /// Creates an interpreter from options and model, or `None` on
    /// failure.
    fn interpreter_create(
        &self,
        options: OptionsHandle,
        model: ModelHandle,
    ) -> Option<InterpreterHandle>;

    /// Destroys an interpreter handle and every tensor it produced.
    /// No-op for unknown handles.
    fn interpreter_destroy(&self, interpreter: InterpreterHandle);

    /// Allocates the interpreter's tensor buffers from its arena.
    fn allocate_tensors(&self, interpreter: InterpreterHandle) -> RuntimeStatus;

    /// Runs one synchronous forward pass.
    fn invoke(&self, interpreter: InterpreterHandle) -> RuntimeStatus;

    /// Number of input tensors the interpreter expects.
    fn input_count(&self, interpreter: InterpreterHandle) -> usize;

    /// Number of output tensors the interpreter produces.
    fn output_count(&self, interpreter: InterpreterHandle) -> usize;

    /// Borrows the input tensor at `index`, or `None` out of range.
    fn input_tensor(
        &self,
        interpreter: InterpreterHandle,
        index: usize,
    ) -> Option<TensorHandle>;

    /// Borrows the output tensor at `index`, or `None` out of range.
    ///
    /// The returned handle identity is only stable until the next
    /// [`invoke`](EngineBackend::invoke); callers re-fetch after every
    /// pass.
    fn output_tensor(
        &self,
        interpreter: InterpreterHandle,
        index: usize,
    ) -> Option<TensorHandle>;

    /// Element type of a tensor.
    fn tensor_elem_type(&self, tensor: TensorHandle) -> ElemType;

    /// Number of dimensions of a tensor.
    fn tensor_rank(&self, tensor: TensorHandle) -> usize;

    /// Size of dimension `index` of a tensor.
    fn tensor_dim(&self, tensor: TensorHandle, index: usize) -> usize;

    /// Total backing-buffer size of a tensor in bytes.
    fn tensor_byte_len(&self, tensor: TensorHandle) -> usize;

    /// Quantization parameters of a tensor.
    fn tensor_quantization(&self, tensor: TensorHandle) -> QuantizationParams;

    /// Reads the `f32` element at `index`.
    fn tensor_f32(&self, tensor: TensorHandle, index: usize) -> f32;

    /// Writes the `f32` element at `index`.
    fn tensor_set_f32(&self, tensor: TensorHandle, index: usize, value: f32);

    /// Reads the `i8` element at `index`.
    fn tensor_i8(&self, tensor: TensorHandle, index: usize) -> i8;

    /// Writes the `i8` element at `index`.
    fn tensor_set_i8(&self, tensor: TensorHandle, index: usize, value: i8);

    /// Sets the engine's mutable option byte.
    fn set_mutable_option(&self, option: i8) -> RuntimeStatus;
}
