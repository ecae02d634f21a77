// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # micro-runtime
//!
//! Host-side lifecycle manager and data-marshaling layer for a
//! quantized inference engine running on memory-constrained
//! microcontrollers.
//!
//! This crate owns the part that has to be exactly right: loading a
//! serialized model into a fixed [`memory_arena::Arena`], creating and
//! tearing down an interpreter bound to that arena, allocating tensor
//! buffers, marshaling values across the quantized storage boundary,
//! and invoking the engine — one synchronous pass per call — with
//! typed result access. The numeric kernels themselves live behind the
//! [`EngineBackend`] boundary and are not reimplemented here.
//!
//! # Key Components
//!
//! - [`ModelRuntime`] — top-level owner: model bytes, arena, engine,
//!   typed input/output facades.
//! - [`Engine`] — the native-context lifecycle: create, allocate
//!   tensors, invoke, dispose.
//! - [`TensorView`] / [`ModelOutput`] — lifetime-bound typed access to
//!   tensor storage.
//! - [`EngineBackend`] — the foreign engine surface, as a trait.
//! - [`reference`] — an in-process backend for tests and development.
//!
//! # Control Flow
//!
//! ```text
//! ModelRuntime::load(backend, bytes, arena_capacity)
//!     │   pins bytes → reserves Arena → Engine::create → allocate_tensors
//!     ▼
//! set_input_f32 / set_input_i8 / set_input_real
//!     │
//!     ▼
//! predict() ──► Engine::invoke ──► ModelOutput (read, dequantize, argmax)
//!     │
//!     ▼
//! dispose()   — interpreter → options → model → arena → bytes
//! ```
//!
//! # Example
//!
//! ```
//! use micro_runtime::reference::{ReferenceEngine, ReferenceModelBuilder};
//! use micro_runtime::ModelRuntime;
//! use quant_codec::ElemType;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), micro_runtime::RuntimeError> {
//! let model = ReferenceModelBuilder::new()
//!     .input(ElemType::Float32, &[2])
//!     .output(ElemType::Float32, &[2])
//!     .identity()
//!     .build();
//!
//! let mut runtime = ModelRuntime::load(Arc::new(ReferenceEngine::new()), model, 16 * 1024)?;
//! runtime.set_input_f32(&[0.25, 0.75])?;
//! let output = runtime.predict()?;
//! assert_eq!(output.classify()?, 1);
//! # Ok(())
//! # }
//! ```

mod backend;
mod engine;
mod error;
mod model;
mod output;
pub mod reference;
mod status;
mod view;

pub use backend::{
    EngineBackend, InterpreterHandle, ModelHandle, OptionsHandle, TensorHandle,
};
pub use engine::{Engine, EngineState};
pub use error::{ConstructionError, RuntimeError};
pub use model::ModelRuntime;
pub use output::ModelOutput;
pub use status::RuntimeStatus;
pub use view::TensorView;
