// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The engine lifecycle: creation, tensor allocation, invocation,
//! teardown.
//!
//! ```text
//! Engine::create(backend, model, arena)
//!     │  allocate_tensors()
//!     ▼
//! TensorsAllocated ── invoke() ──► Ready ──┐
//!         ▲                          │     │ invoke()
//!         │                          ▼     │
//!         └────── (tensor access) ── Ready ◄┘
//!
//! dispose()  — reachable from every state, idempotent
//! ```
//!
//! Construction that fails half-way destroys the handles it already
//! acquired before reporting the error, so no partial engine ever
//! escapes. Teardown runs in the strict reverse of construction:
//! interpreter, then options, then model, then the arena.

use crate::backend::{EngineBackend, InterpreterHandle, ModelHandle, OptionsHandle};
use crate::{ConstructionError, RuntimeError, RuntimeStatus, TensorView};
use memory_arena::Arena;
use std::sync::Arc;

/// Lifecycle states of an [`Engine`].
///
/// There is no pre-construction state to observe: [`Engine::create`]
/// either returns an engine already in `Created` or no engine at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Native contexts exist; tensors are not yet allocated.
    Created,
    /// Tensor buffers are allocated; inputs can be written.
    TensorsAllocated,
    /// At least one invoke has completed; re-entered on each success.
    Ready,
    /// Terminal: native contexts and arena have been released.
    Disposed,
}

/// Owner of the native inference contexts.
///
/// An `Engine` wraps one opaque model context, one interpreter-options
/// context, and one interpreter, all created against a single [`Arena`]
/// which the engine keeps alive for exactly as long as the native
/// handles exist. It tracks the [`RuntimeStatus`] of its most recent
/// engine operation.
///
/// One invoke at a time is guaranteed by the `&mut self` receiver;
/// there is no internal lock.
pub struct Engine {
    backend: Arc<dyn EngineBackend>,
    model: Option<ModelHandle>,
    options: Option<OptionsHandle>,
    interpreter: Option<InterpreterHandle>,
    // Dropped only in dispose(), after the native handles are gone.
    arena: Option<Arena>,
    state: EngineState,
    allocate_attempted: bool,
    last_status: RuntimeStatus,
}

impl Engine {
    /// Builds the native contexts from model bytes and an arena.
    ///
    /// Construction order: model (bound to the arena), then options,
    /// then the interpreter. A null handle from any step fails the
    /// whole construction with
    /// [`ConstructionError::EngineInit`] after destroying whatever was
    /// already created.
    ///
    /// # Safety
    ///
    /// The engine retains raw pointers into `model_bytes` without
    /// copying. The caller must keep `model_bytes` valid and unmoved
    /// until the returned engine is disposed or dropped.
    /// [`ModelRuntime`](crate::ModelRuntime) is the intended caller
    /// and upholds this by pinning the bytes for its own lifetime.
    pub unsafe fn create(
        backend: Arc<dyn EngineBackend>,
        model_bytes: &[u8],
        mut arena: Arena,
    ) -> Result<Self, ConstructionError> {
        let model = backend
            .model_create(
                arena.as_mut_ptr(),
                arena.capacity(),
                model_bytes.as_ptr(),
                model_bytes.len(),
            )
            .ok_or_else(|| {
                ConstructionError::EngineInit("engine rejected the model bytes".into())
            })?;

        let options = match backend.options_create(model) {
            Some(options) => options,
            None => {
                backend.model_destroy(model);
                return Err(ConstructionError::EngineInit(
                    "failed to create interpreter options".into(),
                ));
            }
        };

        let interpreter = match backend.interpreter_create(options, model) {
            Some(interpreter) => interpreter,
            None => {
                backend.options_destroy(options);
                backend.model_destroy(model);
                return Err(ConstructionError::EngineInit(
                    "failed to create interpreter".into(),
                ));
            }
        };

        tracing::info!(
            "engine created: {} model bytes, {} byte arena",
            model_bytes.len(),
            arena.capacity(),
        );

        Ok(Self {
            backend,
            model: Some(model),
            options: Some(options),
            interpreter: Some(interpreter),
            arena: Some(arena),
            state: EngineState::Created,
            allocate_attempted: false,
            last_status: RuntimeStatus::Ok,
        })
    }

    /// Allocates the interpreter's tensor buffers from the arena.
    ///
    /// Must be called exactly once, after creation and before any
    /// tensor access; a second call is a contract violation. A non-Ok
    /// status is fatal to this engine: it will refuse to invoke.
    pub fn allocate_tensors(&mut self) -> Result<RuntimeStatus, RuntimeError> {
        if self.allocate_attempted {
            return Err(RuntimeError::ContractViolation(
                "allocate_tensors called more than once".into(),
            ));
        }
        let interpreter = self.interpreter()?;
        self.allocate_attempted = true;

        let status = self.backend.allocate_tensors(interpreter);
        self.last_status = status;

        if status.is_ok() {
            self.state = EngineState::TensorsAllocated;
            tracing::info!("tensors allocated");
        } else {
            tracing::warn!("tensor allocation failed with status '{status}'");
        }
        Ok(status)
    }

    /// Runs one synchronous forward pass over the current input tensor
    /// contents.
    ///
    /// Blocks until the pass completes or the engine reports a failure
    /// status; there is no cancellation and no partial pass. On success
    /// the output tensors are readable — through a freshly fetched
    /// [`output_tensor`](Engine::output_tensor) view, because the
    /// output handle identity may change across invocations.
    pub fn invoke(&mut self) -> Result<RuntimeStatus, RuntimeError> {
        if !matches!(
            self.state,
            EngineState::TensorsAllocated | EngineState::Ready
        ) {
            return Err(RuntimeError::ContractViolation(format!(
                "invoke called in state {:?}",
                self.state
            )));
        }
        let interpreter = self.interpreter()?;

        let status = self.backend.invoke(interpreter);
        self.last_status = status;

        if status.is_ok() {
            self.state = EngineState::Ready;
            tracing::debug!("invoke complete");
        } else {
            tracing::warn!("invoke failed with status '{status}'");
        }
        Ok(status)
    }

    /// Borrows the input tensor at `index`.
    ///
    /// Requires tensors to be allocated; an out-of-range index is a
    /// contract violation, not a runtime status.
    pub fn input_tensor(&self, index: usize) -> Result<TensorView<'_>, RuntimeError> {
        let interpreter = self.allocated_interpreter()?;
        let count = self.backend.input_count(interpreter);
        if index >= count {
            return Err(RuntimeError::ContractViolation(format!(
                "input tensor index {index} out of range (count {count})"
            )));
        }
        let handle = self
            .backend
            .input_tensor(interpreter, index)
            .ok_or_else(|| {
                RuntimeError::ContractViolation(format!(
                    "engine returned no handle for input tensor {index}"
                ))
            })?;
        Ok(TensorView::new(self.backend.as_ref(), handle))
    }

    /// Borrows the output tensor at `index`.
    ///
    /// Re-fetch after every [`invoke`](Engine::invoke): the handle
    /// identity is not stable across passes, though buffer contents
    /// are stable until the next pass.
    pub fn output_tensor(&self, index: usize) -> Result<TensorView<'_>, RuntimeError> {
        let interpreter = self.allocated_interpreter()?;
        let count = self.backend.output_count(interpreter);
        if index >= count {
            return Err(RuntimeError::ContractViolation(format!(
                "output tensor index {index} out of range (count {count})"
            )));
        }
        let handle = self
            .backend
            .output_tensor(interpreter, index)
            .ok_or_else(|| {
                RuntimeError::ContractViolation(format!(
                    "engine returned no handle for output tensor {index}"
                ))
            })?;
        Ok(TensorView::new(self.backend.as_ref(), handle))
    }

    /// Number of input tensors the interpreter expects.
    pub fn input_count(&self) -> Result<usize, RuntimeError> {
        Ok(self.backend.input_count(self.interpreter()?))
    }

    /// Number of output tensors the interpreter produces.
    pub fn output_count(&self) -> Result<usize, RuntimeError> {
        Ok(self.backend.output_count(self.interpreter()?))
    }

    /// Sets the engine's mutable option byte, recording the status.
    pub fn set_mutable_option(&mut self, option: i8) -> Result<RuntimeStatus, RuntimeError> {
        // The option is engine-global but still refused after teardown.
        self.interpreter()?;
        let status = self.backend.set_mutable_option(option);
        self.last_status = status;
        Ok(status)
    }

    /// The status of the most recent engine operation.
    pub fn last_status(&self) -> RuntimeStatus {
        self.last_status
    }

    /// The current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Destroys the native contexts and releases the arena.
    ///
    /// Teardown order is the strict reverse of construction:
    /// interpreter, then options, then model, then the arena. Each
    /// handle is destroyed exactly once; repeated calls are no-ops.
    /// Disposal never fails, even after a partial construction.
    pub fn dispose(&mut self) {
        if self.state == EngineState::Disposed {
            return;
        }
        if let Some(interpreter) = self.interpreter.take() {
            self.backend.interpreter_destroy(interpreter);
        }
        if let Some(options) = self.options.take() {
            self.backend.options_destroy(options);
        }
        if let Some(model) = self.model.take() {
            self.backend.model_destroy(model);
        }
        // The native handles are gone; the arena may now be returned
        // to the host allocator.
        self.arena = None;
        self.state = EngineState::Disposed;
        tracing::info!("engine disposed");
    }

    // ── Private helpers ────────────────────────────────────────

    fn interpreter(&self) -> Result<InterpreterHandle, RuntimeError> {
        self.interpreter.ok_or_else(|| {
            RuntimeError::ContractViolation("engine used after dispose".into())
        })
    }

    fn allocated_interpreter(&self) -> Result<InterpreterHandle, RuntimeError> {
        if !matches!(
            self.state,
            EngineState::TensorsAllocated | EngineState::Ready
        ) {
            return Err(RuntimeError::ContractViolation(format!(
                "tensor access in state {:?}",
                self.state
            )));
        }
        self.interpreter()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("last_status", &self.last_status)
            .field("has_arena", &self.arena.is_some())
            .finish()
    }
}
