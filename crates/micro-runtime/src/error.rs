// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the model/interpreter lifecycle.

use crate::RuntimeStatus;
use quant_codec::ElemType;

/// Failures during the construction chain (arena → engine → tensors).
///
/// All of these are fatal: no partially constructed object escapes, and
/// everything acquired before the failure is released before the error
/// is reported.
#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    /// The arena block could not be reserved.
    #[error("arena allocation failed: {0}")]
    Arena(#[from] memory_arena::ArenaError),

    /// The engine returned a null handle while building the model,
    /// interpreter options, or interpreter.
    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    /// The engine refused to allocate tensor buffers.
    #[error("tensor allocation failed with status '{0}'")]
    TensorAllocation(RuntimeStatus),
}

/// Errors surfaced by the runtime to its caller.
///
/// Everything propagates synchronously to the immediate caller; nothing
/// is swallowed or retried inside this layer. Disposal never fails.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Construction failed; no object was produced.
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// The engine reported a non-Ok status for an inference pass. The
    /// runtime stays usable; the caller decides whether to retry.
    #[error("inference failed with status '{0}'")]
    InferenceFailed(RuntimeStatus),

    /// Caller programming error: out-of-range tensor index, element
    /// type mismatch, or use after dispose.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The supplied input data does not fit the input tensor.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model declares an element type outside the marshaled set.
    #[error("unsupported element type '{0}'")]
    UnsupportedType(ElemType),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_error_wraps_into_runtime_error() {
        let arena_err = memory_arena::Arena::with_capacity(0).unwrap_err();
        let err: RuntimeError = ConstructionError::from(arena_err).into();
        assert!(matches!(
            err,
            RuntimeError::Construction(ConstructionError::Arena(_))
        ));
    }

    #[test]
    fn test_messages() {
        let err = ConstructionError::TensorAllocation(RuntimeStatus::Error);
        assert_eq!(
            err.to_string(),
            "tensor allocation failed with status 'error'"
        );

        let err = RuntimeError::UnsupportedType(ElemType::Int64);
        assert_eq!(err.to_string(), "unsupported element type 'i64'");
    }
}
