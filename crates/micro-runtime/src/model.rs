// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The top-level model owner: bytes, arena, engine, typed I/O.

use crate::backend::EngineBackend;
use crate::{ConstructionError, Engine, ModelOutput, RuntimeError, RuntimeStatus};
use memory_arena::Arena;
use quant_codec::{quantize, ElemType, QuantizationParams};
use std::sync::Arc;

/// Owner of one loaded model and everything the engine needs to run it.
///
/// A `ModelRuntime` pins the serialized model bytes for its whole
/// lifetime (the engine reads them in place, without copying), stands
/// up the [`Arena`] and [`Engine`] during construction — never lazily —
/// and fails the whole construction if any step fails, releasing
/// everything acquired up to that point.
///
/// The caller-facing numeric surface is fixed at load: the input and
/// output element types must be `f32` or `i8`, and the input/output
/// quantization parameters are read once from the allocated tensors.
///
/// Lifecycle: construct with [`load`](ModelRuntime::load), write inputs,
/// [`predict`](ModelRuntime::predict) any number of times, then
/// [`dispose`](ModelRuntime::dispose) (or drop). Destruction runs in
/// the strict reverse of construction: engine contexts, then arena,
/// then the pinned model bytes.
///
/// One prediction at a time is guaranteed by the `&mut self` receiver;
/// sharing a `ModelRuntime` across threads requires external
/// synchronization, which the borrow checker already demands.
pub struct ModelRuntime {
    engine: Option<Engine>,
    // Declared after `engine` and taken only after the engine is
    // disposed: the native side holds pointers into these bytes.
    model_data: Option<Box<[u8]>>,
    input_type: ElemType,
    output_type: ElemType,
    input_quant: QuantizationParams,
    output_quant: QuantizationParams,
    input_len: usize,
}

impl ModelRuntime {
    /// Loads a model from raw bytes with an arena of
    /// `arena_capacity` bytes.
    ///
    /// Runs the full construction chain — pin bytes, reserve arena,
    /// create engine, allocate tensors, read quantization params — and
    /// fails atomically: on any error, resources acquired so far are
    /// released before the error is returned, so nothing leaks.
    ///
    /// Models whose input or output element type falls outside the
    /// marshaled `f32`/`i8` set are rejected with
    /// [`RuntimeError::UnsupportedType`].
    pub fn load(
        backend: Arc<dyn EngineBackend>,
        model_bytes: impl Into<Vec<u8>>,
        arena_capacity: usize,
    ) -> Result<Self, RuntimeError> {
        let model_data: Box<[u8]> = model_bytes.into().into_boxed_slice();
        tracing::info!("loading model: {} bytes", model_data.len());

        let arena = Arena::with_capacity(arena_capacity).map_err(ConstructionError::from)?;

        // SAFETY: `model_data` is a heap allocation whose address never
        // changes; it is stored next to the engine below and released
        // strictly after the engine is disposed.
        let mut engine = unsafe { Engine::create(backend, &model_data, arena) }?;

        let status = engine.allocate_tensors()?;
        if !status.is_ok() {
            // `engine` (and with it the arena) unwinds via Drop.
            return Err(ConstructionError::TensorAllocation(status).into());
        }

        let (input_type, input_quant, input_len) = {
            let view = engine.input_tensor(0)?;
            (view.elem_type(), view.quantization(), view.len())
        };
        let (output_type, output_quant) = {
            let view = engine.output_tensor(0)?;
            (view.elem_type(), view.quantization())
        };

        for elem in [input_type, output_type] {
            if !matches!(elem, ElemType::Float32 | ElemType::Int8) {
                return Err(RuntimeError::UnsupportedType(elem));
            }
        }

        tracing::info!(
            "model runtime ready: input {input_type}[{input_len}], output {output_type}"
        );

        Ok(Self {
            engine: Some(engine),
            model_data: Some(model_data),
            input_type,
            output_type,
            input_quant,
            output_quant,
            input_len,
        })
    }

    /// Writes raw `f32` values contiguously into the input tensor,
    /// starting at index 0.
    ///
    /// The slice length must equal the input tensor length exactly; a
    /// mismatch is rejected with [`RuntimeError::InvalidInput`] rather
    /// than truncated. Calling this on an `i8` input tensor is a
    /// contract violation.
    pub fn set_input_f32(&mut self, values: &[f32]) -> Result<(), RuntimeError> {
        self.check_input(ElemType::Float32, values.len())?;
        let view = self.live_engine()?.input_tensor(0)?;
        for (index, &value) in values.iter().enumerate() {
            view.set_f32(index, value)?;
        }
        Ok(())
    }

    /// Writes quantized `i8` values contiguously into the input
    /// tensor, starting at index 0.
    ///
    /// Same length and type rules as
    /// [`set_input_f32`](ModelRuntime::set_input_f32).
    pub fn set_input_i8(&mut self, values: &[i8]) -> Result<(), RuntimeError> {
        self.check_input(ElemType::Int8, values.len())?;
        let view = self.live_engine()?.input_tensor(0)?;
        for (index, &value) in values.iter().enumerate() {
            view.set_i8(index, value)?;
        }
        Ok(())
    }

    /// Writes real values into the input tensor, quantizing through
    /// the input parameters when the tensor stores `i8`.
    ///
    /// For an `f32` input tensor this is
    /// [`set_input_f32`](ModelRuntime::set_input_f32); for an `i8`
    /// tensor each value is converted with the model's input
    /// quantization parameters first.
    pub fn set_input_real(&mut self, values: &[f32]) -> Result<(), RuntimeError> {
        match self.input_type {
            ElemType::Float32 => self.set_input_f32(values),
            ElemType::Int8 => {
                self.check_input(ElemType::Int8, values.len())?;
                let quant = self.input_quant;
                let view = self.live_engine()?.input_tensor(0)?;
                for (index, &value) in values.iter().enumerate() {
                    view.set_i8(index, quantize(value, quant))?;
                }
                Ok(())
            }
            other => Err(RuntimeError::UnsupportedType(other)),
        }
    }

    /// Runs one synchronous inference pass and returns a read-only
    /// view over the output tensor.
    ///
    /// A non-Ok engine status surfaces as
    /// [`RuntimeError::InferenceFailed`]; the runtime stays usable, so
    /// the caller may retry. The returned view is valid until the next
    /// `predict()` or `dispose()` — it re-fetches the output tensor
    /// descriptor, whose identity may change across passes.
    ///
    /// Predicting before any `set_input_*` call is well-defined: tensor
    /// buffers are zeroed at allocation, so the pass runs over zeros.
    pub fn predict(&mut self) -> Result<ModelOutput<'_>, RuntimeError> {
        let status = self.live_engine_mut()?.invoke()?;
        if !status.is_ok() {
            return Err(RuntimeError::InferenceFailed(status));
        }

        let view = self.live_engine()?.output_tensor(0)?;
        Ok(ModelOutput::new(view, self.output_quant))
    }

    /// Releases everything this runtime owns, idempotently: engine
    /// contexts (interpreter, options, model), then the arena, then
    /// the pinned model bytes. Never fails; dropping the runtime has
    /// the same effect.
    pub fn dispose(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.dispose();
        }
        if self.model_data.take().is_some() {
            tracing::info!("model runtime disposed");
        }
    }

    /// Returns `true` once [`dispose`](ModelRuntime::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.engine.is_none()
    }

    /// The input tensor's element type.
    pub fn input_type(&self) -> ElemType {
        self.input_type
    }

    /// The output tensor's element type.
    pub fn output_type(&self) -> ElemType {
        self.output_type
    }

    /// The input tensor's quantization parameters.
    pub fn input_quantization(&self) -> QuantizationParams {
        self.input_quant
    }

    /// The output tensor's quantization parameters.
    pub fn output_quantization(&self) -> QuantizationParams {
        self.output_quant
    }

    /// Number of elements in the input tensor.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// The status of the engine's most recent operation, or `None`
    /// after dispose.
    pub fn last_status(&self) -> Option<RuntimeStatus> {
        self.engine.as_ref().map(Engine::last_status)
    }

    // ── Private helpers ────────────────────────────────────────

    fn live_engine(&self) -> Result<&Engine, RuntimeError> {
        self.engine.as_ref().ok_or_else(disposed)
    }

    fn live_engine_mut(&mut self) -> Result<&mut Engine, RuntimeError> {
        self.engine.as_mut().ok_or_else(disposed)
    }

    fn check_input(&self, elem: ElemType, len: usize) -> Result<(), RuntimeError> {
        self.live_engine()?;
        if self.input_type != elem {
            return Err(RuntimeError::ContractViolation(format!(
                "{elem} input write to a {} input tensor",
                self.input_type
            )));
        }
        if len != self.input_len {
            return Err(RuntimeError::InvalidInput(format!(
                "input length {len} does not match tensor length {}",
                self.input_len
            )));
        }
        Ok(())
    }
}

impl Drop for ModelRuntime {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn disposed() -> RuntimeError {
    RuntimeError::ContractViolation("model runtime used after dispose".into())
}

impl std::fmt::Debug for ModelRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRuntime")
            .field("disposed", &self.is_disposed())
            .field("input_type", &self.input_type)
            .field("input_len", &self.input_len)
            .field("output_type", &self.output_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{ReferenceEngine, ReferenceModelBuilder};

    fn i8_passthrough(len: usize) -> ModelRuntime {
        let model = ReferenceModelBuilder::new()
            .input(ElemType::Int8, &[len])
            .output(ElemType::Int8, &[len])
            .input_quantization(QuantizationParams::new(0.5, 0))
            .identity()
            .build();
        ModelRuntime::load(Arc::new(ReferenceEngine::new()), model, 8 * 1024).unwrap()
    }

    #[test]
    fn test_load_reads_io_contract_once() {
        let model = ReferenceModelBuilder::new()
            .input(ElemType::Int8, &[4])
            .output(ElemType::Int8, &[2])
            .input_quantization(QuantizationParams::new(0.1, -128))
            .output_quantization(QuantizationParams::new(0.2, 3))
            .identity()
            .build();
        let rt = ModelRuntime::load(Arc::new(ReferenceEngine::new()), model, 8 * 1024).unwrap();

        assert_eq!(rt.input_type(), ElemType::Int8);
        assert_eq!(rt.output_type(), ElemType::Int8);
        assert_eq!(rt.input_len(), 4);
        assert_eq!(rt.input_quantization(), QuantizationParams::new(0.1, -128));
        assert_eq!(rt.output_quantization(), QuantizationParams::new(0.2, 3));
        assert_eq!(rt.last_status(), Some(RuntimeStatus::Ok));
        assert!(!rt.is_disposed());
    }

    #[test]
    fn test_load_rejects_unmarshaled_types() {
        let model = ReferenceModelBuilder::new()
            .input(ElemType::Int32, &[1])
            .output(ElemType::Int32, &[1])
            .identity()
            .build();
        let result = ModelRuntime::load(Arc::new(ReferenceEngine::new()), model, 8 * 1024);
        assert!(matches!(
            result,
            Err(RuntimeError::UnsupportedType(ElemType::Int32))
        ));
    }

    #[test]
    fn test_set_input_rejects_length_mismatch() {
        let mut rt = i8_passthrough(3);
        assert!(matches!(
            rt.set_input_i8(&[1, 2]),
            Err(RuntimeError::InvalidInput(_))
        ));
        assert!(matches!(
            rt.set_input_i8(&[1, 2, 3, 4]),
            Err(RuntimeError::InvalidInput(_))
        ));
        rt.set_input_i8(&[1, 2, 3]).unwrap();
    }

    #[test]
    fn test_set_input_rejects_type_mismatch() {
        let mut rt = i8_passthrough(2);
        assert!(matches!(
            rt.set_input_f32(&[1.0, 2.0]),
            Err(RuntimeError::ContractViolation(_))
        ));
    }

    #[test]
    fn test_set_input_real_quantizes() {
        let mut rt = i8_passthrough(2);
        // scale 0.5, zero_point 0: 3.0 → 6, -1.5 → -3.
        rt.set_input_real(&[3.0, -1.5]).unwrap();
        let output = rt.predict().unwrap();
        assert_eq!(output.i8_at(0).unwrap(), 6);
        assert_eq!(output.i8_at(1).unwrap(), -3);
    }

    #[test]
    fn test_dispose_is_idempotent_and_final() {
        let mut rt = i8_passthrough(1);
        rt.dispose();
        assert!(rt.is_disposed());
        assert_eq!(rt.last_status(), None);
        rt.dispose();

        assert!(matches!(
            rt.set_input_i8(&[1]),
            Err(RuntimeError::ContractViolation(_))
        ));
        assert!(matches!(
            rt.predict(),
            Err(RuntimeError::ContractViolation(_))
        ));
    }

    #[test]
    fn test_debug_format() {
        let rt = i8_passthrough(1);
        let debug = format!("{rt:?}");
        assert!(debug.contains("ModelRuntime"));
        assert!(debug.contains("i8"));
    }
}
