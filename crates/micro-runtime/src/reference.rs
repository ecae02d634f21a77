// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! An in-process [`EngineBackend`] for running the lifecycle without a
//! native library.
//!
//! [`ReferenceEngine`] implements the full foreign surface over a small
//! serialized model format assembled by [`ReferenceModelBuilder`]. It
//! is the synthetic counterpart to a linked engine: the real numeric
//! kernels live elsewhere, but everything this layer is responsible
//! for — handle ownership, arena capacity enforcement, status
//! reporting, tensor marshaling — behaves like the genuine article:
//!
//! - malformed or truncated model bytes fail model creation,
//! - tensor allocation fails with a non-Ok status when the declared
//!   arena demand exceeds the arena capacity,
//! - tensor buffers are zeroed at allocation,
//! - the output tensor handle changes identity on every invoke, so
//!   callers that cache it across passes are caught by tests,
//! - destroying unknown handles is a no-op.
//!
//! Supported model ops are deliberately minimal: `identity` copies the
//! input buffer to the output, and `lookup` maps each `i8` input
//! element through a 256-entry table — the shape of a quantized
//! single-feature regression model.

use crate::backend::{
    EngineBackend, InterpreterHandle, ModelHandle, OptionsHandle, TensorHandle,
};
use crate::RuntimeStatus;
use quant_codec::{ElemType, QuantizationParams};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

const MAGIC: [u8; 4] = *b"MIC1";
const FORMAT_VERSION: u8 = 1;
const MAX_RANK: usize = 8;

const OP_IDENTITY: u8 = 0;
const OP_LOOKUP: u8 = 1;

// ── Model format ───────────────────────────────────────────────

#[derive(Clone)]
enum RefOp {
    Identity,
    Lookup(Box<[i8; 256]>),
}

#[derive(Clone)]
struct ModelDef {
    input_elem: ElemType,
    output_elem: ElemType,
    input_dims: Vec<usize>,
    output_dims: Vec<usize>,
    input_quant: QuantizationParams,
    output_quant: QuantizationParams,
    arena_demand: usize,
    op: RefOp,
}

impl ModelDef {
    fn input_byte_len(&self) -> usize {
        self.input_dims.iter().product::<usize>() * self.input_elem.size_bytes()
    }

    fn output_byte_len(&self) -> usize {
        self.output_dims.iter().product::<usize>() * self.output_elem.size_bytes()
    }
}

/// Byte-wise reader over the serialized model.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.bytes.len() {
            return None;
        }
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Some(out)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self) -> Option<i32> {
        self.take(4).map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self) -> Option<f32> {
        self.take(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

fn parse_dims(cursor: &mut Cursor<'_>) -> Option<Vec<usize>> {
    let rank = cursor.u8()? as usize;
    if rank == 0 || rank > MAX_RANK {
        return None;
    }
    let mut dims = Vec::with_capacity(rank);
    for _ in 0..rank {
        let dim = cursor.u32()? as usize;
        if dim == 0 {
            return None;
        }
        dims.push(dim);
    }
    Some(dims)
}

fn parse_quant(cursor: &mut Cursor<'_>) -> Option<QuantizationParams> {
    let scale = cursor.f32()?;
    let zero_point = cursor.i32()?;
    Some(QuantizationParams { scale, zero_point })
}

fn parse_model(bytes: &[u8]) -> Option<ModelDef> {
    let mut cursor = Cursor::new(bytes);

    if cursor.take(4)? != MAGIC.as_slice() {
        return None;
    }
    if cursor.u8()? != FORMAT_VERSION {
        return None;
    }

    let input_elem = ElemType::from_code(cursor.u8()?).ok()?;
    let output_elem = ElemType::from_code(cursor.u8()?).ok()?;
    let op_code = cursor.u8()?;

    let input_dims = parse_dims(&mut cursor)?;
    let output_dims = parse_dims(&mut cursor)?;
    let input_quant = parse_quant(&mut cursor)?;
    let output_quant = parse_quant(&mut cursor)?;
    let arena_demand = cursor.u32()? as usize;

    let op = match op_code {
        OP_IDENTITY => RefOp::Identity,
        OP_LOOKUP => {
            let raw = cursor.take(256)?;
            let mut table = [0i8; 256];
            for (dst, src) in table.iter_mut().zip(raw) {
                *dst = *src as i8;
            }
            RefOp::Lookup(Box::new(table))
        }
        _ => return None,
    };

    Some(ModelDef {
        input_elem,
        output_elem,
        input_dims,
        output_dims,
        input_quant,
        output_quant,
        arena_demand,
        op,
    })
}

// ── Backend state ──────────────────────────────────────────────

struct ModelEntry {
    def: ModelDef,
    arena_capacity: usize,
}

struct InterpreterEntry {
    model: u64,
    allocated: bool,
    input: Option<u64>,
    output: Option<u64>,
}

struct TensorEntry {
    elem: ElemType,
    dims: Vec<usize>,
    quant: QuantizationParams,
    data: Vec<u8>,
}

#[derive(Default)]
struct State {
    next_raw: u64,
    models: HashMap<u64, ModelEntry>,
    options: HashMap<u64, u64>,
    interpreters: HashMap<u64, InterpreterEntry>,
    tensors: HashMap<u64, TensorEntry>,
    last_option: Option<i8>,
}

impl State {
    fn fresh_raw(&mut self) -> u64 {
        self.next_raw += 1;
        self.next_raw
    }
}

/// The in-process reference engine.
///
/// Internally synchronized, so one instance can back several runtimes
/// in tests; each interpreter's state is still strictly sequential, as
/// the contract requires of its callers.
pub struct ReferenceEngine {
    state: Mutex<State>,
}

impl ReferenceEngine {
    /// Creates an empty reference engine.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Number of engine objects (models, options, interpreters,
    /// tensors) currently alive. Zero once every owner has torn down.
    pub fn live_handles(&self) -> usize {
        let state = self.lock();
        state.models.len()
            + state.options.len()
            + state.interpreters.len()
            + state.tensors.len()
    }

    /// The most recent value passed to the mutable-option setter.
    pub fn last_mutable_option(&self) -> Option<i8> {
        self.lock().last_option
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("reference engine state poisoned")
    }
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ReferenceEngine")
            .field("models", &state.models.len())
            .field("interpreters", &state.interpreters.len())
            .field("tensors", &state.tensors.len())
            .finish()
    }
}

impl EngineBackend for ReferenceEngine {
    unsafe fn model_create(
        &self,
        _arena_ptr: *mut u8,
        arena_len: usize,
        model_ptr: *const u8,
        model_len: usize,
    ) -> Option<ModelHandle> {
        // The reference engine honors the capacity contract but keeps
        // its working buffers internal; it never writes through the
        // arena pointer.
        let bytes = std::slice::from_raw_parts(model_ptr, model_len);
        let def = parse_model(bytes)?;

        let mut state = self.lock();
        let raw = state.fresh_raw();
        state.models.insert(
            raw,
            ModelEntry {
                def,
                arena_capacity: arena_len,
            },
        );
        Some(ModelHandle::from_raw(raw))
    }

    fn model_destroy(&self, model: ModelHandle) {
        self.lock().models.remove(&model.as_raw());
    }

    fn options_create(&self, model: ModelHandle) -> Option<OptionsHandle> {
        let mut state = self.lock();
        if !state.models.contains_key(&model.as_raw()) {
            return None;
        }
        let raw = state.fresh_raw();
        state.options.insert(raw, model.as_raw());
        Some(OptionsHandle::from_raw(raw))
    }

    fn options_destroy(&self, options: OptionsHandle) {
        self.lock().options.remove(&options.as_raw());
    }

    fn interpreter_create(
        &self,
        options: OptionsHandle,
        model: ModelHandle,
    ) -> Option<InterpreterHandle> {
        let mut state = self.lock();
        if !state.options.contains_key(&options.as_raw())
            || !state.models.contains_key(&model.as_raw())
        {
            return None;
        }
        let raw = state.fresh_raw();
        state.interpreters.insert(
            raw,
            InterpreterEntry {
                model: model.as_raw(),
                allocated: false,
                input: None,
                output: None,
            },
        );
        Some(InterpreterHandle::from_raw(raw))
    }

    fn interpreter_destroy(&self, interpreter: InterpreterHandle) {
        let mut state = self.lock();
        if let Some(entry) = state.interpreters.remove(&interpreter.as_raw()) {
            if let Some(t) = entry.input {
                state.tensors.remove(&t);
            }
            if let Some(t) = entry.output {
                state.tensors.remove(&t);
            }
        }
    }

    fn allocate_tensors(&self, interpreter: InterpreterHandle) -> RuntimeStatus {
        let mut state = self.lock();

        let (model_raw, already) = match state.interpreters.get(&interpreter.as_raw()) {
            Some(entry) => (entry.model, entry.allocated),
            None => return RuntimeStatus::Error,
        };
        if already {
            return RuntimeStatus::Ok;
        }

        let def = match state.models.get(&model_raw) {
            Some(entry) => entry.def.clone(),
            None => return RuntimeStatus::Error,
        };
        let capacity = state.models[&model_raw].arena_capacity;

        let needed = def.input_byte_len() + def.output_byte_len() + def.arena_demand;
        if needed > capacity {
            tracing::debug!(
                "reference engine: arena too small ({needed} bytes needed, {capacity} available)"
            );
            return RuntimeStatus::Error;
        }

        let input_raw = state.fresh_raw();
        state.tensors.insert(
            input_raw,
            TensorEntry {
                elem: def.input_elem,
                dims: def.input_dims.clone(),
                quant: def.input_quant,
                data: vec![0u8; def.input_byte_len()],
            },
        );

        let output_raw = state.fresh_raw();
        state.tensors.insert(
            output_raw,
            TensorEntry {
                elem: def.output_elem,
                dims: def.output_dims.clone(),
                quant: def.output_quant,
                data: vec![0u8; def.output_byte_len()],
            },
        );

        let entry = state
            .interpreters
            .get_mut(&interpreter.as_raw())
            .expect("interpreter entry vanished");
        entry.allocated = true;
        entry.input = Some(input_raw);
        entry.output = Some(output_raw);

        RuntimeStatus::Ok
    }

    fn invoke(&self, interpreter: InterpreterHandle) -> RuntimeStatus {
        let mut state = self.lock();

        let (model_raw, input_raw, output_raw) =
            match state.interpreters.get(&interpreter.as_raw()) {
                Some(entry) if entry.allocated => (
                    entry.model,
                    entry.input.expect("allocated interpreter has input"),
                    entry.output.expect("allocated interpreter has output"),
                ),
                _ => return RuntimeStatus::Error,
            };

        let def = match state.models.get(&model_raw) {
            Some(entry) => entry.def.clone(),
            None => return RuntimeStatus::Error,
        };

        let input_data = state.tensors[&input_raw].data.clone();
        let output_len = state.tensors[&output_raw].data.len();

        let new_output = match &def.op {
            RefOp::Identity => {
                if def.input_elem != def.output_elem || input_data.len() != output_len {
                    return RuntimeStatus::UnresolvedOps;
                }
                input_data
            }
            RefOp::Lookup(table) => {
                if def.input_elem != ElemType::Int8
                    || def.output_elem != ElemType::Int8
                    || input_data.len() != output_len
                {
                    return RuntimeStatus::UnresolvedOps;
                }
                input_data
                    .iter()
                    .map(|&b| table[(b as i8 as i16 + 128) as usize] as u8)
                    .collect()
            }
        };

        // The native engine rebuilds its output descriptor on every
        // pass; model that by re-keying the output tensor so stale
        // cached handles dangle observably.
        let mut entry = state
            .tensors
            .remove(&output_raw)
            .expect("output tensor vanished");
        entry.data = new_output;
        let rekeyed = state.fresh_raw();
        state.tensors.insert(rekeyed, entry);
        state
            .interpreters
            .get_mut(&interpreter.as_raw())
            .expect("interpreter entry vanished")
            .output = Some(rekeyed);

        RuntimeStatus::Ok
    }

    fn input_count(&self, interpreter: InterpreterHandle) -> usize {
        // Reference models have exactly one input and one output; the
        // handle-by-index contract still applies.
        usize::from(self.lock().interpreters.contains_key(&interpreter.as_raw()))
    }

    fn output_count(&self, interpreter: InterpreterHandle) -> usize {
        usize::from(self.lock().interpreters.contains_key(&interpreter.as_raw()))
    }

    fn input_tensor(
        &self,
        interpreter: InterpreterHandle,
        index: usize,
    ) -> Option<TensorHandle> {
        if index != 0 {
            return None;
        }
        let state = self.lock();
        let entry = state.interpreters.get(&interpreter.as_raw())?;
        entry.input.map(TensorHandle::from_raw)
    }

    fn output_tensor(
        &self,
        interpreter: InterpreterHandle,
        index: usize,
    ) -> Option<TensorHandle> {
        if index != 0 {
            return None;
        }
        let state = self.lock();
        let entry = state.interpreters.get(&interpreter.as_raw())?;
        entry.output.map(TensorHandle::from_raw)
    }

    fn tensor_elem_type(&self, tensor: TensorHandle) -> ElemType {
        self.lock().tensors[&tensor.as_raw()].elem
    }

    fn tensor_rank(&self, tensor: TensorHandle) -> usize {
        self.lock().tensors[&tensor.as_raw()].dims.len()
    }

    fn tensor_dim(&self, tensor: TensorHandle, index: usize) -> usize {
        self.lock().tensors[&tensor.as_raw()].dims[index]
    }

    fn tensor_byte_len(&self, tensor: TensorHandle) -> usize {
        self.lock().tensors[&tensor.as_raw()].data.len()
    }

    fn tensor_quantization(&self, tensor: TensorHandle) -> QuantizationParams {
        self.lock().tensors[&tensor.as_raw()].quant
    }

    fn tensor_f32(&self, tensor: TensorHandle, index: usize) -> f32 {
        let state = self.lock();
        let data = &state.tensors[&tensor.as_raw()].data;
        let base = index * 4;
        f32::from_le_bytes([data[base], data[base + 1], data[base + 2], data[base + 3]])
    }

    fn tensor_set_f32(&self, tensor: TensorHandle, index: usize, value: f32) {
        let mut state = self.lock();
        let data = &mut state
            .tensors
            .get_mut(&tensor.as_raw())
            .expect("unknown tensor handle")
            .data;
        let base = index * 4;
        data[base..base + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn tensor_i8(&self, tensor: TensorHandle, index: usize) -> i8 {
        self.lock().tensors[&tensor.as_raw()].data[index] as i8
    }

    fn tensor_set_i8(&self, tensor: TensorHandle, index: usize, value: i8) {
        self.lock()
            .tensors
            .get_mut(&tensor.as_raw())
            .expect("unknown tensor handle")
            .data[index] = value as u8;
    }

    fn set_mutable_option(&self, option: i8) -> RuntimeStatus {
        self.lock().last_option = Some(option);
        RuntimeStatus::Ok
    }
}

// ── Model builder ──────────────────────────────────────────────

/// Assembles serialized model bytes for the reference engine.
///
/// Defaults to a single-element `f32` identity model with identity
/// quantization and no extra arena demand.
///
/// # Example
/// ```
/// use micro_runtime::reference::ReferenceModelBuilder;
/// use quant_codec::ElemType;
///
/// let bytes = ReferenceModelBuilder::new()
///     .input(ElemType::Int8, &[2])
///     .output(ElemType::Int8, &[2])
///     .identity()
///     .build();
/// assert!(bytes.len() > 4);
/// ```
#[derive(Clone)]
pub struct ReferenceModelBuilder {
    input_elem: ElemType,
    output_elem: ElemType,
    input_dims: Vec<usize>,
    output_dims: Vec<usize>,
    input_quant: QuantizationParams,
    output_quant: QuantizationParams,
    arena_demand: usize,
    lookup: Option<Box<[i8; 256]>>,
}

impl ReferenceModelBuilder {
    /// Starts from the default scalar identity model.
    pub fn new() -> Self {
        Self {
            input_elem: ElemType::Float32,
            output_elem: ElemType::Float32,
            input_dims: vec![1],
            output_dims: vec![1],
            input_quant: QuantizationParams::IDENTITY,
            output_quant: QuantizationParams::IDENTITY,
            arena_demand: 0,
            lookup: None,
        }
    }

    /// Sets the input tensor's element type and dimensions.
    pub fn input(mut self, elem: ElemType, dims: &[usize]) -> Self {
        self.input_elem = elem;
        self.input_dims = dims.to_vec();
        self
    }

    /// Sets the output tensor's element type and dimensions.
    pub fn output(mut self, elem: ElemType, dims: &[usize]) -> Self {
        self.output_elem = elem;
        self.output_dims = dims.to_vec();
        self
    }

    /// Sets the input tensor's quantization parameters.
    pub fn input_quantization(mut self, quant: QuantizationParams) -> Self {
        self.input_quant = quant;
        self
    }

    /// Sets the output tensor's quantization parameters.
    pub fn output_quantization(mut self, quant: QuantizationParams) -> Self {
        self.output_quant = quant;
        self
    }

    /// Declares extra scratch bytes the engine will claim from the
    /// arena beyond the tensor buffers.
    pub fn arena_demand(mut self, bytes: usize) -> Self {
        self.arena_demand = bytes;
        self
    }

    /// Uses the identity op: output buffer = input buffer.
    pub fn identity(mut self) -> Self {
        self.lookup = None;
        self
    }

    /// Uses the lookup op: each `i8` input element is mapped through
    /// the 256-entry table, indexed by `value + 128`.
    pub fn lookup_table(mut self, table: [i8; 256]) -> Self {
        self.lookup = Some(Box::new(table));
        self
    }

    /// The smallest arena capacity this model can allocate tensors in.
    pub fn min_arena_capacity(&self) -> usize {
        let input = self.input_dims.iter().product::<usize>() * self.input_elem.size_bytes();
        let output =
            self.output_dims.iter().product::<usize>() * self.output_elem.size_bytes();
        input + output + self.arena_demand
    }

    /// Serializes the model to bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.push(FORMAT_VERSION);
        out.push(self.input_elem.code());
        out.push(self.output_elem.code());
        out.push(if self.lookup.is_some() {
            OP_LOOKUP
        } else {
            OP_IDENTITY
        });

        for dims in [&self.input_dims, &self.output_dims] {
            out.push(dims.len() as u8);
            for &d in dims.iter() {
                out.extend_from_slice(&(d as u32).to_le_bytes());
            }
        }

        for quant in [self.input_quant, self.output_quant] {
            out.extend_from_slice(&quant.scale.to_le_bytes());
            out.extend_from_slice(&quant.zero_point.to_le_bytes());
        }

        out.extend_from_slice(&(self.arena_demand as u32).to_le_bytes());

        if let Some(table) = &self.lookup {
            out.extend(table.iter().map(|&v| v as u8));
        }

        out
    }
}

impl Default for ReferenceModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
