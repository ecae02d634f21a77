// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element types and the marshaled value union.

use crate::QuantError;
use std::fmt;

/// Enumerates the element types a tensor handled by the engine can hold.
///
/// The discriminants are the engine's raw wire codes, so conversion to
/// and from the foreign boundary is a cast plus a validity check. The
/// set is closed: codes outside it are rejected at the boundary, never
/// carried around as "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum ElemType {
    /// 32-bit IEEE 754 floating point.
    Float32 = 1,
    /// 32-bit signed integer.
    Int32 = 2,
    /// 8-bit unsigned integer.
    UInt8 = 3,
    /// 64-bit signed integer.
    Int64 = 4,
    /// Boolean, stored as one byte.
    Bool = 6,
    /// 16-bit signed integer.
    Int16 = 7,
    /// 8-bit signed integer (quantized storage).
    Int8 = 9,
}

impl ElemType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            ElemType::Float32 => 4,
            ElemType::Int32 => 4,
            ElemType::UInt8 => 1,
            ElemType::Int64 => 8,
            ElemType::Bool => 1,
            ElemType::Int16 => 2,
            ElemType::Int8 => 1,
        }
    }

    /// Returns the engine's raw wire code for this type.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decodes an element type from the engine's raw wire code.
    pub fn from_code(code: u8) -> Result<Self, QuantError> {
        match code {
            1 => Ok(ElemType::Float32),
            2 => Ok(ElemType::Int32),
            3 => Ok(ElemType::UInt8),
            4 => Ok(ElemType::Int64),
            6 => Ok(ElemType::Bool),
            7 => Ok(ElemType::Int16),
            9 => Ok(ElemType::Int8),
            code => Err(QuantError::UnknownElemCode { code }),
        }
    }

    /// Returns a human-readable label for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            ElemType::Float32 => "f32",
            ElemType::Int32 => "i32",
            ElemType::UInt8 => "u8",
            ElemType::Int64 => "i64",
            ElemType::Bool => "bool",
            ElemType::Int16 => "i16",
            ElemType::Int8 => "i8",
        }
    }
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single element value of one of the host-marshaled types.
///
/// The host surface marshals exactly two element types: `f32` tensors
/// are read and written as raw reals, `i8` tensors as quantized
/// storage values. Which variant a tensor produces is fixed by its
/// [`ElemType`] for the life of the model.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ElemValue {
    /// A raw 32-bit float element.
    F32(f32),
    /// A quantized 8-bit element.
    I8(i8),
}

impl ElemValue {
    /// Returns the element type of this value.
    pub fn elem_type(self) -> ElemType {
        match self {
            ElemValue::F32(_) => ElemType::Float32,
            ElemValue::I8(_) => ElemType::Int8,
        }
    }

    /// Returns the inner float, if this is an `F32` value.
    pub fn as_f32(self) -> Option<f32> {
        match self {
            ElemValue::F32(v) => Some(v),
            ElemValue::I8(_) => None,
        }
    }

    /// Returns the inner quantized byte, if this is an `I8` value.
    pub fn as_i8(self) -> Option<i8> {
        match self {
            ElemValue::I8(v) => Some(v),
            ElemValue::F32(_) => None,
        }
    }
}

/// Values of the same variant order by their inner numeric ordering;
/// mixed variants (which cannot occur within one tensor) and NaN floats
/// are unordered.
impl PartialOrd for ElemValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (ElemValue::F32(a), ElemValue::F32(b)) => a.partial_cmp(b),
            (ElemValue::I8(a), ElemValue::I8(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for ElemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElemValue::F32(v) => write!(f, "{v}"),
            ElemValue::I8(v) => write!(f, "{v}"),
        }
    }
}
