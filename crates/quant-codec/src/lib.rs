// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # quant-codec
//!
//! Element types and the affine quantization codec shared by the micro
//! inference runtime.
//!
//! # Key Components
//!
//! - [`ElemType`] — the closed enumeration of tensor element types the
//!   engine understands, carrying the engine's raw wire codes.
//! - [`ElemValue`] — a tagged union over the two element types the host
//!   actually marshals (`f32` and `i8`), dispatched once at model load
//!   rather than checked per access.
//! - [`QuantizationParams`] — the `(scale, zero_point)` pair defining
//!   the affine mapping between real values and quantized storage.
//! - [`quantize`] / [`dequantize`] — the pure conversion functions.
//!
//! # Quantization
//!
//! The affine mapping is
//!
//! ```text
//! real      = (quantized - zero_point) * scale
//! quantized = round(real / scale) + zero_point
//! ```
//!
//! Both directions are total: there is no failure mode, only loss of
//! precision bounded by one quantization step.
//!
//! # Example
//! ```
//! use quant_codec::{quantize, dequantize, QuantizationParams};
//!
//! let p = QuantizationParams { scale: 0.5, zero_point: 10 };
//! let q = quantize(3.0, p);
//! assert_eq!(q, 16);
//! assert_eq!(dequantize(q, p), 3.0);
//! ```

mod elem;
mod error;
mod quantize;

pub use elem::{ElemType, ElemValue};
pub use error::QuantError;
pub use quantize::{dequantize, quantize, QuantizationParams};
