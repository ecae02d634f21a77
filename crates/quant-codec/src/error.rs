// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for element-type handling.

/// Errors that can occur when decoding element types from the engine's
/// wire representation.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    /// The raw type code is not part of the closed element-type set.
    #[error("unknown element type code {code}")]
    UnknownElemCode { code: u8 },
}
