// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine operation outcome codes.

use std::fmt;

/// The outcome of an engine operation.
///
/// A closed enumeration mirroring the engine's native status codes; the
/// discriminants are the raw wire values. The engine reports exactly
/// one of these for every allocate/invoke/option call, and the
/// [`Engine`](crate::Engine) retains the status of its most recent
/// operation as observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum RuntimeStatus {
    /// Successful execution.
    Ok = 0,
    /// General failure in the engine.
    Error = 1,
    /// Failure reported by a delegate itself.
    DelegateError = 2,
    /// Incompatibility between the engine and a delegate.
    ApplicationError = 3,
    /// Serialized delegate data was not found.
    DelegateDataNotFound = 4,
    /// Failure writing serialized delegate data.
    DelegateDataWriteError = 5,
    /// Failure reading serialized delegate data.
    DelegateDataReadError = 6,
    /// The model contains operations the engine cannot resolve.
    UnresolvedOps = 7,
}

impl RuntimeStatus {
    /// Returns `true` for [`RuntimeStatus::Ok`].
    pub fn is_ok(self) -> bool {
        matches!(self, RuntimeStatus::Ok)
    }

    /// Returns the engine's raw wire code for this status.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a status from the engine's raw wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RuntimeStatus::Ok),
            1 => Some(RuntimeStatus::Error),
            2 => Some(RuntimeStatus::DelegateError),
            3 => Some(RuntimeStatus::ApplicationError),
            4 => Some(RuntimeStatus::DelegateDataNotFound),
            5 => Some(RuntimeStatus::DelegateDataWriteError),
            6 => Some(RuntimeStatus::DelegateDataReadError),
            7 => Some(RuntimeStatus::UnresolvedOps),
            _ => None,
        }
    }

    /// Returns a human-readable label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeStatus::Ok => "ok",
            RuntimeStatus::Error => "error",
            RuntimeStatus::DelegateError => "delegate error",
            RuntimeStatus::ApplicationError => "application error",
            RuntimeStatus::DelegateDataNotFound => "delegate data not found",
            RuntimeStatus::DelegateDataWriteError => "delegate data write error",
            RuntimeStatus::DelegateDataReadError => "delegate data read error",
            RuntimeStatus::UnresolvedOps => "unresolved ops",
        }
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
