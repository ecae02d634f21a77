// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The fixed-capacity arena block.

use crate::{stats, ArenaError};

/// A contiguous, fixed-capacity memory block lent whole to the engine.
///
/// The block is heap-allocated once at the exact requested capacity and
/// its address never changes afterward — the engine keeps raw pointers
/// into it, so the arena must not be resized, reallocated, or dropped
/// while an engine built on it is alive. Release happens exactly once,
/// on drop.
///
/// The engine may use the block arbitrarily but must not exceed the
/// declared capacity; a conforming engine reports capacity exhaustion
/// as a failed tensor allocation rather than writing past the end.
pub struct Arena {
    block: Box<[u8]>,
}

impl Arena {
    /// Reserves a zeroed block of exactly `capacity_bytes`.
    ///
    /// Fails with [`ArenaError::OutOfMemory`] if the host allocator
    /// cannot satisfy the reservation, and [`ArenaError::ZeroCapacity`]
    /// for an empty request.
    pub fn with_capacity(capacity_bytes: usize) -> Result<Self, ArenaError> {
        if capacity_bytes == 0 {
            return Err(ArenaError::ZeroCapacity);
        }

        let mut block = Vec::new();
        block
            .try_reserve_exact(capacity_bytes)
            .map_err(|_| ArenaError::OutOfMemory {
                requested_bytes: capacity_bytes,
            })?;
        block.resize(capacity_bytes, 0u8);

        stats::record_create(capacity_bytes);
        tracing::debug!("arena reserved: {capacity_bytes} bytes");

        Ok(Self {
            block: block.into_boxed_slice(),
        })
    }

    /// Returns the capacity of the block in bytes.
    pub fn capacity(&self) -> usize {
        self.block.len()
    }

    /// Returns a read-only view of the block.
    pub fn as_slice(&self) -> &[u8] {
        &self.block
    }

    /// Returns the base address of the block.
    pub fn as_ptr(&self) -> *const u8 {
        self.block.as_ptr()
    }

    /// Returns the mutable base address of the block, for handing to
    /// the engine at interpreter construction.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.block.as_mut_ptr()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        stats::record_release(self.block.len());
        tracing::debug!("arena released: {} bytes", self.block.len());
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_capacity() {
        let arena = Arena::with_capacity(4096).unwrap();
        assert_eq!(arena.capacity(), 4096);
        assert!(arena.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            Arena::with_capacity(0),
            Err(ArenaError::ZeroCapacity)
        ));
    }

    #[test]
    fn test_absurd_capacity_is_oom_not_abort() {
        let result = Arena::with_capacity(usize::MAX);
        assert!(matches!(
            result,
            Err(ArenaError::OutOfMemory { requested_bytes }) if requested_bytes == usize::MAX
        ));
    }

    #[test]
    fn test_address_is_stable() {
        let mut arena = Arena::with_capacity(1024).unwrap();
        let before = arena.as_ptr();
        // Writes through the mutable pointer must not move the block.
        unsafe { *arena.as_mut_ptr() = 0xAB };
        assert_eq!(arena.as_ptr(), before);
        assert_eq!(arena.as_slice()[0], 0xAB);
    }

    #[test]
    fn test_debug_format() {
        let arena = Arena::with_capacity(256).unwrap();
        let debug = format!("{arena:?}");
        assert!(debug.contains("Arena"));
        assert!(debug.contains("256"));
    }
}
