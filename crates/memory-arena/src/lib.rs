// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-arena
//!
//! A fixed-capacity memory arena for a microcontroller-class inference
//! engine. The host allocates one contiguous block up front and lends
//! the whole block to the engine for all of its working allocations
//! during the lifetime of one loaded model.
//!
//! # Key Components
//!
//! - [`Arena`] — the block: exact requested capacity, zeroed, never
//!   grown or reallocated, released exactly once when dropped.
//! - [`ArenaStats`] — process-wide accounting (live blocks, live bytes,
//!   peak) so tests can prove that failed constructions leak nothing.
//!
//! # Ownership Model
//!
//! ```text
//! Arena::with_capacity(bytes)
//!       │
//!       ▼
//!    Arena  ──── as_mut_ptr() ───►  engine (borrows, never owns)
//!       │
//!       │  drop()
//!       ▼
//!    block returned to the host allocator, exactly once
//! ```
//!
//! There is no `release()` method to call twice: release is tied to
//! ownership, so double-free and use-after-release are unreachable by
//! construction. The engine that borrows the block must be torn down
//! before the arena is dropped — the runtime crate enforces that
//! ordering.
//!
//! # Example
//! ```
//! use memory_arena::Arena;
//!
//! let arena = Arena::with_capacity(64 * 1024).unwrap();
//! assert_eq!(arena.capacity(), 64 * 1024);
//! assert!(arena.as_slice().iter().all(|&b| b == 0));
//! ```

mod arena;
mod error;
mod stats;

pub use arena::Arena;
pub use error::ArenaError;
pub use stats::ArenaStats;
