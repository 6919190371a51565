/*
 * Copyright 2024 Luc Lenôtre
 *
 * This file is part of Maestro.
 *
 * Maestro is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * Maestro is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * Maestro. If not, see <https://www.gnu.org/licenses/>.
 */

//! A small teaching kernel's virtual-memory subsystem.
//!
//! This crate implements the per-process memory mapping manager: the `mmap`/`munmap` system
//! calls, the page-fault handler driving demand paging and copy-on-write, and the fork/exit
//! hooks that keep a process's mapping table consistent across its lifetime.
//!
//! # Features
//!
//! - `strace`: if enabled, system calls declared with `#[macros::syscall]` log their arguments
//!   and return value through the kernel logger. This is a debug feature.
//! - `test-util`: exposes [`testing`], a set of in-memory mock collaborators (frame allocator,
//!   page table, inode) used by this crate's own integration tests.
//!
//! The frame allocator, page-table walker, backing file store, and process scheduler are
//! external collaborators: this crate only ever talks to them through the [`memory::frame`],
//! [`memory::pagetable`], and [`fs`] trait interfaces.

#![no_std]

extern crate alloc;

#[macro_use]
pub mod print;
pub mod logger;
pub mod sync;

pub mod fs;
pub mod memory;
pub mod panic;
pub mod process;
pub mod syscall;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use utils::errno::{self, EResult, Errno, KernelPanic};
