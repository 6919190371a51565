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

//! The `mmap` system call: creates a new memory mapping in the calling process.

use crate::{memory::VirtAddr, process};
use macros::syscall;
use utils::errno::{EResult, Errno};

/// Performs the `mmap` system call for the currently running process.
pub fn do_mmap(hint: usize, length: usize, prot: u8, flags: u8, fd: i32, offset: u64) -> EResult<i32> {
	let mem_space = process::current_mem_space();
	let addr = mem_space.lock().mmap(VirtAddr(hint), length, prot, flags, fd, offset)?;
	Ok(addr.0 as i32)
}

#[syscall]
pub fn mmap(hint: usize, length: usize, prot: u8, flags: u8, fd: i32, offset: u64) -> Result<i32, Errno> {
	do_mmap(hint, length, prot, flags, fd, offset)
}
