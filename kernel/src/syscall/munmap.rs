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

//! The `munmap` system call: removes a memory mapping from the calling process.

use crate::{memory::VirtAddr, process};
use macros::syscall;
use utils::errno::{EResult, Errno};

/// Performs the `munmap` system call for the currently running process.
pub fn do_munmap(addr: usize, length: usize) -> EResult<i32> {
	let mem_space = process::current_mem_space();
	mem_space.lock().munmap(VirtAddr(addr), length)?;
	Ok(0)
}

#[syscall]
pub fn munmap(addr: usize, length: usize) -> Result<i32, Errno> {
	do_munmap(addr, length)
}
