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

//! Procedural macros used to declare system calls.

use proc_macro::TokenStream;

mod syscall;

/// Turns a plain function into a system call handler.
///
/// The wrapped function's parameters are marshalled out of the trap-time register file
/// (`crate::syscall::Regs`) in declaration order, and its `Result<T, Errno>` return value is
/// converted to the raw `i32` a system call hands back to user space.
///
/// ```ignore
/// #[syscall]
/// pub fn munmap(addr: usize, length: usize) -> Result<i32, Errno> {
///     do_munmap(addr, length)
/// }
/// ```
#[proc_macro_attribute]
pub fn syscall(_attr: TokenStream, input: TokenStream) -> TokenStream {
	syscall::syscall(input)
}
