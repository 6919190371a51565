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

//! Kernel logging.
//!
//! If the logger is set as silent, logs do not reach the console, but are kept in memory
//! regardless, as a ring buffer.

use crate::sync::spin::IntSpin;
use core::{
	cmp::{min, Ordering},
	fmt,
	fmt::Write,
};

/// The size of the kernel logs buffer in bytes.
const LOGS_SIZE: usize = 16384;

/// The kernel's logger.
pub static LOGGER: IntSpin<Logger> = IntSpin::new(Logger::new());

/// Kernel logger, used to print/store kernel logs.
///
/// Internally, the logger uses a ring buffer for storage.
pub struct Logger {
	/// Tells whether the logger is silent.
	pub silent: bool,

	/// The buffer storing the kernel logs.
	buf: [u8; LOGS_SIZE],
	/// The buffer's reading head.
	read_head: usize,
	/// The buffer's writing head.
	write_head: usize,
	/// Whether the buffer has wrapped at least once.
	full: bool,
}

impl Logger {
	/// Creates a new instance.
	#[allow(clippy::new_without_default)]
	pub const fn new() -> Self {
		Self {
			silent: false,

			buf: [0; LOGS_SIZE],
			read_head: 0,
			write_head: 0,
			full: false,
		}
	}

	/// Returns the number of bytes currently stored in the buffer.
	fn len(&self) -> usize {
		match self.write_head.cmp(&self.read_head) {
			_ if self.full => self.buf.len(),
			Ordering::Equal => 0,
			Ordering::Greater => self.write_head - self.read_head,
			Ordering::Less => self.buf.len() - (self.read_head - self.write_head),
		}
	}

	/// Returns the logs currently stored in the buffer, oldest first, copied into `out`.
	///
	/// Returns the number of bytes written into `out`.
	pub fn read(&self, out: &mut [u8]) -> usize {
		let len = min(self.len(), out.len());
		for (i, byte) in out.iter_mut().enumerate().take(len) {
			*byte = self.buf[(self.read_head + i) % self.buf.len()];
		}
		len
	}

	/// Pushes the given string onto the kernel logs buffer.
	fn push(&mut self, s: &str) {
		for &byte in s.as_bytes() {
			self.buf[self.write_head] = byte;
			self.write_head = (self.write_head + 1) % self.buf.len();
			if self.write_head == self.read_head {
				self.full = true;
				self.read_head = (self.read_head + 1) % self.buf.len();
			}
		}
		if !s.is_empty() {
			self.full = self.full || self.len() == self.buf.len();
		}
	}
}

impl Write for Logger {
	fn write_str(&mut self, s: &str) -> fmt::Result {
		self.push(s);
		Ok(())
	}
}
