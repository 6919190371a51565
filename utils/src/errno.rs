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

//! POSIX-style error codes.
//!
//! System calls in this kernel flatten every failure down to one of these codes before handing
//! it back to user space as `-errno`. Kernel-internal code instead works with [`EResult`], which
//! keeps the typed `Errno` around for as long as possible.

use core::fmt;

/// An error code, in the same spirit as `errno(3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
	/// Invalid argument.
	EINVAL,
	/// Out of memory.
	ENOMEM,
	/// Permission denied.
	EACCES,
	/// Operation not permitted.
	EPERM,
	/// Bad file descriptor.
	EBADF,
	/// No such file or directory.
	ENOENT,
	/// File exists.
	EEXIST,
	/// I/O error.
	EIO,
	/// No space left on device.
	ENOSPC,
	/// Function not implemented.
	ENOSYS,
	/// Device or resource busy.
	EBUSY,
	/// No such process.
	ESRCH,
}

impl Errno {
	/// Returns the raw, negative `errno` value as returned by a system call.
	pub const fn as_negated(self) -> i32 {
		-(match self {
			Self::EPERM => 1,
			Self::ENOENT => 2,
			Self::ESRCH => 3,
			Self::EIO => 5,
			Self::EBADF => 9,
			Self::EACCES => 13,
			Self::EEXIST => 17,
			Self::EINVAL => 22,
			Self::ENOSPC => 28,
			Self::ENOSYS => 38,
			Self::EBUSY => 16,
			Self::ENOMEM => 12,
		})
	}
}

impl fmt::Display for Errno {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{self:?}")
	}
}

/// Builds an [`Errno`] value from one of its bare variant names.
///
/// Matches the teacher's call-site shape: `errno!(EINVAL)` rather than
/// `Errno::EINVAL`.
#[macro_export]
macro_rules! errno {
	($variant:ident) => {
		$crate::errno::Errno::$variant
	};
}

/// The result type used pervasively across the kernel for fallible operations.
pub type EResult<T> = Result<T, Errno>;

/// A kernel-fatal condition: a logic bug that cannot be recovered from, as opposed to a
/// user-facing [`Errno`].
///
/// Distinct from `Errno` because these are never surfaced to user space; the top of the trap
/// path converts them into a kernel panic with a diagnostic (§7 of the specification).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelPanic {
	/// The frame allocator could not produce a frame while servicing a page fault.
	OutOfFrames,
	/// The page-table walker could not allocate an intermediate table while forking.
	PageTableAllocFailed,
	/// A descriptor claimed to be file-backed but its inode could not be looked up.
	InodeLookupFailed,
}

impl fmt::Display for KernelPanic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let msg = match self {
			Self::OutOfFrames => "out of physical frames while servicing a page fault",
			Self::PageTableAllocFailed => "failed to allocate a page-table page during fork",
			Self::InodeLookupFailed => "inode lookup failed for a file-backed mapping",
		};
		write!(f, "{msg}")
	}
}
