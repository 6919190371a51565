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

//! Small, dependency-free support library shared by the kernel and its modules.
//!
//! This mirrors the role of the real kernel's `utils` crate: it has no dependency on `std` and
//! provides the handful of primitives (error codes, a fallible-clone trait) that the rest of the
//! workspace builds on.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod errno;

pub use errno::KernelPanic;

/// A type whose clones may fail, because cloning may need to allocate.
///
/// Used in place of [`Clone`] wherever the teacher would reach for a fallible clone (e.g.
/// duplicating a mapping table on `fork`), so that an allocation failure surfaces as an
/// [`errno::EResult`] instead of aborting.
pub trait TryClone: Sized {
	/// Clones `self`. Fails only if backing storage could not be allocated.
	fn try_clone(&self) -> errno::EResult<Self>;
}
