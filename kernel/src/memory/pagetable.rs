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

//! The page-table walker interface.
//!
//! Walking and mutating the actual hardware page tables is an external collaborator per the
//! specification (§1); this module declares the interface and the one software PTE bit
//! (`PTE_COW`) this subsystem claims for itself.

use super::{PhysAddr, VirtAddr};
use utils::errno::EResult;

/// The page is present.
pub const PTE_PRESENT: u32 = 1 << 0;
/// The page is writable.
pub const PTE_WRITE: u32 = 1 << 1;
/// The page is accessible from user mode.
pub const PTE_USER: u32 = 1 << 2;
/// Software-reserved bit: the page is pending copy-on-write.
///
/// Invariant I4: whenever this bit is set, [`PTE_WRITE`] must be clear.
pub const PTE_COW: u32 = 1 << 9;

/// A single page-table entry, as observed by the virtual-memory subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pte {
	/// The physical frame this entry points to.
	pub frame: PhysAddr,
	/// The entry's flag bits (a combination of [`PTE_PRESENT`], [`PTE_WRITE`], [`PTE_USER`],
	/// [`PTE_COW`]).
	pub flags: u32,
}

impl Pte {
	/// Tells whether the entry is present.
	pub const fn is_present(&self) -> bool {
		self.flags & PTE_PRESENT != 0
	}

	/// Tells whether the entry is writable.
	pub const fn is_writable(&self) -> bool {
		self.flags & PTE_WRITE != 0
	}

	/// Tells whether the entry is pending copy-on-write.
	pub const fn is_cow(&self) -> bool {
		self.flags & PTE_COW != 0
	}
}

/// A walker over one address space's page tables.
///
/// A bootable kernel backs this with the architecture's page directory; this crate's tests back
/// it with a sparse in-memory table (see [`crate::testing`]).
pub trait PageTable {
	/// Returns the entry currently installed at `va`, if any.
	fn translate(&self, va: VirtAddr) -> Option<Pte>;

	/// Installs (or overwrites) the mapping for the page containing `va`, allocating any
	/// intermediate page-table pages as needed.
	///
	/// Returns [`utils::errno::Errno::ENOMEM`] if an intermediate table could not be allocated;
	/// per §7 this is a fatal condition during fork, and a recoverable one during a first-time
	/// fault (the caller frees the frame and reports the fault as unhandled).
	fn map(&mut self, va: VirtAddr, frame: PhysAddr, flags: u32) -> EResult<()>;

	/// Removes the mapping for the page containing `va`, if any, and returns the entry that was
	/// there.
	fn unmap(&mut self, va: VirtAddr) -> Option<Pte>;

	/// Invalidates the TLB for this address space.
	///
	/// A global flush of the whole address space is acceptable (§5) and is what this interface
	/// models: there is no single-page variant.
	fn flush_tlb(&mut self);
}
