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

//! The per-process virtual memory manager: `mmap`/`munmap`, the page-fault handler, and the
//! fork/exit hooks (§4.3-§4.7 of the specification).

pub mod mapping;
pub mod table;

pub use mapping::{
	MappingDescriptor, MAP_ANONYMOUS, MAP_FIXED, MAP_GROWSUP, MAP_PRIVATE, MAP_SHARED, PROT_READ,
	PROT_WRITE,
};
pub use table::{MappingTable, MAX_MAPPINGS};

use crate::{
	fs::{FileTable, FsTxn},
	memory::{
		frame::FrameAllocator,
		pagetable::{PageTable, Pte, PTE_COW, PTE_PRESENT, PTE_USER, PTE_WRITE},
		round_up_page, PhysAddr, VirtAddr, ARENA_HI, PAGE_SIZE,
	},
	panic::fatal,
};
use alloc::{boxed::Box, sync::Arc};
use utils::{errno, errno::EResult, KernelPanic, TryClone};

/// A process's virtual memory address space.
///
/// Ties the mapping table together with the three external collaborators it needs to actually
/// materialise pages: a frame allocator, a page-table walker, and the process's open-file table.
pub struct MemSpace {
	table: MappingTable,
	frames: Arc<dyn FrameAllocator>,
	files: Arc<dyn FileTable>,
	pt: Box<dyn PageTable>,
}

impl MemSpace {
	/// Creates an empty address space backed by the given collaborators.
	pub fn new(frames: Arc<dyn FrameAllocator>, files: Arc<dyn FileTable>, pt: Box<dyn PageTable>) -> Self {
		Self {
			table: MappingTable::new(),
			frames,
			files,
			pt,
		}
	}

	/// The number of live mappings.
	pub fn mapping_count(&self) -> usize {
		self.table.len()
	}

	/// Iterates over the live mappings, in table order.
	pub fn mappings(&self) -> impl Iterator<Item = &MappingDescriptor> {
		self.table.iter()
	}

	/// Returns the page-table entry currently installed at `va`, if any.
	pub fn translate(&self, va: VirtAddr) -> Option<Pte> {
		self.pt.translate(va)
	}

	/// Creates a new mapping (§4.3).
	///
	/// `hint` is `VirtAddr(0)` when the caller did not request a particular address. Returns the
	/// address the mapping was actually placed at.
	pub fn mmap(
		&mut self,
		hint: VirtAddr,
		length: usize,
		prot: u8,
		flags: u8,
		fd: i32,
		offset: u64,
	) -> EResult<VirtAddr> {
		if length == 0 {
			return Err(errno!(EINVAL));
		}
		if hint.0 != 0 && (!hint.in_arena() || !hint.is_aligned()) {
			return Err(errno!(EINVAL));
		}
		if flags & (MAP_SHARED | MAP_PRIVATE) == 0 {
			return Err(errno!(EINVAL));
		}
		let anonymous = flags & MAP_ANONYMOUS != 0;
		if anonymous && (fd != -1 || offset != 0) {
			return Err(errno!(EINVAL));
		}
		let fixed = flags & MAP_FIXED != 0;
		if fixed && hint.0 == 0 {
			return Err(errno!(EINVAL));
		}
		if fixed && hint.0 + round_up_page(length) > ARENA_HI {
			return Err(errno!(EINVAL));
		}
		if !anonymous {
			if fd < 0 || self.files.lookup(fd).is_none() {
				return Err(errno!(EBADF));
			}
		}

		let addr = if fixed {
			hint
		} else {
			self.table.find_free(length).ok_or(errno!(ENOMEM))?
		};

		let descriptor = MappingDescriptor {
			addr,
			length,
			original_length: length,
			flags,
			prot,
			fd: if anonymous { -1 } else { fd },
			offset: if anonymous { 0 } else { offset },
			allocated: false,
		};

		// "Last FIXED wins" (§9 decision 1): tear down, as `munmap` would, any live mapping the
		// new one overlaps before inserting it. This may free up a slot, so the capacity check
		// below must run after it: a `FIXED` mmap replacing a mapping at a full table must not be
		// rejected just because the table was at `MAX_MAPPINGS` before the eviction.
		if fixed {
			self.teardown_overlapping(&descriptor)?;
		}

		if self.table.len() >= MAX_MAPPINGS {
			return Err(errno!(EINVAL));
		}

		self.table.push(descriptor)?;
		Ok(addr)
	}

	/// Removes `[addr, addr + length)` from the address space (§4.5).
	///
	/// Only whole-mapping removals are supported: a sub-range that would split a mapping returns
	/// `EINVAL` rather than partially unmapping it.
	pub fn munmap(&mut self, addr: VirtAddr, length: usize) -> EResult<()> {
		if length == 0 || !addr.is_aligned() {
			return Err(errno!(EINVAL));
		}
		let idx = self.table.find_exact(addr, length).ok_or(errno!(EINVAL))?;
		let descriptor = *self.table.get_mut(idx).unwrap();
		if descriptor.addr != addr || round_up_page(length) < descriptor.page_count() {
			return Err(errno!(EINVAL));
		}
		self.teardown_range(&descriptor, descriptor.addr, descriptor.page_count())?;
		self.table.remove(idx);
		Ok(())
	}

	/// Handles a page fault at `va`, returning `1` if it was resolved or `-1` if it was not
	/// (§4.4).
	pub fn handle_page_fault(&mut self, va: VirtAddr) -> i32 {
		if self.resolve_cow_fault(va) {
			return 1;
		}

		let Some(idx) = self.table.find_fault_target(va) else {
			return -1;
		};
		self.try_grow_up(idx, va);

		let descriptor = *self.table.get_mut(idx).unwrap();
		if !descriptor.contains(va) {
			return -1;
		}
		self.table.get_mut(idx).unwrap().allocated = true;

		match self.fill_and_install(&descriptor, va) {
			Ok(()) => 1,
			Err(_) => -1,
		}
	}

	/// Builds the child address space for a `fork` (§4.6).
	///
	/// Private mappings are marked copy-on-write (read-only, `PTE_COW` set) in both parent and
	/// child, sharing the same frames. Shared mappings are re-mapped writable into the child,
	/// also sharing the same frames (§9 decision 2).
	pub fn fork(&mut self, child_pt: Box<dyn PageTable>) -> EResult<Self> {
		let table = self.table.try_clone()?;
		let mut child = Self {
			table,
			frames: self.frames.clone(),
			files: self.files.clone(),
			pt: child_pt,
		};

		let Self { table, pt, .. } = self;
		let mut parent_touched = false;
		for m in table.iter() {
			let mut va = m.addr;
			while va.0 < m.end().0 {
				let Some(pte) = pt.translate(va) else {
					va = va + PAGE_SIZE;
					continue;
				};
				if !pte.is_present() {
					va = va + PAGE_SIZE;
					continue;
				}

				if m.is_private() {
					let flags = (pte.flags & !PTE_WRITE) | PTE_COW;
					pt.map(va, pte.frame, flags).map_err(|_| fatal(KernelPanic::PageTableAllocFailed))?;
					parent_touched = true;
					child
						.pt
						.map(va, pte.frame, flags)
						.map_err(|_| fatal(KernelPanic::PageTableAllocFailed))?;
				} else {
					child
						.pt
						.map(va, pte.frame, pte.flags)
						.map_err(|_| fatal(KernelPanic::PageTableAllocFailed))?;
				}

				va = va + PAGE_SIZE;
			}
		}
		if parent_touched {
			pt.flush_tlb();
		}

		Ok(child)
	}

	/// Tears down every mapping at process exit (§4.7).
	///
	/// No write-back to files is performed here; per the reference, exit simply discards the
	/// mapping table.
	pub fn exit(&mut self) {
		self.table = MappingTable::new();
	}

	/// Resolves a fault on an already-present, copy-on-write page (§4.4(a)).
	fn resolve_cow_fault(&mut self, va: VirtAddr) -> bool {
		let Some(pte) = self.pt.translate(va) else {
			return false;
		};
		if !pte.is_present() || !pte.is_cow() || pte.is_writable() {
			return false;
		}

		let new_frame = self.frames.alloc().unwrap_or_else(|_| fatal(KernelPanic::OutOfFrames));
		self.frames.copy(pte.frame, new_frame);
		let flags = (pte.flags | PTE_WRITE) & !PTE_COW;
		// The entry already exists; installing a replacement for it cannot require a fresh
		// intermediate table, so this cannot realistically fail.
		let _ = self.pt.map(va.page_floor(), new_frame, flags);
		self.pt.flush_tlb();
		true
	}

	/// Attempts to grow a `MAP_GROWSUP` mapping by one page (§4.4(b1)).
	fn try_grow_up(&mut self, idx: usize, va: VirtAddr) {
		let descriptor = *self.table.get_mut(idx).unwrap();
		if !descriptor.is_growsup() || va.0 < descriptor.end().0 {
			return;
		}
		if self.can_grow(&descriptor) {
			self.table.get_mut(idx).unwrap().length += PAGE_SIZE;
		}
	}

	/// Tells whether `descriptor` has room to grow by one more page without abutting the next
	/// mapping above it (or the top of the arena).
	fn can_grow(&self, descriptor: &MappingDescriptor) -> bool {
		let grown_end = descriptor.end().0 + PAGE_SIZE;
		let bound = self
			.table
			.iter()
			.map(|m| m.addr.0)
			.filter(|&a| a > descriptor.addr.0)
			.min()
			.unwrap_or(ARENA_HI);
		// Leave at least one free page of headroom so that a later fault can grow again.
		bound >= grown_end + PAGE_SIZE
	}

	/// Materialises the faulting page of `descriptor` and installs it (§4.4(b2), (b3)).
	fn fill_and_install(&mut self, descriptor: &MappingDescriptor, va: VirtAddr) -> EResult<()> {
		let page_va = va.page_floor();
		let frame = self.frames.alloc().unwrap_or_else(|_| fatal(KernelPanic::OutOfFrames));

		if descriptor.is_anonymous() {
			self.frames.zero(frame);
		} else {
			// Zero first so a short read leaves the tail of the page zero-filled (§9 decision 4).
			self.frames.zero(frame);
			let inode = self
				.files
				.lookup(descriptor.fd)
				.unwrap_or_else(|| fatal(KernelPanic::InodeLookupFailed));
			let file_off = (page_va - descriptor.addr) as u64 + descriptor.offset;
			let mut buf = [0u8; PAGE_SIZE];
			let _txn = FsTxn::begin();
			let n = match inode.read_at(file_off, &mut buf) {
				Ok(n) => n,
				Err(e) => {
					self.frames.free(frame);
					return Err(e);
				}
			};
			self.frames.write(frame, 0, &buf[..n]);
		}

		let flags = PTE_PRESENT | PTE_WRITE | PTE_USER;
		if let Err(e) = self.pt.map(page_va, frame, flags) {
			self.frames.free(frame);
			return Err(e);
		}
		Ok(())
	}

	/// Tears down every live mapping overlapping `incoming`, as `munmap` would (§9 decision 1).
	fn teardown_overlapping(&mut self, incoming: &MappingDescriptor) -> EResult<()> {
		loop {
			let idx = self.table.iter().position(|m| m.overlaps(incoming));
			let Some(idx) = idx else { break };
			let victim = *self.table.get_mut(idx).unwrap();
			self.teardown_range(&victim, victim.addr, victim.page_count())?;
			self.table.remove(idx);
		}
		Ok(())
	}

	/// Clears every present page-table entry in `[start, start + len)`, writing back dirty
	/// shared, file-backed pages first, and frees the underlying frames.
	fn teardown_range(&mut self, descriptor: &MappingDescriptor, start: VirtAddr, len: usize) -> EResult<()> {
		let mut va = start;
		let end = start + len;
		while va.0 < end.0 {
			if let Some(pte) = self.pt.translate(va) {
				if pte.is_present() {
					if descriptor.is_shared() && !descriptor.is_anonymous() {
						self.writeback_page(descriptor, va, pte.frame)?;
					}
					self.pt.unmap(va);
					self.frames.free(pte.frame);
				}
			}
			va = va + PAGE_SIZE;
		}
		Ok(())
	}

	/// Writes a shared, file-backed page's contents back to its inode.
	fn writeback_page(&self, descriptor: &MappingDescriptor, va: VirtAddr, frame: PhysAddr) -> EResult<()> {
		let inode = self
			.files
			.lookup(descriptor.fd)
			.unwrap_or_else(|| fatal(KernelPanic::InodeLookupFailed));
		let mut buf = [0u8; PAGE_SIZE];
		self.frames.read(frame, 0, &mut buf);
		let file_off = (va - descriptor.addr) as u64 + descriptor.offset;
		let _txn = FsTxn::begin();
		let n = inode.write_at(file_off, &buf)?;
		if n != buf.len() {
			return Err(errno!(EIO));
		}
		Ok(())
	}
}
