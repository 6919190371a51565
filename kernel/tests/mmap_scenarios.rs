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

//! End-to-end scenarios exercising `MemSpace` against the in-memory mock collaborators (§8 of the
//! specification).

use kernel::{
	fs::Inode,
	memory::{VirtAddr, ARENA_HI, ARENA_LO, PAGE_SIZE},
	process::mem_space::{MemSpace, MAP_ANONYMOUS, MAP_FIXED, MAP_GROWSUP, MAP_PRIVATE, MAP_SHARED, PROT_READ, PROT_WRITE},
	testing::{MockFileTable, MockFrameAllocator, MockInode, MockPageTable},
};
use std::sync::Arc;

const RW: u8 = PROT_READ | PROT_WRITE;

/// Faults `va` in if it is not already resident, then returns its page-table entry.
fn ensure_resident(mem_space: &mut MemSpace, va: VirtAddr) -> kernel::memory::pagetable::Pte {
	if let Some(pte) = mem_space.translate(va) {
		if pte.is_present() {
			return pte;
		}
	}
	assert_eq!(mem_space.handle_page_fault(va), 1, "fault at {va:#x} should resolve");
	mem_space.translate(va).expect("page present after a resolved fault")
}

fn read_byte(mem_space: &mut MemSpace, frames: &MockFrameAllocator, va: VirtAddr) -> u8 {
	let pte = ensure_resident(mem_space, va);
	let mut buf = [0u8; 1];
	frames.read(pte.frame, va.0 % PAGE_SIZE, &mut buf);
	buf[0]
}

/// Writes a byte, re-faulting (as hardware would on a COW trap) if the page isn't writable yet.
fn write_byte(mem_space: &mut MemSpace, frames: &MockFrameAllocator, va: VirtAddr, value: u8) {
	let mut pte = ensure_resident(mem_space, va);
	if !pte.is_writable() {
		assert_eq!(mem_space.handle_page_fault(va), 1, "COW fault at {va:#x} should resolve");
		pte = mem_space.translate(va).unwrap();
	}
	frames.write(pte.frame, va.0 % PAGE_SIZE, &[value]);
}

fn new_space(frames: &Arc<MockFrameAllocator>, files: &Arc<MockFileTable>) -> MemSpace {
	MemSpace::new(frames.clone(), files.clone(), Box::new(MockPageTable::new()))
}

#[test]
fn lazy_anon_only_the_touched_page_is_resident() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);

	let a = ms.mmap(VirtAddr(0), 3 * PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0).unwrap();
	assert_eq!(a, VirtAddr(ARENA_LO));

	assert_eq!(read_byte(&mut ms, &frames, a + 2 * PAGE_SIZE), 0);
	assert_eq!(frames.live_count(), 1);
}

#[test]
fn file_backed_private_mapping_does_not_write_back() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let mut contents = vec![b'A'; PAGE_SIZE];
	contents.extend(vec![b'B'; PAGE_SIZE]);
	let inode = Arc::new(MockInode::new(contents));
	files.insert(3, inode.clone());
	let mut ms = new_space(&frames, &files);

	let a = ms.mmap(VirtAddr(0), 2 * PAGE_SIZE, RW, MAP_PRIVATE, 3, 0).unwrap();
	assert_eq!(read_byte(&mut ms, &frames, a), b'A');
	assert_eq!(read_byte(&mut ms, &frames, a + PAGE_SIZE), b'B');

	write_byte(&mut ms, &frames, a, b'Z');
	ms.munmap(a, 2 * PAGE_SIZE).unwrap();

	let mut buf = [0u8; 1];
	inode.read_at(0, &mut buf).unwrap();
	assert_eq!(buf[0], b'A', "a private mapping must never write back to its file");
}

#[test]
fn file_backed_shared_mapping_writes_back_on_munmap() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let inode = Arc::new(MockInode::new(vec![b'A'; PAGE_SIZE]));
	files.insert(5, inode.clone());
	let mut ms = new_space(&frames, &files);

	let a = ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_SHARED, 5, 0).unwrap();
	write_byte(&mut ms, &frames, a, b'Z');
	ms.munmap(a, PAGE_SIZE).unwrap();

	let mut buf = [0u8; 1];
	inode.read_at(0, &mut buf).unwrap();
	assert_eq!(buf[0], b'Z');
}

#[test]
fn shared_mapping_round_trips_through_the_backing_file() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let inode = Arc::new(MockInode::new(vec![0u8; PAGE_SIZE]));
	files.insert(7, inode.clone());
	let mut ms = new_space(&frames, &files);

	let a = ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_SHARED, 7, 0).unwrap();
	write_byte(&mut ms, &frames, a, 0x42);
	ms.munmap(a, PAGE_SIZE).unwrap();

	let a = ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_SHARED, 7, 0).unwrap();
	assert_eq!(read_byte(&mut ms, &frames, a), 0x42);
}

#[test]
fn fork_of_private_anonymous_mapping_is_copy_on_write() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let mut parent = new_space(&frames, &files);

	let a = parent.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0).unwrap();
	write_byte(&mut parent, &frames, a, 7);

	let mut child = parent.fork(Box::new(MockPageTable::new())).unwrap();
	assert_eq!(child.mapping_count(), parent.mapping_count());

	assert_eq!(read_byte(&mut child, &frames, a), 7);
	write_byte(&mut child, &frames, a, 9);
	assert_eq!(read_byte(&mut child, &frames, a), 9);
	assert_eq!(read_byte(&mut parent, &frames, a), 7);
}

#[test]
fn fork_of_shared_mapping_keeps_both_sides_writable_on_the_same_frame() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let mut parent = new_space(&frames, &files);

	let a = parent.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_SHARED | MAP_ANONYMOUS, -1, 0).unwrap();
	write_byte(&mut parent, &frames, a, 1);

	let mut child = parent.fork(Box::new(MockPageTable::new())).unwrap();
	write_byte(&mut child, &frames, a, 2);
	assert_eq!(read_byte(&mut parent, &frames, a), 2, "SHARED must see the same frame in both spaces");
}

#[test]
fn growsup_extends_by_one_page_per_fault() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);

	let a = ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS | MAP_GROWSUP, -1, 0).unwrap();

	assert_eq!(read_byte(&mut ms, &frames, a + PAGE_SIZE), 0);
	assert_eq!(ms.mappings().next().unwrap().length, 2 * PAGE_SIZE);

	assert_eq!(read_byte(&mut ms, &frames, a + 2 * PAGE_SIZE), 0);
	assert_eq!(ms.mappings().next().unwrap().length, 3 * PAGE_SIZE);
}

#[test]
fn growsup_is_denied_when_it_would_abut_the_next_mapping() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);

	let a = ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS | MAP_GROWSUP, -1, 0).unwrap();
	let next = a + 2 * PAGE_SIZE;
	ms.mmap(next, PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS | MAP_FIXED, -1, 0).unwrap();

	assert_eq!(ms.handle_page_fault(a + PAGE_SIZE), -1);
}

#[test]
fn fixed_placement_lands_at_the_hint_and_the_allocator_skips_it() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);

	let hint = VirtAddr(ARENA_LO);
	let a = ms.mmap(hint, PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS | MAP_FIXED, -1, 0).unwrap();
	assert_eq!(a, hint);

	let b = ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0).unwrap();
	assert_eq!(b, VirtAddr(ARENA_LO + PAGE_SIZE));
}

#[test]
fn last_fixed_wins_by_tearing_down_the_overlapping_mapping() {
	let frames = Arc::new(MockFrameAllocator::new(16));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);

	let addr = VirtAddr(ARENA_LO);
	ms.mmap(addr, PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS | MAP_FIXED, -1, 0).unwrap();
	read_byte(&mut ms, &frames, addr);
	assert_eq!(frames.live_count(), 1);

	ms.mmap(addr, PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS | MAP_FIXED, -1, 0).unwrap();
	assert_eq!(ms.mapping_count(), 1, "the second FIXED mapping must replace, not coexist with, the first");
	assert_eq!(frames.live_count(), 0, "the replaced mapping's frame must be freed");
}

#[test]
fn mmap_rejects_zero_length() {
	let frames = Arc::new(MockFrameAllocator::new(4));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);
	assert!(ms.mmap(VirtAddr(0), 0, RW, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0).is_err());
}

#[test]
fn mmap_rejects_a_hint_at_the_top_of_the_arena() {
	let frames = Arc::new(MockFrameAllocator::new(4));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);
	assert!(ms.mmap(VirtAddr(ARENA_HI), PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0).is_err());
}

#[test]
fn mmap_fills_the_table_then_the_33rd_call_fails() {
	let frames = Arc::new(MockFrameAllocator::new(64));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);
	for _ in 0..32 {
		ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0).unwrap();
	}
	assert_eq!(ms.mapping_count(), 32);
	assert!(ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0).is_err());
}

#[test]
fn fixed_mapping_can_replace_an_overlap_even_when_the_table_is_full() {
	let frames = Arc::new(MockFrameAllocator::new(64));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);

	let hint = VirtAddr(ARENA_LO);
	ms.mmap(hint, PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS | MAP_FIXED, -1, 0).unwrap();
	for _ in 0..31 {
		ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0).unwrap();
	}
	assert_eq!(ms.mapping_count(), 32);

	let replaced = ms.mmap(hint, PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS | MAP_FIXED, -1, 0);
	assert_eq!(replaced, Ok(hint), "evicting the overlap must free a slot for the FIXED mapping");
	assert_eq!(ms.mapping_count(), 32);
}

#[test]
fn mmap_then_immediate_munmap_leaks_nothing() {
	let frames = Arc::new(MockFrameAllocator::new(4));
	let files = Arc::new(MockFileTable::new());
	let mut ms = new_space(&frames, &files);

	let a = ms.mmap(VirtAddr(0), PAGE_SIZE, RW, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0).unwrap();
	ms.munmap(a, PAGE_SIZE).unwrap();
	assert_eq!(ms.mapping_count(), 0);
	assert_eq!(frames.live_count(), 0);
}
