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

//! Synchronization primitives.

pub mod spin;

/// Interrupt control, as seen from a single CPU.
///
/// Stands in for the real architecture layer (out of scope per the specification, §1): a
/// bootable build would back this with `cli`/`sti`-equivalent instructions. This portable
/// implementation tracks enabled/disabled state so [`spin::IntSpin`] behaves correctly on the
/// host target used for this crate's tests.
pub mod arch {
	use core::sync::atomic::{AtomicBool, Ordering};

	static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);

	/// Disables interrupts for the current CPU, returning the previous state.
	pub fn cli() -> bool {
		INTERRUPTS_ENABLED.swap(false, Ordering::AcqRel)
	}

	/// Enables interrupts for the current CPU.
	pub fn sti() {
		INTERRUPTS_ENABLED.store(true, Ordering::Release);
	}

	/// Tells whether interrupts are currently enabled on the current CPU.
	pub fn is_interrupt_enabled() -> bool {
		INTERRUPTS_ENABLED.load(Ordering::Acquire)
	}
}
