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

//! Process-lifecycle hooks for the virtual-memory subsystem.
//!
//! The process scheduler itself -- picking which process runs next, context-switching, trap
//! frame save/restore -- is an external collaborator (§1 of the specification); this module only
//! declares the one seam the virtual-memory subsystem needs from it: a way to reach the memory
//! space of whichever process is currently executing.

pub mod mem_space;

pub use mem_space::MemSpace;

use crate::sync::spin::{IntSpin, Spin};
use alloc::sync::Arc;

/// Something that can hand back the memory space of the currently running process.
pub trait Scheduler {
	/// Returns the memory space of the process currently executing on this CPU.
	fn current_mem_space(&self) -> Arc<IntSpin<MemSpace>>;
}

static SCHEDULER: Spin<Option<Arc<dyn Scheduler>>> = Spin::new(None);

/// Installs the system-wide scheduler instance.
///
/// Called once at boot, before any `#[syscall]`-declared handler or fault vector can run.
pub fn set_scheduler(scheduler: Arc<dyn Scheduler>) {
	*SCHEDULER.lock() = Some(scheduler);
}

/// Returns the memory space of the process currently executing on this CPU.
///
/// # Panics
///
/// Panics if no scheduler has been installed yet.
pub fn current_mem_space() -> Arc<IntSpin<MemSpace>> {
	SCHEDULER
		.lock()
		.as_ref()
		.expect("no scheduler installed")
		.current_mem_space()
}
