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

//! Mutually exclusive access primitive based on a spinlock.
//!
//! A [`Spin`] protects its wrapped data from being accessed concurrently, avoiding data races.
//!
//! One particularity with kernel development is that multi-threading is not the only way to get
//! concurrency issues: an interrupt may be triggered at any moment. For this reason, spinlocks in
//! the kernel are equipped with an option allowing to disable interrupts while being locked.

use crate::sync::arch::{cli, is_interrupt_enabled, sti};
use core::{
	cell::UnsafeCell,
	fmt::{self, Formatter},
	hint,
	ops::{Deref, DerefMut},
	sync::atomic::{AtomicBool, Ordering::Acquire, Ordering::Release},
};

#[inline(always)]
fn lock(lock: &AtomicBool) {
	while lock.swap(true, Acquire) {
		hint::spin_loop();
	}
}

/// Unlocks the associated [`Spin`] when dropped.
pub struct SpinGuard<'m, T: ?Sized, const INT: bool> {
	spin: &'m Spin<T, INT>,
	/// The interrupt state before locking. Relevant only if `INT == false`.
	int_state: bool,
}

impl<T: ?Sized, const INT: bool> Deref for SpinGuard<'_, T, INT> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		unsafe { &*self.spin.data.get() }
	}
}

impl<T: ?Sized, const INT: bool> DerefMut for SpinGuard<'_, T, INT> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		unsafe { &mut *self.spin.data.get() }
	}
}

impl<T: ?Sized, const INT: bool> Drop for SpinGuard<'_, T, INT> {
	fn drop(&mut self) {
		unsafe {
			self.spin.unlock(self.int_state);
		}
	}
}

/// Wraps a value which can be accessed by only one context at a time.
///
/// The `INT` generic parameter tells whether interrupts stay enabled while the lock is held.
/// When `INT = false`, interrupts are masked for the duration of the critical section, matching
/// the discipline the specification requires for the kernel logger (§4.9).
pub struct Spin<T: ?Sized, const INT: bool = true> {
	spin: AtomicBool,
	data: UnsafeCell<T>,
}

impl<T, const INT: bool> Spin<T, INT> {
	/// Creates a new instance wrapping `data`.
	pub const fn new(data: T) -> Self {
		Self {
			spin: AtomicBool::new(false),
			data: UnsafeCell::new(data),
		}
	}
}

impl<T: ?Sized, const INT: bool> Spin<T, INT> {
	/// Acquires the spinlock.
	///
	/// If already acquired, the caller spins until it becomes available. Returns a
	/// [`SpinGuard`]; the lock is released when the guard is dropped.
	pub fn lock(&self) -> SpinGuard<T, INT> {
		let int_state = if !INT {
			let enabled = is_interrupt_enabled();
			cli();
			enabled
		} else {
			false
		};
		lock(&self.spin);
		SpinGuard {
			spin: self,
			int_state,
		}
	}

	/// Releases the spinlock. Called automatically when a [`SpinGuard`] is dropped.
	///
	/// # Safety
	///
	/// The caller must hold the lock.
	unsafe fn unlock(&self, int_state: bool) {
		self.spin.store(false, Release);
		if !INT && int_state {
			sti();
		}
	}
}

unsafe impl<T: ?Sized, const INT: bool> Sync for Spin<T, INT> {}

impl<T: ?Sized + fmt::Debug, const INT: bool> fmt::Debug for Spin<T, INT> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let guard = self.lock();
		fmt::Debug::fmt(&*guard, f)
	}
}

/// A spinlock which masks interrupts while held.
pub type IntSpin<T> = Spin<T, false>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn basic_lock_unlock() {
		let spin = Spin::<_, true>::new(0);
		*spin.lock() += 1;
		assert_eq!(*spin.lock(), 1);
	}

	#[test]
	fn int_spin_restores_interrupt_state() {
		sti();
		let spin = IntSpin::new(0);
		{
			let _guard = spin.lock();
			assert!(!is_interrupt_enabled());
		}
		assert!(is_interrupt_enabled());
	}
}
