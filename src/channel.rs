//! Guarded storage for state shared between interrupt handlers and foreground code.
//!
//! Every access runs inside a critical section, so a value wider than the machine word can
//! never be observed half written. Keep the closures short: the edge interrupt is held off
//! for as long as they run.

use core::cell::RefCell;

use critical_section::{CriticalSection, Mutex};

pub struct AtomicChannel<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> AtomicChannel<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Runs `f` on the guarded value inside its own critical section.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| self.lock_in(cs, f))
    }

    /// Same as [`lock`](Self::lock) but reuses a critical section the caller already holds,
    /// so several channels can be read or written as one indivisible step.
    pub fn lock_in<R>(&self, cs: CriticalSection<'_>, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_ref_mut(cs))
    }
}

impl<T: Copy> AtomicChannel<T> {
    pub fn read(&self) -> T {
        critical_section::with(|cs| self.read_in(cs))
    }

    pub fn read_in(&self, cs: CriticalSection<'_>) -> T {
        *self.inner.borrow_ref(cs)
    }

    pub fn write(&self, value: T) {
        critical_section::with(|cs| *self.inner.borrow_ref_mut(cs) = value)
    }

    pub fn replace(&self, value: T) -> T {
        critical_section::with(|cs| self.inner.replace(cs, value))
    }
}

impl<T: Default> Default for AtomicChannel<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
