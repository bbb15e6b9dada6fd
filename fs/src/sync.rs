//! Coarse locking primitive used by the free map, the open-inode table, and
//! the facade's `filesys_lock`/`filesys_extending_lock`.
//!
//! The teacher's `SpinLock`/`Mutex` busy-waits and is coupled to the CPU and
//! interrupt-enable bookkeeping of a bare-metal kernel. None of that applies
//! here: the task/thread layer is an external collaborator this crate does
//! not implement, so `SpinLock<T>` is a thin, named wrapper around
//! `std::sync::Mutex` that keeps the teacher's `new(value, name)` / `lock()`
//! call shape and poison-free guard semantics.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct SpinLock<T> {
    name: &'static str,
    inner: Mutex<T>,
}

impl<T> SpinLock<T> {
    pub const fn new(value: T, name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(value),
        }
    }

    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        SpinLockGuard {
            name: self.name,
            guard,
        }
    }
}

pub struct SpinLockGuard<'a, T> {
    name: &'static str,
    guard: MutexGuard<'a, T>,
}

impl<T> SpinLockGuard<'_, T> {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
