//! Lock policies for sinks.
//!
//! A sink is generic over a [`ConsoleMutex`], which picks the cell type
//! guarding its state. [`ConsoleLock`] serializes access across threads,
//! [`NullLock`] skips synchronization and makes the sink `!Sync`, so the
//! compiler keeps it on one thread.

use std::{
    cell::RefCell,
    sync::{Mutex, PoisonError},
};

pub trait ConsoleMutex {
    type Guarded<T>;

    fn new<T>(value: T) -> Self::Guarded<T>;

    /// Runs `f` with exclusive access; the lock is released when `f` returns
    /// or unwinds.
    fn with<T, R>(guarded: &Self::Guarded<T>, f: impl FnOnce(&mut T) -> R) -> R;

    fn into_inner<T>(guarded: Self::Guarded<T>) -> T;
}

/// Mutex-backed policy for sinks shared between threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLock;

impl ConsoleMutex for ConsoleLock {
    type Guarded<T> = Mutex<T>;

    fn new<T>(value: T) -> Mutex<T> {
        Mutex::new(value)
    }

    fn with<T, R>(guarded: &Mutex<T>, f: impl FnOnce(&mut T) -> R) -> R {
        // A panic in a formatter leaves the state consistent: every field is
        // replaced wholesale.
        let mut state = guarded.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    fn into_inner<T>(guarded: Mutex<T>) -> T {
        guarded.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// No-op policy for single-threaded sinks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLock;

impl ConsoleMutex for NullLock {
    type Guarded<T> = RefCell<T>;

    fn new<T>(value: T) -> RefCell<T> {
        RefCell::new(value)
    }

    fn with<T, R>(guarded: &RefCell<T>, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut guarded.borrow_mut())
    }

    fn into_inner<T>(guarded: RefCell<T>) -> T {
        guarded.into_inner()
    }
}
