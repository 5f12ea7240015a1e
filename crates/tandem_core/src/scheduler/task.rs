//! # Task Hand-Off
//!
//! A borrowed task closure, erased to a context pointer plus a trampoline so
//! it can sit in the scheduler's shared state without a lifetime.
//!
//! ## Safety Note
//!
//! The erased reference is only valid for one dispatch window:
//!
//! ```text
//!   entry gate full ──install──> latch armed ──slices run──> latch open ──clear
//!                    └──────────────── task alive ───────────────────┘
//! ```
//!
//! `run` keeps the closure on its own stack frame and does not return before
//! the latch opens, so every dereference happens inside that window.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;

type Trampoline = unsafe fn(*const (), usize);

/// Type-erased `&F where F: Fn(usize) + Sync`.
#[derive(Clone, Copy)]
pub(super) struct TaskRef {
    context: *const (),
    trampoline: Trampoline,
}

impl TaskRef {
    /// Erases a borrowed task. The borrow's lifetime is dropped here; the
    /// dispatch protocol re-establishes it.
    pub(super) fn new<F>(task: &F) -> Self
    where
        F: Fn(usize) + Sync,
    {
        Self {
            context: (task as *const F).cast::<()>(),
            trampoline: call_task::<F>,
        }
    }

    /// Runs the task for one worker index.
    ///
    /// # Safety
    ///
    /// The task this reference was created from must still be alive.
    #[inline]
    pub(super) unsafe fn invoke(self, worker: usize) {
        // SAFETY: upheld by the caller.
        unsafe { (self.trampoline)(self.context, worker) }
    }
}

unsafe fn call_task<F>(context: *const (), worker: usize)
where
    F: Fn(usize) + Sync,
{
    // SAFETY: `context` was created from `&F` in `TaskRef::new`.
    let task = unsafe { &*context.cast::<F>() };
    task(worker);
}

// SAFETY: the pointee is `Sync`, so sharing `&F` across threads is sound.
unsafe impl Send for TaskRef {}
// SAFETY: as above.
unsafe impl Sync for TaskRef {}

/// The slot the publisher writes the current task into.
pub(super) struct TaskHandoff {
    task: UnsafeCell<Option<TaskRef>>,
}

impl TaskHandoff {
    pub(super) const fn new() -> Self {
        Self {
            task: UnsafeCell::new(None),
        }
    }

    /// Publishes a task for the next dispatch.
    ///
    /// # Safety
    ///
    /// Only the dispatching thread may call this, after the entry gate is
    /// full and before the exit latch is armed.
    #[inline]
    pub(super) unsafe fn install(&self, task: TaskRef) {
        // SAFETY: no worker reads the cell outside an armed dispatch.
        unsafe { *self.task.get() = Some(task) };
    }

    /// Drops the reference once the dispatch is over.
    ///
    /// # Safety
    ///
    /// Only the dispatching thread may call this, after the exit latch opened.
    #[inline]
    pub(super) unsafe fn clear(&self) {
        // SAFETY: every reader counted down before the latch opened.
        unsafe { *self.task.get() = None };
    }

    /// Reads the current task.
    ///
    /// # Safety
    ///
    /// The caller must have observed the exit latch armed (acquire) and must
    /// not yet have counted down.
    #[inline]
    pub(super) unsafe fn current(&self) -> Option<TaskRef> {
        // SAFETY: the latch's release/acquire pair orders this read after
        // `install`, and `clear` waits for our count-down.
        unsafe { *self.task.get() }
    }
}

// SAFETY: access to the cell is serialized by the entry gate and exit latch.
unsafe impl Sync for TaskHandoff {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_task_ref_invokes_closure() {
        let calls = AtomicUsize::new(0);
        let task = |worker: usize| {
            calls.fetch_add(worker + 1, Ordering::Relaxed);
        };

        let erased = TaskRef::new(&task);
        unsafe {
            erased.invoke(0);
            erased.invoke(2);
        }
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_handoff_install_and_clear() {
        let handoff = TaskHandoff::new();
        let task = |_: usize| {};

        unsafe {
            assert!(handoff.current().is_none());
            handoff.install(TaskRef::new(&task));
            assert!(handoff.current().is_some());
            handoff.clear();
            assert!(handoff.current().is_none());
        }
    }
}
