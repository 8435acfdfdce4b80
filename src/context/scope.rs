//! Entry points that open a new logical unit
//!
//! Two kinds of unit can be opened explicitly:
//! - a *scope*, carried by a tokio task-local, which follows a future
//!   across await points and worker threads;
//! - a *fiber*, a synchronous cooperative unit tracked on a thread-local
//!   stack, innermost first.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);
static NEXT_FIBER: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static SCOPE_ID: u64;
}

thread_local! {
    static FIBERS: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn next_scope_id() -> u64 {
    NEXT_SCOPE.fetch_add(1, Ordering::Relaxed)
}

/// Run `fut` as a new logical scope.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    scope_with_id(next_scope_id(), fut).await
}

pub(crate) async fn scope_with_id<F: Future>(id: u64, fut: F) -> F::Output {
    tracing::trace!(scope = id, "entering scope");
    SCOPE_ID.scope(id, fut).await
}

/// Run `f` synchronously as a new logical scope.
pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
    sync_scope_with_id(next_scope_id(), f)
}

pub(crate) fn sync_scope_with_id<R>(id: u64, f: impl FnOnce() -> R) -> R {
    SCOPE_ID.sync_scope(id, f)
}

/// Id of the innermost active scope, if any.
pub fn current_scope() -> Option<u64> {
    SCOPE_ID.try_with(|id| *id).ok()
}

/// Marks the current thread as running a fiber until dropped.
///
/// Guards must be dropped in reverse order of creation; the guard is
/// neither `Send` nor `Sync` so it cannot leave its thread.
#[must_use = "the fiber ends when the guard is dropped"]
pub struct FiberGuard {
    id: u64,
    _not_send: PhantomData<*const ()>,
}

impl FiberGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for FiberGuard {
    fn drop(&mut self) {
        let id = self.id;
        // try_with: the thread-local may already be gone during thread teardown.
        let _ = FIBERS.try_with(|fibers| {
            let mut fibers = fibers.borrow_mut();
            if let Some(pos) = fibers.iter().rposition(|f| *f == id) {
                fibers.remove(pos);
            }
        });
    }
}

pub fn enter_fiber() -> FiberGuard {
    let id = NEXT_FIBER.fetch_add(1, Ordering::Relaxed);
    FIBERS.with(|fibers| fibers.borrow_mut().push(id));
    FiberGuard {
        id,
        _not_send: PhantomData,
    }
}

/// Run `f` inside a new fiber.
pub fn run_fiber<R>(f: impl FnOnce() -> R) -> R {
    let _guard = enter_fiber();
    f()
}

/// Id of the innermost fiber running on this thread.
pub fn current_fiber() -> Option<u64> {
    FIBERS
        .try_with(|fibers| fibers.borrow().last().copied())
        .ok()
        .flatten()
}
