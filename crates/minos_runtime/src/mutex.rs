use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::ptr::null_mut;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::scheduler;
use crate::semaphore::Semaphore;
use crate::thread::Thread;

/// Sleeping mutual exclusion over a binary semaphore.
///
/// The holder is tracked so releasing from a non-holder and re-acquiring
/// from the holder are both rejected; `holder` is non-null exactly while the
/// underlying semaphore sits at zero.
pub struct Mutex<T>
where
    T: ?Sized,
{
    sem: Semaphore,
    holder: AtomicPtr<Thread>,
    value: UnsafeCell<T>,
}

unsafe impl<T> Send for Mutex<T> where T: ?Sized + Send {}
unsafe impl<T> Sync for Mutex<T> where T: ?Sized + Send {}

pub struct MutexGuard<'a, T>
where
    T: ?Sized,
{
    lock: &'a Mutex<T>,
}

impl<T> Mutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            sem: Semaphore::new(1),
            holder: AtomicPtr::new(null_mut()),
            value: UnsafeCell::new(value),
        }
    }
}

impl<T> Mutex<T>
where
    T: ?Sized,
{
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let me = scheduler::current().as_ptr();
        assert!(
            self.holder.load(Ordering::Relaxed) != me,
            "recursive mutex acquisition"
        );

        self.sem.down();
        self.holder.store(me, Ordering::Relaxed);

        MutexGuard { lock: self }
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let me = scheduler::current().as_ptr();
        assert!(
            self.holder.load(Ordering::Relaxed) != me,
            "recursive mutex acquisition"
        );

        self.sem.try_down().then(|| {
            self.holder.store(me, Ordering::Relaxed);
            MutexGuard { lock: self }
        })
    }

    pub fn held_by_current(&self) -> bool {
        self.holder.load(Ordering::Relaxed) == scheduler::current().as_ptr()
    }
}

impl<T> Drop for MutexGuard<'_, T>
where
    T: ?Sized,
{
    fn drop(&mut self) {
        assert!(
            self.lock.held_by_current(),
            "mutex released by a non-holder"
        );
        self.lock.holder.store(null_mut(), Ordering::Relaxed);
        self.lock.sem.up();
    }
}

impl<T> Deref for MutexGuard<'_, T>
where
    T: ?Sized,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: The guard holds the lock.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T>
where
    T: ?Sized,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The guard holds the lock.
        unsafe { &mut *self.lock.value.get() }
    }
}
