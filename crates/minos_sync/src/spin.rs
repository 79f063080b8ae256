use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// A spinlock using busy-waiting to acquire the lock.
///
/// Suitable for short critical sections only. Callers that can be interrupted
/// while holding the lock must disable interrupts around the acquisition (see
/// the `SpinIrq` extension in the HAL), or a handler spinning on the same lock
/// will never make progress.
#[derive(Debug, Default)]
pub struct Spin<T>
where
    T: ?Sized,
{
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

pub struct SpinGuard<'a, T>
where
    T: ?Sized,
{
    lock: &'a Spin<T>,
    value: &'a mut T,
}

impl<T> Spin<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }
}

impl<T> Spin<T>
where
    T: ?Sized,
{
    pub fn lock(&self) -> SpinGuard<'_, T> {
        self.do_lock();

        SpinGuard {
            lock: self,
            value: unsafe {
                // SAFETY: We are holding the lock, so we can safely access the value.
                &mut *self.value.get()
            },
        }
    }

    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;

        Some(SpinGuard {
            lock: self,
            value: unsafe {
                // SAFETY: We are holding the lock, so we can safely access the value.
                &mut *self.value.get()
            },
        })
    }

    pub fn get_mut(&mut self) -> &mut T {
        // SAFETY: The exclusive access to the lock is guaranteed by the borrow checker.
        unsafe { &mut *self.value.get() }
    }

    fn do_lock(&self) {
        while let Err(_) =
            self.locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
        {
            spin_loop();
        }
    }

    /// # Safety
    /// The caller MUST ensure that the protected value is no longer accessed
    /// after calling this function.
    unsafe fn do_unlock(&self) {
        let locked = self.locked.swap(false, Ordering::Release);
        debug_assert!(locked, "Spin::unlock(): unlocking an unlocked lock");
    }
}

// SAFETY: As long as the value protected by the lock is able to be shared between threads,
//         we can send the lock between threads.
unsafe impl<T> Send for Spin<T> where T: ?Sized + Send {}

// SAFETY: As long as the value protected by the lock is able to be shared between threads,
//         we can provide exclusive access guarantees to the lock.
unsafe impl<T> Sync for Spin<T> where T: ?Sized + Send {}

impl<T> Drop for SpinGuard<'_, T>
where
    T: ?Sized,
{
    fn drop(&mut self) {
        unsafe {
            // SAFETY: We are dropping the guard, so we are not holding the lock anymore.
            self.lock.do_unlock();
        }
    }
}

impl<T> Deref for SpinGuard<'_, T>
where
    T: ?Sized,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value
    }
}

impl<T> DerefMut for SpinGuard<'_, T>
where
    T: ?Sized,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_and_mutate() {
        let lock = Spin::new(41);
        {
            let mut guard = lock.lock();
            *guard += 1;
        }
        assert_eq!(*lock.lock(), 42);
    }

    #[test]
    fn try_lock_contended() {
        let lock = Spin::new(0);
        let guard = lock.lock();
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }
}
