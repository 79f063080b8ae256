use intrusive_list::List;
use minos_hal::trap::disable_irqs_save;
use minos_sync::Spin;

use crate::scheduler;
use crate::thread::Thread;

struct SemInner {
    value: usize,
    waiters: List,
}

unsafe impl Send for SemInner {}

/// Counting semaphore with a FIFO wait set.
///
/// Whenever the value is positive, the wait set is empty; `up` always wakes
/// the longest-waiting thread first.
pub struct Semaphore {
    inner: Spin<SemInner>,
}

impl Semaphore {
    pub const fn new(value: usize) -> Self {
        Self {
            inner: Spin::new(SemInner {
                value,
                waiters: List::new(),
            }),
        }
    }

    /// Decrement the value, blocking while it is zero.
    pub fn down(&self) {
        let irq_state = disable_irqs_save();

        loop {
            let mut inner = self.inner.lock();
            if inner.value > 0 {
                inner.value -= 1;
                break;
            }

            let current = scheduler::current();
            inner
                .waiters
                .push_back(unsafe { &mut (*current.as_ptr()).link });
            drop(inner);

            scheduler::block_current();
        }

        irq_state.restore();
    }

    /// Non-blocking decrement; true iff the value was positive.
    pub fn try_down(&self) -> bool {
        let irq_state = disable_irqs_save();

        let mut inner = self.inner.lock();
        let taken = if inner.value > 0 {
            inner.value -= 1;
            true
        } else {
            false
        };
        drop(inner);

        irq_state.restore();
        taken
    }

    /// Increment the value and wake the longest waiter, if any.
    ///
    /// Safe from interrupt context: nothing here blocks or allocates.
    pub fn up(&self) {
        let irq_state = disable_irqs_save();

        let mut inner = self.inner.lock();
        let waiter = inner
            .waiters
            .pop_front()
            .map(|link| unsafe { Thread::from_link(link) });
        inner.value += 1;
        drop(inner);

        if let Some(waiter) = waiter {
            scheduler::unblock(waiter);
        }

        irq_state.restore();
    }
}
