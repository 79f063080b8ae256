//! IRQ-safe locking for `minos_sync::Spin`.

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use minos_sync::{Spin, SpinGuard};

use crate::trap::{IrqState, disable_irqs_save};

pub struct SpinIrqGuard<'a, T>
where
    T: ?Sized,
{
    guard: ManuallyDrop<SpinGuard<'a, T>>,
    irq_state: IrqState,
}

pub trait SpinIrq {
    type Value: ?Sized;

    /// Disable interrupts, then take the lock. The saved interrupt state is
    /// restored only after the lock is released, so a handler can never spin
    /// on a lock its own hart is holding.
    fn lock_irq(&self) -> SpinIrqGuard<'_, Self::Value>;
}

impl<T> SpinIrq for Spin<T>
where
    T: ?Sized,
{
    type Value = T;

    fn lock_irq(&self) -> SpinIrqGuard<'_, T> {
        let irq_state = disable_irqs_save();

        SpinIrqGuard {
            guard: ManuallyDrop::new(self.lock()),
            irq_state,
        }
    }
}

impl<T> Drop for SpinIrqGuard<'_, T>
where
    T: ?Sized,
{
    fn drop(&mut self) {
        unsafe {
            // SAFETY: The guard is never touched again after this point.
            ManuallyDrop::drop(&mut self.guard);
        }
        self.irq_state.restore();
    }
}

impl<T> Deref for SpinIrqGuard<'_, T>
where
    T: ?Sized,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for SpinIrqGuard<'_, T>
where
    T: ?Sized,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
