//! Preemptive round-robin scheduling over a FIFO ready queue.
//!
//! All queue and state manipulation runs with interrupts disabled; the
//! save/restore discipline in `minos_hal::trap` makes the critical sections
//! compose under nesting. `schedule` is entered with interrupts off and the
//! calling thread already moved out of the RUNNING state.

use core::arch::naked_asm;
use core::ptr::{NonNull, null_mut};
use core::sync::atomic::{AtomicPtr, Ordering};

use buddy_allocator::GlobalPageAlloc;
use intrusive_list::List;
use minos_hal::context::TaskContext;
use minos_hal::trap::{disable_irqs, disable_irqs_save, enable_irqs, irqs_enabled};
use minos_mm::address::PAddr;
use minos_mm::paging::PageAlloc;
use minos_sync::Spin;

use crate::clock;
use crate::process::kernel_process;
use crate::thread::{Thread, ThreadState, write_thread};

/// Quantum in timer ticks.
pub const TIME_SLICE: u32 = 10;

static CURRENT: AtomicPtr<Thread> = AtomicPtr::new(null_mut());
static IDLE: AtomicPtr<Thread> = AtomicPtr::new(null_mut());
// Handoff from `schedule` to `finish_switch`, which runs on the next
// thread's stack.
static PREVIOUS: AtomicPtr<Thread> = AtomicPtr::new(null_mut());

struct ReadyQueue {
    list: List,
}

unsafe impl Send for ReadyQueue {}

static READY_QUEUE: Spin<ReadyQueue> = Spin::new(ReadyQueue { list: List::new() });

/// The running thread. Verifies the stack canary on every call.
pub fn current() -> NonNull<Thread> {
    let thread = NonNull::new(CURRENT.load(Ordering::Relaxed)).expect("scheduler not started");
    unsafe { thread.as_ref().check_magic() };
    thread
}

fn idle_thread() -> NonNull<Thread> {
    NonNull::new(IDLE.load(Ordering::Relaxed)).expect("idle thread missing")
}

/// Adopt the running boot context as the idle thread (tid 0).
///
/// The idle thread is never enqueued; `schedule` falls back to it when the
/// ready queue is empty.
///
/// # Safety
/// `stack_base` must be the base of the live boot stack region, and this
/// must be called exactly once, before interrupts are enabled.
pub unsafe fn adopt_idle(stack_base: NonNull<u8>) {
    let thread = unsafe { write_thread(stack_base, 0, "idle", ThreadState::Running) };
    kernel_process().register_thread();

    IDLE.store(thread.as_ptr(), Ordering::Relaxed);
    CURRENT.store(thread.as_ptr(), Ordering::Relaxed);
}

fn push_ready(thread: NonNull<Thread>) {
    debug_assert!(!irqs_enabled());
    READY_QUEUE
        .lock()
        .list
        .push_back(unsafe { &mut (*thread.as_ptr()).link });
}

/// Make a NEW or BLOCKED thread ready, at the tail of the queue.
pub fn unblock(thread: NonNull<Thread>) {
    let irq_state = disable_irqs_save();

    unsafe {
        let t = thread.as_ptr();
        (*t).check_magic();
        assert!(
            matches!((*t).state, ThreadState::New | ThreadState::Blocked),
            "unblocking a thread in state {:?}",
            (*t).state
        );
        (*t).state = ThreadState::Ready;
    }
    push_ready(thread);

    irq_state.restore();
}

/// Give up the processor, rejoining the tail of the ready queue.
pub fn yield_now() {
    let irq_state = disable_irqs_save();

    let cur = current();
    unsafe { (*cur.as_ptr()).state = ThreadState::Ready };
    if cur != idle_thread() {
        push_ready(cur);
    }
    schedule();

    irq_state.restore();
}

/// Block the current thread until someone unblocks it.
///
/// Interrupts must already be disabled, and the caller must have published
/// the thread somewhere a wakeup can find it.
pub fn block_current() {
    assert!(!irqs_enabled());

    let cur = current();
    unsafe { (*cur.as_ptr()).state = ThreadState::Blocked };
    schedule();
}

/// Terminate the current thread. The page under its feet is reclaimed by
/// `finish_switch` on the next thread's stack, never its own.
pub fn exit_current(code: i32) -> ! {
    disable_irqs();

    let cur = current();
    unsafe {
        (*cur.as_ptr()).exit_code = code;
        (*cur.as_ptr()).state = ThreadState::Dead;
    }
    schedule();

    unreachable!("dead thread was scheduled again");
}

/// Timer interrupt entry: account the tick and preempt on quantum expiry.
pub fn timer_tick() {
    clock::tick();

    let cur = current();
    let quantum = unsafe {
        let t = cur.as_ptr();
        (*t).quantum = (*t).quantum.saturating_sub(1);
        (*t).quantum
    };

    if quantum == 0 {
        yield_now();
    }
}

/// Pick the next thread and switch to it.
pub(crate) fn schedule() {
    assert!(!irqs_enabled(), "schedule entered with interrupts enabled");

    let cur = current();
    unsafe {
        assert!(
            (*cur.as_ptr()).state != ThreadState::Running,
            "schedule entered from a RUNNING thread"
        );
    }

    let next = READY_QUEUE
        .lock()
        .list
        .pop_front()
        .map(|link| unsafe { Thread::from_link(link) })
        .unwrap_or_else(idle_thread);

    if next == cur {
        unsafe {
            (*cur.as_ptr()).state = ThreadState::Running;
            (*cur.as_ptr()).quantum = TIME_SLICE;
        }
        return;
    }

    CURRENT.store(next.as_ptr(), Ordering::Relaxed);
    PREVIOUS.store(cur.as_ptr(), Ordering::Relaxed);

    unsafe {
        TaskContext::switch(
            &raw mut (*cur.as_ptr()).context,
            &raw const (*next.as_ptr()).context,
        );
    }

    finish_switch();
}

/// First code on the stack of whichever thread `schedule` switched to:
/// either here (resumed threads) or via the entry trampoline (new threads).
/// Marks the thread running and reaps a DEAD predecessor.
extern "C" fn finish_switch() {
    let cur = current();
    unsafe {
        (*cur.as_ptr()).state = ThreadState::Running;
        (*cur.as_ptr()).quantum = TIME_SLICE;
    }

    let previous = PREVIOUS.swap(null_mut(), Ordering::Relaxed);
    if let Some(previous) = NonNull::new(previous) {
        if unsafe { previous.as_ref().state } == ThreadState::Dead {
            kernel_process().deregister_thread();
            unsafe { GlobalPageAlloc.free_page(PAddr::from_val(previous.as_ptr() as usize)) };
        }
    }
}

/// First instructions of a new kernel thread. The entry function and its
/// argument were parked in s0/s1 when the context was built.
#[unsafe(naked)]
unsafe extern "C" fn thread_entry() -> ! {
    naked_asm!(
        "call {finish}",
        "mv   a0, s0",
        "mv   a1, s1",
        "mv   fp, zero",
        "mv   ra, zero",
        "call {start}",
        finish = sym finish_switch,
        start = sym kthread_start,
    )
}

pub(crate) fn thread_entry_addr() -> usize {
    thread_entry as usize
}

extern "C" fn kthread_start(entry: usize, arg: usize) -> ! {
    let entry: fn(usize) = unsafe { core::mem::transmute(entry) };

    enable_irqs();
    entry(arg);
    exit_current(0)
}
