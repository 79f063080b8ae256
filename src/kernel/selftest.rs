//! Boot-time smoke checks for the threading and synchronization core.

use minos_log::println_info;
use minos_runtime::{Mutex, Semaphore, kernel_process, kthread_create, timer_sleep};

static HANDSHAKE: Semaphore = Semaphore::new(0);
static COUNTER: Mutex<u64> = Mutex::new(0);

fn worker(rounds: usize) {
    for _ in 0..rounds {
        *COUNTER.lock() += 1;
    }
    HANDSHAKE.up();
}

pub fn run() {
    let threads_before = kernel_process().thread_count();

    let a = kthread_create("worker-a", worker, 100).expect("spawning worker-a");
    let b = kthread_create("worker-b", worker, 100).expect("spawning worker-b");
    assert!(a >= 1 && b >= 1 && a != b);

    HANDSHAKE.down();
    HANDSHAKE.down();
    assert_eq!(*COUNTER.lock(), 200);

    // The workers are reaped by the scheduling step after their exit.
    while kernel_process().thread_count() != threads_before {
        timer_sleep(1);
    }

    println_info!("thread smoke checks passed");
}
