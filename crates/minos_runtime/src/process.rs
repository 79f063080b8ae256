use core::sync::atomic::{AtomicUsize, Ordering};

use minos_mm::address::PAddr;

/// A protection domain: a name, a root page table and the threads running in
/// it. Only the kernel process exists today; the accounting is kept so a
/// future user-mode process dropping to zero threads has a place to release
/// its page table from.
pub struct Process {
    name: &'static str,
    root_table: AtomicUsize,
    thread_count: AtomicUsize,
}

static KERNEL_PROCESS: Process = Process {
    name: "kernel",
    root_table: AtomicUsize::new(0),
    thread_count: AtomicUsize::new(0),
};

pub fn kernel_process() -> &'static Process {
    &KERNEL_PROCESS
}

impl Process {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count.load(Ordering::Relaxed)
    }

    pub fn root_table(&self) -> PAddr {
        PAddr::from_val(self.root_table.load(Ordering::Relaxed))
    }

    pub fn set_root_table(&self, root: PAddr) {
        self.root_table.store(root.addr(), Ordering::Relaxed);
    }

    pub(crate) fn register_thread(&self) {
        self.thread_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn deregister_thread(&self) {
        let previous = self.thread_count.fetch_sub(1, Ordering::Relaxed);
        assert!(previous > 0, "thread count underflow");
    }
}
