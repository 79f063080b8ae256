use core::ptr::NonNull;

use intrusive_list::{Link, List, container_of};

/// Bookkeeping living in the first bytes of every free block.
#[repr(C)]
pub(crate) struct FreeBlock {
    pub(crate) order: u32,
    pub(crate) link: Link,
}

/// Free blocks of a single order.
pub(crate) struct FreeArea {
    free_list: List,
}

unsafe impl Send for FreeArea {}

impl FreeArea {
    pub(crate) const fn new() -> Self {
        Self {
            free_list: List::new(),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.free_list.count()
    }

    pub(crate) fn pop(&mut self) -> Option<NonNull<FreeBlock>> {
        self.free_list
            .pop_front()
            .map(|link| unsafe { container_of!(link, FreeBlock, link) })
    }

    /// # Safety
    /// `block` must point to an unused region large enough for the block's
    /// order and must stay untouched while it sits in the free list.
    pub(crate) unsafe fn push(&mut self, block: NonNull<FreeBlock>, order: u32) {
        unsafe {
            let block = &mut *block.as_ptr();
            block.order = order;
            block.link = Link::new();
            self.free_list.push_back(&mut block.link);
        }
    }

    /// # Safety
    /// `block` must be a member of this free area.
    pub(crate) unsafe fn remove(&mut self, block: NonNull<FreeBlock>) {
        unsafe { self.free_list.remove(&mut (*block.as_ptr()).link) };
    }
}
