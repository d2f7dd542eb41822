use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counting allocator for allocation-budget tests.
///
/// Counting only happens between [`BudgetAlloc::arm`] and
/// [`BudgetAlloc::disarm`] so that test-harness allocations on other
/// threads before and after the measured region are ignored.
pub struct BudgetAlloc {
    armed: AtomicBool,
    live: AtomicUsize,
    peak: AtomicUsize,
    count: AtomicUsize,
}

impl BudgetAlloc {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
        }
    }

    pub fn arm(&self) {
        self.live.store(0, Ordering::SeqCst);
        self.peak.store(0, Ordering::SeqCst);
        self.count.store(0, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Run `f` armed and return its output with (allocation count, peak bytes).
    pub fn measure<T>(&self, f: impl FnOnce() -> T) -> (T, usize, usize) {
        self.arm();
        let out = f();
        self.disarm();
        (out, self.alloc_count(), self.peak_bytes())
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn alloc_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn note_alloc(&self, bytes: usize) {
        if !self.armed.load(Ordering::SeqCst) {
            return;
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(bytes, Ordering::SeqCst) + bytes;
        self.peak.fetch_max(live, Ordering::SeqCst);
    }

    fn note_free(&self, bytes: usize) {
        if !self.armed.load(Ordering::SeqCst) {
            return;
        }
        let _ = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                Some(live.saturating_sub(bytes))
            });
    }
}

unsafe impl GlobalAlloc for BudgetAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            self.note_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        self.note_free(layout.size());
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            self.note_alloc(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            self.note_free(layout.size());
            self.note_alloc(new_size);
        }
        new_ptr
    }
}
