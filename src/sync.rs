pub use std::sync::atomic::Ordering;

pub type AtomicUsize = std::sync::atomic::AtomicUsize;

/// Very similar to `lock_api::RawMutex`, but without the const constructor
/// constraint
pub trait RawLock {
    fn new() -> Self;
    fn acquire(&self);
    fn try_acquire(&self) -> bool;
    fn release(&self);
    fn is_locked(&self) -> bool;
}

// Lock has two implementations: one for miri and shuttle,
// and one for normal
#[cfg(all(not(miri), not(feature = "shuttle")))]
pub type Lock = WrappedUsyncMutex;
#[cfg(any(miri, feature = "shuttle"))]
pub type Lock = BasicSpinLock;

use usync::lock_api::RawMutex as UsyncRawMutex;
pub struct WrappedUsyncMutex {
    inner: usync::RawMutex,
}
impl RawLock for WrappedUsyncMutex {
    fn new() -> Self {
        Self {
            inner: UsyncRawMutex::INIT,
        }
    }
    fn acquire(&self) {
        self.inner.lock();
    }
    fn try_acquire(&self) -> bool {
        self.inner.try_lock()
    }
    fn release(&self) {
        unsafe { self.inner.unlock() };
    }
    fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

#[cfg(feature = "shuttle")]
type SpinLockAtomicU64 = shuttle::sync::atomic::AtomicU64;
#[cfg(all(miri, not(feature = "shuttle")))]
type SpinLockAtomicU64 = std::sync::atomic::AtomicU64;

#[cfg(any(feature = "shuttle", miri))]
pub struct BasicSpinLock {
    lock: SpinLockAtomicU64,
}

#[cfg(any(feature = "shuttle", miri))]
/// A `RawLock` implementation for shuttle and miri. We don't care about
/// performance, just simplicity and correctness.
impl RawLock for BasicSpinLock {
    fn new() -> Self {
        Self {
            lock: SpinLockAtomicU64::new(0),
        }
    }

    fn acquire(&self) {
        loop {
            match self
                .lock
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(_) => {
                    std::hint::spin_loop();
                    #[cfg(feature = "shuttle")]
                    shuttle::hint::spin_loop();
                    continue;
                }
            }
        }
    }

    fn try_acquire(&self) -> bool {
        self.lock
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        let res = self
            .lock
            .compare_exchange(1, 0, Ordering::Release, Ordering::Relaxed);
        assert!(
            res.is_ok(),
            "release called on an unheld latch - value was {}",
            res.unwrap_err()
        );
    }

    fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Acquire) != 0
    }
}
