use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::TryLockError;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

static POISON_RECOVERY_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn poison_recovery_count() -> u64 {
    POISON_RECOVERY_COUNT.load(Ordering::Relaxed)
}

fn record_poison_recovery() {
    POISON_RECOVERY_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn mutex_lock_or_recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        record_poison_recovery();
        error!(
            "Mutex poisoned - a thread panicked while holding this lock. \
             Data may be inconsistent. Attempting recovery."
        );
        poisoned.into_inner()
    })
}

/// Non-blocking variant of [`mutex_lock_or_recover`]. Returns `None` only
/// when another thread holds the lock.
pub fn try_lock_or_recover<T>(lock: &Mutex<T>) -> Option<MutexGuard<'_, T>> {
    match lock.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::WouldBlock) => None,
        Err(TryLockError::Poisoned(poisoned)) => {
            record_poison_recovery();
            error!(
                "Mutex poisoned - a thread panicked while holding this lock. \
                 Data may be inconsistent. Attempting recovery."
            );
            Some(poisoned.into_inner())
        }
    }
}
