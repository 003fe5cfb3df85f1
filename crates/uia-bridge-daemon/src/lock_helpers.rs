use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use uia_bridge_common::try_lock_or_recover;

pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_BACKOFF: Duration = Duration::from_millis(50);

fn compute_jitter(backoff_micros: u64) -> u64 {
    let thread_id = std::thread::current().id();
    let thread_hash = format!("{:?}", thread_id)
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));

    let jitter_range = backoff_micros / 4;
    if jitter_range == 0 {
        return 0;
    }

    (thread_hash ^ backoff_micros) % jitter_range
}

/// Take a session's execution lock, backing off exponentially until `timeout`.
///
/// Returns `None` if another script still holds the lock when the time is up.
/// A lock poisoned by a panicking holder is recovered.
pub fn acquire_session_lock<T>(lock: &Mutex<T>, timeout: Duration) -> Option<MutexGuard<'_, T>> {
    let start = Instant::now();
    let mut backoff = Duration::from_micros(100);

    loop {
        if let Some(guard) = try_lock_or_recover(lock) {
            return Some(guard);
        }
        if start.elapsed() >= timeout {
            return None;
        }
        let jitter = compute_jitter(backoff.as_micros() as u64);
        let sleep_duration = backoff + Duration::from_micros(jitter);
        thread::sleep(sleep_duration.min(timeout.saturating_sub(start.elapsed())));
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}
