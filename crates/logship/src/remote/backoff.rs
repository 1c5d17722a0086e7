//! Jittered exponential backoff for delivery retries.

use std::time::Duration;

use rand::Rng;

/// Base delay doubled on every failed attempt.
pub const DEFAULT_BASE: Duration = Duration::from_millis(500);

/// Upper bound on the computed delay.
pub const DEFAULT_CAP: Duration = Duration::from_millis(30_000);

// Uniform jitter added before capping, to spread retries from loggers that
// started failing at the same instant.
const JITTER_MS: u64 = 100;

/// Computes `min(cap, base * 2^attempt + jitter)` with jitter uniform in
/// `[0, 100)` milliseconds.
///
/// `attempt` is the caller's running fail count, which is never reset on a
/// successful delivery, so the delay ratchets up over the life of the
/// process until it hits the cap. Saturating arithmetic keeps large attempt
/// counts pinned at the cap instead of overflowing.
#[must_use]
pub fn retry_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let cap_ms = u64::try_from(cap.as_millis()).unwrap_or(u64::MAX);

    let exponential = base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    let jitter = rand::thread_rng().gen_range(0..JITTER_MS);

    Duration::from_millis(exponential.saturating_add(jitter).min(cap_ms))
}
