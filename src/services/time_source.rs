//! Time source abstraction for testability.
//!
//! Debounce deadlines, snapshot timestamps, TTL expiry and smooth-scroll gating
//! all read the clock through `TimeSource`, so production code uses real system
//! time while tests drive a logical clock forward without sleeping.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Abstraction over time-related operations.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Get the current instant for measuring elapsed time.
    fn now(&self) -> Instant;

    /// Wall-clock time in milliseconds since the Unix epoch.
    ///
    /// Used for `updatedAt` stamps and TTL checks on persisted snapshots.
    fn now_millis(&self) -> i64;

    /// Sleep for the specified duration.
    ///
    /// In tests, this advances logical time instead of blocking.
    fn sleep(&self, duration: Duration);

    /// Calculate elapsed time since an earlier instant.
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// Type alias for shared time source.
pub type SharedTimeSource = Arc<dyn TimeSource>;

/// Production implementation using actual system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeSource;

impl RealTimeSource {
    pub fn new() -> Self {
        Self
    }

    /// Create a shared RealTimeSource.
    pub fn shared() -> SharedTimeSource {
        Arc::new(Self)
    }
}

impl TimeSource for RealTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Test implementation with controllable time.
///
/// - `now()` and `now_millis()` both move only when logical time is advanced
/// - `sleep()` advances logical time (no actual sleeping)
/// - Time can be advanced manually via `advance()`
///
/// # Example
///
/// ```
/// use compiler_session::services::time_source::{TimeSource, TestTimeSource};
/// use std::time::Duration;
///
/// let time = TestTimeSource::new();
/// let start = time.now();
/// let wall = time.now_millis();
///
/// time.sleep(Duration::from_millis(2600));
///
/// assert!(time.elapsed_since(start) >= Duration::from_millis(2600));
/// assert_eq!(time.now_millis() - wall, 2600);
/// ```
#[derive(Debug)]
pub struct TestTimeSource {
    /// Logical time in nanoseconds since creation.
    logical_nanos: AtomicU64,
    /// Base instant (real time at creation, used for Instant arithmetic).
    base_instant: Instant,
    /// Wall-clock millis corresponding to logical time zero.
    base_millis: i64,
}

impl Default for TestTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTimeSource {
    /// Create a new TestTimeSource with logical time starting at zero.
    pub fn new() -> Self {
        Self::starting_at_millis(Utc::now().timestamp_millis())
    }

    /// Create a TestTimeSource whose wall clock starts at the given epoch millis.
    pub fn starting_at_millis(base_millis: i64) -> Self {
        Self {
            logical_nanos: AtomicU64::new(0),
            base_instant: Instant::now(),
            base_millis,
        }
    }

    /// Create a shared TestTimeSource.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advance logical time by the given duration.
    pub fn advance(&self, duration: Duration) {
        self.logical_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Get the logical elapsed time since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.logical_nanos.load(Ordering::SeqCst))
    }
}

impl TimeSource for TestTimeSource {
    fn now(&self) -> Instant {
        self.base_instant + self.elapsed()
    }

    fn now_millis(&self) -> i64 {
        self.base_millis + self.elapsed().as_millis() as i64
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
