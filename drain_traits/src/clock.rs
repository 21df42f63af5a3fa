use std::time::Instant;

/// Monotonic time source shared by the actuator timer and the monitor loop.
///
/// The actuator timer never reads the wall clock itself; every transition is
/// stamped with an `Instant` obtained from a `Clock`, so tests can drive the
/// on-duration deterministically.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Real-time monotonic clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Deterministic clock whose time only moves when told to.
    ///
    /// now() = origin + offset, and only `advance`/`set_offset` move the offset.
    /// Clones share the same offset, so a test can hold one handle while the
    /// code under test holds another.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// The instant this clock started at (offset zero).
        pub fn origin(&self) -> Instant {
            self.origin
        }

        /// Instant at `d` past the origin, independent of the current offset.
        pub fn at(&self, d: Duration) -> Instant {
            self.origin + d
        }

        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        pub fn set_offset(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = d;
            }
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.origin + off
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn clones_share_offset() {
            let a = TestClock::new();
            let b = a.clone();
            a.advance(Duration::from_secs(3));
            assert_eq!(b.now() - b.origin(), Duration::from_secs(3));
        }

        #[test]
        fn set_offset_lands_exactly_on_deadline() {
            let c = TestClock::new();
            let deadline = c.at(Duration::from_secs(10));
            c.set_offset(Duration::from_millis(9_999));
            assert!(c.now() < deadline);
            c.set_offset(Duration::from_secs(10));
            assert_eq!(c.now(), deadline);
        }

        #[test]
        fn arc_forwards_now() {
            let c = TestClock::new();
            let shared: Arc<dyn Clock + Send + Sync> = Arc::new(c.clone());
            c.advance(Duration::from_millis(250));
            assert_eq!(shared.now(), c.at(Duration::from_millis(250)));
        }
    }
}
