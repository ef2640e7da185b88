use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;

/// Randomised delay between consecutive week requests of one source.
///
/// This is courtesy towards the remote API, not a correctness mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Pacing { min, max }
        } else {
            Pacing { min: max, max: min }
        }
    }

    pub fn disabled() -> Self {
        Pacing {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.max.is_zero()
    }

    /// Uniform draw from `[min, max]`.
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::new(Duration::from_secs(35), Duration::from_secs(50))
    }
}

/// Receiving side of the process-wide stop signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Shutdown { rx }
    }

    /// A signal that never fires.
    #[cfg(test)]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Shutdown { rx }
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once a stop has been requested.
    pub async fn requested(&mut self) {
        if self.rx.wait_for(|stop| *stop).await.is_err() {
            // Sender dropped without asking us to stop.
            std::future::pending::<()>().await;
        }
    }

    /// Sleep for `delay` unless a stop arrives first. Returns `false` if the
    /// sleep was cut short.
    pub async fn sleep(&mut self, delay: Duration) -> bool {
        if self.is_requested() {
            return false;
        }
        if delay.is_zero() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.requested() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_zero() {
        let p = Pacing::disabled();
        assert!(p.is_disabled());
        assert_eq!(p.next_delay(), Duration::ZERO);
    }

    #[test]
    fn test_delay_within_bounds() {
        let p = Pacing::default();
        for _ in 0..200 {
            let d = p.next_delay();
            assert!(d >= Duration::from_secs(35) && d <= Duration::from_secs(50));
        }
    }

    #[test]
    fn test_bounds_are_ordered() {
        let p = Pacing::new(Duration::from_secs(9), Duration::from_secs(3));
        let d = p.next_delay();
        assert!(d >= Duration::from_secs(3) && d <= Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_sleep_interrupted_by_stop() {
        let (tx, rx) = watch::channel(false);
        let mut shutdown = Shutdown::new(rx);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let started = std::time::Instant::now();
        assert!(!shutdown.sleep(Duration::from_secs(60)).await);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn test_sleep_completes_without_stop() {
        let mut shutdown = Shutdown::never();
        assert!(shutdown.sleep(Duration::from_millis(5)).await);
        assert!(shutdown.sleep(Duration::ZERO).await);
    }
}
