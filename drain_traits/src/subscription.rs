//! Channel-backed push streams.
//!
//! A `Subscription` is the receiving half of a store feed. Dropping it is the
//! unsubscribe: the store's next send fails and it forgets the sender.
use crossbeam_channel as xch;
use std::time::Duration;

/// Fault reported in-band by a live feed (e.g. the listener was cancelled
/// remotely). The feed may keep delivering values afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFault(pub String);

impl std::fmt::Display for TransportFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TransportFault {}

pub type Delivery<T> = Result<T, TransportFault>;

#[derive(Debug)]
pub struct Subscription<T> {
    rx: xch::Receiver<Delivery<T>>,
}

impl<T> Subscription<T> {
    pub fn new(rx: xch::Receiver<Delivery<T>>) -> Self {
        Self { rx }
    }

    /// Create a connected (sender, subscription) pair.
    pub fn channel() -> (xch::Sender<Delivery<T>>, Self) {
        let (tx, rx) = xch::unbounded();
        (tx, Self::new(rx))
    }

    pub fn receiver(&self) -> &xch::Receiver<Delivery<T>> {
        &self.rx
    }

    pub fn into_receiver(self) -> xch::Receiver<Delivery<T>> {
        self.rx
    }

    /// Drain everything queued and return the newest delivery.
    pub fn latest(&self) -> Option<Delivery<T>> {
        self.rx.try_iter().last()
    }

    /// Block for the next delivery, up to `timeout`.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Delivery<T>> {
        self.rx.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_skips_stale_values() {
        let (tx, sub) = Subscription::<u32>::channel();
        tx.send(Ok(1)).unwrap();
        tx.send(Err(TransportFault("blip".into()))).unwrap();
        tx.send(Ok(3)).unwrap();
        assert_eq!(sub.latest(), Some(Ok(3)));
        assert_eq!(sub.latest(), None);
    }

    #[test]
    fn dropping_subscription_disconnects_sender() {
        let (tx, sub) = Subscription::<u32>::channel();
        drop(sub);
        assert!(tx.send(Ok(1)).is_err());
    }
}
