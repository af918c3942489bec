//! Fan-out of change events to live subscribers.
//!
//! [`ChangeNotifier`] wraps a `tokio` broadcast channel. Publishing never blocks and never fails the caller: with
//! no subscribers the event is simply dropped. Each subscriber sees events in publish order. A subscriber that falls
//! more than the buffer size behind loses the oldest events and is told how many it missed.
use log::*;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::events::{EventType, LiveEvent};

#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<LiveEvent>,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChangeNotifier ({} subscribers)", self.sender.receiver_count())
    }
}

impl ChangeNotifier {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription { receiver: self.sender.subscribe(), missed: 0 }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish `payload` to every current subscriber.
    pub fn broadcast<T: Serialize>(&self, event_type: EventType, payload: &T) {
        let data = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                error!("📬️ Could not serialize {event_type} event. It will not be published. {e}");
                return;
            },
        };
        match self.sender.send(LiveEvent::new(event_type, data)) {
            Ok(n) => trace!("📬️ {event_type} event published to {n} subscribers"),
            Err(_) => trace!("📬️ {event_type} event dropped. There are no subscribers"),
        }
    }
}

/// A live stream of [`LiveEvent`]s.
pub struct EventSubscription {
    receiver: broadcast::Receiver<LiveEvent>,
    missed: u64,
}

impl EventSubscription {
    /// Wait for the next event. Returns `None` once every notifier has been dropped.
    pub async fn next(&mut self) -> Option<LiveEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(ev) => return Some(ev),
                Err(RecvError::Lagged(n)) => self.lagged(n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The next event if one is already waiting.
    pub fn try_next(&mut self) -> Option<LiveEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(ev) => return Some(ev),
                Err(TryRecvError::Lagged(n)) => self.lagged(n),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Total number of events this subscriber lost by falling behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    fn lagged(&mut self, n: u64) {
        warn!("📬️ Subscriber fell behind and missed {n} events");
        self.missed += n;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::events::BalanceEvent;

    fn balance(units: i64) -> BalanceEvent {
        BalanceEvent { currency: "USD".into(), balance: fx_common::Amount::from_units(units) }
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let notifier = ChangeNotifier::new(4);
        notifier.broadcast(EventType::BalanceUpdate, &balance(1));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn subscribers_see_events_in_order() {
        let notifier = ChangeNotifier::new(16);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();
        for i in 0..5 {
            notifier.broadcast(EventType::BalanceUpdate, &balance(i));
        }
        for sub in [&mut a, &mut b] {
            let seen = (0..5)
                .map(|_| sub.try_next().unwrap().payload::<BalanceEvent>().unwrap().balance)
                .collect::<Vec<_>>();
            let expected = (0..5).map(fx_common::Amount::from_units).collect::<Vec<_>>();
            assert_eq!(seen, expected);
            assert!(sub.try_next().is_none());
        }
    }

    #[test]
    fn slow_subscribers_lose_the_oldest_events() {
        let notifier = ChangeNotifier::new(2);
        let mut sub = notifier.subscribe();
        for i in 0..5 {
            notifier.broadcast(EventType::BalanceUpdate, &balance(i));
        }
        let first = sub.try_next().unwrap().payload::<BalanceEvent>().unwrap();
        assert_eq!(first.balance, fx_common::Amount::from_units(3));
        assert_eq!(sub.missed(), 3);
        let last = sub.try_next().unwrap().payload::<BalanceEvent>().unwrap();
        assert_eq!(last.balance, fx_common::Amount::from_units(4));
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn stream_ends_when_notifier_is_dropped() {
        let notifier = ChangeNotifier::new(4);
        let mut sub = notifier.subscribe();
        notifier.broadcast(EventType::NewMessage, &"hello");
        drop(notifier);
        assert_eq!(sub.next().await.unwrap().event_type, EventType::NewMessage);
        assert!(sub.next().await.is_none());
    }
}
