//! Simple stateless pub-sub event handler
//!
//! An [`EventHandler`] drives one async handler from its own notifier subscription. Handlers have no access to the
//! internal state of the engine; all they receive is the event itself. Events are handled one at a time, in the order
//! they were published.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{ChangeNotifier, EventSubscription, EventType, LiveEvent};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler {
    subscription: EventSubscription,
    filter: Option<EventType>,
    handler: Handler<LiveEvent>,
}

impl EventHandler {
    /// Subscribes immediately, so no event published after this call is missed, even if the handler has not been
    /// started yet. `filter` limits the handler to one event type; `None` handles everything.
    pub fn new(notifier: &ChangeNotifier, filter: Option<EventType>, handler: Handler<LiveEvent>) -> Self {
        Self { subscription: notifier.subscribe(), filter, handler }
    }

    /// Runs until every [`ChangeNotifier`] clone has been dropped.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        while let Some(ev) = self.subscription.next().await {
            if self.filter.map(|f| f != ev.event_type).unwrap_or(false) {
                continue;
            }
            trace!("📬️ Handling {} event", ev.event_type);
            (self.handler)(ev).await;
        }
        debug!("📬️ Event handler has shut down");
    }
}
