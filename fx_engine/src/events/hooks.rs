use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::task::JoinHandle;

use crate::events::{ChangeNotifier, EventHandler, EventType, Handler, LiveEvent};

/// A set of async callbacks to attach to a [`ChangeNotifier`].
#[derive(Default, Clone)]
pub struct EventHooks {
    hooks: Vec<(Option<EventType>, Handler<LiveEvent>)>,
}

impl EventHooks {
    /// Call `f` for every event of the given type.
    pub fn on_event<F>(&mut self, event_type: EventType, f: F) -> &mut Self
    where F: (Fn(LiveEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.hooks.push((Some(event_type), Arc::new(f)));
        self
    }

    /// Call `f` for every event.
    pub fn on_any_event<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(LiveEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.hooks.push((None, Arc::new(f)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

pub struct EventHandlers {
    handlers: Vec<EventHandler>,
}

impl EventHandlers {
    /// Subscribes every hook to `notifier` straight away.
    pub fn new(notifier: &ChangeNotifier, hooks: EventHooks) -> Self {
        let handlers = hooks.hooks.into_iter().map(|(filter, f)| EventHandler::new(notifier, filter, f)).collect();
        Self { handlers }
    }

    /// Spawn one task per hook. The tasks finish when the notifier (and all its clones) are dropped.
    pub fn start_handlers(self) -> Vec<JoinHandle<()>> {
        debug!("📬️ Starting {} event hooks", self.handlers.len());
        self.handlers.into_iter().map(|h| tokio::spawn(h.start_handler())).collect()
    }
}
