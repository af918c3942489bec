mod channel;
mod event_types;
mod hooks;
mod notifier;

pub use channel::{EventHandler, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks};
pub use notifier::{ChangeNotifier, EventSubscription};
