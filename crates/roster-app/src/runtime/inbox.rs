use tokio::sync::mpsc;

use crate::events::AppEvent;

/// Sender for the runtime's event inbox.
pub type AppEventSender = mpsc::UnboundedSender<AppEvent>;

/// Receiver for the runtime's event inbox.
pub type AppEventReceiver = mpsc::UnboundedReceiver<AppEvent>;
