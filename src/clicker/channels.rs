// Communication channels for the image clicker
use super::types::ClickerEvent;
use tokio::sync::mpsc;

/// Room for a few passes worth of progress before events get dropped.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Helper function to create the engine -> host event channel
pub fn create_event_channel() -> (mpsc::Sender<ClickerEvent>, mpsc::Receiver<ClickerEvent>) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Non-blocking publish. The engine never waits on its observer; a full or
/// closed channel only loses this one event.
pub fn publish(event_tx: Option<&mpsc::Sender<ClickerEvent>>, event: ClickerEvent) {
    if let Some(tx) = event_tx
        && let Err(e) = tx.try_send(event)
    {
        log::debug!("Clicker event dropped: {}", e);
    }
}
