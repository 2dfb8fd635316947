//! Loop lifecycle state and the stop signal shared by all loops.

use tokio::sync::watch;

/// Lifecycle of a device loop.
///
/// ```text
/// SensorPublishLoop:     Initial -> Running    -> Stopped | Failed
/// ActuatorSubscribeLoop: Initial -> Subscribed -> Stopped | Failed
/// ```
///
/// `Stopped` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Initial,
    Running,
    Subscribed,
    Stopped,
    Failed,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// Move to `next` unless already terminal.
    pub(crate) fn advance(&mut self, next: LoopState) {
        if self.is_terminal() {
            return;
        }
        tracing::debug!(from = ?*self, to = ?next, "loop state change");
        *self = next;
    }
}

/// Receiving side of the stop signal. `true` means stop.
pub type StopSignal = watch::Receiver<bool>;

/// Create a stop signal. Send `true` to stop every loop holding a receiver.
pub fn stop_signal() -> (watch::Sender<bool>, StopSignal) {
    watch::channel(false)
}

pub(crate) fn stop_requested(stop: &StopSignal) -> bool {
    *stop.borrow()
}

/// Resolve once a stop is requested. A dropped sender counts as a stop,
/// since nothing can ever clear it again.
pub(crate) async fn stopped(stop: &mut StopSignal) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}
