use crate::error::Error;
use flume::Sender;
use tokio::signal;

/// Indefinitely listens to Ctrl-C and sends signal events to the provided channel.
pub async fn wait_for_signal(signal_event: &Sender<SignalEvent>) -> Result<(), Error> {
    loop {
        signal::ctrl_c().await.map_err(Error::SignalHandler)?;
        signal_event.send_async(SignalEvent::Interrupt).await?;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Interrupt,
}
