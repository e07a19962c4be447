use crate::signals::SignalEvent;
use flume::SendError;
use std::{io, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to install signal handler: {0}")]
    SignalHandler(#[source] io::Error),

    #[error("Failed to send signal event: {0}")]
    SendSignal(#[from] SendError<SignalEvent>),

    #[error(transparent)]
    Engine(#[from] engine::Error),

    #[error("Scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Scan abandoned on {event:?}: outcome unknown, artifacts may be partially written")]
    Interrupted { event: SignalEvent },

    #[error(
        "Scan abandoned after {0:?}: outcome unknown, artifacts may be partially written"
    )]
    TimedOut(Duration),
}

impl Error {
    /// The engine may still be running and writing its output.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Interrupted { .. } | Self::TimedOut(_))
    }
}
