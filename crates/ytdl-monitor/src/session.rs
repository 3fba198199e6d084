//! A running download and its event stream.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::event::DownloadEvent;

/// Handle to a download started with [`YoutubeDl::spawn`](crate::YoutubeDl::spawn).
///
/// Events arrive in the order the tool printed them, a destination first
/// when one is announced, and a [`DownloadEvent::Failed`] last if the
/// process fails. The stream ends once the supervising task is done.
pub struct DownloadSession {
    events: mpsc::Receiver<DownloadEvent>,
    cancellation_token: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl DownloadSession {
    pub(crate) fn new(
        events: mpsc::Receiver<DownloadEvent>,
        cancellation_token: CancellationToken,
        task: JoinHandle<Result<()>>,
    ) -> Self {
        Self {
            events,
            cancellation_token,
            task,
        }
    }

    /// Next event, or `None` once the session has finished.
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.events.recv().await
    }

    /// Kill the process and stop monitoring.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Wait for the session to finish and return its outcome.
    ///
    /// Events not yet received are discarded; the process keeps running
    /// until it exits on its own.
    pub async fn wait(self) -> Result<()> {
        drop(self.events);
        self.task.await?
    }
}
