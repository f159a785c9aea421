//! Per-link I/O task
//!
//! Every established [`Link`] is moved into its own task, which performs all
//! reads and writes. The session only exchanges channel messages with it, so
//! a peer that stops reading can stall this task but never the session loop.
//! Closing the [`LinkHandle`] interrupts a pending write.

use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::client::GsupClientError;
use crate::ipa::IpaFrame;
use crate::transport::{self, Link, PeerAddr};

/// Frames waiting to be written to one link
pub const LINK_QUEUE_CAPACITY: usize = 64;

/// Time a closing link gets to finish before its task is aborted
pub const LINK_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Completion of one write, reported to whoever asked for it
pub type WriteDone = oneshot::Sender<Result<(), GsupClientError>>;

/// Something the link task reports to the session
pub type LinkEvent = transport::Result<Option<IpaFrame>>;

struct Outbound {
    frame: IpaFrame,
    done: Option<WriteDone>,
}

/// Session side of a running link task
pub struct LinkHandle {
    peer: PeerAddr,
    out_tx: mpsc::Sender<Outbound>,
    in_rx: mpsc::Receiver<LinkEvent>,
    close_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl LinkHandle {
    /// Moves `link` into a new task.
    pub fn spawn(link: Box<dyn Link>, peer: PeerAddr) -> Self {
        let (out_tx, out_rx) = mpsc::channel(LINK_QUEUE_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(LINK_QUEUE_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(run_link(link, peer.clone(), out_rx, in_tx, close_rx));
        Self {
            peer,
            out_tx,
            in_rx,
            close_tx: Some(close_tx),
            task,
        }
    }

    /// Queues a frame without waiting.
    ///
    /// `done`, if given, is completed once the frame is written or the link
    /// is lost. A full queue or a finished task fails right away.
    pub fn enqueue(&self, frame: IpaFrame, done: Option<WriteDone>) -> Result<(), GsupClientError> {
        let (err, out) = match self.out_tx.try_send(Outbound { frame, done }) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(out)) => {
                warn!(
                    "Write queue to {} full, dropping {}",
                    self.peer,
                    out.frame.kind()
                );
                (GsupClientError::Congested, out)
            }
            Err(TrySendError::Closed(out)) => (GsupClientError::NotConnected, out),
        };
        if let Some(done) = out.done {
            let _ = done.send(Err(err));
        }
        Err(err)
    }

    /// Next frame or end-of-link from the task. Cancel safe.
    pub async fn recv(&mut self) -> LinkEvent {
        match self.in_rx.recv().await {
            Some(event) => event,
            // The task only ends without reporting when it was told to close.
            None => Ok(None),
        }
    }

    /// Stops the task and waits for the link to be closed.
    pub async fn close(mut self) {
        if let Some(close_tx) = self.close_tx.take() {
            let _ = close_tx.send(());
        }
        if timeout(LINK_CLOSE_TIMEOUT, &mut self.task).await.is_err() {
            warn!("Link to {} did not close in time, aborting", self.peer);
            self.task.abort();
        }
    }
}

async fn run_link(
    mut link: Box<dyn Link>,
    peer: PeerAddr,
    mut out_rx: mpsc::Receiver<Outbound>,
    in_tx: mpsc::Sender<LinkEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    debug!("Link task for {} started", peer);

    loop {
        tokio::select! {
            biased;
            _ = &mut close_rx => break,
            out = out_rx.recv() => {
                let Some(Outbound { frame, done }) = out else { break };
                let res = tokio::select! {
                    biased;
                    _ = &mut close_rx => break,
                    res = link.send(&frame) => res,
                };
                match res {
                    Ok(()) => {
                        if let Some(done) = done {
                            let _ = done.send(Ok(()));
                        }
                    }
                    Err(e) => {
                        if let Some(done) = done {
                            let _ = done.send(Err(GsupClientError::NotConnected));
                        }
                        let _ = in_tx.send(Err(e)).await;
                        break;
                    }
                }
            }
            event = link.recv() => {
                let end = !matches!(event, Ok(Some(_)));
                if in_tx.send(event).await.is_err() || end {
                    break;
                }
            }
        }
    }

    link.close().await;
    debug!("Link task for {} stopped", peer);
}
