//! GSUP client session
//!
//! A [`GsupClient`] keeps one IPA/GSUP link to a peer alive for as long as
//! it exists. The session runs as a single tokio task:
//!
//! ```text
//!              reconnect timer
//!   Disconnected ------------> (connect) --ok--> Connecting
//!        ^   ^                     |                 |
//!        |   +------ failed -------+                 | handshake complete
//!        |                                           v
//!        +---- link closed / error / no PONG ---- Connected
//! ```
//!
//! Connection attempts repeat at the reconnect interval until one succeeds.
//! The handshake must complete within one ping interval of the connect.
//! While connected, a CCM PING is sent every ping interval and the link is
//! dropped if the previous PING got no PONG. GSUP messages received while
//! connected are handed to a [`GsupMessageHandler`] on the session task.
//!
//! Link I/O runs on a separate task (see [`crate::link_task`]), so a peer
//! that stops reading never blocks timers or commands.

use std::fmt;
use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hlrcore_common::{log_gsup_message, log_ipa_message, Direction, GsupClientConfig};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::handshake::{AuthHandshake, HandshakeStep};
use crate::ipa::{CcmMessage, IpaFrame, MAX_PAYLOAD_LEN};
use crate::link_task::{LinkEvent, LinkHandle, WriteDone};
use crate::timer::ConnectionTimers;
use crate::transport::{self, Link, PeerAddr, Transport};

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Session connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No link; a connection attempt is pending or scheduled
    Disconnected,
    /// Link established, authentication handshake running
    Connecting,
    /// Ready for GSUP traffic
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// GSUP client errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GsupClientError {
    /// The session is not in the `Connected` state. Nothing was queued.
    #[error("GSUP link not connected")]
    NotConnected,

    #[error("GSUP message of {0} bytes does not fit in an IPA frame")]
    MessageTooLarge(usize),

    /// The link's write queue is full; the peer is not keeping up.
    #[error("GSUP link write queue full")]
    Congested,

    /// The session was destroyed.
    #[error("GSUP client closed")]
    Closed,
}

/// Receiver of GSUP messages from the peer.
///
/// Called on the session task; must not block.
pub trait GsupMessageHandler: Send + 'static {
    fn on_message(&mut self, msg: Bytes);
}

impl<F> GsupMessageHandler for F
where
    F: FnMut(Bytes) + Send + 'static,
{
    fn on_message(&mut self, msg: Bytes) {
        self(msg)
    }
}

/// Snapshot of a session for operator listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsupClientStatus {
    pub unit_name: String,
    pub peer: PeerAddr,
    pub state: ConnectionState,
}

impl fmt::Display for GsupClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' to {}:{:>5} ({})",
            self.unit_name, self.peer.host, self.peer.port, self.state
        )
    }
}

enum Command {
    Send {
        msg: Bytes,
        reply: WriteDone,
    },
    Destroy,
}

/// Handle to a running GSUP client session.
///
/// Dropping the handle stops the session as well; [`GsupClient::destroy`]
/// additionally waits for the link to be closed.
pub struct GsupClient {
    unit_name: String,
    peer: PeerAddr,
    cmd_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl GsupClient {
    /// Starts a session. The first connection attempt is made right away.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create(
        config: &GsupClientConfig,
        transport: Arc<dyn Transport>,
        handshake: Box<dyn AuthHandshake>,
        handler: Box<dyn GsupMessageHandler>,
    ) -> Self {
        let peer = PeerAddr::new(config.address.clone(), config.port);
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let session = Session {
            unit_name: config.unit_name.clone(),
            peer: peer.clone(),
            reconnect_interval: config.reconnect_interval(),
            ping_interval: config.ping_interval(),
            transport,
            handshake,
            handler,
            link: None,
            connecting: None,
            timers: ConnectionTimers::new(),
            got_pong: false,
            state_tx,
            cmd_rx,
        };
        let task = tokio::spawn(session.run());

        Self {
            unit_name: config.unit_name.clone(),
            peer,
            cmd_tx,
            state_rx,
            task,
        }
    }

    /// Sends one GSUP message.
    ///
    /// Fails with [`GsupClientError::NotConnected`] unless the session is
    /// connected; the message is never queued for a later link. Resolves
    /// once the message is written, or with `NotConnected` if the link is
    /// lost first.
    pub async fn send(&self, msg: Bytes) -> Result<(), GsupClientError> {
        let (reply, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Send { msg, reply })
            .await
            .map_err(|_| GsupClientError::Closed)?;
        reply_rx.await.unwrap_or(Err(GsupClientError::NotConnected))
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Observes connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn status(&self) -> GsupClientStatus {
        GsupClientStatus {
            unit_name: self.unit_name.clone(),
            peer: self.peer.clone(),
            state: self.state(),
        }
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn peer(&self) -> &PeerAddr {
        &self.peer
    }

    /// Stops the session from any state and waits until it is gone.
    pub async fn destroy(self) {
        // A closed channel means the task is already finishing.
        let _ = self.cmd_tx.send(Command::Destroy).await;
        if let Err(e) = self.task.await {
            warn!("GSUP client '{}' task ended abnormally: {}", self.unit_name, e);
        }
    }
}

type ConnectFuture = Pin<Box<dyn Future<Output = transport::Result<Box<dyn Link>>> + Send>>;

/// Session state, owned by the session task
struct Session {
    unit_name: String,
    peer: PeerAddr,
    reconnect_interval: Duration,
    ping_interval: Duration,
    transport: Arc<dyn Transport>,
    handshake: Box<dyn AuthHandshake>,
    handler: Box<dyn GsupMessageHandler>,
    link: Option<LinkHandle>,
    /// In-flight connection attempt
    connecting: Option<ConnectFuture>,
    timers: ConnectionTimers,
    got_pong: bool,
    state_tx: watch::Sender<ConnectionState>,
    cmd_rx: mpsc::Receiver<Command>,
}

async fn wait_connect(connecting: &mut Option<ConnectFuture>) -> transport::Result<Box<dyn Link>> {
    match connecting {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn recv_frame(link: &mut Option<LinkHandle>) -> LinkEvent {
    match link {
        Some(link) => link.recv().await,
        None => pending().await,
    }
}

impl Session {
    async fn run(mut self) {
        info!("GSUP client '{}' started for {}", self.unit_name, self.peer);
        self.timers.reconnect.arm_now();

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Send { msg, reply }) => self.send_gsup(msg, reply),
                        Some(Command::Destroy) | None => break,
                    }
                }
                res = wait_connect(&mut self.connecting) => {
                    self.connecting = None;
                    self.on_connect_result(res).await;
                }
                event = recv_frame(&mut self.link) => {
                    self.on_link_event(event).await;
                }
                _ = self.timers.reconnect.expired() => {
                    self.timers.reconnect.disarm();
                    self.start_connect();
                }
                _ = self.timers.ping.expired() => {
                    self.timers.ping.disarm();
                    self.on_ping_timeout().await;
                }
            }
        }

        self.shutdown().await;
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&mut self, state: ConnectionState) {
        let old = self.state_tx.send_replace(state);
        if old != state {
            info!(
                "GSUP client '{}' {}: {} -> {}",
                self.unit_name, self.peer, old, state
            );
        }
    }

    fn start_connect(&mut self) {
        if self.link.is_some() || self.connecting.is_some() {
            return;
        }
        debug!("GSUP client '{}' connecting to {}", self.unit_name, self.peer);
        let transport = Arc::clone(&self.transport);
        let peer = self.peer.clone();
        self.connecting = Some(Box::pin(async move { transport.connect(&peer).await }));
    }

    async fn on_connect_result(&mut self, res: transport::Result<Box<dyn Link>>) {
        match res {
            Ok(link) => {
                self.link = Some(LinkHandle::spawn(link, self.peer.clone()));
                self.set_state(ConnectionState::Connecting);
                // Deadline for the handshake; re-armed once it completes.
                self.timers.ping.arm(self.ping_interval);
                let step = self.handshake.start();
                self.apply_handshake_step(step).await;
            }
            Err(e) => {
                debug!(
                    "GSUP client '{}' connect to {} failed: {}",
                    self.unit_name, self.peer, e
                );
                self.timers.reconnect.arm(self.reconnect_interval);
            }
        }
    }

    async fn apply_handshake_step(&mut self, step: HandshakeStep) {
        match step {
            HandshakeStep::Send(payload) => {
                self.transmit(IpaFrame::Oap(payload));
            }
            HandshakeStep::Continue => {}
            HandshakeStep::Complete => {
                if self.state() == ConnectionState::Connecting {
                    self.on_handshake_complete().await;
                }
            }
            HandshakeStep::Failed(reason) => {
                warn!(
                    "GSUP client '{}' authentication with {} failed: {}",
                    self.unit_name, self.peer, reason
                );
                // A rejected peer is retried at the normal cadence.
                self.link_down(self.reconnect_interval).await;
            }
        }
    }

    async fn on_handshake_complete(&mut self) {
        self.set_state(ConnectionState::Connected);
        self.got_pong = false;
        self.timers.ping.arm(self.ping_interval);
        self.transmit(IpaFrame::Ccm(CcmMessage::Ping));
    }

    async fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            Ok(Some(frame)) => self.on_frame(frame).await,
            Ok(None) => {
                info!("GSUP client '{}': link closed by {}", self.unit_name, self.peer);
                self.link_down(Duration::ZERO).await;
            }
            Err(e) => {
                warn!(
                    "GSUP client '{}': link to {} failed: {}",
                    self.unit_name, self.peer, e
                );
                self.link_down(Duration::ZERO).await;
            }
        }
    }

    async fn on_frame(&mut self, frame: IpaFrame) {
        match frame {
            IpaFrame::Gsup(payload) => {
                log_gsup_message(&self.unit_name, Direction::Rx, &payload);
                if self.state() == ConnectionState::Connected {
                    self.handler.on_message(payload);
                } else {
                    warn!(
                        "GSUP client '{}': dropping GSUP message received before authentication",
                        self.unit_name
                    );
                }
            }
            IpaFrame::Oap(payload) => {
                log_ipa_message(&self.unit_name, Direction::Rx, "OAP", &payload);
                let step = self.handshake.on_message(&payload);
                self.apply_handshake_step(step).await;
            }
            IpaFrame::Ccm(msg) => {
                log_ipa_message(&self.unit_name, Direction::Rx, msg.name(), &[]);
                match msg {
                    CcmMessage::Pong => self.got_pong = true,
                    CcmMessage::Ping => {
                        self.transmit(IpaFrame::Ccm(CcmMessage::Pong));
                    }
                    CcmMessage::IdGet => {
                        let resp = CcmMessage::id_resp(&self.unit_name);
                        self.transmit(IpaFrame::Ccm(resp));
                    }
                    CcmMessage::IdAck => {
                        self.transmit(IpaFrame::Ccm(CcmMessage::IdAck));
                    }
                    CcmMessage::IdResp(_) => {}
                }
            }
        }
    }

    async fn on_ping_timeout(&mut self) {
        match self.state() {
            ConnectionState::Disconnected => return,
            ConnectionState::Connecting => {
                warn!(
                    "GSUP client '{}': handshake with {} not complete within {:?}, dropping link",
                    self.unit_name, self.peer, self.ping_interval
                );
                self.link_down(self.reconnect_interval).await;
                return;
            }
            ConnectionState::Connected => {}
        }
        if !self.got_pong {
            warn!(
                "GSUP client '{}': no PONG from {} within {:?}, dropping link",
                self.unit_name, self.peer, self.ping_interval
            );
            self.link_down(Duration::ZERO).await;
            return;
        }
        self.got_pong = false;
        self.timers.ping.arm(self.ping_interval);
        self.transmit(IpaFrame::Ccm(CcmMessage::Ping));
    }

    fn send_gsup(&mut self, msg: Bytes, reply: WriteDone) {
        if self.state() != ConnectionState::Connected {
            debug!(
                "GSUP client '{}': cannot send, link is {}",
                self.unit_name,
                self.state()
            );
            let _ = reply.send(Err(GsupClientError::NotConnected));
            return;
        }
        // One byte goes to the Osmocom extension header.
        if msg.len() + 1 > MAX_PAYLOAD_LEN {
            let _ = reply.send(Err(GsupClientError::MessageTooLarge(msg.len())));
            return;
        }
        log_gsup_message(&self.unit_name, Direction::Tx, &msg);
        match &self.link {
            Some(link) => {
                // Failures are reported through `reply`.
                let _ = link.enqueue(IpaFrame::Gsup(msg), Some(reply));
            }
            None => {
                let _ = reply.send(Err(GsupClientError::NotConnected));
            }
        }
    }

    /// Queues a control frame on the current link. A write failure shows up
    /// later as a link event.
    fn transmit(&mut self, frame: IpaFrame) {
        let Some(link) = self.link.as_ref() else {
            return;
        };
        if let IpaFrame::Ccm(msg) = &frame {
            log_ipa_message(&self.unit_name, Direction::Tx, msg.name(), &[]);
        }
        let kind = frame.kind();
        if let Err(e) = link.enqueue(frame, None) {
            debug!(
                "GSUP client '{}': {} to {} not queued: {}",
                self.unit_name, kind, self.peer, e
            );
        }
    }

    /// Drops the link and schedules the next connection attempt.
    async fn link_down(&mut self, retry_in: Duration) {
        self.timers.ping.disarm();
        if let Some(link) = self.link.take() {
            link.close().await;
        }
        self.got_pong = false;
        self.set_state(ConnectionState::Disconnected);
        self.timers.reconnect.arm(retry_in);
    }

    async fn shutdown(&mut self) {
        // Timers go first so nothing fires into a half-closed session.
        self.timers.disarm_all();
        self.connecting = None;
        if let Some(link) = self.link.take() {
            link.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
        info!("GSUP client '{}' for {} destroyed", self.unit_name, self.peer);
    }
}
