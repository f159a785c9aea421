//! Mock GSUP peer for integration testing
//!
//! Provides an in-memory [`Transport`] whose behaviour is scripted by the
//! test: refuse a number of connects, answer or ignore PINGs, reply to OAP,
//! stop reading GSUP, inject frames and drop the link. Everything the client sends is
//! recorded as [`MockPeerEvent`]s.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use hlrcore_gsup::transport::Result as TransportResult;
use hlrcore_gsup::{
    AuthHandshake, CcmMessage, HandshakeStep, IpaFrame, Link, PeerAddr, Transport, TransportError,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Events recorded by the mock peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockPeerEvent {
    /// A connect attempt was refused
    Refused { attempt: usize },
    /// A connect attempt was accepted and a link created
    Accepted { attempt: usize },
    /// A frame arrived from the client on the link of `attempt`
    Received { attempt: usize, frame: IpaFrame },
    /// The client closed the link of `attempt`
    Closed { attempt: usize },
}

enum LinkInput {
    Frame(IpaFrame),
    Drop,
}

struct MockPeerState {
    refuse_remaining: usize,
    answer_pings: bool,
    send_id_get: bool,
    stall_gsup: bool,
    oap_reply: Option<Bytes>,
    attempts: Vec<Instant>,
    events: Vec<MockPeerEvent>,
    /// Input side of the most recently accepted link
    current: Option<(usize, mpsc::UnboundedSender<LinkInput>)>,
}

/// Scriptable GSUP peer
#[derive(Clone)]
pub struct MockPeer {
    state: Arc<Mutex<MockPeerState>>,
}

impl Default for MockPeer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPeer {
    /// Creates a peer that accepts every connect and answers PINGs
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockPeerState {
                refuse_remaining: 0,
                answer_pings: true,
                send_id_get: false,
                stall_gsup: false,
                oap_reply: None,
                attempts: Vec::new(),
                events: Vec::new(),
                current: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockPeerState> {
        self.state.lock().expect("mock peer state poisoned")
    }

    /// Transport handing out links to this peer
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(MockTransport { peer: self.clone() })
    }

    /// Refuse the next `count` connect attempts
    pub fn refuse_connects(&self, count: usize) {
        self.lock().refuse_remaining = count;
    }

    pub fn set_answer_pings(&self, answer: bool) {
        self.lock().answer_pings = answer;
    }

    /// Send CCM ID_GET as soon as a link is accepted
    pub fn set_send_id_get(&self, send: bool) {
        self.lock().send_id_get = send;
    }

    /// Never finish writing GSUP frames, like a peer whose receive window
    /// stays full. Control frames still go through.
    pub fn set_stall_gsup(&self, stall: bool) {
        self.lock().stall_gsup = stall;
    }

    /// Answer every OAP message with `reply`
    pub fn set_oap_reply(&self, reply: Option<Bytes>) {
        self.lock().oap_reply = reply;
    }

    /// Times of all connect attempts, refused or not
    pub fn connect_attempts(&self) -> Vec<Instant> {
        self.lock().attempts.clone()
    }

    pub fn accepted_count(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, MockPeerEvent::Accepted { .. }))
            .count()
    }

    pub fn events(&self) -> Vec<MockPeerEvent> {
        self.lock().events.clone()
    }

    /// All frames received from the client, in order
    pub fn received(&self) -> Vec<IpaFrame> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockPeerEvent::Received { frame, .. } => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of PINGs received from the client
    pub fn pings_received(&self) -> usize {
        self.received()
            .iter()
            .filter(|f| **f == IpaFrame::Ccm(CcmMessage::Ping))
            .count()
    }

    /// Sends a frame to the client on the current link
    pub fn inject(&self, frame: IpaFrame) -> bool {
        match &self.lock().current {
            Some((_, tx)) => tx.send(LinkInput::Frame(frame)).is_ok(),
            None => false,
        }
    }

    /// Closes the current link from the peer side
    pub fn drop_link(&self) -> bool {
        match self.lock().current.take() {
            Some((_, tx)) => tx.send(LinkInput::Drop).is_ok(),
            None => false,
        }
    }
}

struct MockTransport {
    peer: MockPeer,
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _peer: &PeerAddr) -> TransportResult<Box<dyn Link>> {
        let mut state = self.peer.lock();
        state.attempts.push(Instant::now());
        let attempt = state.attempts.len();

        if state.refuse_remaining > 0 {
            state.refuse_remaining -= 1;
            state.events.push(MockPeerEvent::Refused { attempt });
            tracing::debug!("Mock peer refused connect attempt {}", attempt);
            return Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if state.send_id_get {
            let _ = tx.send(LinkInput::Frame(IpaFrame::Ccm(CcmMessage::IdGet)));
        }
        state.current = Some((attempt, tx.clone()));
        state.events.push(MockPeerEvent::Accepted { attempt });
        tracing::info!("Mock peer accepted connect attempt {}", attempt);

        Ok(Box::new(MockLink {
            attempt,
            peer: self.peer.clone(),
            tx,
            rx,
        }))
    }
}

struct MockLink {
    attempt: usize,
    peer: MockPeer,
    /// Loopback for the peer's automatic replies
    tx: mpsc::UnboundedSender<LinkInput>,
    rx: mpsc::UnboundedReceiver<LinkInput>,
}

#[async_trait]
impl Link for MockLink {
    async fn send(&mut self, frame: &IpaFrame) -> TransportResult<()> {
        let stalled = {
            let mut state = self.peer.lock();
            if state.stall_gsup && matches!(frame, IpaFrame::Gsup(_)) {
                true
            } else {
                state.events.push(MockPeerEvent::Received {
                    attempt: self.attempt,
                    frame: frame.clone(),
                });

                let reply = match frame {
                    IpaFrame::Ccm(CcmMessage::Ping) if state.answer_pings => {
                        Some(IpaFrame::Ccm(CcmMessage::Pong))
                    }
                    IpaFrame::Oap(_) => state.oap_reply.clone().map(IpaFrame::Oap),
                    _ => None,
                };
                if let Some(reply) = reply {
                    let _ = self.tx.send(LinkInput::Frame(reply));
                }
                false
            }
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn recv(&mut self) -> TransportResult<Option<IpaFrame>> {
        match self.rx.recv().await {
            Some(LinkInput::Frame(frame)) => Ok(Some(frame)),
            Some(LinkInput::Drop) | None => Ok(None),
        }
    }

    async fn close(&mut self) {
        let mut state = self.peer.lock();
        if matches!(state.current, Some((attempt, _)) if attempt == self.attempt) {
            state.current = None;
        }
        state.events.push(MockPeerEvent::Closed {
            attempt: self.attempt,
        });
    }
}

/// Handshake sending one request and accepting exactly one reply
#[derive(Debug, Clone)]
pub struct ScriptedHandshake {
    request: Bytes,
    accept: Bytes,
}

impl ScriptedHandshake {
    pub fn new(request: &'static [u8], accept: &'static [u8]) -> Self {
        Self {
            request: Bytes::from_static(request),
            accept: Bytes::from_static(accept),
        }
    }
}

impl AuthHandshake for ScriptedHandshake {
    fn start(&mut self) -> HandshakeStep {
        HandshakeStep::Send(self.request.clone())
    }

    fn on_message(&mut self, payload: &[u8]) -> HandshakeStep {
        if payload == self.accept.as_ref() {
            HandshakeStep::Complete
        } else {
            HandshakeStep::Failed(format!("unexpected reply {:02x?}", payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refuse_then_accept() {
        let peer = MockPeer::new();
        peer.refuse_connects(1);
        let transport = peer.transport();
        let addr = PeerAddr::new("mock", 4222);

        assert!(transport.connect(&addr).await.is_err());
        let mut link = transport.connect(&addr).await.unwrap();
        assert_eq!(peer.connect_attempts().len(), 2);
        assert_eq!(peer.accepted_count(), 1);

        link.send(&IpaFrame::Ccm(CcmMessage::Ping)).await.unwrap();
        assert_eq!(
            link.recv().await.unwrap(),
            Some(IpaFrame::Ccm(CcmMessage::Pong))
        );

        assert!(peer.drop_link());
        assert_eq!(link.recv().await.unwrap(), None);
        link.close().await;
        assert_eq!(
            peer.events().last(),
            Some(&MockPeerEvent::Closed { attempt: 2 })
        );
    }

    #[test]
    fn test_scripted_handshake() {
        let mut hs = ScriptedHandshake::new(b"req", b"ok");
        assert_eq!(hs.start(), HandshakeStep::Send(Bytes::from_static(b"req")));
        assert_eq!(hs.on_message(b"ok"), HandshakeStep::Complete);
        assert!(matches!(hs.on_message(b"no"), HandshakeStep::Failed(_)));
    }
}
