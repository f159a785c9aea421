//! Authentication handshake run after every connect
//!
//! The session moves from `Connecting` to `Connected` only once the
//! handshake reports [`HandshakeStep::Complete`]. Handshake messages travel
//! as OAP frames; the session hands every received OAP payload to the
//! handshake and sends whatever it returns.

use bytes::Bytes;

/// What the session should do after a handshake event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeStep {
    /// Send this OAP payload and keep waiting
    Send(Bytes),
    /// Nothing to send yet, keep waiting
    Continue,
    /// Peer accepted us
    Complete,
    /// Peer rejected us or sent garbage; the link is dropped
    Failed(String),
}

/// Client side of an authentication handshake.
///
/// Both methods run on the session loop and must not block.
pub trait AuthHandshake: Send + 'static {
    /// Called on each new link. Resets any state from a previous link.
    fn start(&mut self) -> HandshakeStep;

    /// Called for each OAP payload received from the peer.
    fn on_message(&mut self, payload: &[u8]) -> HandshakeStep;
}

/// Handshake for peers that need no authentication
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuth;

impl AuthHandshake for NoAuth {
    fn start(&mut self) -> HandshakeStep {
        HandshakeStep::Complete
    }

    fn on_message(&mut self, _payload: &[u8]) -> HandshakeStep {
        HandshakeStep::Continue
    }
}
