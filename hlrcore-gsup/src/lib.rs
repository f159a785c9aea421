//! GSUP client for hlrcore
//!
//! This crate keeps outbound GSUP sessions to peer network elements alive:
//!
//! - [`ipa`] - IPA framing of CCM, GSUP and OAP messages
//! - [`transport`] - the `Transport`/`Link` abstraction and its TCP implementation
//! - [`link_task`] - per-link task doing all reads and writes
//! - [`timer`] - reconnect and ping timers
//! - [`handshake`] - authentication handshake run on each new link
//! - [`client`] - the session state machine
//!
//! GSUP payloads are opaque to this crate.

pub mod client;
pub mod handshake;
pub mod ipa;
pub mod link_task;
pub mod timer;
pub mod transport;

pub use client::{
    ConnectionState, GsupClient, GsupClientError, GsupClientStatus, GsupMessageHandler,
};
pub use handshake::{AuthHandshake, HandshakeStep, NoAuth};
pub use ipa::{CcmMessage, IdEntry, IpaCodecError, IpaFrame};
pub use timer::{ConnectionTimers, Timer};
pub use transport::{Link, PeerAddr, TcpLink, TcpTransport, Transport, TransportError};
