//! Transport abstraction for GSUP client sessions
//!
//! A [`Transport`] opens [`Link`]s to a peer. The session only ever talks to
//! these traits, so tests can substitute a scripted peer for TCP.

use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use hlrcore_common::GsupClientConfig;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::ipa::{self, IpaCodecError, IpaFrame};

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Connect to {0} timed out")]
    Timeout(PeerAddr),
    #[error("Framing error: {0}")]
    Codec(#[from] IpaCodecError),
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Remote endpoint of a session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    pub host: String,
    pub port: u16,
}

impl PeerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Factory for links to a peer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a new link. Resolution and connect happen asynchronously.
    async fn connect(&self, peer: &PeerAddr) -> Result<Box<dyn Link>>;
}

/// An established, framed connection.
#[async_trait]
pub trait Link: Send {
    async fn send(&mut self, frame: &IpaFrame) -> Result<()>;

    /// Waits for the next frame. `Ok(None)` means the peer closed the link.
    ///
    /// Must be cancel safe: the link task polls it inside `tokio::select!`.
    async fn recv(&mut self) -> Result<Option<IpaFrame>>;

    /// Closes the link. Errors are not reported.
    async fn close(&mut self);
}

/// IPA over TCP
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Transport using the connect timeout of a client configuration.
    pub fn for_config(config: &GsupClientConfig) -> Self {
        Self::new(config.connect_timeout())
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, peer: &PeerAddr) -> Result<Box<dyn Link>> {
        debug!("Connecting to {}", peer);
        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((peer.host.as_str(), peer.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(peer.clone()))??;
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpLink::new(stream)))
    }
}

/// A TCP connection carrying IPA frames
pub struct TcpLink {
    stream: TcpStream,
    rx_buf: BytesMut,
}

impl TcpLink {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            rx_buf: BytesMut::with_capacity(4096),
        }
    }
}

#[async_trait]
impl Link for TcpLink {
    async fn send(&mut self, frame: &IpaFrame) -> Result<()> {
        let data = ipa::encode(frame)?;
        self.stream.write_all(&data).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<IpaFrame>> {
        loop {
            if let Some(frame) = ipa::decode(&mut self.rx_buf)? {
                return Ok(Some(frame));
            }
            // read_buf only appends, so dropping this future loses nothing.
            let n = self.stream.read_buf(&mut self.rx_buf).await?;
            if n == 0 {
                if !self.rx_buf.is_empty() {
                    trace!("Discarding {} bytes of partial frame", self.rx_buf.len());
                }
                return Ok(None);
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
