//! IPA framing
//!
//! GSUP travels over TCP inside IPA frames:
//!
//! ```text
//! +--------+--------+-------+---------------------+
//! | len_hi | len_lo | proto | payload (len bytes) |
//! +--------+--------+-------+---------------------+
//! ```
//!
//! Protocol `0xfe` carries CCM keepalive and identity messages. Protocol
//! `0xee` is the Osmocom extension: the first payload byte selects GSUP or
//! OAP and is counted in `len`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the IPA header
pub const IPA_HEADER_LEN: usize = 3;

/// Largest payload accepted from a peer (16KB)
pub const MAX_PAYLOAD_LEN: usize = 16384;

/// IPA protocol discriminators
pub mod proto {
    /// Connection control management
    pub const CCM: u8 = 0xfe;
    /// Osmocom extension, followed by an extension byte
    pub const OSMO: u8 = 0xee;
}

/// Osmocom extension discriminators
pub mod ext {
    pub const GSUP: u8 = 0x05;
    pub const OAP: u8 = 0x06;
}

/// CCM message types
pub mod ccm {
    pub const PING: u8 = 0x00;
    pub const PONG: u8 = 0x01;
    pub const ID_GET: u8 = 0x04;
    pub const ID_RESP: u8 = 0x05;
    pub const ID_ACK: u8 = 0x06;
}

/// Identity tags used in ID_GET / ID_RESP
pub mod id_tag {
    pub const SERNR: u8 = 0x00;
    pub const UNITNAME: u8 = 0x01;
}

/// Errors that can occur while decoding IPA frames
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IpaCodecError {
    /// Announced payload larger than [`MAX_PAYLOAD_LEN`]
    #[error("IPA payload length {0} exceeds maximum allowed {MAX_PAYLOAD_LEN}")]
    PayloadTooLarge(usize),

    #[error("unknown IPA protocol: 0x{0:02x}")]
    UnknownProtocol(u8),

    #[error("unknown IPA/Osmocom extension: 0x{0:02x}")]
    UnknownExtension(u8),

    #[error("unknown CCM message type: 0x{0:02x}")]
    UnknownCcmMessage(u8),

    /// Payload shorter than its protocol requires
    #[error("truncated IPA {0}")]
    Truncated(&'static str),
}

/// Result type for IPA codec operations
pub type Result<T> = std::result::Result<T, IpaCodecError>;

/// One entry of an identity response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdEntry {
    pub tag: u8,
    pub value: String,
}

/// CCM message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CcmMessage {
    Ping,
    Pong,
    /// Identity request; the requested tags are not interpreted
    IdGet,
    IdResp(Vec<IdEntry>),
    IdAck,
}

impl CcmMessage {
    /// Identity response announcing `unit_name` as serial number and unit name.
    pub fn id_resp(unit_name: &str) -> Self {
        CcmMessage::IdResp(vec![
            IdEntry {
                tag: id_tag::SERNR,
                value: unit_name.to_string(),
            },
            IdEntry {
                tag: id_tag::UNITNAME,
                value: unit_name.to_string(),
            },
        ])
    }

    fn msg_type(&self) -> u8 {
        match self {
            CcmMessage::Ping => ccm::PING,
            CcmMessage::Pong => ccm::PONG,
            CcmMessage::IdGet => ccm::ID_GET,
            CcmMessage::IdResp(_) => ccm::ID_RESP,
            CcmMessage::IdAck => ccm::ID_ACK,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CcmMessage::Ping => "CCM PING",
            CcmMessage::Pong => "CCM PONG",
            CcmMessage::IdGet => "CCM ID_GET",
            CcmMessage::IdResp(_) => "CCM ID_RESP",
            CcmMessage::IdAck => "CCM ID_ACK",
        }
    }
}

/// A decoded IPA frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpaFrame {
    Ccm(CcmMessage),
    /// GSUP message (opaque)
    Gsup(Bytes),
    /// OAP message (opaque, consumed by the authentication handshake)
    Oap(Bytes),
}

impl IpaFrame {
    pub fn kind(&self) -> &'static str {
        match self {
            IpaFrame::Ccm(msg) => msg.name(),
            IpaFrame::Gsup(_) => "GSUP",
            IpaFrame::Oap(_) => "OAP",
        }
    }
}

/// Encodes a frame into a new buffer
pub fn encode(frame: &IpaFrame) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(64);
    encode_into(frame, &mut buf)?;
    Ok(buf.freeze())
}

/// Encodes a frame into an existing buffer
///
/// Frames whose payload exceeds [`MAX_PAYLOAD_LEN`] are rejected and leave
/// `buf` unchanged.
pub fn encode_into(frame: &IpaFrame, buf: &mut BytesMut) -> Result<()> {
    let start = buf.len();
    buf.put_u16(0);

    match frame {
        IpaFrame::Ccm(msg) => {
            buf.put_u8(proto::CCM);
            buf.put_u8(msg.msg_type());
            match msg {
                CcmMessage::IdGet => {
                    for tag in [id_tag::SERNR, id_tag::UNITNAME] {
                        buf.put_u8(0x01);
                        buf.put_u8(tag);
                    }
                }
                CcmMessage::IdResp(entries) => {
                    for entry in entries {
                        // length covers tag, value and the trailing NUL
                        buf.put_u16((entry.value.len() + 2) as u16);
                        buf.put_u8(entry.tag);
                        buf.extend_from_slice(entry.value.as_bytes());
                        buf.put_u8(0);
                    }
                }
                _ => {}
            }
        }
        IpaFrame::Gsup(payload) => {
            buf.put_u8(proto::OSMO);
            buf.put_u8(ext::GSUP);
            buf.extend_from_slice(payload);
        }
        IpaFrame::Oap(payload) => {
            buf.put_u8(proto::OSMO);
            buf.put_u8(ext::OAP);
            buf.extend_from_slice(payload);
        }
    }

    let len = buf.len() - start - IPA_HEADER_LEN;
    if len > MAX_PAYLOAD_LEN {
        buf.truncate(start);
        return Err(IpaCodecError::PayloadTooLarge(len));
    }
    buf[start..start + 2].copy_from_slice(&(len as u16).to_be_bytes());
    Ok(())
}

/// Decodes one frame from the front of `buf`.
///
/// Returns `Ok(None)` and leaves `buf` untouched while the frame is still
/// incomplete. A complete frame is removed from `buf`.
pub fn decode(buf: &mut BytesMut) -> Result<Option<IpaFrame>> {
    if buf.len() < IPA_HEADER_LEN {
        return Ok(None);
    }
    let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(IpaCodecError::PayloadTooLarge(len));
    }
    if buf.len() < IPA_HEADER_LEN + len {
        return Ok(None);
    }

    let mut frame = buf.split_to(IPA_HEADER_LEN + len);
    frame.advance(2);
    let protocol = frame.get_u8();
    let payload = frame.freeze();

    match protocol {
        proto::CCM => decode_ccm(payload).map(|msg| Some(IpaFrame::Ccm(msg))),
        proto::OSMO => {
            let mut payload = payload;
            if payload.is_empty() {
                return Err(IpaCodecError::Truncated("Osmocom extension"));
            }
            match payload.get_u8() {
                ext::GSUP => Ok(Some(IpaFrame::Gsup(payload))),
                ext::OAP => Ok(Some(IpaFrame::Oap(payload))),
                other => Err(IpaCodecError::UnknownExtension(other)),
            }
        }
        other => Err(IpaCodecError::UnknownProtocol(other)),
    }
}

fn decode_ccm(mut payload: Bytes) -> Result<CcmMessage> {
    if payload.is_empty() {
        return Err(IpaCodecError::Truncated("CCM"));
    }
    match payload.get_u8() {
        ccm::PING => Ok(CcmMessage::Ping),
        ccm::PONG => Ok(CcmMessage::Pong),
        ccm::ID_GET => Ok(CcmMessage::IdGet),
        ccm::ID_ACK => Ok(CcmMessage::IdAck),
        ccm::ID_RESP => decode_id_resp(payload).map(CcmMessage::IdResp),
        other => Err(IpaCodecError::UnknownCcmMessage(other)),
    }
}

fn decode_id_resp(mut payload: Bytes) -> Result<Vec<IdEntry>> {
    let mut entries = Vec::new();
    while payload.has_remaining() {
        if payload.remaining() < 3 {
            return Err(IpaCodecError::Truncated("ID_RESP entry"));
        }
        let len = payload.get_u16() as usize;
        if len < 1 || payload.remaining() < len {
            return Err(IpaCodecError::Truncated("ID_RESP entry"));
        }
        let tag = payload.get_u8();
        let raw = payload.split_to(len - 1);
        let value = raw.strip_suffix(&[0u8]).unwrap_or(&raw);
        entries.push(IdEntry {
            tag,
            value: String::from_utf8_lossy(value).into_owned(),
        });
    }
    Ok(entries)
}
