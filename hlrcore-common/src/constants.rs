//! Numbering-plan and credential policy constants.
//!
//! Length bounds for identities, serving-node addresses and key material,
//! plus GSUP timer defaults.

use std::time::Duration;

/// Minimum number of digits in an IMSI (3GPP TS 23.003).
pub const IMSI_MIN_DIGITS: usize = 6;
/// Maximum number of digits in an IMSI (3GPP TS 23.003).
pub const IMSI_MAX_DIGITS: usize = 15;

/// Minimum number of digits in an MSISDN.
pub const MSISDN_MIN_DIGITS: usize = 1;
/// Maximum number of digits in an MSISDN (E.164).
pub const MSISDN_MAX_DIGITS: usize = 15;

/// Maximum length of a stored VLR or SGSN number.
pub const MAX_SERVING_NODE_NUMBER_LEN: usize = 31;
/// Maximum length of a stored SGSN address (global title digits).
pub const MAX_SGSN_ADDRESS_LEN: usize = 15;

/// Length of Ki, K, OP and OPc in bytes.
pub const KEY_LEN: usize = 16;
/// Length of Ki, K, OP and OPc as hex digits.
pub const KEY_HEX_DIGITS: usize = KEY_LEN * 2;

/// Largest SQN index bit length MILENAGE accepts.
pub const MILENAGE_IND_BITLEN_MAX: u8 = 28;
/// SQN index bit length used when none is given.
pub const DEFAULT_IND_BITLEN: u8 = 5;

/// Well-known TCP port of a GSUP server.
pub const DEFAULT_GSUP_PORT: u16 = 4222;

/// Delay between connection attempts while a GSUP link is down.
pub const GSUP_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);
/// Interval between IPA PINGs on an established GSUP link.
pub const GSUP_PING_INTERVAL: Duration = Duration::from_secs(20);
/// Upper bound for a single TCP connect attempt.
pub const GSUP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest 48-bit UMTS sequence number.
pub const MAX_SQN: u64 = (1 << 48) - 1;
