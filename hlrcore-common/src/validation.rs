//! Identity and credential validation
//!
//! Pure predicates applied before any storage access. All checks fail
//! closed: anything that is not exactly what is expected is rejected.

use thiserror::Error;

use crate::constants::{
    IMSI_MAX_DIGITS, IMSI_MIN_DIGITS, KEY_HEX_DIGITS, MILENAGE_IND_BITLEN_MAX, MSISDN_MAX_DIGITS,
    MSISDN_MIN_DIGITS,
};
use crate::types::{AuthAlgorithm, AuthDomain, AuthVector};

/// Reasons an identity or credential set is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid IMSI: '{0}'")]
    InvalidImsi(String),

    #[error("invalid MSISDN: '{0}'")]
    InvalidMsisdn(String),

    #[error("auth algorithm not suited for {domain}: {algorithm}")]
    AlgorithmNotSuited {
        domain: AuthDomain,
        algorithm: AuthAlgorithm,
    },

    /// Key material is never echoed back, only its field name and length.
    #[error("invalid {field}: expected {KEY_HEX_DIGITS} hex digits, got {len} characters")]
    InvalidKey { field: &'static str, len: usize },

    #[error("invalid ind_bitlen: {0} (max {MILENAGE_IND_BITLEN_MAX})")]
    IndBitlenTooLarge(u8),

    #[error("invalid {field}: '{value}' exceeds {max} characters or contains NUL")]
    InvalidAddress {
        field: &'static str,
        value: String,
        max: usize,
    },
}

fn is_digit_string(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Returns true if `imsi` is 6 to 15 decimal digits.
pub fn is_valid_imsi(imsi: &str) -> bool {
    is_digit_string(imsi, IMSI_MIN_DIGITS, IMSI_MAX_DIGITS)
}

/// Returns true if `msisdn` is 1 to 15 decimal digits.
pub fn is_valid_msisdn(msisdn: &str) -> bool {
    is_digit_string(msisdn, MSISDN_MIN_DIGITS, MSISDN_MAX_DIGITS)
}

/// Checks that `s` consists only of hex digits, with a digit count within
/// `min_digits..=max_digits`. With `require_even`, odd counts are rejected
/// so the string always maps onto whole bytes.
pub fn is_valid_hex(s: &str, min_digits: usize, max_digits: usize, require_even: bool) -> bool {
    let len = s.len();
    if len < min_digits || len > max_digits {
        return false;
    }
    if require_even && len % 2 != 0 {
        return false;
    }
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Whether `algorithm` may be stored in the `domain` slot.
///
/// `None` fits both slots. The 2G and 3G algorithm families are disjoint.
pub fn algorithm_is_compatible(domain: AuthDomain, algorithm: AuthAlgorithm) -> bool {
    match algorithm {
        AuthAlgorithm::None => true,
        AuthAlgorithm::Comp128v1
        | AuthAlgorithm::Comp128v2
        | AuthAlgorithm::Comp128v3
        | AuthAlgorithm::Xor => domain == AuthDomain::Gsm,
        AuthAlgorithm::Milenage => domain == AuthDomain::Umts,
    }
}

fn check_key(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if is_valid_hex(value, KEY_HEX_DIGITS, KEY_HEX_DIGITS, true) {
        Ok(())
    } else {
        Err(ValidationError::InvalidKey {
            field,
            len: value.len(),
        })
    }
}

/// Full pre-storage validation of a credential set.
///
/// Vectors with algorithm `None` only need to be compatible; their key
/// fields are ignored.
pub fn validate_vector(vector: &AuthVector) -> Result<(), ValidationError> {
    let domain = vector.domain();
    let algorithm = vector.algorithm();
    if !algorithm_is_compatible(domain, algorithm) {
        return Err(ValidationError::AlgorithmNotSuited { domain, algorithm });
    }
    if algorithm == AuthAlgorithm::None {
        return Ok(());
    }

    match vector {
        AuthVector::Gsm(aud) => check_key("KI", &aud.ki),
        AuthVector::Umts(aud) => {
            check_key("K", &aud.k)?;
            check_key("OP/OPC", &aud.op_or_opc)?;
            if aud.ind_bitlen > MILENAGE_IND_BITLEN_MAX {
                return Err(ValidationError::IndBitlenTooLarge(aud.ind_bitlen));
            }
            Ok(())
        }
    }
}

/// Checks a free-form serving node number or address against a length bound.
pub fn validate_address(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.len() > max || value.contains('\0') {
        return Err(ValidationError::InvalidAddress {
            field,
            value: value.escape_default().to_string(),
            max,
        });
    }
    Ok(())
}
