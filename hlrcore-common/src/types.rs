//! Core HLR types: authentication algorithms, domains and credential sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_IND_BITLEN;

/// Authentication algorithm stored for a subscriber.
///
/// The numeric identifiers are the values persisted in the `algo_id_2g` and
/// `algo_id_3g` columns and match the common authentication algorithm
/// enumeration used by GSM/UMTS core network tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthAlgorithm {
    /// No credential present
    #[default]
    None,
    /// COMP128 version 1 (2G)
    Comp128v1,
    /// COMP128 version 2 (2G)
    Comp128v2,
    /// COMP128 version 3 (2G)
    Comp128v3,
    /// XOR test algorithm (2G)
    Xor,
    /// MILENAGE (3G)
    Milenage,
}

impl AuthAlgorithm {
    /// Returns the persisted numeric identifier.
    pub const fn id(self) -> i64 {
        match self {
            AuthAlgorithm::None => 0,
            AuthAlgorithm::Comp128v1 => 1,
            AuthAlgorithm::Comp128v2 => 2,
            AuthAlgorithm::Comp128v3 => 3,
            AuthAlgorithm::Xor => 4,
            AuthAlgorithm::Milenage => 5,
        }
    }

    /// Maps a persisted identifier back to an algorithm.
    pub const fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(AuthAlgorithm::None),
            1 => Some(AuthAlgorithm::Comp128v1),
            2 => Some(AuthAlgorithm::Comp128v2),
            3 => Some(AuthAlgorithm::Comp128v3),
            4 => Some(AuthAlgorithm::Xor),
            5 => Some(AuthAlgorithm::Milenage),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            AuthAlgorithm::None => "none",
            AuthAlgorithm::Comp128v1 => "COMP128v1",
            AuthAlgorithm::Comp128v2 => "COMP128v2",
            AuthAlgorithm::Comp128v3 => "COMP128v3",
            AuthAlgorithm::Xor => "XOR",
            AuthAlgorithm::Milenage => "MILENAGE",
        }
    }

    /// Returns true unless this is [`AuthAlgorithm::None`].
    pub fn is_some(self) -> bool {
        self != AuthAlgorithm::None
    }
}

impl fmt::Display for AuthAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AuthAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(AuthAlgorithm::None),
            "comp128v1" => Ok(AuthAlgorithm::Comp128v1),
            "comp128v2" => Ok(AuthAlgorithm::Comp128v2),
            "comp128v3" => Ok(AuthAlgorithm::Comp128v3),
            "xor" => Ok(AuthAlgorithm::Xor),
            // Older tooling spells it "milanage"
            "milenage" | "milanage" => Ok(AuthAlgorithm::Milenage),
            _ => Err(format!("unknown auth algorithm: {s}")),
        }
    }
}

/// Credential slot a vector belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthDomain {
    /// 2G (GSM) credentials, table `auc_2g`
    Gsm,
    /// 3G (UMTS) credentials, table `auc_3g`
    Umts,
}

impl AuthDomain {
    /// Name of the table holding this slot.
    pub const fn table(self) -> &'static str {
        match self {
            AuthDomain::Gsm => "auc_2g",
            AuthDomain::Umts => "auc_3g",
        }
    }
}

impl fmt::Display for AuthDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthDomain::Gsm => write!(f, "2G"),
            AuthDomain::Umts => write!(f, "3G"),
        }
    }
}

/// Core network service domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CnDomain {
    /// Circuit-switched (served by a VLR)
    Cs,
    /// Packet-switched (served by an SGSN)
    Ps,
}

impl fmt::Display for CnDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CnDomain::Cs => write!(f, "CS"),
            CnDomain::Ps => write!(f, "PS"),
        }
    }
}

/// Whether a 3G operator key is stored as OP or as the derived OPc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OpType {
    /// Operator key (OP), converted to OPc per authentication
    Op,
    /// Operator key derived with K (OPc), used directly
    #[default]
    Opc,
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpType::Op => write!(f, "OP"),
            OpType::Opc => write!(f, "OPC"),
        }
    }
}

/// 2G credential set.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aud2g {
    pub algorithm: AuthAlgorithm,
    /// Ki as 32 hex digits
    pub ki: String,
}

impl Aud2g {
    pub fn new(algorithm: AuthAlgorithm, ki: impl Into<String>) -> Self {
        Self {
            algorithm,
            ki: ki.into(),
        }
    }
}

// Key material stays out of logs.
impl fmt::Debug for Aud2g {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aud2g")
            .field("algorithm", &self.algorithm)
            .field("ki", &"<redacted>")
            .finish()
    }
}

/// 3G credential set.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aud3g {
    pub algorithm: AuthAlgorithm,
    /// K as 32 hex digits
    pub k: String,
    /// OP or OPc as 32 hex digits, see `op_type`
    pub op_or_opc: String,
    pub op_type: OpType,
    /// Number of SQN index bits
    pub ind_bitlen: u8,
}

impl Aud3g {
    pub fn new(
        algorithm: AuthAlgorithm,
        k: impl Into<String>,
        op_or_opc: impl Into<String>,
        op_type: OpType,
    ) -> Self {
        Self {
            algorithm,
            k: k.into(),
            op_or_opc: op_or_opc.into(),
            op_type,
            ind_bitlen: DEFAULT_IND_BITLEN,
        }
    }

    pub fn with_ind_bitlen(mut self, ind_bitlen: u8) -> Self {
        self.ind_bitlen = ind_bitlen;
        self
    }
}

impl Default for Aud3g {
    fn default() -> Self {
        Self {
            algorithm: AuthAlgorithm::None,
            k: String::new(),
            op_or_opc: String::new(),
            op_type: OpType::Opc,
            ind_bitlen: DEFAULT_IND_BITLEN,
        }
    }
}

impl fmt::Debug for Aud3g {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aud3g")
            .field("algorithm", &self.algorithm)
            .field("k", &"<redacted>")
            .field("op_type", &self.op_type)
            .field("ind_bitlen", &self.ind_bitlen)
            .finish()
    }
}

/// Credential set for one slot of a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthVector {
    Gsm(Aud2g),
    Umts(Aud3g),
}

impl AuthVector {
    /// An empty vector for `domain`; storing it clears the slot.
    pub fn none(domain: AuthDomain) -> Self {
        match domain {
            AuthDomain::Gsm => AuthVector::Gsm(Aud2g::default()),
            AuthDomain::Umts => AuthVector::Umts(Aud3g::default()),
        }
    }

    pub fn domain(&self) -> AuthDomain {
        match self {
            AuthVector::Gsm(_) => AuthDomain::Gsm,
            AuthVector::Umts(_) => AuthDomain::Umts,
        }
    }

    pub fn algorithm(&self) -> AuthAlgorithm {
        match self {
            AuthVector::Gsm(aud) => aud.algorithm,
            AuthVector::Umts(aud) => aud.algorithm,
        }
    }
}
