//! Core EPS types: UE identifier, PLMN, IMSI, IMEI, GUMMEI, GUTI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Network-assigned UE identifier used by the NAS layer.
///
/// Assigned by the lower layers when the UE establishes a signalling
/// connection, and used as the correlation key into the EMM context store
/// and the common-procedure registry. Not reused while a procedure for the
/// UE is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UeId(pub u32);

impl fmt::Display for UeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ue-{}", self.0)
    }
}

/// Public Land Mobile Network identifier.
///
/// A PLMN uniquely identifies a mobile network and consists of:
/// - MCC (Mobile Country Code): 3 decimal digits (001-999)
/// - MNC (Mobile Network Code): 2 or 3 decimal digits
///
/// The `long_mnc` field indicates whether the MNC uses 3 digits (true) or 2 digits (false).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plmn {
    /// Mobile Country Code (3 digits, range 0-999)
    pub mcc: u16,
    /// Mobile Network Code (2-3 digits, range 0-999)
    pub mnc: u16,
    /// True if MNC is 3 digits, false if 2 digits
    pub long_mnc: bool,
}

impl Plmn {
    /// Creates a new PLMN with the given MCC and MNC.
    pub const fn new(mcc: u16, mnc: u16, long_mnc: bool) -> Self {
        Self { mcc, mnc, long_mnc }
    }

    /// Returns true if this PLMN has valid values set.
    pub fn has_value(&self) -> bool {
        self.mcc > 0 || self.mnc > 0
    }
}

impl fmt::Debug for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.long_mnc {
            write!(f, "Plmn({:03}-{:03})", self.mcc, self.mnc)
        } else {
            write!(f, "Plmn({:03}-{:02})", self.mcc, self.mnc)
        }
    }
}

impl fmt::Display for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.long_mnc {
            write!(f, "{:03}{:03}", self.mcc, self.mnc)
        } else {
            write!(f, "{:03}{:02}", self.mcc, self.mnc)
        }
    }
}

impl Default for Plmn {
    fn default() -> Self {
        Self::new(1, 1, false)
    }
}

/// International Mobile Subscriber Identity (permanent subscriber identity).
///
/// Stored as the decimal digit string (MCC + MNC + MSIN, up to 15 digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Imsi {
    digits: String,
}

impl Imsi {
    /// Creates an IMSI from a decimal digit string.
    ///
    /// Returns `None` if the string is empty, longer than 15 characters,
    /// or contains non-digit characters.
    pub fn new(digits: &str) -> Option<Self> {
        if digits.is_empty() || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            digits: digits.to_owned(),
        })
    }

    /// Returns the digit string.
    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl fmt::Display for Imsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digits)
    }
}

/// International Mobile Equipment Identity (equipment identity).
///
/// Stored as the decimal digit string (TAC + SNR + spare/SV digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Imei {
    digits: String,
}

impl Imei {
    /// Creates an IMEI from a decimal digit string.
    ///
    /// Returns `None` if the string is empty, longer than 16 characters
    /// (IMEISV), or contains non-digit characters.
    pub fn new(digits: &str) -> Option<Self> {
        if digits.is_empty() || digits.len() > 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            digits: digits.to_owned(),
        })
    }

    /// Returns the digit string.
    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl fmt::Display for Imei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digits)
    }
}

/// Globally Unique MME Identifier.
///
/// 3GPP TS 23.003 Section 2.8.1: PLMN + MME Group ID + MME Code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gummei {
    /// Serving PLMN
    pub plmn: Plmn,
    /// MME Group Identity (16 bits)
    pub mme_group_id: u16,
    /// MME Code (8 bits)
    pub mme_code: u8,
}

impl Gummei {
    /// Creates a new GUMMEI.
    pub const fn new(plmn: Plmn, mme_group_id: u16, mme_code: u8) -> Self {
        Self {
            plmn,
            mme_group_id,
            mme_code,
        }
    }
}

impl fmt::Display for Gummei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:04x}:{:02x}", self.plmn, self.mme_group_id, self.mme_code)
    }
}

/// Globally Unique Temporary Identity.
///
/// 3GPP TS 23.003 Section 2.8: the network-assigned routing part (GUMMEI)
/// combined with the MME-assigned M-TMSI short identifier. Used in place of
/// the IMSI for privacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guti {
    /// Routing part identifying the assigning MME
    pub gummei: Gummei,
    /// MME-local temporary identifier (32 bits)
    pub m_tmsi: u32,
}

impl Guti {
    /// Creates a new GUTI.
    pub const fn new(gummei: Gummei, m_tmsi: u32) -> Self {
        Self { gummei, m_tmsi }
    }
}

impl fmt::Display for Guti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:08x}", self.gummei, self.m_tmsi)
    }
}
