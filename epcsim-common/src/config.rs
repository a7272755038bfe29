//! Configuration structures for the MME
//!
//! This module provides the configuration types for the epcsim MME,
//! loadable from YAML.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Gummei, Plmn};

/// Default T3470 (identification retransmission) interval in seconds
/// (3GPP TS 24.301 Table 10.2.1).
pub const DEFAULT_T3470_INTERVAL_SECS: u32 = 6;

/// MME configuration.
///
/// Contains the network identity of the MME and the NAS timer intervals it
/// applies to new UE contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmeConfig {
    /// Serving PLMN
    pub plmn: Plmn,
    /// MME Group Identity (16 bits)
    pub mme_group_id: u16,
    /// MME Code (8 bits)
    pub mme_code: u8,
    /// T3470 interval in seconds for the identification procedure
    #[serde(default = "default_t3470_interval")]
    pub t3470_interval_secs: u32,
}

fn default_t3470_interval() -> u32 {
    DEFAULT_T3470_INTERVAL_SECS
}

impl Default for MmeConfig {
    fn default() -> Self {
        Self {
            plmn: Plmn::default(),
            mme_group_id: 0x8001,
            mme_code: 0x01,
            t3470_interval_secs: DEFAULT_T3470_INTERVAL_SECS,
        }
    }
}

impl MmeConfig {
    /// Loads an MME configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parses an MME configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.plmn.has_value() {
            return Err(Error::Config("PLMN must be set".into()));
        }
        if self.t3470_interval_secs == 0 {
            return Err(Error::Config("T3470 interval must be non-zero".into()));
        }
        Ok(())
    }

    /// Returns the GUMMEI this MME stamps into assigned GUTIs.
    pub fn gummei(&self) -> Gummei {
        Gummei::new(self.plmn, self.mme_group_id, self.mme_code)
    }
}

impl fmt::Display for MmeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MME {} (T3470 {}s)",
            self.gummei(),
            self.t3470_interval_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = MmeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.t3470_interval_secs, DEFAULT_T3470_INTERVAL_SECS);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r"
plmn:
  mcc: 208
  mnc: 93
  long_mnc: false
mme_group_id: 4
mme_code: 1
";
        let config = MmeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.plmn, Plmn::new(208, 93, false));
        assert_eq!(config.mme_group_id, 4);
        // Omitted interval falls back to the 24.301 default
        assert_eq!(config.t3470_interval_secs, DEFAULT_T3470_INTERVAL_SECS);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let yaml = r"
plmn:
  mcc: 1
  mnc: 1
  long_mnc: false
mme_group_id: 1
mme_code: 1
t3470_interval_secs: 0
";
        assert!(MmeConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_gummei_from_config() {
        let config = MmeConfig::default();
        let gummei = config.gummei();
        assert_eq!(gummei.plmn, config.plmn);
        assert_eq!(gummei.mme_group_id, config.mme_group_id);
        assert_eq!(gummei.mme_code, config.mme_code);
    }
}
