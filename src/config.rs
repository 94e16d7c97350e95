use serde::{Deserialize, Serialize};

use crate::registers;
use crate::status::{Error, ErrorKind};

/// Minimum transaction timeout when EEPROM persistence is enabled; the
/// commit sequence polls the busy flag against this deadline.
pub const MIN_I2C_TIMEOUT_FOR_NVM_MS: u32 = 50;

/// Battery backup switchover behavior, applied during `begin()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupSwitchMode {
    /// No backup switching (no battery fitted).
    Off,
    /// Threshold-based switching (recommended).
    Level,
    /// Instant switchover.
    Direct,
}

/// Driver configuration.
///
/// Validated once in `begin()` and immutable afterwards. The bus transport
/// itself is injected separately as the driver's type parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// 7-bit bus address. The RV-3032-C7 address is fixed in hardware;
    /// any value other than 0x51 is rejected.
    pub i2c_address: u8,
    /// Per-transaction timeout in milliseconds, passed through to the
    /// transport. Must be > 0, and >= 50 when EEPROM writes are enabled.
    pub i2c_timeout_ms: u32,
    /// Backup switchover mode written to the PMU register during `begin()`.
    pub backup_mode: BackupSwitchMode,
    /// Persist configuration changes to EEPROM. Off by default: changes
    /// are volatile-only, which is faster and saves EEPROM endurance
    /// (~100k writes). When on, mutating operations may return
    /// `WriteOutcome::Pending` until `tick()` completes the commit.
    pub enable_nvm_writes: bool,
    /// Deadline for one EEPROM commit cycle in milliseconds. Must be > 0
    /// when EEPROM writes are enabled.
    pub nvm_timeout_ms: u32,
    /// Consecutive tracked-transaction failures before the driver reports
    /// `Offline`. Values below 1 are clamped to 1 during `begin()`.
    pub offline_threshold: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            i2c_address: registers::I2C_ADDR_7BIT,
            i2c_timeout_ms: 50,
            backup_mode: BackupSwitchMode::Level,
            enable_nvm_writes: false,
            nvm_timeout_ms: 200,
            offline_threshold: 5,
        }
    }
}

impl Config {
    /// Validate without mutating anything; `begin()` calls this before it
    /// touches driver state or the bus.
    pub fn validate(&self) -> Result<(), Error> {
        if self.i2c_address != registers::I2C_ADDR_7BIT {
            return Err(Error::new(
                ErrorKind::InvalidConfig,
                "RV3032 bus address must be 0x51",
            ));
        }
        if self.i2c_timeout_ms == 0 {
            return Err(Error::new(
                ErrorKind::InvalidConfig,
                "bus timeout must be > 0",
            ));
        }
        if self.enable_nvm_writes {
            if self.nvm_timeout_ms == 0 {
                return Err(Error::new(
                    ErrorKind::InvalidConfig,
                    "EEPROM timeout must be > 0",
                ));
            }
            if self.i2c_timeout_ms < MIN_I2C_TIMEOUT_FOR_NVM_MS {
                return Err(Error::new(
                    ErrorKind::InvalidConfig,
                    "bus timeout must be >= 50ms for EEPROM writes",
                ));
            }
        }
        Ok(())
    }

    /// Copy with out-of-range fields clamped; applied after validation.
    pub(crate) fn clamped(mut self) -> Self {
        if self.offline_threshold < 1 {
            self.offline_threshold = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_wrong_address_rejected() {
        let config = Config {
            i2c_address: 0x52,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config {
            i2c_timeout_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nvm_requires_long_bus_timeout() {
        let config = Config {
            enable_nvm_writes: true,
            i2c_timeout_ms: 20,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            enable_nvm_writes: true,
            i2c_timeout_ms: 50,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_nvm_timeout_rejected_when_enabled() {
        let config = Config {
            enable_nvm_writes: true,
            nvm_timeout_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        // Ignored while persistence is off.
        let config = Config {
            enable_nvm_writes: false,
            nvm_timeout_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_offline_threshold_clamped() {
        let config = Config {
            offline_threshold: 0,
            ..Config::default()
        }
        .clamped();
        assert_eq!(config.offline_threshold, 1);
    }
}
