//! RV-3032-C7 register map and bit definitions.
//!
//! Addresses and bit positions follow the RV-3032-C7 Application Manual.
//! Calendar registers hold BCD values unless noted otherwise.

// ===== Time / Calendar (volatile, auto-incrementing from REG_SECONDS) =====

/// 100th seconds register (read-only, not used by this driver).
pub const REG_100TH_SECONDS: u8 = 0x00;
/// Seconds, BCD 0-59.
pub const REG_SECONDS: u8 = 0x01;
/// Minutes, BCD 0-59.
pub const REG_MINUTES: u8 = 0x02;
/// Hours, BCD 0-23 (24-hour mode).
pub const REG_HOURS: u8 = 0x03;
/// Weekday, binary index 0-6 in bits 2..0, 0 = Sunday.
///
/// The device accepts any free-running 3-bit counter here; this driver
/// always writes the computed Sunday-based index.
pub const REG_WEEKDAY: u8 = 0x04;
/// Day of month, BCD 1-31.
pub const REG_DATE: u8 = 0x05;
/// Month, BCD 1-12.
pub const REG_MONTH: u8 = 0x06;
/// Year within century, BCD 00-99.
pub const REG_YEAR: u8 = 0x07;

// ===== Alarm (0x08-0x0A, bit 7 of each = AE_x match-disable flag) =====

pub const REG_ALARM_MINUTE: u8 = 0x08;
pub const REG_ALARM_HOUR: u8 = 0x09;
pub const REG_ALARM_DATE: u8 = 0x0A;

// ===== Periodic countdown timer =====

/// Timer preset low byte.
pub const REG_TIMER_LOW: u8 = 0x0B;
/// Timer preset high byte; only bits 3..0 belong to the timer.
pub const REG_TIMER_HIGH: u8 = 0x0C;

// ===== Status and temperature =====

/// Status register, flag bits defined below.
pub const REG_STATUS: u8 = 0x0D;
/// Temperature LSBs; also carries the EEPROM busy/error and backup flags.
pub const REG_TEMP_LSB: u8 = 0x0E;
/// Temperature MSBs, two's complement integer degrees.
pub const REG_TEMP_MSB: u8 = 0x0F;

// ===== Control =====

pub const REG_CONTROL1: u8 = 0x10;
pub const REG_CONTROL2: u8 = 0x11;
/// Timestamp control (event capture behavior).
pub const REG_TS_CONTROL: u8 = 0x13;
/// External event input control.
pub const REG_EVI_CONTROL: u8 = 0x15;

// ===== EEPROM access window =====

/// EEPROM address pointer for manual byte access.
pub const REG_EE_ADDRESS: u8 = 0x3D;
/// EEPROM data byte for manual access.
pub const REG_EE_DATA: u8 = 0x3E;
/// EEPROM command register (write-only).
pub const REG_EE_COMMAND: u8 = 0x3F;

// ===== EEPROM-backed configuration registers (volatile mirrors) =====

/// Power management unit: CLKOUT enable and backup switch mode.
pub const REG_EEPROM_PMU: u8 = 0xC0;
/// Crystal frequency offset (calibration).
pub const REG_EEPROM_OFFSET: u8 = 0xC1;
/// CLKOUT frequency selection.
pub const REG_EEPROM_CLKOUT2: u8 = 0xC3;

// ===== Status register bits (REG_STATUS) =====

pub const STATUS_VLF_BIT: u8 = 0; // voltage low
pub const STATUS_PORF_BIT: u8 = 1; // power-on reset
pub const STATUS_EVF_BIT: u8 = 2; // external event
pub const STATUS_AF_BIT: u8 = 3; // alarm
pub const STATUS_TF_BIT: u8 = 4; // periodic timer
pub const STATUS_UF_BIT: u8 = 5; // periodic time update
pub const STATUS_TLF_BIT: u8 = 6; // temperature low
pub const STATUS_THF_BIT: u8 = 7; // temperature high

// ===== Control 1 bits (REG_CONTROL1) =====

/// EEPROM memory refresh disable; set while manual EEPROM access runs.
pub const CTRL1_EERD_BIT: u8 = 2;
/// Periodic countdown timer enable.
pub const CTRL1_TE_BIT: u8 = 3;
/// Timer clock frequency selection, bits 1..0.
pub const CTRL1_TD_MASK: u8 = 0x03;

// ===== Control 2 bits (REG_CONTROL2) =====

/// Alarm interrupt enable.
pub const CTRL2_AIE_BIT: u8 = 2;

// ===== Timestamp control bits (REG_TS_CONTROL) =====

/// Event timestamp overwrite enable.
pub const TS_OVERWRITE_BIT: u8 = 2;

// ===== EVI control bits (REG_EVI_CONTROL) =====

/// Edge selection: 0 = falling, 1 = rising.
pub const EVI_EB_BIT: u8 = 6;
/// Debounce filter selection, bits 5..4.
pub const EVI_DB_MASK: u8 = 0x30;
pub const EVI_DB_SHIFT: u8 = 4;

// ===== PMU bits (REG_EEPROM_PMU) =====

/// CLKOUT pin disable (inverted enable).
pub const PMU_CLKOUT_DISABLE: u8 = 0x40;
/// Backup switchover mode field, bits 5..4.
pub const PMU_BSM_MASK: u8 = 0x30;
pub const PMU_BSM_LEVEL: u8 = 0x20;
pub const PMU_BSM_DIRECT: u8 = 0x10;

// ===== CLKOUT bits (REG_EEPROM_CLKOUT2) =====

pub const CLKOUT_FREQ_MASK: u8 = 0x60;
pub const CLKOUT_FREQ_SHIFT: u8 = 5;

// ===== Temperature LSB auxiliary bits (REG_TEMP_LSB) =====

/// Backup power switchover occurred.
pub const TEMP_BSF_BIT: u8 = 0;
/// EEPROM busy: a memory refresh or manual write is running.
pub const EEPROM_BUSY_BIT: u8 = 2;
/// EEPROM error: the last write did not verify.
pub const EEPROM_ERROR_BIT: u8 = 3;

// ===== EEPROM commands =====

/// Commit the staged address/data byte to EEPROM.
pub const EEPROM_CMD_UPDATE: u8 = 0x21;

/// Fixed 7-bit I2C address; the RV-3032-C7 address is not configurable.
pub const I2C_ADDR_7BIT: u8 = 0x51;
