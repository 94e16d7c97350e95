//! # RV-3032-C7 Real-Time Clock Driver
//!
//! Driver core for the Micro Crystal RV-3032-C7, a high-precision RTC with
//! an I2C interface, battery backup, and EEPROM-backed configuration.
//!
//! ## Features
//!
//! - **Calendar**: validated date/time and Unix timestamp conversion over
//!   the 2000-2099 window of the BCD register format
//! - **Non-blocking persistence**: EEPROM configuration commits run one
//!   bus transaction per `tick()`, with a bounded pending-write queue
//! - **Health tracking**: every tracked bus transaction feeds an
//!   availability state machine (`Ready`/`Degraded`/`Offline`)
//! - **Alarm, timer, clock output, calibration, event input**: the full
//!   feature surface of the device
//! - **Embedded-friendly**: no heap allocations, bounded memory usage,
//!   transport injected by the application
//!
//! ## Quick Start
//!
//! ```rust
//! use rv3032::{Config, Rv3032, Transport, TransportError};
//!
//! // The application provides the byte-level bus transport.
//! struct Bus;
//!
//! impl Transport for Bus {
//!     fn write(&mut self, _addr: u8, _bytes: &[u8], _timeout_ms: u32)
//!         -> Result<(), TransportError> {
//!         Ok(())
//!     }
//!     fn write_read(&mut self, _addr: u8, _tx: &[u8], rx: &mut [u8], _timeout_ms: u32)
//!         -> Result<(), TransportError> {
//!         rx.fill(0);
//!         Ok(())
//!     }
//! }
//!
//! let mut rtc = Rv3032::new(Bus);
//! rtc.begin(Config::default()).expect("RTC init failed");
//!
//! // Cooperative update from the application's loop; completes any
//! // pending EEPROM work one step at a time.
//! rtc.tick(0);
//!
//! if let Ok(now) = rtc.read_time() {
//!     println!("{now}");
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`driver`] - `Rv3032` facade: lifecycle and feature operations
//! - [`transport`] - bus contract plus raw/tracked access disciplines
//! - [`health`] - availability state machine fed by tracked transactions
//! - [`eeprom`] - deadline-driven persistence engine and pending queue
//! - [`calendar`] - BCD/calendar/Unix codec
//! - [`config`] - validated configuration surface
//! - [`registers`] - device register map
//!
//! Single-threaded by design: no locking, no internal tasks. Wrap the
//! driver in external synchronization for multi-threaded access.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod calendar;
pub mod config;
pub mod driver;
pub mod eeprom;
pub mod health;
pub mod registers;
pub mod status;
pub mod transport;

// Re-export the main public types for convenience
pub use calendar::DateTime;
pub use config::{BackupSwitchMode, Config};
pub use driver::{
    AlarmConfig, ClkoutFrequency, EviConfig, EviDebounce, Rv3032, StatusFlags, TimerConfig,
    TimerFrequency, ValidityFlags,
};
pub use eeprom::{NvmStats, NVM_QUEUE_CAPACITY};
pub use health::{DriverState, HealthStats};
pub use status::{Error, ErrorKind, WriteOutcome};
pub use transport::{Transport, TransportError};
