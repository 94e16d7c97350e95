use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::{self, DateTime};
use crate::config::{BackupSwitchMode, Config};
use crate::eeprom::{NvmEngine, NvmStats};
use crate::health::{DriverState, HealthStats, HealthTracker};
use crate::registers as regs;
use crate::status::{Error, ErrorKind, WriteOutcome};
use crate::transport::Transport;

/// Clock output frequencies available on the CLKOUT pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClkoutFrequency {
    /// 32.768 kHz (crystal frequency).
    Hz32768,
    /// 1024 Hz.
    Hz1024,
    /// 64 Hz.
    Hz64,
    /// 1 Hz (one pulse per second).
    Hz1,
}

impl ClkoutFrequency {
    fn bits(self) -> u8 {
        match self {
            Self::Hz32768 => 0,
            Self::Hz1024 => 1,
            Self::Hz64 => 2,
            Self::Hz1 => 3,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Hz32768,
            1 => Self::Hz1024,
            2 => Self::Hz64,
            _ => Self::Hz1,
        }
    }
}

/// Periodic countdown timer clock frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerFrequency {
    /// 4096 Hz.
    Hz4096,
    /// 64 Hz.
    Hz64,
    /// 1 Hz (one tick per second).
    Hz1,
    /// 1/60 Hz (one tick per minute).
    PerMinute,
}

impl TimerFrequency {
    fn bits(self) -> u8 {
        match self {
            Self::Hz4096 => 0,
            Self::Hz64 => 1,
            Self::Hz1 => 2,
            Self::PerMinute => 3,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & regs::CTRL1_TD_MASK {
            0 => Self::Hz4096,
            1 => Self::Hz64,
            2 => Self::Hz1,
            _ => Self::PerMinute,
        }
    }
}

/// External event input debounce filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EviDebounce {
    /// No debouncing (immediate capture).
    None,
    /// 256 Hz sampling.
    Hz256,
    /// 64 Hz sampling.
    Hz64,
    /// 8 Hz sampling, for slow mechanical switches.
    Hz8,
}

impl EviDebounce {
    fn bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Hz256 => 1,
            Self::Hz64 => 2,
            Self::Hz8 => 3,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::None,
            1 => Self::Hz256,
            2 => Self::Hz64,
            _ => Self::Hz8,
        }
    }
}

/// Alarm configuration as stored on the device. Each time component can
/// be individually enabled for matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Alarm minute, 0-59.
    pub minute: u8,
    /// Alarm hour, 0-23.
    pub hour: u8,
    /// Alarm day of month, 1-31.
    pub date: u8,
    pub match_minute: bool,
    pub match_hour: bool,
    pub match_date: bool,
}

/// Countdown timer configuration readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Remaining/preset tick count, 0-4095.
    pub ticks: u16,
    pub frequency: TimerFrequency,
    pub enabled: bool,
}

/// External event input configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EviConfig {
    /// Trigger on rising edge (falling otherwise).
    pub rising: bool,
    pub debounce: EviDebounce,
    /// Allow a new event to overwrite a stored timestamp.
    pub overwrite: bool,
}

/// Decoded status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub temp_high: bool,
    pub temp_low: bool,
    pub update: bool,
    pub timer: bool,
    pub alarm: bool,
    pub event: bool,
    pub power_on_reset: bool,
    pub voltage_low: bool,
}

/// Power/clock validity summary.
///
/// `time_invalid` is derived: a power-on reset or low-voltage event means
/// the calendar contents can no longer be trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityFlags {
    pub voltage_low: bool,
    pub power_on_reset: bool,
    pub backup_switched: bool,
    pub time_invalid: bool,
}

/// Driver for the RV-3032-C7 real-time clock.
///
/// Owns the injected bus transport and follows a begin/tick/end lifecycle:
/// `begin()` validates configuration and probes the device, `tick()`
/// advances the non-blocking EEPROM persistence engine, `end()` resets all
/// driver state. Every operation is synchronous and bounded; the only
/// multi-call work is EEPROM persistence, which progresses one bus
/// transaction per `tick()`.
///
/// Not thread-safe: the driver assumes exclusive ownership by one logical
/// caller.
pub struct Rv3032<T> {
    pub(crate) transport: T,
    pub(crate) config: Config,
    pub(crate) initialized: bool,
    pub(crate) begin_in_progress: bool,
    /// Caller's millisecond counter as last seen by `tick()`.
    pub(crate) now_ms: u32,
    pub(crate) health: HealthTracker,
    pub(crate) nvm: NvmEngine,
}

fn not_initialized() -> Error {
    Error::new(ErrorKind::NotInitialized, "call begin() first")
}

/// Bus-level failures during presence verification mean the device is
/// absent or unresponsive; everything else passes through unchanged.
fn map_presence_error(err: Error) -> Error {
    match err.kind {
        ErrorKind::Bus | ErrorKind::Timeout => Error {
            kind: ErrorKind::DeviceNotFound,
            detail: err.detail,
            message: "RTC not responding",
        },
        _ => err,
    }
}

impl<T: Transport> Rv3032<T> {
    /// Create a driver over `transport`. No bus traffic happens until
    /// `begin()`.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: Config::default(),
            initialized: false,
            begin_in_progress: false,
            now_ms: 0,
            health: HealthTracker::new(),
            nvm: NvmEngine::new(),
        }
    }

    /// Consume the driver and hand the transport back.
    pub fn release(self) -> T {
        self.transport
    }

    // ===== Lifecycle =====

    /// Initialize: validate `config`, verify device presence, apply the
    /// stored configuration, and transition to `Ready`.
    ///
    /// Nothing is mutated until validation passes. When EEPROM writes are
    /// enabled, configuration applied here may leave a commit pending;
    /// call `tick()` until `nvm_status()` settles.
    pub fn begin(&mut self, config: Config) -> Result<(), Error> {
        if self.initialized {
            self.end();
        }

        config.validate()?;
        let config = config.clamped();

        self.config = config;
        self.initialized = false;
        self.begin_in_progress = true;
        self.health.reset(config.offline_threshold);
        self.nvm.reset();

        debug!(address = config.i2c_address, "initializing RV-3032");

        if let Err(err) = self.probe() {
            self.begin_in_progress = false;
            return Err(err);
        }

        if let Err(err) = self.apply_config() {
            self.begin_in_progress = false;
            return Err(err);
        }

        self.initialized = true;
        self.begin_in_progress = false;
        self.health.mark_ready();
        debug!("RV-3032 ready");
        Ok(())
    }

    /// Cooperative update. Advances the EEPROM persistence engine by one
    /// bounded step; no-op while uninitialized.
    ///
    /// `now_ms` is the caller's free-running millisecond counter; it may
    /// wrap.
    pub fn tick(&mut self, now_ms: u32) {
        if !self.initialized {
            return;
        }
        self.now_ms = now_ms;
        self.process_nvm(now_ms);
    }

    /// Stop the driver and reset health and persistence state.
    pub fn end(&mut self) {
        debug!("RV-3032 stopped");
        self.initialized = false;
        self.begin_in_progress = false;
        self.nvm.reset();
        self.health.reset(self.config.offline_threshold);
        // No resources to release; the transport stays owned for reuse.
    }

    /// Raw presence check: reads a known register without touching health
    /// accounting, so monitoring tools can poll availability freely.
    pub fn probe(&mut self) -> Result<(), Error> {
        if !self.initialized && !self.begin_in_progress {
            return Err(not_initialized());
        }
        match self.read_register_raw(regs::REG_STATUS) {
            Ok(_) => Ok(()),
            Err(err) => Err(map_presence_error(err)),
        }
    }

    /// Manual recovery: verify presence with a raw probe, then re-apply
    /// the stored configuration through the tracked path so a successful
    /// attempt restores `Ready` through the normal health machinery.
    pub fn recover(&mut self) -> Result<(), Error> {
        if !self.initialized {
            return Err(not_initialized());
        }
        debug!("driver recovery requested");

        self.probe()?;
        self.apply_config()
    }

    /// Write the configured backup switchover mode into the PMU register,
    /// persistence-aware. A pending EEPROM commit counts as success.
    fn apply_config(&mut self) -> Result<(), Error> {
        let pmu = self.read_register_tracked(regs::REG_EEPROM_PMU)?;

        let mut updated = pmu & !regs::PMU_BSM_MASK;
        match self.config.backup_mode {
            BackupSwitchMode::Off => {}
            BackupSwitchMode::Level => updated |= regs::PMU_BSM_LEVEL,
            BackupSwitchMode::Direct => updated |= regs::PMU_BSM_DIRECT,
        }

        if updated != pmu {
            self.write_config_register(regs::REG_EEPROM_PMU, updated)?;
        }
        Ok(())
    }

    // ===== Introspection =====

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Active configuration (as clamped during `begin()`).
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current availability state.
    pub fn state(&self) -> DriverState {
        self.health.state()
    }

    /// Health counters and timestamps.
    pub fn health(&self) -> &HealthStats {
        self.health.stats()
    }

    /// An EEPROM commit is in flight or queued.
    pub fn is_nvm_busy(&self) -> bool {
        self.nvm.is_busy()
    }

    /// `Pending` while a commit is active, otherwise the settled result
    /// of the last one.
    pub fn nvm_status(&self) -> Result<WriteOutcome, Error> {
        if self.nvm.is_busy() {
            return Ok(WriteOutcome::Pending);
        }
        self.nvm.last_result().map(|()| WriteOutcome::Applied)
    }

    /// Lifetime EEPROM commit counters.
    pub fn nvm_stats(&self) -> NvmStats {
        self.nvm.stats()
    }

    // ===== Time and date =====

    /// Read the current date/time. The calendar block is fetched in one
    /// burst transaction so the fields are coherent.
    ///
    /// A payload that decodes to an invalid BCD pattern or calendar value
    /// is rejected without affecting health: the bus transaction itself
    /// succeeded.
    pub fn read_time(&mut self) -> Result<DateTime, Error> {
        self.require_initialized()?;

        let mut buf = [0u8; 7];
        self.read_regs(regs::REG_SECONDS, &mut buf)?;

        let sec = buf[0] & 0x7F;
        let min = buf[1] & 0x7F;
        let hour = buf[2] & 0x3F;
        let weekday = buf[3] & 0x07;
        let day = buf[4] & 0x3F;
        let month = buf[5] & 0x1F;
        let year = buf[6];

        if !calendar::is_valid_bcd(sec)
            || !calendar::is_valid_bcd(min)
            || !calendar::is_valid_bcd(hour)
            || !calendar::is_valid_bcd(day)
            || !calendar::is_valid_bcd(month)
            || !calendar::is_valid_bcd(year)
        {
            return Err(Error::new(
                ErrorKind::InvalidDateTime,
                "RTC returned invalid BCD",
            ));
        }

        let value = DateTime {
            second: calendar::bcd_to_bin(sec),
            minute: calendar::bcd_to_bin(min),
            hour: calendar::bcd_to_bin(hour),
            weekday,
            day: calendar::bcd_to_bin(day),
            month: calendar::bcd_to_bin(month),
            year: 2000 + u16::from(calendar::bcd_to_bin(year)),
        };

        if !value.is_valid() {
            return Err(Error::new(
                ErrorKind::InvalidDateTime,
                "RTC returned invalid date/time",
            ));
        }

        Ok(value)
    }

    /// Set the date/time. The weekday is computed from the date; the
    /// `weekday` field of `time` is ignored.
    pub fn set_time(&mut self, time: &DateTime) -> Result<(), Error> {
        self.require_initialized()?;

        // Validate the plain fields before any weekday arithmetic runs on
        // out-of-range month/day values.
        let candidate = DateTime { weekday: 0, ..*time };
        if !candidate.is_valid() {
            return Err(Error::new(
                ErrorKind::InvalidDateTime,
                "invalid date/time values",
            ));
        }

        let weekday = calendar::weekday_for_date(time.year, time.month, time.day);
        let buf = [
            calendar::bin_to_bcd(time.second),
            calendar::bin_to_bcd(time.minute),
            calendar::bin_to_bcd(time.hour),
            weekday & 0x07,
            calendar::bin_to_bcd(time.day),
            calendar::bin_to_bcd(time.month),
            calendar::bin_to_bcd((time.year % 100) as u8),
        ];

        self.write_regs(regs::REG_SECONDS, &buf)
    }

    /// Current time as seconds since the Unix epoch (interpreted as UTC;
    /// the device stores no timezone).
    pub fn read_unix(&mut self) -> Result<u32, Error> {
        let time = self.read_time()?;
        time.to_unix()
            .ok_or_else(|| Error::new(ErrorKind::InvalidDateTime, "time out of range"))
    }

    /// Set the time from a Unix timestamp.
    pub fn set_unix(&mut self, ts: u32) -> Result<(), Error> {
        let time = DateTime::from_unix(ts).ok_or_else(|| {
            Error::new(ErrorKind::InvalidDateTime, "Unix timestamp out of range")
        })?;
        self.set_time(&time)
    }

    // ===== Alarm =====

    /// Set the alarm time values without touching the per-component match
    /// enables; the alarm block is read back first so the AE flags in the
    /// register top bits survive the update.
    pub fn set_alarm_time(&mut self, minute: u8, hour: u8, date: u8) -> Result<(), Error> {
        self.require_initialized()?;
        if minute > 59 || hour > 23 || date == 0 || date > 31 {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "invalid alarm time values",
            ));
        }

        let mut buf = [0u8; 3];
        self.read_regs(regs::REG_ALARM_MINUTE, &mut buf)?;

        buf[0] = (buf[0] & 0x80) | calendar::bin_to_bcd(minute);
        buf[1] = (buf[1] & 0x80) | calendar::bin_to_bcd(hour);
        buf[2] = (buf[2] & 0x80) | calendar::bin_to_bcd(date);

        self.write_regs(regs::REG_ALARM_MINUTE, &buf)
    }

    /// Select which components participate in alarm matching, preserving
    /// the stored time values. A set AE bit disables matching for that
    /// component.
    pub fn set_alarm_match(
        &mut self,
        match_minute: bool,
        match_hour: bool,
        match_date: bool,
    ) -> Result<(), Error> {
        self.require_initialized()?;

        let mut buf = [0u8; 3];
        self.read_regs(regs::REG_ALARM_MINUTE, &mut buf)?;

        buf[0] = (buf[0] & 0x7F) | if match_minute { 0 } else { 0x80 };
        buf[1] = (buf[1] & 0x7F) | if match_hour { 0 } else { 0x80 };
        buf[2] = (buf[2] & 0x7F) | if match_date { 0 } else { 0x80 };

        self.write_regs(regs::REG_ALARM_MINUTE, &buf)
    }

    /// Read the complete alarm configuration. Registers holding an
    /// invalid BCD pattern or out-of-range value are reported as a
    /// parameter error, not decoded into nonsense.
    pub fn alarm_config(&mut self) -> Result<AlarmConfig, Error> {
        self.require_initialized()?;

        let mut buf = [0u8; 3];
        self.read_regs(regs::REG_ALARM_MINUTE, &mut buf)?;

        let min_raw = buf[0] & 0x7F;
        let hour_raw = buf[1] & 0x7F;
        let date_raw = buf[2] & 0x7F;
        if !calendar::is_valid_bcd(min_raw)
            || !calendar::is_valid_bcd(hour_raw)
            || !calendar::is_valid_bcd(date_raw)
        {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "alarm registers contain invalid BCD",
            ));
        }

        let minute = calendar::bcd_to_bin(min_raw);
        let hour = calendar::bcd_to_bin(hour_raw);
        let date = calendar::bcd_to_bin(date_raw);
        if minute > 59 || hour > 23 || date == 0 || date > 31 {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "alarm registers out of range",
            ));
        }

        Ok(AlarmConfig {
            minute,
            hour,
            date,
            match_minute: buf[0] & 0x80 == 0,
            match_hour: buf[1] & 0x80 == 0,
            match_date: buf[2] & 0x80 == 0,
        })
    }

    /// Whether the alarm has triggered since the flag was last cleared.
    pub fn alarm_flag(&mut self) -> Result<bool, Error> {
        self.require_initialized()?;
        let status = self.read_register_tracked(regs::REG_STATUS)?;
        Ok(status & (1 << regs::STATUS_AF_BIT) != 0)
    }

    pub fn clear_alarm_flag(&mut self) -> Result<(), Error> {
        self.clear_status(1 << regs::STATUS_AF_BIT)
    }

    /// Enable or disable the alarm interrupt output on the INT pin.
    pub fn set_alarm_interrupt(&mut self, enable: bool) -> Result<(), Error> {
        self.require_initialized()?;
        let control2 = self.read_register_tracked(regs::REG_CONTROL2)?;
        let updated = if enable {
            control2 | (1 << regs::CTRL2_AIE_BIT)
        } else {
            control2 & !(1 << regs::CTRL2_AIE_BIT)
        };
        self.write_register_tracked(regs::REG_CONTROL2, updated)
    }

    pub fn alarm_interrupt_enabled(&mut self) -> Result<bool, Error> {
        self.require_initialized()?;
        let control2 = self.read_register_tracked(regs::REG_CONTROL2)?;
        Ok(control2 & (1 << regs::CTRL2_AIE_BIT) != 0)
    }

    // ===== Countdown timer =====

    /// Configure the periodic countdown timer. Timer period is
    /// `ticks / frequency`; 60 ticks at `Hz1` fires once a minute. The
    /// reserved upper nibble of the timer-high register is preserved.
    pub fn set_timer(
        &mut self,
        ticks: u16,
        frequency: TimerFrequency,
        enable: bool,
    ) -> Result<(), Error> {
        self.require_initialized()?;
        if ticks > 0x0FFF {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "timer ticks out of range",
            ));
        }

        let mut control1 = self.read_register_tracked(regs::REG_CONTROL1)?;
        control1 &= !(regs::CTRL1_TD_MASK | (1 << regs::CTRL1_TE_BIT));
        control1 |= frequency.bits() & regs::CTRL1_TD_MASK;
        if enable {
            control1 |= 1 << regs::CTRL1_TE_BIT;
        }

        let low = (ticks & 0xFF) as u8;
        let current_high = self.read_register_tracked(regs::REG_TIMER_HIGH)?;
        let high = (current_high & 0xF0) | (((ticks >> 8) as u8) & 0x0F);

        self.write_register_tracked(regs::REG_CONTROL1, control1)?;
        self.write_register_tracked(regs::REG_TIMER_LOW, low)?;
        self.write_register_tracked(regs::REG_TIMER_HIGH, high)
    }

    /// Read the timer configuration and remaining tick count.
    pub fn timer(&mut self) -> Result<TimerConfig, Error> {
        self.require_initialized()?;

        let control1 = self.read_register_tracked(regs::REG_CONTROL1)?;
        let low = self.read_register_tracked(regs::REG_TIMER_LOW)?;
        let high = self.read_register_tracked(regs::REG_TIMER_HIGH)?;

        Ok(TimerConfig {
            ticks: (u16::from(high & 0x0F) << 8) | u16::from(low),
            frequency: TimerFrequency::from_bits(control1),
            enabled: control1 & (1 << regs::CTRL1_TE_BIT) != 0,
        })
    }

    // ===== Clock output =====

    /// Enable or disable the CLKOUT pin. Persistent when EEPROM writes
    /// are enabled.
    pub fn set_clkout_enabled(&mut self, enabled: bool) -> Result<WriteOutcome, Error> {
        self.require_initialized()?;
        let pmu = self.read_register_tracked(regs::REG_EEPROM_PMU)?;
        let updated = if enabled {
            pmu & !regs::PMU_CLKOUT_DISABLE
        } else {
            pmu | regs::PMU_CLKOUT_DISABLE
        };
        self.write_config_register(regs::REG_EEPROM_PMU, updated)
    }

    pub fn clkout_enabled(&mut self) -> Result<bool, Error> {
        self.require_initialized()?;
        let pmu = self.read_register_tracked(regs::REG_EEPROM_PMU)?;
        Ok(pmu & regs::PMU_CLKOUT_DISABLE == 0)
    }

    /// Set the CLKOUT frequency. Persistent when EEPROM writes are
    /// enabled.
    pub fn set_clkout_frequency(&mut self, frequency: ClkoutFrequency) -> Result<WriteOutcome, Error> {
        self.require_initialized()?;
        let clkout = self.read_register_tracked(regs::REG_EEPROM_CLKOUT2)?;
        let updated = (clkout & !regs::CLKOUT_FREQ_MASK)
            | ((frequency.bits() << regs::CLKOUT_FREQ_SHIFT) & regs::CLKOUT_FREQ_MASK);
        self.write_config_register(regs::REG_EEPROM_CLKOUT2, updated)
    }

    pub fn clkout_frequency(&mut self) -> Result<ClkoutFrequency, Error> {
        self.require_initialized()?;
        let clkout = self.read_register_tracked(regs::REG_EEPROM_CLKOUT2)?;
        Ok(ClkoutFrequency::from_bits(
            (clkout & regs::CLKOUT_FREQ_MASK) >> regs::CLKOUT_FREQ_SHIFT,
        ))
    }

    // ===== Calibration =====

    /// Set the crystal frequency offset in parts per million. Resolution
    /// is 0.2384 ppm per step; the value is rounded half-away and clamped
    /// to the register range of -32..=31 steps. Persistent when EEPROM
    /// writes are enabled.
    pub fn set_offset_ppm(&mut self, ppm: f32) -> Result<WriteOutcome, Error> {
        self.require_initialized()?;
        if !ppm.is_finite() {
            return Err(Error::new(ErrorKind::InvalidParam, "offset must be finite"));
        }

        let steps = ppm / 0.2384;
        let value = if steps >= 0.0 {
            (steps + 0.5) as i32
        } else {
            (steps - 0.5) as i32
        };
        let value = value.clamp(-32, 31);

        let current = self.read_register_tracked(regs::REG_EEPROM_OFFSET)?;
        let updated = (current & 0xC0) | ((value as u8) & 0x3F);
        self.write_config_register(regs::REG_EEPROM_OFFSET, updated)
    }

    /// Read the crystal frequency offset in parts per million.
    pub fn offset_ppm(&mut self) -> Result<f32, Error> {
        self.require_initialized()?;
        let raw = self.read_register_tracked(regs::REG_EEPROM_OFFSET)? & 0x3F;
        // Sign-extend the 6-bit two's-complement field.
        let signed = if raw & 0x20 != 0 {
            (raw | 0xC0) as i8
        } else {
            raw as i8
        };
        Ok(f32::from(signed) * 0.2384)
    }

    // ===== Temperature =====

    /// Die temperature in degrees Celsius, 1/16 degree resolution.
    /// Typical accuracy is a few degrees; not a precision thermometer.
    pub fn read_temperature_c(&mut self) -> Result<f32, Error> {
        self.require_initialized()?;

        let mut buf = [0u8; 2];
        self.read_regs(regs::REG_TEMP_LSB, &mut buf)?;

        // 12-bit two's complement: MSB integer part, LSB upper nibble
        // fractional part.
        let raw_u = (u16::from(buf[1]) << 4) | u16::from(buf[0] >> 4);
        let raw = if raw_u & 0x0800 != 0 {
            (raw_u | 0xF000) as i16
        } else {
            raw_u as i16
        };
        Ok(f32::from(raw) / 16.0)
    }

    // ===== External event input =====

    /// Select the event input edge: rising when `true`, falling otherwise.
    pub fn set_evi_edge(&mut self, rising: bool) -> Result<(), Error> {
        self.require_initialized()?;
        let control = self.read_register_tracked(regs::REG_EVI_CONTROL)?;
        let updated = if rising {
            control | (1 << regs::EVI_EB_BIT)
        } else {
            control & !(1 << regs::EVI_EB_BIT)
        };
        self.write_register_tracked(regs::REG_EVI_CONTROL, updated)
    }

    pub fn set_evi_debounce(&mut self, debounce: EviDebounce) -> Result<(), Error> {
        self.require_initialized()?;
        let control = self.read_register_tracked(regs::REG_EVI_CONTROL)?;
        let updated = (control & !regs::EVI_DB_MASK)
            | ((debounce.bits() << regs::EVI_DB_SHIFT) & regs::EVI_DB_MASK);
        self.write_register_tracked(regs::REG_EVI_CONTROL, updated)
    }

    /// Allow a new event to overwrite a stored timestamp instead of
    /// preserving the first one.
    pub fn set_evi_overwrite(&mut self, enable: bool) -> Result<(), Error> {
        self.require_initialized()?;
        let control = self.read_register_tracked(regs::REG_TS_CONTROL)?;
        let updated = if enable {
            control | (1 << regs::TS_OVERWRITE_BIT)
        } else {
            control & !(1 << regs::TS_OVERWRITE_BIT)
        };
        self.write_register_tracked(regs::REG_TS_CONTROL, updated)
    }

    pub fn evi_config(&mut self) -> Result<EviConfig, Error> {
        self.require_initialized()?;

        let evi = self.read_register_tracked(regs::REG_EVI_CONTROL)?;
        let ts = self.read_register_tracked(regs::REG_TS_CONTROL)?;

        Ok(EviConfig {
            rising: evi & (1 << regs::EVI_EB_BIT) != 0,
            debounce: EviDebounce::from_bits((evi & regs::EVI_DB_MASK) >> regs::EVI_DB_SHIFT),
            overwrite: ts & (1 << regs::TS_OVERWRITE_BIT) != 0,
        })
    }

    // ===== Status =====

    /// Raw status register byte.
    pub fn read_status(&mut self) -> Result<u8, Error> {
        self.require_initialized()?;
        self.read_register_tracked(regs::REG_STATUS)
    }

    /// Decoded status register.
    pub fn status_flags(&mut self) -> Result<StatusFlags, Error> {
        self.require_initialized()?;
        let status = self.read_register_tracked(regs::REG_STATUS)?;
        Ok(StatusFlags {
            temp_high: status & (1 << regs::STATUS_THF_BIT) != 0,
            temp_low: status & (1 << regs::STATUS_TLF_BIT) != 0,
            update: status & (1 << regs::STATUS_UF_BIT) != 0,
            timer: status & (1 << regs::STATUS_TF_BIT) != 0,
            alarm: status & (1 << regs::STATUS_AF_BIT) != 0,
            event: status & (1 << regs::STATUS_EVF_BIT) != 0,
            power_on_reset: status & (1 << regs::STATUS_PORF_BIT) != 0,
            voltage_low: status & (1 << regs::STATUS_VLF_BIT) != 0,
        })
    }

    /// Clear the status flags selected by `mask` (1 = clear), leaving all
    /// other bits untouched via read-modify-write. Flags are never
    /// cleared implicitly by a read.
    pub fn clear_status(&mut self, mask: u8) -> Result<(), Error> {
        self.require_initialized()?;
        let status = self.read_register_tracked(regs::REG_STATUS)?;
        self.write_register_tracked(regs::REG_STATUS, status & !mask)
    }

    /// Power/clock validity summary across the status and temperature-LSB
    /// registers.
    pub fn validity(&mut self) -> Result<ValidityFlags, Error> {
        self.require_initialized()?;

        let status = self.read_register_tracked(regs::REG_STATUS)?;
        let temp_lsb = self.read_register_tracked(regs::REG_TEMP_LSB)?;

        let voltage_low = status & (1 << regs::STATUS_VLF_BIT) != 0;
        let power_on_reset = status & (1 << regs::STATUS_PORF_BIT) != 0;
        Ok(ValidityFlags {
            voltage_low,
            power_on_reset,
            backup_switched: temp_lsb & (1 << regs::TEMP_BSF_BIT) != 0,
            time_invalid: power_on_reset || voltage_low,
        })
    }

    pub fn clear_power_on_reset_flag(&mut self) -> Result<(), Error> {
        self.clear_status(1 << regs::STATUS_PORF_BIT)
    }

    pub fn clear_voltage_low_flag(&mut self) -> Result<(), Error> {
        self.clear_status(1 << regs::STATUS_VLF_BIT)
    }

    /// Clear the backup switchover flag, which lives in the temperature
    /// LSB register rather than the status register.
    pub fn clear_backup_switch_flag(&mut self) -> Result<(), Error> {
        self.require_initialized()?;
        let temp_lsb = self.read_register_tracked(regs::REG_TEMP_LSB)?;
        self.write_register_tracked(regs::REG_TEMP_LSB, temp_lsb & !(1 << regs::TEMP_BSF_BIT))
    }

    // ===== Low-level register access =====

    /// Read a single register on the tracked path. Direct register access
    /// can disrupt the clock if misused.
    pub fn read_register(&mut self, register: u8) -> Result<u8, Error> {
        self.read_register_tracked(register)
    }

    /// Write a single register on the tracked path. Direct register
    /// access can disrupt the clock if misused.
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error> {
        self.write_register_tracked(register, value)
    }

    fn require_initialized(&self) -> Result<(), Error> {
        if self.initialized {
            Ok(())
        } else {
            Err(not_initialized())
        }
    }
}
