mod common;

use common::ready_rtc;
use rv3032::registers as regs;
use rv3032::{AlarmConfig, Config, ErrorKind, TimerFrequency};

#[test]
fn test_set_alarm_time_preserves_enable_bits() {
    let (mut rtc, bus) = ready_rtc(Config::default());
    // Minute and date matching disabled (AE set), hour matching enabled.
    bus.set_reg(regs::REG_ALARM_MINUTE, 0x80 | 0x15);
    bus.set_reg(regs::REG_ALARM_HOUR, 0x03);
    bus.set_reg(regs::REG_ALARM_DATE, 0x80 | 0x01);

    rtc.set_alarm_time(45, 7, 14).expect("set should succeed");

    assert_eq!(bus.reg(regs::REG_ALARM_MINUTE), 0x80 | 0x45);
    assert_eq!(bus.reg(regs::REG_ALARM_HOUR), 0x07);
    assert_eq!(bus.reg(regs::REG_ALARM_DATE), 0x80 | 0x14);
}

#[test]
fn test_set_alarm_match_preserves_time_values() {
    let (mut rtc, bus) = ready_rtc(Config::default());
    bus.set_reg(regs::REG_ALARM_MINUTE, 0x80 | 0x45);
    bus.set_reg(regs::REG_ALARM_HOUR, 0x80 | 0x07);
    bus.set_reg(regs::REG_ALARM_DATE, 0x80 | 0x14);

    rtc.set_alarm_match(true, false, true)
        .expect("set should succeed");

    assert_eq!(bus.reg(regs::REG_ALARM_MINUTE), 0x45);
    assert_eq!(bus.reg(regs::REG_ALARM_HOUR), 0x80 | 0x07);
    assert_eq!(bus.reg(regs::REG_ALARM_DATE), 0x14);
}

#[test]
fn test_alarm_config_round_trip() {
    let (mut rtc, _bus) = ready_rtc(Config::default());

    rtc.set_alarm_time(45, 7, 14).expect("set time");
    rtc.set_alarm_match(true, true, false).expect("set match");

    let config = rtc.alarm_config().expect("read should succeed");
    assert_eq!(
        config,
        AlarmConfig {
            minute: 45,
            hour: 7,
            date: 14,
            match_minute: true,
            match_hour: true,
            match_date: false,
        }
    );
}

#[test]
fn test_alarm_rejects_invalid_time_values() {
    let (mut rtc, bus) = ready_rtc(Config::default());
    let before = bus.transactions();

    for (minute, hour, date) in [(60, 0, 1), (0, 24, 1), (0, 0, 0), (0, 0, 32)] {
        let err = rtc.set_alarm_time(minute, hour, date).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParam);
    }
    assert_eq!(bus.transactions(), before);
}

#[test]
fn test_alarm_config_rejects_invalid_bcd_pattern() {
    let (mut rtc, bus) = ready_rtc(Config::default());
    // 0x5A: low nibble is not a decimal digit.
    bus.set_reg(regs::REG_ALARM_MINUTE, 0x5A);

    let err = rtc.alarm_config().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidParam);
    // Semantically bad payload over a healthy bus leaves health alone.
    assert_eq!(rtc.health().total_failures, 0);
}

#[test]
fn test_alarm_config_rejects_out_of_range_decoded_values() {
    let (mut rtc, bus) = ready_rtc(Config::default());
    // Valid BCD, but 61 minutes does not exist.
    bus.set_reg(regs::REG_ALARM_MINUTE, 0x61);
    bus.set_reg(regs::REG_ALARM_HOUR, 0x07);
    bus.set_reg(regs::REG_ALARM_DATE, 0x14);

    let err = rtc.alarm_config().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidParam);
}

#[test]
fn test_alarm_flag_and_explicit_clear() {
    let (mut rtc, bus) = ready_rtc(Config::default());
    bus.set_reg(regs::REG_STATUS, 0xFF);

    assert!(rtc.alarm_flag().expect("read should succeed"));
    rtc.clear_alarm_flag().expect("clear should succeed");

    // Only the alarm flag is cleared; every other flag survives the
    // read-modify-write.
    assert_eq!(bus.reg(regs::REG_STATUS), 0xFF & !(1 << regs::STATUS_AF_BIT));
    assert!(!rtc.alarm_flag().expect("read should succeed"));
}

#[test]
fn test_alarm_interrupt_enable_round_trip() {
    let (mut rtc, bus) = ready_rtc(Config::default());
    bus.set_reg(regs::REG_CONTROL2, 0x41);

    rtc.set_alarm_interrupt(true).expect("enable");
    assert_eq!(bus.reg(regs::REG_CONTROL2), 0x41 | (1 << regs::CTRL2_AIE_BIT));
    assert!(rtc.alarm_interrupt_enabled().expect("read"));

    rtc.set_alarm_interrupt(false).expect("disable");
    assert_eq!(bus.reg(regs::REG_CONTROL2), 0x41);
    assert!(!rtc.alarm_interrupt_enabled().expect("read"));
}

#[test]
fn test_set_timer_preserves_reserved_high_nibble() {
    let (mut rtc, bus) = ready_rtc(Config::default());
    // Reserved upper nibble of the timer-high register holds prior state.
    bus.set_reg(regs::REG_TIMER_HIGH, 0xA0);
    bus.set_reg(regs::REG_CONTROL1, 0x80);

    rtc.set_timer(0x123, TimerFrequency::Hz1, true)
        .expect("set should succeed");

    assert_eq!(bus.reg(regs::REG_TIMER_LOW), 0x23);
    assert_eq!(bus.reg(regs::REG_TIMER_HIGH), 0xA1);
    // Frequency bits and enable set, unrelated CONTROL1 bits preserved.
    assert_eq!(
        bus.reg(regs::REG_CONTROL1),
        0x80 | 0x02 | (1 << regs::CTRL1_TE_BIT)
    );
}

#[test]
fn test_timer_readback() {
    let (mut rtc, _bus) = ready_rtc(Config::default());

    rtc.set_timer(60, TimerFrequency::Hz1, true)
        .expect("set should succeed");

    let timer = rtc.timer().expect("read should succeed");
    assert_eq!(timer.ticks, 60);
    assert_eq!(timer.frequency, TimerFrequency::Hz1);
    assert!(timer.enabled);

    rtc.set_timer(4095, TimerFrequency::PerMinute, false)
        .expect("set should succeed");
    let timer = rtc.timer().expect("read should succeed");
    assert_eq!(timer.ticks, 4095);
    assert_eq!(timer.frequency, TimerFrequency::PerMinute);
    assert!(!timer.enabled);
}

#[test]
fn test_set_timer_rejects_out_of_range_ticks() {
    let (mut rtc, bus) = ready_rtc(Config::default());
    let before = bus.transactions();

    let err = rtc.set_timer(0x1000, TimerFrequency::Hz1, true).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidParam);
    assert_eq!(bus.transactions(), before);
}
