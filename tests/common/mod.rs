//! Shared mock transport for integration tests.
//!
//! Models the device's linear register space with auto-increment
//! addressing and lets tests script bus faults deterministically, so
//! health transitions and the EEPROM engine's failure paths can be
//! exercised without hardware.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rv3032::{Config, Rv3032, Transport, TransportError};

struct BusState {
    regs: [u8; 256],
    /// (start register, payload) for every successful write transaction.
    writes: Vec<(u8, Vec<u8>)>,
    transactions: u32,
    faults: VecDeque<TransportError>,
    fail_all: Option<TransportError>,
}

/// Cloneable handle onto the simulated bus; the driver owns one clone,
/// the test keeps another for scripting and inspection.
#[derive(Clone)]
pub struct MockBus {
    state: Rc<RefCell<BusState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                regs: [0u8; 256],
                writes: Vec::new(),
                transactions: 0,
                faults: VecDeque::new(),
                fail_all: None,
            })),
        }
    }

    pub fn set_reg(&self, register: u8, value: u8) {
        self.state.borrow_mut().regs[usize::from(register)] = value;
    }

    pub fn reg(&self, register: u8) -> u8 {
        self.state.borrow().regs[usize::from(register)]
    }

    /// Successful write transactions as (start register, payload) pairs.
    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.borrow().writes.clone()
    }

    /// Payload bytes written to one register, in transaction order.
    pub fn writes_to(&self, register: u8) -> Vec<u8> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|(reg, _)| *reg == register)
            .flat_map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    /// Total transactions attempted, including faulted ones.
    pub fn transactions(&self) -> u32 {
        self.state.borrow().transactions
    }

    /// Fail the next transaction (FIFO when called repeatedly).
    pub fn inject_fault(&self, fault: TransportError) {
        self.state.borrow_mut().faults.push_back(fault);
    }

    /// Fail every transaction until cleared.
    pub fn fail_all(&self, fault: TransportError) {
        self.state.borrow_mut().fail_all = Some(fault);
    }

    pub fn clear_faults(&self) {
        let mut state = self.state.borrow_mut();
        state.faults.clear();
        state.fail_all = None;
    }
}

impl Transport for MockBus {
    fn write(&mut self, _address: u8, bytes: &[u8], _timeout_ms: u32) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        state.transactions += 1;
        if let Some(fault) = state.faults.pop_front().or(state.fail_all) {
            return Err(fault);
        }

        let register = bytes[0];
        for (i, value) in bytes[1..].iter().enumerate() {
            state.regs[usize::from(register.wrapping_add(i as u8))] = *value;
        }
        state.writes.push((register, bytes[1..].to_vec()));
        Ok(())
    }

    fn write_read(
        &mut self,
        _address: u8,
        tx: &[u8],
        rx: &mut [u8],
        _timeout_ms: u32,
    ) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        state.transactions += 1;
        if let Some(fault) = state.faults.pop_front().or(state.fail_all) {
            return Err(fault);
        }

        let register = tx[0];
        for (i, slot) in rx.iter_mut().enumerate() {
            *slot = state.regs[usize::from(register.wrapping_add(i as u8))];
        }
        Ok(())
    }
}

/// Configuration with EEPROM persistence enabled.
pub fn nvm_config() -> Config {
    Config {
        enable_nvm_writes: true,
        ..Config::default()
    }
}

/// Driver initialized against a fresh mock bus. The PMU register is
/// pre-seeded with the level backup mode so `begin()` finds nothing to
/// change and leaves the persistence engine idle.
pub fn ready_rtc(config: Config) -> (Rv3032<MockBus>, MockBus) {
    let bus = MockBus::new();
    bus.set_reg(rv3032::registers::REG_EEPROM_PMU, rv3032::registers::PMU_BSM_LEVEL);
    let mut rtc = Rv3032::new(bus.clone());
    rtc.begin(config).expect("begin should succeed");
    bus.clear_writes();
    (rtc, bus)
}

/// Store a valid calendar value directly in the mock's time registers.
pub fn seed_time(bus: &MockBus, bcd: [u8; 7]) {
    for (i, value) in bcd.iter().enumerate() {
        bus.set_reg(rv3032::registers::REG_SECONDS + i as u8, *value);
    }
}
