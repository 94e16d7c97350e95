//! Non-blocking EEPROM persistence engine.
//!
//! The RV-3032 commits a configuration byte to EEPROM through a multi-step
//! hardware sequence (unlock, stage address/data, command, poll busy,
//! restore). A commit takes several milliseconds; instead of blocking, the
//! driver runs one step per `tick()` call, at most one bus transaction,
//! and queues writes that arrive while another is in flight.

use heapless::Deque;
use serde::Serialize;
use static_assertions::const_assert;
use tracing::{debug, trace, warn};

use crate::driver::Rv3032;
use crate::registers as regs;
use crate::status::{Error, ErrorKind, WriteOutcome};
use crate::transport::Transport;

/// Capacity of the pending-write queue.
pub const NVM_QUEUE_CAPACITY: usize = 8;

/// Deadline for the busy flag to clear before the commit command may be
/// issued.
pub(crate) const PRE_COMMAND_TIMEOUT_MS: u32 = 50;

const_assert!(NVM_QUEUE_CAPACITY > 0);
const_assert!(PRE_COMMAND_TIMEOUT_MS > 0);

/// True once `deadline_ms` has been reached. Wraparound-safe: the caller's
/// millisecond counter may roll over without producing a false expiry.
pub(crate) fn deadline_passed(now_ms: u32, deadline_ms: u32) -> bool {
    now_ms.wrapping_sub(deadline_ms) as i32 >= 0
}

/// Steps of the commit sequence. One step runs per `tick()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NvmStep {
    Idle,
    ReadControl,
    EnableUnlock,
    WriteAddress,
    WriteData,
    WaitReadyBeforeCommand,
    WriteCommand,
    WaitReadyAfterCommand,
    RestoreControl,
}

/// A (register, value) pair waiting its turn in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingWrite {
    pub register: u8,
    pub value: u8,
}

/// Lifetime EEPROM commit counters, saturating.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NvmStats {
    pub writes_committed: u32,
    pub writes_failed: u32,
}

#[derive(Debug)]
pub(crate) struct NvmEngine {
    step: NvmStep,
    register: u8,
    value: u8,
    /// CONTROL1 as captured before the unlock bit was set; restored on
    /// every exit path.
    saved_control: Option<u8>,
    deadline_ms: u32,
    /// The in-flight operation still owes a stats increment.
    count_pending: bool,
    queue: Deque<PendingWrite, NVM_QUEUE_CAPACITY>,
    /// Scratch during a run (first error wins), settled result when idle.
    last_result: Result<(), Error>,
    stats: NvmStats,
}

impl NvmEngine {
    pub(crate) fn new() -> Self {
        Self {
            step: NvmStep::Idle,
            register: 0,
            value: 0,
            saved_control: None,
            deadline_ms: 0,
            count_pending: false,
            queue: Deque::new(),
            last_result: Ok(()),
            stats: NvmStats::default(),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// An operation is in flight or writes are waiting.
    pub(crate) fn is_busy(&self) -> bool {
        self.step != NvmStep::Idle || !self.queue.is_empty()
    }

    pub(crate) fn last_result(&self) -> Result<(), Error> {
        self.last_result
    }

    pub(crate) fn stats(&self) -> NvmStats {
        self.stats
    }

    /// Abandon any in-flight step and drop queued writes; used while
    /// persistence is administratively disabled.
    fn force_idle(&mut self) {
        self.step = NvmStep::Idle;
        self.saved_control = None;
        self.count_pending = false;
        while self.queue.pop_front().is_some() {}
    }

    fn push(&mut self, write: PendingWrite) -> bool {
        self.queue.push_back(write).is_ok()
    }

    fn pop(&mut self) -> Option<PendingWrite> {
        self.queue.pop_front()
    }
}

impl<T: Transport> Rv3032<T> {
    /// Volatile-mirror write plus persistence hand-off; the entry point
    /// for every EEPROM-backed configuration register.
    pub(crate) fn write_config_register(
        &mut self,
        register: u8,
        value: u8,
    ) -> Result<WriteOutcome, Error> {
        let current = self.read_register_tracked(register)?;
        if current == value {
            return Ok(WriteOutcome::Applied);
        }

        self.write_register_tracked(register, value)?;

        if !self.config.enable_nvm_writes {
            return Ok(WriteOutcome::Applied);
        }

        self.queue_nvm_update(register, value)
    }

    /// Accept a commit: start immediately when the engine is idle and the
    /// queue is empty, otherwise enqueue behind the write in flight.
    fn queue_nvm_update(&mut self, register: u8, value: u8) -> Result<WriteOutcome, Error> {
        if self.nvm.is_busy() {
            if !self.nvm.push(PendingWrite { register, value }) {
                return Err(Error::new(ErrorKind::QueueFull, "EEPROM write queue full"));
            }
            trace!(register, "EEPROM write queued");
            return Ok(WriteOutcome::Pending);
        }

        self.start_nvm_update(register, value, self.now_ms);
        Ok(WriteOutcome::Pending)
    }

    fn start_nvm_update(&mut self, register: u8, value: u8, now_ms: u32) {
        trace!(register, value, "EEPROM commit started");
        self.nvm.register = register;
        self.nvm.value = value;
        self.nvm.saved_control = None;
        self.nvm.count_pending = true;
        self.nvm.deadline_ms = now_ms.wrapping_add(PRE_COMMAND_TIMEOUT_MS);
        self.nvm.last_result = Ok(());
        self.nvm.step = NvmStep::ReadControl;
    }

    /// Advance the engine by exactly one step; at most one bus
    /// transaction per call. Any step failure short-circuits to
    /// `RestoreControl` carrying that failure as the final result.
    pub(crate) fn process_nvm(&mut self, now_ms: u32) {
        if !self.config.enable_nvm_writes {
            self.nvm.force_idle();
            return;
        }

        if self.nvm.step == NvmStep::Idle {
            if let Some(next) = self.nvm.pop() {
                self.start_nvm_update(next.register, next.value, now_ms);
            }
            return;
        }

        match self.nvm.step {
            NvmStep::Idle => {}
            NvmStep::ReadControl => match self.read_register_tracked(regs::REG_CONTROL1) {
                // Control register untouched so far; nothing to restore.
                Err(err) => self.finish_nvm(Err(err), now_ms),
                Ok(control) => {
                    self.nvm.saved_control = Some(control);
                    self.nvm.step = NvmStep::EnableUnlock;
                }
            },
            NvmStep::EnableUnlock => {
                let control = self.nvm.saved_control.unwrap_or(0);
                let unlocked = control | (1 << regs::CTRL1_EERD_BIT);
                match self.write_register_tracked(regs::REG_CONTROL1, unlocked) {
                    Err(err) => {
                        self.nvm.last_result = Err(err);
                        self.nvm.step = NvmStep::RestoreControl;
                    }
                    Ok(()) => self.nvm.step = NvmStep::WriteAddress,
                }
            }
            NvmStep::WriteAddress => {
                let register = self.nvm.register;
                match self.write_register_tracked(regs::REG_EE_ADDRESS, register) {
                    Err(err) => {
                        self.nvm.last_result = Err(err);
                        self.nvm.step = NvmStep::RestoreControl;
                    }
                    Ok(()) => self.nvm.step = NvmStep::WriteData,
                }
            }
            NvmStep::WriteData => {
                let value = self.nvm.value;
                match self.write_register_tracked(regs::REG_EE_DATA, value) {
                    Err(err) => {
                        self.nvm.last_result = Err(err);
                        self.nvm.step = NvmStep::RestoreControl;
                    }
                    Ok(()) => {
                        self.nvm.deadline_ms = now_ms.wrapping_add(PRE_COMMAND_TIMEOUT_MS);
                        self.nvm.step = NvmStep::WaitReadyBeforeCommand;
                    }
                }
            }
            NvmStep::WaitReadyBeforeCommand => match self.read_nvm_flags() {
                Err(err) => {
                    self.nvm.last_result = Err(err);
                    self.nvm.step = NvmStep::RestoreControl;
                }
                Ok((busy, _failed)) => {
                    if !busy {
                        self.nvm.step = NvmStep::WriteCommand;
                    } else if deadline_passed(now_ms, self.nvm.deadline_ms) {
                        self.nvm.last_result =
                            Err(Error::new(ErrorKind::Timeout, "EEPROM busy timeout"));
                        self.nvm.step = NvmStep::RestoreControl;
                    }
                }
            },
            NvmStep::WriteCommand => {
                match self.write_register_tracked(regs::REG_EE_COMMAND, regs::EEPROM_CMD_UPDATE) {
                    Err(err) => {
                        self.nvm.last_result = Err(err);
                        self.nvm.step = NvmStep::RestoreControl;
                    }
                    Ok(()) => {
                        self.nvm.deadline_ms = now_ms.wrapping_add(self.config.nvm_timeout_ms);
                        self.nvm.step = NvmStep::WaitReadyAfterCommand;
                    }
                }
            }
            NvmStep::WaitReadyAfterCommand => match self.read_nvm_flags() {
                Err(err) => {
                    self.nvm.last_result = Err(err);
                    self.nvm.step = NvmStep::RestoreControl;
                }
                Ok((busy, failed)) => {
                    if !busy {
                        self.nvm.last_result = if failed {
                            Err(Error::new(ErrorKind::NvmWriteFailed, "EEPROM write failed"))
                        } else {
                            Ok(())
                        };
                        self.nvm.step = NvmStep::RestoreControl;
                    } else if deadline_passed(now_ms, self.nvm.deadline_ms) {
                        self.nvm.last_result =
                            Err(Error::new(ErrorKind::Timeout, "EEPROM write timeout"));
                        self.nvm.step = NvmStep::RestoreControl;
                    }
                }
            },
            NvmStep::RestoreControl => {
                let mut final_result = self.nvm.last_result;
                if let Some(saved) = self.nvm.saved_control {
                    // Clear only the unlock bit; every other CONTROL1 bit
                    // keeps the value captured before the sequence.
                    let restored = saved & !(1 << regs::CTRL1_EERD_BIT);
                    if let Err(err) = self.write_register_tracked(regs::REG_CONTROL1, restored) {
                        // The first error of the run takes priority.
                        if final_result.is_ok() {
                            final_result = Err(err);
                        }
                    }
                }
                self.finish_nvm(final_result, now_ms);
            }
        }
    }

    fn finish_nvm(&mut self, final_result: Result<(), Error>, now_ms: u32) {
        self.nvm.last_result = final_result;
        if self.nvm.count_pending {
            match final_result {
                Ok(()) => {
                    self.nvm.stats.writes_committed =
                        self.nvm.stats.writes_committed.saturating_add(1);
                    debug!(register = self.nvm.register, "EEPROM commit complete");
                }
                Err(err) => {
                    self.nvm.stats.writes_failed = self.nvm.stats.writes_failed.saturating_add(1);
                    warn!(register = self.nvm.register, error = %err, "EEPROM commit failed");
                }
            }
            self.nvm.count_pending = false;
        }
        self.nvm.saved_control = None;
        self.nvm.step = NvmStep::Idle;

        if let Some(next) = self.nvm.pop() {
            self.start_nvm_update(next.register, next.value, now_ms);
        }
    }

    /// EEPROM busy and error flags live in the temperature LSB register.
    fn read_nvm_flags(&mut self) -> Result<(bool, bool), Error> {
        let temp_lsb = self.read_register_tracked(regs::REG_TEMP_LSB)?;
        let busy = temp_lsb & (1 << regs::EEPROM_BUSY_BIT) != 0;
        let failed = temp_lsb & (1 << regs::EEPROM_ERROR_BIT) != 0;
        Ok((busy, failed))
    }
}
