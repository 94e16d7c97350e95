use crate::driver::Rv3032;
use crate::status::{Error, ErrorKind};

/// Largest burst write: 1 address byte + 15 data bytes. Covers every
/// multi-register sequence the device defines (calendar block = 7 bytes).
pub(crate) const MAX_BURST_WRITE: usize = 15;
/// Largest burst read accepted by the register helpers.
pub(crate) const MAX_BURST_READ: usize = 255;

/// Failure reported by a bus transport implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Transfer failed; carries the transport's own error code.
    Bus(i32),
    /// Transfer did not complete within the requested timeout.
    Timeout,
}

/// Byte-level bus access, implemented by the embedding application.
///
/// The driver never initializes or configures the underlying bus; it only
/// issues these two transactions. Implementations own whatever context
/// they need (peripheral handle, DMA channels, mutex).
pub trait Transport {
    /// Write `bytes` to the device at `address`.
    fn write(&mut self, address: u8, bytes: &[u8], timeout_ms: u32) -> Result<(), TransportError>;

    /// Write `tx` then read `rx.len()` bytes in one transaction
    /// (repeated start).
    fn write_read(
        &mut self,
        address: u8,
        tx: &[u8],
        rx: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), TransportError>;
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Bus(code) => {
                Error::with_detail(ErrorKind::Bus, "bus transfer failed", code)
            }
            TransportError::Timeout => Error::new(ErrorKind::Timeout, "bus transfer timed out"),
        }
    }
}

// Raw and tracked access disciplines over the injected transport.
//
// Raw calls propagate the transport result untouched and never update
// health; diagnostic paths (presence probing) use them so polling the
// device cannot distort availability accounting. Tracked calls feed every
// outcome through the health tracker exactly once per logical operation.
impl<T: Transport> Rv3032<T> {
    pub(crate) fn bus_write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let address = self.config.i2c_address;
        let timeout = self.config.i2c_timeout_ms;
        self.transport
            .write(address, bytes, timeout)
            .map_err(Error::from)
    }

    pub(crate) fn bus_write_read_raw(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Error> {
        let address = self.config.i2c_address;
        let timeout = self.config.i2c_timeout_ms;
        self.transport
            .write_read(address, tx, rx, timeout)
            .map_err(Error::from)
    }

    pub(crate) fn bus_write_tracked(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let result = self.bus_write_raw(bytes);
        self.track(result)
    }

    pub(crate) fn bus_write_read_tracked(
        &mut self,
        tx: &[u8],
        rx: &mut [u8],
    ) -> Result<(), Error> {
        let result = self.bus_write_read_raw(tx, rx);
        self.track(result)
    }

    /// Single-register read on the raw path; presence probing only.
    pub(crate) fn read_register_raw(&mut self, register: u8) -> Result<u8, Error> {
        let tx = [register];
        let mut rx = [0u8];
        self.bus_write_read_raw(&tx, &mut rx)?;
        Ok(rx[0])
    }

    /// Single-register read on the tracked path.
    pub(crate) fn read_register_tracked(&mut self, register: u8) -> Result<u8, Error> {
        let mut buf = [0u8];
        self.read_regs(register, &mut buf)?;
        Ok(buf[0])
    }

    /// Single-register write on the tracked path.
    pub(crate) fn write_register_tracked(&mut self, register: u8, value: u8) -> Result<(), Error> {
        self.write_regs(register, &[value])
    }

    /// Burst read starting at `register`; the device auto-increments its
    /// address pointer per byte transferred. Tracked.
    pub(crate) fn read_regs(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Error> {
        if !self.initialized && !self.begin_in_progress {
            return Err(Error::new(ErrorKind::NotInitialized, "call begin() first"));
        }
        if buf.is_empty() {
            return Err(Error::new(ErrorKind::InvalidParam, "empty read buffer"));
        }
        if buf.len() > MAX_BURST_READ {
            return Err(Error::new(ErrorKind::InvalidParam, "read length too large"));
        }

        let tx = [register];
        self.bus_write_read_tracked(&tx, buf)
    }

    /// Burst write starting at `register`; prepends the register address
    /// to the outgoing payload. Tracked.
    pub(crate) fn write_regs(&mut self, register: u8, data: &[u8]) -> Result<(), Error> {
        if !self.initialized && !self.begin_in_progress {
            return Err(Error::new(ErrorKind::NotInitialized, "call begin() first"));
        }
        if data.is_empty() {
            return Err(Error::new(ErrorKind::InvalidParam, "empty write payload"));
        }
        if data.len() > MAX_BURST_WRITE {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "write length exceeds 15 bytes",
            ));
        }

        let mut tx = [0u8; MAX_BURST_WRITE + 1];
        tx[0] = register;
        tx[1..=data.len()].copy_from_slice(data);
        self.bus_write_tracked(&tx[..data.len() + 1])
    }

    /// Pass a transaction outcome through the health tracker, once per
    /// logical operation.
    fn track<V>(&mut self, result: Result<V, Error>) -> Result<V, Error> {
        let now_ms = self.now_ms;
        let initialized = self.initialized;
        match &result {
            Ok(_) => self.health.record_success(now_ms, initialized),
            Err(err) => self.health.record_failure(*err, now_ms, initialized),
        }
        result
    }
}
