//! SC16IS7x0 UART bridge device
//!
//! Owns the register bus and turns UART configuration into register writes.
//! Blocking calls poll LSR flags against a deadline captured on entry.
//!
//! The device is not synchronized: bit updates are read-modify-write pairs
//! on the chip, so callers sharing a device must serialize access.

use core::time::Duration;
use std::io;

use log::{debug, trace, warn};

use crate::bus::RegisterBus;
use crate::config::{Config, Parity, StopBits};
use crate::error::Error;
use crate::registers::{
    EnhancedFeatures, FifoControl, InterruptIdent, LineControl, LineStatus, ModemControl,
    Register, RegisterSet, ENHANCED_SET_KEY, SCRATCHPAD_TEST_VALUE,
};
use crate::timeout::{poll_until, PollResult};

/// LCR bit giving access to the divisor latches
const DIVISOR_LATCH_BIT: u8 = 7;

/// Which FIFO a clear targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoSelector {
    Receive,
    Transmit,
    Both,
}

/// Baud generator divisor for `baud` given the crystal and prescaler.
///
/// Integer division truncates, matching the hardware divisor. Returns `None`
/// when no 16-bit, non-zero divisor exists.
pub fn baud_divisor(crystal_hz: u32, prescaler: u32, baud: u32) -> Option<u16> {
    if baud == 0 || prescaler == 0 {
        return None;
    }
    let divisor = u64::from(crystal_hz / prescaler) / (u64::from(baud) * 16);
    match u16::try_from(divisor) {
        Ok(0) | Err(_) => None,
        Ok(divisor) => Some(divisor),
    }
}

/// Live handle to an opened bridge
pub struct UartBridgeDevice<B: RegisterBus> {
    bus: B,
    crystal_hz: u32,
    timeout: Duration,
}

impl<B: RegisterBus> UartBridgeDevice<B> {
    /// Open the bridge on a bus produced by `connect`.
    ///
    /// `connect` receives the bus address and the defaulted bus index.
    pub fn open<F>(config: &Config, connect: F) -> Result<Self, Error<B::Error>>
    where
        F: FnOnce(u8, u8) -> Result<B, B::Error>,
    {
        let conf = config.normalized();
        let bus = connect(conf.address, conf.bus).map_err(Error::Bus)?;
        Self::open_with_bus(&conf, bus)
    }

    /// Open the bridge on an already acquired bus.
    ///
    /// Runs self-test, baud programming, FIFO enable, line attributes and a
    /// FIFO clear, in that order. On any failure the bus is closed and the
    /// failing step's error is returned.
    pub fn open_with_bus(config: &Config, bus: B) -> Result<Self, Error<B::Error>> {
        let conf = config.normalized();
        let mut dev = UartBridgeDevice::new(bus, conf.crystal_hz, conf.timeout);

        match dev.initialize(&conf) {
            Ok(()) => {
                debug!(
                    "opened bridge {:#04x} on bus {}: {} baud, {} data bits, {:?} parity, {:?} stop",
                    conf.address, conf.bus, conf.baud, conf.data_bits, conf.parity, conf.stop_bits
                );
                Ok(dev)
            }
            Err(err) => {
                debug!("open failed: {}", err);
                if let Err(close_err) = dev.close() {
                    warn!("closing bus after failed open: {}", close_err);
                }
                Err(err)
            }
        }
    }

    fn new(bus: B, crystal_hz: u32, timeout: Duration) -> Self {
        UartBridgeDevice {
            bus,
            crystal_hz,
            timeout,
        }
    }

    fn initialize(&mut self, conf: &Config) -> Result<(), Error<B::Error>> {
        self.test_chip()?;
        self.set_baud_rate(conf.baud)?;
        self.enable_fifo(true)?;
        self.set_uart_attributes(conf.data_bits, conf.stop_bits, conf.parity)?;
        self.clear_fifo(FifoSelector::Both)
    }

    /// Release the underlying bus
    pub fn close(mut self) -> Result<(), Error<B::Error>> {
        self.bus.close().map_err(Error::Bus)
    }

    pub fn crystal_hz(&self) -> u32 {
        self.crystal_hz
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ------------------------------------------------------------------
    // Register primitives
    // ------------------------------------------------------------------

    fn read_register(&mut self, reg: Register) -> Result<u8, Error<B::Error>> {
        let value = self.bus.read_register(reg.raw_address()).map_err(Error::Bus)?;
        trace!("read {:?} -> {:#04x}", reg, value);
        Ok(value)
    }

    fn write_register(&mut self, reg: Register, value: u8) -> Result<(), Error<B::Error>> {
        trace!("write {:?} <- {:#04x}", reg, value);
        self.bus
            .write_register(reg.raw_address(), value)
            .map_err(Error::Bus)
    }

    /// Read-modify-write of a single bit, not atomic on the chip
    fn update_bit(&mut self, reg: Register, bit: u8, set: bool) -> Result<(), Error<B::Error>> {
        let mut flags = self.read_register(reg)?;
        if set {
            flags |= 1 << bit;
        } else {
            flags &= !(1 << bit);
        }
        self.write_register(reg, flags)
    }

    fn peek_bit(&mut self, reg: Register, bit: u8) -> Result<bool, Error<B::Error>> {
        Ok(self.read_register(reg)? & (1 << bit) != 0)
    }

    /// Run `f` with `set` selected, then return to the general set.
    ///
    /// `f` gets the active set so that banked accesses can be checked
    /// against it. A failure inside leaves the chip in `set`.
    fn with_register_set<T, F>(&mut self, set: RegisterSet, f: F) -> Result<T, Error<B::Error>>
    where
        F: FnOnce(&mut Self, RegisterSet) -> Result<T, Error<B::Error>>,
    {
        match set {
            RegisterSet::General => f(self, set),
            RegisterSet::Special => {
                self.update_bit(Register::LCR, DIVISOR_LATCH_BIT, true)?;
                let value = f(self, set)?;
                self.update_bit(Register::LCR, DIVISOR_LATCH_BIT, false)?;
                Ok(value)
            }
            RegisterSet::Enhanced => {
                let saved = self.read_register(Register::LCR)?;
                self.write_register(Register::LCR, ENHANCED_SET_KEY)?;
                let value = f(self, set)?;
                self.write_register(Register::LCR, saved)?;
                Ok(value)
            }
        }
    }

    fn read_banked(&mut self, active: RegisterSet, reg: Register) -> Result<u8, Error<B::Error>> {
        debug_assert_eq!(reg.set(), active, "{:?} read outside its register set", reg);
        self.read_register(reg)
    }

    fn write_banked(
        &mut self,
        active: RegisterSet,
        reg: Register,
        value: u8,
    ) -> Result<(), Error<B::Error>> {
        debug_assert_eq!(reg.set(), active, "{:?} written outside its register set", reg);
        self.write_register(reg, value)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Program the divisor latches for `baud`
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Error<B::Error>> {
        let prescaler = if self.peek_bit(Register::MCR, ModemControl::CLOCK_DIVISOR)? {
            4
        } else {
            1
        };

        let divisor =
            baud_divisor(self.crystal_hz, prescaler, baud).ok_or(Error::InvalidBaudRate(baud))?;
        let [low, high] = divisor.to_le_bytes();

        self.with_register_set(RegisterSet::Special, |dev, set| {
            dev.write_banked(set, Register::DLL, low)?;
            dev.write_banked(set, Register::DLH, high)
        })?;

        debug!(
            "baud {} from {} Hz: divisor {} (prescaler {})",
            baud, self.crystal_hz, divisor, prescaler
        );
        Ok(())
    }

    /// Scratchpad round-trip
    fn test_chip(&mut self) -> Result<(), Error<B::Error>> {
        self.write_register(Register::SPR, SCRATCHPAD_TEST_VALUE)?;
        let found = self.read_register(Register::SPR)?;
        if found != SCRATCHPAD_TEST_VALUE {
            return Err(Error::SelfTestMismatch {
                expected: SCRATCHPAD_TEST_VALUE,
                found,
            });
        }
        Ok(())
    }

    /// Compose and write the LCR word length, stop bits and parity
    fn set_uart_attributes(
        &mut self,
        data_bits: u8,
        stop_bits: StopBits,
        parity: Parity,
    ) -> Result<(), Error<B::Error>> {
        let word_length = match data_bits {
            5..=8 => data_bits - 5,
            other => return Err(Error::UnsupportedDataBits(other)),
        };

        let mut lcr = LineControl::from_bits(0);
        lcr.set_word_length(word_length);
        lcr.set_extra_stop_bits(stop_bits != StopBits::One);
        lcr.set_parity(parity.lcr_bits());

        self.write_register(Register::LCR, lcr.bits())
    }

    fn enable_fifo(&mut self, on: bool) -> Result<(), Error<B::Error>> {
        let mut fcr = FifoControl::from_bits(0);
        fcr.set_fifo_enable(on);
        self.write_register(Register::FCR, fcr.bits())
    }

    /// Reset the selected FIFOs, keeping the current FIFO enable state
    pub fn clear_fifo(&mut self, selector: FifoSelector) -> Result<(), Error<B::Error>> {
        let iir = InterruptIdent::from_bits(self.read_register(Register::IIR)?);

        let mut fcr = FifoControl::from_bits(0);
        fcr.set_fifo_enable(iir.fifo_enabled());
        fcr.set_reset_rx_fifo(matches!(selector, FifoSelector::Receive | FifoSelector::Both));
        fcr.set_reset_tx_fifo(matches!(selector, FifoSelector::Transmit | FifoSelector::Both));

        self.write_register(Register::FCR, fcr.bits())
    }

    /// Toggle EFR[4], which unlocks the extended IER, FCR and MCR bits
    pub fn set_enhanced_functions(&mut self, enable: bool) -> Result<(), Error<B::Error>> {
        self.with_register_set(RegisterSet::Enhanced, |dev, set| {
            let mut efr = EnhancedFeatures::from_bits(dev.read_banked(set, Register::EFR)?);
            efr.set_enhanced_functions(enable);
            dev.write_banked(set, Register::EFR, efr.bits())
        })
    }

    /// Hardware RTS/CTS flow control, EFR[6] and EFR[7]
    pub fn set_auto_flow_control(&mut self, rts: bool, cts: bool) -> Result<(), Error<B::Error>> {
        self.with_register_set(RegisterSet::Enhanced, |dev, set| {
            let mut efr = EnhancedFeatures::from_bits(dev.read_banked(set, Register::EFR)?);
            efr.set_auto_rts(rts);
            efr.set_auto_cts(cts);
            dev.write_banked(set, Register::EFR, efr.bits())
        })
    }

    // ------------------------------------------------------------------
    // Byte stream
    // ------------------------------------------------------------------

    /// Busy-poll an LSR flag until set or the timeout elapses
    fn wait_for_status(&mut self, bit: u8) -> Result<(), Error<B::Error>> {
        let timeout = self.timeout;
        match poll_until(timeout, || self.peek_bit(Register::LSR, bit))? {
            PollResult::Ready => Ok(()),
            PollResult::TimedOut => Err(Error::Timeout),
        }
    }

    /// Wait for room in the transmit holding register, then send `byte`
    pub fn write_byte(&mut self, byte: u8) -> Result<(), Error<B::Error>> {
        self.wait_for_status(LineStatus::THR_EMPTY)?;
        self.write_register(Register::THR, byte)
    }

    /// Send every byte of `buf`.
    ///
    /// The first failing byte aborts the call; how many bytes went out before
    /// it is not reported.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, Error<B::Error>> {
        for &byte in buf {
            self.write_byte(byte)?;
        }
        Ok(buf.len())
    }

    /// Wait until both THR and the transmit shift register are empty
    pub fn flush(&mut self) -> Result<(), Error<B::Error>> {
        self.wait_for_status(LineStatus::TRANSMITTER_EMPTY)
    }

    /// Read RHR without checking for data first
    pub fn read_byte(&mut self) -> Result<u8, Error<B::Error>> {
        self.read_register(Register::RHR)
    }

    /// Wait for received data and drain up to `buf.len()` bytes of it.
    ///
    /// Returns the number of bytes stored. A bus failure part way through
    /// is reported as [`Error::PartialRead`] with the bytes already stored.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error<B::Error>> {
        self.wait_for_status(LineStatus::DATA_READY)?;

        let available = usize::from(self.rx_fifo_level()?);
        let count = buf.len().min(available);

        for (read, slot) in buf[..count].iter_mut().enumerate() {
            *slot = self
                .bus
                .read_register(Register::RHR.raw_address())
                .map_err(|source| Error::PartialRead { read, source })?;
        }

        trace!("read {} of {} available bytes", count, available);
        Ok(count)
    }

    /// Bytes waiting in the receive FIFO
    pub fn rx_fifo_level(&mut self) -> Result<u8, Error<B::Error>> {
        self.read_register(Register::RXLVL)
    }

    /// Free slots in the transmit FIFO
    pub fn tx_fifo_space(&mut self) -> Result<u8, Error<B::Error>> {
        self.read_register(Register::TXLVL)
    }
}

impl<B: RegisterBus> io::Read for UartBridgeDevice<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match UartBridgeDevice::read(self, buf) {
            Ok(count) => Ok(count),
            // Report what was stored; the bus fault resurfaces on the next call
            Err(Error::PartialRead { read, source }) if read > 0 => {
                warn!("short read of {} bytes: {:?}", read, source);
                Ok(read)
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl<B: RegisterBus> io::Write for UartBridgeDevice<B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        UartBridgeDevice::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        UartBridgeDevice::flush(self).map_err(io::Error::from)
    }
}

impl<B: RegisterBus> embedded_hal::blocking::serial::Write<u8> for UartBridgeDevice<B> {
    type Error = Error<B::Error>;

    fn bwrite_all(&mut self, buffer: &[u8]) -> Result<(), Self::Error> {
        UartBridgeDevice::write(self, buffer).map(|_| ())
    }

    fn bflush(&mut self) -> Result<(), Self::Error> {
        UartBridgeDevice::flush(self)
    }
}
