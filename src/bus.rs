//! Register bus collaborator
//!
//! The driver only needs single-byte register reads and writes at a raw
//! sub-address. [`I2cRegisterBus`] and [`SpiRegisterBus`] provide that on top
//! of the blocking embedded-hal traits.

use core::fmt;
use embedded_hal::blocking::{i2c, spi};
use embedded_hal::digital::v2::OutputPin;

/// SPI header bit selecting a register read
const SPI_READ: u8 = 0x80;

/// Single-register transactions against the bridge
pub trait RegisterBus {
    type Error: fmt::Debug;

    /// Read the register at `raw_address` (offset already shifted into place)
    fn read_register(&mut self, raw_address: u8) -> Result<u8, Self::Error>;

    /// Write `value` to the register at `raw_address`
    fn write_register(&mut self, raw_address: u8, value: u8) -> Result<(), Self::Error>;

    /// Release whatever the bus holds open
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    type Error = B::Error;

    fn read_register(&mut self, raw_address: u8) -> Result<u8, Self::Error> {
        (**self).read_register(raw_address)
    }

    fn write_register(&mut self, raw_address: u8, value: u8) -> Result<(), Self::Error> {
        (**self).write_register(raw_address, value)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        (**self).close()
    }
}

/// Bridge attached over I2C
///
/// The register sub-address is sent as the first byte of every transfer.
pub struct I2cRegisterBus<I> {
    i2c: I,
    address: u8,
}

impl<I> I2cRegisterBus<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        I2cRegisterBus { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give back the I2C peripheral
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I, E> RegisterBus for I2cRegisterBus<I>
where
    I: i2c::Write<Error = E> + i2c::WriteRead<Error = E>,
    E: fmt::Debug,
{
    type Error = E;

    fn read_register(&mut self, raw_address: u8) -> Result<u8, E> {
        let mut value = [0u8; 1];
        self.i2c.write_read(self.address, &[raw_address], &mut value)?;
        Ok(value[0])
    }

    fn write_register(&mut self, raw_address: u8, value: u8) -> Result<(), E> {
        self.i2c.write(self.address, &[raw_address, value])
    }
}

/// Failure on an SPI-attached bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiBusError<S, P> {
    Spi(S),
    ChipSelect(P),
}

/// Bridge attached over SPI with a dedicated chip-select line
pub struct SpiRegisterBus<S, CS> {
    spi: S,
    cs: CS,
}

impl<S, CS> SpiRegisterBus<S, CS> {
    pub fn new(spi: S, cs: CS) -> Self {
        SpiRegisterBus { spi, cs }
    }

    /// Give back the SPI peripheral and chip-select pin
    pub fn release(self) -> (S, CS) {
        (self.spi, self.cs)
    }
}

impl<S, CS, PE> SpiRegisterBus<S, CS>
where
    CS: OutputPin<Error = PE>,
{
    /// Run `f` with chip select asserted; CS is released even if `f` fails
    fn selected<T, SE, F>(&mut self, f: F) -> Result<T, SpiBusError<SE, PE>>
    where
        F: FnOnce(&mut S) -> Result<T, SE>,
    {
        self.cs.set_low().map_err(SpiBusError::ChipSelect)?;
        let result = f(&mut self.spi).map_err(SpiBusError::Spi);
        self.cs.set_high().map_err(SpiBusError::ChipSelect)?;
        result
    }
}

impl<S, CS, SE, PE> RegisterBus for SpiRegisterBus<S, CS>
where
    S: spi::Transfer<u8, Error = SE> + spi::Write<u8, Error = SE>,
    CS: OutputPin<Error = PE>,
    SE: fmt::Debug,
    PE: fmt::Debug,
{
    type Error = SpiBusError<SE, PE>;

    fn read_register(&mut self, raw_address: u8) -> Result<u8, Self::Error> {
        self.selected(|spi| {
            let mut frame = [SPI_READ | raw_address, 0];
            let response = spi.transfer(&mut frame)?;
            Ok(response[1])
        })
    }

    fn write_register(&mut self, raw_address: u8, value: u8) -> Result<(), Self::Error> {
        self.selected(|spi| spi::Write::write(spi, &[raw_address, value]))
    }
}
