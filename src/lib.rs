//! Driver for the NXP SC16IS740/750/760 single UART with I2C/SPI interface
//!
//! The bridge is reached through a [`RegisterBus`]; ready-made adapters exist
//! for embedded-hal I2C and SPI peripherals. [`UartBridgeDevice::open`]
//! self-tests and programs the chip, after which it behaves as a blocking
//! byte stream (`std::io::Read`/`Write`).
//!
//! ```no_run
//! # use sc16is7x0::{Config, UartBridgeDevice, RegisterBus};
//! # fn connect<B: RegisterBus>(bus: B) -> Result<(), sc16is7x0::Error<B::Error>> {
//! let conf = Config::new(0x48, 14_745_600, 9600);
//! let mut dev = UartBridgeDevice::open_with_bus(&conf, bus)?;
//! dev.write(&[0xFF, 0x01, 0x86, 0x00, 0x00, 0x00, 0x00, 0x00, 0x79])?;
//! let mut reply = [0u8; 9];
//! let n = dev.read(&mut reply)?;
//! # let _ = n;
//! dev.close()
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod device;
pub mod error;
pub mod registers;
pub mod timeout;

#[cfg(test)]
mod mock;

pub use bus::{I2cRegisterBus, RegisterBus, SpiBusError, SpiRegisterBus};
pub use config::{Config, Parity, StopBits};
pub use device::{FifoSelector, UartBridgeDevice};
pub use error::Error;
