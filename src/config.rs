//! Open-time configuration

use core::time::Duration;

/// Data bits used when `Config::data_bits` is zero
pub const DEFAULT_DATA_BITS: u8 = 8;

/// Bus index used when `Config::bus` is zero
pub const DEFAULT_BUS: u8 = 1;

/// Read and write timeout used when `Config::timeout` is zero
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    /// Parity bit always 1
    Mark,
    /// Parity bit always 0
    Space,
}

impl Parity {
    /// LCR[5:3] encoding
    pub const fn lcr_bits(self) -> u8 {
        match self {
            Parity::None => 0,
            Parity::Odd => 1,
            Parity::Even => 3,
            Parity::Mark => 5,
            Parity::Space => 7,
        }
    }
}

impl From<u8> for Parity {
    /// Conventional letter codes `N`, `O`, `E`, `M`, `S`.
    ///
    /// Anything else is treated as no parity.
    fn from(code: u8) -> Self {
        match code {
            b'O' | b'o' => Parity::Odd,
            b'E' | b'e' => Parity::Even,
            b'M' | b'm' => Parity::Mark,
            b'S' | b's' => Parity::Space,
            b'N' | b'n' => Parity::None,
            other => {
                log::warn!("unrecognized parity code {:#04x}, using no parity", other);
                Parity::None
            }
        }
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    OneAndHalf,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = u8;

    /// Numeric codes `1`, `15` (one and a half) and `2`
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(StopBits::One),
            15 => Ok(StopBits::OneAndHalf),
            2 => Ok(StopBits::Two),
            other => Err(other),
        }
    }
}

/// Parameters for [`UartBridgeDevice::open`](crate::UartBridgeDevice::open)
///
/// Zero-valued fields are replaced by their defaults at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Bus address of the bridge (7-bit I2C address)
    pub address: u8,
    /// Bus index, e.g. the `N` in `/dev/i2c-N`
    pub bus: u8,
    /// Desired baud rate
    pub baud: u32,
    /// Frequency of the crystal on XTAL1, in Hz
    pub crystal_hz: u32,
    /// Read and write timeout
    pub timeout: Duration,
    /// Number of data bits, 5 to 8
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Config {
    pub fn new(address: u8, crystal_hz: u32, baud: u32) -> Self {
        Config {
            address,
            crystal_hz,
            baud,
            ..Default::default()
        }
    }

    /// Copy with defaults applied to zero-valued fields
    pub fn normalized(&self) -> Self {
        let mut conf = *self;
        if conf.data_bits == 0 {
            conf.data_bits = DEFAULT_DATA_BITS;
        }
        if conf.bus == 0 {
            conf.bus = DEFAULT_BUS;
        }
        if conf.timeout.is_zero() {
            conf.timeout = DEFAULT_TIMEOUT;
        }
        conf
    }
}
