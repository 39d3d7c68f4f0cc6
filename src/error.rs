//! Error types for bridge operations

use core::fmt;
use std::io;

/// Errors returned by [`UartBridgeDevice`](crate::UartBridgeDevice)
///
/// `E` is the error type of the underlying register bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error<E> {
    /// Register transaction failed on the bus
    Bus(E),
    /// Readiness flag was not observed before the deadline
    Timeout,
    /// Scratchpad readback differed from what was written
    SelfTestMismatch { expected: u8, found: u8 },
    /// Data bit count outside 5..=8
    UnsupportedDataBits(u8),
    /// Baud rate yields no usable 16-bit divisor for the crystal
    InvalidBaudRate(u32),
    /// Bus failed after `read` bytes were already stored in the buffer
    PartialRead { read: usize, source: E },
}

impl<E> Error<E> {
    /// Bytes that made it into the caller's buffer before the failure
    pub fn bytes_read(&self) -> usize {
        match self {
            Error::PartialRead { read, .. } => *read,
            _ => 0,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {:?}", e),
            Error::Timeout => write!(f, "timeout reached"),
            Error::SelfTestMismatch { expected, found } => write!(
                f,
                "scratchpad register value mismatched (wrote {:#04x}, read {:#04x})",
                expected, found
            ),
            Error::UnsupportedDataBits(bits) => write!(f, "unsupported data bits: {}", bits),
            Error::InvalidBaudRate(baud) => write!(f, "invalid baud rate: {}", baud),
            Error::PartialRead { read, source } => {
                write!(f, "bus error after {} bytes read: {:?}", read, source)
            }
        }
    }
}

impl<E: fmt::Debug> std::error::Error for Error<E> {}

impl<E: fmt::Debug> From<Error<E>> for io::Error {
    fn from(err: Error<E>) -> Self {
        let kind = match err {
            Error::Timeout => io::ErrorKind::TimedOut,
            Error::UnsupportedDataBits(_) | Error::InvalidBaudRate(_) => {
                io::ErrorKind::InvalidInput
            }
            Error::SelfTestMismatch { .. } => io::ErrorKind::InvalidData,
            Error::Bus(_) | Error::PartialRead { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: Error<()> = Error::SelfTestMismatch { expected: 0xde, found: 0x00 };
        assert_eq!(
            format!("{}", err),
            "scratchpad register value mismatched (wrote 0xde, read 0x00)"
        );
        assert_eq!(format!("{}", Error::<()>::Timeout), "timeout reached");
        assert_eq!(format!("{}", Error::<()>::UnsupportedDataBits(9)), "unsupported data bits: 9");
    }

    #[test]
    fn test_io_error_kind() {
        let io_err: io::Error = Error::<()>::Timeout.into();
        assert_eq!(io_err.kind(), io::ErrorKind::TimedOut);

        let io_err: io::Error = Error::Bus("nack").into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_bytes_read() {
        assert_eq!(Error::PartialRead { read: 3, source: () }.bytes_read(), 3);
        assert_eq!(Error::<()>::Timeout.bytes_read(), 0);
    }
}
