//! SC16IS7x0 register map
//!
//! Offsets are only meaningful together with the register set that is active
//! on the chip. The general set is the default; the special set (divisor
//! latches) is reached with LCR[7] = 1 and the enhanced set with LCR = 0xBF.

use bitfield::bitfield;
use core::fmt;

/// Value written to the scratchpad during the open-time self-test
pub const SCRATCHPAD_TEST_VALUE: u8 = 0xDE;

/// LCR value that unlocks the enhanced register set
pub const ENHANCED_SET_KEY: u8 = 0xBF;

/// Which bank of registers an offset refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSet {
    General,
    /// Divisor latches, LCR[7] = 1 and LCR != 0xBF
    Special,
    /// EFR and XON/XOFF, LCR = 0xBF
    Enhanced,
}

/// A register offset tagged with the set it belongs to
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Register {
    offset: u8,
    set: RegisterSet,
    name: &'static str,
}

impl Register {
    // General register set
    pub const RHR: Register = Register::general(0x00, "RHR");
    pub const THR: Register = Register::general(0x00, "THR");
    pub const IER: Register = Register::general(0x01, "IER");
    pub const FCR: Register = Register::general(0x02, "FCR");
    pub const IIR: Register = Register::general(0x02, "IIR");
    pub const LCR: Register = Register::general(0x03, "LCR");
    pub const MCR: Register = Register::general(0x04, "MCR");
    pub const LSR: Register = Register::general(0x05, "LSR");
    pub const MSR: Register = Register::general(0x06, "MSR");
    pub const SPR: Register = Register::general(0x07, "SPR");
    pub const TCR: Register = Register::general(0x06, "TCR");
    pub const TLR: Register = Register::general(0x07, "TLR");
    pub const TXLVL: Register = Register::general(0x08, "TXLVL");
    pub const RXLVL: Register = Register::general(0x09, "RXLVL");
    pub const IODIR: Register = Register::general(0x0A, "IODIR");
    pub const IOSTATE: Register = Register::general(0x0B, "IOSTATE");
    pub const IOINTENA: Register = Register::general(0x0C, "IOINTENA");
    pub const IOCONTROL: Register = Register::general(0x0E, "IOCONTROL");
    pub const EFCR: Register = Register::general(0x0F, "EFCR");

    // Special register set
    pub const DLL: Register = Register::special(0x00, "DLL");
    pub const DLH: Register = Register::special(0x01, "DLH");

    // Enhanced register set
    pub const EFR: Register = Register::enhanced(0x02, "EFR");
    pub const XON1: Register = Register::enhanced(0x04, "XON1");
    pub const XON2: Register = Register::enhanced(0x05, "XON2");
    pub const XOFF1: Register = Register::enhanced(0x06, "XOFF1");
    pub const XOFF2: Register = Register::enhanced(0x07, "XOFF2");

    const fn general(offset: u8, name: &'static str) -> Self {
        Register { offset, set: RegisterSet::General, name }
    }

    const fn special(offset: u8, name: &'static str) -> Self {
        Register { offset, set: RegisterSet::Special, name }
    }

    const fn enhanced(offset: u8, name: &'static str) -> Self {
        Register { offset, set: RegisterSet::Enhanced, name }
    }

    /// Offset within the register bank
    pub const fn offset(self) -> u8 {
        self.offset
    }

    /// Register set that must be active to reach this register
    pub const fn set(self) -> RegisterSet {
        self.set
    }

    pub const fn name(self) -> &'static str {
        self.name
    }

    /// Sub-address placed on the bus (offset in bits 6:3, channel bits zero)
    pub const fn raw_address(self) -> u8 {
        self.offset << 3
    }
}

impl fmt::Debug for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#04x}", self.name, self.offset)
    }
}

bitfield! {
    /// Line Control Register
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct LineControl(u8);
    impl Debug;
    u8;
    /// Word length, data bits minus five
    pub word_length, set_word_length: 1, 0;
    /// 1.5 or 2 stop bits when set
    pub extra_stop_bits, set_extra_stop_bits: 2;
    /// Parity enable, type and forcing, bits 5:3 taken together
    pub parity, set_parity: 5, 3;
    pub break_control, set_break_control: 6;
    /// Divisor latch enable, selects the special register set
    pub divisor_latch_enable, set_divisor_latch_enable: 7;
}

bitfield! {
    /// Line Status Register
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct LineStatus(u8);
    impl Debug;
    pub data_ready, _: 0;
    pub overrun_error, _: 1;
    pub parity_error, _: 2;
    pub framing_error, _: 3;
    pub break_interrupt, _: 4;
    /// Transmit holding register empty
    pub thr_empty, _: 5;
    /// THR and TSR both empty
    pub transmitter_empty, _: 6;
    pub fifo_data_error, _: 7;
}

impl LineStatus {
    pub const DATA_READY: u8 = 0;
    pub const THR_EMPTY: u8 = 5;
    pub const TRANSMITTER_EMPTY: u8 = 6;
}

bitfield! {
    /// FIFO Control Register (write only)
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct FifoControl(u8);
    impl Debug;
    u8;
    pub fifo_enable, set_fifo_enable: 0;
    pub reset_rx_fifo, set_reset_rx_fifo: 1;
    pub reset_tx_fifo, set_reset_tx_fifo: 2;
    pub tx_trigger, set_tx_trigger: 5, 4;
    pub rx_trigger, set_rx_trigger: 7, 6;
}

bitfield! {
    /// Interrupt Identification Register
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct InterruptIdent(u8);
    impl Debug;
    u8;
    pub no_interrupt, _: 0;
    pub priority, _: 5, 1;
    /// Mirrors FCR[0], both bits set while the FIFOs are enabled
    pub fifo_enabled_bits, _: 7, 6;
}

impl InterruptIdent {
    pub fn fifo_enabled(&self) -> bool {
        self.fifo_enabled_bits() != 0
    }
}

bitfield! {
    /// Modem Control Register
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct ModemControl(u8);
    impl Debug;
    pub dtr, _: 0;
    pub rts, _: 1;
    pub tcr_tlr_enable, _: 2;
    pub loopback, _: 4;
    pub xon_any, _: 5;
    pub irda_mode, _: 6;
    /// Input clock divided by four before the baud generator
    pub clock_divisor, _: 7;
}

impl ModemControl {
    pub const CLOCK_DIVISOR: u8 = 7;
}

bitfield! {
    /// Enhanced Features Register
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct EnhancedFeatures(u8);
    impl Debug;
    u8;
    pub software_flow_control, set_software_flow_control: 3, 0;
    /// Unlocks IER[7:4], FCR[5:4], MCR[7:5]
    pub enhanced_functions, set_enhanced_functions: 4;
    pub special_char_detect, set_special_char_detect: 5;
    pub auto_rts, set_auto_rts: 6;
    pub auto_cts, set_auto_cts: 7;
}

impl EnhancedFeatures {
    pub const ENHANCED_FUNCTIONS: u8 = 4;
}

/// Raw byte conversions for the register layouts
macro_rules! raw_bits {
    ($($name:ident),* $(,)?) => {
        $(
            impl $name {
                pub const fn from_bits(bits: u8) -> Self {
                    $name(bits)
                }

                pub const fn bits(&self) -> u8 {
                    self.0
                }
            }
        )*
    };
}

raw_bits!(
    LineControl,
    LineStatus,
    FifoControl,
    InterruptIdent,
    ModemControl,
    EnhancedFeatures,
);
