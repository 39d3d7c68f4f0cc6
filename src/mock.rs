//! Recording register bus for tests
//!
//! Simulates enough of the bridge to drive the device end to end: the
//! scratchpad, LCR-gated special and enhanced register sets, an RX FIFO and
//! the LSR flags. Every raw transaction is recorded. Clones share state, so a
//! test can keep a handle after the device has taken ownership of the bus.

use crate::bus::RegisterBus;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Error injected by the recording bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

/// One raw transaction as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read(u8),
    Write(u8, u8),
}

pub struct ChipState {
    general: [u8; 16],
    enhanced: [u8; 8],
    dll: u8,
    dlh: u8,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    ops: Vec<Op>,
    closed: usize,
    /// LSR bits reported regardless of the RX FIFO
    lsr: u8,
    rx_level: Option<u8>,
    tx_level: u8,
    scratch_readback: Option<u8>,
    fail_all: bool,
    fail_rhr_after: Option<usize>,
    rhr_reads: usize,
}

impl ChipState {
    fn new() -> Self {
        ChipState {
            general: [0u8; 16],
            enhanced: [0u8; 8],
            dll: 0,
            dlh: 0,
            rx: VecDeque::new(),
            tx: Vec::new(),
            ops: Vec::new(),
            closed: 0,
            // THR and TSR empty
            lsr: 0x60,
            rx_level: None,
            tx_level: 64,
            scratch_readback: None,
            fail_all: false,
            fail_rhr_after: None,
            rhr_reads: 0,
        }
    }

    fn lcr(&self) -> u8 {
        self.general[3]
    }

    fn read(&mut self, raw: u8) -> Result<u8, BusFault> {
        if self.fail_all {
            return Err(BusFault);
        }
        self.ops.push(Op::Read(raw));

        let offset = (raw >> 3) as usize;
        let lcr = self.lcr();
        let value = match offset {
            3 => lcr,
            0 if lcr & 0x80 != 0 => self.dll,
            1 if lcr & 0x80 != 0 => self.dlh,
            2 | 4..=7 if lcr == 0xBF => self.enhanced[offset],
            0 => {
                if let Some(limit) = self.fail_rhr_after {
                    if self.rhr_reads >= limit {
                        return Err(BusFault);
                    }
                }
                self.rhr_reads += 1;
                self.rx.pop_front().unwrap_or(0)
            }
            2 => {
                // FIFO enable mirrored into IIR[7:6]
                if self.general[2] & 0x01 != 0 {
                    0xC1
                } else {
                    0x01
                }
            }
            5 => self.lsr | u8::from(!self.rx.is_empty()),
            7 => self.scratch_readback.unwrap_or(self.general[7]),
            8 => self.tx_level,
            9 => self.rx_level.unwrap_or(self.rx.len() as u8),
            _ => self.general[offset],
        };
        Ok(value)
    }

    fn write(&mut self, raw: u8, value: u8) -> Result<(), BusFault> {
        if self.fail_all {
            return Err(BusFault);
        }
        self.ops.push(Op::Write(raw, value));

        let offset = (raw >> 3) as usize;
        let lcr = self.lcr();
        match offset {
            3 => self.general[3] = value,
            0 if lcr & 0x80 != 0 => self.dll = value,
            1 if lcr & 0x80 != 0 => self.dlh = value,
            2 | 4..=7 if lcr == 0xBF => self.enhanced[offset] = value,
            0 => self.tx.push(value),
            2 => {
                if value & 0x02 != 0 {
                    self.rx.clear();
                }
                self.general[2] = value;
            }
            _ => self.general[offset] = value,
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordingBus {
    state: Rc<RefCell<ChipState>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        RecordingBus {
            state: Rc::new(RefCell::new(ChipState::new())),
        }
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.borrow().ops.clone()
    }

    /// Recorded writes as `(raw_address, value)`
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.state
            .borrow()
            .ops
            .iter()
            .filter_map(|op| match *op {
                Op::Write(raw, value) => Some((raw, value)),
                Op::Read(_) => None,
            })
            .collect()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    pub fn closed(&self) -> usize {
        self.state.borrow().closed
    }

    pub fn transmitted(&self) -> Vec<u8> {
        self.state.borrow().tx.clone()
    }

    pub fn divisor(&self) -> (u8, u8) {
        let state = self.state.borrow();
        (state.dll, state.dlh)
    }

    pub fn lcr(&self) -> u8 {
        self.state.borrow().lcr()
    }

    pub fn efr(&self) -> u8 {
        self.state.borrow().enhanced[2]
    }

    pub fn fcr(&self) -> u8 {
        self.state.borrow().general[2]
    }

    pub fn queue_rx(&self, bytes: &[u8]) {
        self.state.borrow_mut().rx.extend(bytes.iter().copied());
    }

    pub fn set_lsr(&self, lsr: u8) {
        self.state.borrow_mut().lsr = lsr;
    }

    pub fn set_rx_level(&self, level: u8) {
        self.state.borrow_mut().rx_level = Some(level);
    }

    pub fn set_tx_level(&self, level: u8) {
        self.state.borrow_mut().tx_level = level;
    }

    pub fn set_lcr(&self, lcr: u8) {
        self.state.borrow_mut().general[3] = lcr;
    }

    /// Force the scratchpad to read back `value`
    pub fn set_scratch_readback(&self, value: u8) {
        self.state.borrow_mut().scratch_readback = Some(value);
    }

    /// Set MCR[7], the crystal divide-by-four prescaler
    pub fn set_clock_divisor(&self, on: bool) {
        let mut state = self.state.borrow_mut();
        if on {
            state.general[4] |= 0x80;
        } else {
            state.general[4] &= !0x80;
        }
    }

    pub fn fail_all(&self) {
        self.state.borrow_mut().fail_all = true;
    }

    /// Fail RHR reads once `count` of them have succeeded
    pub fn fail_rhr_after(&self, count: usize) {
        self.state.borrow_mut().fail_rhr_after = Some(count);
    }
}

impl RegisterBus for RecordingBus {
    type Error = BusFault;

    fn read_register(&mut self, raw_address: u8) -> Result<u8, BusFault> {
        self.state.borrow_mut().read(raw_address)
    }

    fn write_register(&mut self, raw_address: u8, value: u8) -> Result<(), BusFault> {
        self.state.borrow_mut().write(raw_address, value)
    }

    fn close(&mut self) -> Result<(), BusFault> {
        self.state.borrow_mut().closed += 1;
        Ok(())
    }
}
