//! Mutable state of one programmer session.
//!
//! Everything the dispatcher and the pump share lives here, so a board holds
//! exactly one `Session` and hands it to both by reference.

use aspserial_shared::{BaudRate, Command, DataBits, Parity};

use crate::isp::SCK_AUTO;
use crate::ring::RingBuffer;
use crate::{RX_RING_CAPACITY, TX_RING_CAPACITY};

/// Host to target bytes, drained by the pump.
pub type TxRing = RingBuffer<TX_RING_CAPACITY>;

/// Target to host bytes, filled by the pump.
pub type RxRing = RingBuffer<RX_RING_CAPACITY>;

/// The single active interpretation of the control pipe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    ReadFlash,
    ReadEeprom,
    WriteFlash,
    WriteEeprom,
    ReadSerial,
    WriteSerial,
}

impl Mode {
    /// Mode a streamed command enters, `None` for one-shot commands.
    pub fn entered_by(command: Command) -> Option<Self> {
        match command {
            Command::ReadFlash => Some(Mode::ReadFlash),
            Command::ReadEeprom => Some(Mode::ReadEeprom),
            Command::WriteFlash => Some(Mode::WriteFlash),
            Command::WriteEeprom => Some(Mode::WriteEeprom),
            Command::ReadSerial => Some(Mode::ReadSerial),
            Command::WriteSerial => Some(Mode::WriteSerial),
            _ => None,
        }
    }

    pub fn is_read(self) -> bool {
        matches!(self, Mode::ReadFlash | Mode::ReadEeprom | Mode::ReadSerial)
    }

    pub fn is_write(self) -> bool {
        matches!(self, Mode::WriteFlash | Mode::WriteEeprom | Mode::WriteSerial)
    }
}

/// Line parameters currently programmed into the UART. A field is `None`
/// until a configure request applied it; a rejected field keeps its
/// previous value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineState {
    pub baud: Option<BaudRate>,
    pub data_bits: Option<DataBits>,
    pub parity: Option<Parity>,
}

pub struct Session {
    pub(crate) mode: Mode,
    /// Bytes left in the current streamed transfer.
    pub(crate) remaining: u16,
    pub(crate) address: u32,
    /// Address came from SET_LONG_ADDRESS; ignore the 16-bit one in commands.
    pub(crate) long_address: bool,
    pub(crate) page_size: u16,
    pub(crate) block_flags: u8,
    pub(crate) page_counter: u16,
    pub(crate) isp_sck: u8,
    pub(crate) line: LineState,
    pub(crate) tx: TxRing,
    pub(crate) rx: RxRing,
}

impl Session {
    pub const fn new() -> Self {
        Self {
            mode: Mode::Idle,
            remaining: 0,
            address: 0,
            long_address: false,
            page_size: 0,
            block_flags: 0,
            page_counter: 0,
            isp_sck: SCK_AUTO,
            line: LineState {
                baud: None,
                data_bits: None,
                parity: None,
            },
            tx: RingBuffer::new(),
            rx: RingBuffer::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn remaining_bytes(&self) -> u16 {
        self.remaining
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn line(&self) -> LineState {
        self.line
    }

    pub fn tx(&self) -> &TxRing {
        &self.tx
    }

    pub fn rx(&self) -> &RxRing {
        &self.rx
    }

    pub fn tx_mut(&mut self) -> &mut TxRing {
        &mut self.tx
    }

    pub fn rx_mut(&mut self) -> &mut RxRing {
        &mut self.rx
    }

    pub(crate) fn enter(&mut self, mode: Mode) {
        if self.mode != mode {
            log::debug!("mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
