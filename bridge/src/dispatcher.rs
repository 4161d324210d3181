//! Vendor request dispatcher.
//!
//! The USB stack hands over each SETUP packet through
//! [`ControlHandler::setup`]. One-shot commands answer right away; streamed
//! commands switch the session into a read or write mode and the data stage
//! arrives packet by packet through [`ControlHandler::read_packet`] and
//! [`ControlHandler::write_packet`].

use core::fmt;

use aspserial_shared::{Command, ControlRequest, PACKET_SIZE};

use crate::hal::{self, SerialPort, StatusLeds};
use crate::isp::{IspTarget, BLOCKFLAG_FIRST, BLOCKFLAG_LAST, SCK_187_5_KHZ, SCK_AUTO};
use crate::line;
use crate::pump;
use crate::session::{Mode, RxRing, Session};

/// Written into read-serial slots the rx ring could not fill.
pub const RING_DRY_MARKER: u8 = 0xFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// A different command arrived while a streamed transfer is active.
    Busy { active: Mode, requested: Command },
    /// IN data stage while no read transfer is active.
    NotReading(Mode),
    /// OUT data stage while no write transfer is active.
    NotWriting(Mode),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Busy { active, requested } => {
                write!(f, "{:?} received during {:?} transfer", requested, active)
            }
            ProtocolError::NotReading(mode) => write!(f, "read packet in {:?} mode", mode),
            ProtocolError::NotWriting(mode) => write!(f, "write packet in {:?} mode", mode),
        }
    }
}

/// Up to one packet of reply data for a one-shot command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    bytes: [u8; PACKET_SIZE],
    len: usize,
}

impl Reply {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_slice(data: &[u8]) -> Self {
        let len = data.len().min(PACKET_SIZE);
        let mut bytes = [0u8; PACKET_SIZE];
        bytes[..len].copy_from_slice(&data[..len]);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupReply {
    /// Answer with these bytes now.
    Immediate(Reply),
    /// The data stage goes through the packet callbacks.
    Streamed,
    /// Unknown request code, answered with nothing.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteProgress {
    /// More packets belong to this transfer.
    Pending,
    /// Byte count reached zero, back to idle.
    Complete,
}

/// What the USB stack calls into.
pub trait ControlHandler {
    fn setup(&mut self, req: &ControlRequest) -> Result<SetupReply, ProtocolError>;

    /// Fill one outgoing packet. Returns the number of bytes produced.
    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError>;

    /// Consume one incoming packet.
    fn write_packet(&mut self, data: &[u8]) -> Result<WriteProgress, ProtocolError>;
}

/// The USB half of a scheduler tick: deliver whatever control traffic is
/// pending to the handler, synchronously and to completion.
pub trait UsbService {
    fn service<H: ControlHandler>(&mut self, handler: &mut H);
}

pub struct Dispatcher<S, I, L> {
    session: Session,
    serial: S,
    isp: I,
    leds: L,
}

impl<S: SerialPort, I: IspTarget, L: StatusLeds> Dispatcher<S, I, L> {
    pub fn new(serial: S, isp: I, mut leds: L) -> Self {
        hal::show_idle(&mut leds);
        Self {
            session: Session::new(),
            serial,
            isp,
            leds,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn isp(&self) -> &I {
        &self.isp
    }

    pub fn leds(&self) -> &L {
        &self.leds
    }

    /// Bus reset or deconfiguration: abandon any transfer in progress.
    /// Queued serial bytes are kept.
    pub fn reset(&mut self) {
        self.session.enter(Mode::Idle);
        self.session.remaining = 0;
    }

    /// Serial half of a scheduler tick.
    pub fn pump(&mut self) {
        pump::step(&mut self.session, &mut self.serial);
    }

    /// One scheduler tick: USB servicing first, then the serial pump.
    pub fn step<U: UsbService>(&mut self, usb: &mut U) {
        usb.service(self);
        self.pump();
    }

    fn take_address(&mut self, req: &ControlRequest) {
        if !self.session.long_address {
            self.session.address = u32::from(req.value);
        }
    }

    fn start_stream(&mut self, mode: Mode, req: &ControlRequest) -> SetupReply {
        // An empty data stage never reaches the packet callbacks.
        if req.length == 0 {
            return SetupReply::Immediate(Reply::empty());
        }
        self.session.remaining = req.length;
        self.session.enter(mode);
        SetupReply::Streamed
    }

    fn cmd_connect(&mut self) -> SetupReply {
        let sck = match self.session.isp_sck {
            SCK_AUTO => SCK_187_5_KHZ,
            chosen => chosen,
        };
        self.session.long_address = false;
        hal::show_programming(&mut self.leds);
        self.isp.connect(sck);
        log::info!("CONNECT: sck option {}", sck);
        SetupReply::Immediate(Reply::empty())
    }

    fn cmd_disconnect(&mut self) -> SetupReply {
        self.isp.disconnect();
        hal::show_idle(&mut self.leds);
        log::info!("DISCONNECT");
        SetupReply::Immediate(Reply::empty())
    }

    fn cmd_transmit(&mut self, req: &ControlRequest) -> SetupReply {
        let mut answer = [0u8; 4];
        for (out, byte) in answer.iter_mut().zip(req.argument_bytes()) {
            *out = self.isp.transmit(byte);
        }
        SetupReply::Immediate(Reply::from_slice(&answer))
    }

    fn cmd_write_flash(&mut self, req: &ControlRequest) -> SetupReply {
        self.take_address(req);
        let [size_low, size_flags] = req.index.to_le_bytes();
        self.session.page_size = u16::from(size_low) | (u16::from(size_flags & 0xF0) << 4);
        self.session.block_flags = size_flags & 0x0F;
        if self.session.block_flags & BLOCKFLAG_FIRST != 0 {
            self.session.page_counter = self.session.page_size;
        }
        self.start_stream(Mode::WriteFlash, req)
    }

    fn cmd_set_long_address(&mut self, req: &ControlRequest) -> SetupReply {
        self.session.long_address = true;
        self.session.address = u32::from_le_bytes(req.argument_bytes());
        log::debug!("SET_LONG_ADDRESS: {:#010x}", self.session.address);
        SetupReply::Immediate(Reply::empty())
    }

    fn cmd_set_serial(&mut self, req: &ControlRequest) -> SetupReply {
        let [baud, bits, parity, _] = req.argument_bytes();
        let echo = line::configure_line(&mut self.session, &mut self.serial, baud, bits, parity);
        SetupReply::Immediate(Reply::from_slice(&echo.to_bytes()))
    }

    fn write_isp_byte(&mut self, mode: Mode, byte: u8) {
        let address = self.session.address;
        match mode {
            Mode::WriteFlash if self.session.page_size == 0 => {
                self.isp.write_flash(address, byte, true);
            }
            Mode::WriteFlash => {
                self.isp.write_flash(address, byte, false);
                self.session.page_counter = self.session.page_counter.wrapping_sub(1);
                if self.session.page_counter == 0 {
                    self.isp.flush_page(address, byte);
                    self.session.page_counter = self.session.page_size;
                }
            }
            Mode::WriteEeprom => self.isp.write_eeprom(address, byte),
            _ => {}
        }
    }
}

/// Fill `buf` as a read-serial packet: slot 0 is the count, the rest come
/// from the rx ring. Once the ring runs dry the remaining slots carry
/// [`RING_DRY_MARKER`] and the count is pinned to what was produced.
fn fill_serial_packet(rx: &mut RxRing, buf: &mut [u8]) {
    let Some((count, slots)) = buf.split_first_mut() else {
        return;
    };
    *count = slots.len() as u8;
    let mut dry = false;
    for (produced, slot) in slots.iter_mut().enumerate() {
        match rx.dequeue() {
            Ok(byte) => *slot = byte,
            Err(_) => {
                *slot = RING_DRY_MARKER;
                if !dry {
                    dry = true;
                    *count = produced as u8;
                }
            }
        }
    }
}

impl<S: SerialPort, I: IspTarget, L: StatusLeds> ControlHandler for Dispatcher<S, I, L> {
    fn setup(&mut self, req: &ControlRequest) -> Result<SetupReply, ProtocolError> {
        let command = req.command();
        if let Command::Unknown(code) = command {
            log::debug!("unknown request {:#04x} ignored", code);
            return Ok(SetupReply::Ignored);
        }

        let active = self.session.mode;
        if active != Mode::Idle && Mode::entered_by(command) != Some(active) {
            log::warn!("{:?} rejected during {:?} transfer", command, active);
            return Err(ProtocolError::Busy {
                active,
                requested: command,
            });
        }

        let reply = match command {
            Command::Connect => self.cmd_connect(),
            Command::Disconnect => self.cmd_disconnect(),
            Command::Transmit => self.cmd_transmit(req),
            Command::ReadFlash => {
                self.take_address(req);
                self.start_stream(Mode::ReadFlash, req)
            }
            Command::ReadEeprom => {
                self.take_address(req);
                self.start_stream(Mode::ReadEeprom, req)
            }
            Command::EnableProg => {
                let status = self.isp.enter_programming_mode();
                SetupReply::Immediate(Reply::from_slice(&[status]))
            }
            Command::WriteFlash => self.cmd_write_flash(req),
            Command::WriteEeprom => {
                self.take_address(req);
                self.session.page_size = 0;
                self.session.block_flags = 0;
                self.start_stream(Mode::WriteEeprom, req)
            }
            Command::SetLongAddress => self.cmd_set_long_address(req),
            Command::SetIspSck => {
                self.session.isp_sck = req.argument_bytes()[0];
                SetupReply::Immediate(Reply::from_slice(&[0]))
            }
            Command::SetSerial => self.cmd_set_serial(req),
            Command::ReadSerial => self.start_stream(Mode::ReadSerial, req),
            Command::WriteSerial => {
                self.session.page_size = 0;
                self.session.block_flags = 0;
                self.start_stream(Mode::WriteSerial, req)
            }
            Command::Unknown(_) => SetupReply::Ignored,
        };
        Ok(reply)
    }

    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        let mode = self.session.mode;
        match mode {
            Mode::ReadFlash => {
                for slot in buf.iter_mut() {
                    *slot = self.isp.read_flash(self.session.address);
                    self.session.address = self.session.address.wrapping_add(1);
                }
            }
            Mode::ReadEeprom => {
                for slot in buf.iter_mut() {
                    *slot = self.isp.read_eeprom(self.session.address);
                    self.session.address = self.session.address.wrapping_add(1);
                }
            }
            Mode::ReadSerial => fill_serial_packet(&mut self.session.rx, buf),
            other => {
                log::warn!("read packet while {:?}", other);
                return Err(ProtocolError::NotReading(other));
            }
        }

        let len = buf.len();
        self.session.remaining = self
            .session
            .remaining
            .saturating_sub(len.min(usize::from(u16::MAX)) as u16);
        if len < PACKET_SIZE || self.session.remaining == 0 {
            self.session.enter(Mode::Idle);
        }
        Ok(len)
    }

    fn write_packet(&mut self, data: &[u8]) -> Result<WriteProgress, ProtocolError> {
        let mode = self.session.mode;
        if !mode.is_write() {
            log::warn!("write packet while {:?}", mode);
            return Err(ProtocolError::NotWriting(mode));
        }

        // Serial packets: byte 0 counts the payload bytes that follow.
        let mut serial_len: u16 = 0;
        for (i, &byte) in data.iter().enumerate() {
            if mode == Mode::WriteSerial {
                if i == 0 {
                    serial_len = u16::from(byte) + 1;
                } else if (i as u16) < serial_len {
                    if let Err(e) = self.session.tx.enqueue(byte) {
                        log::trace!("tx byte {:#04x} dropped: {}", byte, e);
                    }
                }
            } else {
                self.write_isp_byte(mode, byte);
            }

            // Counted per packet byte, length prefix included.
            self.session.remaining = self.session.remaining.saturating_sub(1);
            if self.session.remaining == 0 {
                if self.session.block_flags & BLOCKFLAG_LAST != 0
                    && self.session.page_counter != self.session.page_size
                {
                    self.isp.flush_page(self.session.address, byte);
                }
                self.session.address = self.session.address.wrapping_add(1);
                self.session.enter(Mode::Idle);
                return Ok(WriteProgress::Complete);
            }
            self.session.address = self.session.address.wrapping_add(1);
        }
        Ok(WriteProgress::Pending)
    }
}
