//! Test doubles for the bridge hardware traits

#![allow(dead_code)]

use std::collections::VecDeque;

use aspserial_bridge::{
    CharSize, ControlHandler, IspTarget, Led, ParityMode, ProtocolError, SerialPort, SetupReply,
    StatusLeds, UsbService, WriteProgress,
};
use aspserial_shared::{BaudRate, Command, ControlRequest, PACKET_SIZE};

/// UART double: readiness is set by the test, register writes are recorded.
#[derive(Debug)]
pub struct FakeSerialPort {
    pub tx_ready: bool,
    pub incoming: VecDeque<u8>,
    pub sent: Vec<u8>,
    pub baud: Option<BaudRate>,
    pub char_size: Option<CharSize>,
    pub parity: ParityMode,
    pub parity_writes: usize,
    pub enabled: bool,
}

impl Default for FakeSerialPort {
    fn default() -> Self {
        Self {
            tx_ready: true,
            incoming: VecDeque::new(),
            sent: Vec::new(),
            baud: None,
            char_size: None,
            parity: ParityMode::DISABLED,
            parity_writes: 0,
            enabled: false,
        }
    }
}

impl FakeSerialPort {
    pub fn receive(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }
}

impl SerialPort for FakeSerialPort {
    fn tx_ready(&self) -> bool {
        self.tx_ready
    }

    fn rx_ready(&self) -> bool {
        !self.incoming.is_empty()
    }

    fn write_data(&mut self, byte: u8) {
        self.sent.push(byte);
    }

    fn read_data(&mut self) -> u8 {
        self.incoming.pop_front().unwrap_or(0)
    }

    fn set_baud(&mut self, baud: BaudRate) {
        self.baud = Some(baud);
    }

    fn set_char_size(&mut self, size: CharSize) {
        self.char_size = Some(size);
        self.parity = ParityMode::DISABLED;
    }

    fn set_parity(&mut self, parity: ParityMode) {
        self.parity = parity;
        self.parity_writes += 1;
    }

    fn enable(&mut self) {
        self.enabled = true;
    }
}

#[derive(Debug, Default)]
pub struct FakeLeds {
    pub red: bool,
    pub green: bool,
}

impl StatusLeds for FakeLeds {
    fn set(&mut self, led: Led, lit: bool) {
        match led {
            Led::Red => self.red = lit,
            Led::Green => self.green = lit,
        }
    }
}

/// ISP double: memory reads return the low address byte, writes are logged.
#[derive(Debug, Default)]
pub struct FakeIsp {
    pub connected_sck: Option<u8>,
    pub transmitted: Vec<u8>,
    pub flash_writes: Vec<(u32, u8, bool)>,
    pub eeprom_writes: Vec<(u32, u8)>,
    pub page_flushes: Vec<u32>,
}

impl IspTarget for FakeIsp {
    fn connect(&mut self, sck_option: u8) {
        self.connected_sck = Some(sck_option);
    }

    fn disconnect(&mut self) {
        self.connected_sck = None;
    }

    fn transmit(&mut self, byte: u8) -> u8 {
        self.transmitted.push(byte);
        !byte
    }

    fn enter_programming_mode(&mut self) -> u8 {
        0
    }

    fn read_flash(&mut self, address: u32) -> u8 {
        address as u8
    }

    fn read_eeprom(&mut self, address: u32) -> u8 {
        (address as u8).wrapping_add(0x80)
    }

    fn write_flash(&mut self, address: u32, byte: u8, poll: bool) {
        self.flash_writes.push((address, byte, poll));
    }

    fn flush_page(&mut self, address: u32, _byte: u8) {
        self.page_flushes.push(address);
    }

    fn write_eeprom(&mut self, address: u32, byte: u8) {
        self.eeprom_writes.push((address, byte));
    }
}

pub type TestDispatcher = aspserial_bridge::Dispatcher<FakeSerialPort, FakeIsp, FakeLeds>;

pub fn dispatcher() -> TestDispatcher {
    aspserial_bridge::Dispatcher::new(
        FakeSerialPort::default(),
        FakeIsp::default(),
        FakeLeds::default(),
    )
}

/// Dispatcher with the line configured at 2400 8N1.
pub fn configured_dispatcher() -> TestDispatcher {
    let mut d = dispatcher();
    let req = aspserial_shared::LineConfig::default().to_request();
    d.setup(&req).unwrap();
    d
}

pub fn request(command: Command, length: u16) -> ControlRequest {
    ControlRequest::new(command, 0, 0, length)
}

/// One control transfer as the USB stack would deliver it.
#[derive(Debug, Clone)]
pub enum Transaction {
    In(ControlRequest),
    Out(ControlRequest, Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Data(Vec<u8>),
    Written(Option<WriteProgress>),
    Failed(ProtocolError),
}

/// USB service double: each tick delivers at most one queued transaction.
#[derive(Debug, Default)]
pub struct ScriptedUsb {
    pub pending: VecDeque<Transaction>,
    pub outcomes: Vec<Outcome>,
}

impl ScriptedUsb {
    pub fn queue(&mut self, t: Transaction) {
        self.pending.push_back(t);
    }
}

impl UsbService for ScriptedUsb {
    fn service<H: ControlHandler>(&mut self, handler: &mut H) {
        let Some(transaction) = self.pending.pop_front() else {
            return;
        };
        let outcome = match transaction {
            Transaction::In(req) => match handler.setup(&req) {
                Ok(SetupReply::Immediate(reply)) => Outcome::Data(reply.as_bytes().to_vec()),
                Ok(SetupReply::Ignored) => Outcome::Data(Vec::new()),
                Ok(SetupReply::Streamed) => {
                    let mut buf = vec![0u8; (req.length as usize).min(PACKET_SIZE)];
                    match handler.read_packet(&mut buf) {
                        Ok(n) => Outcome::Data(buf[..n].to_vec()),
                        Err(e) => Outcome::Failed(e),
                    }
                }
                Err(e) => Outcome::Failed(e),
            },
            Transaction::Out(req, data) => match handler.setup(&req) {
                Ok(SetupReply::Streamed) => match handler.write_packet(&data) {
                    Ok(progress) => Outcome::Written(Some(progress)),
                    Err(e) => Outcome::Failed(e),
                },
                Ok(_) => Outcome::Written(None),
                Err(e) => Outcome::Failed(e),
            },
        };
        self.outcomes.push(outcome);
    }
}
