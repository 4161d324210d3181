//! Transports for exercising the transfer loops without hardware

#![allow(dead_code)]

use std::collections::VecDeque;

use aspserial::{ControlTransfer, TransportError};
use aspserial_bridge::{
    CharSize, ControlHandler, Detached, Dispatcher, Led, Mode, ParityMode, SerialPort, SetupReply,
    StatusLeds,
};
use aspserial_shared::{BaudRate, ControlRequest, PACKET_SIZE};

/// Target side of the serial line: what it will send and what it got.
#[derive(Debug, Default)]
pub struct TargetUart {
    pub outgoing: VecDeque<u8>,
    pub received: Vec<u8>,
    pub baud: Option<BaudRate>,
}

impl SerialPort for TargetUart {
    fn tx_ready(&self) -> bool {
        true
    }

    fn rx_ready(&self) -> bool {
        !self.outgoing.is_empty()
    }

    fn write_data(&mut self, byte: u8) {
        self.received.push(byte);
    }

    fn read_data(&mut self) -> u8 {
        self.outgoing.pop_front().unwrap_or(0)
    }

    fn set_baud(&mut self, baud: BaudRate) {
        self.baud = Some(baud);
    }

    fn set_char_size(&mut self, _size: CharSize) {}

    fn set_parity(&mut self, _parity: ParityMode) {}

    fn enable(&mut self) {}
}

pub struct NoLeds;

impl StatusLeds for NoLeds {
    fn set(&mut self, _led: Led, _lit: bool) {}
}

/// Routes every control transfer into a real dispatcher. The serial pump
/// runs `ticks` times around each transfer.
pub struct Loopback {
    pub device: Dispatcher<TargetUart, Detached, NoLeds>,
    pub ticks: usize,
}

impl Loopback {
    pub fn new() -> Self {
        Self {
            device: Dispatcher::new(TargetUart::default(), Detached, NoLeds),
            ticks: PACKET_SIZE,
        }
    }

    /// Queue bytes for the target to send. Configure the line first: the
    /// pump drops whatever arrives while the rings are unbound.
    pub fn target_sends(&mut self, bytes: &[u8]) {
        self.device.serial_mut().outgoing.extend(bytes.iter().copied());
    }

    pub fn target_received(&self) -> &[u8] {
        &self.device.serial().received
    }

    fn run_pump(&mut self) {
        for _ in 0..self.ticks {
            self.device.pump();
        }
    }
}

fn failed(req: &ControlRequest, reason: impl ToString) -> TransportError {
    TransportError::Transfer {
        command: req.command(),
        reason: reason.to_string(),
    }
}

impl ControlTransfer for Loopback {
    fn control_in(&mut self, req: &ControlRequest) -> Result<Vec<u8>, TransportError> {
        self.run_pump();
        match self.device.setup(req).map_err(|e| failed(req, e))? {
            SetupReply::Immediate(reply) => Ok(reply.as_bytes().to_vec()),
            SetupReply::Ignored => Ok(Vec::new()),
            SetupReply::Streamed => {
                let mut out = Vec::new();
                let mut left = req.length as usize;
                while left > 0 && self.device.session().mode() != Mode::Idle {
                    let mut buf = vec![0u8; left.min(PACKET_SIZE)];
                    let n = self
                        .device
                        .read_packet(&mut buf)
                        .map_err(|e| failed(req, e))?;
                    out.extend_from_slice(&buf[..n]);
                    left -= n;
                }
                Ok(out)
            }
        }
    }

    fn control_out(&mut self, req: &ControlRequest, data: &[u8]) -> Result<(), TransportError> {
        if let SetupReply::Streamed = self.device.setup(req).map_err(|e| failed(req, e))? {
            for packet in data.chunks(PACKET_SIZE) {
                self.device
                    .write_packet(packet)
                    .map_err(|e| failed(req, e))?;
            }
        }
        self.run_pump();
        Ok(())
    }
}

/// Answers control-in requests from a script and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub replies: VecDeque<Result<Vec<u8>, TransportError>>,
    pub requests: Vec<ControlRequest>,
    pub written: Vec<Vec<u8>>,
}

impl ScriptedTransport {
    pub fn reply(mut self, bytes: &[u8]) -> Self {
        self.replies.push_back(Ok(bytes.to_vec()));
        self
    }

    pub fn fail(mut self, reason: &str) -> Self {
        self.replies.push_back(Err(TransportError::Transfer {
            command: aspserial_shared::Command::ReadSerial,
            reason: reason.to_string(),
        }));
        self
    }
}

impl ControlTransfer for ScriptedTransport {
    fn control_in(&mut self, req: &ControlRequest) -> Result<Vec<u8>, TransportError> {
        self.requests.push(*req);
        self.replies
            .pop_front()
            .unwrap_or_else(|| Err(failed(req, "script exhausted")))
    }

    fn control_out(&mut self, req: &ControlRequest, data: &[u8]) -> Result<(), TransportError> {
        self.requests.push(*req);
        self.written.push(data.to_vec());
        Ok(())
    }
}
