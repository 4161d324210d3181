//! Host transfer loops.
//!
//! Both directions move at most one 8-byte packet per control transfer and
//! stop once the byte budget is spent. Any transport error ends the loop
//! right away; nothing is retried.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use aspserial_shared::{
    Command, ControlRequest, FramedPacket, LineConfig, LineEcho, LINE_ECHO_SIZE, MAX_PAYLOAD,
    PACKET_SIZE,
};

use crate::error::{ClientError, TransportError};
use crate::render::Renderer;
use crate::transport::ControlTransfer;

/// Pause after each written packet so the UART side can drain the tx ring.
pub const SETTLE_DELAY: Duration = Duration::from_millis(80);

#[derive(Clone, Copy, Debug)]
pub struct TransferOptions {
    /// Total bytes to move, unbounded when `None`.
    pub budget: Option<u64>,
    pub settle_delay: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            budget: None,
            settle_delay: SETTLE_DELAY,
        }
    }
}

impl TransferOptions {
    fn left(&self, done: u64) -> u64 {
        self.budget.map_or(u64::MAX, |b| b.saturating_sub(done))
    }
}

/// Negotiate the line and check the echo field by field.
pub fn configure_line<T: ControlTransfer>(
    transport: &mut T,
    config: &LineConfig,
) -> Result<LineEcho, ClientError> {
    let data = transport.control_in(&config.to_request())?;
    let echo = LineEcho::from_bytes(&data).ok_or(TransportError::ShortResponse {
        command: Command::SetSerial,
        expected: LINE_ECHO_SIZE,
        received: data.len(),
    })?;
    if !echo.confirms(config) {
        return Err(ClientError::ConfigRejected {
            requested: *config,
            echoed: echo,
        });
    }
    log::debug!("line echo {:02x?}", echo.to_bytes());
    Ok(echo)
}

/// Poll the device for target bytes and render them on `sink`.
///
/// Stops when the budget is spent, when the device answers with a packet
/// shorter than [`PACKET_SIZE`], or when `running` is cleared. Returns the
/// number of payload bytes rendered.
pub fn read_serial<T, W>(
    transport: &mut T,
    sink: &mut Renderer<W>,
    options: &TransferOptions,
    running: &AtomicBool,
) -> Result<u64, ClientError>
where
    T: ControlTransfer,
    W: Write,
{
    let req = ControlRequest::new(Command::ReadSerial, 0, 0, PACKET_SIZE as u16);
    let mut total: u64 = 0;

    while running.load(Ordering::SeqCst) && options.left(total) > 0 {
        let packet = transport.control_in(&req)?;
        let payload = FramedPacket::decode(&packet);
        let take = payload.len().min(options.left(total).min(MAX_PAYLOAD as u64) as usize);

        sink.push_all(&payload[..take])?;
        sink.flush()?;
        total += take as u64;

        if packet.len() < PACKET_SIZE {
            log::debug!("short packet ({} bytes), read complete", packet.len());
            break;
        }
    }
    Ok(total)
}

/// Send bytes from `source` to the target, echoing them on `echo`.
///
/// Stops when the budget is spent, when `source` runs out, or when
/// `running` is cleared. Returns the number of payload bytes sent.
pub fn write_serial<T, R, W>(
    transport: &mut T,
    source: &mut R,
    echo: &mut Renderer<W>,
    options: &TransferOptions,
    running: &AtomicBool,
) -> Result<u64, ClientError>
where
    T: ControlTransfer,
    R: Read,
    W: Write,
{
    let mut total: u64 = 0;
    let mut chunk = [0u8; MAX_PAYLOAD];

    while running.load(Ordering::SeqCst) {
        let want = options.left(total).min(MAX_PAYLOAD as u64) as usize;
        if want == 0 {
            break;
        }
        let n = fill_chunk(source, &mut chunk[..want])?;
        if n == 0 {
            log::debug!("input exhausted after {} bytes", total);
            break;
        }

        let packet = FramedPacket::encode(&chunk[..n]);
        let wire = packet.as_wire();
        let req = ControlRequest::new(Command::WriteSerial, 0, 0, wire.len() as u16);
        transport.control_out(&req, wire)?;
        total += n as u64;

        echo.push_all(packet.payload())?;
        echo.flush()?;

        if !options.settle_delay.is_zero() {
            thread::sleep(options.settle_delay);
        }
    }
    Ok(total)
}

/// Read until `buf` is full or the source hits end of input.
fn fill_chunk<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
