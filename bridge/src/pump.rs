//! One polling step between the UART and the two rings.

use crate::hal::SerialPort;
use crate::session::Session;

/// Move at most one byte in each direction.
///
/// A byte received while the rx ring is full is read out of the UART and
/// dropped; neither the target nor the host is told.
pub fn step<S: SerialPort>(session: &mut Session, port: &mut S) {
    if port.tx_ready() {
        if let Ok(byte) = session.tx.dequeue() {
            port.write_data(byte);
        }
    }

    if port.rx_ready() {
        let byte = port.read_data();
        if let Err(e) = session.rx.enqueue(byte) {
            log::trace!("rx byte {:#04x} dropped: {}", byte, e);
        }
    }
}
