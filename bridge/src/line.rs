//! Serial line configuration.
//!
//! Each setter validates its selector against the supported table and only
//! touches the UART when the selector is accepted. [`configure_line`] applies
//! all three and builds the echo the host compares against its request.

use core::fmt;

use aspserial_shared::{
    BaudRate, DataBits, LineEcho, Parity, BAUD_REJECTED, BITS_REJECTED, PARITY_REJECTED,
};

use crate::hal::{CharSize, ParityMode, SerialPort};
use crate::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineError {
    UnsupportedBaud(u8),
    UnsupportedBits(u8),
    UnsupportedParity(u8),
}

impl LineError {
    /// Byte reported in the echo instead of the rejected selector.
    pub fn echo_code(self) -> u8 {
        match self {
            LineError::UnsupportedBaud(_) => BAUD_REJECTED,
            LineError::UnsupportedBits(_) => BITS_REJECTED,
            LineError::UnsupportedParity(_) => PARITY_REJECTED,
        }
    }
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::UnsupportedBaud(s) => write!(f, "unsupported baud selector {:#04x}", s),
            LineError::UnsupportedBits(s) => write!(f, "unsupported bit width {}", s),
            LineError::UnsupportedParity(s) => write!(f, "unsupported parity selector {}", s),
        }
    }
}

pub fn set_baud<S: SerialPort>(port: &mut S, selector: u8) -> Result<BaudRate, LineError> {
    let baud = BaudRate::from_selector(selector).ok_or(LineError::UnsupportedBaud(selector))?;
    port.set_baud(baud);
    Ok(baud)
}

/// Program the character size. This resets the frame format, so parity has
/// to be applied afterwards.
pub fn set_bits<S: SerialPort>(port: &mut S, selector: u8) -> Result<DataBits, LineError> {
    let bits = DataBits::from_selector(selector).ok_or(LineError::UnsupportedBits(selector))?;
    port.set_char_size(CharSize::for_bits(bits));
    Ok(bits)
}

pub fn set_parity<S: SerialPort>(port: &mut S, selector: u8) -> Result<Parity, LineError> {
    let parity = Parity::from_selector(selector).ok_or(LineError::UnsupportedParity(selector))?;
    // No parity is what set_bits leaves behind.
    if parity != Parity::None {
        port.set_parity(ParityMode::for_parity(parity));
    }
    Ok(parity)
}

/// Apply a (baud, bits, parity) request, reset both rings and enable the
/// UART. Bytes still queued in either direction are discarded.
pub fn configure_line<S: SerialPort>(
    session: &mut Session,
    port: &mut S,
    baud: u8,
    bits: u8,
    parity: u8,
) -> LineEcho {
    let mut echo = LineEcho::default();

    match set_baud(port, baud) {
        Ok(applied) => {
            session.line.baud = Some(applied);
            echo.baud = applied.selector();
        }
        Err(e) => {
            log::warn!("line config: {}", e);
            echo.baud = e.echo_code();
        }
    }

    match set_bits(port, bits) {
        Ok(applied) => {
            session.line.data_bits = Some(applied);
            // The frame register was rewritten, parity is back to none.
            session.line.parity = Some(Parity::None);
            echo.bits = applied.selector();
        }
        Err(e) => {
            log::warn!("line config: {}", e);
            echo.bits = e.echo_code();
        }
    }

    match set_parity(port, parity) {
        Ok(applied) => {
            session.line.parity = Some(applied);
            echo.parity = applied.selector();
        }
        Err(e) => {
            log::warn!("line config: {}", e);
            echo.parity = e.echo_code();
        }
    }

    session.tx.init();
    session.rx.init();
    port.enable();

    log::info!(
        "serial line configured: baud={:#04x} bits={} parity={}",
        echo.baud,
        echo.bits,
        echo.parity
    );
    echo
}
