//! Line configuration tests

mod common;

use aspserial_bridge::line::{configure_line, set_baud, set_bits, set_parity};
use aspserial_bridge::{CharSize, LineError, ParityMode, Session};
use aspserial_shared::{BaudRate, DataBits, Parity, BAUD_REJECTED, BITS_REJECTED};
use common::FakeSerialPort;

#[test]
fn test_set_baud_table() {
    let mut port = FakeSerialPort::default();
    assert_eq!(set_baud(&mut port, 0x10), Ok(BaudRate::B300));
    assert_eq!(set_baud(&mut port, 0x19), Ok(BaudRate::B115200));
    assert_eq!(port.baud, Some(BaudRate::B115200));
}

#[test]
fn test_set_baud_rejects_out_of_table() {
    let mut port = FakeSerialPort::default();
    set_baud(&mut port, 0x15).unwrap();
    assert_eq!(set_baud(&mut port, 0x1A), Err(LineError::UnsupportedBaud(0x1A)));
    assert_eq!(set_baud(&mut port, 0x0F), Err(LineError::UnsupportedBaud(0x0F)));
    assert_eq!(port.baud, Some(BaudRate::B9600));
}

#[test]
fn test_set_bits_fields() {
    let mut port = FakeSerialPort::default();
    assert_eq!(set_bits(&mut port, 7), Ok(DataBits::Seven));
    assert_eq!(port.char_size, Some(CharSize(0b10)));
    assert_eq!(set_bits(&mut port, 9), Err(LineError::UnsupportedBits(9)));
    assert_eq!(LineError::UnsupportedBits(9).echo_code(), BITS_REJECTED);
    assert_eq!(port.char_size, Some(CharSize(0b10)));
}

#[test]
fn test_set_parity_codes() {
    let mut port = FakeSerialPort::default();
    assert_eq!(set_parity(&mut port, 1), Ok(Parity::None));
    assert_eq!(port.parity_writes, 0);
    assert_eq!(set_parity(&mut port, 3), Ok(Parity::Odd));
    assert_eq!(port.parity, ParityMode::ODD);
    assert_eq!(set_parity(&mut port, 4), Err(LineError::UnsupportedParity(4)));
    assert_eq!(LineError::UnsupportedParity(4).echo_code(), 0);
}

#[test]
fn test_configure_line_echoes_and_resets_rings() {
    let mut session = Session::new();
    let mut port = FakeSerialPort::default();
    session.tx_mut().init();
    session.tx_mut().enqueue(1).unwrap();

    let echo = configure_line(&mut session, &mut port, 0x13, 8, 2);
    assert_eq!(echo.to_bytes(), [0x13, 8, 2, 0]);
    assert!(port.enabled);
    assert_eq!(port.parity, ParityMode::EVEN);
    assert!(session.tx().is_initialized() && session.tx().is_empty());
    assert!(session.rx().is_initialized() && session.rx().is_empty());

    let line = session.line();
    assert_eq!(line.baud, Some(BaudRate::B2400));
    assert_eq!(line.data_bits, Some(DataBits::Eight));
    assert_eq!(line.parity, Some(Parity::Even));
}

#[test]
fn test_configure_line_rejection_keeps_previous() {
    let mut session = Session::new();
    let mut port = FakeSerialPort::default();
    configure_line(&mut session, &mut port, 0x15, 7, 1);

    let echo = configure_line(&mut session, &mut port, 0x30, 4, 1);
    assert_eq!(echo.baud, BAUD_REJECTED);
    assert_eq!(echo.bits, BITS_REJECTED);
    assert_eq!(echo.parity, 1);
    assert_eq!(port.baud, Some(BaudRate::B9600));
    assert_eq!(session.line().baud, Some(BaudRate::B9600));
    assert_eq!(session.line().data_bits, Some(DataBits::Seven));
}
