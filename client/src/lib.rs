//! Host side of the aspserial serial passthrough.
//!
//! Talks to the programmer over vendor control transfers only: one request
//! negotiates the line, then every read or write moves a single
//! length-prefixed 8-byte packet.

pub mod error;
pub mod render;
pub mod transfer;
pub mod transport;
pub mod usb;

pub use error::{ClientError, TransportError};
pub use render::{DisplayMode, Renderer};
pub use transfer::{configure_line, read_serial, write_serial, TransferOptions, SETTLE_DELAY};
pub use transport::ControlTransfer;
pub use usb::UsbTransport;
