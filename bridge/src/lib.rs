#![no_std]

//! Device side of the aspserial programmer's serial passthrough.
//!
//! A board owns one [`Dispatcher`], feeds it vendor control requests from its
//! USB stack and calls [`Dispatcher::pump`] once per main-loop iteration so
//! bytes move between the UART and the two rings. Both run on the same
//! execution context, which is why the rings carry no locking.

pub mod dispatcher;
pub mod hal;
pub mod isp;
pub mod line;
pub mod pump;
pub mod ring;
pub mod session;

pub use dispatcher::{
    ControlHandler, Dispatcher, ProtocolError, Reply, SetupReply, UsbService, WriteProgress,
    RING_DRY_MARKER,
};
pub use hal::{CharSize, Led, ParityMode, SerialPort, StatusLeds};
pub use isp::{Detached, IspTarget};
pub use line::LineError;
pub use ring::{DequeueError, EnqueueError, RingBuffer};
pub use session::{LineState, Mode, Session};

/// Slots in the host to target ring (127 usable).
pub const TX_RING_CAPACITY: usize = 1 << 7;

/// Slots in the target to host ring (127 usable).
pub const RX_RING_CAPACITY: usize = 1 << 7;
