//! Control transfer abstraction
//!
//! Everything the host says to the programmer is a vendor request addressed
//! to the device. The transfer loops only see this trait, so they run the
//! same against real hardware and against an in-process device.

use aspserial_shared::ControlRequest;

use crate::error::TransportError;

pub trait ControlTransfer {
    /// Device to host transfer. Returns what the device sent, at most
    /// `req.length` bytes.
    fn control_in(&mut self, req: &ControlRequest) -> Result<Vec<u8>, TransportError>;

    /// Host to device transfer carrying `data`.
    fn control_out(&mut self, req: &ControlRequest, data: &[u8]) -> Result<(), TransportError>;
}
