//! nusb backed transport

use std::time::Duration;

use nusb::transfer::{ControlIn, ControlOut, ControlType, Recipient};
use nusb::MaybeFuture;

use aspserial_shared::{ControlRequest, TRANSFER_TIMEOUT_MS, USB_PID, USB_VID};

use crate::error::TransportError;
use crate::transport::ControlTransfer;

pub struct UsbTransport {
    interface: nusb::Interface,
    timeout: Duration,
}

impl UsbTransport {
    /// Find the first attached programmer and claim its interface.
    pub fn open() -> Result<Self, TransportError> {
        let device = find_device()?;
        let interface = device
            .claim_interface(0)
            .wait()
            .map_err(|e| TransportError::Open(e.to_string()))?;
        log::debug!("claimed interface 0 of {:04x}:{:04x}", USB_VID, USB_PID);
        Ok(Self {
            interface,
            timeout: Duration::from_millis(TRANSFER_TIMEOUT_MS),
        })
    }
}

fn find_device() -> Result<nusb::Device, TransportError> {
    let devices = nusb::list_devices()
        .wait()
        .map_err(|e| TransportError::Open(e.to_string()))?;
    for dev_info in devices {
        if dev_info.vendor_id() == USB_VID && dev_info.product_id() == USB_PID {
            return dev_info
                .open()
                .wait()
                .map_err(|e| TransportError::Open(e.to_string()));
        }
    }
    Err(TransportError::NotFound {
        vid: USB_VID,
        pid: USB_PID,
    })
}

impl ControlTransfer for UsbTransport {
    fn control_in(&mut self, req: &ControlRequest) -> Result<Vec<u8>, TransportError> {
        let data = self
            .interface
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request: req.request,
                    value: req.value,
                    index: req.index,
                    length: req.length,
                },
                self.timeout,
            )
            .wait()
            .map_err(|e| TransportError::Transfer {
                command: req.command(),
                reason: e.to_string(),
            })?;
        log::trace!("{:?} <- {:02x?}", req.command(), data);
        Ok(data)
    }

    fn control_out(&mut self, req: &ControlRequest, data: &[u8]) -> Result<(), TransportError> {
        log::trace!("{:?} -> {:02x?}", req.command(), data);
        self.interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request: req.request,
                    value: req.value,
                    index: req.index,
                    data,
                },
                self.timeout,
            )
            .wait()
            .map_err(|e| TransportError::Transfer {
                command: req.command(),
                reason: e.to_string(),
            })
    }
}
