/// Vendor control requests, forwarded to the dispatcher.
///
/// embassy-usb hands over the whole data stage at once, so each transfer is
/// split into 8-byte packets here before reaching the packet callbacks.
use defmt::{debug, warn};
use embassy_usb::control::{InResponse, OutResponse, Recipient, Request, RequestType};
use embassy_usb::Handler;

use aspserial_bridge::{ControlHandler, Mode, SetupReply};
use aspserial_shared::{ControlRequest, PACKET_SIZE};

use crate::with_dispatcher;

pub struct UsbAspHandler;

fn vendor_request(req: &Request) -> Option<ControlRequest> {
    if req.request_type != RequestType::Vendor || req.recipient != Recipient::Device {
        return None;
    }
    Some(ControlRequest {
        request: req.request,
        value: req.value,
        index: req.index,
        length: req.length,
    })
}

impl Handler for UsbAspHandler {
    fn reset(&mut self) {
        debug!("bus reset");
        with_dispatcher(|d| d.reset());
    }

    fn configured(&mut self, configured: bool) {
        if !configured {
            with_dispatcher(|d| d.reset());
        }
    }

    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        let request = vendor_request(&req)?;

        let accepted = with_dispatcher(|d| match d.setup(&request) {
            Ok(SetupReply::Streamed) => data
                .chunks(PACKET_SIZE)
                .try_for_each(|packet| d.write_packet(packet).map(|_| ()))
                .is_ok(),
            Ok(_) => true,
            Err(_) => false,
        })
        .unwrap_or(false);

        if accepted {
            Some(OutResponse::Accepted)
        } else {
            warn!("OUT request {} rejected", req.request);
            Some(OutResponse::Rejected)
        }
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        let request = vendor_request(&req)?;
        let want = (req.length as usize).min(buf.len());

        let produced = with_dispatcher(|d| match d.setup(&request) {
            Ok(SetupReply::Immediate(reply)) => {
                let n = reply.as_bytes().len().min(want);
                buf[..n].copy_from_slice(&reply.as_bytes()[..n]);
                Some(n)
            }
            Ok(SetupReply::Ignored) => Some(0),
            Ok(SetupReply::Streamed) => {
                let mut filled = 0;
                while filled < want && d.session().mode() != Mode::Idle {
                    let end = (filled + PACKET_SIZE).min(want);
                    match d.read_packet(&mut buf[filled..end]) {
                        Ok(n) => filled += n,
                        Err(_) => return None,
                    }
                }
                Some(filled)
            }
            Err(_) => None,
        })
        .flatten();

        match produced {
            Some(n) => Some(InResponse::Accepted(&buf[..n])),
            None => {
                warn!("IN request {} rejected", req.request);
                Some(InResponse::Rejected)
            }
        }
    }
}
