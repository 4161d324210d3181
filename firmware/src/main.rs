#![no_std]
#![no_main]

mod leds;
mod uart;
mod usb_handler;

use core::cell::RefCell;

use defmt::info;
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_futures::yield_now;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::USB;
use embassy_rp::uart::{self as rp_uart, Uart};
use embassy_rp::usb::{Driver, InterruptHandler as UsbInterruptHandler};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_usb::Builder;
use static_cell::StaticCell;

use aspserial_bridge::{Detached, Dispatcher};
use aspserial_shared::{USB_PID, USB_VID};

use crate::leds::BoardLeds;
use crate::uart::TargetUart;
use crate::usb_handler::UsbAspHandler;

use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler<USB>;
});

defmt::timestamp!("{=u64:us}", embassy_time::Instant::now().as_micros());

type BoardDispatcher = Dispatcher<TargetUart, Detached, BoardLeds<'static>>;

/// Shared by the USB control handler and the serial pump. Both run on the
/// thread-mode executor, so the lock is never contended.
static DISPATCHER: Mutex<CriticalSectionRawMutex, RefCell<Option<BoardDispatcher>>> =
    Mutex::new(RefCell::new(None));

/// Run `f` on the dispatcher; `None` before it is installed.
pub fn with_dispatcher<R>(f: impl FnOnce(&mut BoardDispatcher) -> R) -> Option<R> {
    DISPATCHER.lock(|cell| cell.borrow_mut().as_mut().map(f))
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("aspserial starting");

    let p = embassy_rp::init(Default::default());

    // Target serial line on GPIO0 (TX) / GPIO1 (RX); configured by the host
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, rp_uart::Config::default());

    let leds = BoardLeds::new(
        Output::new(p.PIN_14, Level::Low),
        Output::new(p.PIN_15, Level::Low),
    );

    DISPATCHER.lock(|cell| {
        *cell.borrow_mut() = Some(Dispatcher::new(TargetUart::new(uart), Detached, leds));
    });

    // Create USB driver
    let driver = Driver::new(p.USB, Irqs);

    // USB configuration buffers
    let mut config_descriptor = [0; 256];
    let mut bos_descriptor = [0; 256];
    let mut msos_descriptor = [0; 256];
    let mut control_buf = [0; 64];

    // avrdude matches on these strings
    let mut config = embassy_usb::Config::new(USB_VID, USB_PID);
    config.manufacturer = Some("www.fischl.de");
    config.product = Some("USBasp");
    config.max_power = 100;
    config.max_packet_size_0 = 8;

    let mut builder = Builder::new(
        driver,
        config,
        &mut config_descriptor,
        &mut bos_descriptor,
        &mut msos_descriptor,
        &mut control_buf,
    );

    // Vendor interface without endpoints; everything rides on EP0
    let mut function = builder.function(0xFF, 0x00, 0x00);
    let mut interface = function.interface();
    let _alt = interface.alt_setting(0xFF, 0x00, 0x00, None);
    drop(function);

    static HANDLER: StaticCell<UsbAspHandler> = StaticCell::new();
    let handler = HANDLER.init(UsbAspHandler);
    builder.handler(handler);

    let mut usb = builder.build();

    info!("USB device ready, {:04x}:{:04x}", USB_VID, USB_PID);

    // USB servicing and the serial pump share this executor
    join(usb.run(), pump()).await;
}

/// Move one byte each way per pass, then let the USB stack run.
async fn pump() {
    loop {
        with_dispatcher(|d| d.pump());
        yield_now().await;
    }
}
