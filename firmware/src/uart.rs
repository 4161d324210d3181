/// UART0 as the target's serial line.
///
/// embassy's blocking driver claims the pins and brings the block out of
/// reset; after that the PL011 registers are polled and written directly so
/// the pump never blocks.
use embassy_rp::clocks::clk_peri_freq;
use embassy_rp::pac;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{Blocking, Uart};

use aspserial_bridge::{CharSize, ParityMode, SerialPort};
use aspserial_shared::BaudRate;

pub struct TargetUart {
    _uart: Uart<'static, UART0, Blocking>,
}

impl TargetUart {
    pub fn new(uart: Uart<'static, UART0, Blocking>) -> Self {
        Self { _uart: uart }
    }
}

/// Integer and fractional baud divisors (PL011 TRM, 64ths rounded).
fn divisors(clk_hz: u32, baud: u32) -> (u16, u8) {
    let div = 8 * u64::from(clk_hz) / u64::from(baud);
    let ibrd = div >> 7;
    match ibrd {
        0 => (1, 0),
        _ if ibrd >= 65535 => (65535, 0),
        _ => (ibrd as u16, (((div & 0x7f) + 1) / 2) as u8),
    }
}

impl SerialPort for TargetUart {
    fn tx_ready(&self) -> bool {
        !pac::UART0.uartfr().read().txff()
    }

    fn rx_ready(&self) -> bool {
        !pac::UART0.uartfr().read().rxfe()
    }

    fn write_data(&mut self, byte: u8) {
        pac::UART0.uartdr().write(|w| w.set_data(byte));
    }

    fn read_data(&mut self) -> u8 {
        pac::UART0.uartdr().read().data()
    }

    fn set_baud(&mut self, baud: BaudRate) {
        let r = pac::UART0;
        r.uartcr().modify(|w| w.set_uarten(false));
        let (ibrd, fbrd) = divisors(clk_peri_freq(), baud.bits_per_second());
        r.uartibrd().write(|w| w.set_baud_divint(ibrd));
        r.uartfbrd().write(|w| w.set_baud_divfrac(fbrd));
    }

    fn set_char_size(&mut self, size: CharSize) {
        // WLEN uses the same 5..8 bit encoding as the size field.
        pac::UART0.uartlcr_h().write(|w| {
            w.set_wlen(size.0 & 0b11);
            w.set_fen(true);
        });
    }

    fn set_parity(&mut self, parity: ParityMode) {
        pac::UART0.uartlcr_h().modify(|w| {
            w.set_pen(parity.is_enabled());
            w.set_eps(!parity.is_odd());
        });
    }

    fn enable(&mut self) {
        let r = pac::UART0;
        // Divisors only latch on an LCR_H write.
        r.uartlcr_h().modify(|_| {});
        r.uartcr().write(|w| {
            w.set_uarten(true);
            w.set_txe(true);
            w.set_rxe(true);
        });
    }
}
