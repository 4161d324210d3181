/// Red/green programmer status LEDs, active high.
use embassy_rp::gpio::Output;

use aspserial_bridge::{Led, StatusLeds};

pub struct BoardLeds<'d> {
    red: Output<'d>,
    green: Output<'d>,
}

impl<'d> BoardLeds<'d> {
    pub fn new(red: Output<'d>, green: Output<'d>) -> Self {
        Self { red, green }
    }
}

impl StatusLeds for BoardLeds<'_> {
    fn set(&mut self, led: Led, lit: bool) {
        let pin = match led {
            Led::Red => &mut self.red,
            Led::Green => &mut self.green,
        };
        if lit {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }
}
