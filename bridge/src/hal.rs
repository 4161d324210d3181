//! Hardware capabilities the dispatcher and pump are handed.
//!
//! The traits stay at register level: readiness flags, a data register, and
//! the frame-format fields of the UART. Boards implement them over their own
//! peripherals; tests implement them over plain fields.

use aspserial_shared::{BaudRate, DataBits, Parity};

/// Polled hardware UART.
pub trait SerialPort {
    /// Transmit data register can take another byte.
    fn tx_ready(&self) -> bool;

    /// A received byte is waiting in the data register.
    fn rx_ready(&self) -> bool;

    fn write_data(&mut self, byte: u8);

    fn read_data(&mut self) -> u8;

    /// Program the rate generator.
    fn set_baud(&mut self, baud: BaudRate);

    /// Program the character-size field. Clears any parity setting.
    fn set_char_size(&mut self, size: CharSize);

    /// Program the parity-mode field on top of the current frame format.
    fn set_parity(&mut self, parity: ParityMode);

    /// Enable transmitter and receiver.
    fn enable(&mut self);
}

/// Character-size field of the frame control register (UCSZ1:0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharSize(pub u8);

impl CharSize {
    pub fn for_bits(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => CharSize(0b00),
            DataBits::Six => CharSize(0b01),
            DataBits::Seven => CharSize(0b10),
            DataBits::Eight => CharSize(0b11),
        }
    }

    pub fn data_bits(self) -> u8 {
        5 + (self.0 & 0b11)
    }
}

/// Parity-mode field of the frame control register (UPM1:0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParityMode(pub u8);

impl ParityMode {
    pub const DISABLED: ParityMode = ParityMode(0b00);
    pub const EVEN: ParityMode = ParityMode(0b10);
    pub const ODD: ParityMode = ParityMode(0b11);

    pub fn for_parity(parity: Parity) -> Self {
        match parity {
            Parity::None => Self::DISABLED,
            Parity::Even => Self::EVEN,
            Parity::Odd => Self::ODD,
        }
    }

    pub fn is_enabled(self) -> bool {
        self.0 & 0b10 != 0
    }

    pub fn is_odd(self) -> bool {
        self.0 & 0b01 != 0
    }
}

/// Programmer status LEDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Led {
    Red,
    Green,
}

pub trait StatusLeds {
    fn set(&mut self, led: Led, lit: bool);
}

/// Programmer attached to nothing: green on.
pub fn show_idle<L: StatusLeds>(leds: &mut L) {
    leds.set(Led::Red, false);
    leds.set(Led::Green, true);
}

/// Target held in programming mode: red on.
pub fn show_programming<L: StatusLeds>(leds: &mut L) {
    leds.set(Led::Green, false);
    leds.set(Led::Red, true);
}
