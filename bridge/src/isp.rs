//! In-circuit programming back end.
//!
//! The dispatcher owns the command bookkeeping (addresses, page counters,
//! block flags); the bit-level programming algorithms live behind
//! [`IspTarget`] and are supplied by the board.

/// SCK option meaning "let the firmware pick".
pub const SCK_AUTO: u8 = 0;

/// SCK option for 187.5 kHz, slow enough for a factory-fresh target running
/// on its 1 MHz internal oscillator.
pub const SCK_187_5_KHZ: u8 = 9;

/// Block flag: first block of a paged flash write, reloads the page counter.
pub const BLOCKFLAG_FIRST: u8 = 1;

/// Block flag: last block, flush any partially filled page on completion.
pub const BLOCKFLAG_LAST: u8 = 2;

pub trait IspTarget {
    /// Drive the ISP lines and hold the target in reset.
    fn connect(&mut self, sck_option: u8);

    /// Release the ISP lines.
    fn disconnect(&mut self);

    /// Clock one byte out and return the byte clocked in.
    fn transmit(&mut self, byte: u8) -> u8;

    /// Send the programming-enable sequence. Returns 0 on success.
    fn enter_programming_mode(&mut self) -> u8;

    fn read_flash(&mut self, address: u32) -> u8;

    fn read_eeprom(&mut self, address: u32) -> u8;

    /// Write one flash byte. `poll` is set for unpaged writes that must wait
    /// for completion before returning.
    fn write_flash(&mut self, address: u32, byte: u8, poll: bool);

    /// Commit the page buffer that contains `address`.
    fn flush_page(&mut self, address: u32, byte: u8);

    fn write_eeprom(&mut self, address: u32, byte: u8);
}

/// Board without ISP wiring. Reads float high and the target never answers
/// the programming-enable sequence.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl IspTarget for Detached {
    fn connect(&mut self, _sck_option: u8) {}

    fn disconnect(&mut self) {}

    fn transmit(&mut self, _byte: u8) -> u8 {
        0xFF
    }

    fn enter_programming_mode(&mut self) -> u8 {
        1
    }

    fn read_flash(&mut self, _address: u32) -> u8 {
        0xFF
    }

    fn read_eeprom(&mut self, _address: u32) -> u8 {
        0xFF
    }

    fn write_flash(&mut self, _address: u32, _byte: u8, _poll: bool) {}

    fn flush_page(&mut self, _address: u32, _byte: u8) {}

    fn write_eeprom(&mut self, _address: u32, _byte: u8) {}
}
