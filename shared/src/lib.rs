#![no_std]

//! Wire protocol spoken between the aspserial host client and the programmer
//! firmware. Everything rides on vendor control transfers addressed to the
//! device; serial payloads travel in fixed 8-byte packets whose first byte
//! is a length prefix.

/// USB Vendor ID (shared VOTI id used by USBasp-compatible programmers)
pub const USB_VID: u16 = 0x16C0;

/// USB Product ID
pub const USB_PID: u16 = 0x05DC;

/// Size of every serial packet exchanged over the control pipe.
pub const PACKET_SIZE: usize = 8;

/// Payload bytes that fit after the length prefix.
pub const MAX_PAYLOAD: usize = PACKET_SIZE - 1;

/// Length of the reply to a line configuration request.
pub const LINE_ECHO_SIZE: usize = 4;

/// Host-side timeout for every control transfer, in milliseconds.
pub const TRANSFER_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// Request codes (bRequest of vendor control transfers)
// =============================================================================

pub const FUNC_CONNECT: u8 = 1;
pub const FUNC_DISCONNECT: u8 = 2;
pub const FUNC_TRANSMIT: u8 = 3;
pub const FUNC_READ_FLASH: u8 = 4;
pub const FUNC_ENABLE_PROG: u8 = 5;
pub const FUNC_WRITE_FLASH: u8 = 6;
pub const FUNC_READ_EEPROM: u8 = 7;
pub const FUNC_WRITE_EEPROM: u8 = 8;
pub const FUNC_SET_LONG_ADDRESS: u8 = 9;
pub const FUNC_SET_ISP_SCK: u8 = 10;
/// Configure the serial line; answered with a [`LineEcho`].
pub const FUNC_SET_SERIAL: u8 = 11;
/// Fetch one framed packet of bytes received from the target.
pub const FUNC_READ_SERIAL: u8 = 12;
/// Send one framed packet of bytes to the target.
pub const FUNC_WRITE_SERIAL: u8 = 13;

/// Decoded request code. Codes the firmware does not know map to `Unknown`
/// so the dispatcher can ignore them explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Connect,
    Disconnect,
    Transmit,
    ReadFlash,
    EnableProg,
    WriteFlash,
    ReadEeprom,
    WriteEeprom,
    SetLongAddress,
    SetIspSck,
    SetSerial,
    ReadSerial,
    WriteSerial,
    Unknown(u8),
}

impl Command {
    pub fn from_code(code: u8) -> Self {
        match code {
            FUNC_CONNECT => Command::Connect,
            FUNC_DISCONNECT => Command::Disconnect,
            FUNC_TRANSMIT => Command::Transmit,
            FUNC_READ_FLASH => Command::ReadFlash,
            FUNC_ENABLE_PROG => Command::EnableProg,
            FUNC_WRITE_FLASH => Command::WriteFlash,
            FUNC_READ_EEPROM => Command::ReadEeprom,
            FUNC_WRITE_EEPROM => Command::WriteEeprom,
            FUNC_SET_LONG_ADDRESS => Command::SetLongAddress,
            FUNC_SET_ISP_SCK => Command::SetIspSck,
            FUNC_SET_SERIAL => Command::SetSerial,
            FUNC_READ_SERIAL => Command::ReadSerial,
            FUNC_WRITE_SERIAL => Command::WriteSerial,
            other => Command::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Command::Connect => FUNC_CONNECT,
            Command::Disconnect => FUNC_DISCONNECT,
            Command::Transmit => FUNC_TRANSMIT,
            Command::ReadFlash => FUNC_READ_FLASH,
            Command::EnableProg => FUNC_ENABLE_PROG,
            Command::WriteFlash => FUNC_WRITE_FLASH,
            Command::ReadEeprom => FUNC_READ_EEPROM,
            Command::WriteEeprom => FUNC_WRITE_EEPROM,
            Command::SetLongAddress => FUNC_SET_LONG_ADDRESS,
            Command::SetIspSck => FUNC_SET_ISP_SCK,
            Command::SetSerial => FUNC_SET_SERIAL,
            Command::ReadSerial => FUNC_READ_SERIAL,
            Command::WriteSerial => FUNC_WRITE_SERIAL,
            Command::Unknown(code) => code,
        }
    }
}

/// The vendor part of a SETUP packet as both ends see it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlRequest {
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl ControlRequest {
    pub fn new(command: Command, value: u16, index: u16, length: u16) -> Self {
        Self {
            request: command.code(),
            value,
            index,
            length,
        }
    }

    pub fn command(&self) -> Command {
        Command::from_code(self.request)
    }

    /// Bytes 2..6 of the SETUP packet (wValue, wIndex) in wire order.
    pub fn argument_bytes(&self) -> [u8; 4] {
        let v = self.value.to_le_bytes();
        let i = self.index.to_le_bytes();
        [v[0], v[1], i[0], i[1]]
    }
}

// =============================================================================
// Line configuration selectors
// =============================================================================

/// Number of entries in the baud table.
pub const BAUD_TABLE_LEN: usize = 10;

/// Selector of the first (slowest) table entry.
pub const BAUD_SELECTOR_BASE: u8 = 0x10;

/// Echoed in place of the baud selector when it is outside the table.
pub const BAUD_REJECTED: u8 = 0xFE;

/// Echoed in place of the bit-width selector when it is not 5..=8.
pub const BITS_REJECTED: u8 = 1;

/// Echoed in place of the parity selector when it is not none/even/odd.
pub const PARITY_REJECTED: u8 = 0;

/// Supported line rates. Selectors run from 0x10 (300 baud) to 0x19
/// (115200 baud).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BaudRate {
    B300 = 0x10,
    B600 = 0x11,
    B1200 = 0x12,
    B2400 = 0x13,
    B4800 = 0x14,
    B9600 = 0x15,
    B19200 = 0x16,
    B38400 = 0x17,
    B57600 = 0x18,
    B115200 = 0x19,
}

impl BaudRate {
    pub const ALL: [BaudRate; BAUD_TABLE_LEN] = [
        BaudRate::B300,
        BaudRate::B600,
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    pub fn from_selector(selector: u8) -> Option<Self> {
        let slot = selector.checked_sub(BAUD_SELECTOR_BASE)? as usize;
        Self::ALL.get(slot).copied()
    }

    pub fn from_bits_per_second(rate: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.bits_per_second() == rate)
    }

    pub fn selector(self) -> u8 {
        self as u8
    }

    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B300 => 300,
            BaudRate::B600 => 600,
            BaudRate::B1200 => 1_200,
            BaudRate::B2400 => 2_400,
            BaudRate::B4800 => 4_800,
            BaudRate::B9600 => 9_600,
            BaudRate::B19200 => 19_200,
            BaudRate::B38400 => 38_400,
            BaudRate::B57600 => 57_600,
            BaudRate::B115200 => 115_200,
        }
    }

    /// Precomputed UBRR divisor for a 12 MHz AVR USART (normal speed mode).
    pub fn divisor(self) -> u16 {
        match self {
            BaudRate::B300 => 2499,
            BaudRate::B600 => 1249,
            BaudRate::B1200 => 624,
            BaudRate::B2400 => 311,
            BaudRate::B4800 => 155,
            BaudRate::B9600 => 77,
            BaudRate::B19200 => 38,
            BaudRate::B38400 => 18,
            BaudRate::B57600 => 12,
            BaudRate::B115200 => 6,
        }
    }
}

/// Character width. The selector is the bit count itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataBits {
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
}

impl DataBits {
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            5 => Some(DataBits::Five),
            6 => Some(DataBits::Six),
            7 => Some(DataBits::Seven),
            8 => Some(DataBits::Eight),
            _ => None,
        }
    }

    pub fn selector(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Parity {
    None = 1,
    Even = 2,
    Odd = 3,
}

impl Parity {
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            1 => Some(Parity::None),
            2 => Some(Parity::Even),
            3 => Some(Parity::Odd),
            _ => None,
        }
    }

    pub fn selector(self) -> u8 {
        self as u8
    }
}

/// A (baud, bits, parity) triple as requested by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineConfig {
    pub baud: BaudRate,
    pub data_bits: DataBits,
    pub parity: Parity,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            baud: BaudRate::B2400,
            data_bits: DataBits::Eight,
            parity: Parity::None,
        }
    }
}

impl LineConfig {
    /// Build the configure request: `wValue = bits << 8 | baud`,
    /// `wIndex = parity`.
    pub fn to_request(&self) -> ControlRequest {
        raw_line_request(
            self.baud.selector(),
            self.data_bits.selector(),
            self.parity.selector(),
        )
    }
}

/// Configure request built from raw selectors, including ones the firmware
/// is expected to reject.
pub fn raw_line_request(baud: u8, bits: u8, parity: u8) -> ControlRequest {
    ControlRequest::new(
        Command::SetSerial,
        u16::from_le_bytes([baud, bits]),
        u16::from(parity),
        LINE_ECHO_SIZE as u16,
    )
}

/// Reply to a configure request: the applied baud, bits and parity codes
/// followed by a zero byte. Rejected fields carry the sentinel codes instead
/// of the requested selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineEcho {
    pub baud: u8,
    pub bits: u8,
    pub parity: u8,
    pub reserved: u8,
}

impl LineEcho {
    pub fn to_bytes(&self) -> [u8; LINE_ECHO_SIZE] {
        [self.baud, self.bits, self.parity, self.reserved]
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < LINE_ECHO_SIZE {
            return None;
        }
        Some(Self {
            baud: bytes[0],
            bits: bytes[1],
            parity: bytes[2],
            reserved: bytes[3],
        })
    }

    /// Whether every requested field was applied as asked.
    pub fn confirms(&self, config: &LineConfig) -> bool {
        self.baud == config.baud.selector()
            && self.bits == config.data_bits.selector()
            && self.parity == config.parity.selector()
    }
}

// =============================================================================
// Length-prefixed serial packets
// =============================================================================

/// An 8-byte serial packet: byte 0 counts the valid payload bytes that
/// follow, bytes beyond the count are padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FramedPacket {
    bytes: [u8; PACKET_SIZE],
}

impl FramedPacket {
    /// Frame up to [`MAX_PAYLOAD`] bytes. Longer input is truncated; the
    /// caller learns how much was taken from [`FramedPacket::len`].
    pub fn encode(payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_PAYLOAD);
        let mut bytes = [0u8; PACKET_SIZE];
        bytes[0] = len as u8;
        bytes[1..=len].copy_from_slice(&payload[..len]);
        Self { bytes }
    }

    /// Payload of a received packet. A count byte larger than what actually
    /// arrived is clamped to the bytes present.
    pub fn decode(raw: &[u8]) -> &[u8] {
        match raw.split_first() {
            Some((&count, rest)) => &rest[..(count as usize).min(rest.len())],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes[0] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..=self.len()]
    }

    /// The bytes that go on the wire: prefix plus payload, no padding.
    pub fn as_wire(&self) -> &[u8] {
        &self.bytes[..=self.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_selector_table() {
        assert_eq!(BaudRate::from_selector(0x10), Some(BaudRate::B300));
        assert_eq!(BaudRate::from_selector(0x19), Some(BaudRate::B115200));
        assert_eq!(BaudRate::from_selector(0x0F), None);
        assert_eq!(BaudRate::from_selector(0x1A), None);
        assert_eq!(BaudRate::B2400.divisor(), 311);
    }

    #[test]
    fn test_baud_from_rate() {
        assert_eq!(BaudRate::from_bits_per_second(9600), Some(BaudRate::B9600));
        assert_eq!(BaudRate::from_bits_per_second(14400), None);
    }

    #[test]
    fn test_line_request_encoding() {
        let req = LineConfig::default().to_request();
        assert_eq!(req.request, FUNC_SET_SERIAL);
        assert_eq!(req.value, 0x0813);
        assert_eq!(req.index, 0x0001);
        assert_eq!(req.argument_bytes(), [0x13, 0x08, 0x01, 0x00]);
    }

    #[test]
    fn test_echo_confirms() {
        let config = LineConfig::default();
        let good = LineEcho::from_bytes(&[0x13, 8, 1, 0]).unwrap();
        assert!(good.confirms(&config));
        let bad = LineEcho::from_bytes(&[BAUD_REJECTED, 8, 1, 0]).unwrap();
        assert!(!bad.confirms(&config));
        assert_eq!(LineEcho::from_bytes(&[1, 2, 3]), None);
    }

    #[test]
    fn test_framing_round_trip() {
        let packet = FramedPacket::encode(b"ABC");
        assert_eq!(packet.as_wire(), &[3, b'A', b'B', b'C']);
        assert_eq!(FramedPacket::decode(packet.as_wire()), b"ABC");

        let empty = FramedPacket::encode(&[]);
        assert!(empty.is_empty());
        assert_eq!(FramedPacket::decode(empty.as_wire()), &[] as &[u8]);
    }

    #[test]
    fn test_encode_truncates_to_seven() {
        let packet = FramedPacket::encode(b"0123456789");
        assert_eq!(packet.len(), MAX_PAYLOAD);
        assert_eq!(packet.payload(), b"0123456");
    }

    #[test]
    fn test_decode_clamps_to_received() {
        assert_eq!(FramedPacket::decode(&[7, 1, 2]), &[1, 2]);
        assert_eq!(FramedPacket::decode(&[]), &[] as &[u8]);
    }

    #[test]
    fn test_unknown_command_round_trips() {
        assert_eq!(Command::from_code(0x42), Command::Unknown(0x42));
        assert_eq!(Command::Unknown(0x42).code(), 0x42);
        assert_eq!(Command::from_code(12), Command::ReadSerial);
    }
}
