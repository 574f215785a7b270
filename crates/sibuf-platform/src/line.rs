//! Serial line settings.
//!
//! Every UART on the board runs the same asynchronous format. SI stations
//! default to 38400 baud, 8 data bits, no parity, 1 stop bit; the radio
//! module on the shared line throttles the buffer with CTS.

use core::fmt;

/// Baud rate of the punch line.
pub const PUNCH_BAUD: u32 = 38_400;

/// Baud rate the UART is first initialized with before the real rate is set.
pub const INIT_BAUD: u32 = 2_400;

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataBits {
    /// 5 data bits.
    Five,
    /// 6 data bits.
    Six,
    /// 7 data bits.
    Seven,
    /// 8 data bits.
    Eight,
}

impl DataBits {
    /// Returns the bit count.
    #[inline]
    pub const fn count(self) -> u32 {
        match self {
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }

    /// Converts a bit count, returning `None` outside 5..=8.
    pub const fn from_count(count: u32) -> Option<Self> {
        match count {
            5 => Some(Self::Five),
            6 => Some(Self::Six),
            7 => Some(Self::Seven),
            8 => Some(Self::Eight),
            _ => None,
        }
    }
}

/// Parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    /// No parity bit.
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

impl Parity {
    /// Single-letter code used in the `8N1` notation.
    pub const fn code(self) -> char {
        match self {
            Self::None => 'N',
            Self::Even => 'E',
            Self::Odd => 'O',
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopBits {
    /// 1 stop bit.
    One,
    /// 2 stop bits.
    Two,
}

impl StopBits {
    /// Returns the bit count.
    #[inline]
    pub const fn count(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Hardware handshake lines in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlowControl {
    /// Transmitter waits for CTS before sending.
    pub cts: bool,
    /// Receiver drives RTS to pause the far end.
    pub rts: bool,
}

impl FlowControl {
    /// No handshake.
    pub const NONE: Self = Self {
        cts: false,
        rts: false,
    };

    /// CTS only: the buffer respects the radio module but is always ready
    /// to receive.
    pub const CTS_ONLY: Self = Self {
        cts: true,
        rts: false,
    };
}

/// Complete line configuration for one UART.
///
/// # Example
///
/// ```rust
/// use sibuf_platform::LineSettings;
///
/// let line = LineSettings::PUNCH;
/// assert_eq!(line.to_string(), "38400 8N1");
/// assert_eq!(line.frame_bits(), 10);
/// assert_eq!(line.bytes_per_second(), 3840);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineSettings {
    /// Requested baud rate.
    pub baud: u32,
    /// Data bits per character.
    pub data_bits: DataBits,
    /// Parity mode.
    pub parity: Parity,
    /// Stop bits per character.
    pub stop_bits: StopBits,
    /// Handshake lines.
    pub flow: FlowControl,
}

impl LineSettings {
    /// 38400 8N1 with CTS flow control.
    pub const PUNCH: Self = Self {
        baud: PUNCH_BAUD,
        data_bits: DataBits::Eight,
        parity: Parity::None,
        stop_bits: StopBits::One,
        flow: FlowControl::CTS_ONLY,
    };

    /// Returns a copy with a different baud rate.
    pub const fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    /// Bits on the wire per character, including start, parity and stop bits.
    pub const fn frame_bits(&self) -> u32 {
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Even | Parity::Odd => 1,
        };
        1 + self.data_bits.count() + parity + self.stop_bits.count()
    }

    /// Character throughput of a line that never pauses.
    pub const fn bytes_per_second(&self) -> u32 {
        self.baud / self.frame_bits()
    }

    /// Time to send `bytes` characters back to back, in microseconds.
    pub const fn transfer_micros(&self, bytes: u64) -> u64 {
        if self.baud == 0 {
            return 0;
        }
        bytes * self.frame_bits() as u64 * 1_000_000 / self.baud as u64
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self::PUNCH
    }
}

impl fmt::Display for LineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.baud,
            self.data_bits.count(),
            self.parity.code(),
            self.stop_bits.count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punch_line() {
        let line = LineSettings::default();
        assert_eq!(line.baud, 38_400);
        assert_eq!(line.data_bits, DataBits::Eight);
        assert_eq!(line.parity, Parity::None);
        assert_eq!(line.stop_bits, StopBits::One);
        assert!(line.flow.cts);
        assert!(!line.flow.rts);
    }

    #[test]
    fn test_frame_bits() {
        let mut line = LineSettings::PUNCH;
        assert_eq!(line.frame_bits(), 10);
        line.parity = Parity::Even;
        line.stop_bits = StopBits::Two;
        line.data_bits = DataBits::Seven;
        assert_eq!(line.frame_bits(), 11);
        assert_eq!(line.to_string(), "38400 7E2");
    }

    #[test]
    fn test_transfer_time() {
        // One 21-byte punch at 38400 8N1 takes about 5.5 ms
        assert_eq!(LineSettings::PUNCH.transfer_micros(21), 5_468);
        assert_eq!(LineSettings::PUNCH.with_baud(0).transfer_micros(21), 0);
    }

    #[test]
    fn test_data_bits_from_count() {
        assert_eq!(DataBits::from_count(8), Some(DataBits::Eight));
        assert_eq!(DataBits::from_count(9), None);
        assert_eq!(DataBits::from_count(5).map(DataBits::count), Some(5));
    }
}
