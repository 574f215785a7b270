//! Board pin table.
//!
//! The serial buffer board pairs each input channel with one UART of the
//! microcontroller. Channel 0's UART doubles as the shared output: its TX
//! pin drives the radio module and its CTS pin is the radio's flow control.
//!
//! | Channel | UART | TX | RX | CTS | CTS enabled | RTS enabled |
//! |---------|------|----|----|-----|-------------|-------------|
//! | 0 | uart0 | GPIO0 | GPIO1 | GPIO2 | yes | no |
//! | 1 | uart1 | GPIO4 | GPIO5 | GPIO6 | yes | no |

use core::fmt;

/// Hardware UART instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UartId(u8);

impl UartId {
    /// First UART.
    pub const UART0: Self = Self(0);
    /// Second UART.
    pub const UART1: Self = Self(1);

    /// Creates a UART id from its instance number.
    #[inline]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Instance number.
    #[inline]
    pub const fn index(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for UartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uart{}", self.0)
    }
}

/// GPIO assignment for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelPins {
    /// UART serving this channel.
    pub uart: UartId,
    /// TX GPIO.
    pub tx: u8,
    /// RX GPIO, pulled up.
    pub rx: u8,
    /// CTS GPIO.
    pub cts: u8,
    /// RTS GPIO, only routed when `rts_enabled`.
    pub rts: Option<u8>,
    /// CTS handshake enabled.
    pub cts_enabled: bool,
    /// RTS handshake enabled.
    pub rts_enabled: bool,
}

impl ChannelPins {
    /// GPIOs routed to the UART function for this channel.
    pub fn uart_pins(&self) -> impl Iterator<Item = u8> {
        [
            Some(self.tx),
            Some(self.rx),
            Some(self.cts),
            self.rts.filter(|_| self.rts_enabled),
        ]
        .into_iter()
        .flatten()
    }
}

/// Number of channels on the serial buffer board.
pub const BOARD_CHANNELS: usize = 2;

/// Complete board description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout<const N: usize = BOARD_CHANNELS> {
    /// Pin assignment per channel.
    pub channels: [ChannelPins; N],
    /// Channel whose UART carries the shared output.
    pub shared_output: usize,
    /// Activity LED GPIO.
    pub led: u8,
}

impl BoardLayout<BOARD_CHANNELS> {
    /// The two-channel serial buffer board.
    pub const SERIAL_BUFFER: Self = Self {
        channels: [
            ChannelPins {
                uart: UartId::UART0,
                tx: 0,
                rx: 1,
                cts: 2,
                rts: None,
                cts_enabled: true,
                rts_enabled: false,
            },
            ChannelPins {
                uart: UartId::UART1,
                tx: 4,
                rx: 5,
                cts: 6,
                rts: None,
                cts_enabled: true,
                rts_enabled: false,
            },
        ],
        shared_output: 0,
        led: 25,
    };
}

impl Default for BoardLayout<BOARD_CHANNELS> {
    fn default() -> Self {
        Self::SERIAL_BUFFER
    }
}

impl<const N: usize> BoardLayout<N> {
    /// Pins of channel `index`.
    pub fn pins(&self, index: usize) -> Option<&ChannelPins> {
        self.channels.get(index)
    }

    /// UART carrying the shared output.
    pub fn shared_uart(&self) -> Option<UartId> {
        self.pins(self.shared_output).map(|p| p.uart)
    }

    /// Returns the first GPIO claimed twice, either by two UART functions or
    /// by a UART function and the LED.
    pub fn pin_conflict(&self) -> Option<u8> {
        let mut used = [false; 256];
        used[self.led as usize] = true;
        for pins in &self.channels {
            for gpio in pins.uart_pins() {
                if used[gpio as usize] {
                    return Some(gpio);
                }
                used[gpio as usize] = true;
            }
        }
        None
    }

    /// Returns the first UART assigned to two channels.
    pub fn uart_conflict(&self) -> Option<UartId> {
        self.channels.iter().enumerate().find_map(|(i, a)| {
            self.channels[i + 1..]
                .iter()
                .any(|b| b.uart == a.uart)
                .then_some(a.uart)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_buffer_layout() {
        let board = BoardLayout::SERIAL_BUFFER;
        assert_eq!(board.shared_uart(), Some(UartId::UART0));
        assert_eq!(board.pins(1).map(|p| p.rx), Some(5));
        assert!(board.pins(2).is_none());
        assert_eq!(board.pin_conflict(), None);
        assert_eq!(board.uart_conflict(), None);
        assert!(board.channels.iter().all(|p| p.cts_enabled && !p.rts_enabled));
    }

    #[test]
    fn test_uart_pins_skip_disabled_rts() {
        let mut pins = BoardLayout::SERIAL_BUFFER.channels[0];
        pins.rts = Some(3);
        assert_eq!(pins.uart_pins().collect::<Vec<_>>(), [0, 1, 2]);
        pins.rts_enabled = true;
        assert_eq!(pins.uart_pins().collect::<Vec<_>>(), [0, 1, 2, 3]);
    }

    #[test]
    fn test_conflicts_detected() {
        let mut board = BoardLayout::SERIAL_BUFFER;
        board.channels[1].tx = 2;
        assert_eq!(board.pin_conflict(), Some(2));

        let mut board = BoardLayout::SERIAL_BUFFER;
        board.led = 5;
        assert_eq!(board.pin_conflict(), Some(5));

        let mut board = BoardLayout::SERIAL_BUFFER;
        board.channels[1].uart = UartId::UART0;
        assert_eq!(board.uart_conflict(), Some(UartId::UART0));
    }

    #[test]
    fn test_uart_display() {
        assert_eq!(UartId::new(1).to_string(), "uart1");
        assert_eq!(UartId::UART0.index(), 0);
    }
}
