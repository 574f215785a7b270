//! UART bring-up.
//!
//! [`bring_up`] configures every channel of a [`BoardLayout`] through a
//! [`UartDriver`], in the order the peripheral expects:
//!
//! 1. init the UART at [`INIT_BAUD`]
//! 2. set the real baud rate (the driver reports the rate it achieved)
//! 3. route TX, RX and CTS (and RTS if enabled) to the UART function
//! 4. pull up RX so an unplugged station reads as idle
//! 5. enable hardware flow control
//! 6. set the character format
//! 7. enable the FIFOs

use thiserror::Error;

use crate::board::{BOARD_CHANNELS, BoardLayout, UartId};
use crate::line::{DataBits, INIT_BAUD, LineSettings, Parity, StopBits};

/// Largest accepted deviation between requested and actual baud rate, in
/// tenths of a percent. Async serial tolerates a few percent end to end.
pub const BAUD_TOLERANCE_PERMILLE: u32 = 20;

/// Function selected on a GPIO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinFunction {
    /// UART peripheral.
    Uart,
    /// Software-controlled input/output.
    Sio,
}

/// Minimal UART and GPIO capability set needed to configure the board.
///
/// Implemented by the HAL on target and by [`crate::sim::RecordingDriver`]
/// on the host.
pub trait UartDriver {
    /// Resets and enables `uart` at `baud`. Returns the actual baud rate.
    fn init(&mut self, uart: UartId, baud: u32) -> u32;

    /// Changes the baud rate. Returns the actual baud rate, which is the
    /// closest the clock divider can produce.
    fn set_baudrate(&mut self, uart: UartId, baud: u32) -> u32;

    /// Selects the function of `gpio`.
    fn set_pin_function(&mut self, gpio: u8, function: PinFunction);

    /// Sets the pull resistors of `gpio`.
    fn set_pulls(&mut self, gpio: u8, up: bool, down: bool);

    /// Enables CTS and/or RTS handshaking.
    fn set_hw_flow(&mut self, uart: UartId, cts: bool, rts: bool);

    /// Sets the character format.
    fn set_format(
        &mut self,
        uart: UartId,
        data_bits: DataBits,
        stop_bits: StopBits,
        parity: Parity,
    );

    /// Enables or disables the hardware FIFOs.
    fn set_fifo_enabled(&mut self, uart: UartId, enabled: bool);
}

impl<D: UartDriver + ?Sized> UartDriver for &mut D {
    fn init(&mut self, uart: UartId, baud: u32) -> u32 {
        (**self).init(uart, baud)
    }
    fn set_baudrate(&mut self, uart: UartId, baud: u32) -> u32 {
        (**self).set_baudrate(uart, baud)
    }
    fn set_pin_function(&mut self, gpio: u8, function: PinFunction) {
        (**self).set_pin_function(gpio, function);
    }
    fn set_pulls(&mut self, gpio: u8, up: bool, down: bool) {
        (**self).set_pulls(gpio, up, down);
    }
    fn set_hw_flow(&mut self, uart: UartId, cts: bool, rts: bool) {
        (**self).set_hw_flow(uart, cts, rts);
    }
    fn set_format(
        &mut self,
        uart: UartId,
        data_bits: DataBits,
        stop_bits: StopBits,
        parity: Parity,
    ) {
        (**self).set_format(uart, data_bits, stop_bits, parity);
    }
    fn set_fifo_enabled(&mut self, uart: UartId, enabled: bool) {
        (**self).set_fifo_enabled(uart, enabled);
    }
}

/// Errors that stop the board from being brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BringUpError {
    /// Two functions claim the same GPIO.
    #[error("GPIO{0} is assigned twice")]
    PinConflict(u8),

    /// Two channels share one UART.
    #[error("{0} is assigned to more than one channel")]
    UartConflict(UartId),

    /// The shared output refers to a channel that does not exist.
    #[error("shared output channel {index} does not exist (board has {channels})")]
    NoSharedOutput {
        /// Configured shared output channel.
        index: usize,
        /// Number of channels on the board.
        channels: usize,
    },

    /// The clock divider cannot get close enough to the requested rate.
    #[error("{uart}: requested {requested} baud, got {actual}")]
    BaudOutOfTolerance {
        /// UART that was configured.
        uart: UartId,
        /// Requested rate.
        requested: u32,
        /// Rate reported by the driver.
        actual: u32,
    },
}

/// Outcome of a successful bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringUpReport<const N: usize = BOARD_CHANNELS> {
    /// Actual baud rate per channel.
    pub actual_baud: [u32; N],
}

impl<const N: usize> BringUpReport<N> {
    /// Largest deviation from `requested` across channels, in permille.
    pub fn worst_deviation_permille(&self, requested: u32) -> u32 {
        self.actual_baud
            .iter()
            .map(|&actual| deviation_permille(requested, actual))
            .max()
            .unwrap_or(0)
    }
}

fn deviation_permille(requested: u32, actual: u32) -> u32 {
    if requested == 0 {
        return 0;
    }
    (u64::from(requested.abs_diff(actual)) * 1000 / u64::from(requested)) as u32
}

/// Configures every channel of `board` for `line`.
///
/// The layout is checked for pin and UART conflicts before the driver is
/// touched. A baud rate outside [`BAUD_TOLERANCE_PERMILLE`] aborts the
/// bring-up at the offending channel.
pub fn bring_up<D: UartDriver, const N: usize>(
    driver: &mut D,
    board: &BoardLayout<N>,
    line: &LineSettings,
) -> Result<BringUpReport<N>, BringUpError> {
    if let Some(gpio) = board.pin_conflict() {
        return Err(BringUpError::PinConflict(gpio));
    }
    if let Some(uart) = board.uart_conflict() {
        return Err(BringUpError::UartConflict(uart));
    }
    if board.shared_output >= N {
        return Err(BringUpError::NoSharedOutput {
            index: board.shared_output,
            channels: N,
        });
    }

    let mut actual_baud = [0; N];
    for (index, pins) in board.channels.iter().enumerate() {
        driver.init(pins.uart, INIT_BAUD);
        let actual = driver.set_baudrate(pins.uart, line.baud);
        if deviation_permille(line.baud, actual) > BAUD_TOLERANCE_PERMILLE {
            return Err(BringUpError::BaudOutOfTolerance {
                uart: pins.uart,
                requested: line.baud,
                actual,
            });
        }
        actual_baud[index] = actual;

        driver.set_pin_function(pins.tx, PinFunction::Uart);
        driver.set_pin_function(pins.rx, PinFunction::Uart);
        driver.set_pulls(pins.rx, true, false);
        driver.set_pin_function(pins.cts, PinFunction::Uart);
        if let Some(rts) = pins.rts
            && pins.rts_enabled
        {
            driver.set_pin_function(rts, PinFunction::Uart);
        }

        driver.set_hw_flow(
            pins.uart,
            pins.cts_enabled && line.flow.cts,
            pins.rts_enabled && line.flow.rts,
        );
        driver.set_format(pins.uart, line.data_bits, line.stop_bits, line.parity);
        driver.set_fifo_enabled(pins.uart, true);

        #[cfg(feature = "tracing")]
        tracing::info!(
            channel = index,
            uart = %pins.uart,
            requested = line.baud,
            actual,
            "uart configured"
        );
    }

    Ok(BringUpReport { actual_baud })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deviation() {
        assert_eq!(deviation_permille(38_400, 38_399), 0);
        assert_eq!(deviation_permille(1000, 1021), 21);
        assert_eq!(deviation_permille(1000, 979), 21);
        assert_eq!(deviation_permille(0, 5), 0);
    }

    #[test]
    fn test_report_worst_deviation() {
        let report = BringUpReport {
            actual_baud: [1000, 1010],
        };
        assert_eq!(report.worst_deviation_permille(1000), 10);
    }

    #[test]
    fn test_error_display() {
        let err = BringUpError::BaudOutOfTolerance {
            uart: UartId::UART1,
            requested: 38_400,
            actual: 40_000,
        };
        assert_eq!(err.to_string(), "uart1: requested 38400 baud, got 40000");
        assert_eq!(
            BringUpError::PinConflict(4).to_string(),
            "GPIO4 is assigned twice"
        );
    }
}
