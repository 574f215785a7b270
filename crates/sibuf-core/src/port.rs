//! Serial port capability consumed by the relay engine.
//!
//! The engine never touches UART registers. A driver shim implements
//! [`SerialPort`] for each physical port; tests and the host simulator use
//! in-memory implementations instead.

/// Polled, non-blocking byte I/O on one serial port.
///
/// Readiness is sampled, never awaited: callers check
/// [`is_readable`](Self::is_readable) / [`is_writable`](Self::is_writable)
/// before transferring a byte in the same tick.
///
/// # Example
///
/// ```rust
/// use sibuf_core::SerialPort;
///
/// /// Port that echoes nothing and accepts everything.
/// struct Sink(Vec<u8>);
///
/// impl SerialPort for Sink {
///     fn is_readable(&self) -> bool { false }
///     fn read_byte(&mut self) -> u8 { 0 }
///     fn is_writable(&self) -> bool { true }
///     fn write_byte(&mut self, byte: u8) { self.0.push(byte); }
/// }
///
/// let mut sink = Sink(Vec::new());
/// sink.write_byte(0xD3);
/// assert_eq!(sink.0, [0xD3]);
/// ```
pub trait SerialPort {
    /// Returns true if at least one received byte is waiting.
    fn is_readable(&self) -> bool;

    /// Takes one received byte.
    ///
    /// Only meaningful after [`is_readable`](Self::is_readable) returned true.
    fn read_byte(&mut self) -> u8;

    /// Returns true if the port can accept a byte now (CTS asserted, TX FIFO
    /// not full).
    fn is_writable(&self) -> bool;

    /// Queues one byte for transmission.
    ///
    /// Only meaningful after [`is_writable`](Self::is_writable) returned true.
    fn write_byte(&mut self, byte: u8);
}

impl<P: SerialPort + ?Sized> SerialPort for &mut P {
    #[inline]
    fn is_readable(&self) -> bool {
        (**self).is_readable()
    }

    #[inline]
    fn read_byte(&mut self) -> u8 {
        (**self).read_byte()
    }

    #[inline]
    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) {
        (**self).write_byte(byte);
    }
}
