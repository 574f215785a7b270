//! Punch wire format and the per-channel framing states.
//!
//! A punch record on the wire looks like:
//!
//! ```text
//! [preamble] header length payload[length] trailer[trailer_len]
//!   0x02      0xD3   0x0D    13 bytes        CRC1 CRC0 ETX
//! ```
//!
//! The preamble is optional and travels with the record as ordinary bytes
//! seen before the header. The trailer is never inspected; only its length
//! matters for framing.

/// STX, optional constant preamble of a punch.
pub const PUNCH_PREAMBLE: u8 = 0x02;

/// Constant first byte of every punch record.
pub const PUNCH_HEADER: u8 = 0xD3;

/// ETX, final byte of the extended-protocol trailer.
pub const PUNCH_ETX: u8 = 0x03;

/// Declared payload length of a standard SI punch.
pub const PUNCH_PAYLOAD_LEN: u8 = 13;

/// Trailer bytes after the payload: CRC1, CRC0, ETX.
pub const PUNCH_TRAILER_LEN: u8 = 3;

/// Byte values and sizes that define record boundaries.
///
/// # Example
///
/// ```rust
/// use sibuf_core::FrameFormat;
///
/// let format = FrameFormat::default();
/// assert_eq!(format.header, 0xD3);
/// assert_eq!(format.record_len(13), 18);
/// assert_eq!(format.record_len_with_preamble(13), 19);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    /// Marker byte that starts a record.
    pub header: u8,
    /// Optional byte sent ahead of the header.
    pub preamble: Option<u8>,
    /// Fixed number of bytes following the declared payload.
    pub trailer_len: u8,
}

impl FrameFormat {
    /// SI extended-protocol punch: STX preamble, 0xD3 header, 3-byte trailer.
    pub const SI_PUNCH: Self = Self {
        header: PUNCH_HEADER,
        preamble: Some(PUNCH_PREAMBLE),
        trailer_len: PUNCH_TRAILER_LEN,
    };

    /// Creates a format with the given header byte and trailer length.
    pub const fn new(header: u8, trailer_len: u8) -> Self {
        Self {
            header,
            preamble: None,
            trailer_len,
        }
    }

    /// Sets the preamble byte.
    pub const fn with_preamble(mut self, preamble: u8) -> Self {
        self.preamble = Some(preamble);
        self
    }

    /// Bytes still expected after the length byte for a declared length.
    #[inline]
    pub const fn remainder(&self, declared: u8) -> usize {
        declared as usize + self.trailer_len as usize
    }

    /// Total record length from header through trailer.
    #[inline]
    pub const fn record_len(&self, declared: u8) -> usize {
        2 + self.remainder(declared)
    }

    /// Total record length including the preamble, when one is configured.
    #[inline]
    pub const fn record_len_with_preamble(&self, declared: u8) -> usize {
        let pre = if self.preamble.is_some() { 1 } else { 0 };
        pre + self.record_len(declared)
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self::SI_PUNCH
    }
}

/// Position of a channel in the punch assembly and transmit cycle.
///
/// `Header` → `Length` → `Payload` → `Ready` → `Transmit` → `Header`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FramingState {
    /// Relaying bytes while looking for the header marker.
    #[default]
    Header,
    /// Next byte is the declared payload length.
    Length,
    /// Copying payload and trailer bytes.
    Payload,
    /// A record is assembled and waits for the transmit lock.
    Ready,
    /// Holds the transmit lock; output queue is drained onto the shared line.
    Transmit,
}

impl FramingState {
    /// Returns true while the channel consumes bytes from its input queue.
    #[inline]
    pub const fn is_assembling(&self) -> bool {
        matches!(self, Self::Header | Self::Length | Self::Payload)
    }

    /// Short lowercase name, used in logs and reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Length => "length",
            Self::Payload => "payload",
            Self::Ready => "ready",
            Self::Transmit => "transmit",
        }
    }
}

impl core::fmt::Display for FramingState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_si_punch_lengths() {
        let format = FrameFormat::SI_PUNCH;
        assert_eq!(format.remainder(PUNCH_PAYLOAD_LEN), 16);
        assert_eq!(format.record_len(PUNCH_PAYLOAD_LEN), 18);
        assert_eq!(format.record_len_with_preamble(PUNCH_PAYLOAD_LEN), 19);
    }

    #[test]
    fn test_format_without_preamble() {
        let format = FrameFormat::new(0xD3, 2);
        assert_eq!(format.preamble, None);
        assert_eq!(format.record_len(13), 17);
        assert_eq!(format.record_len_with_preamble(13), 17);
        assert_eq!(format.with_preamble(0x02).record_len_with_preamble(13), 18);
    }

    #[test]
    fn test_state_default_and_assembling() {
        assert_eq!(FramingState::default(), FramingState::Header);
        assert!(FramingState::Header.is_assembling());
        assert!(FramingState::Length.is_assembling());
        assert!(FramingState::Payload.is_assembling());
        assert!(!FramingState::Ready.is_assembling());
        assert!(!FramingState::Transmit.is_assembling());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(FramingState::Transmit.name(), "transmit");
        assert_eq!(FramingState::Payload.to_string(), "payload");
    }
}
