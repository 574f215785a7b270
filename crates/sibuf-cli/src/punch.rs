//! Punch stimulus generation and shared-line verification.
//!
//! The generator builds SI extended-protocol punch records:
//!
//! ```text
//! STX D3 0D CN1 CN0 SN3 SN2 SN1 SN0 TD TH TL TSS MEM2 MEM1 MEM0 CRC1 CRC0 [ETX]
//! ```
//!
//! The station code `CN` is the input channel the punch is sent on, and the
//! card number `SN` and memory address `MEM` both carry the punch index, so
//! a record on the shared line can be traced back to its stimulus. The CRC
//! is a fixed placeholder; the relay never checks it.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sibuf_core::{FrameFormat, PUNCH_ETX, PUNCH_PAYLOAD_LEN};

/// CRC value written into generated punches.
pub const PLACEHOLDER_CRC: u16 = 0xABCD;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;
const SECONDS_PER_HALF_DAY: u32 = 12 * 60 * 60;

/// Punch timestamp as the station encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunchTime {
    /// Day of week, 0 = Monday.
    pub weekday: u8,
    /// Seconds since midnight.
    pub seconds: u32,
    /// Sub-second part in 1/256 s.
    pub subsec: u8,
}

impl PunchTime {
    /// Creates a timestamp.
    pub const fn new(weekday: u8, seconds: u32, subsec: u8) -> Self {
        Self {
            weekday: weekday % 7,
            seconds: seconds % SECONDS_PER_DAY,
            subsec,
        }
    }

    /// Current UTC time.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let secs = since_epoch.as_secs();
        let days = secs / u64::from(SECONDS_PER_DAY);
        // 1970-01-01 was a Thursday
        let weekday = ((days + 3) % 7) as u8;
        let subsec = (u64::from(since_epoch.subsec_millis()) * 256 / 1000) as u8;
        Self::new(weekday, (secs % u64::from(SECONDS_PER_DAY)) as u32, subsec)
    }

    /// TD byte: weekday in bits 7..4 and 3..1, PM flag in bit 0.
    pub fn td(&self) -> u8 {
        let day = self.weekday + 1;
        16 * day + 2 * day + u8::from(self.seconds >= SECONDS_PER_HALF_DAY)
    }

    /// Seconds within the current half day.
    pub fn twelve_hour(&self) -> u16 {
        (self.seconds % SECONDS_PER_HALF_DAY) as u16
    }

    /// Moves the timestamp forward, wrapping into the next day.
    pub fn advance_millis(&mut self, millis: u32) {
        let total_256 = u64::from(self.subsec) + u64::from(millis) * 256 / 1000;
        self.subsec = (total_256 % 256) as u8;
        let secs = u64::from(self.seconds) + total_256 / 256;
        let days = secs / u64::from(SECONDS_PER_DAY);
        self.seconds = (secs % u64::from(SECONDS_PER_DAY)) as u32;
        self.weekday = ((u64::from(self.weekday) + days) % 7) as u8;
    }
}

/// Encodes one punch record in `format`.
///
/// The trailer is CRC1, CRC0, then ETX, padded with zeros if the format
/// asks for more; shorter trailers are truncated.
pub fn encode_punch(format: &FrameFormat, station: u16, index: u32, time: PunchTime) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(format.record_len_with_preamble(PUNCH_PAYLOAD_LEN));
    if let Some(preamble) = format.preamble {
        bytes.push(preamble);
    }
    bytes.push(format.header);
    bytes.push(PUNCH_PAYLOAD_LEN);
    bytes.extend(station.to_be_bytes());
    bytes.extend(index.to_be_bytes());
    bytes.push(time.td());
    bytes.extend(time.twelve_hour().to_be_bytes());
    bytes.push(time.subsec);
    bytes.extend(&index.to_be_bytes()[1..]);

    let [crc1, crc0] = PLACEHOLDER_CRC.to_be_bytes();
    let trailer = [crc1, crc0, PUNCH_ETX]
        .into_iter()
        .chain(std::iter::repeat(0))
        .take(format.trailer_len as usize);
    bytes.extend(trailer);
    bytes
}

/// A generated punch and the channel it goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Punch {
    /// Input channel, also the station code.
    pub channel: usize,
    /// Sequence number, also the card number.
    pub index: u32,
    /// Encoded record.
    pub bytes: Vec<u8>,
}

/// Random punch stream spread over several channels.
#[derive(Debug, Clone)]
pub struct PunchGenerator {
    rng: fastrand::Rng,
    channels: usize,
    format: FrameFormat,
    time: PunchTime,
    next: u32,
}

impl PunchGenerator {
    /// Creates a generator for `channels` inputs. A seed makes the stream
    /// reproducible.
    pub fn new(channels: usize, format: FrameFormat, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Self {
            rng,
            channels: channels.max(1),
            format,
            time: PunchTime::now(),
            next: 0,
        }
    }

    /// Sets the timestamp of the first punch.
    pub fn with_start(mut self, time: PunchTime) -> Self {
        self.time = time;
        self
    }

    /// Builds the next punch on a randomly chosen channel.
    pub fn next_punch(&mut self) -> Punch {
        let channel = self.rng.usize(..self.channels);
        let index = self.next;
        self.next = self.next.wrapping_add(1);
        let bytes = encode_punch(&self.format, channel as u16, index, self.time);
        self.time.advance_millis(self.rng.u32(50..2_000));
        Punch {
            channel,
            index,
            bytes,
        }
    }

    /// Builds `count` punches.
    pub fn generate(&mut self, count: usize) -> Vec<Punch> {
        (0..count).map(|_| self.next_punch()).collect()
    }
}

/// Concatenated input stream per channel.
pub fn channel_streams(punches: &[Punch], channels: usize) -> Vec<Vec<u8>> {
    let mut streams = vec![Vec::new(); channels];
    for punch in punches {
        if let Some(stream) = streams.get_mut(punch.channel) {
            stream.extend(&punch.bytes);
        }
    }
    streams
}

/// Records recovered from the shared line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Complete records, preamble included when present.
    pub records: Vec<Vec<u8>>,
    /// Bytes skipped while looking for a header.
    pub skipped: usize,
    /// Incomplete record at the end of the stream.
    pub trailing: Vec<u8>,
}

/// Splits `stream` into records using the header byte and declared length.
pub fn extract_records(stream: &[u8], format: &FrameFormat) -> Extracted {
    let mut out = Extracted::default();
    let mut i = 0;
    while i < stream.len() {
        let header_at = match format.preamble {
            Some(pre) if stream[i] == pre && stream.get(i + 1) == Some(&format.header) => i + 1,
            _ if stream[i] == format.header => i,
            _ => {
                out.skipped += 1;
                i += 1;
                continue;
            }
        };
        let Some(&declared) = stream.get(header_at + 1) else {
            out.trailing = stream[i..].to_vec();
            break;
        };
        let end = header_at + format.record_len(declared);
        if end > stream.len() {
            out.trailing = stream[i..].to_vec();
            break;
        }
        out.records.push(stream[i..end].to_vec());
        i = end;
    }
    out
}

/// Station code of a record, `None` if the record is too short.
pub fn record_station(record: &[u8], format: &FrameFormat) -> Option<u16> {
    let offset =
        usize::from(format.preamble.is_some() && record.first() == format.preamble.as_ref());
    let cn = record.get(offset + 2..offset + 4)?;
    Some(u16::from_be_bytes([cn[0], cn[1]]))
}

/// Per-channel comparison result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelTally {
    /// Channel index.
    pub channel: usize,
    /// Punches sent on this channel.
    pub sent: usize,
    /// Records received with this station code.
    pub received: usize,
    /// Records identical to the punch sent at the same position.
    pub matched: usize,
}

/// Comparison of stimulus against the shared line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verification {
    /// Punches sent.
    pub sent: usize,
    /// Records received.
    pub received: usize,
    /// Records identical to their stimulus.
    pub matched: usize,
    /// Records that differ from the stimulus at their position.
    pub corrupted: usize,
    /// Punches with no record.
    pub missing: usize,
    /// Records with no punch, including unknown station codes.
    pub unexpected: usize,
    /// Breakdown per channel.
    pub channels: Vec<ChannelTally>,
}

impl Verification {
    /// True if every punch arrived intact and nothing else did.
    pub fn passed(&self) -> bool {
        self.matched == self.sent && self.received == self.sent
    }
}

/// Compares the records from each station with the punches sent on that
/// channel, in order.
pub fn verify(
    punches: &[Punch],
    records: &[Vec<u8>],
    channels: usize,
    format: &FrameFormat,
) -> Verification {
    let mut sent: Vec<Vec<&[u8]>> = vec![Vec::new(); channels];
    for punch in punches {
        if let Some(list) = sent.get_mut(punch.channel) {
            list.push(&punch.bytes);
        }
    }

    let mut received: Vec<Vec<&[u8]>> = vec![Vec::new(); channels];
    let mut result = Verification {
        sent: punches.len(),
        received: records.len(),
        ..Verification::default()
    };
    for record in records {
        match record_station(record, format).map(usize::from) {
            Some(ch) if ch < channels => received[ch].push(record),
            _ => result.unexpected += 1,
        }
    }

    for (channel, (tx, rx)) in sent.iter().zip(&received).enumerate() {
        let matched = tx.iter().zip(rx).filter(|(a, b)| a == b).count();
        let paired = tx.len().min(rx.len());
        result.matched += matched;
        result.corrupted += paired - matched;
        result.missing += tx.len() - paired;
        result.unexpected += rx.len() - paired;
        result.channels.push(ChannelTally {
            channel,
            sent: tx.len(),
            received: rx.len(),
            matched,
        });
    }
    result
}
