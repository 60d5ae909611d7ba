//! Record header layout and the preamble word.
//!
//! Every record in the ring starts with a fixed 40-byte header followed by up
//! to [`MAX_DATA`] bytes of text. The whole record is padded to a multiple of
//! four so the next record's preamble never straddles the physical end of
//! the ring.
//!
//! # Wire Layout (little-endian)
//!
//! ```text
//! ┌──────────┬─────────┬──────────┬───────┬───────────┬───────┬───────┬──────────┬──────────────┐
//! │ preamble │ datalen │ severity │ flags │ timestamp │  pid  │  tid  │ sequence │ data + pad   │
//! │   (4B)   │  (2B)   │   (1B)   │ (1B)  │   (8B)    │ (8B)  │ (8B)  │   (8B)   │ align4(len)  │
//! └──────────┴─────────┴──────────┴───────┴───────────┴───────┴───────┴──────────┴──────────────┘
//! ```
//!
//! # Preamble Word
//!
//! ```text
//!  31        24 23             12 11              0
//! ┌────────────┬─────────────────┬─────────────────┐
//! │  reserved  │    read_len     │    fifo_len     │
//! └────────────┴─────────────────┴─────────────────┘
//! ```
//!
//! `fifo_len` is the space the record occupies in the ring (header + padded
//! payload), `read_len` is the number of meaningful bytes a reader copies out
//! (header + unpadded payload).

/// Size of the fixed record header in bytes.
pub const HEADER_SIZE: usize = 40;

/// Maximum number of payload bytes kept per record. Longer text is truncated.
pub const MAX_DATA: usize = 224;

/// Largest possible record image (header plus a full payload).
pub const MAX_RECORD: usize = HEADER_SIZE + MAX_DATA;

const LEN_MASK: u32 = 0xFFF;
const READ_LEN_SHIFT: u32 = 12;

const _: () = assert!(MAX_RECORD % 4 == 0);
const _: () = assert!(MAX_RECORD as u32 <= LEN_MASK);

/// Rounds `len` up to the next multiple of four.
#[inline(always)]
pub const fn align4(len: usize) -> usize {
    (len + 3) & !3
}

/// Space a record with a `len`-byte payload occupies in the ring.
#[inline(always)]
pub const fn wire_size(len: usize) -> usize {
    HEADER_SIZE + align4(len)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record image is {len} bytes, shorter than the 40-byte header")]
    ShortHeader { len: usize },

    #[error("record claims {datalen} payload bytes but only {available} are present")]
    ShortPayload { datalen: usize, available: usize },

    #[error("record payload length {0} exceeds the maximum of 224")]
    Oversized(usize),
}

/// The framing word at the start of every record.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Preamble(pub u32);

impl Preamble {
    /// Packs the ring footprint and the readable length of a record.
    #[inline(always)]
    pub const fn new(fifo_len: usize, read_len: usize) -> Self {
        Self((((read_len as u32) & LEN_MASK) << READ_LEN_SHIFT) | ((fifo_len as u32) & LEN_MASK))
    }

    /// Preamble for a record carrying `datalen` payload bytes.
    #[inline(always)]
    pub const fn for_payload(datalen: usize) -> Self {
        Self::new(wire_size(datalen), HEADER_SIZE + datalen)
    }

    /// Bytes the record occupies in the ring, padding included.
    #[inline(always)]
    pub const fn fifo_len(self) -> usize {
        (self.0 & LEN_MASK) as usize
    }

    /// Bytes a reader copies out of the ring for this record.
    #[inline(always)]
    pub const fn read_len(self) -> usize {
        ((self.0 >> READ_LEN_SHIFT) & LEN_MASK) as usize
    }
}

/// Fixed header preceding each record's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RecordHeader {
    pub preamble: u32,
    pub datalen: u16,
    pub severity: u8,
    pub flags: u8,
    /// Nanoseconds since the log was brought up.
    pub timestamp: u64,
    pub pid: u64,
    pub tid: u64,
    pub sequence: u64,
}

impl RecordHeader {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.preamble.to_le_bytes());
        out[4..6].copy_from_slice(&self.datalen.to_le_bytes());
        out[6] = self.severity;
        out[7] = self.flags;
        out[8..16].copy_from_slice(&self.timestamp.to_le_bytes());
        out[16..24].copy_from_slice(&self.pid.to_le_bytes());
        out[24..32].copy_from_slice(&self.tid.to_le_bytes());
        out[32..40].copy_from_slice(&self.sequence.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let u64_at = |at: usize| {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(word)
        };
        Self {
            preamble: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            datalen: u16::from_le_bytes([bytes[4], bytes[5]]),
            severity: bytes[6],
            flags: bytes[7],
            timestamp: u64_at(8),
            pid: u64_at(16),
            tid: u64_at(24),
            sequence: u64_at(32),
        }
    }
}

/// A logical record as handed to consumers.
#[derive(Clone, Debug)]
pub struct Record {
    pub header: RecordHeader,
    data: [u8; MAX_DATA],
}

impl Default for Record {
    fn default() -> Self {
        Self {
            header: RecordHeader::default(),
            data: [0u8; MAX_DATA],
        }
    }
}

impl Record {
    /// Builds a record from a copied-out record image.
    ///
    /// The preamble is an artifact of the ring framing, so it is cleared.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let mut record = Self::default();
        record.fill_from(bytes)?;
        Ok(record)
    }

    /// Same as [`Record::from_bytes`] but reuses `self` as the destination.
    pub fn fill_from(&mut self, bytes: &[u8]) -> Result<(), RecordError> {
        let head: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or(RecordError::ShortHeader { len: bytes.len() })?;
        let mut header = RecordHeader::decode(head);
        header.preamble = 0;

        let datalen = header.datalen as usize;
        if datalen > MAX_DATA {
            return Err(RecordError::Oversized(datalen));
        }
        let available = bytes.len() - HEADER_SIZE;
        if available < datalen {
            return Err(RecordError::ShortPayload { datalen, available });
        }

        self.header = header;
        self.data[..datalen].copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + datalen]);
        Ok(())
    }

    /// The meaningful payload bytes.
    #[inline]
    pub fn text(&self) -> &[u8] {
        &self.data[..self.header.datalen as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_packs_both_lengths() {
        let p = Preamble::for_payload(5);
        assert_eq!(p.fifo_len(), 48);
        assert_eq!(p.read_len(), 45);
        assert_eq!(p.0 >> 24, 0, "reserved bits must stay clear");
    }

    #[test]
    fn largest_record_fits_in_twelve_bits() {
        let p = Preamble::for_payload(MAX_DATA);
        assert_eq!(p.fifo_len(), MAX_RECORD);
        assert_eq!(p.read_len(), MAX_RECORD);
    }

    #[test]
    fn wire_size_is_word_aligned() {
        for len in 0..=MAX_DATA {
            let size = wire_size(len);
            assert_eq!(size % 4, 0);
            assert!(size >= HEADER_SIZE + len && size < HEADER_SIZE + len + 4);
        }
    }

    #[test]
    fn header_layout_is_stable() {
        let hdr = RecordHeader {
            preamble: 0x0102_0304,
            datalen: 0x0506,
            severity: 0x07,
            flags: 0x08,
            timestamp: 0x1111,
            pid: 0x2222,
            tid: 0x3333,
            sequence: 0x4444,
        };
        let bytes = hdr.encode();
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..6], &[0x06, 0x05]);
        assert_eq!(bytes[6], 0x07);
        assert_eq!(bytes[7], 0x08);
        assert_eq!(&bytes[32..34], &[0x44, 0x44]);
        assert_eq!(RecordHeader::decode(&bytes), hdr);
    }

    #[test]
    fn from_bytes_clears_preamble_and_keeps_text() {
        let hdr = RecordHeader {
            preamble: Preamble::for_payload(3).0,
            datalen: 3,
            sequence: 9,
            ..Default::default()
        };
        let mut image = hdr.encode().to_vec();
        image.extend_from_slice(b"abc");

        let rec = Record::from_bytes(&image).unwrap();
        assert_eq!(rec.header.preamble, 0);
        assert_eq!(rec.header.sequence, 9);
        assert_eq!(rec.text(), b"abc");
    }

    #[test]
    fn from_bytes_rejects_truncated_images() {
        assert_eq!(
            Record::from_bytes(&[0u8; 10]).unwrap_err(),
            RecordError::ShortHeader { len: 10 }
        );

        let hdr = RecordHeader {
            datalen: 8,
            ..Default::default()
        };
        let mut image = hdr.encode().to_vec();
        image.extend_from_slice(b"abc");
        assert_eq!(
            Record::from_bytes(&image).unwrap_err(),
            RecordError::ShortPayload {
                datalen: 8,
                available: 3
            }
        );
    }
}
