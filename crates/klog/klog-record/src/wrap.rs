//! Copying records in and out of a wraparound byte ring.
//!
//! All helpers take the ring as a plain slice plus a physical offset. The
//! caller owns the lock and the head/tail arithmetic; these functions only
//! know how to split a copy at the physical end of the slice.

use crate::header::{HEADER_SIZE, Preamble};

/// Where the physical end of the ring fell while writing a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapCase {
    /// Header and payload fit before the end.
    Contiguous,
    /// The end falls inside the header.
    InHeader,
    /// The end falls inside the payload.
    InPayload,
}

/// Reads the preamble word of the record starting at `offset`.
///
/// Records are 4-byte aligned and the ring size is a multiple of four, so the
/// word is always fully in bounds.
#[inline(always)]
pub fn peek_preamble(ring: &[u8], offset: usize) -> Preamble {
    debug_assert_eq!(offset % 4, 0, "records are word aligned");
    let word = [
        ring[offset],
        ring[offset + 1],
        ring[offset + 2],
        ring[offset + 3],
    ];
    Preamble(u32::from_le_bytes(word))
}

/// Writes an encoded header followed by its payload at `offset`.
pub fn write_wrapped(
    ring: &mut [u8],
    offset: usize,
    header: &[u8; HEADER_SIZE],
    payload: &[u8],
) -> WrapCase {
    let len = payload.len();
    debug_assert!(HEADER_SIZE + len <= ring.len());
    let fifospace = ring.len() - offset;

    if fifospace >= HEADER_SIZE + len {
        ring[offset..offset + HEADER_SIZE].copy_from_slice(header);
        ring[offset + HEADER_SIZE..offset + HEADER_SIZE + len].copy_from_slice(payload);
        WrapCase::Contiguous
    } else if fifospace < HEADER_SIZE {
        let (before, after) = header.split_at(fifospace);
        ring[offset..].copy_from_slice(before);
        ring[..after.len()].copy_from_slice(after);
        ring[after.len()..after.len() + len].copy_from_slice(payload);
        WrapCase::InHeader
    } else {
        ring[offset..offset + HEADER_SIZE].copy_from_slice(header);
        let (before, after) = payload.split_at(fifospace - HEADER_SIZE);
        ring[offset + HEADER_SIZE..].copy_from_slice(before);
        ring[..after.len()].copy_from_slice(after);
        WrapCase::InPayload
    }
}

/// Fills `out` with the bytes starting at `offset`, continuing at the start
/// of the ring if the record wraps.
pub fn read_wrapped(ring: &[u8], offset: usize, out: &mut [u8]) {
    let fifospace = ring.len() - offset;
    if fifospace >= out.len() {
        out.copy_from_slice(&ring[offset..offset + out.len()]);
    } else {
        let (before, after) = out.split_at_mut(fifospace);
        before.copy_from_slice(&ring[offset..]);
        after.copy_from_slice(&ring[..after.len()]);
    }
}
