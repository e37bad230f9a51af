//! Byte-plane interleaving, zigzag and running-delta transforms.
//!
//! Integer columns in the container are stored with their bytes transposed: all
//! elements' byte 0 first, then all byte 1, and so on. Signed values are zigzag
//! mapped first and identifier lists are additionally delta coded, which together
//! turn runs of nearby ids into long stretches of zero bytes that LZ4 compresses well.
//!
//! All functions here are pure. The composite readers at the bottom combine them
//! with a [`ByteReader`] into the layouts the chunk parsers need.

use crate::io::{ByteReader, ByteWriter};

/// Restores natural element order from a byte-plane interleaved buffer.
///
/// For `count = data.len() / size` elements, output byte `j * size + i` is input
/// byte `i * count + j`. Trailing bytes that do not form a whole element are dropped.
pub fn deinterleave(data: &[u8], size: usize) -> Vec<u8> {
    if size == 0 {
        return Vec::new();
    }
    let count = data.len() / size;
    let mut out = vec![0u8; count * size];
    for (i, plane) in data.chunks_exact(count.max(1)).take(size).enumerate() {
        for (j, &byte) in plane.iter().enumerate().take(count) {
            out[j * size + i] = byte;
        }
    }
    out
}

/// Transposes naturally ordered elements into byte planes. Inverse of [`deinterleave`].
pub fn interleave(data: &[u8], size: usize) -> Vec<u8> {
    if size == 0 {
        return Vec::new();
    }
    let count = data.len() / size;
    let mut out = vec![0u8; count * size];
    for (j, element) in data.chunks_exact(size).enumerate() {
        for (i, &byte) in element.iter().enumerate() {
            out[i * count + j] = byte;
        }
    }
    out
}

/// Maps a signed value to the unsigned wire form: `(v << 1) ^ (v >> 31)`.
pub fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode`]: `(v >> 1) ^ -(v & 1)`.
pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// 64-bit zigzag, used by `int64` columns.
pub fn zigzag_encode64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode64`].
pub fn zigzag_decode64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Prefix-sums a delta sequence back to absolute values. Arithmetic wraps like the
/// 32-bit integers on the wire.
pub fn delta_decode(deltas: &[i32]) -> Vec<i32> {
    let mut acc = 0i32;
    deltas
        .iter()
        .map(|&d| {
            acc = acc.wrapping_add(d);
            acc
        })
        .collect()
}

/// Turns absolute values into first-absolute-then-differences.
pub fn delta_encode(values: &[i32]) -> Vec<i32> {
    let mut prev = 0i32;
    values
        .iter()
        .map(|&v| {
            let d = v.wrapping_sub(prev);
            prev = v;
            d
        })
        .collect()
}

/// Reads `count` interleaved big-endian `u32` words without further transform.
///
/// Fewer than `count` words are returned if the buffer runs out; callers check the
/// length against their declared count.
pub fn read_interleaved_u32(reader: &mut ByteReader<'_>, count: usize) -> Vec<u32> {
    let raw = reader.read_up_to(count.saturating_mul(4));
    deinterleave(raw, 4)
        .chunks_exact(4)
        .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
        .collect()
}

/// Reads `count` interleaved zigzag-coded `i32` values (no delta step).
pub fn read_interleaved_i32(reader: &mut ByteReader<'_>, count: usize) -> Vec<i32> {
    read_interleaved_u32(reader, count)
        .into_iter()
        .map(zigzag_decode)
        .collect()
}

/// The composite referent-list decode: interleaved, zigzag, then prefix-summed.
pub fn read_referent_ints(reader: &mut ByteReader<'_>, count: usize) -> Vec<i32> {
    delta_decode(&read_interleaved_i32(reader, count))
}

/// Writes words as interleaved big-endian `u32`.
pub fn write_interleaved_u32(writer: &mut ByteWriter, values: &[u32]) {
    let mut natural = Vec::with_capacity(values.len() * 4);
    for v in values {
        natural.extend_from_slice(&v.to_be_bytes());
    }
    writer.write_bytes(&interleave(&natural, 4));
}

/// Writes zigzag-coded interleaved `i32` values.
pub fn write_interleaved_i32(writer: &mut ByteWriter, values: &[i32]) {
    let words: Vec<u32> = values.iter().copied().map(zigzag_encode).collect();
    write_interleaved_u32(writer, &words);
}

/// Mirror of [`read_referent_ints`].
pub fn write_referent_ints(writer: &mut ByteWriter, values: &[i32]) {
    write_interleaved_i32(writer, &delta_encode(values));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deinterleave_matches_reference_layout() {
        let input = [
            0xA0, 0xB0, 0xC0, 0xD0, 0xA1, 0xB1, 0xC1, 0xD1, 0xA2, 0xB2, 0xC2, 0xD2, 0xA3, 0xB3,
            0xC3, 0xD3,
        ];
        let expected = [
            0xA0, 0xA1, 0xA2, 0xA3, 0xB0, 0xB1, 0xB2, 0xB3, 0xC0, 0xC1, 0xC2, 0xC3, 0xD0, 0xD1,
            0xD2, 0xD3,
        ];
        assert_eq!(deinterleave(&input, 4), expected);
    }

    #[test]
    fn interleave_inverts_deinterleave() {
        let data: Vec<u8> = (0..48u8).collect();
        for size in [1, 2, 3, 4, 6, 8, 12] {
            assert_eq!(interleave(&deinterleave(&data, size), size), data, "size {size}");
            assert_eq!(deinterleave(&interleave(&data, size), size), data, "size {size}");
        }
    }

    #[test]
    fn non_square_layout() {
        // Three 2-byte elements: planes [a0 b0 c0] [a1 b1 c1].
        assert_eq!(deinterleave(&[1, 2, 3, 4, 5, 6], 2), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn zigzag_round_trips_extremes() {
        for v in [0, 1, -1, 2, -2, 1000, -1000, i32::MAX, i32::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        for v in [0i64, -1, i64::MAX, i64::MIN, 123_456_789_012] {
            assert_eq!(zigzag_decode64(zigzag_encode64(v)), v);
        }
    }

    #[test]
    fn delta_round_trips() {
        let values = [5, 6, 7, 3, -1, i32::MAX, i32::MIN, 0];
        assert_eq!(delta_encode(&values)[..3], [5, 1, 1]);
        assert_eq!(delta_decode(&delta_encode(&values)), values);
    }

    #[test]
    fn referent_list_round_trip_through_wire() {
        let referents = [0, 1, 2, 10, 9, -1];
        let mut w = ByteWriter::new();
        write_referent_ints(&mut w, &referents);
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), referents.len() * 4);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(read_referent_ints(&mut r, referents.len()), referents);
        assert!(r.is_empty());
    }

    #[test]
    fn short_block_yields_fewer_words() {
        let mut w = ByteWriter::new();
        write_referent_ints(&mut w, &[1, 2]);
        let bytes = w.into_inner();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(read_referent_ints(&mut r, 3).len(), 2);
    }
}
