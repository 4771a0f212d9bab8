// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The element-type boundary.
//!
//! Per the monomorphisation guidance for this engine, the block and array
//! types are generic over a concrete element type rather than over a
//! runtime-dispatched "any dtype" value. [`Element`] is implemented for the
//! element types actually used by deployments of this engine: `u8`, `u32`,
//! `f32`.

/// A fixed-width numeric element type a block can hold.
///
/// Sealed: only the types this crate implements it for (`u8`, `u32`,
/// `f32`) are valid block elements, since the persisted format hard-codes
/// a byte width per type tag.
pub trait Element: Copy + Clone + std::fmt::Debug + Default + PartialOrd + Send + Sync + 'static {
    /// The additive identity; blocks are "all-zero" iff every element equals this.
    const ZERO: Self;

    /// Fixed on-disk/in-memory byte width of one element.
    const BYTE_WIDTH: usize;

    /// A type tag written into persisted records, used to catch attempts
    /// to load a record into an `Array<N, T>` with the wrong `T`.
    const TYPE_TAG: u8;

    /// Sentinel low value used as the seed for an empty min/max fold.
    const TYPE_MIN: Self;

    /// Sentinel high value used as the seed for an empty min/max fold.
    const TYPE_MAX: Self;

    /// Appends this element's little-endian bytes to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Reads one element from the front of `bytes` (which must have at
    /// least `BYTE_WIDTH` bytes).
    fn read_le(bytes: &[u8]) -> Self;

    /// Interprets this element as a relabeling-table index.
    ///
    /// Meaningful for the integer element types this engine relabels in
    /// practice (`u8`, `u32`); `f32` values are rounded to the nearest
    /// non-negative integer.
    fn as_index(self) -> usize;
}

impl Element for u8 {
    const ZERO: Self = 0;
    const BYTE_WIDTH: usize = 1;
    const TYPE_TAG: u8 = 0;
    const TYPE_MIN: Self = u8::MIN;
    const TYPE_MAX: Self = u8::MAX;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn as_index(self) -> usize {
        self as usize
    }
}

impl Element for u32 {
    const ZERO: Self = 0;
    const BYTE_WIDTH: usize = 4;
    const TYPE_TAG: u8 = 1;
    const TYPE_MIN: Self = u32::MIN;
    const TYPE_MAX: Self = u32::MAX;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        Self::from_le_bytes(buf)
    }

    fn as_index(self) -> usize {
        self as usize
    }
}

impl Element for f32 {
    const ZERO: Self = 0.0;
    const BYTE_WIDTH: usize = 4;
    const TYPE_TAG: u8 = 2;
    const TYPE_MIN: Self = f32::MIN;
    const TYPE_MAX: Self = f32::MAX;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        Self::from_le_bytes(buf)
    }

    fn as_index(self) -> usize {
        self.round().max(0.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_u8() {
        let mut buf = vec![];
        42u8.write_le(&mut buf);
        assert_eq!(u8::read_le(&buf), 42);
    }

    #[test]
    fn roundtrip_u32() {
        let mut buf = vec![];
        12345u32.write_le(&mut buf);
        assert_eq!(u32::read_le(&buf), 12345);
    }

    #[test]
    fn roundtrip_f32() {
        let mut buf = vec![];
        1.5f32.write_le(&mut buf);
        assert!((f32::read_le(&buf) - 1.5).abs() < f32::EPSILON);
    }
}
