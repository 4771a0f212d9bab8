// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Flat, versioned binary persistence for an [`Array`].
//!
//! The on-disk shape mirrors a `Manifest`: magic bytes, a version byte,
//! then fields written in a fixed order via [`Encode`]/[`Decode`]. This is
//! a byte-stream format, not a named-group hierarchy — it round-trips to
//! any `Write`/`Read` (a `File`, a `Vec<u8>`, a `Cursor`), which is all the
//! external-interface surface this crate needs (file-format ownership is
//! an explicit non-goal).
//!
//! Every block record is checksummed with `xxhash-rust`'s xxh3: corruption
//! introduced in transit or at rest is caught on load as
//! [`crate::Error::ChecksumMismatch`] rather than silently producing wrong
//! data.

use crate::array::Array;
use crate::block::{BlockHeader, BlockShape, CompressedBlock};
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::compression::CompressionType;
use crate::element::Element;
use crate::point::{BlockIndex, Point};
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::{Read, Write};

const MAGIC: &[u8; 4] = b"BTAR";
const FORMAT_VERSION: u8 = 1;

fn write_point<const N: usize, W: Write>(p: Point<N>, writer: &mut W) -> std::result::Result<(), EncodeError> {
    for i in 0..N {
        writer.write_i64::<LittleEndian>(p[i])?;
    }
    Ok(())
}

fn read_point<const N: usize, R: Read>(reader: &mut R) -> std::result::Result<Point<N>, DecodeError> {
    let mut out = [0i64; N];
    for slot in &mut out {
        *slot = reader.read_i64::<LittleEndian>()?;
    }
    Ok(Point(out))
}

/// Writes `array` to `writer` as a single framed record.
///
/// # Errors
///
/// Returns `Err` if the writer fails.
pub fn save<const N: usize, T: Element, W: Write>(array: &Array<N, T>, writer: &mut W) -> Result<()> {
    log::debug!("persistence: writing {} block(s)", array.num_blocks());
    writer.write_all(MAGIC)?;
    writer.write_u8(FORMAT_VERSION)?;
    writer.write_u32::<LittleEndian>(N as u32)?;
    writer.write_u8(T::TYPE_TAG)?;

    write_point(array.block_shape(), writer)?;

    let (delete_empty, compression_enabled, compression, min_max_tracking, manage_coordinate_lists) =
        array.options();
    writer.write_u8(u8::from(delete_empty))?;
    writer.write_u8(u8::from(compression_enabled))?;
    compression.encode_into(writer)?;
    writer.write_u8(u8::from(min_max_tracking))?;
    writer.write_u8(u8::from(manage_coordinate_lists))?;

    let blocks = array.blocks_map();
    writer.write_u64::<LittleEndian>(blocks.len() as u64)?;
    for (idx, block) in blocks {
        write_point(*idx, writer)?;

        let slice_dirty = if block.is_dirty() || block.has_any_dirty_slice() {
            Some(block.slice_dirty_bytes())
        } else {
            None
        };
        let header = BlockHeader::<N> {
            compressed_size: block.compressed_size(),
            whole_dirty: block.is_dirty(),
            is_compressed: block.is_compressed(),
            shape: block.shape(),
            slice_dirty,
        };
        header.encode_into(writer)?;

        let payload = block.raw_payload();
        writer.write_u64::<LittleEndian>(payload.len() as u64)?;
        writer.write_all(payload)?;
        let checksum = xxhash_rust::xxh3::xxh3_64(payload);
        writer.write_u64::<LittleEndian>(checksum)?;
    }

    let min_max = array.min_max_map();
    writer.write_u64::<LittleEndian>(min_max.len() as u64)?;
    for (idx, (lo, hi)) in min_max {
        write_point(*idx, writer)?;
        let mut lo_bytes = Vec::with_capacity(T::BYTE_WIDTH);
        lo.write_le(&mut lo_bytes);
        writer.write_all(&lo_bytes)?;
        let mut hi_bytes = Vec::with_capacity(T::BYTE_WIDTH);
        hi.write_le(&mut hi_bytes);
        writer.write_all(&hi_bytes)?;
    }

    let nonzero = array.nonzero_map();
    writer.write_u64::<LittleEndian>(nonzero.len() as u64)?;
    for (idx, (positions, values)) in nonzero {
        write_point(*idx, writer)?;
        writer.write_u64::<LittleEndian>(positions.len() as u64)?;
        for p in positions {
            write_point(*p, writer)?;
        }
        for v in values {
            let mut bytes = Vec::with_capacity(T::BYTE_WIDTH);
            v.write_le(&mut bytes);
            writer.write_all(&bytes)?;
        }
    }

    Ok(())
}

/// Reads an [`Array`] back from `reader`.
///
/// # Errors
///
/// Returns [`Error::PersistenceError`] if the header is malformed or the
/// dimension/element type tag doesn't match `N`/`T`, and
/// [`Error::ChecksumMismatch`] if a block's stored checksum doesn't match
/// its payload bytes.
pub fn load<const N: usize, T: Element, R: Read>(reader: &mut R) -> Result<Array<N, T>> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(Error::PersistenceError("bad magic bytes".into()));
    }
    let version = reader.read_u8()?;
    if version != FORMAT_VERSION {
        return Err(Error::PersistenceError(format!(
            "unsupported format version {version}"
        )));
    }

    let dims = reader.read_u32::<LittleEndian>()? as usize;
    if dims != N {
        return Err(DecodeError::DimensionMismatch { expected: N, got: dims }.into());
    }
    let type_tag = reader.read_u8()?;
    if type_tag != T::TYPE_TAG {
        return Err(Error::PersistenceError(format!(
            "element type tag mismatch: record has {type_tag}, expected {}",
            T::TYPE_TAG
        )));
    }

    let block_shape_point = read_point::<N, R>(reader)?;
    let block_shape = BlockShape::new(block_shape_point);

    let delete_empty = reader.read_u8()? != 0;
    let compression_enabled = reader.read_u8()? != 0;
    let compression = CompressionType::decode_from(reader)?;
    let min_max_tracking = reader.read_u8()? != 0;
    let manage_coordinate_lists = reader.read_u8()? != 0;

    let num_blocks = reader.read_u64::<LittleEndian>()? as usize;
    log::debug!("persistence: reading {num_blocks} block(s)");
    let mut blocks = BTreeMap::new();
    for _ in 0..num_blocks {
        let idx: BlockIndex<N> = read_point(reader)?;
        let header = BlockHeader::<N>::decode_from(reader)?;

        let payload_len = reader.read_u64::<LittleEndian>()? as usize;
        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload)?;
        let expected_checksum = reader.read_u64::<LittleEndian>()?;
        let actual_checksum = xxhash_rust::xxh3::xxh3_64(&payload);
        if actual_checksum != expected_checksum {
            return Err(Error::ChecksumMismatch {
                expected: expected_checksum,
                got: actual_checksum,
            });
        }

        let block = CompressedBlock::<N, T>::from_parts(
            header.shape,
            payload,
            header.is_compressed,
            header.compressed_size,
            header.whole_dirty,
            header.slice_dirty.as_deref(),
        );
        blocks.insert(idx, block);
    }

    let num_min_max = reader.read_u64::<LittleEndian>()? as usize;
    let mut min_max = BTreeMap::new();
    for _ in 0..num_min_max {
        let idx: BlockIndex<N> = read_point(reader)?;
        let mut lo_bytes = vec![0u8; T::BYTE_WIDTH];
        reader.read_exact(&mut lo_bytes)?;
        let mut hi_bytes = vec![0u8; T::BYTE_WIDTH];
        reader.read_exact(&mut hi_bytes)?;
        min_max.insert(idx, (T::read_le(&lo_bytes), T::read_le(&hi_bytes)));
    }

    let num_nonzero_blocks = reader.read_u64::<LittleEndian>()? as usize;
    let mut nonzero = BTreeMap::new();
    for _ in 0..num_nonzero_blocks {
        let idx: BlockIndex<N> = read_point(reader)?;
        let count = reader.read_u64::<LittleEndian>()? as usize;
        let mut positions = Vec::with_capacity(count);
        for _ in 0..count {
            positions.push(read_point::<N, R>(reader)?);
        }
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let mut bytes = vec![0u8; T::BYTE_WIDTH];
            reader.read_exact(&mut bytes)?;
            values.push(T::read_le(&bytes));
        }
        nonzero.insert(idx, (positions, values));
    }

    Ok(Array::from_raw_parts(
        block_shape,
        blocks,
        min_max,
        nonzero,
        delete_empty,
        compression_enabled,
        compression,
        min_max_tracking,
        manage_coordinate_lists,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;

    fn sample_array() -> Array<2, u8> {
        let mut a = crate::config::ArrayConfig::<2>::new(Point([4, 4]))
            .min_max_tracking(true)
            .build::<u8>();
        a.write_point(Point([1, 1]), 7).unwrap();
        a.write_point(Point([9, 9]), 3).unwrap();
        a
    }

    #[test]
    fn save_and_load_roundtrips_block_contents() {
        let mut array = sample_array();
        let mut buf = Vec::new();
        save(&array, &mut buf).unwrap();

        let mut loaded: Array<2, u8> = load(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded.num_blocks(), array.num_blocks());
        assert_eq!(loaded.read_point(Point([1, 1])).unwrap(), array.read_point(Point([1, 1])).unwrap());
        assert_eq!(loaded.read_point(Point([9, 9])).unwrap(), array.read_point(Point([9, 9])).unwrap());
        assert_eq!(loaded.min_max(), array.min_max());
    }

    #[test]
    fn clean_block_omits_the_slice_dirty_sidecar() {
        let mut a = crate::config::ArrayConfig::<2>::new(Point([4, 4])).build::<u8>();
        let full = crate::view::DenseArray::<2, u8>::from_vec(Point([4, 4]), vec![5; 16]);
        a.write_region(Point([0, 0]), Point([4, 4]), full.view()).unwrap();
        assert!(!a.blocks_map().values().next().unwrap().is_dirty());

        let mut buf = Vec::new();
        save(&a, &mut buf).unwrap();

        // prefix (39 bytes up to and including the block count) + this
        // block's index (16 bytes) + the header's pre-tag fields
        // (compressed_size 8 + whole_dirty 1 + is_compressed 1 + shape 8 = 18)
        // lands right on the `ds`-present tag byte.
        let tag_offset = 39 + 16 + 18;
        assert_eq!(buf[tag_offset], 0, "an all-clean block must not carry a slice-dirty sidecar");

        let mut loaded: Array<2, u8> = load(&mut buf.as_slice()).unwrap();
        assert!(!loaded.blocks_map().values().next().unwrap().is_dirty());
        assert_eq!(loaded.read_point(Point([0, 0])).unwrap(), 5);
    }

    #[test]
    fn load_rejects_bad_magic() {
        let buf = vec![0u8; 16];
        let result: Result<Array<2, u8>> = load(&mut buf.as_slice());
        assert!(matches!(result, Err(Error::PersistenceError(_))));
    }

    #[test]
    fn load_detects_checksum_mismatch() {
        let array = sample_array();
        let mut buf = Vec::new();
        save(&array, &mut buf).unwrap();

        // Flip the first byte of the first block's payload: prefix (39
        // bytes up to and including the block count) + that block's index
        // (16 bytes) + header (24 bytes) + payload-length field (8 bytes).
        let corrupt_at = 39 + 16 + 24 + 8;
        buf[corrupt_at] ^= 0xff;

        let result: Result<Array<2, u8>> = load(&mut buf.as_slice());
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn load_rejects_dimension_mismatch() {
        let array = crate::config::ArrayConfig::<3>::new(Point([2, 2, 2])).build::<u8>();
        let mut buf = Vec::new();
        save(&array, &mut buf).unwrap();
        let result: Result<Array<2, u8>> = load(&mut buf.as_slice());
        assert!(matches!(result, Err(Error::Decode(DecodeError::DimensionMismatch { .. }))));
    }
}
