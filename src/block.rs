// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A single block's payload and dirty metadata.
//!
//! A block is split into its shape, an optionally-compressed byte payload,
//! and dirty-tracking metadata: a whole-block flag plus a per-axis,
//! per-slice bit vector. The integrity of a decompressed payload is
//! checked against the block's element count; a mismatch is a
//! [`crate::Error::BlockCorrupted`].

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::compression::CompressionType;
use crate::element::Element;
use crate::point::{Point, Region};
use crate::view::{copy_region, iter_points, ArrayView, DenseArray};
use crate::{Error, Result};
use bit_vec::BitVec;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use std::marker::PhantomData;

/// The constant N-tuple giving each block's extents.
///
/// A thin wrapper over [`Point`] enforcing that every component is
/// strictly positive.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct BlockShape<const N: usize>(Point<N>);

impl<const N: usize> BlockShape<N> {
    /// # Panics
    ///
    /// Panics if any component is not strictly positive.
    #[must_use]
    pub fn new(shape: Point<N>) -> Self {
        assert!(shape.all_positive(), "block shape components must be > 0");
        Self(shape)
    }

    #[must_use]
    pub fn point(self) -> Point<N> {
        self.0
    }
}

fn axis_offset<const N: usize>(shape: Point<N>, axis: usize) -> usize {
    (0..axis).map(|i| shape[i] as usize).sum()
}

fn total_slices<const N: usize>(shape: Point<N>) -> usize {
    (0..N).map(|i| shape[i] as usize).sum()
}

fn encode_elements<T: Element>(data: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * T::BYTE_WIDTH);
    for &v in data {
        v.write_le(&mut out);
    }
    out
}

fn decode_elements<T: Element>(bytes: &[u8], count: usize) -> Vec<T> {
    (0..count)
        .map(|i| T::read_le(&bytes[i * T::BYTE_WIDTH..]))
        .collect()
}

/// A block's compressed (or raw) payload plus dirty metadata.
#[derive(Clone, Debug)]
pub struct CompressedBlock<const N: usize, T: Element> {
    shape: Point<N>,
    payload: Vec<u8>,
    is_compressed: bool,
    /// Compressed size in elements of `T`, or 0 meaning "not yet measured".
    compressed_size: u64,
    whole_dirty: bool,
    slice_dirty: BitVec,
    _element: PhantomData<T>,
}

impl<const N: usize, T: Element> CompressedBlock<N, T> {
    /// Builds a block directly from a dense view, raw (uncompressed) and clean.
    #[must_use]
    pub fn new_from(view: ArrayView<'_, N, T>) -> Self {
        let shape = view.shape();
        let data: Vec<T> = iter_points(shape).map(|p| view.get(p)).collect();
        Self {
            shape,
            payload: encode_elements(&data),
            is_compressed: false,
            compressed_size: 0,
            whole_dirty: false,
            slice_dirty: BitVec::from_elem(total_slices(shape), false),
            _element: PhantomData,
        }
    }

    /// Builds an all-zero block, marked whole-block-dirty (it has not yet
    /// been written, so any reader must treat it as needing refresh).
    #[must_use]
    pub fn new_zeroed(shape: BlockShape<N>) -> Self {
        let shape = shape.point();
        let count = shape.product();
        Self {
            shape,
            payload: encode_elements(&vec![T::ZERO; count]),
            is_compressed: false,
            compressed_size: 0,
            whole_dirty: true,
            slice_dirty: BitVec::from_elem(total_slices(shape), true),
            _element: PhantomData,
        }
    }

    #[must_use]
    pub fn shape(&self) -> Point<N> {
        self.shape
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.is_compressed
    }

    /// Compressed size in elements of `T`, or 0 if unmeasured.
    #[must_use]
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Current size of the stored payload, in bytes.
    #[must_use]
    pub fn current_size_bytes(&self) -> usize {
        self.payload.len()
    }

    /// Compresses the payload in place. No-op if already compressed.
    pub fn compress(&mut self, codec: CompressionType) {
        if self.is_compressed {
            return;
        }
        let packed = codec.compress(&self.payload);
        let elements = (packed.len() + T::BYTE_WIDTH - 1) / T::BYTE_WIDTH;
        self.compressed_size = elements as u64;
        self.payload = packed;
        self.is_compressed = true;
    }

    /// Decompresses the payload in place. No-op if already raw.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockCorrupted`] if the decompressed length doesn't
    /// match `∏ shape` elements.
    pub fn uncompress(&mut self, codec: CompressionType) -> Result<()> {
        if !self.is_compressed {
            return Ok(());
        }
        let raw = codec
            .decompress(&self.payload)
            .map_err(|()| self.corrupted_error(0))?;

        let expected = self.shape.product() * T::BYTE_WIDTH;
        if raw.len() != expected {
            return Err(self.corrupted_error(raw.len() / T::BYTE_WIDTH.max(1)));
        }
        self.payload = raw;
        self.is_compressed = false;
        Ok(())
    }

    fn corrupted_error(&self, actual: usize) -> Error {
        Error::BlockCorrupted {
            block_index: vec![],
            expected: self.shape.product(),
            actual,
        }
    }

    fn decode_to_dense(&self, codec: CompressionType) -> Result<DenseArray<N, T>> {
        let raw: std::borrow::Cow<'_, [u8]> = if self.is_compressed {
            let decompressed = codec
                .decompress(&self.payload)
                .map_err(|()| self.corrupted_error(0))?;
            let expected = self.shape.product() * T::BYTE_WIDTH;
            if decompressed.len() != expected {
                return Err(self.corrupted_error(decompressed.len() / T::BYTE_WIDTH.max(1)));
            }
            std::borrow::Cow::Owned(decompressed)
        } else {
            std::borrow::Cow::Borrowed(self.payload.as_slice())
        };
        let count = self.shape.product();
        Ok(DenseArray::from_vec(self.shape, decode_elements(&raw, count)))
    }

    /// Decompresses (if needed) into `out`, without mutating `self`.
    ///
    /// # Panics
    ///
    /// Panics if `out.shape() != self.shape()`.
    pub fn read_into(&self, codec: CompressionType, out: &mut DenseArray<N, T>) -> Result<()> {
        assert_eq!(out.shape().0, self.shape.0, "read_into shape mismatch");
        let dense = self.decode_to_dense(codec)?;
        out.as_mut_slice().copy_from_slice(dense.as_slice());
        Ok(())
    }

    /// Decompresses into the caller-supplied, block-shaped `scratch`
    /// buffer (its prior contents are discarded), then copies the
    /// `within` sub-view out of it.
    ///
    /// # Panics
    ///
    /// Panics if `scratch.shape() != self.shape()` or
    /// `out_view.shape() != within.shape()`.
    pub fn read_sub(
        &self,
        codec: CompressionType,
        within: Region<N>,
        scratch: &mut DenseArray<N, T>,
        out_view: &mut crate::view::ArrayViewMut<'_, N, T>,
    ) -> Result<()> {
        self.read_into(codec, scratch)?;
        assert_eq!(out_view.shape().0, within.shape().0, "read_sub shape mismatch");
        let scratch_view = scratch.view();
        copy_region(&scratch_view, within.p, out_view, Point::zero(), within.shape());
        Ok(())
    }

    /// Overwrites the `within` sub-region with `src`, updating dirty bits
    /// per the cross-section policy (see module docs).
    ///
    /// # Panics
    ///
    /// Panics if `src.shape() != within.shape()`.
    pub fn write_sub(
        &mut self,
        codec: CompressionType,
        within: Region<N>,
        src: ArrayView<'_, N, T>,
    ) -> Result<()> {
        assert_eq!(src.shape().0, within.shape().0, "write_sub shape mismatch");

        let was_compressed = self.is_compressed;
        if was_compressed {
            self.uncompress(codec)?;
        }

        let mut dense = self.decode_to_dense(CompressionType::None)?;
        {
            let mut view_mut = dense.view_mut();
            copy_region(&src, Point::zero(), &mut view_mut, within.p, within.shape());
        }
        self.payload = encode_elements(dense.as_slice());
        self.compressed_size = 0;

        if was_compressed {
            self.compress(codec);
        }

        self.update_dirty_after_write(within);
        Ok(())
    }

    fn update_dirty_after_write(&mut self, within: Region<N>) {
        if within.p.0 == [0i64; N] && within.q.0 == self.shape.0 {
            self.set_dirty(false);
            return;
        }
        self.clear_clean_cross_sections(within);
    }

    fn clear_clean_cross_sections(&mut self, within: Region<N>) {
        for d in 0..N {
            let others_span_full = (0..N).all(|dim| {
                dim == d || (within.p[dim] == 0 && within.q[dim] == self.shape[dim])
            });
            if others_span_full {
                for s in within.p[d]..within.q[d] {
                    self.set_dirty_slice(d, s as usize, false);
                }
            }
        }
        if self.slice_dirty.none() {
            self.whole_dirty = false;
        }
    }

    /// Whole-block dirty predicate.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.whole_dirty
    }

    /// Bulk dirty setter: sets both the whole flag and every slice bit.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.whole_dirty = dirty;
        self.slice_dirty = BitVec::from_elem(total_slices(self.shape), dirty);
    }

    /// Per-slice dirty predicate.
    #[must_use]
    pub fn is_dirty_slice(&self, axis: usize, slice: usize) -> bool {
        self.slice_dirty
            .get(axis_offset(self.shape, axis) + slice)
            .unwrap_or(false)
    }

    /// Per-slice dirty setter.
    ///
    /// Does not touch `whole_dirty` — callers that clear slices are
    /// responsible for re-deriving the whole-block flag afterward (it
    /// only ever clears when every slice on every axis is clean; see
    /// `clear_clean_cross_sections`).
    pub fn set_dirty_slice(&mut self, axis: usize, slice: usize, dirty: bool) {
        let idx = axis_offset(self.shape, axis) + slice;
        self.slice_dirty.set(idx, dirty);
    }

    /// True iff, for every axis, some slice within `within`'s span on that
    /// axis is marked dirty.
    #[must_use]
    pub fn is_dirty_region(&self, within: Region<N>) -> bool {
        (0..N).all(|d| (within.p[d]..within.q[d]).any(|s| self.is_dirty_slice(d, s as usize)))
    }

    /// Sets dirtiness over a sub-region's cross-section.
    ///
    /// `true`: marks every slice in `within`'s span dirty on its axis,
    /// unconditionally. `false`: marks slices clean on axis `d` only when
    /// `within` spans the full block on every other axis (a stack of full
    /// slices on axis `d`) — the same policy `write_sub` uses to retire
    /// dirtiness after a write.
    pub fn set_dirty_region(&mut self, within: Region<N>, dirty: bool) {
        if dirty {
            for d in 0..N {
                for s in within.p[d]..within.q[d] {
                    self.set_dirty_slice(d, s as usize, true);
                }
            }
        } else {
            self.clear_clean_cross_sections(within);
        }
    }

    #[must_use]
    pub(crate) fn slice_dirty_bytes(&self) -> Vec<u8> {
        self.slice_dirty.to_bytes()
    }

    /// True iff any slice, on any axis, is marked dirty. Used by
    /// persistence to decide whether the `ds` sidecar is worth writing at
    /// all (absent means all-clean, per the persisted format).
    #[must_use]
    pub(crate) fn has_any_dirty_slice(&self) -> bool {
        self.slice_dirty.any()
    }

    #[must_use]
    pub(crate) fn raw_payload(&self) -> &[u8] {
        &self.payload
    }

    /// Reconstructs a block from its persisted parts (see `persistence`).
    pub(crate) fn from_parts(
        shape: Point<N>,
        payload: Vec<u8>,
        is_compressed: bool,
        compressed_size: u64,
        whole_dirty: bool,
        slice_dirty_bytes: Option<&[u8]>,
    ) -> Self {
        let slice_dirty = match slice_dirty_bytes {
            Some(bytes) => {
                let mut bv = BitVec::from_bytes(bytes);
                bv.truncate(total_slices(shape));
                bv
            }
            None => BitVec::from_elem(total_slices(shape), false),
        };
        Self {
            shape,
            payload,
            is_compressed,
            compressed_size,
            whole_dirty,
            slice_dirty,
            _element: PhantomData,
        }
    }
}

/// On-disk header fields for one compressed block (see `persistence`).
#[derive(Clone, Debug)]
pub(crate) struct BlockHeader<const N: usize> {
    pub compressed_size: u64,
    pub whole_dirty: bool,
    pub is_compressed: bool,
    pub shape: Point<N>,
    pub slice_dirty: Option<Vec<u8>>,
}

impl<const N: usize> Encode for BlockHeader<N> {
    fn encode_into<W: Write>(&self, writer: &mut W) -> std::result::Result<(), EncodeError> {
        writer.write_u64::<LittleEndian>(self.compressed_size)?;
        writer.write_u8(u8::from(self.whole_dirty))?;
        writer.write_u8(u8::from(self.is_compressed))?;
        for i in 0..N {
            writer.write_u32::<LittleEndian>(self.shape[i] as u32)?;
        }
        match &self.slice_dirty {
            Some(bytes) => {
                writer.write_u8(1)?;
                writer.write_u32::<LittleEndian>(bytes.len() as u32)?;
                writer.write_all(bytes)?;
            }
            None => writer.write_u8(0)?,
        }
        Ok(())
    }
}

impl<const N: usize> Decode for BlockHeader<N> {
    fn decode_from<R: Read>(reader: &mut R) -> std::result::Result<Self, DecodeError> {
        let compressed_size = reader.read_u64::<LittleEndian>()?;
        let whole_dirty = reader.read_u8()? != 0;
        let is_compressed = reader.read_u8()? != 0;
        let mut shape = [0i64; N];
        for slot in &mut shape {
            *slot = i64::from(reader.read_u32::<LittleEndian>()?);
        }
        let has_slice_dirty = reader.read_u8()? != 0;
        let slice_dirty = if has_slice_dirty {
            let len = reader.read_u32::<LittleEndian>()? as usize;
            let mut bytes = vec![0u8; len];
            reader.read_exact(&mut bytes)?;
            Some(bytes)
        } else {
            None
        };
        Ok(Self {
            compressed_size,
            whole_dirty,
            is_compressed,
            shape: Point(shape),
            slice_dirty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::DenseArray;

    fn sample_block() -> CompressedBlock<2, u8> {
        let mut data = DenseArray::<2, u8>::zeros(Point([4, 4]));
        for p in iter_points(Point([4, 4])) {
            data.set(p, (p[0] * 4 + p[1] + 1) as u8);
        }
        CompressedBlock::new_from(data.view())
    }

    #[test]
    fn new_from_is_clean() {
        let b = sample_block();
        assert!(!b.is_dirty());
    }

    #[test]
    fn new_zeroed_is_dirty() {
        let b = CompressedBlock::<2, u8>::new_zeroed(BlockShape::new(Point([4, 4])));
        assert!(b.is_dirty());
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn compress_uncompress_idempotent_and_restores_bytes() {
        let mut b = sample_block();
        let before = b.raw_payload().to_vec();

        b.compress(CompressionType::Lz4);
        assert!(b.is_compressed());
        let size_after_first = b.compressed_size();
        b.compress(CompressionType::Lz4);
        assert_eq!(b.compressed_size(), size_after_first, "compress must be idempotent");

        b.uncompress(CompressionType::Lz4).unwrap();
        assert!(!b.is_compressed());
        assert_eq!(b.raw_payload(), before.as_slice());

        b.uncompress(CompressionType::Lz4).unwrap();
        assert_eq!(b.raw_payload(), before.as_slice());
    }

    #[test]
    fn write_sub_full_block_clears_dirty() {
        let mut b = CompressedBlock::<2, u8>::new_zeroed(BlockShape::new(Point([4, 4])));
        let ones = DenseArray::<2, u8>::from_vec(Point([4, 4]), vec![1; 16]);
        b.write_sub(
            CompressionType::None,
            crate::point::Region::new(Point([0, 0]), Point([4, 4])),
            ones.view(),
        )
        .unwrap();
        assert!(!b.is_dirty());
    }

    #[test]
    fn write_sub_partial_marks_cross_section_clean() {
        let mut b = CompressedBlock::<2, u8>::new_zeroed(BlockShape::new(Point([4, 4])));
        let row = DenseArray::<2, u8>::from_vec(Point([1, 4]), vec![9; 4]);
        b.write_sub(
            CompressionType::None,
            crate::point::Region::new(Point([0, 0]), Point([1, 4])),
            row.view(),
        )
        .unwrap();
        // axis 0, slice 0 is now clean (full span on axis 1)
        assert!(!b.is_dirty_slice(0, 0));
        assert!(b.is_dirty_slice(0, 1));
    }

    #[test]
    fn write_sub_partial_row_does_not_clear_whole_block_dirty_while_other_slices_are_dirty() {
        let mut b = CompressedBlock::<2, u8>::new_zeroed(BlockShape::new(Point([4, 4])));
        let row = DenseArray::<2, u8>::from_vec(Point([1, 4]), vec![9; 4]);
        b.write_sub(
            CompressionType::None,
            crate::point::Region::new(Point([0, 0]), Point([1, 4])),
            row.view(),
        )
        .unwrap();
        // only one of the block's 8 slices (axis 0, slice 0) was retired;
        // axis 0 slices 1-3 and all of axis 1's slices are still dirty, so
        // the whole-block flag must still read dirty.
        assert!(b.is_dirty(), "whole-block dirty must only clear when every slice on every axis is clean");
    }

    #[test]
    fn is_dirty_region_requires_every_axis_to_have_a_dirty_slice() {
        let mut b = CompressedBlock::<2, u8>::new_from(DenseArray::<2, u8>::zeros(Point([4, 4])).view());
        assert!(!b.is_dirty_region(crate::point::Region::new(Point([0, 0]), Point([4, 4]))));
        b.set_dirty_slice(0, 2, true);
        // axis 1 still has no dirty slice at all
        assert!(!b.is_dirty_region(crate::point::Region::new(Point([0, 0]), Point([4, 4]))));
        b.set_dirty_slice(1, 3, true);
        assert!(b.is_dirty_region(crate::point::Region::new(Point([0, 0]), Point([4, 4]))));
    }
}
