// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The block-partitioned array itself.
//!
//! [`Array<N, T>`] owns a [`BlockShape`], a `BTreeMap` of present blocks
//! keyed by block index, and the two auxiliary caches (`min_max`,
//! `nonzero`) described in [`crate::cache`]. Every public operation that
//! touches more than one block decomposes the caller's region into
//! per-block work with [`crate::coords::traverse`] and drives the
//! corresponding [`CompressedBlock`] methods; every mutating operation
//! finishes by invoking [`Array::rederive_block`], which implements the
//! re-derivation policy: delete-if-empty first, else refresh whichever
//! one of the min/max or nonzero cache is enabled (never both from the
//! same write — see that method's docs).

use crate::block::{BlockShape, CompressedBlock};
use crate::cache::{scan_min_max, scan_nonzero};
use crate::compression::CompressionType;
use crate::config::ArrayConfig;
use crate::coords::{block_bounds, block_index_low, enumerate_blocks, traverse};
use crate::element::Element;
use crate::point::{BlockIndex, Point, Region};
use crate::view::{copy_region, iter_points, ArrayView, ArrayViewMut, DenseArray};
use crate::{Error, Result};
use std::cell::Cell;
use std::collections::BTreeMap;

/// Guards the scratch buffer against reentrant use for the duration of a
/// top-level operation. The engine is single-threaded and synchronous, so
/// in practice this can only fire if a caller somehow re-enters the same
/// `Array` from inside a callback of one of its own operations — there is
/// no such callback surface today, but the guard is cheap and documents
/// the discipline rather than relying on it being structurally impossible.
struct ScratchGuard<'a> {
    busy: &'a Cell<bool>,
}

impl<'a> ScratchGuard<'a> {
    fn acquire(busy: &'a Cell<bool>) -> Result<Self> {
        if busy.replace(true) {
            return Err(Error::ScratchBufferBusy);
        }
        Ok(Self { busy })
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

/// An out-of-core, block-partitioned N-dimensional array of `T`.
///
/// Unwritten space reads as `T::ZERO` everywhere; only blocks that have
/// been touched occupy memory. See the crate documentation for the full
/// operation list.
pub struct Array<const N: usize, T: Element> {
    block_shape: BlockShape<N>,
    blocks: BTreeMap<BlockIndex<N>, CompressedBlock<N, T>>,
    min_max: BTreeMap<BlockIndex<N>, (T, T)>,
    nonzero: BTreeMap<BlockIndex<N>, (Vec<Point<N>>, Vec<T>)>,
    delete_empty: bool,
    compression_enabled: bool,
    compression: CompressionType,
    min_max_tracking: bool,
    manage_coordinate_lists: bool,
    scratch: DenseArray<N, T>,
    scratch_busy: Cell<bool>,
}

impl<const N: usize, T: Element> Array<N, T> {
    /// Builds an array with default options (no compression, no caches).
    /// Use [`ArrayConfig`] to turn on specific behavior.
    #[must_use]
    pub fn new(block_shape: Point<N>) -> Self {
        ArrayConfig::new(block_shape).build()
    }

    pub(crate) fn from_config(cfg: ArrayConfig<N>) -> Self {
        let block_shape = BlockShape::new(cfg.block_shape);
        Self {
            scratch: DenseArray::zeros(block_shape.point()),
            scratch_busy: Cell::new(false),
            block_shape,
            blocks: BTreeMap::new(),
            min_max: BTreeMap::new(),
            nonzero: BTreeMap::new(),
            delete_empty: cfg.delete_empty_blocks,
            compression_enabled: cfg.compression_enabled,
            compression: cfg.compression,
            min_max_tracking: cfg.min_max_tracking,
            manage_coordinate_lists: cfg.manage_coordinate_lists,
        }
    }

    /// The block shape this array was constructed with.
    #[must_use]
    pub fn block_shape(&self) -> Point<N> {
        self.block_shape.point()
    }

    /// Number of blocks currently present.
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Sum of every present block's current (possibly compressed) payload
    /// size, in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.blocks.values().map(CompressedBlock::current_size_bytes).sum()
    }

    /// Mean per-block compression ratio (`uncompressed / compressed`),
    /// counting an uncompressed block as a ratio of `1.0`. `1.0` if no
    /// blocks are present.
    #[must_use]
    pub fn average_compression_ratio(&self) -> f64 {
        if self.blocks.is_empty() {
            return 1.0;
        }
        let uncompressed_bytes = (self.block_shape.point().product() * T::BYTE_WIDTH) as f64;
        let total: f64 = self
            .blocks
            .values()
            .map(|b| {
                if b.is_compressed() {
                    uncompressed_bytes / b.current_size_bytes().max(1) as f64
                } else {
                    1.0
                }
            })
            .sum();
        total / self.blocks.len() as f64
    }

    /// Reads `[p, q)` into `out`, which must have shape `q - p`. Space not
    /// covered by any present block reads as `T::ZERO`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlockCorrupted`] if a touched block's
    /// payload fails to decompress to its expected length.
    ///
    /// # Panics
    ///
    /// Panics if `out.shape() != q - p`.
    pub fn read_region(&mut self, p: Point<N>, q: Point<N>, out: &mut ArrayViewMut<'_, N, T>) -> Result<()> {
        let _guard = ScratchGuard::acquire(&self.scratch_busy)?;
        assert_eq!(out.shape().0, (q - p).0, "read_region shape mismatch");
        out.fill_zero();
        let shape = self.block_shape.point();
        for t in traverse(p, q, shape) {
            let Some(block) = self.blocks.get(&t.block) else {
                continue;
            };
            let mut local = DenseArray::<N, T>::zeros(t.within_block.shape());
            {
                let mut local_view = local.view_mut();
                block
                    .read_sub(self.compression, t.within_block, &mut self.scratch, &mut local_view)
                    .map_err(|e| e.with_block_index(t.block.to_vec()))?;
            }
            let local_view = local.view();
            copy_region(&local_view, Point::zero(), out, t.source.p, t.within_block.shape());
        }
        Ok(())
    }

    /// Reads the single element at `p`. Unwritten space reads as `T::ZERO`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlockCorrupted`] if the covering block's
    /// payload fails to decompress to its expected length.
    pub fn read_point(&mut self, p: Point<N>) -> Result<T> {
        let _guard = ScratchGuard::acquire(&self.scratch_busy)?;
        let shape = self.block_shape.point();
        let c = block_index_low(p, shape);
        let Some(block) = self.blocks.get(&c) else {
            return Ok(T::ZERO);
        };
        block
            .read_into(self.compression, &mut self.scratch)
            .map_err(|e| e.with_block_index(c.to_vec()))?;
        let local = p - block_bounds(c, shape).p;
        Ok(self.scratch.get(local))
    }

    /// Writes `[p, q)` from `src`, which must have shape `q - p`. Creates
    /// any block the region touches that isn't already present.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlockCorrupted`] if a touched block's
    /// existing payload fails to decompress.
    ///
    /// # Panics
    ///
    /// Panics if `src.shape() != q - p`.
    pub fn write_region(&mut self, p: Point<N>, q: Point<N>, src: ArrayView<'_, N, T>) -> Result<()> {
        let _guard = ScratchGuard::acquire(&self.scratch_busy)?;
        assert_eq!(src.shape().0, (q - p).0, "write_region shape mismatch");
        let shape = self.block_shape.point();

        for t in traverse(p, q, shape) {
            let mut local_src = DenseArray::<N, T>::zeros(t.within_block.shape());
            {
                let mut local_view = local_src.view_mut();
                copy_region(&src, t.source.p, &mut local_view, Point::zero(), t.within_block.shape());
            }

            let is_new = !self.blocks.contains_key(&t.block);
            if is_new && t.within_block.is_full(shape) {
                self.blocks.insert(t.block, CompressedBlock::new_from(local_src.view()));
            } else {
                if is_new {
                    self.blocks.insert(t.block, CompressedBlock::new_zeroed(self.block_shape));
                }
                let block = self.blocks.get_mut(&t.block).expect("block was just inserted or is known present by index");
                block
                    .write_sub(self.compression, t.within_block, local_src.view())
                    .map_err(|e| e.with_block_index(t.block.to_vec()))?;
            }

            if self.compression_enabled {
                self.blocks.get_mut(&t.block).expect("block was just inserted or is known present by index").compress(self.compression);
            }

            self.rederive_block(t.block)?;
        }
        Ok(())
    }

    /// Writes the single element at `p` to `value`. Creates the covering
    /// block if it isn't already present.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlockCorrupted`] if the covering block's
    /// existing payload fails to decompress.
    pub fn write_point(&mut self, p: Point<N>, value: T) -> Result<()> {
        let _guard = ScratchGuard::acquire(&self.scratch_busy)?;
        let shape = self.block_shape.point();
        let c = block_index_low(p, shape);
        if !self.blocks.contains_key(&c) {
            self.blocks.insert(c, CompressedBlock::new_zeroed(self.block_shape));
        }
        let local = p - block_bounds(c, shape).p;
        let within = Region::new(local, local + Point([1i64; N]));
        let src = DenseArray::from_vec(within.shape(), vec![value]);
        {
            let block = self.blocks.get_mut(&c).expect("block was just inserted or is known present by index");
            block
                .write_sub(self.compression, within, src.view())
                .map_err(|e| e.with_block_index(c.to_vec()))?;
            if self.compression_enabled {
                block.compress(self.compression);
            }
        }
        self.rederive_block(c)
    }

    /// Writes `[p, q)` from `src` with "write-as-sparse" semantics:
    /// elements equal to `T::ZERO` are skipped (existing data at that
    /// position is preserved), elements equal to `write_as_zero` are
    /// written as `T::ZERO`, and every other element is copied literally.
    /// Every block the region touches is created if absent, even if the
    /// touched sub-region is entirely `T::ZERO` — block creation and the
    /// delete-empty decision are handled by the re-derivation policy
    /// (§4.3.1), not skipped up front.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlockCorrupted`] if a touched block's
    /// existing payload fails to decompress.
    ///
    /// # Panics
    ///
    /// Panics if `src.shape() != q - p`.
    pub fn write_region_nonzero(
        &mut self,
        p: Point<N>,
        q: Point<N>,
        src: ArrayView<'_, N, T>,
        write_as_zero: T,
    ) -> Result<()> {
        let _guard = ScratchGuard::acquire(&self.scratch_busy)?;
        assert_eq!(src.shape().0, (q - p).0, "write_region_nonzero shape mismatch");
        let shape = self.block_shape.point();

        for t in traverse(p, q, shape) {
            if !self.blocks.contains_key(&t.block) {
                self.blocks.insert(t.block, CompressedBlock::new_zeroed(self.block_shape));
            }

            let mut existing = DenseArray::<N, T>::zeros(t.within_block.shape());
            {
                let block = self.blocks.get(&t.block).expect("block was just inserted or is known present by index");
                let mut existing_view = existing.view_mut();
                block
                    .read_sub(self.compression, t.within_block, &mut self.scratch, &mut existing_view)
                    .map_err(|e| e.with_block_index(t.block.to_vec()))?;
            }

            let mut merged = DenseArray::<N, T>::zeros(t.within_block.shape());
            for local in iter_points(t.within_block.shape()) {
                let sval = src.get(t.source.p + local);
                let out_val = if sval == T::ZERO {
                    existing.get(local)
                } else if sval == write_as_zero {
                    T::ZERO
                } else {
                    sval
                };
                merged.set(local, out_val);
            }

            {
                let block = self.blocks.get_mut(&t.block).expect("block was just inserted or is known present by index");
                block
                    .write_sub(self.compression, t.within_block, merged.view())
                    .map_err(|e| e.with_block_index(t.block.to_vec()))?;
                if self.compression_enabled {
                    block.compress(self.compression);
                }
            }
            self.rederive_block(t.block)?;
        }
        Ok(())
    }

    /// Destroys every block that `[p, q)` touches, even partially (a
    /// block touched at its edge is destroyed in full, not trimmed).
    pub fn delete_region(&mut self, p: Point<N>, q: Point<N>) {
        log::debug!("delete_region: {:?}..{:?}", p.0, q.0);
        let shape = self.block_shape.point();
        for idx in enumerate_blocks(p, q, shape) {
            if self.blocks.remove(&idx).is_some() {
                self.min_max.remove(&idx);
                self.nonzero.remove(&idx);
            }
        }
    }

    /// Replaces every element `v` of every present block with
    /// `table[v.as_index() % table.len()]`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlockCorrupted`] if a block's payload fails
    /// to decompress.
    ///
    /// # Panics
    ///
    /// Panics if `table` is empty.
    pub fn apply_relabeling(&mut self, table: &[T]) -> Result<()> {
        let _guard = ScratchGuard::acquire(&self.scratch_busy)?;
        assert!(!table.is_empty(), "relabeling table must not be empty");
        log::debug!("apply_relabeling: {} present block(s), table len {}", self.blocks.len(), table.len());
        let indices: Vec<BlockIndex<N>> = self.blocks.keys().copied().collect();
        for idx in indices {
            let shape = {
                let block = self.blocks.get(&idx).expect("block was just inserted or is known present by index");
                block
                    .read_into(self.compression, &mut self.scratch)
                    .map_err(|e| e.with_block_index(idx.to_vec()))?;
                block.shape()
            };
            for p in iter_points(shape) {
                let v = self.scratch.get(p);
                self.scratch.set(p, table[v.as_index() % table.len()]);
            }
            let region = Region::new(Point::zero(), shape);
            {
                let scratch_view = self.scratch.view();
                let block = self.blocks.get_mut(&idx).expect("block was just inserted or is known present by index");
                block
                    .write_sub(self.compression, region, scratch_view)
                    .map_err(|e| e.with_block_index(idx.to_vec()))?;
                if self.compression_enabled {
                    block.compress(self.compression);
                }
            }
            self.rederive_block(idx)?;
        }
        Ok(())
    }

    /// Marks `[p, q)` dirty (or clean) on every block it touches. Absent
    /// blocks are left absent (a missing block is always considered
    /// dirty; there is nothing to mark clean).
    pub fn set_dirty_region(&mut self, p: Point<N>, q: Point<N>, dirty: bool) {
        let shape = self.block_shape.point();
        for t in traverse(p, q, shape) {
            if let Some(block) = self.blocks.get_mut(&t.block) {
                block.set_dirty_region(t.within_block, dirty);
            }
        }
    }

    /// True iff any block `[p, q)` touches is dirty over its corresponding
    /// sub-region, or is absent entirely (a missing block counts as
    /// dirty). Short-circuits at the first such block, in traversal order.
    #[must_use]
    pub fn is_dirty_region(&self, p: Point<N>, q: Point<N>) -> bool {
        let shape = self.block_shape.point();
        for t in traverse(p, q, shape) {
            match self.blocks.get(&t.block) {
                None => return true,
                Some(block) => {
                    if block.is_dirty_region(t.within_block) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Every block index `[p, q)` touches that is either absent or dirty
    /// over the queried sub-region.
    #[must_use]
    pub fn dirty_blocks(&self, p: Point<N>, q: Point<N>) -> Vec<BlockIndex<N>> {
        traverse(p, q, self.block_shape.point())
            .into_iter()
            .filter(|t| match self.blocks.get(&t.block) {
                None => true,
                Some(block) => block.is_dirty() || block.is_dirty_region(t.within_block),
            })
            .map(|t| t.block)
            .collect()
    }

    /// Every present block index that `[p, q)` touches, in ascending
    /// (last-axis-fastest) order.
    #[must_use]
    pub fn blocks(&self, p: Point<N>, q: Point<N>) -> Vec<BlockIndex<N>> {
        enumerate_blocks(p, q, self.block_shape.point())
            .into_iter()
            .filter(|idx| self.blocks.contains_key(idx))
            .collect()
    }

    /// Global-coordinate nonzero positions and values across every present
    /// block, in ascending block order. Empty unless coordinate-list
    /// management is enabled.
    #[must_use]
    pub fn nonzero(&self) -> (Vec<Point<N>>, Vec<T>) {
        let mut positions = Vec::new();
        let mut values = Vec::new();
        if !self.manage_coordinate_lists {
            return (positions, values);
        }
        let shape = self.block_shape.point();
        for (idx, (local_positions, local_values)) in &self.nonzero {
            let origin = block_bounds(*idx, shape).p;
            for (lp, v) in local_positions.iter().zip(local_values.iter()) {
                positions.push(origin + *lp);
                values.push(*v);
            }
        }
        (positions, values)
    }

    /// Global `(min, max)` over every present block.
    ///
    /// Returns `(T::TYPE_MAX, T::TYPE_MIN)` if min/max tracking is
    /// disabled (an inverted sentinel pair signaling "not tracked"), or
    /// `(T::ZERO, T::ZERO)` if tracking is enabled but nothing has been
    /// written yet (the whole domain still reads as zero).
    #[must_use]
    pub fn min_max(&self) -> (T, T) {
        if !self.min_max_tracking {
            return (T::TYPE_MAX, T::TYPE_MIN);
        }
        if self.min_max.is_empty() {
            return (T::ZERO, T::ZERO);
        }
        let mut lo = T::TYPE_MAX;
        let mut hi = T::TYPE_MIN;
        for &(block_lo, block_hi) in self.min_max.values() {
            if block_lo < lo {
                lo = block_lo;
            }
            if block_hi > hi {
                hi = block_hi;
            }
        }
        (lo, hi)
    }

    /// Enables or disables transparent compression. Compresses every
    /// present block immediately when turning on; decompresses every
    /// present block immediately when turning off. Newly created blocks
    /// follow whatever the current setting is at the time they're
    /// created.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlockCorrupted`] if decompressing an
    /// existing block fails.
    pub fn set_compression_enabled(&mut self, enabled: bool) -> Result<()> {
        log::trace!("set_compression_enabled({enabled})");
        self.compression_enabled = enabled;
        let indices: Vec<BlockIndex<N>> = self.blocks.keys().copied().collect();
        for idx in indices {
            let block = self.blocks.get_mut(&idx).expect("block was just inserted or is known present by index");
            if enabled {
                block.compress(self.compression);
            } else {
                block
                    .uncompress(self.compression)
                    .map_err(|e| e.with_block_index(idx.to_vec()))?;
            }
        }
        Ok(())
    }

    /// Enables or disables the min/max cache, rebuilding it from scratch
    /// when turning on.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlockCorrupted`] if decompressing a block
    /// during the rebuild fails.
    pub fn set_min_max_tracking(&mut self, enabled: bool) -> Result<()> {
        let _guard = ScratchGuard::acquire(&self.scratch_busy)?;
        self.min_max.clear();
        self.min_max_tracking = enabled;
        if enabled {
            let indices: Vec<BlockIndex<N>> = self.blocks.keys().copied().collect();
            for idx in indices {
                self.recompute_min_max(idx)?;
            }
        }
        Ok(())
    }

    /// Enables or disables the nonzero coordinate-list cache, rebuilding
    /// it from scratch when turning on. Enabling this also enables
    /// delete-empty-blocks (I5); disabling it does not turn delete-empty
    /// back off.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlockCorrupted`] if decompressing a block
    /// during the rebuild fails.
    pub fn set_manage_coordinate_lists(&mut self, enabled: bool) -> Result<()> {
        let _guard = ScratchGuard::acquire(&self.scratch_busy)?;
        self.nonzero.clear();
        self.manage_coordinate_lists = enabled;
        if enabled {
            self.delete_empty = true;
            let indices: Vec<BlockIndex<N>> = self.blocks.keys().copied().collect();
            for idx in indices {
                self.recompute_nonzero(idx)?;
            }
        }
        Ok(())
    }

    /// Enables or disables deleting all-zero blocks after a mutation.
    pub fn set_delete_empty_blocks(&mut self, enabled: bool) {
        self.delete_empty = enabled;
    }

    /// Re-derivation policy run after every mutation to block `idx`,
    /// executed in this fixed priority order:
    ///
    /// 1. If delete-empty is enabled and the block is now all-zero,
    ///    destroy it (and its cache entries) and stop.
    /// 2. Else, if min/max tracking is enabled, recompute that block's
    ///    min/max entry.
    /// 3. Else, if coordinate-list management is enabled, recompute that
    ///    block's nonzero entry.
    ///
    /// Steps 2 and 3 are mutually exclusive per write: enabling both
    /// caches at once means only the min/max cache is kept fresh by this
    /// per-write path (the nonzero cache then only reflects reality right
    /// after an explicit `set_manage_coordinate_lists(true)` rebuild).
    /// This is a faithful rendering of the engine's documented
    /// re-derivation order, not an oversight.
    fn rederive_block(&mut self, idx: BlockIndex<N>) -> Result<()> {
        let is_zero = {
            let block = self.blocks.get(&idx).expect("block was just inserted or is known present by index");
            block
                .read_into(self.compression, &mut self.scratch)
                .map_err(|e| e.with_block_index(idx.to_vec()))?;
            self.scratch.is_all_zero()
        };

        if self.delete_empty && is_zero {
            self.blocks.remove(&idx);
            self.min_max.remove(&idx);
            self.nonzero.remove(&idx);
            return Ok(());
        }

        if self.min_max_tracking {
            self.min_max.insert(idx, scan_min_max(&self.scratch));
        } else if self.manage_coordinate_lists {
            self.nonzero.insert(idx, scan_nonzero(&self.scratch));
        }
        Ok(())
    }

    fn recompute_min_max(&mut self, idx: BlockIndex<N>) -> Result<()> {
        let block = self.blocks.get(&idx).expect("block was just inserted or is known present by index");
        block
            .read_into(self.compression, &mut self.scratch)
            .map_err(|e| e.with_block_index(idx.to_vec()))?;
        self.min_max.insert(idx, scan_min_max(&self.scratch));
        Ok(())
    }

    fn recompute_nonzero(&mut self, idx: BlockIndex<N>) -> Result<()> {
        let block = self.blocks.get(&idx).expect("block was just inserted or is known present by index");
        block
            .read_into(self.compression, &mut self.scratch)
            .map_err(|e| e.with_block_index(idx.to_vec()))?;
        self.nonzero.insert(idx, scan_nonzero(&self.scratch));
        Ok(())
    }

    pub(crate) fn block_shape_wrapper(&self) -> BlockShape<N> {
        self.block_shape
    }

    pub(crate) fn blocks_map(&self) -> &BTreeMap<BlockIndex<N>, CompressedBlock<N, T>> {
        &self.blocks
    }

    pub(crate) fn min_max_map(&self) -> &BTreeMap<BlockIndex<N>, (T, T)> {
        &self.min_max
    }

    pub(crate) fn nonzero_map(&self) -> &BTreeMap<BlockIndex<N>, (Vec<Point<N>>, Vec<T>)> {
        &self.nonzero
    }

    pub(crate) fn options(&self) -> (bool, bool, CompressionType, bool, bool) {
        (
            self.delete_empty,
            self.compression_enabled,
            self.compression,
            self.min_max_tracking,
            self.manage_coordinate_lists,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_raw_parts(
        block_shape: BlockShape<N>,
        blocks: BTreeMap<BlockIndex<N>, CompressedBlock<N, T>>,
        min_max: BTreeMap<BlockIndex<N>, (T, T)>,
        nonzero: BTreeMap<BlockIndex<N>, (Vec<Point<N>>, Vec<T>)>,
        delete_empty: bool,
        compression_enabled: bool,
        compression: CompressionType,
        min_max_tracking: bool,
        manage_coordinate_lists: bool,
    ) -> Self {
        Self {
            scratch: DenseArray::zeros(block_shape.point()),
            scratch_busy: Cell::new(false),
            block_shape,
            blocks,
            min_max,
            nonzero,
            delete_empty,
            compression_enabled,
            compression,
            min_max_tracking,
            manage_coordinate_lists,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones<const N: usize>(shape: Point<N>) -> DenseArray<N, u8> {
        let mut d = DenseArray::<N, u8>::zeros(shape);
        for p in iter_points(shape) {
            d.set(p, 1);
        }
        d
    }

    #[test]
    fn read_of_unwritten_space_is_zero() {
        let mut a = Array::<2, u8>::new(Point([10, 10]));
        let mut out = DenseArray::<2, u8>::zeros(Point([5, 5]));
        let mut out_view = out.view_mut();
        a.read_region(Point([0, 0]), Point([5, 5]), &mut out_view).unwrap();
        assert!(out.is_all_zero());
    }

    #[test]
    fn write_then_read_roundtrips_across_block_boundary() {
        let mut a = Array::<2, u8>::new(Point([10, 10]));
        let src = ones(Point([20, 20]));
        a.write_region(Point([5, 5]), Point([25, 25]), src.view()).unwrap();

        let mut out = DenseArray::<2, u8>::zeros(Point([20, 20]));
        {
            let mut out_view = out.view_mut();
            a.read_region(Point([5, 5]), Point([25, 25]), &mut out_view).unwrap();
        }
        assert!(out.as_slice().iter().all(|&v| v == 1));
        assert_eq!(a.read_point(Point([10, 10])).unwrap(), 1);
        assert_eq!(a.read_point(Point([0, 0])).unwrap(), 0);
    }

    #[test]
    fn write_point_creates_block_on_demand() {
        let mut a = Array::<2, u8>::new(Point([10, 10]));
        assert_eq!(a.num_blocks(), 0);
        a.write_point(Point([15, 15]), 9).unwrap();
        assert_eq!(a.num_blocks(), 1);
        assert_eq!(a.read_point(Point([15, 15])).unwrap(), 9);
    }

    #[test]
    fn delete_empty_blocks_removes_all_zero_writes() {
        let mut a = ArrayConfig::<2>::new(Point([10, 10]))
            .delete_empty_blocks(true)
            .build::<u8>();
        a.write_point(Point([1, 1]), 0).unwrap();
        assert_eq!(a.num_blocks(), 0);
    }

    #[test]
    fn delete_region_destroys_partially_touched_blocks() {
        let mut a = Array::<2, u8>::new(Point([10, 10]));
        a.write_point(Point([5, 5]), 7).unwrap();
        assert_eq!(a.num_blocks(), 1);
        a.delete_region(Point([8, 8]), Point([12, 12]));
        assert_eq!(a.num_blocks(), 0);
    }

    #[test]
    fn dirty_blocks_reports_absent_and_touched() {
        let mut a = Array::<2, u8>::new(Point([10, 10]));
        let src = ones(Point([100, 100]));
        a.write_region(Point([0, 0]), Point([100, 100]), src.view()).unwrap();
        assert_eq!(a.dirty_blocks(Point([0, 0]), Point([100, 100])).len(), 0);

        a.set_dirty_region(Point([50, 0]), Point([60, 100]), true);
        let dirty = a.dirty_blocks(Point([0, 0]), Point([100, 100]));
        assert_eq!(dirty.len(), 10);
        assert!(dirty.iter().all(|b| b.0[0] == 5));
    }

    #[test]
    fn min_max_tracking_reports_sentinel_when_disabled() {
        let a = Array::<2, u8>::new(Point([10, 10]));
        assert_eq!(a.min_max(), (u8::MAX, u8::MIN));
    }

    #[test]
    fn min_max_tracking_reports_zero_before_any_write() {
        let a = ArrayConfig::<2>::new(Point([10, 10])).min_max_tracking(true).build::<u8>();
        assert_eq!(a.min_max(), (0, 0));
    }

    #[test]
    fn min_max_tracking_reflects_writes() {
        let mut a = ArrayConfig::<2>::new(Point([10, 10])).min_max_tracking(true).build::<u8>();
        a.write_point(Point([1, 1]), 200).unwrap();
        a.write_point(Point([2, 2]), 3).unwrap();
        assert_eq!(a.min_max(), (0, 200));
    }

    #[test]
    fn manage_coordinate_lists_implies_delete_empty() {
        let a = ArrayConfig::<2>::new(Point([10, 10]))
            .manage_coordinate_lists(true)
            .build::<u8>();
        assert!(a.delete_empty);
    }

    #[test]
    fn nonzero_enumerates_global_coordinates() {
        let mut a = ArrayConfig::<2>::new(Point([10, 10]))
            .manage_coordinate_lists(true)
            .build::<u8>();
        a.write_point(Point([3, 4]), 5).unwrap();
        a.write_point(Point([13, 4]), 6).unwrap();
        let (positions, values) = a.nonzero();
        assert_eq!(positions, vec![Point([3, 4]), Point([13, 4])]);
        assert_eq!(values, vec![5, 6]);
    }

    #[test]
    fn write_region_nonzero_skips_zero_and_maps_sentinel() {
        let mut a = Array::<2, u8>::new(Point([10, 10]));
        a.write_point(Point([1, 1]), 9).unwrap();

        let mut src = DenseArray::<2, u8>::zeros(Point([3, 3]));
        src.set(Point([0, 0]), 0); // skip: preserve existing
        src.set(Point([1, 1]), 250); // sentinel: write as zero
        src.set(Point([2, 2]), 4); // literal write

        a.write_region_nonzero(Point([0, 0]), Point([3, 3]), src.view(), 250).unwrap();

        assert_eq!(a.read_point(Point([1, 1])).unwrap(), 0);
        assert_eq!(a.read_point(Point([2, 2])).unwrap(), 4);
    }

    #[test]
    fn write_region_nonzero_creates_block_for_all_zero_source_without_delete_empty() {
        let mut a = Array::<2, u8>::new(Point([10, 10]));
        assert_eq!(a.num_blocks(), 0);

        let src = DenseArray::<2, u8>::zeros(Point([3, 3]));
        a.write_region_nonzero(Point([0, 0]), Point([3, 3]), src.view(), 250).unwrap();

        assert_eq!(a.num_blocks(), 1, "an all-zero nonzero-write still materializes its block when delete-empty is off");
    }

    #[test]
    fn write_region_nonzero_deletes_resulting_empty_block_with_delete_empty_on() {
        let mut a = ArrayConfig::<2>::new(Point([10, 10])).delete_empty_blocks(true).build::<u8>();

        let src = DenseArray::<2, u8>::zeros(Point([3, 3]));
        a.write_region_nonzero(Point([0, 0]), Point([3, 3]), src.view(), 250).unwrap();

        assert_eq!(a.num_blocks(), 0);
    }

    #[test]
    fn apply_relabeling_maps_every_element() {
        let mut a = Array::<2, u8>::new(Point([10, 10]));
        a.write_point(Point([1, 1]), 1).unwrap();
        a.write_point(Point([2, 2]), 2).unwrap();
        let table = [0u8, 10, 20];
        a.apply_relabeling(&table).unwrap();
        assert_eq!(a.read_point(Point([1, 1])).unwrap(), 10);
        assert_eq!(a.read_point(Point([2, 2])).unwrap(), 20);
    }

    #[test]
    fn blocks_filters_to_intersecting_present_blocks() {
        let mut a = Array::<2, u8>::new(Point([10, 10]));
        a.write_point(Point([1, 1]), 1).unwrap();
        assert_eq!(a.blocks(Point([0, 0]), Point([100, 100])), vec![Point([0, 0])]);
        assert!(a.blocks(Point([50, 50]), Point([60, 60])).is_empty());
    }
}
