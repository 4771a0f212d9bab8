// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Pure coordinate algebra relating regions to the block grid.
//!
//! Everything here is a free function with no side effects: given a block
//! shape and a region, compute which blocks it touches and, for each, the
//! within-block sub-region and the matching sub-region of a caller-local
//! buffer. [`traverse`] is the one entry point the rest of the crate uses
//! to decompose a read or write into per-block work.

use crate::point::{BlockIndex, Point, Region};

/// `⌊p[i]/shape[i]⌋` componentwise.
#[must_use]
pub fn block_index_low<const N: usize>(p: Point<N>, shape: Point<N>) -> BlockIndex<N> {
    let mut out = [0i64; N];
    for i in 0..N {
        out[i] = p[i].div_euclid(shape[i]);
    }
    Point(out)
}

/// `⌊(q[i]-1)/shape[i]⌋ + 1` componentwise. Assumes `q > p` on every axis
/// (empty regions are filtered out by callers before this is used).
#[must_use]
pub fn block_index_high<const N: usize>(q: Point<N>, shape: Point<N>) -> BlockIndex<N> {
    let mut out = [0i64; N];
    for i in 0..N {
        out[i] = (q[i] - 1).div_euclid(shape[i]) + 1;
    }
    Point(out)
}

/// The half-open world-coordinate box spanned by block `c`.
#[must_use]
pub fn block_bounds<const N: usize>(c: BlockIndex<N>, shape: Point<N>) -> Region<N> {
    let one = Point([1i64; N]);
    Region::new(c.mul(shape), (c + one).mul(shape))
}

/// Every block index touching `[p, q)`, in ascending lexicographic order
/// (last axis varying fastest). Empty if the region is empty on any axis.
#[must_use]
pub fn enumerate_blocks<const N: usize>(
    p: Point<N>,
    q: Point<N>,
    shape: Point<N>,
) -> Vec<BlockIndex<N>> {
    if Region::new(p, q).is_empty() {
        return vec![];
    }

    let low = block_index_low(p, shape);
    let high = block_index_high(q, shape);

    let mut extents = [0i64; N];
    let mut total: i64 = 1;
    for i in 0..N {
        extents[i] = high[i] - low[i];
        total *= extents[i];
    }

    let mut out = Vec::with_capacity(total.max(0) as usize);
    for flat in 0..total {
        let mut rem = flat;
        let mut c = [0i64; N];
        // last axis fastest: divide by the trailing extents first
        for i in (0..N).rev() {
            c[i] = low[i] + rem % extents[i];
            rem /= extents[i];
        }
        out.push(Point(c));
    }
    out
}

/// One per-block traversal record produced by [`traverse`].
#[derive(Clone, Copy, Debug)]
pub struct TraverseItem<const N: usize> {
    /// The block this record addresses.
    pub block: BlockIndex<N>,
    /// Sub-region of the block, in block-local coordinates `[0, shape)`.
    pub within_block: Region<N>,
    /// Matching sub-region of a caller-local buffer of shape `q - p`.
    pub source: Region<N>,
}

/// Decomposes `[p, q)` into per-block `(block, within_block, source)`
/// triples covering it exactly once each.
///
/// Returns an empty vector if the region is empty on any axis. A region
/// fully inside a single block yields exactly one record.
#[must_use]
pub fn traverse<const N: usize>(
    p: Point<N>,
    q: Point<N>,
    shape: Point<N>,
) -> Vec<TraverseItem<N>> {
    if Region::new(p, q).is_empty() {
        return vec![];
    }

    let low = block_index_low(p, shape);
    let high = block_index_high(q, shape);

    enumerate_blocks(p, q, shape)
        .into_iter()
        .map(|c| {
            let mut within_p = [0i64; N];
            let mut within_q = [0i64; N];
            let mut source_p = [0i64; N];

            for i in 0..N {
                within_p[i] = if c[i] == low[i] {
                    p[i].rem_euclid(shape[i])
                } else {
                    0
                };
                within_q[i] = if c[i] == high[i] - 1 {
                    (q[i] - 1).rem_euclid(shape[i]) + 1
                } else {
                    shape[i]
                };

                source_p[i] = if c[i] > low[i] {
                    (shape[i] - p[i].rem_euclid(shape[i])) + (c[i] - low[i] - 1) * shape[i]
                } else {
                    0
                };
            }

            let within_block = Region::new(Point(within_p), Point(within_q));
            let source_shape = within_block.shape();
            let source = Region::new(Point(source_p), Point(source_p) + source_shape);

            TraverseItem {
                block: c,
                within_block,
                source,
            }
        })
        .collect()
}
