// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Auxiliary per-block caches: block-local min/max and nonzero coordinate
//! lists.
//!
//! Both are kept as `BTreeMap<Point<N>, _>`, so iterating them in key order
//! matches [`crate::coords::enumerate_blocks`] order for free (see
//! [`crate::point::Point`]'s `Ord` docs). [`crate::array::Array`] owns one
//! of each and is responsible for keeping them in sync with the block map
//! per the re-derivation policy described there; this module only holds
//! the data and the pure scan that produces it.

use crate::element::Element;
use crate::point::Point;
use crate::view::{iter_points, DenseArray};

/// Scans a decoded block, returning its `(min, max)` pair.
///
/// # Panics
///
/// Panics if `dense` has zero elements (block shapes are required to have
/// strictly positive extents, so this cannot happen for a real block).
pub(crate) fn scan_min_max<const N: usize, T: Element>(dense: &DenseArray<N, T>) -> (T, T) {
    let shape = dense.shape();
    let mut points = iter_points(shape);
    let first = points.next().expect("block shape has zero elements");
    let mut lo = dense.get(first);
    let mut hi = dense.get(first);
    for p in points {
        let v = dense.get(p);
        if v < lo {
            lo = v;
        }
        if v > hi {
            hi = v;
        }
    }
    (lo, hi)
}

/// Scans a decoded block, returning the local coordinates and values of
/// its nonzero elements, in last-axis-fastest order.
pub(crate) fn scan_nonzero<const N: usize, T: Element>(
    dense: &DenseArray<N, T>,
) -> (Vec<Point<N>>, Vec<T>) {
    let mut positions = Vec::new();
    let mut values = Vec::new();
    for p in iter_points(dense.shape()) {
        let v = dense.get(p);
        if v != T::ZERO {
            positions.push(p);
            values.push(v);
        }
    }
    (positions, values)
}
