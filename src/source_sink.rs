// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Abstract upstream/downstream collaborator contracts.
//!
//! [`Source`] and [`Sink`] let streaming operators built on top of this
//! crate move data into and out of an [`crate::array::Array`] without the
//! array itself knowing anything about where that data comes from or
//! goes to (a file on disk, a network peer, another process's memory). An
//! `Array` implements neither trait: it is the thing a `Source` fills and
//! a `Sink` drains, not a collaborator itself.

use crate::element::Element;
use crate::point::{Point, Region};
use crate::view::{ArrayView, ArrayViewMut};

/// An upstream provider of block-shaped data for an N-D volume.
///
/// A `Source` is read-only from the caller's perspective: it hands back
/// `false` from [`Source::read_block`] when the requested region has no
/// data to offer rather than erroring, since "no data here yet" is a
/// normal, expected outcome for a streaming upstream.
pub trait Source<const N: usize, T: Element> {
    /// The full logical extent this source can provide data for.
    fn shape(&self) -> Point<N>;

    /// Fills `out` with the source's data for `region`, returning whether
    /// the source had data to offer there.
    ///
    /// `out.shape()` must equal `region.shape()`.
    fn read_block(&mut self, region: Region<N>, out: &mut ArrayViewMut<'_, N, T>) -> bool;

    /// Narrows the region subsequent [`Source::read_block`] calls should
    /// be restricted to. Sources that don't support restriction may
    /// ignore this.
    fn set_roi(&mut self, _region: Region<N>) {}
}

/// A downstream consumer of block-shaped data from an N-D volume.
pub trait Sink<const N: usize, T: Element> {
    /// Declares the full logical extent that will be written.
    fn set_shape(&mut self, shape: Point<N>);

    /// Declares the block granularity writes will arrive in.
    fn set_block_shape(&mut self, block_shape: Point<N>);

    /// Accepts `region`'s data from `data`, returning whether the sink
    /// accepted it.
    ///
    /// `data.shape()` must equal `region.shape()`.
    fn write_block(&mut self, region: Region<N>, data: ArrayView<'_, N, T>) -> bool;
}
