// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Dense N-D buffers, owned and borrowed.
//!
//! Row-major (last axis fastest), matching [`crate::coords`]'s traversal
//! order. [`DenseArray`] owns its storage; [`ArrayView`] / [`ArrayViewMut`]
//! borrow a slice and a shape, with an origin offset so a sub-region of a
//! larger buffer can be addressed without copying.

use crate::element::Element;
use crate::point::Point;

fn strides<const N: usize>(shape: Point<N>) -> [usize; N] {
    let mut strides = [1usize; N];
    for i in (0..N.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1] as usize;
    }
    strides
}

fn flat_index<const N: usize>(strides: [usize; N], p: Point<N>) -> usize {
    (0..N).map(|i| strides[i] * p[i] as usize).sum()
}

/// An owned, dense N-D buffer.
#[derive(Clone, Debug)]
pub struct DenseArray<const N: usize, T: Element> {
    data: Vec<T>,
    shape: Point<N>,
    strides: [usize; N],
}

impl<const N: usize, T: Element> DenseArray<N, T> {
    /// Allocates a zero-filled buffer of the given shape.
    #[must_use]
    pub fn zeros(shape: Point<N>) -> Self {
        Self {
            data: vec![T::ZERO; shape.product()],
            strides: strides(shape),
            shape,
        }
    }

    /// Builds a dense buffer from already-flat data (row-major, last axis fastest).
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != shape.product()`.
    #[must_use]
    pub fn from_vec(shape: Point<N>, data: Vec<T>) -> Self {
        assert_eq!(data.len(), shape.product(), "data/shape length mismatch");
        Self {
            strides: strides(shape),
            shape,
            data,
        }
    }

    #[must_use]
    pub fn shape(&self) -> Point<N> {
        self.shape
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[must_use]
    pub fn get(&self, p: Point<N>) -> T {
        self.data[flat_index(self.strides, p)]
    }

    pub fn set(&mut self, p: Point<N>, value: T) {
        let idx = flat_index(self.strides, p);
        self.data[idx] = value;
    }

    /// Resets every element to `T::ZERO` without reallocating.
    pub fn fill_zero(&mut self) {
        self.data.fill(T::ZERO);
    }

    /// True iff every element equals `T::ZERO`.
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        self.data.iter().all(|v| *v == T::ZERO)
    }

    #[must_use]
    pub fn view(&self) -> ArrayView<'_, N, T> {
        ArrayView {
            data: &self.data,
            shape: self.shape,
            strides: self.strides,
        }
    }

    #[must_use]
    pub fn view_mut(&mut self) -> ArrayViewMut<'_, N, T> {
        ArrayViewMut {
            data: &mut self.data,
            shape: self.shape,
            strides: self.strides,
        }
    }
}

/// A borrowed, read-only dense N-D view.
#[derive(Clone, Copy, Debug)]
pub struct ArrayView<'a, const N: usize, T: Element> {
    data: &'a [T],
    shape: Point<N>,
    strides: [usize; N],
}

impl<'a, const N: usize, T: Element> ArrayView<'a, N, T> {
    #[must_use]
    pub fn new(data: &'a [T], shape: Point<N>) -> Self {
        assert_eq!(data.len(), shape.product(), "data/shape length mismatch");
        Self {
            data,
            strides: strides(shape),
            shape,
        }
    }

    #[must_use]
    pub fn shape(&self) -> Point<N> {
        self.shape
    }

    #[must_use]
    pub fn get(&self, p: Point<N>) -> T {
        self.data[flat_index(self.strides, p)]
    }
}

/// A borrowed, mutable dense N-D view.
#[derive(Debug)]
pub struct ArrayViewMut<'a, const N: usize, T: Element> {
    data: &'a mut [T],
    shape: Point<N>,
    strides: [usize; N],
}

impl<'a, const N: usize, T: Element> ArrayViewMut<'a, N, T> {
    #[must_use]
    pub fn new(data: &'a mut [T], shape: Point<N>) -> Self {
        assert_eq!(data.len(), shape.product(), "data/shape length mismatch");
        let strides = strides(shape);
        Self {
            data,
            strides,
            shape,
        }
    }

    #[must_use]
    pub fn shape(&self) -> Point<N> {
        self.shape
    }

    #[must_use]
    pub fn get(&self, p: Point<N>) -> T {
        self.data[flat_index(self.strides, p)]
    }

    pub fn set(&mut self, p: Point<N>, value: T) {
        let idx = flat_index(self.strides, p);
        self.data[idx] = value;
    }

    pub fn fill_zero(&mut self) {
        self.data.fill(T::ZERO);
    }

    #[must_use]
    pub fn as_immutable(&self) -> ArrayView<'_, N, T> {
        ArrayView {
            data: self.data,
            shape: self.shape,
            strides: self.strides,
        }
    }
}

/// Iterates every point in `[0, shape)`, last axis fastest.
#[must_use]
pub fn iter_points<const N: usize>(shape: Point<N>) -> impl Iterator<Item = Point<N>> {
    let total = shape.product();
    let strides_ = strides(shape);
    (0..total).map(move |flat| {
        let mut rem = flat;
        let mut out = [0i64; N];
        for i in 0..N {
            out[i] = (rem / strides_[i]) as i64;
            rem %= strides_[i];
        }
        Point(out)
    })
}

/// Copies `src[src_origin .. src_origin+shape)` into `dst[dst_origin ..
/// dst_origin+shape)`. Both views must actually contain the addressed
/// sub-regions; this is the workhorse behind `read_sub`/`write_sub`/
/// traversal copies.
pub fn copy_region<const N: usize, T: Element>(
    src: &ArrayView<'_, N, T>,
    src_origin: Point<N>,
    dst: &mut ArrayViewMut<'_, N, T>,
    dst_origin: Point<N>,
    shape: Point<N>,
) {
    for local in iter_points(shape) {
        let v = src.get(src_origin + local);
        dst.set(dst_origin + local, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_and_set_get() {
        let mut a = DenseArray::<2, u8>::zeros(Point([2, 3]));
        a.set(Point([1, 2]), 9);
        assert_eq!(a.get(Point([1, 2])), 9);
        assert_eq!(a.get(Point([0, 0])), 0);
        assert!(!a.is_all_zero());
    }

    #[test]
    fn iter_points_order_last_axis_fastest() {
        let pts: Vec<_> = iter_points(Point([2, 2])).map(|p| p.0).collect();
        assert_eq!(pts, vec![[0, 0], [0, 1], [1, 0], [1, 1]]);
    }

    #[test]
    fn copy_region_offsets() {
        let mut src = DenseArray::<2, u8>::zeros(Point([4, 4]));
        for p in iter_points(Point([4, 4])) {
            src.set(p, (p[0] * 4 + p[1]) as u8);
        }
        let mut dst = DenseArray::<2, u8>::zeros(Point([2, 2]));
        {
            let src_view = src.view();
            let mut dst_view = dst.view_mut();
            copy_region(&src_view, Point([1, 1]), &mut dst_view, Point([0, 0]), Point([2, 2]));
        }
        assert_eq!(dst.get(Point([0, 0])), src.get(Point([1, 1])));
        assert_eq!(dst.get(Point([1, 1])), src.get(Point([2, 2])));
    }
}
