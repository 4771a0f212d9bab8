// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Chainable construction of an [`Array`].

use crate::array::Array;
use crate::compression::CompressionType;
use crate::element::Element;
use crate::point::Point;

/// Builds an [`Array`] with the block shape and feature toggles it should
/// start with.
///
/// ```
/// use blocktile::{ArrayConfig, CompressionType, Point};
///
/// let array = ArrayConfig::<2>::new(Point([64, 64]))
///     .compression(CompressionType::default())
///     .compression_enabled(true)
///     .min_max_tracking(true)
///     .build::<u8>();
/// assert_eq!(array.num_blocks(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct ArrayConfig<const N: usize> {
    pub(crate) block_shape: Point<N>,
    pub(crate) compression: CompressionType,
    pub(crate) compression_enabled: bool,
    pub(crate) delete_empty_blocks: bool,
    pub(crate) min_max_tracking: bool,
    pub(crate) manage_coordinate_lists: bool,
}

impl<const N: usize> ArrayConfig<N> {
    /// Starts a config for an array partitioned into blocks of `block_shape`.
    ///
    /// # Panics
    ///
    /// Panics if any component of `block_shape` is not strictly positive.
    #[must_use]
    pub fn new(block_shape: Point<N>) -> Self {
        assert!(
            block_shape.all_positive(),
            "block shape components must be > 0"
        );
        Self {
            block_shape,
            compression: CompressionType::default(),
            compression_enabled: false,
            delete_empty_blocks: false,
            min_max_tracking: false,
            manage_coordinate_lists: false,
        }
    }

    /// Sets the compression algorithm used when compression is enabled.
    #[must_use]
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Enables or disables transparent block compression.
    #[must_use]
    pub fn compression_enabled(mut self, enabled: bool) -> Self {
        self.compression_enabled = enabled;
        self
    }

    /// Enables or disables deleting all-zero blocks after a write.
    #[must_use]
    pub fn delete_empty_blocks(mut self, enabled: bool) -> Self {
        self.delete_empty_blocks = enabled;
        self
    }

    /// Enables or disables the min/max cache.
    #[must_use]
    pub fn min_max_tracking(mut self, enabled: bool) -> Self {
        self.min_max_tracking = enabled;
        self
    }

    /// Enables or disables the nonzero coordinate-list cache.
    ///
    /// Enabling this also enables `delete_empty_blocks` (an absent block
    /// and an all-zero block must be indistinguishable to the nonzero
    /// cache).
    #[must_use]
    pub fn manage_coordinate_lists(mut self, enabled: bool) -> Self {
        self.manage_coordinate_lists = enabled;
        if enabled {
            self.delete_empty_blocks = true;
        }
        self
    }

    /// Builds the array.
    #[must_use]
    pub fn build<T: Element>(self) -> Array<N, T> {
        Array::from_config(self)
    }
}
