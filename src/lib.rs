// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! An out-of-core, block-partitioned N-dimensional array engine for dense
//! numeric volumes.
//!
//! ##### About
//!
//! A [`blocktile::Array`](Array) is a logically-infinite, zero-initialized
//! N-dimensional grid of a fixed element type, physically stored as a
//! sparse map of fixed-shape [`Block`](block::CompressedBlock)s. Only the
//! blocks a caller has actually written occupy memory; everything else
//! reads back as `T::ZERO`. This is the same storage shape block-sparse
//! volume formats use for segmentation masks, labeled microscopy volumes,
//! and other mostly-empty dense numeric data: partition space into
//! fixed-size tiles, keep only the non-trivial ones, and transparently
//! compress/decompress them on access.
//!
//! # Example usage
//!
//! ```
//! use blocktile::{Array, ArrayConfig, CompressionType, Point};
//!
//! let mut array = ArrayConfig::<2>::new(Point([64, 64]))
//!     .compression(CompressionType::default())
//!     .compression_enabled(true)
//!     .min_max_tracking(true)
//!     .build::<u8>();
//!
//! array.write_point(Point([10, 10]), 42)?;
//! assert_eq!(array.read_point(Point([10, 10]))?, 42);
//! assert_eq!(array.min_max(), (0, 42));
//!
//! // Persist and reload as a plain byte stream.
//! let mut bytes = Vec::new();
//! blocktile::persistence::save(&array, &mut bytes)?;
//! let reloaded: Array<2, u8> = blocktile::persistence::load(&mut bytes.as_slice())?;
//! assert_eq!(reloaded.read_point(Point([10, 10]))?, 42);
//! #
//! # Ok::<(), blocktile::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

pub mod array;
pub mod block;
mod cache;
mod coding;
pub mod compression;
pub mod config;
pub mod coords;
pub mod element;
mod error;
pub mod persistence;
pub mod point;
pub mod source_sink;
pub mod view;

pub use {
    array::Array,
    block::BlockShape,
    compression::CompressionType,
    config::ArrayConfig,
    element::Element,
    error::{Error, Result},
    point::{BlockIndex, Point, Region},
    source_sink::{Sink, Source},
    view::{ArrayView, ArrayViewMut, DenseArray},
};
