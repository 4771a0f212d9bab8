// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{DecodeError, EncodeError};
use crate::point::BlockIndexVec;

/// Represents errors that can occur in the block-tile array engine
#[derive(Debug)]
pub enum Error {
    /// I/O error (surfaced by persistence, which writes to/reads from a
    /// caller-supplied `Read`/`Write`)
    Io(std::io::Error),

    /// Serialization failed
    Encode(EncodeError),

    /// Deserialization failed
    Decode(DecodeError),

    /// A block's decompressed payload did not have the expected length
    BlockCorrupted {
        /// Block whose payload failed to decompress cleanly
        block_index: BlockIndexVec,
        /// Expected element count (`∏ shape`)
        expected: usize,
        /// Actual decompressed element count
        actual: usize,
    },

    /// A persisted record's checksum did not match its recomputed checksum
    ChecksumMismatch {
        /// Checksum stored in the record
        expected: u64,
        /// Checksum recomputed from the record's bytes
        got: u64,
    },

    /// Malformed or truncated persisted record, or an incompatible
    /// dimension count / element width
    PersistenceError(String),

    /// The scratch buffer is already borrowed by an in-flight operation
    ///
    /// The engine is single-threaded and synchronous; this can only
    /// happen from reentrant use (e.g. calling back into the same
    /// `Array` from inside a callback invoked by one of its own
    /// operations), which is unsupported.
    ScratchBufferBusy,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockTileError: {self:?}")
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl Error {
    /// Fills in the block index of a [`Error::BlockCorrupted`] raised
    /// deep inside a block that doesn't know its own index (blocks are
    /// owned by the `Array`, not vice versa). No-op for other variants.
    #[must_use]
    pub(crate) fn with_block_index(self, index: BlockIndexVec) -> Self {
        match self {
            Self::BlockCorrupted { expected, actual, .. } => Self::BlockCorrupted {
                block_index: index,
                expected,
                actual,
            },
            other => other,
        }
    }
}

/// Array engine result
pub type Result<T> = std::result::Result<T, Error>;
