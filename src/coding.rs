// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Minimal serialization vocabulary shared by [`crate::compression`] and
//! [`crate::persistence`].

use std::io::{Read, Write};

/// Error during serialization.
#[derive(Debug)]
pub enum EncodeError {
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EncodeError({})",
            match self {
                Self::Io(e) => e.to_string(),
            }
        )
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for EncodeError {}

/// Error during deserialization.
#[derive(Debug)]
pub enum DecodeError {
    /// I/O error
    Io(std::io::Error),

    /// A tagged value had an unrecognized discriminant
    InvalidTag(&'static str, u8),

    /// The leading magic bytes did not match
    InvalidHeader(&'static str),

    /// The dimension count (`N`) recorded in the stream doesn't match the
    /// `Array<N, T>` being deserialized into
    DimensionMismatch { expected: usize, got: usize },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DecodeError({self:?})")
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for DecodeError {}

/// Trait to serialize stuff.
pub trait Encode {
    /// Serializes into a writer.
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError>;

    /// Serializes into a fresh vector.
    fn encode_into_vec(&self) -> Vec<u8> {
        let mut v = vec![];
        self.encode_into(&mut v).expect("writing to a Vec cannot fail");
        v
    }
}

/// Trait to deserialize stuff.
pub trait Decode: Sized {
    /// Deserializes from a reader.
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError>;
}
