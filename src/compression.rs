// Copyright (c) 2024-present, blocktile
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Compression algorithm used to store a block's payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompressionType {
    /// No compression. Not recommended for anything but tiny or
    /// already-incompressible volumes.
    None,

    /// Byte-level LZ compression.
    ///
    /// Recommended for the common case: fast, and effective on the
    /// piecewise-constant or locally-smooth data this engine typically
    /// stores (label volumes, segmentations, natural images).
    #[cfg(feature = "lz4")]
    Lz4,
}

impl Default for CompressionType {
    fn default() -> Self {
        Self::None
    }
}

impl Encode for CompressionType {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        match self {
            Self::None => writer.write_u8(0)?,

            #[cfg(feature = "lz4")]
            Self::Lz4 => writer.write_u8(1)?,
        }
        Ok(())
    }
}

impl Decode for CompressionType {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let tag = reader.read_u8()?;
        match tag {
            0 => Ok(Self::None),

            #[cfg(feature = "lz4")]
            1 => Ok(Self::Lz4),

            tag => Err(DecodeError::InvalidTag("CompressionType", tag)),
        }
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "no compression",

                #[cfg(feature = "lz4")]
                Self::Lz4 => "lz4",
            }
        )
    }
}

impl CompressionType {
    /// Compresses `raw` bytes, returning the compressed form.
    pub(crate) fn compress(self, raw: &[u8]) -> Vec<u8> {
        match self {
            Self::None => raw.to_vec(),

            #[cfg(feature = "lz4")]
            Self::Lz4 => lz4_flex::compress_prepend_size(raw),
        }
    }

    /// Decompresses `packed` bytes back to their raw form.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the codec reports the payload is malformed.
    pub(crate) fn decompress(self, packed: &[u8]) -> Result<Vec<u8>, ()> {
        match self {
            Self::None => Ok(packed.to_vec()),

            #[cfg(feature = "lz4")]
            Self::Lz4 => lz4_flex::decompress_size_prepended(packed).map_err(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_serialize_none() {
        let serialized = CompressionType::None.encode_into_vec();
        assert_eq!(1, serialized.len());
    }

    #[cfg(feature = "lz4")]
    mod lz4 {
        use super::*;

        #[test]
        fn compression_serialize_lz4() {
            let serialized = CompressionType::Lz4.encode_into_vec();
            assert_eq!(1, serialized.len());
        }

        #[test]
        fn roundtrip_through_codec() {
            let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_vec();
            let packed = CompressionType::Lz4.compress(&data);
            assert!(packed.len() < data.len());
            let back = CompressionType::Lz4.decompress(&packed).unwrap();
            assert_eq!(back, data);
        }
    }
}
