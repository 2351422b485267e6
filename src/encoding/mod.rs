/*
    Module that bundles together the various encoding schemes used in Bitcoin
    and the stream traits shared by scripts, transactions and PSBTs.
*/

pub mod version_prefix;
pub mod base58;
pub mod bech32;
pub mod compact;

use std::io::{Cursor, Read};

use thiserror::Error;

use crate::error::ErrorKind;

pub use version_prefix::VersionPrefix;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("unexpected end of data")]
    UnexpectedEof,
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("expected {expected} bytes, found {found}")]
    InvalidLength { expected: usize, found: usize },
    #[error("compact size {0} does not fit in memory")]
    Oversized(u64),
    #[error("invalid base58: {0}")]
    Base58(String),
    #[error("base58 checksum mismatch")]
    BadChecksum,
    #[error("invalid bech32: {0}")]
    Bech32(String),
}

impl EncodingError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Malformed
    }
}

impl From<std::io::Error> for EncodingError {
    fn from(_: std::io::Error) -> Self {
        //Readers in this crate are in-memory cursors; the only failure is running out of bytes
        EncodingError::UnexpectedEof
    }
}

/// Anything with a canonical binary serialization.
pub trait Encodable {
    fn write_to(&self, out: &mut Vec<u8>);

    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

/// Anything that can be read back from a byte stream.
pub trait Decodable: Sized {
    type Error: From<EncodingError>;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error>;

    /// Parses a complete byte slice. Leftover bytes are an error.
    fn parse(bytes: &[u8]) -> Result<Self, Self::Error> {
        let mut cursor = Cursor::new(bytes);
        let value = Self::read_from(&mut cursor)?;
        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(EncodingError::TrailingBytes(bytes.len() - consumed).into());
        }
        Ok(value)
    }
}
