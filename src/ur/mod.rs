/*
    Uniform Resources: text framing for moving binary payloads through
    QR codes.

    A message is CBOR framed, split into equal sized fragments and sent
    as an endless stream of parts. The first seq_len parts carry one
    fragment each, every later part carries the XOR of a pseudo randomly
    chosen subset of fragments, so a receiver can finish from any large
    enough set of parts in any order.
*/

pub mod bytewords;
pub mod xoshiro;
pub mod sampler;
pub mod fountain;
pub mod header;
pub mod encoder;
pub mod decoder;

use thiserror::Error;

use crate::{cbor::CborError, error::ErrorKind};

pub use decoder::URDecoder;
pub use encoder::UREncoder;

/// Fragment length an encoder aims for unless told otherwise.
pub const DEFAULT_PART_LEN: usize = 100;

/// Largest message a transfer may carry, 1 MiB.
pub const MAX_MESSAGE_LEN: usize = 1 << 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum URError {
    #[error("missing ur: scheme")]
    InvalidScheme,
    #[error("invalid ur type {0:?}")]
    InvalidType(String),
    #[error("invalid sequence component {0:?}")]
    InvalidSequence(String),
    #[error("ur text mixes upper and lower case")]
    MixedCase,
    #[error("bytewords text has odd length {0}")]
    OddLength(usize),
    #[error("invalid byteword {0:?}")]
    InvalidByteword(String),
    #[error("bytewords too short to carry a checksum")]
    MissingChecksum,
    #[error("checksum mismatch: expected {expected:08x}, found {found:08x}")]
    BadChecksum { expected: u32, found: u32 },
    #[error("malformed fountain header: {0}")]
    BadHeader(String),
    #[error("part text says {text} but header says {header}")]
    HeaderMismatch { text: String, header: String },
    #[error("part of type {found} fed to a {expected} transfer")]
    TypeMismatch { expected: String, found: String },
    #[error("part disagrees with the transfer on {0}")]
    TransferMismatch(&'static str),
    #[error("message checksum mismatch: expected {expected:08x}, found {found:08x}")]
    MessageChecksum { expected: u32, found: u32 },
    #[error("message is not complete yet")]
    NotComplete,
    #[error("part length must be positive")]
    ZeroPartLength,
    #[error("message of {0} bytes is larger than a transfer can carry")]
    MessageTooLarge(usize),
    #[error(transparent)]
    Cbor(#[from] CborError),
}

impl URError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            URError::TypeMismatch { .. } | URError::TransferMismatch(_) => ErrorKind::Protocol,
            URError::NotComplete => ErrorKind::Incomplete,
            URError::ZeroPartLength | URError::MessageTooLarge(_) => ErrorKind::Domain,
            URError::Cbor(e) => e.kind(),
            _ => ErrorKind::Malformed,
        }
    }
}

/// UR types are made of lowercase letters, digits and hyphens.
pub fn is_valid_type(ur_type: &str) -> bool {
    !ur_type.is_empty()
        && ur_type
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/**
    Rejects text that uses both cases. Either case alone is fine,
    QR alphanumeric mode only carries the upper case one.
*/
pub fn check_case(text: &str) -> Result<(), URError> {
    let lower = text.bytes().any(|b| b.is_ascii_lowercase());
    let upper = text.bytes().any(|b| b.is_ascii_uppercase());
    if lower && upper {
        return Err(URError::MixedCase);
    }
    Ok(())
}
