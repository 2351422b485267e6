/*
    Crate wide error handling.

    Every module owns its own error enum. They all classify into one of
    four kinds so a caller can tell "feed me more input" apart from
    "this input is wrong" without matching every variant.
*/

use thiserror::Error;

use crate::{
    cbor::CborError,
    encoding::EncodingError,
    hdwallet::HDWError,
    key::KeyError,
    psbt::PsbtError,
    script::ScriptErr,
    transaction::TxError,
    ur::URError,
    urtypes::RegistryError,
    wallet::WalletError,
};

/// Closed classification of every failure the crate can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Truncated streams, wrong lengths, bad checksums, version mismatches.
    Malformed,
    /// The peer broke a protocol invariant (duplicate keys, mixed transfers...).
    Protocol,
    /// More input is needed before the operation can succeed.
    Incomplete,
    /// A value is outside the domain of the operation.
    Domain,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    HDWallet(#[from] HDWError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Script(#[from] ScriptErr),
    #[error(transparent)]
    Transaction(#[from] TxError),
    #[error(transparent)]
    Psbt(#[from] PsbtError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Cbor(#[from] CborError),
    #[error(transparent)]
    UR(#[from] URError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Key(e) => e.kind(),
            Error::HDWallet(e) => e.kind(),
            Error::Encoding(e) => e.kind(),
            Error::Script(e) => e.kind(),
            Error::Transaction(e) => e.kind(),
            Error::Psbt(e) => e.kind(),
            Error::Wallet(e) => e.kind(),
            Error::Cbor(e) => e.kind(),
            Error::UR(e) => e.kind(),
            Error::Registry(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
