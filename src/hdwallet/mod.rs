/*
    This module implements hierarchical deterministic wallets
    under the BIP 32 standard.

    A node of the key tree is an ExtendedKey wrapping either a private
    or a public key. HDKey is the sum of the two for callers that do not
    know ahead of time which one they hold.
*/

pub mod ckd;
pub mod extended_keys;
pub mod path;

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::{
    encoding::{EncodingError, VersionPrefix},
    error::ErrorKind,
    key::{KeyError, PublicKey},
};

pub use ckd::{ChildOptions, HARDENED};
pub use extended_keys::{ExtendedKey, Xprv, Xpub};
pub use path::{IntoPath, Path};

/**
    Enum for handling hd wallet errors
*/
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HDWError {
    #[error("bad derivation path: {0}")]
    BadPath(String),
    #[error("invalid extended key: {0}")]
    BadKey(String),
    #[error("unknown version prefix {0:#010x}")]
    BadPrefix(u32),
    #[error("version {0:#010x} does not match the key type")]
    VersionMismatch(u32),
    #[error("cannot derive hardened child {0:#010x} from a public key")]
    HardenedFromPublic(u32),
    #[error("key is already public")]
    AlreadyPublic,
    #[error("derivation depth exceeds 255")]
    DepthOverflow,
    #[error("invalid mnemonic: {0}")]
    Mnemonic(String),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl HDWError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HDWError::HardenedFromPublic(_) => ErrorKind::Protocol,
            HDWError::AlreadyPublic => ErrorKind::Incomplete,
            HDWError::DepthOverflow => ErrorKind::Domain,
            HDWError::Key(e) => e.kind(),
            _ => ErrorKind::Malformed,
        }
    }
}

/**
    A node of the key tree, private or public.
    Only the private variant can sign or produce a public node.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HDKey {
    Private(Xprv),
    Public(Xpub),
}

impl HDKey {
    pub fn from_seed(seed: &[u8], version: VersionPrefix) -> Result<Self, HDWError> {
        Ok(HDKey::Private(Xprv::from_seed(seed, version)?))
    }

    /// Parses the 78 byte binary form. The key field decides the variant.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HDWError> {
        match bytes.get(45) {
            Some(0x00) => Ok(HDKey::Private(Xprv::from_bytes(bytes)?)),
            Some(_) => Ok(HDKey::Public(Xpub::from_bytes(bytes)?)),
            None => Err(EncodingError::InvalidLength { expected: 78, found: bytes.len() }.into()),
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, HDKey::Private(_))
    }

    /**
        Strips the private key. Asking a public node for its public
        counterpart is an error, there is nothing to strip.
    */
    pub fn to_public(&self) -> Result<Xpub, HDWError> {
        match self {
            HDKey::Private(xprv) => xprv.to_public(),
            HDKey::Public(_) => Err(HDWError::AlreadyPublic),
        }
    }

    pub fn child(&self, index: u32, hardened: bool) -> Result<Self, HDWError> {
        Ok(match self {
            HDKey::Private(k) => HDKey::Private(k.child(index, hardened)?),
            HDKey::Public(k) => HDKey::Public(k.child(index, hardened)?),
        })
    }

    pub fn derive<P: IntoPath>(&self, path: P) -> Result<Self, HDWError> {
        Ok(match self {
            HDKey::Private(k) => HDKey::Private(k.derive(path)?),
            HDKey::Public(k) => HDKey::Public(k.derive(path)?),
        })
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            HDKey::Private(k) => k.public_key(),
            HDKey::Public(k) => k.public_key(),
        }
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        match self {
            HDKey::Private(k) => k.fingerprint(),
            HDKey::Public(k) => k.fingerprint(),
        }
    }

    pub fn serialize(&self) -> [u8; 78] {
        match self {
            HDKey::Private(k) => k.serialize(),
            HDKey::Public(k) => k.serialize(),
        }
    }

    pub fn as_private(&self) -> Option<&Xprv> {
        match self {
            HDKey::Private(k) => Some(k),
            HDKey::Public(_) => None,
        }
    }
}

impl From<Xprv> for HDKey {
    fn from(k: Xprv) -> Self {
        HDKey::Private(k)
    }
}

impl From<Xpub> for HDKey {
    fn from(k: Xpub) -> Self {
        HDKey::Public(k)
    }
}

impl FromStr for HDKey {
    type Err = HDWError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.get(1..4) {
            Some("prv") => Ok(HDKey::Private(s.parse()?)),
            Some("pub") => Ok(HDKey::Public(s.parse()?)),
            _ => Err(HDWError::BadKey(s.to_string())),
        }
    }
}

impl fmt::Display for HDKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HDKey::Private(k) => write!(f, "{}", k),
            HDKey::Public(k) => write!(f, "{}", k),
        }
    }
}
