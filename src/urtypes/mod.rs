/*
    Registry types carried over UR.

    Every item maps onto a CBOR value with small integer keys. Items
    nested inside another item are tagged with their registry tag, the
    item at the top of a UR message is not (output descriptors being
    the exception, their script expressions are tags by nature).
*/

pub mod checksum;
pub mod keys;
pub mod output;
pub mod payloads;

use thiserror::Error;

use crate::{
    cbor::{CborError, Value},
    error::ErrorKind,
    hdwallet::HDWError,
    psbt::PsbtError,
    ur::{URDecoder, UREncoder, URError},
};

pub use checksum::{add_checksum, descriptor_checksum, verify_checksum};
pub use keys::{CryptoCoinInfo, CryptoECKey, CryptoHDKey, CryptoKeypath, PathComponent};
pub use output::{CryptoAccount, CryptoOutput, MultiKey, OutputKey, ScriptExpression};
pub use payloads::{CryptoBip39, CryptoPsbt};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    Cbor(#[from] CborError),
    #[error("{item} is missing field {key}")]
    MissingField { item: &'static str, key: u64 },
    #[error("expected tag {expected}, found tag {found}")]
    UnexpectedTag { expected: u64, found: u64 },
    #[error("invalid field: {0}")]
    InvalidField(String),
    #[error("unknown script expression tag {0}")]
    UnknownScriptExpression(u64),
    #[error("expected a {expected} message, found {found}")]
    WrongUrType { expected: &'static str, found: String },
    #[error(transparent)]
    UR(#[from] URError),
    #[error(transparent)]
    HDWallet(#[from] HDWError),
    #[error(transparent)]
    Psbt(#[from] PsbtError),
    #[error("character {0:?} cannot appear in a descriptor")]
    DescriptorCharacter(char),
    #[error("descriptor checksum mismatch: expected {expected:?}, found {found:?}")]
    DescriptorChecksum { expected: String, found: String },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::WrongUrType { .. } => ErrorKind::Protocol,
            RegistryError::DescriptorCharacter(_) => ErrorKind::Domain,
            RegistryError::UR(e) => e.kind(),
            RegistryError::HDWallet(e) => e.kind(),
            RegistryError::Psbt(e) => e.kind(),
            _ => ErrorKind::Malformed,
        }
    }
}

/// Name used as the UR type and the CBOR tag of a registry item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryType {
    pub name: &'static str,
    pub tag: u64,
}

pub const CRYPTO_BIP39: RegistryType = RegistryType { name: "crypto-bip39", tag: 301 };
pub const CRYPTO_HDKEY: RegistryType = RegistryType { name: "crypto-hdkey", tag: 303 };
pub const CRYPTO_KEYPATH: RegistryType = RegistryType { name: "crypto-keypath", tag: 304 };
pub const CRYPTO_COIN_INFO: RegistryType = RegistryType { name: "crypto-coin-info", tag: 305 };
pub const CRYPTO_ECKEY: RegistryType = RegistryType { name: "crypto-eckey", tag: 306 };
pub const CRYPTO_OUTPUT: RegistryType = RegistryType { name: "crypto-output", tag: 308 };
pub const CRYPTO_PSBT: RegistryType = RegistryType { name: "crypto-psbt", tag: 310 };
pub const CRYPTO_ACCOUNT: RegistryType = RegistryType { name: "crypto-account", tag: 311 };

/**
    An item of the registry. Implementors describe their CBOR map,
    the trait adds the byte and UR level conversions.
*/
pub trait RegistryItem: Sized {
    const REGISTRY_TYPE: RegistryType;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Result<Self, RegistryError>;

    fn to_cbor(&self) -> Vec<u8> {
        self.to_value().encode()
    }

    fn from_cbor(bytes: &[u8]) -> Result<Self, RegistryError> {
        Self::from_value(&Value::decode(bytes)?)
    }

    /// The value wrapped in the item's tag, for nesting inside another item.
    fn to_tagged_value(&self) -> Value {
        Value::Tag(Self::REGISTRY_TYPE.tag, Box::new(self.to_value()))
    }

    fn ur_encoder(&self) -> Result<UREncoder, RegistryError> {
        Ok(UREncoder::from_cbor(Self::REGISTRY_TYPE.name, self.to_cbor())?)
    }

    /// Reads the item out of a completed transfer of the right type.
    fn from_ur(decoder: &URDecoder) -> Result<Self, RegistryError> {
        match decoder.ur_type() {
            Some(found) if found == Self::REGISTRY_TYPE.name => {}
            found => {
                return Err(RegistryError::WrongUrType {
                    expected: Self::REGISTRY_TYPE.name,
                    found: found.unwrap_or_default().to_string(),
                })
            }
        }
        Self::from_cbor(decoder.result_message()?)
    }
}

/**
    Strips `tag` off a value. Untagged values pass through, a value
    under any other tag is rejected.
*/
pub(crate) fn untag(value: &Value, tag: u64) -> Result<&Value, RegistryError> {
    match value {
        Value::Tag(found, inner) if *found == tag => Ok(&**inner),
        Value::Tag(found, _) => Err(RegistryError::UnexpectedTag { expected: tag, found: *found }),
        other => Ok(other),
    }
}

pub(crate) fn required<'a>(value: &'a Value, key: u64, item: &'static str) -> Result<&'a Value, RegistryError> {
    value.get(key)?.ok_or(RegistryError::MissingField { item, key })
}

pub(crate) fn fingerprint_value(fp: &[u8; 4]) -> Value {
    Value::Unsigned(u32::from_be_bytes(*fp) as u64)
}

pub(crate) fn fingerprint_from(value: &Value) -> Result<[u8; 4], RegistryError> {
    let n = value.as_u64()?;
    u32::try_from(n)
        .map(u32::to_be_bytes)
        .map_err(|_| RegistryError::InvalidField(format!("fingerprint {n} wider than 32 bits")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untag_rules() {
        let inner = Value::Unsigned(7);
        let tagged = Value::Tag(304, Box::new(inner.clone()));
        assert_eq!(untag(&tagged, 304).unwrap(), &inner);
        assert_eq!(untag(&inner, 304).unwrap(), &inner);
        assert_eq!(untag(&tagged, 305), Err(RegistryError::UnexpectedTag { expected: 305, found: 304 }));
    }

    #[test]
    fn fingerprints() {
        let fp = [0x73, 0xc5, 0xda, 0x0a];
        assert_eq!(fingerprint_value(&fp), Value::Unsigned(0x73c5_da0a));
        assert_eq!(fingerprint_from(&Value::Unsigned(0x73c5_da0a)).unwrap(), fp);
        assert!(fingerprint_from(&Value::Unsigned(1 << 32)).is_err());
    }

    #[test]
    fn registry_from_wrong_transfer() {
        let mut decoder = URDecoder::new();
        let psbt = CryptoPsbt::new(vec![0x70, 0x73, 0x62, 0x74]);
        let part = psbt.ur_encoder().unwrap().next_part();
        decoder.read_part(&part).unwrap();

        assert_eq!(CryptoPsbt::from_ur(&decoder).unwrap(), psbt);
        let err = CryptoBip39::from_ur(&decoder).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let empty = URDecoder::new();
        assert!(matches!(CryptoPsbt::from_ur(&empty), Err(RegistryError::WrongUrType { .. })));
    }
}
