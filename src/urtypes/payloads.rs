/*
    Registry items that wrap a payload defined elsewhere: a mnemonic
    phrase and a serialized PSBT.
*/

use crate::{
    cbor::Value,
    encoding::{Decodable, Encodable},
    mnemonic::mnemonic_to_entropy,
    psbt::Psbt,
    urtypes::{required, untag, RegistryError, RegistryItem, RegistryType, CRYPTO_BIP39, CRYPTO_PSBT},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoBip39 {
    pub words: Vec<String>,
    /// Language code, english when absent
    pub lang: Option<String>,
}

impl CryptoBip39 {
    pub fn from_phrase(phrase: &str) -> Self {
        Self { words: phrase.split_whitespace().map(str::to_string).collect(), lang: None }
    }

    pub fn phrase(&self) -> String {
        self.words.join(" ")
    }

    /// Checks the phrase and returns the entropy it encodes.
    pub fn entropy(&self) -> Result<Vec<u8>, RegistryError> {
        Ok(mnemonic_to_entropy(&self.phrase())?)
    }
}

impl RegistryItem for CryptoBip39 {
    const REGISTRY_TYPE: RegistryType = CRYPTO_BIP39;

    fn to_value(&self) -> Value {
        let words = self.words.iter().map(|w| Value::Text(w.clone())).collect();
        let mut map = vec![(Value::Unsigned(1), Value::Array(words))];
        if let Some(lang) = &self.lang {
            map.push((Value::Unsigned(2), Value::Text(lang.clone())));
        }
        Value::Map(map)
    }

    fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let value = untag(value, CRYPTO_BIP39.tag)?;
        let words = required(value, 1, "crypto-bip39")?
            .as_array()?
            .iter()
            .map(|w| w.as_text().map(str::to_string))
            .collect::<Result<_, _>>()?;
        let lang = value.get(2)?.map(Value::as_text).transpose()?.map(str::to_string);
        Ok(Self { words, lang })
    }
}

/// A PSBT as a CBOR byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoPsbt {
    pub data: Vec<u8>,
}

impl CryptoPsbt {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn from_psbt(psbt: &Psbt) -> Self {
        Self { data: psbt.serialize() }
    }

    pub fn to_psbt(&self) -> Result<Psbt, RegistryError> {
        Ok(Psbt::parse(&self.data)?)
    }
}

impl RegistryItem for CryptoPsbt {
    const REGISTRY_TYPE: RegistryType = CRYPTO_PSBT;

    fn to_value(&self) -> Value {
        Value::Bytes(self.data.clone())
    }

    fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let value = untag(value, CRYPTO_PSBT.tag)?;
        Ok(Self { data: value.as_bytes()?.to_vec() })
    }
}
