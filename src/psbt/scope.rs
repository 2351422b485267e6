/*
    Key-value maps of a PSBT and the typed records
    of the per-input and per-output scopes.
*/

use std::{
    collections::{BTreeMap, HashSet},
    io::Read,
};

use crate::{
    encoding::{compact, Decodable, Encodable, EncodingError},
    key::PublicKey,
    psbt::PsbtError,
    script::{Script, Witness},
    transaction::{Transaction, TxOut},
};

pub type Record = (Vec<u8>, Vec<u8>);

/**
    Reads records until the zero length key that terminates a map.
    A key that appears twice in the same map is an error.
*/
pub fn read_map<R: Read>(reader: &mut R) -> Result<Vec<Record>, PsbtError> {
    let mut seen = HashSet::new();
    let mut records = vec![];
    loop {
        let key = compact::read_string(reader)?;
        if key.is_empty() {
            return Ok(records);
        }
        if !seen.insert(key.clone()) {
            return Err(PsbtError::DuplicateKey(hex::encode(&key)));
        }
        let value = compact::read_string(reader)?;
        records.push((key, value));
    }
}

pub fn write_record(out: &mut Vec<u8>, key: &[u8], value: &[u8]) {
    compact::write_string(out, key);
    compact::write_string(out, value);
}

fn keyed(key_type: u8, data: &[u8]) -> Vec<u8> {
    let mut key = vec![key_type];
    key.extend_from_slice(data);
    key
}

/// Records whose key is just the type byte
fn expect_bare_key(key: &[u8]) -> Result<(), PsbtError> {
    if key.len() != 1 {
        return Err(PsbtError::InvalidKey(hex::encode(key)));
    }
    Ok(())
}

fn key_pubkey(key: &[u8]) -> Result<PublicKey, PsbtError> {
    PublicKey::from_sec(&key[1..]).map_err(|_| PsbtError::InvalidKey(hex::encode(key)))
}

/**
    Origin of a key: master fingerprint followed by the derivation indices.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    pub fingerprint: [u8; 4],
    pub path: Vec<u32>,
}

impl DerivationPath {
    pub fn parse(value: &[u8]) -> Result<Self, PsbtError> {
        if value.len() < 4 || value.len() % 4 != 0 {
            return Err(PsbtError::InvalidValue(format!("derivation path of {} bytes", value.len())));
        }
        let mut fingerprint = [0u8; 4];
        fingerprint.copy_from_slice(&value[..4]);
        let path = value[4..]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { fingerprint, path })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.fingerprint.to_vec();
        for index in &self.path {
            out.extend_from_slice(&index.to_le_bytes());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputScope {
    pub non_witness_utxo: Option<Transaction>,
    pub witness_utxo: Option<TxOut>,
    /// Signature with its sighash byte appended, keyed by public key
    pub partial_sigs: BTreeMap<PublicKey, Vec<u8>>,
    pub sighash_type: Option<u32>,
    pub redeem_script: Option<Script>,
    pub witness_script: Option<Script>,
    pub bip32_derivations: BTreeMap<PublicKey, DerivationPath>,
    pub final_scriptsig: Option<Script>,
    pub final_scriptwitness: Option<Witness>,
    pub unknown: Vec<Record>,
}

impl InputScope {
    pub const NON_WITNESS_UTXO: u8 = 0x00;
    pub const WITNESS_UTXO: u8 = 0x01;
    pub const PARTIAL_SIG: u8 = 0x02;
    pub const SIGHASH_TYPE: u8 = 0x03;
    pub const REDEEM_SCRIPT: u8 = 0x04;
    pub const WITNESS_SCRIPT: u8 = 0x05;
    pub const BIP32_DERIVATION: u8 = 0x06;
    pub const FINAL_SCRIPTSIG: u8 = 0x07;
    pub const FINAL_SCRIPTWITNESS: u8 = 0x08;

    pub fn is_finalized(&self) -> bool {
        self.final_scriptsig.is_some() || self.final_scriptwitness.is_some()
    }
}

impl Decodable for InputScope {
    type Error = PsbtError;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        let mut scope = Self::default();
        for (key, value) in read_map(reader)? {
            match key[0] {
                Self::NON_WITNESS_UTXO => {
                    expect_bare_key(&key)?;
                    scope.non_witness_utxo = Some(Transaction::parse(&value)?);
                }
                Self::WITNESS_UTXO => {
                    expect_bare_key(&key)?;
                    scope.witness_utxo = Some(TxOut::parse(&value)?);
                }
                Self::PARTIAL_SIG => {
                    scope.partial_sigs.insert(key_pubkey(&key)?, value);
                }
                Self::SIGHASH_TYPE => {
                    expect_bare_key(&key)?;
                    if value.len() != 4 {
                        return Err(EncodingError::InvalidLength { expected: 4, found: value.len() }.into());
                    }
                    scope.sighash_type = Some(u32::from_le_bytes([value[0], value[1], value[2], value[3]]));
                }
                Self::REDEEM_SCRIPT => {
                    expect_bare_key(&key)?;
                    scope.redeem_script = Some(Script::new(value));
                }
                Self::WITNESS_SCRIPT => {
                    expect_bare_key(&key)?;
                    scope.witness_script = Some(Script::new(value));
                }
                Self::BIP32_DERIVATION => {
                    scope.bip32_derivations.insert(key_pubkey(&key)?, DerivationPath::parse(&value)?);
                }
                Self::FINAL_SCRIPTSIG => {
                    expect_bare_key(&key)?;
                    scope.final_scriptsig = Some(Script::new(value));
                }
                Self::FINAL_SCRIPTWITNESS => {
                    expect_bare_key(&key)?;
                    scope.final_scriptwitness = Some(Witness::parse(&value)?);
                }
                _ => scope.unknown.push((key, value)),
            }
        }
        Ok(scope)
    }
}

impl Encodable for InputScope {
    fn write_to(&self, out: &mut Vec<u8>) {
        if let Some(tx) = &self.non_witness_utxo {
            write_record(out, &[Self::NON_WITNESS_UTXO], &tx.serialize());
        }
        if let Some(utxo) = &self.witness_utxo {
            write_record(out, &[Self::WITNESS_UTXO], &utxo.serialize());
        }
        for (pubkey, sig) in &self.partial_sigs {
            write_record(out, &keyed(Self::PARTIAL_SIG, &pubkey.sec()), sig);
        }
        if let Some(sighash) = self.sighash_type {
            write_record(out, &[Self::SIGHASH_TYPE], &sighash.to_le_bytes());
        }
        if let Some(script) = &self.redeem_script {
            write_record(out, &[Self::REDEEM_SCRIPT], &script.data);
        }
        if let Some(script) = &self.witness_script {
            write_record(out, &[Self::WITNESS_SCRIPT], &script.data);
        }
        for (pubkey, derivation) in &self.bip32_derivations {
            write_record(out, &keyed(Self::BIP32_DERIVATION, &pubkey.sec()), &derivation.serialize());
        }
        if let Some(script) = &self.final_scriptsig {
            write_record(out, &[Self::FINAL_SCRIPTSIG], &script.data);
        }
        if let Some(witness) = &self.final_scriptwitness {
            write_record(out, &[Self::FINAL_SCRIPTWITNESS], &witness.serialize());
        }
        for (key, value) in &self.unknown {
            write_record(out, key, value);
        }
        out.push(0x00);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputScope {
    pub redeem_script: Option<Script>,
    pub witness_script: Option<Script>,
    pub bip32_derivations: BTreeMap<PublicKey, DerivationPath>,
    pub unknown: Vec<Record>,
}

impl OutputScope {
    pub const REDEEM_SCRIPT: u8 = 0x00;
    pub const WITNESS_SCRIPT: u8 = 0x01;
    pub const BIP32_DERIVATION: u8 = 0x02;
}

impl Decodable for OutputScope {
    type Error = PsbtError;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        let mut scope = Self::default();
        for (key, value) in read_map(reader)? {
            match key[0] {
                Self::REDEEM_SCRIPT => {
                    expect_bare_key(&key)?;
                    scope.redeem_script = Some(Script::new(value));
                }
                Self::WITNESS_SCRIPT => {
                    expect_bare_key(&key)?;
                    scope.witness_script = Some(Script::new(value));
                }
                Self::BIP32_DERIVATION => {
                    scope.bip32_derivations.insert(key_pubkey(&key)?, DerivationPath::parse(&value)?);
                }
                _ => scope.unknown.push((key, value)),
            }
        }
        Ok(scope)
    }
}

impl Encodable for OutputScope {
    fn write_to(&self, out: &mut Vec<u8>) {
        if let Some(script) = &self.redeem_script {
            write_record(out, &[Self::REDEEM_SCRIPT], &script.data);
        }
        if let Some(script) = &self.witness_script {
            write_record(out, &[Self::WITNESS_SCRIPT], &script.data);
        }
        for (pubkey, derivation) in &self.bip32_derivations {
            write_record(out, &keyed(Self::BIP32_DERIVATION, &pubkey.sec()), &derivation.serialize());
        }
        for (key, value) in &self.unknown {
            write_record(out, key, value);
        }
        out.push(0x00);
    }
}
