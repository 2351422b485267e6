/*
    Partially signed bitcoin transactions (BIP174).

    The envelope is the magic bytes, a global map holding the unsigned
    transaction and the xpubs it was built from, then one map per input
    and one map per output.
*/

pub mod scope;

use std::io::Read;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    encoding::{compact, Decodable, Encodable, EncodingError},
    error::ErrorKind,
    hdwallet::{HDWError, Xprv, Xpub},
    key::{KeyError, PublicKey},
    script::{Script, ScriptErr, ScriptType, Witness},
    transaction::{Transaction, TxError, TxOut, SIGHASH_ALL},
};

pub use scope::{DerivationPath, InputScope, OutputScope, Record};

pub const MAGIC: [u8; 5] = *b"psbt\xff";

const GLOBAL_UNSIGNED_TX: u8 = 0x00;
const GLOBAL_XPUB: u8 = 0x01;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PsbtError {
    #[error("missing psbt magic bytes")]
    BadMagic,
    #[error("duplicate key {0}")]
    DuplicateKey(String),
    #[error("global map has no unsigned transaction")]
    MissingTx,
    #[error("transaction in the global map carries signatures")]
    SignedTransaction,
    #[error("invalid key {0}")]
    InvalidKey(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("derived key {derived} does not match declared key {declared}")]
    DerivationMismatch { declared: String, derived: String },
    #[error("previous transaction of input {0} does not match its outpoint")]
    UtxoMismatch(usize),
    #[error("input {0} has no utxo information")]
    MissingUtxo(usize),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Transaction(#[from] TxError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    HDWallet(#[from] HDWError),
    #[error(transparent)]
    Script(#[from] ScriptErr),
}

impl PsbtError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PsbtError::DuplicateKey(_)
            | PsbtError::MissingTx
            | PsbtError::SignedTransaction
            | PsbtError::DerivationMismatch { .. }
            | PsbtError::UtxoMismatch(_) => ErrorKind::Protocol,
            PsbtError::MissingUtxo(_) => ErrorKind::Incomplete,
            PsbtError::Transaction(e) => e.kind(),
            PsbtError::Key(e) => e.kind(),
            PsbtError::HDWallet(e) => e.kind(),
            PsbtError::Script(e) => e.kind(),
            _ => ErrorKind::Malformed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Psbt {
    pub tx: Transaction,
    pub xpubs: Vec<(Xpub, DerivationPath)>,
    pub unknown: Vec<Record>,
    pub inputs: Vec<InputScope>,
    pub outputs: Vec<OutputScope>,
}

impl Psbt {
    /**
        Wraps an unsigned transaction. Script sigs and witnesses are stripped,
        every input and output gets an empty scope.
    */
    pub fn from_transaction(mut tx: Transaction) -> Self {
        for input in tx.inputs.iter_mut() {
            input.script_sig = Script::default();
            input.witness = Witness::default();
        }
        Self {
            inputs: vec![InputScope::default(); tx.inputs.len()],
            outputs: vec![OutputScope::default(); tx.outputs.len()],
            xpubs: vec![],
            unknown: vec![],
            tx,
        }
    }

    /**
        The output spent by an input, taken from the witness utxo or
        from the full previous transaction.
    */
    pub fn spent_output(&self, index: usize) -> Result<TxOut, PsbtError> {
        let scope = self.inputs.get(index).ok_or(TxError::InputIndex(index))?;
        if let Some(utxo) = &scope.witness_utxo {
            return Ok(utxo.clone());
        }
        let prev_tx = scope.non_witness_utxo.as_ref().ok_or(PsbtError::MissingUtxo(index))?;
        let outpoint = &self.tx.inputs[index].previous_output;
        if prev_tx.txid() != outpoint.txid {
            return Err(PsbtError::UtxoMismatch(index));
        }
        prev_tx.outputs
            .get(outpoint.vout as usize)
            .cloned()
            .ok_or(PsbtError::UtxoMismatch(index))
    }

    /**
        Signs every input that declares a derivation from the given root.

        Each declared key is re-derived and compared before signing.
        Returns the number of signatures added.
    */
    pub fn sign_with(&mut self, root: &Xprv) -> Result<usize, PsbtError> {
        let fingerprint = root.fingerprint();
        let mut count = 0;

        for index in 0..self.inputs.len() {
            let derivations: Vec<(PublicKey, DerivationPath)> = self.inputs[index]
                .bip32_derivations
                .iter()
                .filter(|(_, d)| d.fingerprint == fingerprint)
                .map(|(k, d)| (*k, d.clone()))
                .collect();

            for (declared, derivation) in derivations {
                let child = root.derive(derivation.path.as_slice())?;
                let derived = child.public_key();
                if derived.compressed_bytes() != declared.compressed_bytes() {
                    warn!(input = index, declared = %declared, derived = %derived, "derivation path mismatch");
                    return Err(PsbtError::DerivationMismatch {
                        declared: declared.to_string(),
                        derived: derived.to_string(),
                    });
                }
                if self.sign_input(index, &child, declared)? {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn sign_input(&mut self, index: usize, key: &Xprv, pubkey: PublicKey) -> Result<bool, PsbtError> {
        let utxo = self.spent_output(index)?;
        let scope = &self.inputs[index];

        if utxo.script_pubkey.script_type() == ScriptType::P2tr {
            //Only untweaked key path outputs belong to this key
            if utxo.script_pubkey != Script::p2tr(&pubkey, None)? {
                return Ok(false);
            }
            let prevouts = (0..self.inputs.len())
                .map(|i| self.spent_output(i))
                .collect::<Result<Vec<_>, _>>()?;
            let sighash = self.tx.sighash_taproot(index, &prevouts)?;
            let sig = key.schnorr_sign(&sighash);
            self.inputs[index].final_scriptwitness = Some(Witness::new(vec![sig.serialize().to_vec()]));
            debug!(input = index, pubkey = %pubkey, "added taproot signature");
            return Ok(true);
        }

        //Script code is the innermost script: witness script, then redeem script, then the output itself
        let script_code = scope.witness_script.clone()
            .or_else(|| scope.redeem_script.clone())
            .unwrap_or_else(|| utxo.script_pubkey.clone());
        let segwit = matches!(script_code.script_type(), ScriptType::P2wpkh | ScriptType::P2wsh)
            || scope.witness_script.is_some()
            || matches!(utxo.script_pubkey.script_type(), ScriptType::P2wpkh | ScriptType::P2wsh);

        let sighash = if segwit {
            let script_code = if script_code.script_type() == ScriptType::P2wpkh {
                Script::p2pkh_from_p2wpkh(&script_code)?
            } else {
                script_code
            };
            self.tx.sighash_segwit(index, &script_code, utxo.value)?
        } else {
            if scope.non_witness_utxo.is_none() {
                return Err(PsbtError::MissingUtxo(index));
            }
            self.tx.sighash_legacy(index, &script_code)?
        };

        let mut sig = key.sign(&sighash).serialize();
        sig.push(SIGHASH_ALL as u8);
        self.inputs[index].partial_sigs.insert(pubkey, sig);
        debug!(input = index, pubkey = %pubkey, segwit, "added signature");
        Ok(true)
    }
}

impl Encodable for Psbt {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        scope::write_record(out, &[GLOBAL_UNSIGNED_TX], &self.tx.serialize());
        for (xpub, derivation) in &self.xpubs {
            let mut key = vec![GLOBAL_XPUB];
            key.extend_from_slice(&xpub.serialize());
            scope::write_record(out, &key, &derivation.serialize());
        }
        for (key, value) in &self.unknown {
            scope::write_record(out, key, value);
        }
        out.push(0x00);

        for input in &self.inputs {
            input.write_to(out);
        }
        for output in &self.outputs {
            output.write_to(out);
        }
    }
}

impl Decodable for Psbt {
    type Error = PsbtError;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        let magic: [u8; 5] = compact::read_array(reader).map_err(|_| PsbtError::BadMagic)?;
        if magic != MAGIC {
            return Err(PsbtError::BadMagic);
        }

        let mut tx = None;
        let mut xpubs = vec![];
        let mut unknown = vec![];
        for (key, value) in scope::read_map(reader)? {
            match key[0] {
                GLOBAL_UNSIGNED_TX if key.len() == 1 => {
                    tx = Some(Transaction::parse(&value)?);
                }
                GLOBAL_XPUB => {
                    let xpub = Xpub::from_bytes(&key[1..])
                        .map_err(|_| PsbtError::InvalidKey(hex::encode(&key)))?;
                    xpubs.push((xpub, DerivationPath::parse(&value)?));
                }
                _ => unknown.push((key, value)),
            }
        }

        let tx = tx.ok_or(PsbtError::MissingTx)?;
        if tx.inputs.iter().any(|i| !i.script_sig.is_empty() || !i.witness.is_empty()) {
            return Err(PsbtError::SignedTransaction);
        }

        let mut inputs = vec![];
        for _ in 0..tx.inputs.len() {
            inputs.push(InputScope::read_from(reader)?);
        }
        let mut outputs = vec![];
        for _ in 0..tx.outputs.len() {
            outputs.push(OutputScope::read_from(reader)?);
        }

        debug!(inputs = inputs.len(), outputs = outputs.len(), xpubs = xpubs.len(), "parsed psbt");
        Ok(Self { tx, xpubs, unknown, inputs, outputs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encoding::VersionPrefix,
        hdwallet::HARDENED,
        transaction::{OutPoint, TxIn},
    };

    fn root() -> Xprv {
        Xprv::from_seed(&[0x42; 32], VersionPrefix::Tprv).unwrap()
    }

    const PATH: [u32; 5] = [84 | HARDENED, 1 | HARDENED, HARDENED, 0, 3];

    /// One input spending a p2wpkh output of the root, one external output
    fn psbt_for(root: &Xprv, spent: Script) -> Psbt {
        let tx = Transaction {
            version: 2,
            inputs: vec![TxIn {
                previous_output: OutPoint { txid: [0x11; 32], vout: 1 },
                script_sig: Script::default(),
                sequence: 0xfffffffd,
                witness: Witness::default(),
            }],
            outputs: vec![TxOut { value: 90_000, script_pubkey: Script::new(vec![0x00, 0x14, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab, 0xab]) }],
            locktime: 0,
        };
        let child = root.derive(PATH).unwrap();

        let mut psbt = Psbt::from_transaction(tx);
        psbt.inputs[0].witness_utxo = Some(TxOut { value: 100_000, script_pubkey: spent });
        psbt.inputs[0].bip32_derivations.insert(
            child.public_key(),
            DerivationPath { fingerprint: root.fingerprint(), path: PATH.to_vec() },
        );
        psbt
    }

    #[test]
    fn round_trip() {
        let root = root();
        let child = root.derive(PATH).unwrap();
        let mut psbt = psbt_for(&root, Script::p2wpkh(&child.public_key()));
        psbt.xpubs.push((root.derive("m/84h/1h/0h").unwrap().to_public().unwrap(), DerivationPath {
            fingerprint: root.fingerprint(),
            path: vec![84 | HARDENED, 1 | HARDENED, HARDENED],
        }));
        psbt.unknown.push((vec![0xfc, 0x00], vec![0x01, 0x02]));

        let bytes = psbt.serialize();
        assert_eq!(&bytes[..5], b"psbt\xff");
        let parsed = Psbt::parse(&bytes).unwrap();
        assert_eq!(parsed, psbt);
        assert_eq!(parsed.serialize(), bytes);
    }

    #[test]
    fn signs_p2wpkh_input() -> Result<(), PsbtError> {
        let root = root();
        let child = root.derive(PATH)?;
        let spent = Script::p2wpkh(&child.public_key());
        let mut psbt = psbt_for(&root, spent.clone());

        assert_eq!(psbt.sign_with(&root)?, 1);

        let sig = &psbt.inputs[0].partial_sigs[&child.public_key()];
        assert_eq!(*sig.last().unwrap(), 0x01);
        let sighash = psbt.tx.sighash_segwit(0, &Script::p2pkh_from_p2wpkh(&spent)?, 100_000)?;
        let der = crate::key::Signature::from_der(&sig[..sig.len() - 1])?;
        assert!(child.public_key().verify(&der, &sighash));
        Ok(())
    }

    #[test]
    fn signs_untweaked_taproot_input() -> Result<(), PsbtError> {
        let root = root();
        let child = root.derive(PATH)?;
        let spent = Script::p2tr(&child.public_key(), None)?;
        let mut psbt = psbt_for(&root, spent.clone());

        assert_eq!(psbt.sign_with(&root)?, 1);

        let witness = psbt.inputs[0].final_scriptwitness.clone().unwrap();
        let sig = crate::key::SchnorrSignature::from_slice(&witness.items[0])?;
        let sighash = psbt.tx.sighash_taproot(0, &[TxOut { value: 100_000, script_pubkey: spent }])?;
        assert!(child.public_key().schnorr_verify(&sig, &sighash));
        Ok(())
    }

    #[test]
    fn foreign_fingerprints_are_skipped() -> Result<(), PsbtError> {
        let root = root();
        let child = root.derive(PATH)?;
        let mut psbt = psbt_for(&root, Script::p2wpkh(&child.public_key()));

        let other = Xprv::from_seed(&[0x07; 32], VersionPrefix::Tprv)?;
        assert_eq!(psbt.sign_with(&other)?, 0);
        assert!(psbt.inputs[0].partial_sigs.is_empty());
        Ok(())
    }

    #[test]
    fn substituted_path_is_rejected() {
        let root = root();
        let child = root.derive(PATH).unwrap();
        let mut psbt = psbt_for(&root, Script::p2wpkh(&child.public_key()));

        //Declare the key under a different path
        let derivation = psbt.inputs[0].bip32_derivations.get_mut(&child.public_key()).unwrap();
        derivation.path[4] = 4;

        let err = psbt.sign_with(&root).unwrap_err();
        assert!(matches!(err, PsbtError::DerivationMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn strict_parsing() {
        //No transaction record
        assert_eq!(Psbt::parse(b"psbt\xff\x00"), Err(PsbtError::MissingTx));
        assert_eq!(Psbt::parse(b"psbu\xff\x00"), Err(PsbtError::BadMagic));

        let root = root();
        let child = root.derive(PATH).unwrap();
        let bytes = psbt_for(&root, Script::p2wpkh(&child.public_key())).serialize();

        let mut trailing = bytes.clone();
        trailing.push(0x00);
        assert_eq!(Psbt::parse(&trailing), Err(PsbtError::Encoding(EncodingError::TrailingBytes(1))));

        //Missing output scope
        assert!(Psbt::parse(&bytes[..bytes.len() - 1]).is_err());

        //Transaction record twice
        let tx = psbt_for(&root, Script::default()).tx.serialize();
        let mut doubled = MAGIC.to_vec();
        scope::write_record(&mut doubled, &[0x00], &tx);
        scope::write_record(&mut doubled, &[0x00], &tx);
        doubled.push(0x00);
        let err = Psbt::parse(&doubled).unwrap_err();
        assert_eq!(err, PsbtError::DuplicateKey("00".to_string()));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn missing_utxo_is_incomplete() {
        let root = root();
        let child = root.derive(PATH).unwrap();
        let mut psbt = psbt_for(&root, Script::p2wpkh(&child.public_key()));
        psbt.inputs[0].witness_utxo = None;

        let err = psbt.sign_with(&root).unwrap_err();
        assert_eq!(err, PsbtError::MissingUtxo(0));
        assert_eq!(err.kind(), ErrorKind::Incomplete);
    }
}
