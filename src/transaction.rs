/*
    Raw bitcoin transactions.

    Parsing and serialization understand the segwit marker and flag.
    Signature hashes are implemented for legacy inputs, segwit v0 inputs (BIP143)
    and taproot key path inputs (BIP341), always committing to all inputs and outputs.
*/

use std::io::Read;

use thiserror::Error;

use crate::{
    encoding::{compact, Decodable, Encodable, EncodingError},
    error::ErrorKind,
    hash,
    script::{Script, Witness},
};

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_DEFAULT: u32 = 0x00;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("unsupported segwit flag {0:#04x}")]
    BadFlag(u8),
    #[error("transaction has no input {0}")]
    InputIndex(usize),
    #[error("expected {expected} previous outputs, found {found}")]
    PrevoutCount { expected: usize, found: usize },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl TxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TxError::InputIndex(_) => ErrorKind::Domain,
            TxError::PrevoutCount { .. } => ErrorKind::Incomplete,
            _ => ErrorKind::Malformed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    /// Transaction id in internal byte order
    pub txid: [u8; 32],
    pub vout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
    pub witness: Witness,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Script,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub locktime: u32,
}

impl Encodable for OutPoint {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.txid);
        out.extend_from_slice(&self.vout.to_le_bytes());
    }
}

impl Decodable for OutPoint {
    type Error = EncodingError;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            txid: compact::read_array(reader)?,
            vout: compact::read_u32_le(reader)?,
        })
    }
}

impl Encodable for TxIn {
    //Witness is serialized separately by the transaction
    fn write_to(&self, out: &mut Vec<u8>) {
        self.previous_output.write_to(out);
        self.script_sig.write_to(out);
        out.extend_from_slice(&self.sequence.to_le_bytes());
    }
}

impl Decodable for TxIn {
    type Error = EncodingError;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            previous_output: OutPoint::read_from(reader)?,
            script_sig: Script::read_from(reader)?,
            sequence: compact::read_u32_le(reader)?,
            witness: Witness::default(),
        })
    }
}

impl Encodable for TxOut {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        self.script_pubkey.write_to(out);
    }
}

impl Decodable for TxOut {
    type Error = EncodingError;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            value: compact::read_u64_le(reader)?,
            script_pubkey: Script::read_from(reader)?,
        })
    }
}

fn read_list<R: Read, T: Decodable<Error = EncodingError>>(reader: &mut R, count: usize) -> Result<Vec<T>, EncodingError> {
    let mut items = vec![];
    for _ in 0..count {
        items.push(T::read_from(reader)?);
    }
    Ok(items)
}

fn write_list<T: Encodable>(out: &mut Vec<u8>, items: &[T]) {
    out.extend_from_slice(&compact::to_bytes(items.len() as u64));
    for item in items {
        item.write_to(out);
    }
}

impl Transaction {
    pub fn is_segwit(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    /// Serialization without witness data, as hashed for the txid
    pub fn serialize_legacy(&self) -> Vec<u8> {
        let mut out = vec![];
        out.extend_from_slice(&self.version.to_le_bytes());
        write_list(&mut out, &self.inputs);
        write_list(&mut out, &self.outputs);
        out.extend_from_slice(&self.locktime.to_le_bytes());
        out
    }

    /// Transaction id in internal byte order
    pub fn txid(&self) -> [u8; 32] {
        hash::sha256d(self.serialize_legacy())
    }

    pub fn wtxid(&self) -> [u8; 32] {
        hash::sha256d(self.serialize())
    }

    /// Transaction id as displayed by block explorers (byte reversed)
    pub fn txid_hex(&self) -> String {
        let mut txid = self.txid();
        txid.reverse();
        hex::encode(txid)
    }

    fn input(&self, index: usize) -> Result<&TxIn, TxError> {
        self.inputs.get(index).ok_or(TxError::InputIndex(index))
    }

    /**
        Legacy SIGHASH_ALL signature hash.
        Every scriptSig is emptied except the signed one which is replaced by the script code.
    */
    pub fn sighash_legacy(&self, index: usize, script_code: &Script) -> Result<[u8; 32], TxError> {
        self.input(index)?;

        let mut tx = self.clone();
        for (i, input) in tx.inputs.iter_mut().enumerate() {
            input.script_sig = if i == index { script_code.clone() } else { Script::default() };
            input.witness = Witness::default();
        }

        let mut preimage = tx.serialize_legacy();
        preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
        Ok(hash::sha256d(preimage))
    }

    /**
        BIP143 SIGHASH_ALL signature hash for segwit v0 inputs.
        The value is the amount of the output being spent.
    */
    pub fn sighash_segwit(&self, index: usize, script_code: &Script, value: u64) -> Result<[u8; 32], TxError> {
        let input = self.input(index)?;

        let mut prevouts = vec![];
        let mut sequences = vec![];
        for i in &self.inputs {
            i.previous_output.write_to(&mut prevouts);
            sequences.extend_from_slice(&i.sequence.to_le_bytes());
        }
        let mut outputs = vec![];
        for o in &self.outputs {
            o.write_to(&mut outputs);
        }

        let mut preimage = vec![];
        preimage.extend_from_slice(&self.version.to_le_bytes());
        preimage.extend_from_slice(&hash::sha256d(prevouts));
        preimage.extend_from_slice(&hash::sha256d(sequences));
        input.previous_output.write_to(&mut preimage);
        script_code.write_to(&mut preimage);
        preimage.extend_from_slice(&value.to_le_bytes());
        preimage.extend_from_slice(&input.sequence.to_le_bytes());
        preimage.extend_from_slice(&hash::sha256d(outputs));
        preimage.extend_from_slice(&self.locktime.to_le_bytes());
        preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());

        Ok(hash::sha256d(preimage))
    }

    /**
        BIP341 key path signature hash with SIGHASH_DEFAULT.
        Needs the outputs spent by every input, in input order.
    */
    pub fn sighash_taproot(&self, index: usize, prevouts: &[TxOut]) -> Result<[u8; 32], TxError> {
        self.input(index)?;
        if prevouts.len() != self.inputs.len() {
            return Err(TxError::PrevoutCount { expected: self.inputs.len(), found: prevouts.len() });
        }

        let mut outpoints = vec![];
        let mut sequences = vec![];
        for i in &self.inputs {
            i.previous_output.write_to(&mut outpoints);
            sequences.extend_from_slice(&i.sequence.to_le_bytes());
        }
        let mut amounts = vec![];
        let mut script_pubkeys = vec![];
        for p in prevouts {
            amounts.extend_from_slice(&p.value.to_le_bytes());
            p.script_pubkey.write_to(&mut script_pubkeys);
        }
        let mut outputs = vec![];
        for o in &self.outputs {
            o.write_to(&mut outputs);
        }

        //Epoch and hash type
        let mut msg = vec![0x00, SIGHASH_DEFAULT as u8];
        msg.extend_from_slice(&self.version.to_le_bytes());
        msg.extend_from_slice(&self.locktime.to_le_bytes());
        msg.extend_from_slice(&hash::sha256(outpoints));
        msg.extend_from_slice(&hash::sha256(amounts));
        msg.extend_from_slice(&hash::sha256(script_pubkeys));
        msg.extend_from_slice(&hash::sha256(sequences));
        msg.extend_from_slice(&hash::sha256(outputs));
        //Key path spend without annex
        msg.push(0x00);
        msg.extend_from_slice(&(index as u32).to_le_bytes());

        Ok(hash::tagged_hash("TapSighash", &msg))
    }
}

impl Encodable for Transaction {
    fn write_to(&self, out: &mut Vec<u8>) {
        if !self.is_segwit() {
            out.extend_from_slice(&self.serialize_legacy());
            return;
        }

        out.extend_from_slice(&self.version.to_le_bytes());
        //Marker and flag
        out.extend_from_slice(&[0x00, 0x01]);
        write_list(out, &self.inputs);
        write_list(out, &self.outputs);
        for input in &self.inputs {
            input.witness.write_to(out);
        }
        out.extend_from_slice(&self.locktime.to_le_bytes());
    }
}

impl Decodable for Transaction {
    type Error = TxError;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        let version = compact::read_u32_le(reader)?;

        let mut count = compact::read_len(reader)?;
        let segwit = count == 0;
        if segwit {
            let flag = compact::read_array::<_, 1>(reader)?[0];
            if flag != 0x01 {
                return Err(TxError::BadFlag(flag));
            }
            count = compact::read_len(reader)?;
        }

        let mut inputs: Vec<TxIn> = read_list(reader, count)?;
        let output_count = compact::read_len(reader)?;
        let outputs: Vec<TxOut> = read_list(reader, output_count)?;

        if segwit {
            for input in inputs.iter_mut() {
                input.witness = Witness::read_from(reader)?;
            }
        }
        let locktime = compact::read_u32_le(reader)?;

        Ok(Self { version, inputs, outputs, locktime })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::PrivateKey;

    const UNSIGNED: &str = "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000";

    fn unsigned() -> Transaction {
        Transaction::parse(&hex::decode(UNSIGNED).unwrap()).unwrap()
    }

    #[test]
    fn parse_legacy_layout() {
        let tx = unsigned();
        assert_eq!(tx.version, 1);
        assert_eq!(tx.inputs.len(), 2);
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.inputs[0].sequence, 0xffffffee);
        assert_eq!(tx.outputs[0].value, 112340000);
        assert_eq!(tx.locktime, 17);
        assert!(!tx.is_segwit());

        assert_eq!(hex::encode(tx.serialize()), UNSIGNED);
        assert_eq!(tx.txid_hex(), "3335ffae0df20c5407e8de12b49405c8e912371f00fe4132bfaf95ad49c40243");
        assert_eq!(tx.txid(), tx.wtxid());
    }

    #[test]
    fn bip143_native_p2wpkh() -> Result<(), TxError> {
        let tx = unsigned();
        let script_code = Script::new(hex::decode("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac").unwrap());
        let sighash = tx.sighash_segwit(1, &script_code, 600000000)?;
        assert_eq!(hex::encode(sighash), "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670");
        Ok(())
    }

    #[test]
    fn legacy_sighash() -> Result<(), TxError> {
        let tx = unsigned();
        let script_code = Script::new(hex::decode("2103c9f4836b9a4f77fc0d81f7bcb01b7f1b35916864b9476c241ce9fc198bd25432ac").unwrap());
        let sighash = tx.sighash_legacy(0, &script_code)?;
        assert_eq!(hex::encode(sighash), "63cec688ee06a91e913875356dd4dea2f8e0f2a2659885372da2a37e32c7532e");
        assert_eq!(tx.sighash_legacy(2, &script_code), Err(TxError::InputIndex(2)));
        Ok(())
    }

    #[test]
    fn segwit_round_trip() {
        let mut tx = unsigned();
        tx.inputs[1].witness = Witness::new(vec![vec![0x30; 71], vec![0x02; 33]]);
        assert!(tx.is_segwit());

        let bytes = tx.serialize();
        assert_eq!(&bytes[4..6], &[0x00, 0x01]);
        let parsed = Transaction::parse(&bytes).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(parsed.inputs[0].witness, Witness::default());

        //Witness data does not change the txid
        assert_eq!(parsed.txid(), unsigned().txid());
        assert_ne!(parsed.wtxid(), parsed.txid());
    }

    #[test]
    fn malformed_transactions() {
        let bytes = hex::decode(UNSIGNED).unwrap();
        assert!(Transaction::parse(&bytes[..bytes.len() - 1]).is_err());

        let mut trailing = bytes.clone();
        trailing.push(0x00);
        assert_eq!(
            Transaction::parse(&trailing),
            Err(TxError::Encoding(EncodingError::TrailingBytes(1)))
        );

        let mut bad_flag = bytes[..4].to_vec();
        bad_flag.extend_from_slice(&[0x00, 0x02]);
        assert_eq!(Transaction::parse(&bad_flag), Err(TxError::BadFlag(0x02)));
    }

    #[test]
    fn taproot_sighash_signs_and_verifies() -> Result<(), TxError> {
        let tx = unsigned();
        let key = PrivateKey::from_slice(&[0x05; 32]).unwrap();
        let spent = Script::p2tr(&key.get_public_key(), None).unwrap();
        let prevouts = vec![
            TxOut { value: 625000000, script_pubkey: spent.clone() },
            TxOut { value: 600000000, script_pubkey: spent },
        ];

        let sighash = tx.sighash_taproot(0, &prevouts)?;
        let sig = key.schnorr_sign(&sighash);
        assert!(key.get_public_key().schnorr_verify(&sig, &sighash));

        //Commits to the input index and the spent amounts
        assert_ne!(tx.sighash_taproot(1, &prevouts)?, sighash);
        let mut cheaper = prevouts.clone();
        cheaper[0].value -= 1;
        assert_ne!(tx.sighash_taproot(0, &cheaper)?, sighash);

        let err = tx.sighash_taproot(0, &prevouts[..1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Incomplete);
        Ok(())
    }
}
