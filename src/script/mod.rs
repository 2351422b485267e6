/*
    Module implements output scripts.

    Scripts are never executed. They are built from keys and hashes
    and classified by matching them against the standard templates.
*/

pub mod builder;
pub mod witness;

use std::io::Read;

use thiserror::Error;

use crate::{
    encoding::{base58::Base58, bech32, compact, Decodable, Encodable, EncodingError},
    error::ErrorKind,
    hash,
    key::{self, KeyError, PublicKey},
    network::Network,
};

pub use builder::{opcodes, Builder as ScriptBuilder, Opcode};
pub use witness::Witness;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptErr {
    #[error("multisig needs 1 <= m <= n <= 16, got {m} of {n}")]
    BadMultisig { m: usize, n: usize },
    #[error("script has no address representation")]
    NoAddress,
    #[error("address {0} is not valid for this network")]
    BadNetwork(String),
    #[error("unsupported address: {0}")]
    BadAddress(String),
    #[error("expected a {0} script")]
    WrongType(&'static str),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl ScriptErr {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptErr::BadMultisig { .. } | ScriptErr::NoAddress => ErrorKind::Domain,
            ScriptErr::Key(e) => e.kind(),
            _ => ErrorKind::Malformed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Script {
    pub data: Vec<u8>
}

impl Script {
    /**
        Create a new instance of self
    */
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /**
        Classifies the script by its template.
    */
    pub fn script_type(&self) -> ScriptType {
        let d = &self.data;
        match d.len() {
            25 if d[..3] == [0x76, 0xa9, 0x14] && d[23..] == [0x88, 0xac] => ScriptType::P2pkh,
            23 if d[..2] == [0xa9, 0x14] && d[22] == 0x87 => ScriptType::P2sh,
            22 if d[..2] == [0x00, 0x14] => ScriptType::P2wpkh,
            34 if d[..2] == [0x00, 0x20] => ScriptType::P2wsh,
            34 if d[..2] == [0x51, 0x20] => ScriptType::P2tr,
            _ => ScriptType::Unknown,
        }
    }

    /**
        Encodes the script as an address for the given network.
        Legacy scripts use Base58Check, witness scripts use Bech32 or Bech32m.
    */
    pub fn address(&self, network: Network) -> Result<String, ScriptErr> {
        let params = network.params();
        let d = &self.data;
        Ok(match self.script_type() {
            ScriptType::P2pkh => Base58::new(Some(&[params.p2pkh]), &d[3..23]).check_encode(),
            ScriptType::P2sh => Base58::new(Some(&[params.p2sh]), &d[2..22]).check_encode(),
            ScriptType::P2wpkh | ScriptType::P2wsh => bech32::encode(params.hrp, 0, &d[2..])?,
            ScriptType::P2tr => bech32::encode(params.hrp, 1, &d[2..])?,
            ScriptType::Unknown => return Err(ScriptErr::NoAddress),
        })
    }

    /**
        Inverse of address(). The address must belong to the given network.
    */
    pub fn from_address(address: &str, network: Network) -> Result<Self, ScriptErr> {
        let params = network.params();
        if let Ok((hrp, version, program)) = bech32::decode(address) {
            if hrp != params.hrp {
                return Err(ScriptErr::BadNetwork(address.to_string()));
            }
            return Ok(ScriptBuilder::new()
                .push_int(version)
                .push_data(&program)
                .into_script());
        }

        let data = Base58::check_decode(address)?;
        if data.len() != 21 {
            return Err(ScriptErr::BadAddress(address.to_string()));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&data[1..]);
        match data[0] {
            p if p == params.p2pkh => Ok(Self::p2pkh_from_hash(&hash)),
            p if p == params.p2sh => Ok(Self::p2sh_from_hash(&hash)),
            _ => Err(ScriptErr::BadNetwork(address.to_string())),
        }
    }

    /// P2PKH script pub key
    /// OP_DUP OP_HASH160 <Pubkey Hash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn p2pkh(pubkey: &PublicKey) -> Self {
        Self::p2pkh_from_hash(&pubkey.hash160())
    }

    pub fn p2pkh_from_hash(hash: &[u8; 20]) -> Self {
        ScriptBuilder::new()
            .push_opcode(opcodes::OP_DUP)
            .push_opcode(opcodes::OP_HASH160)
            .push_data(hash)
            .push_opcode(opcodes::OP_EQUALVERIFY)
            .push_opcode(opcodes::OP_CHECKSIG)
            .into_script()
    }

    /// P2SH script pub key
    /// OP_HASH160 <Hash160(redeemScript)> OP_EQUAL
    pub fn p2sh(script: &Self) -> Self {
        Self::p2sh_from_hash(&hash::hash160(&script.data))
    }

    pub fn p2sh_from_hash(hash: &[u8; 20]) -> Self {
        ScriptBuilder::new()
            .push_opcode(opcodes::OP_HASH160)
            .push_data(hash)
            .push_opcode(opcodes::OP_EQUAL)
            .into_script()
    }

    /// P2WPKH script pub key
    /// 0x0014 <20-byte-pubkey-hash>
    pub fn p2wpkh(pubkey: &PublicKey) -> Self {
        ScriptBuilder::new()
            .push_opcode(opcodes::OP_0)
            .push_opcode(opcodes::OP_PUSHBYTES_20)
            .push_slice(&pubkey.hash160())
            .into_script()
    }

    /// P2WSH script pub key
    /// 0x0020 <32-byte-script-hash>
    pub fn p2wsh(script: &Self) -> Self {
        ScriptBuilder::new()
            .push_opcode(opcodes::OP_0)
            .push_opcode(opcodes::OP_PUSHBYTES_32)
            .push_slice(&hash::sha256(&script.data))
            .into_script()
    }

    /**
        P2TR script pub key
        0x5120 <32-byte-xonly-key>

        Without a tweak the internal key is used as the output key.
        With a tweak the output key is internal + tagged_hash("TapTweak", xonly || tweak) * G.
    */
    pub fn p2tr(pubkey: &PublicKey, tweak: Option<&[u8]>) -> Result<Self, ScriptErr> {
        let internal = pubkey.xonly();
        let output = match tweak {
            None => internal,
            Some(t) => {
                let mut msg = internal.to_vec();
                msg.extend_from_slice(t);
                key::xonly_tweak_add(&internal, &hash::tagged_hash("TapTweak", &msg))?
            }
        };

        Ok(ScriptBuilder::new()
            .push_opcode(opcodes::OP_1)
            .push_opcode(opcodes::OP_PUSHBYTES_32)
            .push_slice(&output)
            .into_script())
    }

    /**
        The P2PKH script code that BIP143 signs for a P2WPKH output.
    */
    pub fn p2pkh_from_p2wpkh(script: &Self) -> Result<Self, ScriptErr> {
        if script.script_type() != ScriptType::P2wpkh {
            return Err(ScriptErr::WrongType("p2wpkh"));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&script.data[2..]);
        Ok(Self::p2pkh_from_hash(&hash))
    }

    ///Creates the redeem script for a m-of-n multisig wallet.
    ///Keys are used in the given order.
    pub fn multisig(m: usize, keys: &[PublicKey]) -> Result<Self, ScriptErr> {
        let n = keys.len();
        if m < 1 || m > n || n > 16 {
            return Err(ScriptErr::BadMultisig { m, n });
        }

        let mut builder = ScriptBuilder::new().push_int(m as u8);
        for key in keys {
            builder = builder.push_data(&key.sec());
        }

        Ok(builder
            .push_int(n as u8)
            .push_opcode(opcodes::OP_CHECKMULTISIG)
            .into_script())
    }

    ///BIP-67 multisig, keys sorted lexicographically by their serialization
    pub fn sorted_multisig(m: usize, keys: &[PublicKey]) -> Result<Self, ScriptErr> {
        let mut keys = keys.to_vec();
        keys.sort();
        Self::multisig(m, &keys)
    }

    /// <signature> <pubkey>
    pub fn script_sig_p2pkh(signature: &[u8], pubkey: &PublicKey) -> Self {
        ScriptBuilder::new()
            .push_data(signature)
            .push_data(&pubkey.sec())
            .into_script()
    }

    /// Pushes the redeem script, as used by nested segwit inputs
    pub fn script_sig_p2sh(redeem_script: &Self) -> Self {
        ScriptBuilder::new()
            .push_data(&redeem_script.data)
            .into_script()
    }

    pub fn witness_p2wpkh(signature: &[u8], pubkey: &PublicKey) -> Witness {
        Witness::new(vec![signature.to_vec(), pubkey.sec()])
    }
}

impl Encodable for Script {
    fn write_to(&self, out: &mut Vec<u8>) {
        compact::write_string(out, &self.data);
    }
}

impl Decodable for Script {
    type Error = EncodingError;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self::new(compact::read_string(reader)?))
    }
}

impl From<Vec<u8>> for Script {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
