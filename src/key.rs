use std::{cmp::Ordering, fmt};

use secp256k1::{
    ecdsa, schnorr, Keypair, Message, Scalar, SecretKey, XOnlyPublicKey, SECP256K1,
};
use thiserror::Error;

use crate::{
    encoding::{base58::Base58, EncodingError},
    error::ErrorKind,
    hash,
    network::Network,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("scalar is zero or not below the curve order")]
    InvalidScalar,
    #[error("invalid public key encoding")]
    InvalidPublicKey,
    #[error("invalid signature encoding")]
    InvalidSignature,
    #[error("tweak produced an invalid key")]
    InvalidTweak,
    #[error("unknown WIF prefix {0:#04x}")]
    UnknownWifPrefix(u8),
    #[error("WIF payload has length {0}")]
    BadWifLength(usize),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl KeyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyError::InvalidScalar | KeyError::InvalidTweak => ErrorKind::Domain,
            _ => ErrorKind::Malformed,
        }
    }
}

/**
    Behaviour shared by the two kinds of key an extended key can wrap.
*/
pub trait Key: Sized + Clone {
    /// The 33 byte key field of a serialized extended key.
    fn key_data(&self) -> [u8; 33];

    fn from_key_data(data: &[u8]) -> Result<Self, KeyError>;

    fn public_key(&self) -> PublicKey;

    /// Private keys add the tweak to the scalar, public keys add tweak*G to the point.
    fn add_tweak(&self, tweak: &[u8; 32]) -> Result<Self, KeyError>;

    /// 0x00 || scalar for hardened derivation. None when there is no private material.
    fn hardened_data(&self) -> Option<[u8; 33]>;
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PrivateKey {
    secret: SecretKey,
    pub compressed: bool,
}

impl PrivateKey {
    /**
        Generates a new random private key using the thread rng.
    */
    pub fn new_rand() -> Self {
        Self {
            secret: SecretKey::new(&mut rand::thread_rng()),
            compressed: true,
        }
    }

    /**
        Use a predefined byte array as a secret key.
        Fails if the scalar is zero or not below the curve order.
    */
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != 32 {
            return Err(EncodingError::InvalidLength { expected: 32, found: bytes.len() }.into());
        }
        let secret = SecretKey::from_slice(bytes).map_err(|_| KeyError::InvalidScalar)?;
        Ok(Self { secret, compressed: true })
    }

    pub fn serialize(&self) -> [u8; 32] {
        self.secret.secret_bytes()
    }

    pub fn get_public_key(&self) -> PublicKey {
        PublicKey {
            point: secp256k1::PublicKey::from_secret_key(SECP256K1, &self.secret),
            compressed: self.compressed,
        }
    }

    /*
        Export the private key in wallet-import-format (Base58Check Encoded with prefix)
    */
    pub fn to_wif(&self, network: Network) -> String {
        let mut key: Vec<u8> = self.serialize().to_vec();
        if self.compressed {
            key.push(0x01);
        }
        Base58::new(Some(&[network.params().wif]), &key).check_encode()
    }

    /**
        Import a WIF key from any network. The compression flag is taken from the payload.
    */
    pub fn from_wif(wif: &str) -> Result<Self, KeyError> {
        let data = Base58::check_decode(wif)?;
        let (prefix, payload) = data.split_first().ok_or(KeyError::BadWifLength(0))?;
        if *prefix != Network::Mainnet.params().wif && *prefix != Network::Testnet.params().wif {
            return Err(KeyError::UnknownWifPrefix(*prefix));
        }
        let compressed = match payload.len() {
            32 => false,
            33 if payload[32] == 0x01 => true,
            n => return Err(KeyError::BadWifLength(n)),
        };
        let mut key = Self::from_slice(&payload[..32])?;
        key.compressed = compressed;
        Ok(key)
    }

    /// ECDSA signature of a 32 byte message hash. Always low-S.
    pub fn sign(&self, msg_hash: &[u8; 32]) -> Signature {
        let msg = Message::from_digest(*msg_hash);
        Signature(SECP256K1.sign_ecdsa(&msg, &self.secret))
    }

    /// BIP340 signature over a 32 byte message without auxiliary randomness.
    pub fn schnorr_sign(&self, msg_hash: &[u8; 32]) -> SchnorrSignature {
        let msg = Message::from_digest(*msg_hash);
        let keypair = Keypair::from_secret_key(SECP256K1, &self.secret);
        SchnorrSignature(SECP256K1.sign_schnorr_no_aux_rand(&msg, &keypair))
    }
}

impl Key for PrivateKey {
    fn key_data(&self) -> [u8; 33] {
        let mut data = [0u8; 33];
        data[1..].copy_from_slice(&self.serialize());
        data
    }

    fn from_key_data(data: &[u8]) -> Result<Self, KeyError> {
        match data {
            [0x00, rest @ ..] if rest.len() == 32 => Self::from_slice(rest),
            _ => Err(KeyError::InvalidScalar),
        }
    }

    fn public_key(&self) -> PublicKey {
        self.get_public_key()
    }

    fn add_tweak(&self, tweak: &[u8; 32]) -> Result<Self, KeyError> {
        let scalar = Scalar::from_be_bytes(*tweak).map_err(|_| KeyError::InvalidTweak)?;
        let secret = self.secret.add_tweak(&scalar).map_err(|_| KeyError::InvalidTweak)?;
        Ok(Self { secret, compressed: self.compressed })
    }

    fn hardened_data(&self) -> Option<[u8; 33]> {
        Some(self.key_data())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        //Never print the scalar
        write!(f, "PrivateKey({})", self.get_public_key())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    point: secp256k1::PublicKey,
    pub compressed: bool,
}

impl PublicKey {
    /**
        Parses a SEC encoded key. 33 bytes for compressed keys,
        65 bytes for uncompressed ones. Hybrid 0x06/0x07 encodings are refused.
    */
    pub fn from_sec(bytes: &[u8]) -> Result<Self, KeyError> {
        match (bytes.first(), bytes.len()) {
            (Some(0x02 | 0x03), 33) | (Some(0x04), 65) => {}
            _ => return Err(KeyError::InvalidPublicKey),
        }
        let point = secp256k1::PublicKey::from_slice(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { point, compressed: bytes.len() == 33 })
    }

    /**
        SEC serialization honouring the compression flag.
    */
    pub fn sec(&self) -> Vec<u8> {
        if self.compressed {
            self.point.serialize().to_vec()
        } else {
            self.point.serialize_uncompressed().to_vec()
        }
    }

    pub fn compressed_bytes(&self) -> [u8; 33] {
        self.point.serialize()
    }

    /// 32 byte x coordinate used by taproot
    pub fn xonly(&self) -> [u8; 32] {
        self.point.x_only_public_key().0.serialize()
    }

    pub fn hash160(&self) -> [u8; 20] {
        hash::hash160(self.sec())
    }

    pub fn verify(&self, sig: &Signature, msg_hash: &[u8; 32]) -> bool {
        let msg = Message::from_digest(*msg_hash);
        SECP256K1.verify_ecdsa(&msg, &sig.0, &self.point).is_ok()
    }

    pub fn schnorr_verify(&self, sig: &SchnorrSignature, msg_hash: &[u8; 32]) -> bool {
        let msg = Message::from_digest(*msg_hash);
        let (xonly, _) = self.point.x_only_public_key();
        SECP256K1.verify_schnorr(&sig.0, &msg, &xonly).is_ok()
    }
}

/**
    Adds tweak*G to an x-only key and returns the x-only result.
*/
pub fn xonly_tweak_add(xonly: &[u8; 32], tweak: &[u8; 32]) -> Result<[u8; 32], KeyError> {
    let key = XOnlyPublicKey::from_slice(xonly).map_err(|_| KeyError::InvalidPublicKey)?;
    let scalar = Scalar::from_be_bytes(*tweak).map_err(|_| KeyError::InvalidTweak)?;
    let (tweaked, _parity) = key.add_tweak(SECP256K1, &scalar).map_err(|_| KeyError::InvalidTweak)?;
    Ok(tweaked.serialize())
}

impl Key for PublicKey {
    fn key_data(&self) -> [u8; 33] {
        self.compressed_bytes()
    }

    fn from_key_data(data: &[u8]) -> Result<Self, KeyError> {
        if data.len() != 33 {
            return Err(KeyError::InvalidPublicKey);
        }
        Self::from_sec(data)
    }

    fn public_key(&self) -> PublicKey {
        *self
    }

    fn add_tweak(&self, tweak: &[u8; 32]) -> Result<Self, KeyError> {
        let scalar = Scalar::from_be_bytes(*tweak).map_err(|_| KeyError::InvalidTweak)?;
        let point = self.point.add_exp_tweak(SECP256K1, &scalar).map_err(|_| KeyError::InvalidTweak)?;
        Ok(Self { point, compressed: self.compressed })
    }

    fn hardened_data(&self) -> Option<[u8; 33]> {
        None
    }
}

//Keys are ordered by their serialization, as required for sorted multisig
impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sec().cmp(&other.sec())
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.sec()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

/// DER encoded ECDSA signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(ecdsa::Signature);

impl Signature {
    pub fn from_der(der: &[u8]) -> Result<Self, KeyError> {
        ecdsa::Signature::from_der(der)
            .map(Signature)
            .map_err(|_| KeyError::InvalidSignature)
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.0.serialize_der().to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchnorrSignature(schnorr::Signature);

impl SchnorrSignature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        schnorr::Signature::from_slice(bytes)
            .map(SchnorrSignature)
            .map_err(|_| KeyError::InvalidSignature)
    }

    pub fn serialize(&self) -> [u8; 64] {
        self.0.serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wif_round_trip() {
        let key = PrivateKey::from_wif("cPYWWA7yv4ivb2ueWJP6SKr6rSJiT6JfGkdVrgvhrWR7soE8RxBG").unwrap();
        assert!(key.compressed);
        assert_eq!(key.to_wif(Network::Testnet), "cPYWWA7yv4ivb2ueWJP6SKr6rSJiT6JfGkdVrgvhrWR7soE8RxBG");

        let mainnet = PrivateKey::from_wif("KyZpNDKnfs94vbrwhJneDi77V6jF64PWPF8x5cdJb8ifgg2DUc9d").unwrap();
        assert_eq!(mainnet.to_wif(Network::Mainnet), "KyZpNDKnfs94vbrwhJneDi77V6jF64PWPF8x5cdJb8ifgg2DUc9d");
    }

    #[test]
    fn uncompressed_wif() {
        let mut key = PrivateKey::from_slice(&[0x11; 32]).unwrap();
        key.compressed = false;
        let wif = key.to_wif(Network::Mainnet);
        assert!(wif.starts_with('5'));

        let imported = PrivateKey::from_wif(&wif).unwrap();
        assert!(!imported.compressed);
        assert_eq!(imported.get_public_key().sec().len(), 65);
    }

    #[test]
    fn sec_prefixes() {
        let g = hex::decode(
            "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
        )
        .unwrap();
        let uncompressed = PublicKey::from_sec(&g).unwrap();
        assert!(!uncompressed.compressed);
        assert_eq!(uncompressed.sec(), g);
        assert_eq!(uncompressed.compressed_bytes()[0], 0x02);

        //Hybrid encoding of the same point, even y
        let mut hybrid = g.clone();
        hybrid[0] = 0x06;
        assert_eq!(PublicKey::from_sec(&hybrid), Err(KeyError::InvalidPublicKey));
        hybrid[0] = 0x07;
        assert_eq!(PublicKey::from_sec(&hybrid), Err(KeyError::InvalidPublicKey));

        //Compressed prefix on an uncompressed body
        let mut mixed = g.clone();
        mixed[0] = 0x02;
        assert_eq!(PublicKey::from_sec(&mixed), Err(KeyError::InvalidPublicKey));
        assert_eq!(PublicKey::from_sec(&[]), Err(KeyError::InvalidPublicKey));
    }

    #[test]
    fn invalid_scalars_are_rejected() {
        assert_eq!(PrivateKey::from_slice(&[0u8; 32]), Err(KeyError::InvalidScalar));
        //Curve order n
        let n = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141").unwrap();
        assert_eq!(PrivateKey::from_slice(&n), Err(KeyError::InvalidScalar));
        assert_eq!(KeyError::InvalidScalar.kind(), ErrorKind::Domain);
    }

    #[test]
    fn ecdsa_sign_and_verify() {
        let key = PrivateKey::new_rand();
        let msg = hash::sha256(b"message");
        let sig = key.sign(&msg);
        let pubkey = key.get_public_key();

        assert!(pubkey.verify(&sig, &msg));
        assert!(!pubkey.verify(&sig, &hash::sha256(b"other")));
        assert_eq!(Signature::from_der(&sig.serialize()).unwrap(), sig);
    }

    #[test]
    fn schnorr_sign_and_verify() {
        let key = PrivateKey::from_slice(&[0x42; 32]).unwrap();
        let msg = hash::sha256(b"taproot");
        let sig = key.schnorr_sign(&msg);

        assert!(key.get_public_key().schnorr_verify(&sig, &msg));
        //Deterministic without aux randomness
        assert_eq!(key.schnorr_sign(&msg), sig);
        assert_eq!(SchnorrSignature::from_slice(&sig.serialize()).unwrap(), sig);
    }

    #[test]
    fn tweaks_agree_between_private_and_public() {
        let key = PrivateKey::from_slice(&[0x07; 32]).unwrap();
        let tweak = [0x01; 32];
        let tweaked_private = key.add_tweak(&tweak).unwrap();
        let tweaked_public = key.get_public_key().add_tweak(&tweak).unwrap();

        assert_eq!(tweaked_private.get_public_key(), tweaked_public);
    }

    #[test]
    fn pubkeys_sort_by_sec() {
        let a = PublicKey::from_sec(&hex::decode("0204664c60ceabd82967055ccbd0f56a1585dfbd42032656efa501c463b16fbdfe").unwrap()).unwrap();
        let b = PrivateKey::from_slice(&[0x11; 32]).unwrap().get_public_key();
        let mut keys = vec![b, a];
        keys.sort();
        assert!(keys[0].sec() <= keys[1].sec());
    }
}
