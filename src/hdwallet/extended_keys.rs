/*
    This module implements extended keys that are
    used in BIP32 hierarchal deterministic wallets.

    An extended key is a key plus the 32 byte chaincode and the
    metadata needed to serialize it:
        version(4) || depth(1) || parent fingerprint(4) || child index(4) || chaincode(32) || key(33)
*/

use std::{fmt, str::FromStr};

use crate::{
    encoding::{base58::Base58, EncodingError, VersionPrefix},
    hash,
    hdwallet::{
        ckd::{derive_child, ChildOptions, HARDENED},
        HDWError, IntoPath,
    },
    key::{Key, PrivateKey, PublicKey, SchnorrSignature, Signature},
};

/// Length of a serialized extended key.
pub const EXTENDED_KEY_LEN: usize = 78;

#[derive(Debug, Clone, Copy)]
pub struct ExtendedKey<K: Key> {
    pub(crate) key: K,
    pub(crate) chain_code: [u8; 32],
    pub version: u32,
    pub depth: u8,
    pub parent_fingerprint: [u8; 4],
    pub child_number: u32,
}

pub type Xprv = ExtendedKey<PrivateKey>;
pub type Xpub = ExtendedKey<PublicKey>;

impl<K: Key> ExtendedKey<K> {
    /**
        Constructs the Extended Key.
        Fails if the textual form of the version does not read "prv" for
        private keys or "pub" for public keys.
    */
    pub fn construct(
        key: K,
        chain_code: [u8; 32],
        version: u32,
        depth: u8,
        parent_fingerprint: [u8; 4],
        child_number: u32,
    ) -> Result<Self, HDWError> {
        let xkey = Self { key, chain_code, version, depth, parent_fingerprint, child_number };
        xkey.check_version()?;
        Ok(xkey)
    }

    fn check_version(&self) -> Result<(), HDWError> {
        let expected = if self.is_private() { "prv" } else { "pub" };
        match self.to_base58().get(1..4) {
            Some(infix) if infix == expected => Ok(()),
            _ => Err(HDWError::VersionMismatch(self.version)),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn chain_code(&self) -> [u8; 32] {
        self.chain_code
    }

    pub fn is_private(&self) -> bool {
        self.key.hardened_data().is_some()
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    /// Compressed SEC serialization of the public key
    pub fn sec(&self) -> [u8; 33] {
        self.public_key().compressed_bytes()
    }

    pub fn xonly(&self) -> [u8; 32] {
        self.public_key().xonly()
    }

    /// First four bytes of HASH160 of the public key.
    pub fn fingerprint(&self) -> [u8; 4] {
        let mut fp = [0u8; 4];
        fp.copy_from_slice(&hash::hash160(self.sec())[..4]);
        fp
    }

    /**
        Derives a child of self. The index is hardened when the flag is set
        or when the top bit of the index is already set.
    */
    pub fn child(&self, index: u32, hardened: bool) -> Result<Self, HDWError> {
        let index = if hardened { index | HARDENED } else { index };
        derive_child(self, ChildOptions::from_index(index))
    }

    /**
        Derive the key at the given path.
        Takes either a string such as "m/84h/0h/0h" or a list of indices.
    */
    pub fn derive<P: IntoPath>(&self, path: P) -> Result<Self, HDWError> {
        let path = path.into_path()?;
        let mut current = self.clone();
        for child in path.children {
            current = derive_child(&current, child)?;
        }
        Ok(current)
    }

    pub fn serialize(&self) -> [u8; EXTENDED_KEY_LEN] {
        let mut out = [0u8; EXTENDED_KEY_LEN];
        out[0..4].copy_from_slice(&self.version.to_be_bytes());
        out[4] = self.depth;
        out[5..9].copy_from_slice(&self.parent_fingerprint);
        out[9..13].copy_from_slice(&self.child_number.to_be_bytes());
        out[13..45].copy_from_slice(&self.chain_code);
        out[45..78].copy_from_slice(&self.key.key_data());
        out
    }

    /**
        Parses the 78 byte binary form. Byte exact inverse of serialize.
    */
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HDWError> {
        if bytes.len() != EXTENDED_KEY_LEN {
            return Err(EncodingError::InvalidLength { expected: EXTENDED_KEY_LEN, found: bytes.len() }.into());
        }

        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes[0..4]);
        let version = u32::from_be_bytes(word);
        let depth = bytes[4];
        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&bytes[5..9]);
        word.copy_from_slice(&bytes[9..13]);
        let child_number = u32::from_be_bytes(word);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&bytes[13..45]);
        let key = K::from_key_data(&bytes[45..78])?;

        Self::construct(key, chain_code, version, depth, parent_fingerprint, child_number)
    }

    pub fn to_base58(&self) -> String {
        Base58::new(None, &self.serialize()).check_encode()
    }

    /**
        Import a extended key from a string.
        "xprv[...]", "tpub[...]", "zpub[...]" etc.
    */
    pub fn from_base58(encoded: &str) -> Result<Self, HDWError> {
        let bytes = Base58::check_decode(encoded)?;
        Self::from_bytes(&bytes)
    }

    /// Same key and metadata under a different version prefix.
    pub fn with_version(&self, version: u32) -> Result<Self, HDWError> {
        Self::construct(self.key.clone(), self.chain_code, version, self.depth, self.parent_fingerprint, self.child_number)
    }
}

impl Xprv {
    /**
        Computes the root private key from a seed.
        HMAC-SHA512 keyed with "Bitcoin seed", left half is the key, right half the chaincode.
    */
    pub fn from_seed(seed: &[u8], version: VersionPrefix) -> Result<Self, HDWError> {
        let hash: [u8; 64] = hash::hmac_sha512(seed, b"Bitcoin seed");
        let key = PrivateKey::from_slice(&hash[..32])?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&hash[32..]);

        Self::construct(key, chain_code, version.to_u32(), 0, [0u8; 4], 0)
    }

    pub fn private_key(&self) -> PrivateKey {
        self.key
    }

    /**
        Strips the private key. The version is mapped onto the public
        version of the same script type and network.
    */
    pub fn to_public(&self) -> Result<Xpub, HDWError> {
        let version = VersionPrefix::from_int(self.version)
            .ok_or(HDWError::BadPrefix(self.version))?
            .public_counterpart();
        self.to_public_with_version(version.to_u32())
    }

    pub fn to_public_with_version(&self, version: u32) -> Result<Xpub, HDWError> {
        Xpub::construct(
            self.key.get_public_key(),
            self.chain_code,
            version,
            self.depth,
            self.parent_fingerprint,
            self.child_number,
        )
    }

    pub fn sign(&self, msg_hash: &[u8; 32]) -> Signature {
        self.key.sign(msg_hash)
    }

    pub fn schnorr_sign(&self, msg_hash: &[u8; 32]) -> SchnorrSignature {
        self.key.schnorr_sign(msg_hash)
    }
}

//Equality ignores the version, two keys with the same material on different networks are equal
impl<K: Key + PartialEq> PartialEq for ExtendedKey<K> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.chain_code == other.chain_code
            && self.depth == other.depth
            && self.parent_fingerprint == other.parent_fingerprint
            && self.child_number == other.child_number
    }
}

impl<K: Key + Eq> Eq for ExtendedKey<K> {}

impl<K: Key> fmt::Display for ExtendedKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl<K: Key> FromStr for ExtendedKey<K> {
    type Err = HDWError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn root() -> Xprv {
        Xprv::from_seed(&hex::decode(SEED).unwrap(), VersionPrefix::Xprv).unwrap()
    }

    #[test]
    fn bip32_test_vector_1() -> Result<(), HDWError> {
        let m = root();
        assert_eq!(m.to_string(), "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi");
        assert_eq!(m.to_public()?.to_string(), "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8");

        let m0h = m.child(0, true)?;
        assert_eq!(m0h.to_string(), "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7");
        assert_eq!(m0h.to_public()?.to_string(), "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw");
        assert_eq!(m0h.parent_fingerprint, m.fingerprint());
        assert_eq!(m0h.depth, 1);
        assert_eq!(m0h.child_number, HARDENED);

        let deep = m.derive("m/0h/1/2h/2/1000000000")?;
        assert_eq!(deep.depth, 5);
        assert_eq!(deep.to_public()?.to_string(), "xpub6H1LXWLaKsWFhvm6RVpEL9P4KfRZSW7abD2ttkWP3SSQvnyA8FSVqNTEcYFgJS2UaFcxupHiYkro49S8yGasTvXEYBVPamhGW6cFJodrTHy");
        Ok(())
    }

    #[test]
    fn public_derivation_matches_private() -> Result<(), HDWError> {
        let account = root().derive("m/0h")?;
        let from_private = account.derive([1, 2])?.to_public()?;
        let from_public = account.to_public()?.derive([1, 2])?;

        assert_eq!(from_private, from_public);
        assert_eq!(from_private.to_string(), from_public.to_string());
        Ok(())
    }

    #[test]
    fn derivation_is_deterministic() -> Result<(), HDWError> {
        let a = root().derive("m/84h/0h/0h/0/0")?;
        let b = root().derive(vec![84 | HARDENED, HARDENED, HARDENED, 0, 0])?;
        assert_eq!(a.serialize(), b.serialize());
        Ok(())
    }

    #[test]
    fn serialization_round_trip() -> Result<(), HDWError> {
        let xprv = root().derive("m/0h/1")?;
        let xpub = xprv.to_public()?;

        assert_eq!(Xprv::from_bytes(&xprv.serialize())?, xprv);
        assert_eq!(Xpub::from_bytes(&xpub.serialize())?, xpub);
        assert_eq!(xprv.to_string().parse::<Xprv>()?, xprv);
        assert_eq!(xpub.to_string().parse::<Xpub>()?, xpub);
        Ok(())
    }

    #[test]
    fn equality_ignores_version() -> Result<(), HDWError> {
        let seed = hex::decode(SEED).unwrap();
        let mainnet = Xprv::from_seed(&seed, VersionPrefix::Xprv)?;
        let testnet = Xprv::from_seed(&seed, VersionPrefix::Tprv)?;

        assert_eq!(mainnet, testnet);
        assert_ne!(mainnet.to_string(), testnet.to_string());
        assert!(testnet.to_public()?.to_string().starts_with("tpub"));
        Ok(())
    }

    #[test]
    fn version_must_match_key_type() {
        let seed = hex::decode(SEED).unwrap();
        let err = Xprv::from_seed(&seed, VersionPrefix::Xpub).unwrap_err();
        assert_eq!(err, HDWError::VersionMismatch(VersionPrefix::Xpub.to_u32()));
        assert_eq!(err.kind(), ErrorKind::Malformed);

        let xprv = root();
        assert!(xprv.to_public_with_version(VersionPrefix::Zprv.to_u32()).is_err());
        assert!(xprv.to_public_with_version(VersionPrefix::Zpub.to_u32()).is_ok());
    }

    #[test]
    fn parse_rejects_wrong_key_type() {
        let xpub = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";
        assert!(xpub.parse::<Xprv>().is_err());
        assert!(Xpub::from_bytes(&[0u8; 77]).is_err());

        //Corrupted checksum
        let mut bad = xpub.to_string();
        bad.pop();
        bad.push('9');
        assert!(bad.parse::<Xpub>().is_err());
    }

    #[test]
    fn signing_uses_the_node_key() -> Result<(), HDWError> {
        let node = root().derive("m/0h")?;
        let msg = hash::sha256(b"sign me");
        assert!(node.public_key().verify(&node.sign(&msg), &msg));
        assert!(node.public_key().schnorr_verify(&node.schnorr_sign(&msg), &msg));
        Ok(())
    }
}
