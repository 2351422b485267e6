/*
    This module implements child key deriveration
    from parent extended private and public keys
    under the BIP32 standard.

    Reference:
        https://github.com/bitcoin/bips/blob/master/bip-0032.mediawiki
*/

use crate::{
    hash::hmac_sha512,
    hdwallet::{ExtendedKey, HDWError},
    key::Key,
};

/// Top bit of a child index marks hardened derivation.
pub const HARDENED: u32 = 0x8000_0000;

/**
    Enum to pattern match child key deriveration options.
    The wrapped number never includes the hardened bit.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOptions {
    Normal(u32),
    Hardened(u32),
}

impl ChildOptions {
    /**
        Builds the option from a raw index. An index with the top bit
        set is hardened.
    */
    pub fn from_index(index: u32) -> Self {
        if index & HARDENED != 0 {
            ChildOptions::Hardened(index & !HARDENED)
        } else {
            ChildOptions::Normal(index)
        }
    }

    /// Raw index with the hardened bit folded in.
    pub fn index(&self) -> u32 {
        match self {
            ChildOptions::Normal(x) => *x,
            ChildOptions::Hardened(x) => x | HARDENED,
        }
    }

    pub fn is_hardened(&self) -> bool {
        self.index() & HARDENED != 0
    }
}

/**
    Derives the child of a parent extended key.

    Works for both private and public parents. Hardened children of
    a public parent cannot be derived since there is no private key to mix in.
*/
pub fn derive_child<K: Key>(parent: &ExtendedKey<K>, option: ChildOptions) -> Result<ExtendedKey<K>, HDWError> {
    let index = option.index();

    //Hardened child is [0x00 || parent priv bytes || index bytes]
    //Normal child is [parent pub bytes || index bytes]
    let mut data: Vec<u8> = if option.is_hardened() {
        parent.key.hardened_data()
            .ok_or(HDWError::HardenedFromPublic(index))?
            .to_vec()
    } else {
        parent.sec().to_vec()
    };
    data.extend_from_slice(&index.to_be_bytes());

    //Hash the data with the parent chaincode as the key
    let hash: [u8; 64] = hmac_sha512(&data, &parent.chain_code);

    //The left half tweaks the parent key, the right half is the child chaincode
    let mut tweak = [0u8; 32];
    tweak.copy_from_slice(&hash[..32]);
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&hash[32..]);

    let key = parent.key.add_tweak(&tweak)?;
    let depth = parent.depth.checked_add(1).ok_or(HDWError::DepthOverflow)?;

    Ok(ExtendedKey {
        key,
        chain_code,
        version: parent.version,
        depth,
        parent_fingerprint: parent.fingerprint(),
        child_number: index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardened_bit_is_normalised() {
        assert_eq!(ChildOptions::from_index(44), ChildOptions::Normal(44));
        assert_eq!(ChildOptions::from_index(44 | HARDENED), ChildOptions::Hardened(44));
        assert_eq!(ChildOptions::Hardened(44).index(), 0x8000_002c);

        //A normal option carrying the top bit is still hardened
        assert!(ChildOptions::Normal(HARDENED + 1).is_hardened());
        assert!(!ChildOptions::Normal(1).is_hardened());
    }
}
