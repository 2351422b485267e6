/*
    This module contains the default imports for the library.

    Import the library using:
        use btc_urkit::prelude::*;
    to quickly import the essential parts of the library.
*/

pub use crate::{
    error::{Error, ErrorKind},

    network::Network,

    key::{PrivateKey, PublicKey},

    mnemonic::{
        generate_mnemonic,
        mnemonic_from_entropy,
        mnemonic_is_valid,
        mnemonic_to_entropy,
        mnemonic_to_seed,
        PhraseLength
    },

    hdwallet::{
        ChildOptions,
        ExtendedKey,
        HDKey,
        HDWError,
        Path,
        Xprv, Xpub
    },

    encoding::{Decodable, Encodable, VersionPrefix},

    script::{Script, ScriptType, Witness},

    transaction::{OutPoint, Transaction, TxIn, TxOut},

    psbt::Psbt,

    wallet::{KeyStore, SpendSummary},

    ur::{URDecoder, UREncoder},

    urtypes::{
        CryptoAccount,
        CryptoBip39,
        CryptoECKey,
        CryptoHDKey,
        CryptoKeypath,
        CryptoOutput,
        CryptoPsbt,
        RegistryItem
    }
};
