/*
    Library for air-gapped Bitcoin signers.

    Keys and addresses come from BIP39 phrases and BIP32 trees, spends
    arrive and leave as PSBTs, and everything that crosses the air gap
    is framed as UR text so it fits in a stream of QR codes.

    References:
        - The Bitcoin Book (https://github.com/bitcoinbook/bitcoinbook/)
            for the general concepts

        - learn me a bitcoin (https://learnmeabitcoin.com/)
            for script and transaction layouts

        - BIP32, BIP84, BIP143, BIP174 and BIP341
            for derivation, signing and the PSBT envelope

        - Blockchain Commons research papers (BCR-2020-005/006/007/010/015)
            for UR framing and the registry types
*/

//Outward facing modules
pub mod error;
pub mod network;
pub mod key;
pub mod hdwallet;
pub mod mnemonic;
pub mod script;
pub mod transaction;
pub mod psbt;
pub mod wallet;
pub mod ur;
pub mod urtypes;
pub mod prelude;

//Building blocks
pub mod cbor;
pub mod encoding;
pub mod hash;

pub use error::{Error, ErrorKind, Result};
