/*
    BIP39 mnemonic phrases.

    Only conversion between entropy, phrases and seeds is handled here.
    The English word list comes from the bip39 crate.
*/

use bip39::Mnemonic;
use rand::RngCore;

use crate::hdwallet::HDWError;

/**
    Supported phrase lengths and the entropy each one carries.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseLength {
    Twelve,
    Fifteen,
    Eighteen,
    TwentyOne,
    TwentyFour,
}

impl PhraseLength {
    pub fn entropy_len(self) -> usize {
        match self {
            PhraseLength::Twelve => 16,
            PhraseLength::Fifteen => 20,
            PhraseLength::Eighteen => 24,
            PhraseLength::TwentyOne => 28,
            PhraseLength::TwentyFour => 32,
        }
    }

    pub fn word_count(self) -> usize {
        self.entropy_len() * 3 / 4
    }
}

fn parse(phrase: &str) -> Result<Mnemonic, HDWError> {
    Mnemonic::parse_normalized(phrase).map_err(|e| HDWError::Mnemonic(e.to_string()))
}

/// Converts 16 to 32 bytes of entropy into a phrase.
pub fn mnemonic_from_entropy(entropy: &[u8]) -> Result<String, HDWError> {
    Mnemonic::from_entropy(entropy)
        .map(|m| m.to_string())
        .map_err(|e| HDWError::Mnemonic(e.to_string()))
}

pub fn mnemonic_to_entropy(phrase: &str) -> Result<Vec<u8>, HDWError> {
    Ok(parse(phrase)?.to_entropy())
}

/// Checks the words and the embedded checksum.
pub fn mnemonic_is_valid(phrase: &str) -> bool {
    parse(phrase).is_ok()
}

/**
    Stretches the phrase and password into the 64 byte BIP32 seed.
*/
pub fn mnemonic_to_seed(phrase: &str, password: &str) -> Result<[u8; 64], HDWError> {
    Ok(parse(phrase)?.to_seed_normalized(password))
}

/// New phrase from thread rng entropy.
pub fn generate_mnemonic(length: PhraseLength) -> Result<String, HDWError> {
    let mut entropy = vec![0u8; length.entropy_len()];
    rand::thread_rng().fill_bytes(&mut entropy);
    mnemonic_from_entropy(&entropy)
}
