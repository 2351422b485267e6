/*
    Single signature native segwit key store.

    Holds a BIP32 root and one BIP84 account below it. From those it
    hands out receive and change addresses, describes the account for
    watch only wallets and reads or signs PSBTs spending from it.
*/

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::ErrorKind,
    hdwallet::{ChildOptions, HDWError, Path, Xprv, Xpub, HARDENED},
    mnemonic::mnemonic_to_seed,
    network::Network,
    psbt::{OutputScope, Psbt, PsbtError},
    script::{Script, ScriptErr},
    urtypes::{add_checksum, CryptoAccount, CryptoHDKey, CryptoOutput, OutputKey, RegistryError, ScriptExpression},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("outputs spend {outputs} sat but inputs only provide {total_in} sat")]
    NegativeFee { total_in: u64, outputs: u64 },
    #[error("output {output} declares key {declared} but the path derives {derived}")]
    DerivationMismatch { output: usize, declared: String, derived: String },
    #[error("index {0} is hardened, addresses use normal children")]
    HardenedIndex(u32),
    #[error(transparent)]
    HDWallet(#[from] HDWError),
    #[error(transparent)]
    Psbt(#[from] PsbtError),
    #[error(transparent)]
    Script(#[from] ScriptErr),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::NegativeFee { .. } | WalletError::HardenedIndex(_) => ErrorKind::Domain,
            WalletError::DerivationMismatch { .. } => ErrorKind::Protocol,
            WalletError::HDWallet(e) => e.kind(),
            WalletError::Psbt(e) => e.kind(),
            WalletError::Script(e) => e.kind(),
            WalletError::Registry(e) => e.kind(),
        }
    }
}

/**
    What a PSBT does with the funds of the key store.

    `spending` is everything leaving the wallet, fee included.
    Outputs without an address representation are listed with `None`.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendSummary {
    pub total_in: u64,
    pub change: u64,
    pub spending: u64,
    pub fee: u64,
    pub spending_outputs: Vec<(Option<String>, u64)>,
}

#[derive(Debug, Clone)]
pub struct KeyStore {
    network: Network,
    root: Xprv,
    fingerprint: [u8; 4],
    derivation: Path,
    account: Xpub,
}

impl KeyStore {
    /**
        Builds the key store from a BIP39 phrase and optional password.
        The account lives at m/84h/{coin}h/0h where the coin type follows the network.
    */
    pub fn from_mnemonic(phrase: &str, password: &str, network: Network) -> Result<Self, WalletError> {
        let seed = mnemonic_to_seed(phrase, password)?;
        Self::from_seed(&seed, network)
    }

    pub fn from_seed(seed: &[u8], network: Network) -> Result<Self, WalletError> {
        let params = network.params();
        let root = Xprv::from_seed(seed, params.xprv)?;
        let derivation = Path {
            children: vec![
                ChildOptions::Hardened(84),
                ChildOptions::Hardened(params.bip32),
                ChildOptions::Hardened(0),
            ],
        };
        let account = root.derive(&derivation)?.to_public()?;
        let fingerprint = root.fingerprint();
        info!(fingerprint = %hex::encode(fingerprint), path = %derivation, "opened key store");

        Ok(Self { network, root, fingerprint, derivation, account })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Fingerprint of the root key.
    pub fn fingerprint(&self) -> [u8; 4] {
        self.fingerprint
    }

    pub fn derivation(&self) -> &Path {
        &self.derivation
    }

    pub fn account(&self) -> &Xpub {
        &self.account
    }

    /**
        Account key with its origin, as used inside descriptors:
        `[73c5da0a/84h/1h/0h]tpub...`
    */
    pub fn xpub(&self) -> String {
        let path = self.derivation.to_string();
        let path = path.strip_prefix('m').unwrap_or(&path);
        format!("[{}{}]{}", hex::encode(self.fingerprint), path, self.account)
    }

    /// Checksummed wpkh descriptor of the receive or change chain.
    pub fn descriptor(&self, change: bool) -> Result<String, WalletError> {
        let descriptor = format!("wpkh({}/{}/*)", self.xpub(), change as u32);
        Ok(add_checksum(&descriptor)?)
    }

    pub fn address(&self, index: u32, change: bool) -> Result<String, WalletError> {
        if index >= HARDENED {
            return Err(WalletError::HardenedIndex(index));
        }
        let child = self.account.derive([change as u32, index])?;
        Ok(Script::p2wpkh(&child.public_key()).address(self.network)?)
    }

    /// Account description for watch only coordinators.
    pub fn crypto_account(&self) -> CryptoAccount {
        let key = CryptoHDKey::from_xpub(&self.account, self.fingerprint, &self.derivation, self.network);
        CryptoAccount {
            master_fingerprint: self.fingerprint,
            outputs: vec![CryptoOutput::new(vec![ScriptExpression::Wpkh], OutputKey::HD(key))],
        }
    }

    /**
        Summarizes a PSBT from the point of view of this key store.

        An output is change when one of its declared derivations starts
        at our root and the derived key pays to the output's script. A
        declared key that the path does not derive is rejected.
    */
    pub fn parse_psbt(&self, psbt: &Psbt) -> Result<SpendSummary, WalletError> {
        let mut total_in = 0u64;
        for index in 0..psbt.inputs.len() {
            total_in = total_in
                .checked_add(psbt.spent_output(index)?.value)
                .ok_or_else(|| PsbtError::InvalidValue("input values overflow".to_string()))?;
        }

        let mut change = 0u64;
        let mut sent = 0u64;
        let mut spending_outputs = vec![];
        for (index, (out, scope)) in psbt.tx.outputs.iter().zip(&psbt.outputs).enumerate() {
            if self.is_change(index, &out.script_pubkey, scope)? {
                debug!(output = index, value = out.value, "change output");
                change = change.saturating_add(out.value);
            } else {
                sent = sent.saturating_add(out.value);
                spending_outputs.push((out.script_pubkey.address(self.network).ok(), out.value));
            }
        }

        let outputs = change
            .checked_add(sent)
            .ok_or_else(|| PsbtError::InvalidValue("output values overflow".to_string()))?;
        let fee = total_in
            .checked_sub(outputs)
            .ok_or(WalletError::NegativeFee { total_in, outputs })?;
        let spending = total_in - change;

        debug!(total_in, change, spending, fee, "parsed psbt");
        Ok(SpendSummary { total_in, change, spending, fee, spending_outputs })
    }

    fn is_change(&self, index: usize, script: &Script, scope: &OutputScope) -> Result<bool, WalletError> {
        let mut change = false;
        for (declared, derivation) in &scope.bip32_derivations {
            if derivation.fingerprint != self.fingerprint {
                continue;
            }
            let derived = self.root.derive(derivation.path.as_slice())?.public_key();
            if derived.compressed_bytes() != declared.compressed_bytes() {
                warn!(output = index, declared = %declared, derived = %derived, "derivation path mismatch");
                return Err(WalletError::DerivationMismatch {
                    output: index,
                    declared: declared.to_string(),
                    derived: derived.to_string(),
                });
            }
            if Script::p2wpkh(&derived) == *script {
                change = true;
            }
        }
        Ok(change)
    }

    /// Adds our signatures to the PSBT and returns how many were added.
    pub fn sign_psbt(&self, psbt: &mut Psbt) -> Result<usize, WalletError> {
        let count = psbt.sign_with(&self.root)?;
        info!(signatures = count, "signed psbt");
        Ok(count)
    }
}
