/*
    Network parameters.

    Each network carries the prefixes and version bytes needed to
    serialize keys and addresses for it.
*/

use std::{fmt, str::FromStr};

use crate::encoding::version_prefix::VersionPrefix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
    Signet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    pub name: &'static str,
    /// Bech32 human readable part
    pub hrp: &'static str,
    pub p2pkh: u8,
    pub p2sh: u8,
    pub wif: u8,
    /// BIP44 coin type
    pub bip32: u32,
    pub xprv: VersionPrefix,
    pub xpub: VersionPrefix,
    pub yprv: VersionPrefix,
    pub ypub: VersionPrefix,
    pub zprv: VersionPrefix,
    pub zpub: VersionPrefix,
    pub multisig_yprv: VersionPrefix,
    pub multisig_ypub: VersionPrefix,
    pub multisig_zprv: VersionPrefix,
    pub multisig_zpub: VersionPrefix,
}

const MAINNET: NetworkParams = NetworkParams {
    name: "Mainnet",
    hrp: "bc",
    p2pkh: 0x00,
    p2sh: 0x05,
    wif: 0x80,
    bip32: 0,
    xprv: VersionPrefix::Xprv,
    xpub: VersionPrefix::Xpub,
    yprv: VersionPrefix::Yprv,
    ypub: VersionPrefix::Ypub,
    zprv: VersionPrefix::Zprv,
    zpub: VersionPrefix::Zpub,
    multisig_yprv: VersionPrefix::SLIP132Yprv,
    multisig_ypub: VersionPrefix::SLIP132Ypub,
    multisig_zprv: VersionPrefix::SLIP132Zprv,
    multisig_zpub: VersionPrefix::SLIP132Zpub,
};

const TESTNET: NetworkParams = NetworkParams {
    name: "Testnet",
    hrp: "tb",
    p2pkh: 0x6F,
    p2sh: 0xC4,
    wif: 0xEF,
    bip32: 1,
    xprv: VersionPrefix::Tprv,
    xpub: VersionPrefix::Tpub,
    yprv: VersionPrefix::Uprv,
    ypub: VersionPrefix::Upub,
    zprv: VersionPrefix::Vprv,
    zpub: VersionPrefix::Vpub,
    multisig_yprv: VersionPrefix::SLIP132Uprv,
    multisig_ypub: VersionPrefix::SLIP132Upub,
    multisig_zprv: VersionPrefix::SLIP132Vprv,
    multisig_zpub: VersionPrefix::SLIP132Vpub,
};

const REGTEST: NetworkParams = NetworkParams {
    name: "Regtest",
    hrp: "bcrt",
    ..TESTNET
};

const SIGNET: NetworkParams = NetworkParams {
    name: "Signet",
    ..TESTNET
};

impl Network {
    pub fn params(self) -> &'static NetworkParams {
        match self {
            Network::Mainnet => &MAINNET,
            Network::Testnet => &TESTNET,
            Network::Regtest => &REGTEST,
            Network::Signet => &SIGNET,
        }
    }

    /// Finds the network a bech32 human readable part belongs to.
    /// Signet shares "tb" with testnet and is reported as testnet.
    pub fn from_hrp(hrp: &str) -> Option<Self> {
        match hrp {
            "bc" => Some(Network::Mainnet),
            "tb" => Some(Network::Testnet),
            "bcrt" => Some(Network::Regtest),
            _ => None,
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Network::Mainnet => "main",
            Network::Testnet => "test",
            Network::Regtest => "regtest",
            Network::Signet => "signet",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" | "mainnet" | "bitcoin" => Ok(Network::Mainnet),
            "test" | "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            "signet" => Ok(Network::Signet),
            _ => Err(format!("unknown network: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regtest_inherits_testnet_prefixes() {
        let regtest = Network::Regtest.params();
        assert_eq!(regtest.hrp, "bcrt");
        assert_eq!(regtest.p2pkh, Network::Testnet.params().p2pkh);
        assert_eq!(regtest.xprv, VersionPrefix::Tprv);
        assert_eq!(Network::Signet.params().hrp, "tb");
    }

    #[test]
    fn network_names_round_trip() {
        for network in [Network::Mainnet, Network::Testnet, Network::Regtest, Network::Signet] {
            assert_eq!(network.to_string().parse::<Network>(), Ok(network));
        }
        assert!("litecoin".parse::<Network>().is_err());
    }
}
