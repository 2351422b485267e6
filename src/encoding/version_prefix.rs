use crate::network::Network;

/// Four byte BIP32 version prefixes, including the SLIP-0132 variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionPrefix {
    //BIP-32
    Xprv = 0x0488ADE4, //Legacy P2PKH
    Xpub = 0x0488B21E,
    Tprv = 0x04358394,
    Tpub = 0x043587CF,
    //BIP-49
    Yprv = 0x049d7878, //P2SH nested P2WPKH
    Ypub = 0x049d7cb2,
    Uprv = 0x044a4e28,
    Upub = 0x044a5262,
    //BIP-84
    Zprv = 0x04b2430c, //P2WPKH
    Zpub = 0x04b24746,
    Vprv = 0x045f18bc,
    Vpub = 0x045f1cf6,

    //SLIP-0132
    SLIP132Ypub = 0x0295b43f, //Multi-signature P2WSH in P2SH
    SLIP132Yprv = 0x0295b005,
    SLIP132Zpub = 0x02aa7ed3, //Multi-signature P2WSH
    SLIP132Zprv = 0x02aa7a99,
    SLIP132Upub = 0x024289ef, //Multi-signature P2WSH in P2SH Testnet
    SLIP132Uprv = 0x024285b5,
    SLIP132Vpub = 0x02575483, //Multi-signature P2WSH Testnet
    SLIP132Vprv = 0x02575048,
}

/// (private, public) pairs. Used to map a private version to its public one.
const PAIRS: [(VersionPrefix, VersionPrefix); 10] = [
    (VersionPrefix::Xprv, VersionPrefix::Xpub),
    (VersionPrefix::Tprv, VersionPrefix::Tpub),
    (VersionPrefix::Yprv, VersionPrefix::Ypub),
    (VersionPrefix::Uprv, VersionPrefix::Upub),
    (VersionPrefix::Zprv, VersionPrefix::Zpub),
    (VersionPrefix::Vprv, VersionPrefix::Vpub),
    (VersionPrefix::SLIP132Yprv, VersionPrefix::SLIP132Ypub),
    (VersionPrefix::SLIP132Uprv, VersionPrefix::SLIP132Upub),
    (VersionPrefix::SLIP132Zprv, VersionPrefix::SLIP132Zpub),
    (VersionPrefix::SLIP132Vprv, VersionPrefix::SLIP132Vpub),
];

impl VersionPrefix {
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.to_u32().to_be_bytes()
    }

    pub fn from_int(int: u32) -> Option<Self> {
        Some(match int {
            0x0488ADE4 => Self::Xprv,
            0x0488B21E => Self::Xpub,
            0x04358394 => Self::Tprv,
            0x043587cf => Self::Tpub,
            0x049d7878 => Self::Yprv,
            0x049d7cb2 => Self::Ypub,
            0x044a4e28 => Self::Uprv,
            0x044a5262 => Self::Upub,
            0x04b2430c => Self::Zprv,
            0x04b24746 => Self::Zpub,
            0x045f18bc => Self::Vprv,
            0x045f1cf6 => Self::Vpub,
            0x0295b43f => Self::SLIP132Ypub,
            0x0295b005 => Self::SLIP132Yprv,
            0x02aa7ed3 => Self::SLIP132Zpub,
            0x02aa7a99 => Self::SLIP132Zprv,
            0x024289ef => Self::SLIP132Upub,
            0x024285b5 => Self::SLIP132Uprv,
            0x02575483 => Self::SLIP132Vpub,
            0x02575048 => Self::SLIP132Vprv,
            _ => return None
        })
    }

    pub fn is_private(self) -> bool {
        PAIRS.iter().any(|(prv, _)| *prv == self)
    }

    /**
        Maps a private version onto the public version of the same
        script type and network. Public versions map onto themselves.
    */
    pub fn public_counterpart(self) -> Self {
        PAIRS.iter()
            .find(|(prv, _)| *prv == self)
            .map(|(_, public)| *public)
            .unwrap_or(self)
    }

    pub fn network(self) -> Network {
        match self {
            VersionPrefix::Xprv | VersionPrefix::Xpub |
            VersionPrefix::Yprv | VersionPrefix::Ypub |
            VersionPrefix::Zprv | VersionPrefix::Zpub |
            VersionPrefix::SLIP132Yprv | VersionPrefix::SLIP132Ypub |
            VersionPrefix::SLIP132Zprv | VersionPrefix::SLIP132Zpub => Network::Mainnet,
            _ => Network::Testnet
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_maps_to_public() {
        assert_eq!(VersionPrefix::Zprv.public_counterpart(), VersionPrefix::Zpub);
        assert_eq!(VersionPrefix::Tprv.public_counterpart(), VersionPrefix::Tpub);
        assert_eq!(VersionPrefix::SLIP132Vprv.public_counterpart(), VersionPrefix::SLIP132Vpub);
        assert_eq!(VersionPrefix::Xpub.public_counterpart(), VersionPrefix::Xpub);
    }

    #[test]
    fn int_round_trip() {
        for (prv, public) in PAIRS {
            assert_eq!(VersionPrefix::from_int(prv.to_u32()), Some(prv));
            assert_eq!(VersionPrefix::from_int(public.to_u32()), Some(public));
            assert!(prv.is_private());
            assert!(!public.is_private());
            assert_eq!(prv.network(), public.network());
        }
        assert_eq!(VersionPrefix::from_int(0xdeadbeef), None);
    }
}
