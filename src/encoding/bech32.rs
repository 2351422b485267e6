/*
    Module implements segwit address encoding.

    Witness version 0 programs are encoded with Bech32,
    version 1 and above with Bech32m.
*/

use bech32::{segwit, Fe32, Hrp};

use super::EncodingError;

/**
    Encodes a witness program as a segwit address.

    The data is either a pubkey hash (p2wpkh), a script hash (p2wsh) or an x-only pubkey (taproot).
    Use witness version 0 for P2WPKH and P2WSH. Use version 1 for P2TR.
*/
pub fn encode(hrp: &str, witness_version: u8, program: &[u8]) -> Result<String, EncodingError> {
    let hrp = Hrp::parse(hrp).map_err(|e| EncodingError::Bech32(e.to_string()))?;
    let version = Fe32::try_from(witness_version).map_err(|e| EncodingError::Bech32(e.to_string()))?;

    segwit::encode(hrp, version, program).map_err(|e| EncodingError::Bech32(e.to_string()))
}

/**
    Decodes a segwit address into (hrp, witness version, witness program).
    Checksum variant, program length and case are validated.
*/
pub fn decode(address: &str) -> Result<(String, u8, Vec<u8>), EncodingError> {
    let (hrp, version, program) = segwit::decode(address)
        .map_err(|e| EncodingError::Bech32(e.to_string()))?;

    Ok((hrp.to_lowercase(), version.to_u8(), program))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;

    #[test]
    fn p2wsh_address_tests() {
        let redeem_script = [0x6a, 0x29, 0x05, 0x20, 0x03];
        let program = hash::sha256(redeem_script);

        assert_eq!(
            encode("bc", 0, &program).unwrap(),
            "bc1q4sr2gyed4ww8zm0t9ktn47qxlu2nhl5ejkf6fjzfttnsjvxdkqjqe7yhq9"
        );
        assert_eq!(
            encode("tb", 0, &program).unwrap(),
            "tb1q4sr2gyed4ww8zm0t9ktn47qxlu2nhl5ejkf6fjzfttnsjvxdkqjqwkjc62"
        );
    }

    #[test]
    fn decode_round_trip() {
        let (hrp, version, program) = decode("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu").unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(version, 0);
        assert_eq!(program.len(), 20);
        assert_eq!(encode(&hrp, version, &program).unwrap(), "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
    }

    #[test]
    fn bad_checksum_rejected() {
        assert!(decode("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyv").is_err());
        //Version 0 programs are 20 or 32 bytes
        assert!(encode("bc", 0, &[0u8; 25]).is_err());
        assert!(encode("bc", 17, &[0u8; 20]).is_err());
    }
}
