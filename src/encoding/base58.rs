/*
    Base58 and Base58Check encoding.

    Used for legacy addresses, WIF private keys and
    serialized extended keys.
*/

use super::EncodingError;

#[derive(Debug, Clone)]
pub struct Base58 {
    prefix: Vec<u8>,
    payload: Vec<u8>
}

impl Base58 {
    /// Version prefix is one byte for addresses/WIF and four bytes for extended keys.
    pub fn new(prefix: Option<&[u8]>, payload: &[u8]) -> Base58 {
        Base58 {
            prefix: prefix.map(|p| p.to_vec()).unwrap_or_default(),
            payload: payload.to_vec()
        }
    }

    fn data(&self) -> Vec<u8> {
        let mut data = self.prefix.clone();
        data.extend_from_slice(&self.payload);
        data
    }

    /// Check encode data by appending the checksum and then encoding it.
    pub fn check_encode(&self) -> String {
        bs58::encode(self.data()).with_check().into_string()
    }

    /// Encode data in base58 format.
    pub fn encode(&self) -> String {
        bs58::encode(self.data()).into_string()
    }

    /// Decodes a base58 string into a byte vector.
    /// DOES NOT remove the checksum or version prefix if present.
    pub fn decode(encoded: &str) -> Result<Vec<u8>, EncodingError> {
        bs58::decode(encoded)
            .into_vec()
            .map_err(|e| EncodingError::Base58(e.to_string()))
    }

    /// Returns the decoded payload with the checksum removed.
    /// Version prefix is NOT removed as it is variable length depending on context.
    pub fn check_decode(encoded: &str) -> Result<Vec<u8>, EncodingError> {
        bs58::decode(encoded)
            .with_check(None)
            .into_vec()
            .map_err(|e| match e {
                bs58::decode::Error::InvalidChecksum { .. } => EncodingError::BadChecksum,
                e => EncodingError::Base58(e.to_string())
            })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;


    #[test]
    /// Tests encoding of data without checksum
    /// Sourced from https://tools.ietf.org/id/draft-msporny-base58-01.html
    fn base58_ietf_test_vectors() {
        let hello_world = b"Hello World!";
        let fox = b"The quick brown fox jumps over the lazy dog.";
        let int = [0x00, 0x00, 0x28, 0x7f, 0xb4, 0xcd];

        assert_eq!(Base58::new(None, hello_world).encode(), "2NEpo7TZRRrLZSi2U");
        assert_eq!(Base58::new(None, fox).encode(), "USm3fpXnKG5EUBx2ndxBDMPVciP5hGey2Jh4NDv6gmeo1LkMeiKrLJUUBk6Z");
        assert_eq!(Base58::new(None, &int).encode(), "11233QC4");
    }

    #[test]
    /// Sourced from the Bitcoin Core repository (src/test/data/base58_encode_decode.json)
    fn base58_bitcoin_core_test_vectors() {
        let test_data: [(&str, &str); 12] = [
            ("", ""),
            ("61", "2g"),
            ("626262", "a3gV"),
            ("636363", "aPEr"),
            ("73696d706c792061206c6f6e6720737472696e67", "2cFupjhnEsSn59qHXstmK2ffpLv2"),
            ("00eb15231dfceb60925886b67d065299925915aeb172c06647", "1NS17iag9jJgTHD1VXjvLCEnZuQ3rJDE9L"),
            ("516b6fcd0f", "ABnLTmg"),
            ("bf4f89001e670274dd", "3SEo3LWLoPntC"),
            ("572e4794", "3EFU7m"),
            ("ecac89cad93923c02321", "EJDM8drfXA6uyA"),
            ("10c8511e", "Rt5zm"),
            ("00000000000000000000", "1111111111"),
        ];

        for (data, encoded) in test_data {
            let bytes = hex::decode(data).unwrap();
            assert_eq!(Base58::new(None, &bytes).encode(), encoded);
            assert_eq!(Base58::decode(encoded).unwrap(), bytes);
        }
    }

    #[test]
    ///Tests check encoding of a public key hash with the mainnet p2pkh prefix.
    fn base58_check_encode() {
        let key = hex::decode("0204664c60ceabd82967055ccbd0f56a1585dfbd42032656efa501c463b16fbdfe").unwrap();
        let expected_address = "124ERAK4SqHMNWXycHPautn5zDYRKr3b2E";
        let derived_address = Base58::new(Some(&[0x00]), &hash::hash160(&key)).check_encode();

        assert_eq!(expected_address, derived_address);
    }

    #[test]
    fn base58_check_decode() {
        let key = hex::decode("0204664c60ceabd82967055ccbd0f56a1585dfbd42032656efa501c463b16fbdfe").unwrap();
        let decoded = Base58::check_decode("124ERAK4SqHMNWXycHPautn5zDYRKr3b2E").unwrap();

        assert_eq!(decoded[0], 0x00);
        assert_eq!(decoded[1..], hash::hash160(&key));
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        //Last character changed
        assert_eq!(
            Base58::check_decode("124ERAK4SqHMNWXycHPautn5zDYRKr3b2F"),
            Err(EncodingError::BadChecksum)
        );
        assert!(matches!(Base58::decode("0OIl"), Err(EncodingError::Base58(_))));
    }
}
