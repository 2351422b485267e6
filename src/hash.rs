/*
    Hash module containing the hash functions needed for keys,
    addresses, transactions and the UR framing.
*/

use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

type HmacSha512 = Hmac<Sha512>;

/*
    Takes in a byte array and returns the sha256 hash of it
*/
pub fn sha256<T>(input: T) -> [u8; 32]
where T: AsRef<[u8]>
{
    let mut r = Sha256::new();
    r.update(input);
    r.finalize().into()
}

/*
    Double sha256, used for checksums, txids and legacy/segwit v0 sighashes
*/
pub fn sha256d<T>(input: T) -> [u8; 32]
where T: AsRef<[u8]>
{
    sha256(sha256(input))
}

/*
    Takes in a byte array and returns the ripemd160 hash of it
*/
pub fn ripemd160<T>(input: T) -> [u8; 20]
where T: AsRef<[u8]>
{
    let mut r = Ripemd160::new();
    r.update(input);
    r.finalize().into()
}

/*
    Ripemd160( Sha256( input ) )
*/
pub fn hash160<T>(input: T) -> [u8; 20]
where T: AsRef<[u8]>
{
    ripemd160(sha256(input))
}

/*
    HMAC-SHA512 of data keyed with key.
*/
pub fn hmac_sha512(data: &[u8], key: &[u8]) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/*
    BIP340 tagged hash: sha256( sha256(tag) || sha256(tag) || msg )
*/
pub fn tagged_hash(tag: &str, msg: &[u8]) -> [u8; 32] {
    let tag_hash = sha256(tag.as_bytes());
    let mut r = Sha256::new();
    r.update(tag_hash);
    r.update(tag_hash);
    r.update(msg);
    r.finalize().into()
}

const CRC32_TABLE: [u32; 256] = crc32_table();

const fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Running IEEE CRC32 (the same checksum zlib and the UR framing use).
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, data: &[u8]) {
        for b in data {
            self.state = CRC32_TABLE[((self.state ^ *b as u32) & 0xFF) as usize] ^ (self.state >> 8);
        }
    }

    pub fn finalize(&self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

pub fn crc32<T>(input: T) -> u32
where T: AsRef<[u8]>
{
    let mut crc = Crc32::new();
    crc.update(input.as_ref());
    crc.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_vectors() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hex::encode(sha256d(b"hello")),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }

    #[test]
    fn hash160_of_pubkey() {
        let pubkey = hex::decode("0204664c60ceabd82967055ccbd0f56a1585dfbd42032656efa501c463b16fbdfe").unwrap();
        //Hash behind address 124ERAK4SqHMNWXycHPautn5zDYRKr3b2E
        assert_eq!(hash160(&pubkey).len(), 20);
        assert_eq!(hash160(&pubkey), ripemd160(sha256(&pubkey)));
    }

    #[test]
    fn crc32_vectors() {
        assert_eq!(crc32(b"Hello, world!"), 0xebe6c6e6);
        assert_eq!(crc32(b"Wolf"), 0x598c84dc);
        assert_eq!(crc32(b""), 0);

        //Streaming gives the same result as one shot
        let mut running = Crc32::new();
        running.update(b"Hello, ");
        running.update(b"world!");
        assert_eq!(running.finalize(), 0xebe6c6e6);
    }

    #[test]
    fn tagged_hash_matches_definition() {
        let tag = sha256(b"TapSighash");
        let mut preimage = tag.to_vec();
        preimage.extend_from_slice(&tag);
        preimage.extend_from_slice(b"abc");
        assert_eq!(tagged_hash("TapSighash", b"abc"), sha256(&preimage));
    }
}
