/*
    xoshiro256** seeded from a SHA256 digest.

    Encoder and decoder both run it from public data to agree on which
    fragments a mixed part combines. It is not a source of secrets.
*/

use crate::hash::sha256;

#[derive(Debug, Clone)]
pub struct Xoshiro256 {
    state: [u64; 4],
}

impl Xoshiro256 {
    /// The four state words are the SHA256 of `seed` read as big endian u64s.
    pub fn from_seed(seed: &[u8]) -> Self {
        let digest = sha256(seed);
        let mut state = [0u64; 4];
        for (word, chunk) in state.iter_mut().zip(digest.chunks_exact(8)) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            *word = u64::from_be_bytes(bytes);
        }
        Self { state }
    }

    /// Seed of the mixed part `seq_num` of a message with `checksum`.
    pub fn for_part(seq_num: u32, checksum: u32) -> Self {
        let mut seed = [0u8; 8];
        seed[..4].copy_from_slice(&seq_num.to_be_bytes());
        seed[4..].copy_from_slice(&checksum.to_be_bytes());
        Self::from_seed(&seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        let s = &mut self.state;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 17;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);

        result
    }

    /// Uniform in [0, 1)
    pub fn next_double(&mut self) -> f64 {
        self.next_u64() as f64 / 18_446_744_073_709_551_616.0
    }

    /// Uniform in [low, high], both ends included.
    pub fn next_int(&mut self, low: u64, high: u64) -> u64 {
        (self.next_double() * (high - low + 1) as f64) as u64 + low
    }
}
