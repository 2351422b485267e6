/*
    Output descriptor checksums.

    Eight characters of a BCH code over the descriptor. Each input
    character is split into its position within a group of 32 and the
    group number; group numbers are packed three at a time.
*/

use super::RegistryError;

const INPUT_CHARSET: &str =
    "0123456789()[],'/*abcdefgh@:$%{}IJKLMNOPQRSTUVWXYZ&+-.;<=>?!^_|~ijklmnopqrstuvwxyzABCDEFGH`#\"\\ ";
const CHECKSUM_CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

const GENERATORS: [u64; 5] = [0xF5DEE51989, 0xA9FDCA3312, 0x1BAB10E32D, 0x3706B1677A, 0x644D626FFD];

fn polymod(c: u64, val: u64) -> u64 {
    let top = c >> 35;
    let mut c = ((c & 0x7_FFFF_FFFF) << 5) ^ val;
    for (i, generator) in GENERATORS.iter().enumerate() {
        if (top >> i) & 1 == 1 {
            c ^= generator;
        }
    }
    c
}

/// Checksum of a descriptor without its `#` suffix.
pub fn descriptor_checksum(descriptor: &str) -> Result<String, RegistryError> {
    let mut c = 1u64;
    let mut class = 0u64;
    let mut class_count = 0;
    for ch in descriptor.chars() {
        let pos = INPUT_CHARSET.find(ch).ok_or(RegistryError::DescriptorCharacter(ch))? as u64;
        c = polymod(c, pos & 31);
        class = class * 3 + (pos >> 5);
        class_count += 1;
        if class_count == 3 {
            c = polymod(c, class);
            class = 0;
            class_count = 0;
        }
    }
    if class_count > 0 {
        c = polymod(c, class);
    }
    for _ in 0..8 {
        c = polymod(c, 0);
    }
    c ^= 1;

    Ok((0..8)
        .map(|i| CHECKSUM_CHARSET[((c >> (5 * (7 - i))) & 31) as usize] as char)
        .collect())
}

/// `descriptor#checksum`
pub fn add_checksum(descriptor: &str) -> Result<String, RegistryError> {
    Ok(format!("{descriptor}#{}", descriptor_checksum(descriptor)?))
}

/**
    Checks the `#checksum` suffix of a descriptor and returns the
    descriptor without it.
*/
pub fn verify_checksum(descriptor: &str) -> Result<&str, RegistryError> {
    let (body, found) = descriptor
        .rsplit_once('#')
        .ok_or_else(|| RegistryError::DescriptorChecksum { expected: String::new(), found: String::new() })?;
    let expected = descriptor_checksum(body)?;
    if expected != found {
        return Err(RegistryError::DescriptorChecksum { expected, found: found.to_string() });
    }
    Ok(body)
}
