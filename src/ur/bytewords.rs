/*
    Bytewords in their minimal form: every byte becomes the first and
    last letter of its word, so 256 two letter codes. A CRC32 of the
    data, big endian, is appended as four more codes.
*/

use crate::{hash::crc32, ur::URError};

const WORDS: &[u8] = concat!(
    "aeadaoaxaaahamatayasbkbdbnbtbabsbebybgbwbbbzcmchcscfcycwcecackct",
    "cxclcpcndkdadsdidedtdrdndwdpdmdldyeheyeoeeecenemetesftfrfnfsfmfh",
    "fzfpfwfxfyfefgflfdgagegrgsgtglgwgdgygmgughgohfhghdhkhthphhhlhyhe",
    "hnhsidiaieihiyioisinimjejzjnjtjljojsjpjkjykpkoktkskkknkgkekikblb",
    "lalylflslrlplnltloldlelulklgmnmymhmemomumwmdmtmsmknlnyndnsntnnne",
    "nboyoeotoxonolospdptpkpypspmplpepfpaprqdqzrerprlrorhrdrkrfryrnrs",
    "rtsesasrssskswstspsosgsbsfsntotktitttdtetytltbtstptatnuyuoutueur",
    "vtvyvovlvevwvavdvswlwdwmwpwewywswtwnwzwfwkykynylyaytzszoztzczezm",
)
.as_bytes();

const DECODE: [i16; 26 * 26] = decode_table();

const fn decode_table() -> [i16; 26 * 26] {
    let mut table = [-1i16; 26 * 26];
    let mut i = 0;
    while i < 256 {
        let first = (WORDS[2 * i] - b'a') as usize;
        let last = (WORDS[2 * i + 1] - b'a') as usize;
        table[first * 26 + last] = i as i16;
        i += 1;
    }
    table
}

fn letter(c: u8) -> Option<usize> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as usize),
        b'A'..=b'Z' => Some((c - b'A') as usize),
        _ => None,
    }
}

fn lookup(pair: &[u8]) -> Result<u8, URError> {
    let invalid = || URError::InvalidByteword(String::from_utf8_lossy(pair).into_owned());
    let first = letter(pair[0]).ok_or_else(invalid)?;
    let last = letter(pair[1]).ok_or_else(invalid)?;
    let byte = DECODE[first * 26 + last];
    if byte < 0 {
        return Err(invalid());
    }
    Ok(byte as u8)
}

/// Lowercase bytewords of `data`, no checksum.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let i = *b as usize * 2;
        out.push(WORDS[i] as char);
        out.push(WORDS[i + 1] as char);
    }
    out
}

/// Bytewords of `data` followed by its CRC32.
pub fn encode_with_checksum(data: &[u8]) -> String {
    let mut out = encode(data);
    out.push_str(&encode(&crc32(data).to_be_bytes()));
    out
}

/**
    Appends the decoded bytes of `text` to `out`. Either case is
    accepted but not both at once.
*/
pub fn decode_into(text: &str, out: &mut Vec<u8>) -> Result<(), URError> {
    super::check_case(text)?;
    let bytes = text.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(URError::OddLength(bytes.len()));
    }
    out.reserve(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        out.push(lookup(pair)?);
    }
    Ok(())
}

pub fn decode(text: &str) -> Result<Vec<u8>, URError> {
    let mut out = vec![];
    decode_into(text, &mut out)?;
    Ok(out)
}

/**
    Decodes text ending in a checksum into `out`, verifies the checksum
    and leaves only the data in `out`.
*/
pub fn decode_check_into(text: &str, out: &mut Vec<u8>) -> Result<(), URError> {
    out.clear();
    decode_into(text, out)?;
    if out.len() < 4 {
        return Err(URError::MissingChecksum);
    }
    let split = out.len() - 4;
    let found = u32::from_be_bytes([out[split], out[split + 1], out[split + 2], out[split + 3]]);
    out.truncate(split);
    let expected = crc32(&out[..]);
    if expected != found {
        return Err(URError::BadChecksum { expected, found });
    }
    Ok(())
}

pub fn decode_check(text: &str) -> Result<Vec<u8>, URError> {
    let mut out = vec![];
    decode_check_into(text, &mut out)?;
    Ok(out)
}
