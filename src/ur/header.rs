/*
    The two framing layers of a part: the `ur:type/n-m/` text prefix and
    the CBOR array heading the payload of a multi part message,

        [seq_num, seq_len, msg_len, checksum, bytes(payload_len)]

    with the payload bytes following the last head.
*/

use std::io::Cursor;

use crate::{
    cbor::{encode_head, read_head, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_UNSIGNED},
    ur::{check_case, is_valid_type, URError, MAX_MESSAGE_LEN},
};

/// Parameters every part of one transfer repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartHeader {
    pub seq_num: u32,
    pub seq_len: usize,
    pub msg_len: usize,
    pub checksum: u32,
    pub payload_len: usize,
}

fn narrow<T: TryFrom<u64>>(n: u64, field: &str) -> Result<T, URError> {
    T::try_from(n).map_err(|_| URError::BadHeader(format!("{field} {n} out of range")))
}

impl PartHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![];
        encode_head(&mut out, MAJOR_ARRAY, 5);
        encode_head(&mut out, MAJOR_UNSIGNED, self.seq_num as u64);
        encode_head(&mut out, MAJOR_UNSIGNED, self.seq_len as u64);
        encode_head(&mut out, MAJOR_UNSIGNED, self.msg_len as u64);
        encode_head(&mut out, MAJOR_UNSIGNED, self.checksum as u64);
        encode_head(&mut out, MAJOR_BYTES, self.payload_len as u64);
        out
    }

    /**
        Splits the decoded body of a part into its header and payload.
        The payload must be exactly payload_len long.
    */
    pub fn parse(body: &[u8]) -> Result<(Self, &[u8]), URError> {
        let mut cursor = Cursor::new(body);
        if read_head(&mut cursor, MAJOR_ARRAY)? != 5 {
            return Err(URError::BadHeader("expected a five element array".to_string()));
        }
        let seq_num = narrow(read_head(&mut cursor, MAJOR_UNSIGNED)?, "seq_num")?;
        let seq_len = narrow(read_head(&mut cursor, MAJOR_UNSIGNED)?, "seq_len")?;
        let msg_len = narrow(read_head(&mut cursor, MAJOR_UNSIGNED)?, "msg_len")?;
        let checksum = narrow(read_head(&mut cursor, MAJOR_UNSIGNED)?, "checksum")?;
        let payload_len = narrow(read_head(&mut cursor, MAJOR_BYTES)?, "payload_len")?;

        let header = Self { seq_num, seq_len, msg_len, checksum, payload_len };
        header.validate()?;

        let payload = &body[cursor.position() as usize..];
        if payload.len() != payload_len {
            return Err(URError::BadHeader(format!(
                "payload of {} bytes, header says {payload_len}",
                payload.len()
            )));
        }
        Ok((header, payload))
    }

    fn validate(&self) -> Result<(), URError> {
        if self.seq_num == 0 || self.seq_len == 0 || self.msg_len == 0 || self.payload_len == 0 {
            return Err(URError::BadHeader("zero sized field".to_string()));
        }
        if self.msg_len > MAX_MESSAGE_LEN {
            return Err(URError::BadHeader(format!("message of {} bytes exceeds {MAX_MESSAGE_LEN}", self.msg_len)));
        }
        //Fragment count must be the one the encoder lays out for this message
        if self.seq_len != self.msg_len.div_ceil(self.payload_len) {
            return Err(URError::BadHeader(format!(
                "{} fragments of {} bytes do not lay out {} bytes",
                self.seq_len, self.payload_len, self.msg_len
            )));
        }
        Ok(())
    }
}

/// The text prefix of a part and the bytewords that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartText<'a> {
    pub ur_type: String,
    /// `(seq_num, seq_len)` of multi part messages
    pub sequence: Option<(u32, usize)>,
    pub body: &'a str,
}

fn parse_sequence(seq: &str) -> Result<(u32, usize), URError> {
    let invalid = || URError::InvalidSequence(seq.to_string());
    let (num, len) = seq.split_once('-').ok_or_else(invalid)?;
    let num: u32 = num.parse().map_err(|_| invalid())?;
    let len: usize = len.parse().map_err(|_| invalid())?;
    if num == 0 || len == 0 {
        return Err(invalid());
    }
    Ok((num, len))
}

/**
    Splits `ur:type/body` or `ur:type/n-m/body`. The whole text must be
    in a single case; the returned type is lowercase.
*/
pub fn parse_part_text(text: &str) -> Result<PartText<'_>, URError> {
    check_case(text)?;
    let rest = match text.get(..3) {
        Some(scheme) if scheme.eq_ignore_ascii_case("ur:") => &text[3..],
        _ => return Err(URError::InvalidScheme),
    };

    let segments: Vec<&str> = rest.split('/').collect();
    let ur_type = segments[0].to_ascii_lowercase();
    if !is_valid_type(&ur_type) {
        return Err(URError::InvalidType(segments[0].to_string()));
    }
    match segments[..] {
        [_, body] => Ok(PartText { ur_type, sequence: None, body }),
        [_, seq, body] => Ok(PartText { ur_type, sequence: Some(parse_sequence(seq)?), body }),
        _ => Err(URError::InvalidSequence(rest.to_string())),
    }
}
