/*
    Minimal CBOR codec.

    Covers the data model needed by the UR framing and the registry
    items: integers, byte and text strings, arrays, maps, tags and the
    simple values false/true/null/undefined. Floats are not supported.
    Indefinite length strings, arrays and maps are accepted when reading
    but never produced.
*/

use std::io::{Cursor, Read};

use thiserror::Error;

use crate::{
    encoding::{compact, EncodingError},
    error::ErrorKind,
};

pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

const BREAK: u8 = 0xff;
const INDEFINITE: u8 = 31;

/// Deepest nesting of arrays, maps and tags the decoder will follow.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CborError {
    #[error("unexpected end of cbor data")]
    UnexpectedEof,
    #[error("{0} trailing bytes after cbor item")]
    TrailingBytes(usize),
    #[error("reserved additional information {0} in cbor head")]
    InvalidHead(u8),
    #[error("unsupported cbor simple value or float {0}")]
    Unsupported(u8),
    #[error("cbor nesting deeper than {MAX_DEPTH}")]
    TooDeep,
    #[error("unexpected break byte")]
    UnexpectedBreak,
    #[error("indefinite string chunk of a different major type")]
    BadChunk,
    #[error("text string is not valid utf-8")]
    InvalidUtf8,
    #[error("cbor length {0} does not fit in memory")]
    Oversized(u64),
    #[error("expected {expected}, found {found}")]
    UnexpectedType { expected: &'static str, found: &'static str },
}

impl CborError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Malformed
    }
}

impl From<EncodingError> for CborError {
    fn from(e: EncodingError) -> Self {
        match e {
            EncodingError::Oversized(n) => CborError::Oversized(n),
            _ => CborError::UnexpectedEof,
        }
    }
}

impl From<std::io::Error> for CborError {
    fn from(_: std::io::Error) -> Self {
        CborError::UnexpectedEof
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unsigned(u64),
    /// Encodes the integer `-1 - n`
    Negative(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    /// Entries keep their wire order
    Map(Vec<(Value, Value)>),
    Tag(u64, Box<Value>),
    Bool(bool),
    Null,
    Undefined,
}

/**
    Writes the initial byte of an item together with its argument
    using the shortest of the fixed width forms.
*/
pub fn encode_head(out: &mut Vec<u8>, major: u8, n: u64) {
    let major = major << 5;
    if n < 24 {
        out.push(major | n as u8);
    } else if n <= 0xff {
        out.push(major | 24);
        out.push(n as u8);
    } else if n <= 0xffff {
        out.push(major | 25);
        out.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        out.push(major | 26);
        out.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        out.push(major | 27);
        out.extend_from_slice(&n.to_be_bytes());
    }
}

/// Head of a byte string of length `len`, the prefix UR messages carry.
pub fn bytes_head(len: usize) -> Vec<u8> {
    let mut out = vec![];
    encode_head(&mut out, MAJOR_BYTES, len as u64);
    out
}

fn read_argument<R: Read>(reader: &mut R, info: u8) -> Result<u64, CborError> {
    Ok(match info {
        0..=23 => info as u64,
        24 => compact::read_array::<_, 1>(reader)?[0] as u64,
        25 => u16::from_be_bytes(compact::read_array(reader)?) as u64,
        26 => u32::from_be_bytes(compact::read_array(reader)?) as u64,
        27 => u64::from_be_bytes(compact::read_array(reader)?),
        _ => return Err(CborError::InvalidHead(info)),
    })
}

/**
    Reads a definite head of the given major type and returns its argument.
    Used by the fountain header parser which only deals in plain integers.
*/
pub fn read_head<R: Read>(reader: &mut R, major: u8) -> Result<u64, CborError> {
    let initial = compact::read_array::<_, 1>(reader)?[0];
    if initial >> 5 != major {
        return Err(CborError::UnexpectedType {
            expected: major_name(major),
            found: major_name(initial >> 5),
        });
    }
    read_argument(reader, initial & 0x1f)
}

fn to_len(n: u64) -> Result<usize, CborError> {
    usize::try_from(n).map_err(|_| CborError::Oversized(n))
}

fn major_name(major: u8) -> &'static str {
    match major {
        MAJOR_UNSIGNED => "unsigned",
        MAJOR_NEGATIVE => "negative",
        MAJOR_BYTES => "bytes",
        MAJOR_TEXT => "text",
        MAJOR_ARRAY => "array",
        MAJOR_MAP => "map",
        MAJOR_TAG => "tag",
        _ => "simple",
    }
}

enum Item {
    Value(Value),
    Break,
}

fn read_item<R: Read>(reader: &mut R, depth: usize) -> Result<Item, CborError> {
    if depth > MAX_DEPTH {
        return Err(CborError::TooDeep);
    }
    let initial = compact::read_array::<_, 1>(reader)?[0];
    if initial == BREAK {
        return Ok(Item::Break);
    }
    let major = initial >> 5;
    let info = initial & 0x1f;

    let value = match major {
        MAJOR_UNSIGNED => Value::Unsigned(read_argument(reader, info)?),
        MAJOR_NEGATIVE => Value::Negative(read_argument(reader, info)?),
        MAJOR_BYTES | MAJOR_TEXT => {
            let data = if info == INDEFINITE {
                read_chunks(reader, major)?
            } else {
                let len = to_len(read_argument(reader, info)?)?;
                compact::read_bytes(reader, len)?
            };
            if major == MAJOR_BYTES {
                Value::Bytes(data)
            } else {
                Value::Text(String::from_utf8(data).map_err(|_| CborError::InvalidUtf8)?)
            }
        }
        MAJOR_ARRAY => {
            let mut items = vec![];
            if info == INDEFINITE {
                while let Item::Value(v) = read_item(reader, depth + 1)? {
                    items.push(v);
                }
            } else {
                let count = read_argument(reader, info)?;
                for _ in 0..count {
                    items.push(read_value(reader, depth + 1)?);
                }
            }
            Value::Array(items)
        }
        MAJOR_MAP => {
            let mut entries = vec![];
            if info == INDEFINITE {
                while let Item::Value(k) = read_item(reader, depth + 1)? {
                    entries.push((k, read_value(reader, depth + 1)?));
                }
            } else {
                let count = read_argument(reader, info)?;
                for _ in 0..count {
                    let k = read_value(reader, depth + 1)?;
                    entries.push((k, read_value(reader, depth + 1)?));
                }
            }
            Value::Map(entries)
        }
        MAJOR_TAG => {
            let tag = read_argument(reader, info)?;
            Value::Tag(tag, Box::new(read_value(reader, depth + 1)?))
        }
        _ => match info {
            20 => Value::Bool(false),
            21 => Value::Bool(true),
            22 => Value::Null,
            23 => Value::Undefined,
            other => return Err(CborError::Unsupported(other)),
        },
    };
    Ok(Item::Value(value))
}

fn read_value<R: Read>(reader: &mut R, depth: usize) -> Result<Value, CborError> {
    match read_item(reader, depth)? {
        Item::Value(v) => Ok(v),
        Item::Break => Err(CborError::UnexpectedBreak),
    }
}

//Indefinite strings are a run of definite chunks of the same major type
fn read_chunks<R: Read>(reader: &mut R, major: u8) -> Result<Vec<u8>, CborError> {
    let mut data = vec![];
    loop {
        let initial = compact::read_array::<_, 1>(reader)?[0];
        if initial == BREAK {
            return Ok(data);
        }
        if initial >> 5 != major || initial & 0x1f == INDEFINITE {
            return Err(CborError::BadChunk);
        }
        let len = to_len(read_argument(reader, initial & 0x1f)?)?;
        data.extend(compact::read_bytes(reader, len)?);
    }
}

impl Value {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Value::Unsigned(n) => encode_head(out, MAJOR_UNSIGNED, *n),
            Value::Negative(n) => encode_head(out, MAJOR_NEGATIVE, *n),
            Value::Bytes(b) => {
                encode_head(out, MAJOR_BYTES, b.len() as u64);
                out.extend_from_slice(b);
            }
            Value::Text(s) => {
                encode_head(out, MAJOR_TEXT, s.len() as u64);
                out.extend_from_slice(s.as_bytes());
            }
            Value::Array(items) => {
                encode_head(out, MAJOR_ARRAY, items.len() as u64);
                for item in items {
                    item.write_to(out);
                }
            }
            Value::Map(entries) => {
                encode_head(out, MAJOR_MAP, entries.len() as u64);
                for (k, v) in entries {
                    k.write_to(out);
                    v.write_to(out);
                }
            }
            Value::Tag(tag, inner) => {
                encode_head(out, MAJOR_TAG, *tag);
                inner.write_to(out);
            }
            Value::Bool(false) => out.push(0xf4),
            Value::Bool(true) => out.push(0xf5),
            Value::Null => out.push(0xf6),
            Value::Undefined => out.push(0xf7),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![];
        self.write_to(&mut out);
        out
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CborError> {
        read_value(reader, 0)
    }

    /// Decodes exactly one item spanning the whole slice.
    pub fn decode(bytes: &[u8]) -> Result<Self, CborError> {
        let mut cursor = Cursor::new(bytes);
        let value = Self::read_from(&mut cursor)?;
        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(CborError::TrailingBytes(bytes.len() - consumed));
        }
        Ok(value)
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Unsigned(_) => "unsigned",
            Value::Negative(_) => "negative",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Tag(..) => "tag",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Undefined => "undefined",
        }
    }

    fn mismatch(&self, expected: &'static str) -> CborError {
        CborError::UnexpectedType { expected, found: self.type_name() }
    }

    pub fn as_u64(&self) -> Result<u64, CborError> {
        match self {
            Value::Unsigned(n) => Ok(*n),
            other => Err(other.mismatch("unsigned")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], CborError> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(other.mismatch("bytes")),
        }
    }

    pub fn as_text(&self) -> Result<&str, CborError> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, CborError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_array(&self) -> Result<&[Value], CborError> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(other.mismatch("array")),
        }
    }

    pub fn as_map(&self) -> Result<&[(Value, Value)], CborError> {
        match self {
            Value::Map(entries) => Ok(entries),
            other => Err(other.mismatch("map")),
        }
    }

    /// Returns the tag number and the tagged item.
    pub fn as_tag(&self) -> Result<(u64, &Value), CborError> {
        match self {
            Value::Tag(tag, inner) => Ok((*tag, inner)),
            other => Err(other.mismatch("tag")),
        }
    }

    /// Looks up an integer key in a map.
    pub fn get(&self, key: u64) -> Result<Option<&Value>, CborError> {
        Ok(self
            .as_map()?
            .iter()
            .find(|(k, _)| *k == Value::Unsigned(key))
            .map(|(_, v)| v))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Unsigned(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
