/*
    Compact size unsigned integers (var-ints) and the small
    stream helpers built on them.
*/

use std::io::Read;

use super::EncodingError;

/// Serializes `n` in compact size form.
pub fn to_bytes(n: u64) -> Vec<u8> {
    if n < 0xfd {
        vec![n as u8]
    } else if n <= 0xffff {
        let mut v = vec![0xfd];
        v.extend_from_slice(&(n as u16).to_le_bytes());
        v
    } else if n <= 0xffff_ffff {
        let mut v = vec![0xfe];
        v.extend_from_slice(&(n as u32).to_le_bytes());
        v
    } else {
        let mut v = vec![0xff];
        v.extend_from_slice(&n.to_le_bytes());
        v
    }
}

pub fn read_from<R: Read>(reader: &mut R) -> Result<u64, EncodingError> {
    let first = read_array::<_, 1>(reader)?[0];
    Ok(match first {
        0xfd => u16::from_le_bytes(read_array(reader)?) as u64,
        0xfe => u32::from_le_bytes(read_array(reader)?) as u64,
        0xff => u64::from_le_bytes(read_array(reader)?),
        x => x as u64,
    })
}

/// Reads a compact size that is going to be used as a length.
pub fn read_len<R: Read>(reader: &mut R) -> Result<usize, EncodingError> {
    let n = read_from(reader)?;
    usize::try_from(n).map_err(|_| EncodingError::Oversized(n))
}

pub fn read_array<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N], EncodingError> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads exactly `len` bytes without trusting `len` for the allocation size.
pub fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::new();
    let read = reader.by_ref().take(len as u64).read_to_end(&mut out)?;
    if read != len {
        return Err(EncodingError::UnexpectedEof);
    }
    Ok(out)
}

pub fn read_u32_le<R: Read>(reader: &mut R) -> Result<u32, EncodingError> {
    Ok(u32::from_le_bytes(read_array(reader)?))
}

pub fn read_u64_le<R: Read>(reader: &mut R) -> Result<u64, EncodingError> {
    Ok(u64::from_le_bytes(read_array(reader)?))
}

/// Length prefixed byte string
pub fn read_string<R: Read>(reader: &mut R) -> Result<Vec<u8>, EncodingError> {
    let len = read_len(reader)?;
    read_bytes(reader, len)
}

pub fn write_string(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&to_bytes(data.len() as u64));
    out.extend_from_slice(data);
}
