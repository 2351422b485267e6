/*
    Segregated witness stacks.
*/

use std::io::Read;

use crate::encoding::{compact, Decodable, Encodable, EncodingError};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Witness {
    pub items: Vec<Vec<u8>>
}

impl Witness {
    pub fn new(items: Vec<Vec<u8>>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Encodable for Witness {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&compact::to_bytes(self.items.len() as u64));
        for item in &self.items {
            compact::write_string(out, item);
        }
    }
}

impl Decodable for Witness {
    type Error = EncodingError;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        let count = compact::read_len(reader)?;
        let mut items = vec![];
        for _ in 0..count {
            items.push(compact::read_string(reader)?);
        }
        Ok(Self { items })
    }
}
