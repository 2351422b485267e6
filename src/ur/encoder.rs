/*
    Fountain encoder. Splits a CBOR message into equal fragments and
    produces an unbounded sequence of upper case UR parts.
*/

use tracing::debug;

use crate::{
    cbor::{bytes_head, Value},
    hash::crc32,
    ur::{
        bytewords,
        fountain::{split_message, xor_into, FragmentChooser},
        header::PartHeader,
        is_valid_type, URError, DEFAULT_PART_LEN, MAX_MESSAGE_LEN,
    },
};

#[derive(Debug, Clone)]
pub struct UREncoder {
    ur_type: String,
    message: Vec<u8>,
    checksum: u32,
    fragments: Vec<Vec<u8>>,
    chooser: FragmentChooser,
    payload_len: usize,
    idx: u32,
}

impl UREncoder {
    /// Encodes `data` wrapped in a CBOR byte string, the framing PSBTs travel in.
    pub fn new(ur_type: &str, data: &[u8]) -> Result<Self, URError> {
        let mut message = bytes_head(data.len());
        message.extend_from_slice(data);
        Self::from_cbor(ur_type, message)
    }

    /// Encodes an already CBOR encoded item, such as a registry type.
    pub fn from_cbor(ur_type: &str, message: Vec<u8>) -> Result<Self, URError> {
        if !is_valid_type(ur_type) {
            return Err(URError::InvalidType(ur_type.to_string()));
        }
        if message.len() > MAX_MESSAGE_LEN {
            return Err(URError::MessageTooLarge(message.len()));
        }
        Value::decode(&message)?;

        let checksum = crc32(&message);
        let mut encoder = Self {
            ur_type: ur_type.to_string(),
            message,
            checksum,
            fragments: vec![],
            chooser: FragmentChooser::new(0, checksum),
            payload_len: 0,
            idx: 0,
        };
        encoder.layout(DEFAULT_PART_LEN);
        Ok(encoder)
    }

    /// Re-splits the message aiming for fragments of at most `part_len` bytes.
    pub fn with_part_len(mut self, part_len: usize) -> Result<Self, URError> {
        if part_len == 0 {
            return Err(URError::ZeroPartLength);
        }
        self.layout(part_len);
        Ok(self)
    }

    fn layout(&mut self, part_len: usize) {
        let msg_len = self.message.len();
        let seq_len = msg_len.div_ceil(part_len);
        self.payload_len = msg_len.div_ceil(seq_len);
        self.fragments = split_message(&self.message, self.payload_len);
        self.chooser = FragmentChooser::new(seq_len, self.checksum);
        self.idx = 0;
        debug!(
            ur_type = %self.ur_type,
            msg_len,
            seq_len,
            payload_len = self.payload_len,
            checksum = self.checksum,
            "ur encoder ready"
        );
    }

    pub fn ur_type(&self) -> &str {
        &self.ur_type
    }

    pub fn seq_len(&self) -> usize {
        self.fragments.len()
    }

    pub fn msg_len(&self) -> usize {
        self.message.len()
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn is_single_part(&self) -> bool {
        self.seq_len() == 1
    }

    /// Index of the part `next_part` returns next.
    pub fn current_index(&self) -> u32 {
        self.idx
    }

    fn prefix(&self) -> String {
        format!("UR:{}/", self.ur_type.to_ascii_uppercase())
    }

    /// Payload of part `seq_num`: one fragment, or the XOR of several.
    fn part_payload(&self, seq_num: u32) -> Vec<u8> {
        let mut payload = vec![0u8; self.payload_len];
        for i in self.chooser.choose(seq_num) {
            xor_into(&mut payload, &self.fragments[i]);
        }
        payload
    }

    /**
        Part `idx` counted from zero. The first seq_len parts are the
        plain fragments, the rest are mixed. A message that fits into a
        single fragment always gives the same single part text.
    */
    pub fn get_part(&self, idx: u32) -> String {
        if self.is_single_part() {
            return self.prefix() + &bytewords::encode_with_checksum(&self.message).to_ascii_uppercase();
        }
        let seq_num = idx.saturating_add(1);
        let header = PartHeader {
            seq_num,
            seq_len: self.seq_len(),
            msg_len: self.msg_len(),
            checksum: self.checksum,
            payload_len: self.payload_len,
        };
        let mut body = header.encode();
        body.extend(self.part_payload(seq_num));

        format!(
            "{}{}-{}/{}",
            self.prefix(),
            seq_num,
            self.seq_len(),
            bytewords::encode_with_checksum(&body).to_ascii_uppercase()
        )
    }

    /// Returns the current part and advances, wrapping around after the last index.
    pub fn next_part(&mut self) -> String {
        let part = self.get_part(self.idx);
        if !self.is_single_part() {
            self.idx = if self.idx >= u32::MAX - 1 { 0 } else { self.idx + 1 };
        }
        part
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(n: u8) -> Vec<u8> {
        (0..n).collect()
    }

    #[test]
    fn fragment_layout() {
        let encoder = UREncoder::new("crypto-psbt", &counting(98)).unwrap().with_part_len(25).unwrap();
        assert_eq!(encoder.msg_len(), 100);
        assert_eq!(encoder.seq_len(), 4);
        assert_eq!(encoder.payload_len(), 25);
        assert_eq!(encoder.checksum(), 0xfc60_51c1);

        let encoder = UREncoder::new("crypto-psbt", &counting(100)).unwrap().with_part_len(30).unwrap();
        assert_eq!(encoder.msg_len(), 102);
        assert_eq!(encoder.seq_len(), 4);
        assert_eq!(encoder.payload_len(), 26);
        assert_eq!(encoder.checksum(), 0x9c7d_7c35);
    }

    #[test]
    fn part_text() {
        let mut encoder = UREncoder::new("crypto-psbt", &counting(98)).unwrap().with_part_len(25).unwrap();
        assert_eq!(
            encoder.next_part(),
            "UR:CRYPTO-PSBT/1-4/LPADAACSIECYZTHNGYSEHDCFHDIDAEADAOAXAAAHAMATAYASBKBDBNBTBABSBEBYBGBWBBBZCMJTOXUEAT"
        );
        assert_eq!(encoder.current_index(), 1);
        assert_eq!(
            encoder.get_part(3),
            "UR:CRYPTO-PSBT/4-4/LPAAAACSIECYZTHNGYSEHDCFGAGEGRGSGTGLGWGDGYGMGUGHGOHFHGHDHKHTHPHHHLHYHEHNHSSPENLTHP"
        );
        //Part 5 only combines fragment 4
        assert_eq!(
            encoder.get_part(4),
            "UR:CRYPTO-PSBT/5-4/LPAHAACSIECYZTHNGYSEHDCFGAGEGRGSGTGLGWGDGYGMGUGHGOHFHGHDHKHTHPHHHLHYHEHNHSHLFGGUTO"
        );
        assert_eq!(
            encoder.get_part(5),
            "UR:CRYPTO-PSBT/6-4/LPAMAACSIECYZTHNGYSEHDCFLBGRDNDEDPDRDLDWCLCKBWBEBZBGCHBBINIYKGKSKIKNLBKEJSRSBNMWIO"
        );
    }

    #[test]
    fn single_part() {
        let mut encoder = UREncoder::new("crypto-psbt", &[1, 2, 3, 4, 5]).unwrap();
        assert!(encoder.is_single_part());
        assert_eq!(encoder.next_part(), "UR:CRYPTO-PSBT/FEADAOAXAAAHJLKBGHMD");
        assert_eq!(encoder.next_part(), "UR:CRYPTO-PSBT/FEADAOAXAAAHJLKBGHMD");
        assert_eq!(encoder.current_index(), 0);
    }

    #[test]
    fn rejects_bad_configuration() {
        assert_eq!(
            UREncoder::new("crypto-psbt", &[1]).unwrap().with_part_len(0).unwrap_err(),
            URError::ZeroPartLength
        );
        assert!(matches!(UREncoder::new("Crypto-PSBT", &[1]), Err(URError::InvalidType(_))));
        assert!(matches!(UREncoder::from_cbor("bytes", vec![]), Err(URError::Cbor(_))));
        assert!(matches!(UREncoder::from_cbor("bytes", vec![0x82, 0x01]), Err(URError::Cbor(_))));

        let err = UREncoder::new("bytes", &vec![0u8; MAX_MESSAGE_LEN]).unwrap_err();
        assert_eq!(err, URError::MessageTooLarge(MAX_MESSAGE_LEN + 5));
        assert_eq!(err.kind(), crate::error::ErrorKind::Domain);
    }

    #[test]
    fn every_part_has_the_same_length() {
        let encoder = UREncoder::new("bytes", &[0x5a; 1000]).unwrap();
        let lengths: Vec<usize> = (0..20).map(|i| encoder.get_part(i).len()).collect();
        assert_eq!(encoder.seq_len(), 11);
        //Part numbers grow from one to two digits
        assert!(lengths[..9].iter().all(|l| *l == lengths[0]));
        assert!(lengths[9..].iter().all(|l| *l == lengths[0] + 1));
    }
}
