/*
    Fountain decoder. Accepts parts of one transfer in any order, with
    repeats, until every fragment is known.
*/

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::{
    cbor::Value,
    hash::crc32,
    ur::{
        bytewords,
        fountain::{FragmentChooser, PartSet, PartSets},
        header::{parse_part_text, PartHeader},
        URError,
    },
};

/// Values the first multi part fixes for the rest of the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transfer {
    seq_len: usize,
    msg_len: usize,
    checksum: u32,
    payload_len: usize,
}

impl Transfer {
    fn check(&self, header: &PartHeader) -> Result<(), URError> {
        if header.seq_len != self.seq_len {
            return Err(URError::TransferMismatch("seq_len"));
        }
        if header.msg_len != self.msg_len {
            return Err(URError::TransferMismatch("msg_len"));
        }
        if header.checksum != self.checksum {
            return Err(URError::TransferMismatch("checksum"));
        }
        if header.payload_len != self.payload_len {
            return Err(URError::TransferMismatch("payload_len"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct URDecoder {
    ur_type: Option<String>,
    transfer: Option<Transfer>,
    chooser: Option<FragmentChooser>,
    parts: PartSets,
    //Part sets as they arrived, before any reduction
    seen: BTreeSet<PartSet>,
    progress: f64,
    message: Option<Vec<u8>>,
    //Bytewords of the current part decode into this buffer
    scratch: Vec<u8>,
}

impl URDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ur_type(&self) -> Option<&str> {
        self.ur_type.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.message.is_some()
    }

    /// Number of fragments of the transfer once a multi part has been read.
    pub fn expected_part_count(&self) -> Option<usize> {
        self.transfer.map(|t| t.seq_len)
    }

    /// Distinct parts received so far.
    pub fn received_part_count(&self) -> usize {
        self.seen.len()
    }

    /**
        Rough share of the transfer received, between 0 and 1. Each known
        fragment counts 0.8 and each unresolved combination 0.1, against
        the number of distinct parts over 1.3 times the fragment count.
        Stays at 0.99 at most until the message is assembled and never
        goes down.
    */
    pub fn progress(&self) -> f64 {
        if self.is_complete() {
            1.0
        } else {
            self.progress
        }
    }

    fn estimate(&self, seq_len: usize) -> f64 {
        let weight: f64 = self
            .parts
            .iter()
            .map(|(set, _)| if set.len() == 1 { 0.8 } else { 0.1 })
            .sum();
        let by_weight = weight / seq_len as f64;
        let by_count = self.seen.len() as f64 / seq_len as f64 / 1.3;
        let estimate = by_weight.max(by_count).min(0.99);
        (estimate * 100.0).round() / 100.0
    }

    /// Rejects parts whose type differs from the one the transfer is pinned to.
    fn check_type(&self, ur_type: &str) -> Result<(), URError> {
        match &self.ur_type {
            Some(expected) if expected != ur_type => Err(URError::TypeMismatch {
                expected: expected.clone(),
                found: ur_type.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /**
        Feeds one part. Returns whether it added anything; repeats and
        combinations of already known fragments return false.
        A part that fails to parse leaves the decoder as it was.
    */
    pub fn read_part(&mut self, part: &str) -> Result<bool, URError> {
        let text = parse_part_text(part)?;
        self.check_type(&text.ur_type)?;

        let Some((seq_num, seq_len)) = text.sequence else {
            bytewords::decode_check_into(text.body, &mut self.scratch)?;
            if self.is_complete() {
                return Ok(false);
            }
            if self.transfer.is_some() {
                return Err(URError::TransferMismatch("seq_len"));
            }
            debug!(msg_len = self.scratch.len(), "single part ur");
            self.ur_type = Some(text.ur_type);
            self.message = Some(self.scratch.clone());
            return Ok(true);
        };

        bytewords::decode_check_into(text.body, &mut self.scratch)?;
        let (header, payload) = PartHeader::parse(&self.scratch)?;
        if header.seq_num != seq_num || header.seq_len != seq_len {
            return Err(URError::HeaderMismatch {
                text: format!("{seq_num}-{seq_len}"),
                header: format!("{}-{}", header.seq_num, header.seq_len),
            });
        }
        let payload = payload.to_vec();

        if let Some(transfer) = &self.transfer {
            transfer.check(&header)?;
        } else if self.is_complete() {
            //Already finished as a single part message
            return Err(URError::TransferMismatch("seq_len"));
        } else {
            self.transfer = Some(Transfer {
                seq_len: header.seq_len,
                msg_len: header.msg_len,
                checksum: header.checksum,
                payload_len: header.payload_len,
            });
            self.chooser = Some(FragmentChooser::new(header.seq_len, header.checksum));
            self.parts = PartSets::new(header.seq_len);
            self.ur_type = Some(text.ur_type);
        }
        if self.is_complete() {
            return Ok(false);
        }

        let Some(chooser) = &self.chooser else {
            return Ok(false);
        };
        let set = chooser.choose(seq_num);
        if !self.seen.insert(set.clone()) {
            trace!(seq_num, "duplicate ur part");
            return Ok(false);
        }
        let learned = self.parts.add(set, payload);
        self.progress = self.progress.max(self.estimate(header.seq_len));
        debug!(
            seq_num,
            resolved = self.parts.resolved(),
            seq_len = header.seq_len,
            progress = self.progress,
            learned,
            "ur part"
        );

        if self.parts.is_complete() {
            self.assemble(&header)?;
        }
        Ok(learned)
    }

    fn assemble(&mut self, header: &PartHeader) -> Result<(), URError> {
        let Some(mut message) = self.parts.join() else {
            return Ok(());
        };
        message.truncate(header.msg_len);
        let found = crc32(&message);
        if found != header.checksum {
            return Err(URError::MessageChecksum { expected: header.checksum, found });
        }
        debug!(msg_len = message.len(), parts = self.seen.len(), "ur message complete");
        self.message = Some(message);
        Ok(())
    }

    /// The reassembled CBOR message.
    pub fn result_message(&self) -> Result<&[u8], URError> {
        self.message.as_deref().ok_or(URError::NotComplete)
    }

    /// The byte string the message wraps, as sent by `UREncoder::new`.
    pub fn result(&self) -> Result<Vec<u8>, URError> {
        let message = Value::decode(self.result_message()?)?;
        Ok(message.as_bytes()?.to_vec())
    }
}
