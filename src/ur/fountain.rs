/*
    Fountain code bookkeeping: which fragments a part combines and how
    received combinations are reduced back to single fragments.
*/

use std::collections::{BTreeMap, BTreeSet};

use super::{sampler::RandomSampler, xoshiro::Xoshiro256};

/// Indices of the pure fragments XORed into one part.
pub type PartSet = BTreeSet<usize>;

/**
    Chooses the fragments of every part of one transfer.

    The degree distribution only depends on seq_len, so its alias
    table is built once per chooser and reused for every mixed part.
*/
#[derive(Debug, Clone)]
pub struct FragmentChooser {
    seq_len: usize,
    checksum: u32,
    degrees: RandomSampler,
}

impl FragmentChooser {
    pub fn new(seq_len: usize, checksum: u32) -> Self {
        let weights: Vec<f64> = (1..=seq_len).map(|i| 1.0 / i as f64).collect();
        Self { seq_len, checksum, degrees: RandomSampler::new(&weights) }
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /**
        Part `seq_num` (counted from 1) of the first seq_len parts is
        just fragment `seq_num - 1`. Past that the degree is drawn with
        weight 1/d and that many distinct fragments are picked.
    */
    pub fn choose(&self, seq_num: u32) -> PartSet {
        if seq_num as usize <= self.seq_len {
            return PartSet::from([(seq_num as usize).saturating_sub(1)]);
        }
        let mut rng = Xoshiro256::for_part(seq_num, self.checksum);
        let degree = self.degrees.next(&mut rng) + 1;

        let mut remaining: Vec<usize> = (0..self.seq_len).collect();
        let mut chosen = PartSet::new();
        while chosen.len() < degree {
            let index = rng.next_int(0, remaining.len() as u64 - 1) as usize;
            chosen.insert(remaining.remove(index));
        }
        chosen
    }
}

pub fn xor_into(target: &mut [u8], other: &[u8]) {
    for (t, o) in target.iter_mut().zip(other) {
        *t ^= o;
    }
}

/// Splits `message` into `seq_len` fragments of `payload_len`, zero padding the last.
pub fn split_message(message: &[u8], payload_len: usize) -> Vec<Vec<u8>> {
    message
        .chunks(payload_len)
        .map(|chunk| {
            let mut fragment = chunk.to_vec();
            fragment.resize(payload_len, 0);
            fragment
        })
        .collect()
}

/**
    Received parts, kept reduced.

    Every stored set maps to the XOR of the fragments it names. A new
    set is first reduced by every stored set it contains, then used to
    reduce every stored set that contains it. Sets produced by the
    second step are fed back in, so a newly resolved fragment keeps
    peeling mixed parts until nothing changes.
*/
#[derive(Debug, Clone, Default)]
pub struct PartSets {
    seq_len: usize,
    parts: BTreeMap<PartSet, Vec<u8>>,
}

impl PartSets {
    pub fn new(seq_len: usize) -> Self {
        Self { seq_len, parts: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn contains(&self, set: &PartSet) -> bool {
        self.parts.contains_key(set)
    }

    /// Pure fragments resolved so far
    pub fn resolved(&self) -> usize {
        (0..self.seq_len).filter(|i| self.fragment(*i).is_some()).count()
    }

    pub fn fragment(&self, index: usize) -> Option<&[u8]> {
        self.parts.get(&PartSet::from([index])).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PartSet, &Vec<u8>)> {
        self.parts.iter()
    }

    //Every fragment the set names is already known on its own
    fn is_implied(&self, set: &PartSet) -> bool {
        set.iter().all(|i| self.fragment(*i).is_some())
    }

    /// Returns whether the part taught us anything.
    pub fn add(&mut self, set: PartSet, data: Vec<u8>) -> bool {
        if self.parts.contains_key(&set) || self.is_implied(&set) {
            return false;
        }

        let mut learned = false;
        let mut queue = vec![(set, data)];
        while let Some((mut set, mut data)) = queue.pop() {
            if set.len() > 1 {
                for (stored, payload) in &self.parts {
                    if stored.is_subset(&set) {
                        xor_into(&mut data, payload);
                        set = set.difference(stored).copied().collect();
                    }
                }
            }
            if set.is_empty() || self.parts.contains_key(&set) || self.is_implied(&set) {
                continue;
            }

            let supersets: Vec<PartSet> = self
                .parts
                .keys()
                .filter(|s| s.len() > set.len() && set.is_subset(s))
                .cloned()
                .collect();
            for superset in supersets {
                if let Some(mut payload) = self.parts.remove(&superset) {
                    xor_into(&mut payload, &data);
                    queue.push((superset.difference(&set).copied().collect(), payload));
                }
            }
            self.parts.insert(set, data);
            learned = true;
        }
        learned
    }

    pub fn is_complete(&self) -> bool {
        self.seq_len > 0 && self.resolved() == self.seq_len
    }

    /// Concatenation of all fragments, `None` while any is missing.
    pub fn join(&self) -> Option<Vec<u8>> {
        let mut out = vec![];
        for i in 0..self.seq_len {
            out.extend_from_slice(self.fragment(i)?);
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cbor::bytes_head, hash::crc32};

    fn message(n: u8) -> Vec<u8> {
        let mut msg = bytes_head(n as usize);
        msg.extend(0..n);
        msg
    }

    fn set(items: &[usize]) -> PartSet {
        items.iter().copied().collect()
    }

    fn mixed(fragments: &[Vec<u8>], set: &PartSet) -> Vec<u8> {
        let mut out = vec![0u8; fragments[0].len()];
        for i in set {
            xor_into(&mut out, &fragments[*i]);
        }
        out
    }

    #[test]
    fn pure_parts_map_to_singletons() {
        let chooser = FragmentChooser::new(4, 0xfc60_51c1);
        for seq_num in 1..=4u32 {
            assert_eq!(chooser.choose(seq_num), set(&[seq_num as usize - 1]));
        }
    }

    #[test]
    fn mixed_part_selection() {
        let msg = message(98);
        assert_eq!(crc32(&msg), 0xfc60_51c1);
        let chooser = FragmentChooser::new(4, crc32(&msg));
        let chosen: Vec<PartSet> = (5..15).map(|n| chooser.choose(n)).collect();
        let expected: [&[usize]; 10] = [
            &[3], &[0, 1, 2], &[0, 2, 3], &[0, 2, 3], &[2],
            &[0, 1], &[3], &[1], &[0], &[3],
        ];
        let expected: Vec<PartSet> = expected.iter().map(|s| set(s)).collect();
        assert_eq!(chosen, expected);

        let msg = message(100);
        assert_eq!(crc32(&msg), 0x9c7d_7c35);
        let chooser = FragmentChooser::new(4, crc32(&msg));
        let chosen: Vec<PartSet> = (5..15).map(|n| chooser.choose(n)).collect();
        let expected: [&[usize]; 10] = [
            &[0, 1, 3], &[1], &[0, 3], &[1], &[1, 3],
            &[1, 3], &[0], &[2], &[0, 1, 3], &[0, 2],
        ];
        let expected: Vec<PartSet> = expected.iter().map(|s| set(s)).collect();
        assert_eq!(chosen, expected);
    }

    #[test]
    fn selection_is_deterministic() {
        let a = FragmentChooser::new(9, 0x1234_5678);
        let b = FragmentChooser::new(9, 0x1234_5678);
        for n in 10..60 {
            let chosen = a.choose(n);
            assert_eq!(chosen, b.choose(n));
            assert!(!chosen.is_empty() && chosen.iter().all(|i| *i < 9));
        }
    }

    #[test]
    fn split_pads_last_fragment() {
        let fragments = split_message(&message(100), 26);
        assert_eq!(fragments.len(), 4);
        assert!(fragments.iter().all(|f| f.len() == 26));
        assert_eq!(&fragments[3][24..], &[0, 0]);
    }

    #[test]
    fn mixed_parts_reduce_to_fragments() {
        let fragments = split_message(&message(100), 26);
        let chooser = FragmentChooser::new(4, 0x9c7d_7c35);
        let mut parts = PartSets::new(4);

        //5 = {0,1,3}
        assert!(parts.add(chooser.choose(5), mixed(&fragments, &chooser.choose(5))));
        //6 = {1} peels {0,1,3} down to {0,3}
        assert!(parts.add(chooser.choose(6), fragments[1].clone()));
        assert!(parts.contains(&set(&[0, 3])));
        assert!(!parts.contains(&set(&[0, 1, 3])));
        //7 = {0,3} is already known
        assert!(!parts.add(chooser.choose(7), mixed(&fragments, &chooser.choose(7))));
        //11 = {0} resolves 3 as well
        assert!(parts.add(chooser.choose(11), fragments[0].clone()));
        assert_eq!(parts.fragment(3), Some(&fragments[3][..]));
        assert!(!parts.is_complete());
        //12 = {2}
        assert!(parts.add(chooser.choose(12), fragments[2].clone()));
        assert!(parts.is_complete());
        assert_eq!(parts.join().unwrap(), fragments.concat());

        //Anything after completion is implied
        assert!(!parts.add(set(&[0, 2]), mixed(&fragments, &set(&[0, 2]))));
    }

    #[test]
    fn dependent_combinations_teach_nothing() {
        let fragments: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i; 3]).collect();
        let mut parts = PartSets::new(4);
        assert!(parts.add(set(&[0, 1]), mixed(&fragments, &set(&[0, 1]))));
        assert!(parts.add(set(&[2, 3]), mixed(&fragments, &set(&[2, 3]))));
        assert!(!parts.add(set(&[0, 1, 2, 3]), mixed(&fragments, &set(&[0, 1, 2, 3]))));
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn reduction_cascades() {
        let fragments: Vec<Vec<u8>> = (0..3u8).map(|i| vec![i + 1; 4]).collect();
        let mut parts = PartSets::new(3);
        parts.add(set(&[0, 1]), mixed(&fragments, &set(&[0, 1])));
        parts.add(set(&[1, 2]), mixed(&fragments, &set(&[1, 2])));
        assert_eq!(parts.resolved(), 0);

        //{0} gives {1}, which in turn gives {2}
        parts.add(set(&[0]), fragments[0].clone());
        assert!(parts.is_complete());
        for (i, f) in fragments.iter().enumerate() {
            assert_eq!(parts.fragment(i), Some(&f[..]));
        }
    }

    #[test]
    fn stored_payloads_match_their_sets() {
        let fragments = split_message(&message(98), 25);
        let chooser = FragmentChooser::new(4, 0xfc60_51c1);
        let mut parts = PartSets::new(4);
        for seq_num in [6, 7, 10, 2] {
            let chosen = chooser.choose(seq_num);
            let data = mixed(&fragments, &chosen);
            parts.add(chosen, data);
            for (s, payload) in parts.iter() {
                assert_eq!(payload, &mixed(&fragments, s));
            }
        }
    }
}
