//! Interchangeable representations of the set of true ground atomic formulas.
//!
//! [BitsetFacts] covers a fixed interval of IDs and decides every formula
//! inside of it. [HashFacts] and [SortedFacts] only know the formulas
//! they were told about and report everything else as Unknown.

use alloc::{collections::BTreeMap, vec, vec::Vec};
use core::{
    cmp::Ordering,
    fmt::Debug,
    hash::{Hash, Hasher},
    ops::Range,
};
use hashbrown::HashMap;
use itertools::Itertools;

use crate::{calculus::signature::FormulaId, fuzzy::FuzzyBool, state::mix};

pub trait FactsContainer: Clone + Debug + Eq + Hash + Ord {
    fn get(&self, id: FormulaId) -> FuzzyBool;
    fn set(&mut self, id: FormulaId);
    fn unset(&mut self, id: FormulaId);

    /// Order-independent hash of the content, maintained on every change.
    fn hash_code(&self) -> u64;

    /// IDs of the true formulas, sorted.
    fn true_facts(&self) -> Vec<FormulaId>;

    fn is_set(&self, id: FormulaId) -> bool {
        self.get(id) == FuzzyBool::True
    }
}

fn contribution(id: FormulaId, value: bool) -> u64 {
    mix(((id as u64) << 1) | value as u64)
}

/// One bit per formula of `[offset, offset + length)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitsetFacts {
    offset: FormulaId,
    length: usize,
    words: Vec<u64>,
    hash: u64,
}

impl BitsetFacts {
    pub fn new(interval: Range<FormulaId>) -> Self {
        let length = interval.end.saturating_sub(interval.start);
        Self {
            offset: interval.start,
            length,
            words: vec![0; length.div_ceil(64)],
            hash: 0,
        }
    }

    pub fn interval(&self) -> Range<FormulaId> {
        self.offset..self.offset + self.length
    }

    fn position(&self, id: FormulaId) -> Option<(usize, u64)> {
        if !self.interval().contains(&id) {
            return None;
        }
        let bit = id - self.offset;
        Some((bit / 64, 1 << (bit % 64)))
    }
}

impl FactsContainer for BitsetFacts {
    fn get(&self, id: FormulaId) -> FuzzyBool {
        match self.position(id) {
            Some((word, mask)) => (self.words[word] & mask != 0).into(),
            None => FuzzyBool::Unknown,
        }
    }

    fn set(&mut self, id: FormulaId) {
        let Some((word, mask)) = self.position(id) else {
            log::warn!("Formula {} is outside of {:?}, not set", id, self.interval());
            return;
        };
        if self.words[word] & mask == 0 {
            self.words[word] |= mask;
            self.hash = self.hash.wrapping_add(contribution(id, true));
        }
    }

    fn unset(&mut self, id: FormulaId) {
        let Some((word, mask)) = self.position(id) else {
            log::warn!("Formula {} is outside of {:?}, not unset", id, self.interval());
            return;
        };
        if self.words[word] & mask != 0 {
            self.words[word] &= !mask;
            self.hash = self.hash.wrapping_sub(contribution(id, true));
        }
    }

    fn hash_code(&self) -> u64 {
        self.hash
    }

    fn true_facts(&self) -> Vec<FormulaId> {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(w, &bits)| {
                (0..64)
                    .filter(move |&b| bits & (1u64 << b) != 0)
                    .map(move |b| self.offset + w * 64 + b)
            })
            .collect()
    }
}

impl Hash for BitsetFacts {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for BitsetFacts {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BitsetFacts {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.offset.cmp(&other.offset))
            .then_with(|| self.length.cmp(&other.length))
            .then_with(|| self.words.cmp(&other.words))
    }
}

/// Explicit truth values in a hash map, absent formulas are Unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashFacts {
    facts: HashMap<FormulaId, bool>,
    hash: u64,
}

impl HashFacts {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&mut self, id: FormulaId, value: bool) {
        if let Some(old) = self.facts.insert(id, value) {
            self.hash = self.hash.wrapping_sub(contribution(id, old));
        }
        self.hash = self.hash.wrapping_add(contribution(id, value));
    }

    fn sorted(&self) -> Vec<(FormulaId, bool)> {
        self.facts.iter().map(|(&i, &v)| (i, v)).sorted().collect()
    }
}

impl FactsContainer for HashFacts {
    fn get(&self, id: FormulaId) -> FuzzyBool {
        self.facts
            .get(&id)
            .map_or(FuzzyBool::Unknown, |&v| v.into())
    }

    fn set(&mut self, id: FormulaId) {
        self.store(id, true);
    }

    fn unset(&mut self, id: FormulaId) {
        self.store(id, false);
    }

    fn hash_code(&self) -> u64 {
        self.hash
    }

    fn true_facts(&self) -> Vec<FormulaId> {
        self.facts
            .iter()
            .filter(|&(_, &v)| v)
            .map(|(&i, _)| i)
            .sorted()
            .collect()
    }
}

impl Hash for HashFacts {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for HashFacts {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HashFacts {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.sorted().cmp(&other.sorted()))
    }
}

/// Explicit truth values kept in ID order, absent formulas are Unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedFacts {
    facts: BTreeMap<FormulaId, bool>,
    hash: u64,
}

impl SortedFacts {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&mut self, id: FormulaId, value: bool) {
        if let Some(old) = self.facts.insert(id, value) {
            self.hash = self.hash.wrapping_sub(contribution(id, old));
        }
        self.hash = self.hash.wrapping_add(contribution(id, value));
    }
}

impl FactsContainer for SortedFacts {
    fn get(&self, id: FormulaId) -> FuzzyBool {
        self.facts
            .get(&id)
            .map_or(FuzzyBool::Unknown, |&v| v.into())
    }

    fn set(&mut self, id: FormulaId) {
        self.store(id, true);
    }

    fn unset(&mut self, id: FormulaId) {
        self.store(id, false);
    }

    fn hash_code(&self) -> u64 {
        self.hash
    }

    fn true_facts(&self) -> Vec<FormulaId> {
        self.facts
            .iter()
            .filter(|&(_, &v)| v)
            .map(|(&i, _)| i)
            .collect()
    }
}

impl Hash for SortedFacts {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for SortedFacts {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortedFacts {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.facts.cmp(&other.facts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<F: FactsContainer>(mut facts: F, absent: FuzzyBool) {
        assert_eq!(facts.get(7), absent);
        facts.set(3);
        assert_eq!(facts.get(3), FuzzyBool::True);
        assert!(facts.is_set(3));
        facts.unset(3);
        assert_eq!(facts.get(3), FuzzyBool::False);

        facts.set(5);
        let mut copy = facts.clone();
        assert_eq!(copy, facts);

        copy.set(7);
        assert_eq!(facts.get(7), absent);
        assert_ne!(copy, facts);
        assert_eq!(copy.true_facts(), vec![5, 7]);

        facts.unset(5);
        assert!(copy.is_set(5));
    }

    fn order_independent<F: FactsContainer>(mut a: F, mut b: F) {
        a.set(1);
        a.set(2);
        a.unset(1);
        a.set(9);

        b.set(9);
        b.unset(1);
        b.set(2);

        assert_eq!(a.hash_code(), b.hash_code());
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_bitset_facts() {
        round_trip(BitsetFacts::new(0..100), FuzzyBool::False);
        order_independent(BitsetFacts::new(0..100), BitsetFacts::new(0..100));

        let mut facts = BitsetFacts::new(10..20);
        assert_eq!(facts.get(5), FuzzyBool::Unknown);
        assert_eq!(facts.get(10), FuzzyBool::False);
        facts.set(25);
        assert_eq!(facts.get(25), FuzzyBool::Unknown);
        assert_eq!(facts.hash_code(), 0);

        facts.set(19);
        facts.set(19);
        assert_eq!(facts.true_facts(), vec![19]);
    }

    #[test]
    fn test_bitset_spans_words() {
        let mut facts = BitsetFacts::new(0..200);
        facts.set(0);
        facts.set(63);
        facts.set(64);
        facts.set(199);
        assert_eq!(facts.true_facts(), vec![0, 63, 64, 199]);
    }

    #[test]
    fn test_hash_facts() {
        round_trip(HashFacts::new(), FuzzyBool::Unknown);
        order_independent(HashFacts::new(), HashFacts::new());
        assert_eq!(HashFacts::new().get(42), FuzzyBool::Unknown);
    }

    #[test]
    fn test_sorted_facts() {
        round_trip(SortedFacts::new(), FuzzyBool::Unknown);
        order_independent(SortedFacts::new(), SortedFacts::new());
        assert_eq!(SortedFacts::new().get(42), FuzzyBool::Unknown);
    }

    #[test]
    fn test_unset_differs_from_absent() {
        let mut a = SortedFacts::new();
        let b = SortedFacts::new();
        a.unset(4);
        assert_ne!(a, b);
        assert_ne!(a.hash_code(), b.hash_code());
    }

    #[test]
    fn test_hash_first_ordering() {
        let mut a = SortedFacts::new();
        let mut b = SortedFacts::new();
        a.set(1);
        b.set(2);
        assert_eq!(a.cmp(&b), a.hash_code().cmp(&b.hash_code()));
    }
}
