//! Interchangeable representations of numeric and object fluent values.
//!
//! A fluent without a value is Undefined. [ArrayFluents] additionally
//! reports fluents outside of its interval as Unknown.

use alloc::{collections::BTreeMap, vec, vec::Vec};
use core::{
    cmp::Ordering,
    fmt::Debug,
    hash::{Hash, Hasher},
    ops::Range,
};
use gazebo::dupe::Dupe;
use hashbrown::HashMap;
use itertools::Itertools;

use crate::{
    calculus::signature::FluentId,
    entity::ConstantHandle,
    fuzzy::{FuzzyConstant, FuzzyDouble, Real},
    state::mix,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FluentValue {
    Number(Real),
    Object(ConstantHandle),
}

impl FluentValue {
    fn hash_code(&self) -> u64 {
        match self {
            Self::Number(r) => mix(r.0.to_bits()),
            Self::Object(c) => mix(!(c.index() as u64)),
        }
    }
}

impl From<f64> for FluentValue {
    fn from(value: f64) -> Self {
        Self::Number(Real(value))
    }
}

impl From<ConstantHandle> for FluentValue {
    fn from(value: ConstantHandle) -> Self {
        Self::Object(value)
    }
}

/// What a container knows about one fluent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    Value(&'a FluentValue),
    Undefined,
    Unknown,
}

pub trait FluentsContainer: Clone + Debug + Eq + Hash + Ord {
    fn lookup(&self, id: FluentId) -> Entry<'_>;
    fn set(&mut self, id: FluentId, value: FluentValue);
    fn undefine(&mut self, id: FluentId);

    /// Order-independent hash of the content, maintained on every change.
    fn hash_code(&self) -> u64;

    /// Every defined fluent, sorted by ID.
    fn entries(&self) -> Vec<(FluentId, FluentValue)>;

    /// The fluent as a number, object values read as Undefined.
    fn number(&self, id: FluentId) -> FuzzyDouble {
        match self.lookup(id) {
            Entry::Value(FluentValue::Number(r)) => FuzzyDouble::Defined(r.0),
            Entry::Value(FluentValue::Object(_)) | Entry::Undefined => FuzzyDouble::Undefined,
            Entry::Unknown => FuzzyDouble::Unknown,
        }
    }

    /// The fluent as an object, numbers read as Undefined.
    fn object(&self, id: FluentId) -> FuzzyConstant {
        match self.lookup(id) {
            Entry::Value(FluentValue::Object(c)) => FuzzyConstant::Defined(c.dupe()),
            Entry::Value(FluentValue::Number(_)) | Entry::Undefined => FuzzyConstant::Undefined,
            Entry::Unknown => FuzzyConstant::Unknown,
        }
    }
}

fn contribution(id: FluentId, value: &FluentValue) -> u64 {
    mix((id as u64) ^ value.hash_code())
}

/// One slot per fluent of `[offset, offset + len)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayFluents {
    offset: FluentId,
    values: Vec<Option<FluentValue>>,
    hash: u64,
}

impl ArrayFluents {
    pub fn new(interval: Range<FluentId>) -> Self {
        Self {
            offset: interval.start,
            values: vec![None; interval.end.saturating_sub(interval.start)],
            hash: 0,
        }
    }

    pub fn interval(&self) -> Range<FluentId> {
        self.offset..self.offset + self.values.len()
    }

    fn slot(&mut self, id: FluentId) -> Option<&mut Option<FluentValue>> {
        let offset = self.offset;
        id.checked_sub(offset).and_then(|i| self.values.get_mut(i))
    }
}

impl FluentsContainer for ArrayFluents {
    fn lookup(&self, id: FluentId) -> Entry<'_> {
        match id.checked_sub(self.offset).and_then(|i| self.values.get(i)) {
            Some(Some(v)) => Entry::Value(v),
            Some(None) => Entry::Undefined,
            None => Entry::Unknown,
        }
    }

    fn set(&mut self, id: FluentId, value: FluentValue) {
        let interval = self.interval();
        let mut hash = self.hash;
        let Some(slot) = self.slot(id) else {
            log::warn!("Fluent {} is outside of {:?}, not set", id, interval);
            return;
        };
        if let Some(old) = slot {
            hash = hash.wrapping_sub(contribution(id, old));
        }
        hash = hash.wrapping_add(contribution(id, &value));
        *slot = Some(value);
        self.hash = hash;
    }

    fn undefine(&mut self, id: FluentId) {
        let mut hash = self.hash;
        if let Some(slot) = self.slot(id) {
            if let Some(old) = slot.take() {
                hash = hash.wrapping_sub(contribution(id, &old));
            }
        }
        self.hash = hash;
    }

    fn hash_code(&self) -> u64 {
        self.hash
    }

    fn entries(&self) -> Vec<(FluentId, FluentValue)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.clone().map(|v| (self.offset + i, v)))
            .collect()
    }
}

impl Hash for ArrayFluents {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for ArrayFluents {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArrayFluents {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.offset.cmp(&other.offset))
            .then_with(|| self.values.cmp(&other.values))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashFluents {
    values: HashMap<FluentId, FluentValue>,
    hash: u64,
}

impl HashFluents {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FluentsContainer for HashFluents {
    fn lookup(&self, id: FluentId) -> Entry<'_> {
        self.values.get(&id).map_or(Entry::Undefined, Entry::Value)
    }

    fn set(&mut self, id: FluentId, value: FluentValue) {
        self.hash = self.hash.wrapping_add(contribution(id, &value));
        if let Some(old) = self.values.insert(id, value) {
            self.hash = self.hash.wrapping_sub(contribution(id, &old));
        }
    }

    fn undefine(&mut self, id: FluentId) {
        if let Some(old) = self.values.remove(&id) {
            self.hash = self.hash.wrapping_sub(contribution(id, &old));
        }
    }

    fn hash_code(&self) -> u64 {
        self.hash
    }

    fn entries(&self) -> Vec<(FluentId, FluentValue)> {
        self.values
            .iter()
            .map(|(&i, v)| (i, v.clone()))
            .sorted()
            .collect()
    }
}

impl Hash for HashFluents {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for HashFluents {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HashFluents {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.entries().cmp(&other.entries()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedFluents {
    values: BTreeMap<FluentId, FluentValue>,
    hash: u64,
}

impl SortedFluents {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FluentsContainer for SortedFluents {
    fn lookup(&self, id: FluentId) -> Entry<'_> {
        self.values.get(&id).map_or(Entry::Undefined, Entry::Value)
    }

    fn set(&mut self, id: FluentId, value: FluentValue) {
        self.hash = self.hash.wrapping_add(contribution(id, &value));
        if let Some(old) = self.values.insert(id, value) {
            self.hash = self.hash.wrapping_sub(contribution(id, &old));
        }
    }

    fn undefine(&mut self, id: FluentId) {
        if let Some(old) = self.values.remove(&id) {
            self.hash = self.hash.wrapping_sub(contribution(id, &old));
        }
    }

    fn hash_code(&self) -> u64 {
        self.hash
    }

    fn entries(&self) -> Vec<(FluentId, FluentValue)> {
        self.values.iter().map(|(&i, v)| (i, v.clone())).collect()
    }
}

impl Hash for SortedFluents {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for SortedFluents {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortedFluents {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.values.cmp(&other.values))
    }
}
