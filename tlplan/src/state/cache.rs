//! Memoization of defined predicates and functions.
//!
//! Each evaluation of a defined formula is recorded before its body is
//! evaluated. Meeting the same record again while it is still in progress
//! means the definition recursed into itself with the same arguments.

use core::{fmt::Debug, marker::PhantomData};
use hashbrown::HashMap;

use crate::fuzzy::{Bool, ConstantValue, Double, FuzzyBool, FuzzyConstant, FuzzyDouble};

/// A defined formula applied to ground arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    /// Position of the definition among its kind.
    pub definition: usize,
    /// Position of the argument tuple among the definition's ground instances.
    pub arguments: usize,
    /// Bits of the `?duration` the body was evaluated with, if any.
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry<T> {
    /// No record existed, one is now in progress and
    /// the caller has to either finish or abandon it.
    New,
    InProgress,
    Finished(T),
}

#[derive(Debug, Clone, PartialEq)]
enum Record<T> {
    InProgress,
    Finished(T),
}

pub trait CacheNamespace<T> {
    fn get_evaluation(&mut self, key: CacheKey) -> CacheEntry<T>;
    fn finish(&mut self, key: CacheKey, value: T);
    /// Drops an unfinished record, e.g. after its evaluation failed.
    fn abandon(&mut self, key: CacheKey);
}

/// Records of one kind of defined formula.
#[derive(Debug, Clone)]
pub struct Namespace<T>(HashMap<CacheKey, Record<T>>);

impl<T> Default for Namespace<T> {
    fn default() -> Self {
        Self(HashMap::default())
    }
}

impl<T> Namespace<T> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<T: Clone + Debug> CacheNamespace<T> for Namespace<T> {
    fn get_evaluation(&mut self, key: CacheKey) -> CacheEntry<T> {
        match self.0.get(&key) {
            Some(Record::Finished(v)) => {
                log::trace!("Cache hit {:?} = {:?}", key, v);
                CacheEntry::Finished(v.clone())
            }
            Some(Record::InProgress) => CacheEntry::InProgress,
            None => {
                log::trace!("Cache miss {:?}", key);
                self.0.insert(key, Record::InProgress);
                CacheEntry::New
            }
        }
    }

    fn finish(&mut self, key: CacheKey, value: T) {
        self.0.insert(key, Record::Finished(value));
    }

    fn abandon(&mut self, key: CacheKey) {
        if let Some(Record::InProgress) = self.0.get(&key) {
            self.0.remove(&key);
        }
    }
}

/// Presents a namespace of closed-world values as one of fuzzy values.
///
/// Reads widen, writes narrow. Closed namespaces cannot hold Unknown,
/// finishing a record with it abandons the record instead.
pub struct NamespaceView<'a, C, F> {
    inner: &'a mut Namespace<C>,
    _marker: PhantomData<F>,
}

impl<'a, C, F> NamespaceView<'a, C, F> {
    pub fn new(inner: &'a mut Namespace<C>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<C, F> CacheNamespace<F> for NamespaceView<'_, C, F>
where
    C: Clone + Debug + Into<F> + TryFrom<F>,
    F: Debug,
{
    fn get_evaluation(&mut self, key: CacheKey) -> CacheEntry<F> {
        match self.inner.get_evaluation(key) {
            CacheEntry::New => CacheEntry::New,
            CacheEntry::InProgress => CacheEntry::InProgress,
            CacheEntry::Finished(v) => CacheEntry::Finished(v.into()),
        }
    }

    fn finish(&mut self, key: CacheKey, value: F) {
        match C::try_from(value) {
            Ok(v) => self.inner.finish(key, v),
            Err(_) => {
                log::warn!("Unknown result cannot be cached in a closed world, dropping {:?}", key);
                self.inner.abandon(key);
            }
        }
    }

    fn abandon(&mut self, key: CacheKey) {
        self.inner.abandon(key);
    }
}

/// Per-world records of defined predicates, numeric functions
/// and object functions.
#[derive(Debug, Clone)]
pub struct EvaluationCache<B, N, O> {
    pub predicates: Namespace<B>,
    pub functions: Namespace<N>,
    pub objects: Namespace<O>,
}

impl<B, N, O> Default for EvaluationCache<B, N, O> {
    fn default() -> Self {
        Self {
            predicates: Namespace::default(),
            functions: Namespace::default(),
            objects: Namespace::default(),
        }
    }
}

impl<B, N, O> EvaluationCache<B, N, O> {
    pub fn clear(&mut self) {
        self.predicates.clear();
        self.functions.clear();
        self.objects.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.functions.is_empty() && self.objects.is_empty()
    }
}

pub type ClosedEvaluationCache = EvaluationCache<Bool, Double, ConstantValue>;
pub type FuzzyEvaluationCache = EvaluationCache<FuzzyBool, FuzzyDouble, FuzzyConstant>;

impl ClosedEvaluationCache {
    pub fn fuzzy_predicates(&mut self) -> NamespaceView<'_, Bool, FuzzyBool> {
        NamespaceView::new(&mut self.predicates)
    }

    pub fn fuzzy_functions(&mut self) -> NamespaceView<'_, Double, FuzzyDouble> {
        NamespaceView::new(&mut self.functions)
    }

    pub fn fuzzy_objects(&mut self) -> NamespaceView<'_, ConstantValue, FuzzyConstant> {
        NamespaceView::new(&mut self.objects)
    }
}
