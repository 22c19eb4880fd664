//! Worlds expressions are evaluated against.
//!
//! A [State] is one search node: a facts container, a fluents container,
//! the time it was reached at and its own evaluation cache.
//! States are never modified once they are handed to the search,
//! successors are built on clones.

pub mod cache;
pub mod context;
pub mod facts;
pub mod fluents;

use alloc::rc::Rc;
use core::{
    cell::RefCell,
    cmp::Ordering,
    hash::{Hash, Hasher},
};
use getset::Getters;

use crate::{
    calculus::{
        defined::Definitions,
        signature::{FluentId, FormulaId},
    },
    fuzzy::{
        Bool, ConstantValue, Double, FuzzyBool, FuzzyConstant, FuzzyDouble, Number, ObjectValue,
        Real, Truth,
    },
};
use cache::{CacheNamespace, ClosedEvaluationCache, FuzzyEvaluationCache};
use facts::FactsContainer;
use fluents::{FluentValue, FluentsContainer};

/// Finalizer of splitmix64, spreads IDs over the whole hash range
/// so that sums of contributions do not collide for small IDs.
pub(crate) fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Read access to facts, fluents and defined formulas.
///
/// The associated value types decide whether the world is closed
/// (no Unknown) or open.
pub trait World {
    type Truth: Truth;
    type Number: Number<Truth = Self::Truth>;
    type Object: ObjectValue<Truth = Self::Truth>;

    fn fact(&self, id: FormulaId) -> Self::Truth;
    fn numeric_fluent(&self, id: FluentId) -> Self::Number;
    fn object_fluent(&self, id: FluentId) -> Self::Object;

    fn definitions(&self) -> &Definitions;

    fn with_predicate_cache<R>(
        &self,
        f: impl FnOnce(&mut dyn CacheNamespace<Self::Truth>) -> R,
    ) -> R;
    fn with_function_cache<R>(
        &self,
        f: impl FnOnce(&mut dyn CacheNamespace<Self::Number>) -> R,
    ) -> R;
    fn with_object_cache<R>(&self, f: impl FnOnce(&mut dyn CacheNamespace<Self::Object>) -> R)
        -> R;
}

/// Worlds where every fact and fluent is decided.
pub trait ClosedWorld: World<Truth = Bool, Number = Double, Object = ConstantValue> {}

impl<W: World<Truth = Bool, Number = Double, Object = ConstantValue>> ClosedWorld for W {}

/// Worlds that may not know some facts or fluents.
pub trait OpenWorld: World<Truth = FuzzyBool, Number = FuzzyDouble, Object = FuzzyConstant> {}

impl<W: World<Truth = FuzzyBool, Number = FuzzyDouble, Object = FuzzyConstant>> OpenWorld for W {}

/// Closed worlds placed on a timeline, what temporal constraints progress through.
pub trait DurativeWorld: ClosedWorld {
    fn timestamp(&self) -> f64;
}

/// Worlds effects can be written to.
pub trait UpdateWorld {
    fn set_fact(&mut self, id: FormulaId);
    fn unset_fact(&mut self, id: FormulaId);
    fn set_fluent(&mut self, id: FluentId, value: FluentValue);
    fn undefine_fluent(&mut self, id: FluentId);
}

/// Closed world search node.
///
/// Facts missing from a map-based container are taken to be false,
/// fluents without a value are Undefined.
#[derive(Debug, Getters)]
pub struct State<F: FactsContainer, L: FluentsContainer> {
    #[getset(get = "pub")]
    facts: F,
    #[getset(get = "pub")]
    fluents: L,
    timestamp: Real,
    definitions: Rc<Definitions>,
    cache: RefCell<ClosedEvaluationCache>,
}

impl<F: FactsContainer, L: FluentsContainer> State<F, L> {
    pub fn new(facts: F, fluents: L, definitions: &Rc<Definitions>) -> Self {
        Self {
            facts,
            fluents,
            timestamp: Real(0.0),
            definitions: Rc::clone(definitions),
            cache: RefCell::default(),
        }
    }

    pub fn at(mut self, timestamp: f64) -> Self {
        self.timestamp = Real(timestamp);
        self
    }

    pub fn set_timestamp(&mut self, timestamp: f64) {
        self.timestamp = Real(timestamp);
    }

    /// Closed view of the facts container.
    pub fn is_true(&self, id: FormulaId) -> bool {
        self.fact(id) == Bool::True
    }

    /// The same state seen as an open world.
    pub fn as_open(&self) -> OpenView<'_, F, L> {
        OpenView(self)
    }

    pub fn cached_evaluations(&self) -> usize {
        let cache = self.cache.borrow();
        cache.predicates.len() + cache.functions.len() + cache.objects.len()
    }

    fn invalidate(&mut self) {
        self.cache.get_mut().clear();
    }
}

/// Clones start with an empty cache.
impl<F: FactsContainer, L: FluentsContainer> Clone for State<F, L> {
    fn clone(&self) -> Self {
        Self {
            facts: self.facts.clone(),
            fluents: self.fluents.clone(),
            timestamp: self.timestamp,
            definitions: Rc::clone(&self.definitions),
            cache: RefCell::default(),
        }
    }
}

impl<F: FactsContainer, L: FluentsContainer> PartialEq for State<F, L> {
    fn eq(&self, other: &Self) -> bool {
        self.facts == other.facts
            && self.fluents == other.fluents
            && self.timestamp == other.timestamp
    }
}

impl<F: FactsContainer, L: FluentsContainer> Eq for State<F, L> {}

impl<F: FactsContainer, L: FluentsContainer> Hash for State<F, L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.facts.hash(state);
        self.fluents.hash(state);
        self.timestamp.hash(state);
    }
}

impl<F: FactsContainer, L: FluentsContainer> PartialOrd for State<F, L> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<F: FactsContainer, L: FluentsContainer> Ord for State<F, L> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.facts
            .cmp(&other.facts)
            .then_with(|| self.fluents.cmp(&other.fluents))
            .then_with(|| self.timestamp.cmp(&other.timestamp))
    }
}

impl<F: FactsContainer, L: FluentsContainer> World for State<F, L> {
    type Truth = Bool;
    type Number = Double;
    type Object = ConstantValue;

    fn fact(&self, id: FormulaId) -> Bool {
        match self.facts.get(id) {
            FuzzyBool::True => Bool::True,
            FuzzyBool::False => Bool::False,
            FuzzyBool::Undefined => Bool::Undefined,
            FuzzyBool::Unknown => {
                log::trace!("Formula {} is unknown, assuming false", id);
                Bool::False
            }
        }
    }

    fn numeric_fluent(&self, id: FluentId) -> Double {
        match self.fluents.number(id) {
            FuzzyDouble::Defined(v) => Double::Defined(v),
            FuzzyDouble::Undefined => Double::Undefined,
            FuzzyDouble::Unknown => {
                log::trace!("Fluent {} is unknown, assuming undefined", id);
                Double::Undefined
            }
        }
    }

    fn object_fluent(&self, id: FluentId) -> ConstantValue {
        match self.fluents.object(id) {
            FuzzyConstant::Defined(c) => ConstantValue::Defined(c),
            FuzzyConstant::Undefined => ConstantValue::Undefined,
            FuzzyConstant::Unknown => {
                log::trace!("Fluent {} is unknown, assuming undefined", id);
                ConstantValue::Undefined
            }
        }
    }

    fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    fn with_predicate_cache<R>(&self, f: impl FnOnce(&mut dyn CacheNamespace<Bool>) -> R) -> R {
        f(&mut self.cache.borrow_mut().predicates)
    }

    fn with_function_cache<R>(&self, f: impl FnOnce(&mut dyn CacheNamespace<Double>) -> R) -> R {
        f(&mut self.cache.borrow_mut().functions)
    }

    fn with_object_cache<R>(
        &self,
        f: impl FnOnce(&mut dyn CacheNamespace<ConstantValue>) -> R,
    ) -> R {
        f(&mut self.cache.borrow_mut().objects)
    }
}

impl<F: FactsContainer, L: FluentsContainer> DurativeWorld for State<F, L> {
    fn timestamp(&self) -> f64 {
        self.timestamp.0
    }
}

impl<F: FactsContainer, L: FluentsContainer> UpdateWorld for State<F, L> {
    fn set_fact(&mut self, id: FormulaId) {
        self.facts.set(id);
        self.invalidate();
    }

    fn unset_fact(&mut self, id: FormulaId) {
        self.facts.unset(id);
        self.invalidate();
    }

    fn set_fluent(&mut self, id: FluentId, value: FluentValue) {
        self.fluents.set(id, value);
        self.invalidate();
    }

    fn undefine_fluent(&mut self, id: FluentId) {
        self.fluents.undefine(id);
        self.invalidate();
    }
}

/// A closed [State] behind the fuzzy value types.
///
/// Shares the state's cache, never yields Unknown.
#[derive(Debug, Clone, Copy)]
pub struct OpenView<'a, F: FactsContainer, L: FluentsContainer>(&'a State<F, L>);

impl<F: FactsContainer, L: FluentsContainer> World for OpenView<'_, F, L> {
    type Truth = FuzzyBool;
    type Number = FuzzyDouble;
    type Object = FuzzyConstant;

    fn fact(&self, id: FormulaId) -> FuzzyBool {
        self.0.fact(id).into()
    }

    fn numeric_fluent(&self, id: FluentId) -> FuzzyDouble {
        self.0.numeric_fluent(id).into()
    }

    fn object_fluent(&self, id: FluentId) -> FuzzyConstant {
        self.0.object_fluent(id).into()
    }

    fn definitions(&self) -> &Definitions {
        &self.0.definitions
    }

    fn with_predicate_cache<R>(
        &self,
        f: impl FnOnce(&mut dyn CacheNamespace<FuzzyBool>) -> R,
    ) -> R {
        f(&mut self.0.cache.borrow_mut().fuzzy_predicates())
    }

    fn with_function_cache<R>(
        &self,
        f: impl FnOnce(&mut dyn CacheNamespace<FuzzyDouble>) -> R,
    ) -> R {
        f(&mut self.0.cache.borrow_mut().fuzzy_functions())
    }

    fn with_object_cache<R>(
        &self,
        f: impl FnOnce(&mut dyn CacheNamespace<FuzzyConstant>) -> R,
    ) -> R {
        f(&mut self.0.cache.borrow_mut().fuzzy_objects())
    }
}

/// Open world over containers whose missing entries are Unknown.
#[derive(Debug, Getters)]
pub struct OpenState<F: FactsContainer, L: FluentsContainer> {
    #[getset(get = "pub")]
    facts: F,
    #[getset(get = "pub")]
    fluents: L,
    definitions: Rc<Definitions>,
    cache: RefCell<FuzzyEvaluationCache>,
}

impl<F: FactsContainer, L: FluentsContainer> OpenState<F, L> {
    pub fn new(facts: F, fluents: L, definitions: &Rc<Definitions>) -> Self {
        Self {
            facts,
            fluents,
            definitions: Rc::clone(definitions),
            cache: RefCell::default(),
        }
    }
}

impl<F: FactsContainer, L: FluentsContainer> Clone for OpenState<F, L> {
    fn clone(&self) -> Self {
        Self::new(self.facts.clone(), self.fluents.clone(), &self.definitions)
    }
}

impl<F: FactsContainer, L: FluentsContainer> PartialEq for OpenState<F, L> {
    fn eq(&self, other: &Self) -> bool {
        self.facts == other.facts && self.fluents == other.fluents
    }
}

impl<F: FactsContainer, L: FluentsContainer> Eq for OpenState<F, L> {}

impl<F: FactsContainer, L: FluentsContainer> World for OpenState<F, L> {
    type Truth = FuzzyBool;
    type Number = FuzzyDouble;
    type Object = FuzzyConstant;

    fn fact(&self, id: FormulaId) -> FuzzyBool {
        self.facts.get(id)
    }

    fn numeric_fluent(&self, id: FluentId) -> FuzzyDouble {
        self.fluents.number(id)
    }

    fn object_fluent(&self, id: FluentId) -> FuzzyConstant {
        self.fluents.object(id)
    }

    fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    fn with_predicate_cache<R>(
        &self,
        f: impl FnOnce(&mut dyn CacheNamespace<FuzzyBool>) -> R,
    ) -> R {
        f(&mut self.cache.borrow_mut().predicates)
    }

    fn with_function_cache<R>(
        &self,
        f: impl FnOnce(&mut dyn CacheNamespace<FuzzyDouble>) -> R,
    ) -> R {
        f(&mut self.cache.borrow_mut().functions)
    }

    fn with_object_cache<R>(
        &self,
        f: impl FnOnce(&mut dyn CacheNamespace<FuzzyConstant>) -> R,
    ) -> R {
        f(&mut self.cache.borrow_mut().objects)
    }
}

impl<F: FactsContainer, L: FluentsContainer> UpdateWorld for OpenState<F, L> {
    fn set_fact(&mut self, id: FormulaId) {
        self.facts.set(id);
        self.cache.get_mut().clear();
    }

    fn unset_fact(&mut self, id: FormulaId) {
        self.facts.unset(id);
        self.cache.get_mut().clear();
    }

    fn set_fluent(&mut self, id: FluentId, value: FluentValue) {
        self.fluents.set(id, value);
        self.cache.get_mut().clear();
    }

    fn undefine_fluent(&mut self, id: FluentId) {
        self.fluents.undefine(id);
        self.cache.get_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        facts::{BitsetFacts, SortedFacts},
        fluents::{ArrayFluents, SortedFluents},
    };

    fn definitions() -> Rc<Definitions> {
        Rc::new(Definitions::default())
    }

    #[test]
    fn test_closed_world_narrows_unknown() {
        let mut state = State::new(SortedFacts::new(), SortedFluents::new(), &definitions());
        assert_eq!(state.fact(3), Bool::False);
        assert_eq!(state.as_open().fact(3), FuzzyBool::False);

        state.set_fact(3);
        assert_eq!(state.fact(3), Bool::True);
        assert_eq!(state.numeric_fluent(0), Double::Undefined);

        state.set_fluent(0, 2.5.into());
        assert_eq!(state.numeric_fluent(0), Double::Defined(2.5));
        assert_eq!(state.as_open().numeric_fluent(0), FuzzyDouble::Defined(2.5));
    }

    #[test]
    fn test_open_state_sees_unknown() {
        let defs = definitions();
        let mut state = OpenState::new(SortedFacts::new(), ArrayFluents::new(0..2), &defs);
        assert_eq!(state.fact(3), FuzzyBool::Unknown);
        assert_eq!(state.numeric_fluent(5), FuzzyDouble::Unknown);
        assert_eq!(state.numeric_fluent(1), FuzzyDouble::Undefined);

        state.unset_fact(3);
        assert_eq!(state.fact(3), FuzzyBool::False);
        assert_eq!(state.clone(), state);
    }

    #[test]
    fn test_states_compare_by_content() {
        let defs = definitions();
        let mut a = State::new(BitsetFacts::new(0..10), ArrayFluents::new(0..4), &defs);
        let mut b = a.clone();
        assert_eq!(a, b);

        a.set_fact(1);
        a.set_fact(2);
        b.set_fact(2);
        b.set_fact(1);
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);

        let c = b.clone().at(1.0);
        assert_ne!(b, c);
        assert_eq!(c.timestamp(), 1.0);
    }

    #[test]
    fn test_mix_spreads_small_ids() {
        assert_ne!(mix(0), 0);
        assert_ne!(mix(1), mix(2));
        assert_ne!(mix(1).wrapping_add(mix(2)), mix(3));
    }
}
