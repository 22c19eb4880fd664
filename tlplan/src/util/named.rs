use crate::InternerSymbol;
use alloc::{collections::BTreeMap, rc::Rc};

pub trait Named {
    fn name(&self) -> InternerSymbol;
}

impl<T: Named> Named for Rc<T> {
    fn name(&self) -> InternerSymbol {
        (**self).name()
    }
}

/// Lookup table of uniquely named items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStorage<T: Named + Clone>(BTreeMap<InternerSymbol, T>);

impl<T: Named + Clone> NamedStorage<T> {
    /// Inserts the item, returning the one it replaced.
    pub fn insert(&mut self, item: T) -> Option<T> {
        self.0.insert(item.name(), item)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.0.get(&crate::intern(name))
    }

    pub fn get_by_symbol(&self, symbol: &InternerSymbol) -> Option<&T> {
        self.0.get(symbol)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&crate::intern(name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Named + Clone> Default for NamedStorage<T> {
    fn default() -> Self {
        Self(BTreeMap::default())
    }
}
