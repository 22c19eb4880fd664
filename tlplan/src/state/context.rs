use alloc::{collections::BTreeSet, rc::Rc, vec::Vec};
use core::hash::{Hash, Hasher};

use crate::calculus::signature::FormulaId;

/// Formulas private to one application of a durative action.
///
/// Made true at the start of the action and read at its end.
/// Copies share their set until one of them is modified.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    facts: Option<Rc<BTreeSet<FormulaId>>>,
}

/// The context every action application starts from.
pub const EMPTY_ACTION_CONTEXT: ActionContext = ActionContext { facts: None };

impl ActionContext {
    pub fn contains(&self, id: FormulaId) -> bool {
        self.facts.as_ref().is_some_and(|f| f.contains(&id))
    }

    pub fn set(&mut self, id: FormulaId) {
        match &mut self.facts {
            Some(facts) => {
                if !facts.contains(&id) {
                    Rc::make_mut(facts).insert(id);
                }
            }
            None => self.facts = Some(Rc::new(BTreeSet::from([id]))),
        }
    }

    pub fn unset(&mut self, id: FormulaId) {
        let Some(facts) = &mut self.facts else {
            return;
        };
        if facts.contains(&id) {
            Rc::make_mut(facts).remove(&id);
        }
        if facts.is_empty() {
            self.facts = None;
        }
    }

    pub fn len(&self) -> usize {
        self.facts.as_ref().map_or(0, |f| f.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn facts(&self) -> Vec<FormulaId> {
        self.facts
            .as_ref()
            .map(|f| f.iter().copied().collect())
            .unwrap_or_default()
    }

    fn set_ref(&self) -> Option<&BTreeSet<FormulaId>> {
        self.facts.as_deref()
    }
}

impl PartialEq for ActionContext {
    fn eq(&self, other: &Self) -> bool {
        self.set_ref() == other.set_ref()
    }
}

impl Eq for ActionContext {}

impl Hash for ActionContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.set_ref().hash(state);
    }
}

impl PartialOrd for ActionContext {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ActionContext {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.set_ref().cmp(&other.set_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_on_write() {
        let mut a = EMPTY_ACTION_CONTEXT;
        a.set(1);
        a.set(4);

        let mut b = a.clone();
        assert_eq!(a, b);
        b.set(7);
        assert!(!a.contains(7));
        assert!(b.contains(7));
        assert_eq!(a.facts(), vec![1, 4]);

        b.unset(7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_normalizes() {
        let mut a = ActionContext::default();
        a.set(2);
        a.unset(2);
        assert!(a.is_empty());
        assert_eq!(a, EMPTY_ACTION_CONTEXT);
        assert!(EMPTY_ACTION_CONTEXT.is_empty());
    }
}
