use alloc::{rc::Rc, string::String};
use core::fmt::{Debug, Display};
use core::{hash::Hash, marker::PhantomData, ops::Deref};
use gazebo::dupe::Dupe;

use crate::util::named::Named;

pub trait Handleable: Clone + PartialEq {}

pub trait Storage<T: Handleable> {
    fn get<S: Storage<T>>(&self, handle: &SmartHandle<T, S>) -> T;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Idx(pub(crate) usize);

impl Dupe for Idx {}

/// Index into a shared storage together with the storage itself.
///
/// Handles are compared, ordered and hashed by index only,
/// so two handles are the same entity iff they point
/// to the same slot.
pub struct SmartHandle<T: Handleable, S: Storage<T>> {
    pub(crate) idx: Idx,
    container: Rc<S>,
    _marker: PhantomData<T>,
}

impl<T: Handleable, S: Storage<T>> Clone for SmartHandle<T, S> {
    fn clone(&self) -> Self {
        Self {
            idx: self.idx.dupe(),
            container: Rc::clone(&self.container),
            _marker: PhantomData,
        }
    }
}

impl<T: Handleable, S: Storage<T>> Dupe for SmartHandle<T, S> {
    fn dupe(&self) -> Self {
        self.clone()
    }
}

/// Implemented by hand, deriving would require `S: Debug`
/// and recurse into the whole storage.
impl<T: Handleable, S: Storage<T>> Debug for SmartHandle<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let handle_to = core::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or_default();
        write!(f, "Handle<{}>({})", handle_to, self.idx.0)
    }
}

impl<T: Handleable + Named, S: Storage<T>> Display for SmartHandle<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl<T: Handleable, S: Storage<T>> SmartHandle<T, S> {
    pub(crate) fn new(idx: Idx, container: Rc<S>) -> Self {
        Self {
            idx,
            container,
            _marker: PhantomData,
        }
    }

    pub(crate) fn from_raw(idx: usize, container: Rc<S>) -> Self {
        Self::new(Idx(idx), container)
    }

    /// Dense index of the entity inside its storage.
    pub fn index(&self) -> usize {
        self.idx.0
    }

    pub fn inner(&self) -> T {
        self.container.get(self)
    }

    pub fn container(&self) -> impl Deref<Target = S> + '_ {
        Rc::clone(&self.container)
    }
}

impl<T: Handleable + Named, S: Storage<T>> SmartHandle<T, S> {
    pub fn name(&self) -> String {
        crate::resolve(self.inner().name())
    }
}

impl<T: Handleable, S: Storage<T>> PartialEq for SmartHandle<T, S> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T: Handleable, S: Storage<T>> PartialEq<&SmartHandle<T, S>> for SmartHandle<T, S> {
    fn eq(&self, other: &&SmartHandle<T, S>) -> bool {
        *self == **other
    }
}

impl<T: Handleable, S: Storage<T>> Eq for SmartHandle<T, S> {}

impl<T: Handleable, S: Storage<T>> PartialOrd for SmartHandle<T, S> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Handleable, S: Storage<T>> Ord for SmartHandle<T, S> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.idx.cmp(&other.idx)
    }
}

impl<T: Handleable, S: Storage<T>> Hash for SmartHandle<T, S> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InternerSymbol;
    use core::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Thing {
        name: InternerSymbol,
    }

    impl Handleable for Thing {}

    impl Named for Thing {
        fn name(&self) -> InternerSymbol {
            self.name
        }
    }

    #[derive(Clone)]
    struct Container {
        data: Rc<RefCell<Vec<Thing>>>,
    }

    impl Container {
        fn add(&mut self, name: &str) -> SmartHandle<Thing, Self> {
            let idx = self.data.borrow().len();
            self.data.borrow_mut().push(Thing {
                name: crate::intern(name),
            });
            SmartHandle::from_raw(idx, Rc::new(self.clone()))
        }
    }

    impl Storage<Thing> for Container {
        fn get<S: Storage<Thing>>(&self, handle: &SmartHandle<Thing, S>) -> Thing {
            self.data.borrow()[handle.idx.0].clone()
        }
    }

    #[test]
    fn test_handles_share_storage() {
        let mut cont = Container {
            data: Rc::new(RefCell::new(vec![])),
        };

        let a = cont.add("a");
        let b = cont.add("b");

        assert_eq!(a.name(), "a");
        assert_eq!(b.to_string(), "b");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(a, a.dupe());

        // Added after `a` was created, still visible through it
        let c = cont.add("c");
        assert_eq!(a.container().data.borrow().len(), 3);
        assert_eq!(format!("{:?}", c), "Handle<Thing>(2)");
    }
}
