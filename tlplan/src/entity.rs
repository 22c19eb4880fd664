use alloc::{
    collections::{BTreeMap, VecDeque},
    rc::Rc,
    vec,
    vec::Vec,
};
use core::{
    cell::{Ref, RefCell},
    fmt::Display,
    hash::Hash,
};
use gazebo::dupe::Dupe;
use itertools::Itertools;

use crate::{
    util::{
        named::Named,
        smart_handle::{Handleable, Idx, SmartHandle, Storage},
    },
    InternerSymbol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Type {
    name: InternerSymbol,
}

impl Type {
    pub fn new(name: &str) -> Self {
        Self {
            name: crate::intern(name),
        }
    }
}

impl Handleable for Type {}

impl Named for Type {
    fn name(&self) -> InternerSymbol {
        self.name
    }
}

type TypeIdx = Idx;
type SuperTypeIdx = Idx;
type SubTypeIdx = Idx;

pub type TypeHandle = SmartHandle<Type, EntityStorage>;

impl TypeHandle {
    pub fn direct_subtypes(&self) -> Vec<TypeHandle> {
        self.container().get_direct_subtypes(self)
    }

    pub fn subtypes(&self) -> Vec<TypeHandle> {
        self.container().get_subtypes(self)
    }

    pub fn inherits(&self, super_type: &SuperTypeHandle) -> bool {
        self.container().inherits(self, super_type)
    }

    pub fn inherits_or_eq(&self, super_type: &SuperTypeHandle) -> bool {
        self.container().inherits_or_eq(self, super_type)
    }

    pub fn constants(&self) -> Vec<ConstantHandle> {
        self.container().get_by_type(self)
    }
}

pub type SuperTypeHandle = TypeHandle;
pub type SubTypeHandle = TypeHandle;

/// A named domain object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constant {
    name: InternerSymbol,
}

impl Constant {
    pub fn new(name: &str) -> Self {
        Self {
            name: crate::intern(name),
        }
    }
}

impl Handleable for Constant {}

impl Named for Constant {
    fn name(&self) -> InternerSymbol {
        self.name
    }
}

pub type ConstantHandle = SmartHandle<Constant, EntityStorage>;

impl ConstantHandle {
    pub fn r#type(&self) -> TypeHandle {
        self.container().type_of(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingError {
    AlreadyHasSuperType(TypeHandle),
    CreatesCircularInheritance,
    UnknownType(alloc::string::String),
}

/// Types, their hierarchy and the constants of a planning run.
///
/// Clones share the same underlying storage,
/// the same way handles do.
#[derive(Debug, Clone, Default)]
pub struct EntityStorage {
    types: Rc<RefCell<Vec<Type>>>,
    constants: Rc<RefCell<Vec<(Constant, TypeIdx)>>>,
    supertypes: Rc<RefCell<BTreeMap<SubTypeIdx, SuperTypeIdx>>>,
    subtypes: Rc<RefCell<BTreeMap<SuperTypeIdx, Vec<SubTypeIdx>>>>,
}

impl EntityStorage {
    pub fn get_or_create_type(&mut self, type_name: &str) -> TypeHandle {
        let r#type = Type::new(type_name);
        if let Some(idx) = self.types.borrow().iter().position(|t| *t == r#type) {
            return TypeHandle::from_raw(idx, Rc::new(self.clone()));
        }

        let idx = self.types.borrow().len();
        self.types.borrow_mut().push(r#type);
        TypeHandle::from_raw(idx, Rc::new(self.clone()))
    }

    pub fn get_type(&self, type_name: &str) -> Option<TypeHandle> {
        let r#type = Type::new(type_name);
        self.types
            .borrow()
            .iter()
            .position(|t| *t == r#type)
            .map(|idx| TypeHandle::from_raw(idx, Rc::new(self.clone())))
    }

    pub fn create_inheritance(
        &mut self,
        sub_type: &SubTypeHandle,
        super_type: &SuperTypeHandle,
    ) -> Result<(), TypingError> {
        if let Some(tidx) = self.supertypes.borrow().get(&sub_type.idx) {
            return Err(TypingError::AlreadyHasSuperType(TypeHandle::new(
                *tidx,
                Rc::new(self.clone()),
            )));
        }

        if sub_type == super_type || self.inherits(super_type, sub_type) {
            return Err(TypingError::CreatesCircularInheritance);
        }

        self.supertypes
            .borrow_mut()
            .insert(sub_type.idx, super_type.idx);

        self.subtypes
            .borrow_mut()
            .entry(super_type.idx)
            .and_modify(|e| e.push(sub_type.idx))
            .or_insert_with(|| vec![sub_type.idx]);

        Ok(())
    }

    pub fn get_direct_subtypes(&self, r#type: &TypeHandle) -> Vec<TypeHandle> {
        Ref::filter_map(self.subtypes.borrow(), |s| s.get(&r#type.idx))
            .map(|subtypes| {
                subtypes
                    .iter()
                    .map(|idx| TypeHandle::new(*idx, Rc::new(self.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_subtypes(&self, r#type: &TypeHandle) -> Vec<TypeHandle> {
        let mut ts: VecDeque<_> = self.get_direct_subtypes(r#type).into();
        let mut subtypes = Vec::new();
        while let Some(t) = ts.pop_front() {
            let tt = self.get_direct_subtypes(&t);
            subtypes.push(t);
            ts.extend(tt);
        }
        subtypes
    }

    pub fn inherits(&self, sub_type: &SubTypeHandle, super_type: &SuperTypeHandle) -> bool {
        self.get_subtypes(super_type).contains(sub_type)
    }

    pub fn inherits_or_eq(&self, sub_type: &SubTypeHandle, super_type: &SuperTypeHandle) -> bool {
        sub_type == super_type || self.inherits(sub_type, super_type)
    }

    pub fn get_or_create_constant(&mut self, name: &str, r#type: &TypeHandle) -> ConstantHandle {
        let constant = Constant::new(name);
        if let Some(idx) = self
            .constants
            .borrow()
            .iter()
            .position(|&(c, ti)| c == constant && ti == r#type.idx)
        {
            return ConstantHandle::from_raw(idx, Rc::new(self.clone()));
        }

        let idx = self.constants.borrow().len();
        self.constants.borrow_mut().push((constant, r#type.idx));
        ConstantHandle::from_raw(idx, Rc::new(self.clone()))
    }

    pub fn get_constant(&self, name: &str) -> Option<ConstantHandle> {
        let constant = Constant::new(name);
        self.constants
            .borrow()
            .iter()
            .position(|&(c, _)| c == constant)
            .map(|idx| ConstantHandle::from_raw(idx, Rc::new(self.clone())))
    }

    pub fn get_by_type_strict(&self, r#type: &TypeHandle) -> Vec<ConstantHandle> {
        self.constants
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, (_, ti))| *ti == r#type.idx)
            .map(|(i, _)| ConstantHandle::from_raw(i, Rc::new(self.clone())))
            .collect()
    }

    pub fn get_by_type(&self, r#type: &TypeHandle) -> Vec<ConstantHandle> {
        let mut res = self.get_by_type_strict(r#type);
        for t in self.get_subtypes(r#type) {
            res.extend(self.get_by_type_strict(&t));
        }
        res
    }

    pub fn type_of(&self, constant: &ConstantHandle) -> TypeHandle {
        TypeHandle::new(
            self.constants.borrow()[constant.idx.0].1,
            Rc::new(self.clone()),
        )
    }

    /// Builds the typeset covering the given types and their subtypes.
    ///
    /// The domain of a typeset is fixed when it is built.
    /// Constants created afterwards are not part of it,
    /// so typesets have to be rebuilt after the domain changes.
    pub fn typeset(&self, types: &[&TypeHandle]) -> TypeSet {
        let domain = types
            .iter()
            .flat_map(|t| self.get_by_type(t))
            .sorted()
            .dedup()
            .collect::<Vec<_>>();
        let types = types
            .iter()
            .map(|t| (*t).dupe())
            .sorted()
            .dedup()
            .collect::<Vec<_>>();

        TypeSet(Rc::new(TypeSetData { types, domain }))
    }

    /// Looks up the named types and builds their [TypeSet].
    pub fn typeset_by_name(&self, names: &[&str]) -> Result<TypeSet, TypingError> {
        let types = names
            .iter()
            .map(|n| {
                self.get_type(n)
                    .ok_or_else(|| TypingError::UnknownType((*n).into()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.typeset(&types.iter().collect::<Vec<_>>()))
    }
}

impl Storage<Type> for EntityStorage {
    fn get<S: Storage<Type>>(&self, handle: &SmartHandle<Type, S>) -> Type {
        // Cannot panic, because the only way to create a handle is
        // through the EntityStorage, so they are all accounted for
        self.types.borrow()[handle.idx.0]
    }
}

impl Storage<Constant> for EntityStorage {
    fn get<S: Storage<Constant>>(&self, handle: &SmartHandle<Constant, S>) -> Constant {
        self.constants.borrow()[handle.idx.0].0
    }
}

#[derive(Debug, PartialEq, Eq)]
struct TypeSetData {
    types: Vec<TypeHandle>,
    /// Sorted by constant index.
    domain: Vec<ConstantHandle>,
}

/// An immutable union of types together with its domain.
///
/// Each constant of the domain has a dense ID inside the typeset,
/// which is its position in [TypeSet::domain].
/// These IDs are what ground atomic formulas are numbered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSet(Rc<TypeSetData>);

impl TypeSet {
    pub fn types(&self) -> &[TypeHandle] {
        &self.0.types
    }

    pub fn domain(&self) -> &[ConstantHandle] {
        &self.0.domain
    }

    pub fn len(&self) -> usize {
        self.0.domain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.domain.is_empty()
    }

    pub fn contains(&self, constant: &ConstantHandle) -> bool {
        self.id_of(constant).is_some()
    }

    /// Dense ID of the constant inside this typeset.
    pub fn id_of(&self, constant: &ConstantHandle) -> Option<usize> {
        self.0
            .domain
            .binary_search_by(|c| c.index().cmp(&constant.index()))
            .ok()
    }
}

impl Dupe for TypeSet {}

impl PartialOrd for TypeSet {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeSet {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.0
            .types
            .cmp(&other.0.types)
            .then_with(|| self.0.domain.cmp(&other.0.domain))
    }
}

impl Hash for TypeSet {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.0.types.hash(state);
    }
}

impl Display for TypeSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.types() {
            [t] => write!(f, "{}", t),
            ts => write!(f, "(either {})", ts.iter().join(" ")),
        }
    }
}
