//! Small blocks world shared by the unit tests.

use alloc::{rc::Rc, vec::Vec};
use gazebo::dupe::Dupe;

use crate::{
    calculus::{
        binding::Variable,
        defined::Definitions,
        logical::LogicalExp,
        numeric::NumericExp,
        object::ObjectExp,
        signature::{Application, FluentId, FormulaId, Signature, SignatureRegistry},
    },
    entity::{ConstantHandle, EntityStorage, TypeSet},
    state::{facts::SortedFacts, fluents::SortedFluents, State},
};

pub(crate) struct Blocks {
    pub entities: EntityStorage,
    pub blocks: TypeSet,
    pub a: ConstantHandle,
    pub b: ConstantHandle,
    pub c: ConstantHandle,
    pub registry: SignatureRegistry,
    pub on: Rc<Signature>,
    pub clear: Rc<Signature>,
    pub weight: Rc<Signature>,
    pub below: Rc<Signature>,
    pub x: Variable,
    pub y: Variable,
}

impl Blocks {
    pub fn new() -> Self {
        let mut entities = EntityStorage::default();
        let block = entities.get_or_create_type("block");
        let a = entities.get_or_create_constant("a", &block);
        let b = entities.get_or_create_constant("b", &block);
        let c = entities.get_or_create_constant("c", &block);
        let blocks = entities.typeset(&[&block]);

        let mut registry = SignatureRegistry::default();
        let on = registry
            .declare_predicate("on", &[blocks.dupe(), blocks.dupe()])
            .unwrap();
        let clear = registry.declare_predicate("clear", &[blocks.dupe()]).unwrap();
        let weight = registry.declare_function("weight", &[blocks.dupe()]).unwrap();
        let below = registry.declare_function("below", &[blocks.dupe()]).unwrap();

        Self {
            x: Variable::new("x", &blocks),
            y: Variable::new("y", &blocks),
            entities,
            blocks,
            a,
            b,
            c,
            registry,
            on,
            clear,
            weight,
            below,
        }
    }

    pub fn app(signature: &Rc<Signature>, arguments: &[ObjectExp]) -> Application {
        Application::new(signature, arguments.to_vec()).unwrap()
    }

    pub fn on(&self, x: impl Into<ObjectExp>, y: impl Into<ObjectExp>) -> LogicalExp {
        LogicalExp::Atom(Self::app(&self.on, &[x.into(), y.into()]))
    }

    pub fn clear(&self, x: impl Into<ObjectExp>) -> LogicalExp {
        LogicalExp::Atom(Self::app(&self.clear, &[x.into()]))
    }

    pub fn weight(&self, x: impl Into<ObjectExp>) -> NumericExp {
        NumericExp::Fluent(Self::app(&self.weight, &[x.into()]))
    }

    pub fn below(&self, x: impl Into<ObjectExp>) -> ObjectExp {
        ObjectExp::Fluent(Self::app(&self.below, &[x.into()]))
    }

    pub fn id(signature: &Signature, arguments: &[&ConstantHandle]) -> FormulaId {
        signature
            .ground_id(&arguments.iter().map(|c| (*c).dupe()).collect::<Vec<_>>())
            .unwrap()
    }

    pub fn fluent(signature: &Signature, arguments: &[&ConstantHandle]) -> FluentId {
        Self::id(signature, arguments)
    }

    pub fn state(&self) -> State<SortedFacts, SortedFluents> {
        self.state_with(Definitions::default())
    }

    pub fn state_with(&self, definitions: Definitions) -> State<SortedFacts, SortedFluents> {
        State::new(
            SortedFacts::new(),
            SortedFluents::new(),
            &Rc::new(definitions),
        )
    }
}
