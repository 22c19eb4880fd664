use std::rc::Rc;

use gazebo::dupe::Dupe;
use tlplan::{
    action::{Action, ActionBuilder, ActionDef},
    calculus::{
        binding::{Bindings, Images, Variable},
        constraint::ConstraintExp,
        defined::Definitions,
        logical::LogicalExp,
        numeric::NumericExp,
        object::ObjectExp,
        signature::{Application, Signature, SignatureRegistry},
        Simplified,
    },
    effect::{AssignOp, Effect},
    entity::{ConstantHandle, EntityStorage, TypeSet},
    error::EvaluationError,
    fuzzy::{all_fuzzy, Bool, Double, FuzzyBool},
    plan::Plan,
    state::{
        facts::{BitsetFacts, FactsContainer, HashFacts, SortedFacts},
        fluents::{FluentValue, HashFluents, SortedFluents},
        OpenState, State, UpdateWorld,
    },
    util::named::NamedStorage,
};

struct Domain {
    entities: EntityStorage,
    blocks: TypeSet,
    a: ConstantHandle,
    b: ConstantHandle,
    c: ConstantHandle,
    registry: SignatureRegistry,
    on: Rc<Signature>,
    clear: Rc<Signature>,
    moves: Rc<Signature>,
}

impl Domain {
    fn new() -> Self {
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
        let moves = registry.declare_function("moves", &[]).unwrap();

        Self {
            entities,
            blocks,
            a,
            b,
            c,
            registry,
            on,
            clear,
            moves,
        }
    }

    fn on(&self, x: impl Into<ObjectExp>, y: impl Into<ObjectExp>) -> LogicalExp {
        LogicalExp::Atom(Application::new(&self.on, vec![x.into(), y.into()]).unwrap())
    }

    fn clear(&self, x: impl Into<ObjectExp>) -> LogicalExp {
        LogicalExp::Atom(Application::new(&self.clear, vec![x.into()]).unwrap())
    }

    fn moves(&self) -> Application {
        Application::new(&self.moves, vec![]).unwrap()
    }

    fn stack(&self) -> Action {
        ActionBuilder::new("stack")
            .parameters(&[("?x", &self.blocks), ("?y", &self.blocks)])
            .precondition(|p| {
                LogicalExp::and(vec![
                    self.clear(&p[0]),
                    self.clear(&p[1]),
                    LogicalExp::not(LogicalExp::Equal((&p[0]).into(), (&p[1]).into())),
                ])
            })
            .effect(|p| {
                let on = Application::new(&self.on, vec![(&p[0]).into(), (&p[1]).into()]);
                let clear = Application::new(&self.clear, vec![(&p[1]).into()]);
                Effect::and(vec![
                    Effect::Add(on.unwrap()),
                    Effect::Delete(clear.unwrap()),
                    Effect::assign(AssignOp::Increase, self.moves(), NumericExp::number(1.0)),
                ])
            })
            .build()
    }

    fn id(signature: &Signature, arguments: &[&ConstantHandle]) -> usize {
        signature
            .ground_id(&arguments.iter().map(|c| (*c).dupe()).collect::<Vec<_>>())
            .unwrap()
    }

    fn initial(&self) -> State<SortedFacts, SortedFluents> {
        let mut state = State::new(
            SortedFacts::new(),
            SortedFluents::new(),
            &Rc::new(Definitions::default()),
        );
        for x in [&self.a, &self.b, &self.c] {
            state.set_fact(Self::id(&self.clear, &[x]));
        }
        state.set_fluent(Self::id(&self.moves, &[]), FluentValue::from(0.0));
        state
    }
}

#[test]
fn test_fuzzy_laws_hold_for_every_value() {
    for x in all_fuzzy() {
        assert_eq!(!!x, x);
        assert_eq!(x & FuzzyBool::True, x);
        assert_eq!(x | FuzzyBool::False, x);
        assert_eq!(x & FuzzyBool::False, FuzzyBool::False);
        assert_eq!(x | FuzzyBool::True, FuzzyBool::True);
        for y in all_fuzzy() {
            assert_eq!(x & y, y & x);
            assert_eq!(x | y, y | x);
            assert_eq!(x ^ y, y ^ x);
            for z in all_fuzzy() {
                assert_eq!((x & y) & z, x & (y & z));
                assert_eq!((x | y) | z, x | (y | z));
            }
        }
    }
}

#[test]
fn test_containers_agree_regardless_of_order() {
    let d = Domain::new();
    let ids = [
        Domain::id(&d.on, &[&d.a, &d.b]),
        Domain::id(&d.clear, &[&d.c]),
        Domain::id(&d.on, &[&d.c, &d.a]),
    ];

    let mut forward = HashFacts::new();
    let mut backward = HashFacts::new();
    let mut bitset = BitsetFacts::new(d.registry.fact_interval());
    for id in ids {
        forward.set(id);
        bitset.set(id);
    }
    for id in ids.iter().rev() {
        backward.set(*id);
    }
    assert_eq!(forward, backward);
    assert_eq!(forward.hash_code(), backward.hash_code());
    assert_eq!(forward.true_facts(), bitset.true_facts());

    // Setting then unsetting leaves the content as it was
    let extra = Domain::id(&d.clear, &[&d.a]);
    let before = bitset.hash_code();
    bitset.set(extra);
    bitset.unset(extra);
    assert_eq!(bitset.hash_code(), before);
    assert!(!bitset.is_set(extra));
}

#[test]
fn test_plan_execution_with_constraints() {
    let d = Domain::new();
    let mut actions = NamedStorage::default();
    actions.insert(d.stack());
    let stack = actions.get("stack").unwrap();

    let plan = Plan::read("0.0: (stack b c)\n1.0: (stack a b)", &actions, &d.entities).unwrap();
    assert_eq!(plan.len(), 2);

    let goal = ConstraintExp::eventually(ConstraintExp::atomic(d.on(&d.a, &d.b)));
    let safety = ConstraintExp::always(ConstraintExp::atomic(d.clear(&d.a)));
    let mut constraint = ConstraintExp::and(vec![goal, safety]);

    let mut state = d.initial();
    for step in plan.steps() {
        let progression = constraint.progress(&state, &Bindings::new()).unwrap();
        assert!(!progression.result().is_value());
        constraint = progression.into_constraint();

        state = state
            .successor(stack, step.action().arguments())
            .unwrap()
            .unwrap()
            .at(step.end());
    }

    assert!(state.is_true(Domain::id(&d.on, &[&d.a, &d.b])));
    assert!(state.is_true(Domain::id(&d.on, &[&d.b, &d.c])));
    assert_eq!(
        NumericExp::Fluent(d.moves()).evaluate(&state, &Bindings::new()),
        Ok(Double::Defined(2.0))
    );

    let last = constraint.progress(&state, &Bindings::new()).unwrap();
    assert_eq!(
        last.result().residual(),
        Some(&ConstraintExp::always(ConstraintExp::atomic(d.clear(&d.a))))
    );
    assert_eq!(last.next_timestamp(), f64::INFINITY);
    assert_eq!(
        last.into_constraint().evaluate_idle(&state, &Bindings::new()),
        Ok(Bool::True)
    );

    // Nothing is clear enough for a third move onto b
    assert_eq!(state.successor(stack, &[d.c.dupe(), d.b.dupe()]), Ok(None));
}

#[test]
fn test_xor_over_states() {
    let d = Domain::new();
    let xor = ConstraintExp::XorUnique(vec![
        ConstraintExp::atomic(d.on(&d.a, &d.b)),
        ConstraintExp::atomic(d.on(&d.b, &d.c)),
    ]);

    let mut state = d.initial();
    let none = xor.progress(&state, &Bindings::new()).unwrap();
    assert_eq!(none.result(), &Simplified::Value(Bool::False));

    state.set_fact(Domain::id(&d.on, &[&d.a, &d.b]));
    let one = xor.progress(&state, &Bindings::new()).unwrap();
    assert_eq!(one.result(), &Simplified::Value(Bool::True));

    state.set_fact(Domain::id(&d.on, &[&d.b, &d.c]));
    let both = xor.progress(&state, &Bindings::new()).unwrap();
    assert_eq!(both.result(), &Simplified::Value(Bool::False));
}

#[test]
fn test_self_referencing_definition_is_a_cycle() {
    let d = Domain::new();
    let x = Variable::new("x", &d.blocks);

    let mut definitions = Definitions::default();
    let p = definitions.declare_predicate("p", &[x.clone()]).unwrap();
    let body = LogicalExp::Defined(Application::new(&p, vec![x.into()]).unwrap());
    definitions.define_predicate(&p, body).unwrap();

    let state = State::new(
        SortedFacts::new(),
        SortedFluents::new(),
        &Rc::new(definitions),
    );
    let query = LogicalExp::Defined(Application::new(&p, vec![d.a.dupe().into()]).unwrap());
    assert_eq!(
        query.evaluate(&state, &Bindings::new()),
        Err(EvaluationError::Cycle {
            formula: "p(a)".into()
        })
    );
}

#[test]
fn test_standardized_copies_are_fresh() {
    let d = Domain::new();
    let action = d.stack();

    let first = action.standardize();
    let second = first.standardize();
    let names = |a: &Action| {
        a.parameters()
            .iter()
            .map(Variable::name_str)
            .collect::<Vec<_>>()
    };
    assert_ne!(names(&first), names(&action));
    assert_ne!(names(&second), names(&first));
    assert_ne!(names(&second), names(&action));

    let mut images = Images::new();
    let exp = d.on(&action.parameters()[0], &action.parameters()[1]);
    let renamed = exp.standardize(&mut images);
    assert_eq!(images.len(), 2);
    assert_ne!(renamed, exp);
}

#[test]
fn test_scale_down_by_zero_fails() {
    let d = Domain::new();
    let mut state = d.initial();
    state.set_fluent(Domain::id(&d.moves, &[]), FluentValue::from(10.0));

    let effect = Effect::assign(AssignOp::ScaleDown, d.moves(), NumericExp::number(0.0));
    let mut updates = Vec::new();
    assert_eq!(
        effect.updates(&state, &Bindings::new(), &mut updates),
        Err(EvaluationError::Numeric {
            operator: "/",
            operands: vec![10.0, 0.0],
        })
    );
}

#[test]
fn test_open_state_keeps_unknown() {
    let d = Domain::new();
    let mut state = OpenState::new(
        HashFacts::new(),
        HashFluents::new(),
        &Rc::new(Definitions::default()),
    );
    state.set_fact(Domain::id(&d.clear, &[&d.a]));

    let bindings = Bindings::new();
    assert_eq!(d.clear(&d.a).evaluate(&state, &bindings), Ok(FuzzyBool::True));
    assert_eq!(d.clear(&d.b).evaluate(&state, &bindings), Ok(FuzzyBool::Unknown));
    assert_eq!(
        LogicalExp::and(vec![d.clear(&d.b), LogicalExp::False]).evaluate(&state, &bindings),
        Ok(FuzzyBool::False)
    );

    state.unset_fact(Domain::id(&d.clear, &[&d.b]));
    assert_eq!(d.clear(&d.b).evaluate(&state, &bindings), Ok(FuzzyBool::False));
}

#[test]
fn test_delete_effect_end_to_end() {
    let d = Domain::new();
    let blocks = d.blocks.dupe();
    let unstack = ActionBuilder::new("unstack")
        .parameters(&[("?x", &blocks), ("?y", &blocks)])
        .precondition(|p| d.on(&p[0], &p[1]))
        .effect(|p| {
            let on = Application::new(&d.on, vec![(&p[0]).into(), (&p[1]).into()]);
            let clear = Application::new(&d.clear, vec![(&p[1]).into()]);
            Effect::and(vec![Effect::Delete(on.unwrap()), Effect::Add(clear.unwrap())])
        })
        .build();

    let mut state = d.initial();
    state.set_fact(Domain::id(&d.on, &[&d.a, &d.b]));
    state.unset_fact(Domain::id(&d.clear, &[&d.b]));
    assert_eq!(d.on(&d.a, &d.b).evaluate(&state, &Bindings::new()), Ok(Bool::True));

    let next = state
        .successor(&unstack, &[d.a.dupe(), d.b.dupe()])
        .unwrap()
        .unwrap();
    assert_eq!(d.on(&d.a, &d.b).evaluate(&next, &Bindings::new()), Ok(Bool::False));
    assert_eq!(d.clear(&d.b).evaluate(&next, &Bindings::new()), Ok(Bool::True));
    assert_ne!(next, state);
}
