//! Predicates and functions computed from a definition
//! instead of being stored in the world.
//!
//! Evaluations are memoized in the world's cache. A definition that
//! reaches itself with the same arguments before finishing is a cycle
//! and fails with [EvaluationError::Cycle].

use alloc::{rc::Rc, string::ToString, vec::Vec};
use getset::Getters;

use crate::{
    calculus::{
        binding::{Bindings, Variable},
        logical::LogicalExp,
        numeric::NumericExp,
        object::ObjectExp,
        signature::{Application, Grounding, Signature},
    },
    entity::ConstantHandle,
    error::{BuildError, EvalResult, EvaluationError},
    fuzzy::{Indeterminate, Truth},
    state::{
        cache::{CacheEntry, CacheKey},
        World,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Definition<E> {
    #[getset(get = "pub")]
    signature: Rc<Signature>,
    #[getset(get = "pub")]
    parameters: Vec<Variable>,
    #[getset(get = "pub")]
    body: Option<E>,
}

impl<E> Definition<E> {
    fn bindings(&self, arguments: &[ConstantHandle], outer: &Bindings) -> Bindings {
        let res = Bindings::from_parameters(&self.parameters, arguments);
        match outer.duration() {
            Some(d) => res.with_duration(d),
            None => res,
        }
    }
}

/// Every defined formula of a problem.
///
/// Declaring and defining are separate steps, so that bodies
/// can refer to any declared formula, themselves included.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    predicates: Vec<Definition<LogicalExp>>,
    functions: Vec<Definition<NumericExp>>,
    objects: Vec<Definition<ObjectExp>>,
}

fn declare<E>(
    definitions: &mut Vec<Definition<E>>,
    name: &str,
    parameters: &[Variable],
) -> Result<Rc<Signature>, BuildError> {
    let typesets = parameters
        .iter()
        .map(|p| p.typeset().clone())
        .collect::<Vec<_>>();
    // Offsets of defined formulas number the definitions, not ground instances
    let signature = Rc::new(Signature::new(name, &typesets, definitions.len())?);
    definitions.push(Definition {
        signature: Rc::clone(&signature),
        parameters: parameters.to_vec(),
        body: None,
    });
    Ok(signature)
}

fn define<E>(
    definitions: &mut [Definition<E>],
    signature: &Signature,
    body: E,
) -> Result<(), BuildError> {
    match definitions.get_mut(signature.offset()) {
        Some(d) if *d.signature == *signature => {
            d.body = Some(body);
            Ok(())
        }
        _ => Err(BuildError::UnknownName(signature.name_str())),
    }
}

impl Definitions {
    pub fn declare_predicate(
        &mut self,
        name: &str,
        parameters: &[Variable],
    ) -> Result<Rc<Signature>, BuildError> {
        declare(&mut self.predicates, name, parameters)
    }

    pub fn declare_function(
        &mut self,
        name: &str,
        parameters: &[Variable],
    ) -> Result<Rc<Signature>, BuildError> {
        declare(&mut self.functions, name, parameters)
    }

    pub fn declare_object_function(
        &mut self,
        name: &str,
        parameters: &[Variable],
    ) -> Result<Rc<Signature>, BuildError> {
        declare(&mut self.objects, name, parameters)
    }

    pub fn define_predicate(
        &mut self,
        signature: &Signature,
        body: LogicalExp,
    ) -> Result<(), BuildError> {
        define(&mut self.predicates, signature, body)
    }

    pub fn define_function(
        &mut self,
        signature: &Signature,
        body: NumericExp,
    ) -> Result<(), BuildError> {
        define(&mut self.functions, signature, body)
    }

    pub fn define_object_function(
        &mut self,
        signature: &Signature,
        body: ObjectExp,
    ) -> Result<(), BuildError> {
        define(&mut self.objects, signature, body)
    }

    pub fn predicate(&self, signature: &Signature) -> Option<&Definition<LogicalExp>> {
        self.predicates.get(signature.offset())
    }

    pub fn function(&self, signature: &Signature) -> Option<&Definition<NumericExp>> {
        self.functions.get(signature.offset())
    }

    pub fn object_function(&self, signature: &Signature) -> Option<&Definition<ObjectExp>> {
        self.objects.get(signature.offset())
    }
}

macro_rules! evaluate_defined {
    ($name:ident, $lookup:ident, $cache:ident, $value:ident, $bound:ident, $undefined:ident) => {
        pub fn $name<W: World>(
            app: &Application,
            world: &W,
            bindings: &Bindings,
        ) -> EvalResult<W::$value> {
            let (index, arguments) = match app.evaluate_arguments(world, bindings)? {
                Grounding::Ground { index, arguments } => (index, arguments),
                Grounding::Undefined => return Ok(<W::$value as $bound>::$undefined),
                Grounding::Unknown => return Ok(<W::$value as Indeterminate>::UNKNOWN),
            };

            let Some(definition) = world.definitions().$lookup(app.signature()) else {
                return Err(EvaluationError::UndefinedExpression {
                    expression: app.to_string(),
                });
            };
            let Some(body) = definition.body() else {
                log::warn!("{} is declared but has no definition", app);
                return Ok(<W::$value as Indeterminate>::UNDEFINED);
            };

            let key = CacheKey {
                definition: app.offset(),
                arguments: index,
                duration: bindings.duration().map(f64::to_bits),
            };
            match world.$cache(|ns| ns.get_evaluation(key)) {
                CacheEntry::Finished(v) => return Ok(v),
                CacheEntry::InProgress => {
                    return Err(EvaluationError::Cycle {
                        formula: app.signature().ground_name(&arguments),
                    })
                }
                CacheEntry::New => {}
            }

            match body.evaluate(world, &definition.bindings(&arguments, bindings)) {
                Ok(v) => {
                    world.$cache(|ns| ns.finish(key, v.clone()));
                    Ok(v)
                }
                Err(e) => {
                    world.$cache(|ns| ns.abandon(key));
                    Err(e)
                }
            }
        }
    };
}

// Predicates applied to Undefined arguments are false, like atoms
evaluate_defined!(evaluate_predicate, predicate, with_predicate_cache, Truth, Truth, FALSE);
evaluate_defined!(
    evaluate_numeric,
    function,
    with_function_cache,
    Number,
    Indeterminate,
    UNDEFINED
);
evaluate_defined!(
    evaluate_object,
    object_function,
    with_object_cache,
    Object,
    Indeterminate,
    UNDEFINED
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calculus::numeric::NumericExp,
        entity::EntityStorage,
        fuzzy::{ArithmeticOp, Bool, Double, FuzzyBool},
        state::{facts::SortedFacts, fluents::SortedFluents, State},
    };
    use gazebo::dupe::Dupe;

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut entities = EntityStorage::default();
        let t = entities.get_or_create_type("thing");
        let a = entities.get_or_create_constant("a", &t);
        let ts = entities.typeset(&[&t]);
        let x = Variable::new("x", &ts);

        let mut defs = Definitions::default();
        let p = defs.declare_predicate("p", &[x.clone()]).unwrap();
        let body = LogicalExp::Defined(Application::new(&p, vec![x.into()]).unwrap());
        defs.define_predicate(&p, body).unwrap();

        let state = State::new(SortedFacts::new(), SortedFluents::new(), &Rc::new(defs));
        let query = LogicalExp::Defined(Application::new(&p, vec![a.into()]).unwrap());

        let res = query.evaluate(&state, &Bindings::new());
        assert_eq!(
            res,
            Err(EvaluationError::Cycle {
                formula: "p(a)".into()
            })
        );
        // Failed evaluations leave nothing behind
        assert_eq!(state.cached_evaluations(), 0);

        let res = query.evaluate(&state.as_open(), &Bindings::new());
        assert!(matches!(res, Err(EvaluationError::Cycle { .. })));
    }

    #[test]
    fn test_results_are_memoized() {
        let mut entities = EntityStorage::default();
        let t = entities.get_or_create_type("thing");
        let a = entities.get_or_create_constant("a", &t);
        let b = entities.get_or_create_constant("b", &t);
        let ts = entities.typeset(&[&t]);
        let x = Variable::new("x", &ts);

        let mut defs = Definitions::default();
        let double = defs.declare_function("double", &[x.clone()]).unwrap();
        defs.define_function(
            &double,
            NumericExp::arithmetic(
                ArithmeticOp::Mul,
                NumericExp::number(2.0),
                NumericExp::number(21.0),
            ),
        )
        .unwrap();
        let same = defs.declare_predicate("same", &[x.clone()]).unwrap();
        defs.define_predicate(
            &same,
            LogicalExp::Equal(x.clone().into(), ObjectExp::Constant(a.dupe())),
        )
        .unwrap();

        let state = State::new(SortedFacts::new(), SortedFluents::new(), &Rc::new(defs));
        let apply = |c: &ConstantHandle| {
            Application::new(&double, vec![c.dupe().into()]).unwrap()
        };

        let v = evaluate_numeric(&apply(&a), &state, &Bindings::new());
        assert_eq!(v, Ok(Double::Defined(42.0)));
        let _ = evaluate_numeric(&apply(&b), &state, &Bindings::new());
        assert_eq!(state.cached_evaluations(), 2);

        let is_a = Application::new(&same, vec![a.dupe().into()]).unwrap();
        let is_b = Application::new(&same, vec![b.into()]).unwrap();
        assert_eq!(evaluate_predicate(&is_a, &state, &Bindings::new()), Ok(Bool::True));
        assert_eq!(evaluate_predicate(&is_b, &state, &Bindings::new()), Ok(Bool::False));
        assert_eq!(
            evaluate_predicate(&is_a, &state.as_open(), &Bindings::new()),
            Ok(FuzzyBool::True)
        );
        assert_eq!(state.cached_evaluations(), 4);
    }

    #[test]
    fn test_memoized_per_duration() {
        let mut defs = Definitions::default();
        let elapsed = defs.declare_function("elapsed", &[]).unwrap();
        defs.define_function(&elapsed, NumericExp::Duration).unwrap();

        let state = State::new(SortedFacts::new(), SortedFluents::new(), &Rc::new(defs));
        let app = Application::new(&elapsed, vec![]).unwrap();

        let first = Bindings::new().with_duration(1.0);
        let second = Bindings::new().with_duration(2.0);
        assert_eq!(evaluate_numeric(&app, &state, &first), Ok(Double::Defined(1.0)));
        assert_eq!(evaluate_numeric(&app, &state, &second), Ok(Double::Defined(2.0)));
        assert_eq!(evaluate_numeric(&app, &state, &first), Ok(Double::Defined(1.0)));
        assert_eq!(state.cached_evaluations(), 2);

        // Outside of a durative action the duration is unbound
        assert!(matches!(
            evaluate_numeric(&app, &state, &Bindings::new()),
            Err(EvaluationError::Binding { .. })
        ));
    }

    #[test]
    fn test_define_checks_declaration() {
        let mut defs = Definitions::default();
        let p = defs.declare_predicate("p", &[]).unwrap();
        let stranger = Signature::new("q", &[], 0).unwrap();

        assert!(defs.define_predicate(&p, LogicalExp::True).is_ok());
        assert_eq!(
            defs.define_predicate(&stranger, LogicalExp::False),
            Err(BuildError::UnknownName("q".into()))
        );
        assert_eq!(defs.predicate(&p).and_then(|d| d.body().clone()), Some(LogicalExp::True));
    }
}
