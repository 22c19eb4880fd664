//! Effects of actions.
//!
//! Effects are evaluated against the state the action is applied to,
//! which produces a list of [Update]s. The updates are then written
//! to a copy of that state, deletes first, so an atom that is both
//! deleted and added ends up true.

use alloc::{
    boxed::Box,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt::Display;
use itertools::Itertools;
use log::trace;

use crate::{
    calculus::{
        binding::{assignments, Bindings, Images, Variable},
        logical::LogicalExp,
        numeric::NumericExp,
        object::ObjectExp,
        signature::{Application, FluentId, FormulaId, Grounding},
    },
    error::{EvalResult, EvaluationError},
    fuzzy::{ArithmeticOp, Number, ObjectValue, Truth},
    state::{fluents::FluentValue, UpdateWorld, World},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssignOp {
    Assign,
    Increase,
    Decrease,
    ScaleUp,
    ScaleDown,
}

impl AssignOp {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::ScaleUp => "scale-up",
            Self::ScaleDown => "scale-down",
        }
    }

    fn arithmetic(self) -> Option<ArithmeticOp> {
        match self {
            Self::Assign => None,
            Self::Increase => Some(ArithmeticOp::Add),
            Self::Decrease => Some(ArithmeticOp::Sub),
            Self::ScaleUp => Some(ArithmeticOp::Mul),
            Self::ScaleDown => Some(ArithmeticOp::Div),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Effect {
    Add(Application),
    Delete(Application),
    And(Vec<Effect>),
    /// Conditional effect, the condition is checked in the state
    /// the action is applied to.
    When(LogicalExp, Box<Effect>),
    ForAll(Vec<Variable>, Box<Effect>),
    /// Numeric fluent update, `head` is the fluent application.
    Assign {
        op: AssignOp,
        head: Application,
        value: NumericExp,
    },
    AssignObject {
        head: Application,
        value: ObjectExp,
    },
    Undefine(Application),
}

/// A single change to a world, with everything already evaluated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Update {
    Set(FormulaId),
    Unset(FormulaId),
    Fluent(FluentId, FluentValue),
    Undefine(FluentId),
}

impl Effect {
    pub fn and(effects: Vec<Self>) -> Self {
        let mut res = Vec::with_capacity(effects.len());
        for e in effects {
            match e {
                Self::And(inner) => res.extend(inner),
                e => res.push(e),
            }
        }
        Self::And(res)
    }

    pub fn when(condition: LogicalExp, effect: Self) -> Self {
        Self::When(condition, Box::new(effect))
    }

    pub fn forall(variables: Vec<Variable>, effect: Self) -> Self {
        Self::ForAll(variables, Box::new(effect))
    }

    pub fn assign(op: AssignOp, head: Application, value: NumericExp) -> Self {
        Self::Assign { op, head, value }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(effects) => effects.iter().all(Self::is_empty),
            _ => false,
        }
    }

    /// Evaluates the effect in `world` and collects the changes it makes.
    ///
    /// Heads and assigned values must be defined and known,
    /// anything else is an error.
    pub fn updates<W: World>(
        &self,
        world: &W,
        bindings: &Bindings,
        updates: &mut Vec<Update>,
    ) -> EvalResult<()> {
        match self {
            Self::Add(app) => updates.push(Update::Set(head_id(app, world, bindings)?)),
            Self::Delete(app) => updates.push(Update::Unset(head_id(app, world, bindings)?)),
            Self::And(effects) => {
                for e in effects {
                    e.updates(world, bindings, updates)?;
                }
            }
            Self::When(condition, effect) => {
                let holds = condition.evaluate(world, bindings)?;
                if holds.is_true() {
                    effect.updates(world, bindings, updates)?;
                } else if holds.is_unknown() {
                    log::trace!(
                        "Condition {} is unknown, skipping its effect",
                        condition.apply(bindings)
                    );
                }
            }
            Self::ForAll(variables, effect) => {
                for b in assignments(variables, bindings) {
                    effect.updates(world, &b, updates)?;
                }
            }
            Self::Assign { op, head, value } => {
                let id = head_id(head, world, bindings)?;
                let value = defined_number(value.evaluate(world, bindings)?, || {
                    value.apply(bindings).to_string()
                })?;
                let value = match op.arithmetic() {
                    None => value,
                    Some(arithmetic) => {
                        let current = defined_number(world.numeric_fluent(id), || {
                            head.apply(bindings).to_string()
                        })?;
                        arithmetic.checked(current, value)?
                    }
                };
                updates.push(Update::Fluent(id, value.into()));
            }
            Self::AssignObject { head, value } => {
                let id = head_id(head, world, bindings)?;
                let object = value.evaluate(world, bindings)?;
                let describe = || value.apply(bindings).to_string();
                match object.constant() {
                    Some(c) => updates.push(Update::Fluent(id, c.into())),
                    None if object.is_unknown() => {
                        return Err(EvaluationError::UnknownExpression {
                            expression: describe(),
                        })
                    }
                    None => {
                        return Err(EvaluationError::UndefinedExpression {
                            expression: describe(),
                        })
                    }
                }
            }
            Self::Undefine(app) => updates.push(Update::Undefine(head_id(app, world, bindings)?)),
        }
        Ok(())
    }

    pub fn apply(&self, bindings: &Bindings) -> Self {
        match self {
            Self::Add(app) => Self::Add(app.apply(bindings)),
            Self::Delete(app) => Self::Delete(app.apply(bindings)),
            Self::And(effects) => Self::And(effects.iter().map(|e| e.apply(bindings)).collect()),
            Self::When(c, e) => Self::when(c.apply(bindings), e.apply(bindings)),
            Self::ForAll(variables, e) => {
                Self::forall(variables.clone(), e.apply(&bindings.without(variables)))
            }
            Self::Assign { op, head, value } => {
                Self::assign(*op, head.apply(bindings), value.apply(bindings))
            }
            Self::AssignObject { head, value } => Self::AssignObject {
                head: head.apply(bindings),
                value: value.apply(bindings),
            },
            Self::Undefine(app) => Self::Undefine(app.apply(bindings)),
        }
    }

    pub fn standardize(&self, images: &mut Images) -> Self {
        match self {
            Self::Add(app) => Self::Add(app.standardize(images)),
            Self::Delete(app) => Self::Delete(app.standardize(images)),
            Self::And(effects) => {
                Self::And(effects.iter().map(|e| e.standardize(images)).collect())
            }
            Self::When(c, e) => Self::when(c.standardize(images), e.standardize(images)),
            Self::ForAll(variables, e) => {
                Self::forall(images.images(variables), e.standardize(images))
            }
            Self::Assign { op, head, value } => {
                Self::assign(*op, head.standardize(images), value.standardize(images))
            }
            Self::AssignObject { head, value } => Self::AssignObject {
                head: head.standardize(images),
                value: value.standardize(images),
            },
            Self::Undefine(app) => Self::Undefine(app.standardize(images)),
        }
    }
}

impl Default for Effect {
    fn default() -> Self {
        Self::And(Vec::new())
    }
}

impl Display for Effect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Add(app) => write!(f, "{}", app),
            Self::Delete(app) => write!(f, "(not {})", app),
            Self::And(effects) => write!(f, "(and {})", effects.iter().join(" ")),
            Self::When(c, e) => write!(f, "(when {} {})", c, e),
            Self::ForAll(variables, e) => write!(
                f,
                "(forall ({}) {})",
                variables.iter().map(Variable::typed).join(" "),
                e
            ),
            Self::Assign { op, head, value } => write!(f, "({} {} {})", op.keyword(), head, value),
            Self::AssignObject { head, value } => write!(f, "(assign {} {})", head, value),
            Self::Undefine(app) => write!(f, "(undefine {})", app),
        }
    }
}

/// ID of the fact or fluent an effect writes to.
fn head_id<W: World>(head: &Application, world: &W, bindings: &Bindings) -> EvalResult<FormulaId> {
    match head.evaluate_arguments(world, bindings)? {
        Grounding::Ground { index, .. } => Ok(head.offset() + index),
        Grounding::Undefined => Err(EvaluationError::UndefinedExpression {
            expression: head.apply(bindings).to_string(),
        }),
        Grounding::Unknown => Err(EvaluationError::UnknownExpression {
            expression: head.apply(bindings).to_string(),
        }),
    }
}

fn defined_number<N: Number>(
    value: N,
    describe: impl FnOnce() -> String,
) -> EvalResult<f64> {
    match value.value() {
        Some(v) => Ok(v),
        None if value.is_unknown() => Err(EvaluationError::UnknownExpression {
            expression: describe(),
        }),
        None => Err(EvaluationError::UndefinedExpression {
            expression: describe(),
        }),
    }
}

/// Writes evaluated updates, deletes before adds.
pub fn apply_updates(updates: &[Update], world: &mut impl UpdateWorld) {
    for u in updates {
        if let Update::Unset(id) = u {
            world.unset_fact(*id);
        }
    }
    for u in updates {
        match u {
            Update::Set(id) => world.set_fact(*id),
            Update::Fluent(id, value) => world.set_fluent(*id, value.clone()),
            Update::Undefine(id) => world.undefine_fluent(*id),
            Update::Unset(_) => {}
        }
    }
    trace!("Applied {} updates", updates.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calculus::defined::Definitions,
        fuzzy::{Bool, Double, FuzzyBool},
        state::{facts::SortedFacts, fluents::ArrayFluents, OpenState},
        testing::Blocks,
    };
    use alloc::rc::Rc;

    fn run<W: World>(effect: &Effect, world: &W, bindings: &Bindings) -> EvalResult<Vec<Update>> {
        let mut res = Vec::new();
        effect.updates(world, bindings, &mut res)?;
        Ok(res)
    }

    #[test]
    fn test_deletes_before_adds() {
        let w = Blocks::new();
        let mut state = w.state();
        let on_ab = Blocks::id(&w.on, &[&w.a, &w.b]);
        let clear_a = Blocks::id(&w.clear, &[&w.a]);
        state.set_fact(on_ab);
        state.set_fact(clear_a);

        let on = Blocks::app(&w.on, &[(&w.a).into(), (&w.b).into()]);
        let clear = Blocks::app(&w.clear, &[(&w.a).into()]);
        let effect = Effect::and(vec![
            Effect::Add(on.clone()),
            Effect::Delete(on),
            Effect::Delete(clear),
        ]);

        let updates = run(&effect, &state, &Bindings::new()).unwrap();
        apply_updates(&updates, &mut state);
        assert!(state.is_true(on_ab));
        assert!(!state.is_true(clear_a));
    }

    #[test]
    fn test_conditions_read_the_old_state() {
        let w = Blocks::new();
        let mut state = w.state();
        state.set_fact(Blocks::id(&w.clear, &[&w.a]));

        // Every clear block becomes unclear, which must not
        // hide the clear blocks from the condition
        let clear_x = Blocks::app(&w.clear, &[(&w.x).into()]);
        let effect = Effect::forall(
            vec![w.x.clone()],
            Effect::when(
                w.clear(&w.x),
                Effect::and(vec![
                    Effect::Delete(clear_x),
                    Effect::Add(Blocks::app(&w.on, &[(&w.x).into(), (&w.b).into()])),
                ]),
            ),
        );

        let updates = run(&effect, &state, &Bindings::new()).unwrap();
        assert_eq!(
            updates,
            vec![
                Update::Unset(Blocks::id(&w.clear, &[&w.a])),
                Update::Set(Blocks::id(&w.on, &[&w.a, &w.b])),
            ]
        );
    }

    #[test]
    fn test_assignments() {
        let w = Blocks::new();
        let mut state = w.state();
        let weight_a = Blocks::fluent(&w.weight, &[&w.a]);
        state.set_fluent(weight_a, 10.0.into());
        let head = Blocks::app(&w.weight, &[(&w.a).into()]);
        let none = Bindings::new();

        for (op, expected) in [
            (AssignOp::Assign, 4.0),
            (AssignOp::Increase, 14.0),
            (AssignOp::Decrease, 6.0),
            (AssignOp::ScaleUp, 40.0),
            (AssignOp::ScaleDown, 2.5),
        ] {
            let effect = Effect::assign(op, head.clone(), 4.0.into());
            assert_eq!(
                run(&effect, &state, &none),
                Ok(vec![Update::Fluent(weight_a, expected.into())])
            );
        }

        let effect = Effect::AssignObject {
            head: Blocks::app(&w.below, &[(&w.a).into()]),
            value: (&w.c).into(),
        };
        let updates = run(&effect, &state, &none).unwrap();
        apply_updates(&updates, &mut state);
        assert_eq!(
            w.below(&w.a).evaluate(&state, &none),
            Ok(crate::fuzzy::ConstantValue::Defined(w.c.clone()))
        );

        apply_updates(&[Update::Undefine(weight_a)], &mut state);
        assert_eq!(w.weight(&w.a).evaluate(&state, &none), Ok(Double::Undefined));
    }

    #[test]
    fn test_scale_down_by_zero_fails() {
        let w = Blocks::new();
        let mut state = w.state();
        state.set_fluent(Blocks::fluent(&w.weight, &[&w.a]), 10.0.into());
        let head = Blocks::app(&w.weight, &[(&w.a).into()]);

        let effect = Effect::assign(AssignOp::ScaleDown, head, 0.0.into());
        assert_eq!(
            run(&effect, &state, &Bindings::new()),
            Err(EvaluationError::Numeric {
                operator: "/",
                operands: vec![10.0, 0.0],
            })
        );
    }

    #[test]
    fn test_undefined_and_unknown_heads() {
        let w = Blocks::new();
        let state = w.state();
        let none = Bindings::new();

        // below(c) has no value
        let head = Blocks::app(&w.weight, &[w.below(&w.c)]);
        let effect = Effect::assign(AssignOp::Assign, head.clone(), 1.0.into());
        assert!(matches!(
            run(&effect, &state, &none),
            Err(EvaluationError::UndefinedExpression { .. })
        ));

        let current = Blocks::app(&w.weight, &[(&w.a).into()]);
        let effect = Effect::assign(AssignOp::Increase, current, 1.0.into());
        assert!(matches!(
            run(&effect, &state, &none),
            Err(EvaluationError::UndefinedExpression { .. })
        ));

        // An empty interval knows nothing
        let open = OpenState::new(
            SortedFacts::new(),
            ArrayFluents::new(0..0),
            &Rc::new(Definitions::default()),
        );
        let effect = Effect::assign(AssignOp::Assign, head, 1.0.into());
        assert!(matches!(
            run(&effect, &open, &none),
            Err(EvaluationError::UnknownExpression { .. })
        ));

        let add = Effect::Add(Blocks::app(&w.clear, &[w.below(&w.c)]));
        let effect = Effect::when(LogicalExp::False, add);
        assert_eq!(run(&effect, &state, &none), Ok(vec![]));

        // An Unknown condition skips its effect
        let add = Effect::Add(Blocks::app(&w.clear, &[(&w.b).into()]));
        let effect = Effect::when(w.clear(&w.a), add.clone());
        assert_eq!(w.clear(&w.a).evaluate(&open, &none), Ok(FuzzyBool::Unknown));
        assert_eq!(run(&effect, &open, &none), Ok(vec![]));
        let effect = Effect::when(LogicalExp::True, add);
        assert_eq!(
            run(&effect, &open, &none),
            Ok(vec![Update::Set(Blocks::id(&w.clear, &[&w.b]))])
        );
        assert_eq!(w.clear(&w.a).evaluate(&state, &none), Ok(Bool::False));
    }
}
