use alloc::boxed::Box;
use core::fmt::Display;

use crate::{
    calculus::{
        binding::{Bindings, Images},
        defined,
        signature::{Application, Grounding, SimplifiedArguments},
        Simplified,
    },
    error::{EvalResult, EvaluationError},
    fuzzy::{ArithmeticOp, Indeterminate, Number, Real},
    state::World,
};

/// Expression evaluating to a number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericExp {
    Number(Real),
    /// Numeric fluent, read from the world.
    Fluent(Application),
    /// Numeric function with a user-supplied definition.
    Defined(Application),
    Arithmetic {
        op: ArithmeticOp,
        lhs: Box<NumericExp>,
        rhs: Box<NumericExp>,
    },
    Neg(Box<NumericExp>),
    /// Duration of the durative action being evaluated, `?duration`.
    Duration,
}

impl NumericExp {
    pub fn number(value: f64) -> Self {
        Self::Number(Real(value))
    }

    pub fn arithmetic(op: ArithmeticOp, lhs: Self, rhs: Self) -> Self {
        Self::Arithmetic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn neg(exp: Self) -> Self {
        Self::Neg(Box::new(exp))
    }

    /// Undefined and Unknown operands propagate, illegal arithmetic
    /// on defined operands fails with [EvaluationError::Numeric].
    pub fn evaluate<W: World>(&self, world: &W, bindings: &Bindings) -> EvalResult<W::Number> {
        match self {
            Self::Number(r) => Ok(r.0.into()),
            Self::Fluent(app) => Ok(match app.evaluate_arguments(world, bindings)? {
                Grounding::Ground { index, .. } => world.numeric_fluent(app.offset() + index),
                Grounding::Undefined => W::Number::UNDEFINED,
                Grounding::Unknown => W::Number::UNKNOWN,
            }),
            Self::Defined(app) => defined::evaluate_numeric(app, world, bindings),
            Self::Arithmetic { op, lhs, rhs } => W::Number::arithmetic(
                *op,
                lhs.evaluate(world, bindings)?,
                rhs.evaluate(world, bindings)?,
            ),
            Self::Neg(e) => Ok(e.evaluate(world, bindings)?.negate()),
            Self::Duration => bindings
                .duration()
                .map(W::Number::from)
                .ok_or_else(|| EvaluationError::Binding {
                    variable: "?duration".into(),
                }),
        }
    }

    pub fn simplify<W: World>(
        &self,
        world: &W,
        bindings: &Bindings,
    ) -> EvalResult<Simplified<W::Number, Self>> {
        match self {
            Self::Number(r) => Ok(Simplified::Value(r.0.into())),
            Self::Fluent(app) | Self::Defined(app) => {
                Ok(match app.simplify_arguments(world, bindings)? {
                    SimplifiedArguments::Undefined => Simplified::Value(W::Number::UNDEFINED),
                    SimplifiedArguments::Partial(app) => Simplified::Residual(self.rewrap(app)),
                    SimplifiedArguments::Ground { arguments, .. } => {
                        let ground = self.rewrap(Application::ground(app.signature(), &arguments));
                        let value = ground.evaluate(world, bindings)?;
                        if value.is_unknown() {
                            Simplified::Residual(ground)
                        } else {
                            Simplified::Value(value)
                        }
                    }
                })
            }
            Self::Arithmetic { op, lhs, rhs } => {
                match (lhs.simplify(world, bindings)?, rhs.simplify(world, bindings)?) {
                    (Simplified::Value(l), Simplified::Value(r)) => {
                        W::Number::arithmetic(*op, l, r).map(Simplified::Value)
                    }
                    // Undefined wins over anything left undecided
                    (Simplified::Value(v), _) | (_, Simplified::Value(v))
                        if v.value().is_none() =>
                    {
                        Ok(Simplified::Value(W::Number::UNDEFINED))
                    }
                    (l, r) => Ok(Simplified::Residual(Self::arithmetic(
                        *op,
                        Self::from_simplified(l),
                        Self::from_simplified(r),
                    ))),
                }
            }
            Self::Neg(e) => Ok(match e.simplify(world, bindings)? {
                Simplified::Value(v) => Simplified::Value(v.negate()),
                Simplified::Residual(r) => Simplified::Residual(Self::neg(r)),
            }),
            Self::Duration => Ok(match bindings.duration() {
                Some(d) => Simplified::Value(d.into()),
                None => Simplified::Residual(Self::Duration),
            }),
        }
    }

    fn from_simplified<N: Number>(operand: Simplified<N, Self>) -> Self {
        match operand {
            Simplified::Value(v) => Self::number(v.value().unwrap_or(f64::NAN)),
            Simplified::Residual(e) => e,
        }
    }

    fn rewrap(&self, app: Application) -> Self {
        match self {
            Self::Defined(_) => Self::Defined(app),
            _ => Self::Fluent(app),
        }
    }

    pub fn apply(&self, bindings: &Bindings) -> Self {
        match self {
            Self::Number(_) | Self::Duration => self.clone(),
            Self::Fluent(app) => Self::Fluent(app.apply(bindings)),
            Self::Defined(app) => Self::Defined(app.apply(bindings)),
            Self::Arithmetic { op, lhs, rhs } => {
                Self::arithmetic(*op, lhs.apply(bindings), rhs.apply(bindings))
            }
            Self::Neg(e) => Self::neg(e.apply(bindings)),
        }
    }

    pub fn standardize(&self, images: &mut Images) -> Self {
        match self {
            Self::Number(_) | Self::Duration => self.clone(),
            Self::Fluent(app) => Self::Fluent(app.standardize(images)),
            Self::Defined(app) => Self::Defined(app.standardize(images)),
            Self::Arithmetic { op, lhs, rhs } => {
                Self::arithmetic(*op, lhs.standardize(images), rhs.standardize(images))
            }
            Self::Neg(e) => Self::neg(e.standardize(images)),
        }
    }
}

impl Display for NumericExp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Number(r) => write!(f, "{}", r),
            Self::Fluent(app) | Self::Defined(app) => write!(f, "{}", app),
            Self::Arithmetic { op, lhs, rhs } => write!(f, "({} {} {})", op.symbol(), lhs, rhs),
            Self::Neg(e) => write!(f, "(- {})", e),
            Self::Duration => write!(f, "?duration"),
        }
    }
}

impl From<f64> for NumericExp {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}
