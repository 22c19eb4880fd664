use core::fmt::Display;
use gazebo::dupe::Dupe;

use crate::{
    calculus::{
        binding::{Bindings, Images, Variable},
        defined,
        signature::{Application, Grounding, SimplifiedArguments},
        Simplified,
    },
    entity::ConstantHandle,
    error::EvalResult,
    fuzzy::{Indeterminate, ObjectValue},
    state::World,
};

/// Expression evaluating to a domain object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectExp {
    Constant(ConstantHandle),
    Variable(Variable),
    /// Object-valued fluent, read from the world.
    Fluent(Application),
    /// Object function with a user-supplied definition.
    Defined(Application),
}

impl ObjectExp {
    pub fn evaluate<W: World>(&self, world: &W, bindings: &Bindings) -> EvalResult<W::Object> {
        match self {
            Self::Constant(c) => Ok(W::Object::defined(c.dupe())),
            Self::Variable(v) => bindings.resolve(v).map(W::Object::defined),
            Self::Fluent(app) => Ok(match app.evaluate_arguments(world, bindings)? {
                Grounding::Ground { index, .. } => world.object_fluent(app.offset() + index),
                Grounding::Undefined => W::Object::UNDEFINED,
                Grounding::Unknown => W::Object::UNKNOWN,
            }),
            Self::Defined(app) => defined::evaluate_object(app, world, bindings),
        }
    }

    /// Replaces what can be decided by its value.
    ///
    /// Unknown values are never returned,
    /// the expression stays as a residual instead.
    pub fn simplify<W: World>(
        &self,
        world: &W,
        bindings: &Bindings,
    ) -> EvalResult<Simplified<W::Object, Self>> {
        match self {
            Self::Constant(c) => Ok(Simplified::Value(W::Object::defined(c.dupe()))),
            Self::Variable(v) => Ok(match bindings.get(v) {
                Some(c) => Simplified::Value(W::Object::defined(c.dupe())),
                None => Simplified::Residual(self.clone()),
            }),
            Self::Fluent(app) | Self::Defined(app) => {
                Ok(match app.simplify_arguments(world, bindings)? {
                    SimplifiedArguments::Undefined => Simplified::Value(W::Object::UNDEFINED),
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
        }
    }

    fn rewrap(&self, app: Application) -> Self {
        match self {
            Self::Defined(_) => Self::Defined(app),
            _ => Self::Fluent(app),
        }
    }

    /// Substitutes bound variables, free ones are kept.
    pub fn apply(&self, bindings: &Bindings) -> Self {
        match self {
            Self::Constant(_) => self.clone(),
            Self::Variable(v) => match bindings.get(v) {
                Some(c) => Self::Constant(c.dupe()),
                None => self.clone(),
            },
            Self::Fluent(app) => Self::Fluent(app.apply(bindings)),
            Self::Defined(app) => Self::Defined(app.apply(bindings)),
        }
    }

    pub fn standardize(&self, images: &mut Images) -> Self {
        match self {
            Self::Constant(_) => self.clone(),
            Self::Variable(v) => Self::Variable(images.image(v)),
            Self::Fluent(app) => Self::Fluent(app.standardize(images)),
            Self::Defined(app) => Self::Defined(app.standardize(images)),
        }
    }

    pub fn is_ground(&self) -> bool {
        match self {
            Self::Constant(_) => true,
            Self::Variable(_) => false,
            Self::Fluent(app) | Self::Defined(app) => app.is_ground(),
        }
    }
}

impl Display for ObjectExp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Constant(c) => write!(f, "{}", c),
            Self::Variable(v) => write!(f, "{}", v),
            Self::Fluent(app) | Self::Defined(app) => write!(f, "{}", app),
        }
    }
}

impl From<ConstantHandle> for ObjectExp {
    fn from(value: ConstantHandle) -> Self {
        Self::Constant(value)
    }
}

impl From<Variable> for ObjectExp {
    fn from(value: Variable) -> Self {
        Self::Variable(value)
    }
}

impl From<&ConstantHandle> for ObjectExp {
    fn from(value: &ConstantHandle) -> Self {
        Self::Constant(value.dupe())
    }
}

impl From<&Variable> for ObjectExp {
    fn from(value: &Variable) -> Self {
        Self::Variable(value.clone())
    }
}
