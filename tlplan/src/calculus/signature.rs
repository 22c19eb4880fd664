use alloc::{
    format,
    rc::Rc,
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt::Display, ops::Range};
use gazebo::dupe::Dupe;
use getset::Getters;
use itertools::Itertools;

use crate::{
    calculus::{
        binding::{Bindings, Images},
        object::ObjectExp,
        Simplified,
    },
    entity::{ConstantHandle, TypeSet},
    error::{BuildError, EvalResult},
    fuzzy::{FuzzyConstant, ObjectValue},
    state::World,
    util::named::{Named, NamedStorage},
    InternerSymbol,
};

/// Dense ID of a ground atomic formula.
pub type FormulaId = usize;
/// Dense ID of a ground fluent application.
pub type FluentId = usize;

/// Name and parameter typesets of a predicate or function.
///
/// A signature owns the ID interval `[offset, offset + len)`,
/// one ID per tuple of its parameters' domains.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct Signature {
    #[getset(get = "pub")]
    name: InternerSymbol,
    #[getset(get = "pub")]
    parameters: Vec<TypeSet>,
    offset: usize,
    len: usize,
}

impl Signature {
    /// Fails if the number of ground instances overflows `usize`.
    pub fn new(name: &str, parameters: &[TypeSet], offset: usize) -> Result<Self, BuildError> {
        let len = parameters
            .iter()
            .try_fold(1usize, |acc, ts| acc.checked_mul(ts.len()))
            .ok_or_else(|| BuildError::TooManyInstances(name.to_string()))?;
        Ok(Self {
            name: crate::intern(name),
            parameters: parameters.iter().map(Dupe::dupe).collect(),
            offset,
            len,
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn name_str(&self) -> String {
        crate::resolve(self.name)
    }

    /// Number of ground instances.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mixed-radix position of the argument tuple
    /// among this signature's ground instances.
    pub fn ground_index(&self, arguments: &[ConstantHandle]) -> Option<usize> {
        if arguments.len() != self.arity() {
            return None;
        }

        self.parameters
            .iter()
            .zip(arguments)
            .try_fold(0, |acc, (ts, c)| Some(acc * ts.len() + ts.id_of(c)?))
    }

    pub fn ground_id(&self, arguments: &[ConstantHandle]) -> Option<usize> {
        self.ground_index(arguments).map(|i| i + self.offset)
    }

    /// Diagnostic rendering of a ground instance, `name(a, b)`.
    pub fn ground_name(&self, arguments: &[ConstantHandle]) -> String {
        format!("{}({})", self.name_str(), arguments.iter().join(", "))
    }
}

impl Named for Signature {
    fn name(&self) -> InternerSymbol {
        self.name
    }
}

/// Hands out the ID intervals of predicates and functions.
///
/// Predicates number formulas and functions number fluents,
/// both starting at zero.
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    predicates: NamedStorage<Rc<Signature>>,
    functions: NamedStorage<Rc<Signature>>,
    facts: usize,
    fluents: usize,
}

impl SignatureRegistry {
    pub fn declare_predicate(
        &mut self,
        name: &str,
        parameters: &[TypeSet],
    ) -> Result<Rc<Signature>, BuildError> {
        Self::declare(&mut self.predicates, &mut self.facts, name, parameters)
    }

    pub fn declare_function(
        &mut self,
        name: &str,
        parameters: &[TypeSet],
    ) -> Result<Rc<Signature>, BuildError> {
        Self::declare(&mut self.functions, &mut self.fluents, name, parameters)
    }

    fn declare(
        storage: &mut NamedStorage<Rc<Signature>>,
        next: &mut usize,
        name: &str,
        parameters: &[TypeSet],
    ) -> Result<Rc<Signature>, BuildError> {
        if let Some(s) = storage.get(name) {
            if s.parameters() == parameters {
                return Ok(Rc::clone(s));
            }
            log::warn!("Redeclaring {} with different parameters", name);
        }

        let signature = Rc::new(Signature::new(name, parameters, *next)?);
        *next = next
            .checked_add(signature.len())
            .ok_or_else(|| BuildError::TooManyInstances(name.to_string()))?;
        storage.insert(Rc::clone(&signature));
        Ok(signature)
    }

    pub fn predicate(&self, name: &str) -> Option<Rc<Signature>> {
        self.predicates.get(name).map(Rc::clone)
    }

    pub fn function(&self, name: &str) -> Option<Rc<Signature>> {
        self.functions.get(name).map(Rc::clone)
    }

    /// IDs of every ground atomic formula declared so far.
    pub fn fact_interval(&self) -> Range<FormulaId> {
        0..self.facts
    }

    /// IDs of every ground fluent declared so far.
    pub fn fluent_interval(&self) -> Range<FluentId> {
        0..self.fluents
    }
}

/// A predicate or function applied to object expressions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct Application {
    #[getset(get = "pub")]
    signature: Rc<Signature>,
    #[getset(get = "pub")]
    arguments: Vec<ObjectExp>,
}

/// Arguments of an application evaluated to constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grounding {
    /// `index` is the position among the signature's ground instances.
    Ground {
        index: usize,
        arguments: Vec<ConstantHandle>,
    },
    /// Some argument is Undefined or outside its parameter's typeset.
    Undefined,
    Unknown,
}

/// Arguments of an application after partial evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimplifiedArguments {
    Ground {
        index: usize,
        arguments: Vec<ConstantHandle>,
    },
    Undefined,
    /// Some argument could not be decided.
    Partial(Application),
}

impl Application {
    pub fn new(signature: &Rc<Signature>, arguments: Vec<ObjectExp>) -> Result<Self, BuildError> {
        if arguments.len() != signature.arity() {
            return Err(BuildError::WrongArity {
                name: signature.name_str(),
                expected: signature.arity(),
                found: arguments.len(),
            });
        }

        for (position, (ts, arg)) in signature.parameters().iter().zip(&arguments).enumerate() {
            if let ObjectExp::Constant(c) = arg {
                if !ts.contains(c) {
                    return Err(BuildError::TypeMismatch {
                        name: signature.name_str(),
                        position,
                    });
                }
            }
        }

        Ok(Self {
            signature: Rc::clone(signature),
            arguments,
        })
    }

    /// Application to constants, skipping the type checks of [Application::new].
    pub fn ground(signature: &Rc<Signature>, arguments: &[ConstantHandle]) -> Self {
        Self {
            signature: Rc::clone(signature),
            arguments: arguments
                .iter()
                .map(|c| ObjectExp::Constant(c.dupe()))
                .collect(),
        }
    }

    /// Offset of the signature's ID interval.
    pub fn offset(&self) -> usize {
        self.signature.offset()
    }

    /// Evaluates the arguments.
    ///
    /// Undefined arguments win over Unknown ones.
    pub fn evaluate_arguments<W: World>(
        &self,
        world: &W,
        bindings: &Bindings,
    ) -> EvalResult<Grounding> {
        let mut constants = Vec::with_capacity(self.arguments.len());
        let mut unknown = false;
        for arg in &self.arguments {
            let value: FuzzyConstant = arg.evaluate(world, bindings)?.into();
            match value {
                FuzzyConstant::Defined(c) => constants.push(c),
                FuzzyConstant::Undefined => return Ok(Grounding::Undefined),
                FuzzyConstant::Unknown => unknown = true,
            }
        }

        if unknown {
            return Ok(Grounding::Unknown);
        }

        Ok(match self.signature.ground_index(&constants) {
            Some(index) => Grounding::Ground {
                index,
                arguments: constants,
            },
            None => Grounding::Undefined,
        })
    }

    pub fn simplify_arguments<W: World>(
        &self,
        world: &W,
        bindings: &Bindings,
    ) -> EvalResult<SimplifiedArguments> {
        let mut simplified = Vec::with_capacity(self.arguments.len());
        let mut partial = false;
        for arg in &self.arguments {
            match arg.simplify(world, bindings)? {
                Simplified::Value(v) => match v.constant() {
                    Some(c) => simplified.push(ObjectExp::Constant(c)),
                    None => return Ok(SimplifiedArguments::Undefined),
                },
                Simplified::Residual(e) => {
                    partial = true;
                    simplified.push(e);
                }
            }
        }

        if partial {
            return Ok(SimplifiedArguments::Partial(Self {
                signature: Rc::clone(&self.signature),
                arguments: simplified,
            }));
        }

        let constants = simplified
            .into_iter()
            .filter_map(|e| match e {
                ObjectExp::Constant(c) => Some(c),
                _ => None,
            })
            .collect::<Vec<_>>();
        Ok(match self.signature.ground_index(&constants) {
            Some(index) => SimplifiedArguments::Ground {
                index,
                arguments: constants,
            },
            None => SimplifiedArguments::Undefined,
        })
    }

    pub fn apply(&self, bindings: &Bindings) -> Self {
        Self {
            signature: Rc::clone(&self.signature),
            arguments: self.arguments.iter().map(|a| a.apply(bindings)).collect(),
        }
    }

    pub fn standardize(&self, images: &mut Images) -> Self {
        Self {
            signature: Rc::clone(&self.signature),
            arguments: self
                .arguments
                .iter()
                .map(|a| a.standardize(images))
                .collect(),
        }
    }

    pub fn is_ground(&self) -> bool {
        self.arguments.iter().all(ObjectExp::is_ground)
    }
}

impl Display for Application {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.arguments.is_empty() {
            write!(f, "({})", self.signature.name_str())
        } else {
            write!(
                f,
                "({} {})",
                self.signature.name_str(),
                self.arguments.iter().map(ToString::to_string).join(" ")
            )
        }
    }
}
