use alloc::{
    boxed::Box,
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::{
    fmt::Display,
    iter,
    sync::atomic::{AtomicUsize, Ordering},
};
use gazebo::dupe::Dupe;
use getset::Getters;
use itertools::Itertools;

use crate::{
    entity::{ConstantHandle, TypeSet},
    error::{EvalResult, EvaluationError},
    InternerSymbol,
};

/// A typed placeholder for a constant.
///
/// Action parameters and quantified variables are both variables,
/// they differ only in where their binding comes from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct Variable {
    #[getset(get = "pub")]
    name: InternerSymbol,
    #[getset(get = "pub")]
    typeset: TypeSet,
}

impl Variable {
    pub fn new(name: &str, typeset: &TypeSet) -> Self {
        Self {
            name: crate::intern(name.trim_start_matches('?')),
            typeset: typeset.dupe(),
        }
    }

    pub fn name_str(&self) -> String {
        crate::resolve(self.name)
    }

    /// `?x - block`
    pub fn typed(&self) -> String {
        format!("{} - {}", self, self.typeset)
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "?{}", self.name_str())
    }
}

/// Constants bound to variables, plus the duration of the
/// durative action being evaluated, if any.
///
/// Evaluation never modifies bindings, quantifiers
/// extend a copy for their body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    objects: BTreeMap<InternerSymbol, ConstantHandle>,
    duration: Option<f64>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds positionally, e.g. action parameters to the
    /// arguments of a ground action.
    pub fn from_parameters(parameters: &[Variable], arguments: &[ConstantHandle]) -> Self {
        let mut res = Self::default();
        for (p, a) in parameters.iter().zip(arguments) {
            res.bind(p, a);
        }
        res
    }

    pub fn bind(&mut self, variable: &Variable, constant: &ConstantHandle) {
        self.objects.insert(variable.name, constant.dupe());
    }

    pub fn with(&self, variable: &Variable, constant: &ConstantHandle) -> Self {
        let mut res = self.clone();
        res.bind(variable, constant);
        res
    }

    pub fn get(&self, variable: &Variable) -> Option<&ConstantHandle> {
        self.objects.get(&variable.name)
    }

    /// Looks the variable up, failing if it is free.
    pub fn resolve(&self, variable: &Variable) -> EvalResult<ConstantHandle> {
        self.get(variable)
            .map(Dupe::dupe)
            .ok_or_else(|| EvaluationError::Binding {
                variable: variable.to_string(),
            })
    }

    /// Drops the given variables, so they are free again
    /// in the scope that shadows them.
    pub fn without(&self, variables: &[Variable]) -> Self {
        let mut res = self.clone();
        for v in variables {
            res.objects.remove(&v.name);
        }
        res
    }

    pub fn with_duration(&self, duration: f64) -> Self {
        Self {
            objects: self.objects.clone(),
            duration: Some(duration),
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

/// Shared by every `Images`, separate standardizations never share a name.
static FRESH_NAMES: AtomicUsize = AtomicUsize::new(0);

/// Renaming map used to standardize expressions apart.
///
/// A variable name is given a fresh image the first time it is seen
/// and keeps it for every later occurrence in the same map.
#[derive(Debug, Clone, Default)]
pub struct Images(BTreeMap<InternerSymbol, InternerSymbol>);

impl Images {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&mut self, variable: &Variable) -> Variable {
        let name = *self.0.entry(variable.name).or_insert_with(|| {
            let n = FRESH_NAMES.fetch_add(1, Ordering::Relaxed);
            crate::intern(&format!("{}_{}", variable.name_str(), n))
        });

        Variable {
            name,
            typeset: variable.typeset.dupe(),
        }
    }

    pub fn images(&mut self, variables: &[Variable]) -> Vec<Variable> {
        variables.iter().map(|v| self.image(v)).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Every way of binding the variables to constants of their typesets,
/// each one extending `base`.
pub fn assignments<'a>(
    variables: &'a [Variable],
    base: &'a Bindings,
) -> Box<dyn Iterator<Item = Bindings> + 'a> {
    if variables.is_empty() {
        return Box::new(iter::once(base.clone()));
    }

    Box::new(
        variables
            .iter()
            .map(|v| v.typeset().domain().iter())
            .multi_cartesian_product()
            .map(move |constants| {
                let mut res = base.clone();
                for (v, c) in variables.iter().zip(constants) {
                    res.bind(v, c);
                }
                res
            }),
    )
}
