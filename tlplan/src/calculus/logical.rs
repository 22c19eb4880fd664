use alloc::{boxed::Box, vec::Vec};
use core::fmt::Display;
use itertools::Itertools;

use crate::{
    calculus::{
        binding::{assignments, Bindings, Images, Variable},
        defined,
        numeric::NumericExp,
        object::ObjectExp,
        signature::{Application, Grounding, SimplifiedArguments},
        Simplified,
    },
    error::EvalResult,
    fuzzy::{ComparisonOp, Indeterminate, Number, ObjectValue, ShortCircuit, Truth},
    state::World,
};

/// Expression evaluating to a truth value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicalExp {
    True,
    False,
    /// Predicate read from the world's facts.
    Atom(Application),
    /// Predicate with a user-supplied definition.
    Defined(Application),
    Not(Box<LogicalExp>),
    And(Vec<LogicalExp>),
    Or(Vec<LogicalExp>),
    Imply(Box<LogicalExp>, Box<LogicalExp>),
    Exists(Vec<Variable>, Box<LogicalExp>),
    ForAll(Vec<Variable>, Box<LogicalExp>),
    Compare(ComparisonOp, NumericExp, NumericExp),
    Equal(ObjectExp, ObjectExp),
}

/// Collects the simplified operands of a conjunction or disjunction.
struct Junction<T> {
    conjunction: bool,
    value: T,
    operands: Vec<LogicalExp>,
    undecided: bool,
}

impl<T: Truth> Junction<T> {
    fn new(conjunction: bool) -> Self {
        Self {
            conjunction,
            value: if conjunction { T::TRUE } else { T::FALSE },
            operands: Vec::new(),
            undecided: false,
        }
    }

    fn absorbing(&self) -> T {
        if self.conjunction {
            T::FALSE
        } else {
            T::TRUE
        }
    }

    /// Adds an operand, returning whether the outcome is decided.
    ///
    /// Indeterminate values keep their operand, so the residual
    /// stays indeterminate if it is ever evaluated.
    fn push(
        &mut self,
        operand: Simplified<T, LogicalExp>,
        original: impl FnOnce() -> LogicalExp,
    ) -> bool {
        match operand {
            Simplified::Value(v) if v == self.absorbing() => {
                self.value = v;
                return true;
            }
            Simplified::Value(v) if v == !self.absorbing() => {}
            Simplified::Value(v) => {
                self.value = if self.conjunction {
                    self.value & v
                } else {
                    self.value | v
                };
                self.operands.push(original());
            }
            Simplified::Residual(r) => {
                self.undecided = true;
                self.operands.push(r);
            }
        }
        false
    }

    fn finish(mut self) -> Simplified<T, LogicalExp> {
        if self.value == self.absorbing() || !self.undecided {
            return Simplified::Value(self.value);
        }

        if self.operands.len() == 1 {
            if let Some(only) = self.operands.pop() {
                return Simplified::Residual(only);
            }
        }
        Simplified::Residual(if self.conjunction {
            LogicalExp::And(self.operands)
        } else {
            LogicalExp::Or(self.operands)
        })
    }
}

/// Unknown values are left to be decided later.
fn decided<T: Truth>(value: T, residual: impl FnOnce() -> LogicalExp) -> Simplified<T, LogicalExp> {
    if value.is_unknown() {
        Simplified::Residual(residual())
    } else {
        Simplified::Value(value)
    }
}

impl LogicalExp {
    /// Conjunction, splicing in the operands of nested conjunctions.
    pub fn and(operands: Vec<Self>) -> Self {
        let mut res = Vec::with_capacity(operands.len());
        for o in operands {
            match o {
                Self::And(inner) => res.extend(inner),
                o => res.push(o),
            }
        }
        Self::And(res)
    }

    /// Disjunction, splicing in the operands of nested disjunctions.
    pub fn or(operands: Vec<Self>) -> Self {
        let mut res = Vec::with_capacity(operands.len());
        for o in operands {
            match o {
                Self::Or(inner) => res.extend(inner),
                o => res.push(o),
            }
        }
        Self::Or(res)
    }

    pub fn not(exp: Self) -> Self {
        Self::Not(Box::new(exp))
    }

    pub fn imply(condition: Self, consequence: Self) -> Self {
        Self::Imply(Box::new(condition), Box::new(consequence))
    }

    pub fn exists(variables: Vec<Variable>, body: Self) -> Self {
        Self::Exists(variables, Box::new(body))
    }

    pub fn forall(variables: Vec<Variable>, body: Self) -> Self {
        Self::ForAll(variables, Box::new(body))
    }

    pub fn compare(op: ComparisonOp, lhs: NumericExp, rhs: NumericExp) -> Self {
        Self::Compare(op, lhs, rhs)
    }

    pub fn evaluate<W: World>(&self, world: &W, bindings: &Bindings) -> EvalResult<W::Truth> {
        match self {
            Self::True => Ok(W::Truth::TRUE),
            Self::False => Ok(W::Truth::FALSE),
            Self::Atom(app) => Ok(match app.evaluate_arguments(world, bindings)? {
                Grounding::Ground { index, .. } => world.fact(app.offset() + index),
                Grounding::Undefined => W::Truth::FALSE,
                Grounding::Unknown => W::Truth::UNKNOWN,
            }),
            Self::Defined(app) => defined::evaluate_predicate(app, world, bindings),
            Self::Not(e) => Ok(!e.evaluate(world, bindings)?),
            Self::And(operands) => {
                let mut res = W::Truth::TRUE;
                for o in operands {
                    res = res & o.evaluate(world, bindings)?;
                    if res.is_false() {
                        break;
                    }
                }
                Ok(res)
            }
            Self::Or(operands) => {
                let mut res = W::Truth::FALSE;
                for o in operands {
                    res = res | o.evaluate(world, bindings)?;
                    if res.is_true() {
                        break;
                    }
                }
                Ok(res)
            }
            Self::Imply(condition, consequence) => {
                let condition = condition.evaluate(world, bindings)?;
                if condition.is_false() {
                    return Ok(W::Truth::TRUE);
                }
                Ok(!condition | consequence.evaluate(world, bindings)?)
            }
            Self::Exists(variables, body) => {
                let mut res = W::Truth::FALSE;
                for b in assignments(variables, bindings) {
                    res = res | body.evaluate(world, &b)?;
                    if res.is_true() {
                        break;
                    }
                }
                Ok(res)
            }
            Self::ForAll(variables, body) => {
                let mut res = W::Truth::TRUE;
                for b in assignments(variables, bindings) {
                    res = res & body.evaluate(world, &b)?;
                    if res.is_false() {
                        break;
                    }
                }
                Ok(res)
            }
            Self::Compare(op, lhs, rhs) => Ok(W::Number::compare(
                *op,
                lhs.evaluate(world, bindings)?,
                rhs.evaluate(world, bindings)?,
            )),
            Self::Equal(lhs, rhs) => {
                let lhs = lhs.evaluate(world, bindings)?;
                Ok(lhs.equals(&rhs.evaluate(world, bindings)?))
            }
        }
    }

    /// Evaluates operands only until the outcome is decided.
    ///
    /// Conjunctions stop at the first operand that is not true,
    /// disjunctions at the first one that is true or Unknown.
    /// Operands after that are never evaluated.
    pub fn evaluate_short_circuit<W: World>(
        &self,
        world: &W,
        bindings: &Bindings,
    ) -> EvalResult<ShortCircuit<W::Truth>> {
        fn stops_disjunction<T: Truth>(v: T) -> bool {
            v.is_true() || v.is_unknown()
        }

        match self {
            Self::And(operands) => {
                for o in operands {
                    let v = o.evaluate_short_circuit(world, bindings)?.value();
                    if !v.is_true() {
                        return Ok(ShortCircuit(v));
                    }
                }
                Ok(ShortCircuit(W::Truth::TRUE))
            }
            Self::Or(operands) => {
                let mut res = W::Truth::FALSE;
                for o in operands {
                    let v = o.evaluate_short_circuit(world, bindings)?.value();
                    if stops_disjunction(v) {
                        return Ok(ShortCircuit(v));
                    }
                    res = res | v;
                }
                Ok(ShortCircuit(res))
            }
            Self::Imply(condition, consequence) => {
                let negated = !condition.evaluate_short_circuit(world, bindings)?.value();
                if stops_disjunction(negated) {
                    return Ok(ShortCircuit(negated));
                }
                let v = consequence.evaluate_short_circuit(world, bindings)?.value();
                Ok(ShortCircuit(if stops_disjunction(v) { v } else { negated | v }))
            }
            Self::Exists(variables, body) => {
                let mut res = W::Truth::FALSE;
                for b in assignments(variables, bindings) {
                    let v = body.evaluate_short_circuit(world, &b)?.value();
                    if stops_disjunction(v) {
                        return Ok(ShortCircuit(v));
                    }
                    res = res | v;
                }
                Ok(ShortCircuit(res))
            }
            Self::ForAll(variables, body) => {
                for b in assignments(variables, bindings) {
                    let v = body.evaluate_short_circuit(world, &b)?.value();
                    if !v.is_true() {
                        return Ok(ShortCircuit(v));
                    }
                }
                Ok(ShortCircuit(W::Truth::TRUE))
            }
            // Negation needs the exact value of its operand
            _ => self.evaluate(world, bindings).map(ShortCircuit),
        }
    }

    /// Partial evaluation.
    ///
    /// Free variables and Unknown facts or fluents are left in the residual,
    /// everything else is replaced by its value. Quantifiers are expanded
    /// over the domains of their variables.
    pub fn simplify<W: World>(
        &self,
        world: &W,
        bindings: &Bindings,
    ) -> EvalResult<Simplified<W::Truth, Self>> {
        match self {
            Self::True => Ok(Simplified::Value(W::Truth::TRUE)),
            Self::False => Ok(Simplified::Value(W::Truth::FALSE)),
            Self::Atom(app) => Ok(match app.simplify_arguments(world, bindings)? {
                SimplifiedArguments::Undefined => Simplified::Value(W::Truth::FALSE),
                SimplifiedArguments::Partial(app) => Simplified::Residual(Self::Atom(app)),
                SimplifiedArguments::Ground { index, arguments } => {
                    decided(world.fact(app.offset() + index), || {
                        Self::Atom(Application::ground(app.signature(), &arguments))
                    })
                }
            }),
            Self::Defined(app) => Ok(match app.simplify_arguments(world, bindings)? {
                SimplifiedArguments::Undefined => Simplified::Value(W::Truth::FALSE),
                SimplifiedArguments::Partial(app) => Simplified::Residual(Self::Defined(app)),
                SimplifiedArguments::Ground { arguments, .. } => {
                    let ground = Self::Defined(Application::ground(app.signature(), &arguments));
                    decided(ground.evaluate(world, bindings)?, || ground)
                }
            }),
            Self::Not(e) => Ok(match e.simplify(world, bindings)? {
                Simplified::Value(v) => Simplified::Value(!v),
                Simplified::Residual(r) => Simplified::Residual(Self::not(r)),
            }),
            Self::And(operands) | Self::Or(operands) => {
                let mut junction = Junction::new(matches!(self, Self::And(_)));
                for o in operands {
                    if junction.push(o.simplify(world, bindings)?, || o.apply(bindings)) {
                        break;
                    }
                }
                Ok(junction.finish())
            }
            Self::Imply(condition, consequence) => {
                let lhs = condition.simplify(world, bindings)?;
                if lhs.value().is_some_and(|v| v.is_false()) {
                    return Ok(Simplified::Value(W::Truth::TRUE));
                }
                let rhs = consequence.simplify(world, bindings)?;
                let restore = |operand: Simplified<W::Truth, Self>, original: &Self| match operand {
                    Simplified::Value(_) => original.apply(bindings),
                    Simplified::Residual(r) => r,
                };
                Ok(match (lhs, rhs) {
                    (_, Simplified::Value(v)) if v.is_true() => Simplified::Value(v),
                    (Simplified::Value(c), Simplified::Value(e)) => Simplified::Value(!c | e),
                    (Simplified::Value(c), Simplified::Residual(e)) if c.is_true() => {
                        Simplified::Residual(e)
                    }
                    (Simplified::Residual(c), Simplified::Value(e)) if e.is_false() => {
                        Simplified::Residual(Self::not(c))
                    }
                    (c, e) => Simplified::Residual(Self::imply(
                        restore(c, condition),
                        restore(e, consequence),
                    )),
                })
            }
            Self::Exists(variables, body) | Self::ForAll(variables, body) => {
                let mut junction = Junction::new(matches!(self, Self::ForAll(..)));
                for b in assignments(variables, bindings) {
                    if junction.push(body.simplify(world, &b)?, || body.apply(&b)) {
                        break;
                    }
                }
                Ok(junction.finish())
            }
            Self::Compare(op, lhs, rhs) => {
                match (lhs.simplify(world, bindings)?, rhs.simplify(world, bindings)?) {
                    (Simplified::Value(l), Simplified::Value(r)) => {
                        let v = W::Number::compare(*op, l, r);
                        Ok(decided(v, || self.apply(bindings)))
                    }
                    (l, r) => Ok(match (numeric_operand(l), numeric_operand(r)) {
                        (Some(l), Some(r)) => Simplified::Residual(Self::Compare(*op, l, r)),
                        // Undefined wins over anything left undecided
                        _ => Simplified::Value(W::Truth::UNDEFINED),
                    }),
                }
            }
            Self::Equal(lhs, rhs) => {
                match (lhs.simplify(world, bindings)?, rhs.simplify(world, bindings)?) {
                    (Simplified::Value(l), Simplified::Value(r)) => {
                        Ok(decided(l.equals(&r), || self.apply(bindings)))
                    }
                    (l, r) => Ok(match (object_operand(l), object_operand(r)) {
                        (Some(l), Some(r)) => Simplified::Residual(Self::Equal(l, r)),
                        _ => Simplified::Value(W::Truth::UNDEFINED),
                    }),
                }
            }
        }
    }

    /// Substitutes bound variables.
    ///
    /// Variables of inner quantifiers shadow the bindings.
    pub fn apply(&self, bindings: &Bindings) -> Self {
        match self {
            Self::True | Self::False => self.clone(),
            Self::Atom(app) => Self::Atom(app.apply(bindings)),
            Self::Defined(app) => Self::Defined(app.apply(bindings)),
            Self::Not(e) => Self::not(e.apply(bindings)),
            Self::And(operands) => Self::And(operands.iter().map(|o| o.apply(bindings)).collect()),
            Self::Or(operands) => Self::Or(operands.iter().map(|o| o.apply(bindings)).collect()),
            Self::Imply(c, e) => Self::imply(c.apply(bindings), e.apply(bindings)),
            Self::Exists(variables, body) => {
                Self::exists(variables.clone(), body.apply(&bindings.without(variables)))
            }
            Self::ForAll(variables, body) => {
                Self::forall(variables.clone(), body.apply(&bindings.without(variables)))
            }
            Self::Compare(op, l, r) => Self::Compare(*op, l.apply(bindings), r.apply(bindings)),
            Self::Equal(l, r) => Self::Equal(l.apply(bindings), r.apply(bindings)),
        }
    }

    /// Renames every variable through `images`.
    pub fn standardize(&self, images: &mut Images) -> Self {
        match self {
            Self::True | Self::False => self.clone(),
            Self::Atom(app) => Self::Atom(app.standardize(images)),
            Self::Defined(app) => Self::Defined(app.standardize(images)),
            Self::Not(e) => Self::not(e.standardize(images)),
            Self::And(operands) => {
                Self::And(operands.iter().map(|o| o.standardize(images)).collect())
            }
            Self::Or(operands) => {
                Self::Or(operands.iter().map(|o| o.standardize(images)).collect())
            }
            Self::Imply(c, e) => Self::imply(c.standardize(images), e.standardize(images)),
            Self::Exists(variables, body) => {
                Self::exists(images.images(variables), body.standardize(images))
            }
            Self::ForAll(variables, body) => {
                Self::forall(images.images(variables), body.standardize(images))
            }
            Self::Compare(op, l, r) => {
                Self::Compare(*op, l.standardize(images), r.standardize(images))
            }
            Self::Equal(l, r) => Self::Equal(l.standardize(images), r.standardize(images)),
        }
    }
}

fn numeric_operand<N: Number>(operand: Simplified<N, NumericExp>) -> Option<NumericExp> {
    match operand {
        Simplified::Value(v) => v.value().map(NumericExp::number),
        Simplified::Residual(e) => Some(e),
    }
}

fn object_operand<O: ObjectValue>(operand: Simplified<O, ObjectExp>) -> Option<ObjectExp> {
    match operand {
        Simplified::Value(v) => v.constant().map(ObjectExp::Constant),
        Simplified::Residual(e) => Some(e),
    }
}

impl Display for LogicalExp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Atom(app) | Self::Defined(app) => write!(f, "{}", app),
            Self::Not(e) => write!(f, "(not {})", e),
            Self::And(operands) => write!(f, "(and {})", operands.iter().join(" ")),
            Self::Or(operands) => write!(f, "(or {})", operands.iter().join(" ")),
            Self::Imply(c, e) => write!(f, "(imply {} {})", c, e),
            Self::Exists(variables, body) => write!(
                f,
                "(exists ({}) {})",
                variables.iter().map(Variable::typed).join(" "),
                body
            ),
            Self::ForAll(variables, body) => write!(
                f,
                "(forall ({}) {})",
                variables.iter().map(Variable::typed).join(" "),
                body
            ),
            Self::Compare(op, l, r) => write!(f, "({} {} {})", op.symbol(), l, r),
            Self::Equal(l, r) => write!(f, "(= {} {})", l, r),
        }
    }
}
