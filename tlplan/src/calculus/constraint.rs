use alloc::{boxed::Box, vec::Vec};
use core::fmt::Display;
use getset::{CopyGetters, Getters};
use itertools::Itertools;
use log::trace;

use crate::{
    calculus::{
        binding::{assignments, Bindings, Images, Variable},
        logical::LogicalExp,
        Simplified,
    },
    error::EvalResult,
    fuzzy::{Bool, Real},
    state::DurativeWorld,
};

/// Absolute time interval, both ends included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Window {
    pub start: Real,
    pub end: Real,
}

impl Window {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start: Real(start),
            end: Real(end),
        }
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Temporal constraint over the sequence of states a plan visits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintExp {
    Literal(Bool),
    /// Formula checked in the current state only.
    Atomic(LogicalExp),
    Not(Box<ConstraintExp>),
    And(Vec<ConstraintExp>),
    Or(Vec<ConstraintExp>),
    Imply(Box<ConstraintExp>, Box<ConstraintExp>),
    IfThenElse(Box<ConstraintExp>, Box<ConstraintExp>, Box<ConstraintExp>),
    /// Exactly one operand holds.
    ///
    /// Unlike the textbook n-ary xor, three true operands do not
    /// satisfy it.
    XorUnique(Vec<ConstraintExp>),
    ForAll(Vec<Variable>, Box<ConstraintExp>),
    Exists(Vec<Variable>, Box<ConstraintExp>),
    Next(Box<ConstraintExp>),
    Always(Box<ConstraintExp>),
    Eventually(Box<ConstraintExp>),
    Until(Box<ConstraintExp>, Box<ConstraintExp>),
    AlwaysWithin(Window, Box<ConstraintExp>),
    EventuallyWithin(Window, Box<ConstraintExp>),
}

/// A constraint advanced through one state.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct Progression {
    #[getset(get = "pub")]
    result: Simplified<Bool, ConstraintExp>,
    /// Time by which the residual has to be progressed again,
    /// infinite when progressing it at the next state is enough.
    #[getset(get_copy = "pub")]
    next_timestamp: f64,
}

impl Progression {
    fn value(value: Bool) -> Self {
        Self {
            result: Simplified::Value(value),
            next_timestamp: f64::INFINITY,
        }
    }

    fn residual(exp: ConstraintExp, next_timestamp: f64) -> Self {
        Self {
            result: Simplified::Residual(exp),
            next_timestamp,
        }
    }

    fn negated(self) -> Self {
        match self.result {
            Simplified::Value(v) => Self::value(!v),
            Simplified::Residual(r) => Self::residual(ConstraintExp::not(r), self.next_timestamp),
        }
    }

    /// What is left to check in the following states.
    pub fn into_constraint(self) -> ConstraintExp {
        match self.result {
            Simplified::Value(v) => ConstraintExp::Literal(v),
            Simplified::Residual(r) => r,
        }
    }
}

/// Collects the progressed operands of a conjunction or disjunction.
struct Junction {
    conjunction: bool,
    absorbed: bool,
    undefined: bool,
    operands: Vec<ConstraintExp>,
    next_timestamp: f64,
}

impl Junction {
    fn new(conjunction: bool) -> Self {
        Self {
            conjunction,
            absorbed: false,
            undefined: false,
            operands: Vec::new(),
            next_timestamp: f64::INFINITY,
        }
    }

    fn absorbing(&self) -> Bool {
        if self.conjunction {
            Bool::False
        } else {
            Bool::True
        }
    }

    /// Adds an operand, returning whether the outcome is decided.
    fn push(&mut self, operand: Progression) -> bool {
        match operand.result {
            Simplified::Value(v) if v == self.absorbing() => self.absorbed = true,
            Simplified::Value(Bool::Undefined) => self.undefined = true,
            Simplified::Value(_) => {}
            Simplified::Residual(r) => {
                self.next_timestamp = self.next_timestamp.min(operand.next_timestamp);
                self.operands.push(r);
            }
        }
        self.absorbed
    }

    fn finish(mut self) -> Progression {
        if self.absorbed {
            return Progression::value(self.absorbing());
        }
        // A residual may still make a disjunction true
        if self.undefined && (self.conjunction || self.operands.is_empty()) {
            return Progression::value(Bool::Undefined);
        }

        let next = self.next_timestamp;
        match self.operands.len() {
            0 => Progression::value(!self.absorbing()),
            1 => match self.operands.pop() {
                Some(only) => Progression::residual(only, next),
                None => Progression::value(!self.absorbing()),
            },
            _ if self.conjunction => Progression::residual(ConstraintExp::And(self.operands), next),
            _ => Progression::residual(ConstraintExp::Or(self.operands), next),
        }
    }
}

impl ConstraintExp {
    pub fn atomic(exp: LogicalExp) -> Self {
        Self::Atomic(exp)
    }

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

    pub fn if_then_else(condition: Self, then: Self, otherwise: Self) -> Self {
        Self::IfThenElse(Box::new(condition), Box::new(then), Box::new(otherwise))
    }

    pub fn forall(variables: Vec<Variable>, body: Self) -> Self {
        Self::ForAll(variables, Box::new(body))
    }

    pub fn exists(variables: Vec<Variable>, body: Self) -> Self {
        Self::Exists(variables, Box::new(body))
    }

    pub fn next(exp: Self) -> Self {
        Self::Next(Box::new(exp))
    }

    pub fn always(exp: Self) -> Self {
        Self::Always(Box::new(exp))
    }

    pub fn eventually(exp: Self) -> Self {
        Self::Eventually(Box::new(exp))
    }

    pub fn until(hold: Self, goal: Self) -> Self {
        Self::Until(Box::new(hold), Box::new(goal))
    }

    pub fn always_within(window: Window, exp: Self) -> Self {
        Self::AlwaysWithin(window, Box::new(exp))
    }

    pub fn eventually_within(window: Window, exp: Self) -> Self {
        Self::EventuallyWithin(window, Box::new(exp))
    }

    /// Advances the constraint through the current state of `world`.
    ///
    /// The result is either the final truth value, or the constraint
    /// the rest of the plan has to satisfy. Residuals have the bindings
    /// applied, so they can be progressed without them.
    pub fn progress<W: DurativeWorld>(
        &self,
        world: &W,
        bindings: &Bindings,
    ) -> EvalResult<Progression> {
        match self {
            Self::Literal(v) => Ok(Progression::value(*v)),
            Self::Atomic(exp) => Ok(match exp.simplify(world, bindings)? {
                Simplified::Value(v) => Progression::value(v),
                Simplified::Residual(r) => Progression::residual(Self::Atomic(r), f64::INFINITY),
            }),
            Self::Not(exp) => Ok(exp.progress(world, bindings)?.negated()),
            Self::And(operands) | Self::Or(operands) => {
                let mut junction = Junction::new(matches!(self, Self::And(_)));
                for o in operands {
                    if junction.push(o.progress(world, bindings)?) {
                        break;
                    }
                }
                Ok(junction.finish())
            }
            Self::Imply(condition, consequence) => {
                let mut junction = Junction::new(false);
                if !junction.push(condition.progress(world, bindings)?.negated()) {
                    junction.push(consequence.progress(world, bindings)?);
                }
                Ok(junction.finish())
            }
            Self::IfThenElse(condition, then, otherwise) => {
                let condition = condition.progress(world, bindings)?;
                match condition.result {
                    Simplified::Value(Bool::True) => then.progress(world, bindings),
                    Simplified::Value(Bool::False) => otherwise.progress(world, bindings),
                    Simplified::Value(Bool::Undefined) => Ok(Progression::value(Bool::Undefined)),
                    Simplified::Residual(r) => {
                        let then = then.progress(world, bindings)?;
                        let otherwise = otherwise.progress(world, bindings)?;
                        let next = then.next_timestamp.min(otherwise.next_timestamp);
                        let exp = Self::if_then_else(
                            r,
                            then.into_constraint(),
                            otherwise.into_constraint(),
                        );
                        Ok(Progression::residual(exp, next))
                    }
                }
            }
            Self::XorUnique(operands) => {
                let mut found = false;
                let mut undefined = false;
                let mut residuals = Vec::new();
                let mut next = f64::INFINITY;
                for o in operands {
                    let p = o.progress(world, bindings)?;
                    match p.result {
                        Simplified::Value(Bool::True) if found => {
                            return Ok(Progression::value(Bool::False));
                        }
                        Simplified::Value(Bool::True) => found = true,
                        Simplified::Value(Bool::False) => {}
                        Simplified::Value(Bool::Undefined) => undefined = true,
                        Simplified::Residual(r) => {
                            next = next.min(p.next_timestamp);
                            residuals.push(r);
                        }
                    }
                }

                Ok(if undefined {
                    Progression::value(Bool::Undefined)
                } else if residuals.is_empty() {
                    Progression::value(found.into())
                } else if found {
                    // Every other operand has to be false
                    Progression::residual(Self::not(Self::Or(residuals)), next)
                } else if residuals.len() == 1 {
                    let only = residuals.remove(0);
                    Progression::residual(only, next)
                } else {
                    Progression::residual(Self::XorUnique(residuals), next)
                })
            }
            Self::ForAll(variables, body) | Self::Exists(variables, body) => {
                let mut junction = Junction::new(matches!(self, Self::ForAll(..)));
                for b in assignments(variables, bindings) {
                    if junction.push(body.progress(world, &b)?) {
                        break;
                    }
                }
                Ok(junction.finish())
            }
            Self::Next(exp) => Ok(Progression::residual(exp.apply(bindings), f64::INFINITY)),
            Self::Always(exp) => {
                let mut junction = Junction::new(true);
                if !junction.push(exp.progress(world, bindings)?) {
                    junction.push(Progression::residual(self.apply(bindings), f64::INFINITY));
                }
                Ok(junction.finish())
            }
            Self::Eventually(exp) => {
                let mut junction = Junction::new(false);
                if !junction.push(exp.progress(world, bindings)?) {
                    junction.push(Progression::residual(self.apply(bindings), f64::INFINITY));
                }
                Ok(junction.finish())
            }
            Self::Until(hold, goal) => {
                let mut junction = Junction::new(false);
                if junction.push(goal.progress(world, bindings)?) {
                    return Ok(junction.finish());
                }
                let mut holding = Junction::new(true);
                if !holding.push(hold.progress(world, bindings)?) {
                    holding.push(Progression::residual(self.apply(bindings), f64::INFINITY));
                }
                junction.push(holding.finish());
                Ok(junction.finish())
            }
            Self::AlwaysWithin(window, exp) | Self::EventuallyWithin(window, exp) => {
                let always = matches!(self, Self::AlwaysWithin(..));
                let now = world.timestamp();
                if now < window.start.0 {
                    trace!("{} waits for its window at {}", self, now);
                    return Ok(Progression::residual(self.apply(bindings), window.start.0));
                }
                if now > window.end.0 {
                    return Ok(Progression::value(always.into()));
                }

                let mut junction = Junction::new(always);
                if !junction.push(exp.progress(world, bindings)?) {
                    let next = if always { f64::INFINITY } else { window.end.0 };
                    junction.push(Progression::residual(self.apply(bindings), next));
                }
                Ok(junction.finish())
            }
        }
    }

    /// Truth value in a world that stays as it is from now on,
    /// used to check what is left of a constraint when the plan ends.
    pub fn evaluate_idle<W: DurativeWorld>(
        &self,
        world: &W,
        bindings: &Bindings,
    ) -> EvalResult<Bool> {
        match self {
            Self::Literal(v) => Ok(*v),
            Self::Atomic(exp) => exp.evaluate(world, bindings),
            Self::Not(exp) => Ok(!exp.evaluate_idle(world, bindings)?),
            Self::And(operands) => {
                let mut res = Bool::True;
                for o in operands {
                    res = res & o.evaluate_idle(world, bindings)?;
                    if res == Bool::False {
                        break;
                    }
                }
                Ok(res)
            }
            Self::Or(operands) => {
                let mut res = Bool::False;
                for o in operands {
                    res = res | o.evaluate_idle(world, bindings)?;
                    if res == Bool::True {
                        break;
                    }
                }
                Ok(res)
            }
            Self::Imply(condition, consequence) => {
                let condition = condition.evaluate_idle(world, bindings)?;
                if condition == Bool::False {
                    return Ok(Bool::True);
                }
                Ok(!condition | consequence.evaluate_idle(world, bindings)?)
            }
            Self::IfThenElse(condition, then, otherwise) => {
                match condition.evaluate_idle(world, bindings)? {
                    Bool::True => then.evaluate_idle(world, bindings),
                    Bool::False => otherwise.evaluate_idle(world, bindings),
                    Bool::Undefined => Ok(Bool::Undefined),
                }
            }
            Self::XorUnique(operands) => {
                let mut found = false;
                let mut undefined = false;
                for o in operands {
                    match o.evaluate_idle(world, bindings)? {
                        Bool::True if found => return Ok(Bool::False),
                        Bool::True => found = true,
                        Bool::False => {}
                        Bool::Undefined => undefined = true,
                    }
                }
                Ok(if undefined { Bool::Undefined } else { found.into() })
            }
            Self::ForAll(variables, body) => {
                let mut res = Bool::True;
                for b in assignments(variables, bindings) {
                    res = res & body.evaluate_idle(world, &b)?;
                    if res == Bool::False {
                        break;
                    }
                }
                Ok(res)
            }
            Self::Exists(variables, body) => {
                let mut res = Bool::False;
                for b in assignments(variables, bindings) {
                    res = res | body.evaluate_idle(world, &b)?;
                    if res == Bool::True {
                        break;
                    }
                }
                Ok(res)
            }
            Self::Next(exp) | Self::Always(exp) | Self::Eventually(exp) => {
                exp.evaluate_idle(world, bindings)
            }
            Self::Until(_, goal) => goal.evaluate_idle(world, bindings),
            Self::AlwaysWithin(window, exp) | Self::EventuallyWithin(window, exp) => {
                if world.timestamp() > window.end.0 {
                    Ok(matches!(self, Self::AlwaysWithin(..)).into())
                } else {
                    exp.evaluate_idle(world, bindings)
                }
            }
        }
    }

    pub fn apply(&self, bindings: &Bindings) -> Self {
        match self {
            Self::Literal(_) => self.clone(),
            Self::Atomic(exp) => Self::Atomic(exp.apply(bindings)),
            Self::Not(exp) => Self::not(exp.apply(bindings)),
            Self::And(operands) => Self::And(operands.iter().map(|o| o.apply(bindings)).collect()),
            Self::Or(operands) => Self::Or(operands.iter().map(|o| o.apply(bindings)).collect()),
            Self::Imply(c, e) => Self::imply(c.apply(bindings), e.apply(bindings)),
            Self::IfThenElse(c, t, e) => {
                Self::if_then_else(c.apply(bindings), t.apply(bindings), e.apply(bindings))
            }
            Self::XorUnique(operands) => {
                Self::XorUnique(operands.iter().map(|o| o.apply(bindings)).collect())
            }
            Self::ForAll(variables, body) => {
                Self::forall(variables.clone(), body.apply(&bindings.without(variables)))
            }
            Self::Exists(variables, body) => {
                Self::exists(variables.clone(), body.apply(&bindings.without(variables)))
            }
            Self::Next(exp) => Self::next(exp.apply(bindings)),
            Self::Always(exp) => Self::always(exp.apply(bindings)),
            Self::Eventually(exp) => Self::eventually(exp.apply(bindings)),
            Self::Until(h, g) => Self::until(h.apply(bindings), g.apply(bindings)),
            Self::AlwaysWithin(w, exp) => Self::always_within(*w, exp.apply(bindings)),
            Self::EventuallyWithin(w, exp) => Self::eventually_within(*w, exp.apply(bindings)),
        }
    }

    pub fn standardize(&self, images: &mut Images) -> Self {
        match self {
            Self::Literal(_) => self.clone(),
            Self::Atomic(exp) => Self::Atomic(exp.standardize(images)),
            Self::Not(exp) => Self::not(exp.standardize(images)),
            Self::And(operands) => {
                Self::And(operands.iter().map(|o| o.standardize(images)).collect())
            }
            Self::Or(operands) => {
                Self::Or(operands.iter().map(|o| o.standardize(images)).collect())
            }
            Self::Imply(c, e) => Self::imply(c.standardize(images), e.standardize(images)),
            Self::IfThenElse(c, t, e) => Self::if_then_else(
                c.standardize(images),
                t.standardize(images),
                e.standardize(images),
            ),
            Self::XorUnique(operands) => {
                Self::XorUnique(operands.iter().map(|o| o.standardize(images)).collect())
            }
            Self::ForAll(variables, body) => {
                Self::forall(images.images(variables), body.standardize(images))
            }
            Self::Exists(variables, body) => {
                Self::exists(images.images(variables), body.standardize(images))
            }
            Self::Next(exp) => Self::next(exp.standardize(images)),
            Self::Always(exp) => Self::always(exp.standardize(images)),
            Self::Eventually(exp) => Self::eventually(exp.standardize(images)),
            Self::Until(h, g) => Self::until(h.standardize(images), g.standardize(images)),
            Self::AlwaysWithin(w, exp) => Self::always_within(*w, exp.standardize(images)),
            Self::EventuallyWithin(w, exp) => {
                Self::eventually_within(*w, exp.standardize(images))
            }
        }
    }
}

impl Display for ConstraintExp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{}", v),
            Self::Atomic(exp) => write!(f, "{}", exp),
            Self::Not(exp) => write!(f, "(not {})", exp),
            Self::And(operands) => write!(f, "(and {})", operands.iter().join(" ")),
            Self::Or(operands) => write!(f, "(or {})", operands.iter().join(" ")),
            Self::Imply(c, e) => write!(f, "(imply {} {})", c, e),
            Self::IfThenElse(c, t, e) => write!(f, "(if-then-else {} {} {})", c, t, e),
            Self::XorUnique(operands) => write!(f, "(xor {})", operands.iter().join(" ")),
            Self::ForAll(variables, body) => write!(
                f,
                "(forall ({}) {})",
                variables.iter().map(Variable::typed).join(" "),
                body
            ),
            Self::Exists(variables, body) => write!(
                f,
                "(exists ({}) {})",
                variables.iter().map(Variable::typed).join(" "),
                body
            ),
            Self::Next(exp) => write!(f, "(next {})", exp),
            Self::Always(exp) => write!(f, "(always {})", exp),
            Self::Eventually(exp) => write!(f, "(eventually {})", exp),
            Self::Until(h, g) => write!(f, "(until {} {})", h, g),
            Self::AlwaysWithin(w, exp) => write!(f, "(t-always {} {})", w, exp),
            Self::EventuallyWithin(w, exp) => write!(f, "(t-eventually {} {})", w, exp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::UpdateWorld, testing::Blocks};

    fn literal(v: bool) -> ConstraintExp {
        ConstraintExp::Literal(v.into())
    }

    #[test]
    fn test_xor_is_exactly_one() {
        let w = Blocks::new();
        let state = w.state();
        let none = Bindings::new();
        let xor = |operands| ConstraintExp::XorUnique(operands).progress(&state, &none).unwrap();

        let one = xor(vec![literal(true), literal(false), literal(false)]);
        assert_eq!(one.result(), &Simplified::Value(Bool::True));
        let two = xor(vec![literal(true), literal(true), literal(false)]);
        assert_eq!(two.result(), &Simplified::Value(Bool::False));
        let three = xor(vec![literal(true), literal(true), literal(true)]);
        assert_eq!(three.result(), &Simplified::Value(Bool::False));
        let none_true = xor(vec![literal(false), literal(false)]);
        assert_eq!(none_true.result(), &Simplified::Value(Bool::False));
    }

    #[test]
    fn test_xor_with_unresolved_operands() {
        let w = Blocks::new();
        let state = w.state();
        let none = Bindings::new();
        let open = ConstraintExp::atomic(w.clear(&w.x));
        let other = ConstraintExp::atomic(w.on(&w.x, &w.y));

        let res = ConstraintExp::XorUnique(vec![open.clone(), literal(false)])
            .progress(&state, &none)
            .unwrap();
        assert_eq!(res.result(), &Simplified::Residual(open.clone()));

        let res = ConstraintExp::XorUnique(vec![open.clone(), literal(true)])
            .progress(&state, &none)
            .unwrap();
        assert_eq!(
            res.result(),
            &Simplified::Residual(ConstraintExp::not(ConstraintExp::Or(vec![open.clone()])))
        );

        let res = ConstraintExp::XorUnique(vec![open.clone(), other.clone(), literal(false)])
            .progress(&state, &none)
            .unwrap();
        assert_eq!(
            res.result(),
            &Simplified::Residual(ConstraintExp::XorUnique(vec![open, other]))
        );
    }

    #[test]
    fn test_always_and_eventually() {
        let w = Blocks::new();
        let mut state = w.state();
        state.set_fact(Blocks::id(&w.clear, &[&w.a]));
        let none = Bindings::new();
        let clear_a = ConstraintExp::atomic(w.clear(&w.a));
        let clear_b = ConstraintExp::atomic(w.clear(&w.b));

        let always = ConstraintExp::always(clear_a.clone());
        let res = always.progress(&state, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Residual(always.clone()));
        assert_eq!(res.next_timestamp(), f64::INFINITY);

        let always = ConstraintExp::always(clear_b.clone());
        let res = always.progress(&state, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Value(Bool::False));

        let eventually = ConstraintExp::eventually(clear_b.clone());
        let res = eventually.progress(&state, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Residual(eventually.clone()));
        assert_eq!(eventually.evaluate_idle(&state, &none), Ok(Bool::False));

        let eventually = ConstraintExp::eventually(clear_a.clone());
        assert_eq!(
            eventually.progress(&state, &none).unwrap().result(),
            &Simplified::Value(Bool::True)
        );

        let next = ConstraintExp::next(clear_b.clone());
        assert_eq!(
            next.progress(&state, &none).unwrap().result(),
            &Simplified::Residual(clear_b)
        );
    }

    #[test]
    fn test_until() {
        let w = Blocks::new();
        let mut state = w.state();
        state.set_fact(Blocks::id(&w.clear, &[&w.a]));
        let none = Bindings::new();
        let clear = |c| ConstraintExp::atomic(w.clear(c));

        let until = ConstraintExp::until(clear(&w.a), clear(&w.b));
        let res = until.progress(&state, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Residual(until.clone()));
        assert_eq!(until.evaluate_idle(&state, &none), Ok(Bool::False));

        let until = ConstraintExp::until(clear(&w.b), clear(&w.a));
        let res = until.progress(&state, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Value(Bool::True));

        let until = ConstraintExp::until(clear(&w.c), clear(&w.b));
        let res = until.progress(&state, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Value(Bool::False));
    }

    #[test]
    fn test_junctions_short_circuit() {
        let w = Blocks::new();
        let state = w.state();
        let none = Bindings::new();
        let open = ConstraintExp::atomic(w.clear(&w.x));
        let undefined = ConstraintExp::Literal(Bool::Undefined);

        let and = ConstraintExp::and(vec![open.clone(), literal(false)]);
        assert_eq!(
            and.progress(&state, &none).unwrap().result(),
            &Simplified::Value(Bool::False)
        );
        let and = ConstraintExp::and(vec![open.clone(), undefined.clone()]);
        assert_eq!(
            and.progress(&state, &none).unwrap().result(),
            &Simplified::Value(Bool::Undefined)
        );
        let or = ConstraintExp::or(vec![open.clone(), undefined.clone()]);
        assert_eq!(
            or.progress(&state, &none).unwrap().result(),
            &Simplified::Residual(open.clone())
        );
        let imply = ConstraintExp::imply(literal(false), open.clone());
        assert_eq!(
            imply.progress(&state, &none).unwrap().result(),
            &Simplified::Value(Bool::True)
        );
        let imply = ConstraintExp::imply(open.clone(), literal(false));
        assert_eq!(
            imply.progress(&state, &none).unwrap().result(),
            &Simplified::Residual(ConstraintExp::not(open))
        );
    }

    #[test]
    fn test_if_then_else_with_residual_condition() {
        let w = Blocks::new();
        let mut state = w.state();
        state.set_fact(Blocks::id(&w.clear, &[&w.a]));
        let state = state.at(0.0);
        let none = Bindings::new();

        let condition = ConstraintExp::atomic(w.clear(&w.x));
        let then = ConstraintExp::always(ConstraintExp::atomic(w.clear(&w.a)));
        let otherwise = ConstraintExp::eventually_within(
            Window::new(5.0, 10.0),
            ConstraintExp::atomic(w.clear(&w.b)),
        );
        let ite = ConstraintExp::if_then_else(condition.clone(), then.clone(), otherwise.clone());

        let res = ite.progress(&state, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Residual(ite.clone()));
        assert_eq!(res.next_timestamp(), 5.0);

        let bound = Bindings::new().with(&w.x, &w.a);
        let res = ite.progress(&state, &bound).unwrap();
        assert_eq!(res.result(), &Simplified::Residual(then));
    }

    #[test]
    fn test_windows() {
        let w = Blocks::new();
        let none = Bindings::new();
        let clear_a = ConstraintExp::atomic(w.clear(&w.a));
        let window = Window::new(2.0, 4.0);
        let always = ConstraintExp::always_within(window, clear_a.clone());
        let eventually = ConstraintExp::eventually_within(window, clear_a.clone());

        let before = w.state().at(1.0);
        let res = always.progress(&before, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Residual(always.clone()));
        assert_eq!(res.next_timestamp(), 2.0);

        let during = w.state().at(3.0);
        let res = always.progress(&during, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Value(Bool::False));
        let res = eventually.progress(&during, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Residual(eventually.clone()));
        assert_eq!(res.next_timestamp(), 4.0);

        let after = w.state().at(5.0);
        let res = always.progress(&after, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Value(Bool::True));
        let res = eventually.progress(&after, &none).unwrap();
        assert_eq!(res.result(), &Simplified::Value(Bool::False));
        assert_eq!(eventually.evaluate_idle(&after, &none), Ok(Bool::False));

        let mut during = during;
        during.set_fact(Blocks::id(&w.clear, &[&w.a]));
        assert_eq!(eventually.evaluate_idle(&during, &none), Ok(Bool::True));
        assert_eq!(eventually.to_string(), "(t-eventually [2, 4] (clear a))");
    }

    #[test]
    fn test_quantified_constraints() {
        let w = Blocks::new();
        let mut state = w.state();
        state.set_fact(Blocks::id(&w.clear, &[&w.a]));
        let none = Bindings::new();

        let all = ConstraintExp::forall(
            vec![w.x.clone()],
            ConstraintExp::eventually(ConstraintExp::atomic(w.clear(&w.x))),
        );
        let res = all.progress(&state, &none).unwrap();
        assert_eq!(
            res.result(),
            &Simplified::Residual(ConstraintExp::And(vec![
                ConstraintExp::eventually(ConstraintExp::atomic(w.clear(&w.b))),
                ConstraintExp::eventually(ConstraintExp::atomic(w.clear(&w.c))),
            ]))
        );
    }
}
