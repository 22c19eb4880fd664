use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt::Display, marker::PhantomData};
use gazebo::dupe::Dupe;
use getset::{CopyGetters, Getters};
use itertools::Itertools;
use log::debug;

use crate::{
    calculus::{
        binding::{assignments, Bindings, Images, Variable},
        constraint::ConstraintExp,
        logical::LogicalExp,
        numeric::NumericExp,
    },
    effect::{apply_updates, Effect, Update},
    entity::{ConstantHandle, TypeSet},
    error::{BuildError, EvalResult, EvaluationError},
    fuzzy::{Number, Truth},
    sealed::Sealed,
    state::{
        context::{ActionContext, EMPTY_ACTION_CONTEXT},
        facts::FactsContainer,
        fluents::FluentsContainer,
        State, World,
    },
    util::named::Named,
    InternerSymbol,
};

/// What instantaneous and durative actions have in common.
pub trait ActionDef: Named {
    /// Higher priority actions are tried first.
    fn priority(&self) -> i32;
    fn parameters(&self) -> &[Variable];

    /// Copy with every variable renamed to a fresh one.
    ///
    /// The same source variable gets the same image everywhere
    /// in the copy.
    fn standardize(&self) -> Self
    where
        Self: Sized;

    fn name_str(&self) -> String {
        crate::resolve(self.name())
    }

    /// Checks the arguments against the parameters' typesets.
    fn ground(&self, arguments: &[ConstantHandle]) -> Result<GroundAction, BuildError> {
        let parameters = self.parameters();
        if arguments.len() != parameters.len() {
            return Err(BuildError::WrongArity {
                name: self.name_str(),
                expected: parameters.len(),
                found: arguments.len(),
            });
        }
        if let Some(position) = parameters
            .iter()
            .zip(arguments)
            .position(|(p, a)| !p.typeset().contains(a))
        {
            return Err(BuildError::TypeMismatch {
                name: self.name_str(),
                position,
            });
        }

        Ok(GroundAction {
            name: self.name(),
            arguments: arguments.to_vec(),
        })
    }

    /// Every ground instance, in the order of the parameters' domains.
    fn groundings(&self) -> Vec<GroundAction> {
        let base = Bindings::new();
        let parameters = self.parameters();
        assignments(parameters, &base)
            .map(|b| GroundAction {
                name: self.name(),
                arguments: parameters
                    .iter()
                    .filter_map(|p| b.get(p).map(Dupe::dupe))
                    .collect(),
            })
            .collect()
    }
}

/// An action with its arguments, what plans are made of.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct GroundAction {
    #[getset(get = "pub")]
    name: InternerSymbol,
    #[getset(get = "pub")]
    arguments: Vec<ConstantHandle>,
}

impl GroundAction {
    pub fn bindings(&self, action: &impl ActionDef) -> Bindings {
        Bindings::from_parameters(action.parameters(), &self.arguments)
    }
}

impl Display for GroundAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}", crate::resolve(self.name))?;
        for a in &self.arguments {
            write!(f, " {}", a)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
pub struct Action {
    name: InternerSymbol,
    priority: i32,
    parameters: Vec<Variable>,
    #[getset(get = "pub")]
    precondition: LogicalExp,
    #[getset(get = "pub")]
    effect: Effect,
}

impl Named for Action {
    fn name(&self) -> InternerSymbol {
        self.name
    }
}

impl ActionDef for Action {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn parameters(&self) -> &[Variable] {
        &self.parameters
    }

    fn standardize(&self) -> Self {
        let mut images = Images::new();
        let parameters = images.images(&self.parameters);
        Self {
            name: self.name,
            priority: self.priority,
            parameters,
            precondition: self.precondition.standardize(&mut images),
            effect: self.effect.standardize(&mut images),
        }
    }
}

impl Action {
    /// Checks the precondition, stopping at the first operand that decides it.
    pub fn is_applicable<W: World>(&self, world: &W, bindings: &Bindings) -> EvalResult<bool> {
        Ok(self
            .precondition
            .evaluate_short_circuit(world, bindings)?
            .is_true())
    }

    pub fn updates<W: World>(&self, world: &W, bindings: &Bindings) -> EvalResult<Vec<Update>> {
        let mut res = Vec::new();
        self.effect.updates(world, bindings, &mut res)?;
        Ok(res)
    }

    /// Successor of `state`, or `None` if the action is not applicable there.
    pub fn apply<F: FactsContainer, L: FluentsContainer>(
        &self,
        state: &State<F, L>,
        bindings: &Bindings,
    ) -> EvalResult<Option<State<F, L>>> {
        if !self.is_applicable(state, bindings)? {
            return Ok(None);
        }

        let updates = self.updates(state, bindings)?;
        let mut res = state.clone();
        apply_updates(&updates, &mut res);
        debug!(
            "Applied {} with {} updates",
            crate::resolve(self.name),
            updates.len()
        );
        Ok(Some(res))
    }
}

impl<F: FactsContainer, L: FluentsContainer> State<F, L> {
    /// Applies a ground instance of `action` to a copy of this state.
    pub fn successor(
        &self,
        action: &Action,
        arguments: &[ConstantHandle],
    ) -> EvalResult<Option<Self>> {
        action.apply(self, &Bindings::from_parameters(action.parameters(), arguments))
    }
}

/// An action that takes time.
///
/// Conditions are checked at its start, over its whole duration
/// and at its end. Timed conditionals are checked at the start
/// and take effect at the end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
pub struct DurativeAction {
    name: InternerSymbol,
    priority: i32,
    parameters: Vec<Variable>,
    #[getset(get = "pub")]
    duration: NumericExp,
    #[getset(get = "pub")]
    start_condition: LogicalExp,
    #[getset(get = "pub")]
    overall_condition: LogicalExp,
    #[getset(get = "pub")]
    end_condition: LogicalExp,
    #[getset(get = "pub")]
    start_effect: Effect,
    #[getset(get = "pub")]
    end_effect: Effect,
    #[getset(get = "pub")]
    continuous_effect: Effect,
    /// `(always overall-condition)`, progressed while the action runs.
    #[getset(get = "pub")]
    overall_effect: ConstraintExp,
    #[getset(get = "pub")]
    timed_conditionals: Vec<(LogicalExp, Effect)>,
}

impl Named for DurativeAction {
    fn name(&self) -> InternerSymbol {
        self.name
    }
}

impl ActionDef for DurativeAction {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn parameters(&self) -> &[Variable] {
        &self.parameters
    }

    fn standardize(&self) -> Self {
        let mut images = Images::new();
        let parameters = images.images(&self.parameters);
        Self {
            name: self.name,
            priority: self.priority,
            parameters,
            duration: self.duration.standardize(&mut images),
            start_condition: self.start_condition.standardize(&mut images),
            overall_condition: self.overall_condition.standardize(&mut images),
            end_condition: self.end_condition.standardize(&mut images),
            start_effect: self.start_effect.standardize(&mut images),
            end_effect: self.end_effect.standardize(&mut images),
            continuous_effect: self.continuous_effect.standardize(&mut images),
            overall_effect: self.overall_effect.standardize(&mut images),
            timed_conditionals: self
                .timed_conditionals
                .iter()
                .map(|(c, e)| (c.standardize(&mut images), e.standardize(&mut images)))
                .collect(),
        }
    }
}

/// A durative action that has started.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct Started {
    #[getset(get = "pub")]
    bindings: Bindings,
    #[getset(get_copy = "pub")]
    duration: f64,
    /// Timed conditionals whose condition held at the start.
    #[getset(get = "pub")]
    context: ActionContext,
}

impl DurativeAction {
    /// Value of the duration expression, which must be defined.
    pub fn evaluate_duration<W: World>(&self, world: &W, bindings: &Bindings) -> EvalResult<f64> {
        let value = self.duration.evaluate(world, bindings)?;
        match value.value() {
            Some(d) => Ok(d),
            None if value.is_unknown() => Err(EvaluationError::UnknownExpression {
                expression: self.duration.apply(bindings).to_string(),
            }),
            None => Err(EvaluationError::UndefinedExpression {
                expression: self.duration.apply(bindings).to_string(),
            }),
        }
    }

    pub fn can_start<W: World>(&self, world: &W, bindings: &Bindings) -> EvalResult<bool> {
        Ok(self
            .start_condition
            .evaluate_short_circuit(world, bindings)?
            .is_true())
    }

    /// Starts the action in `state`.
    ///
    /// Returns the state right after the start effects,
    /// or `None` if the start condition does not hold.
    pub fn start<F: FactsContainer, L: FluentsContainer>(
        &self,
        state: &State<F, L>,
        bindings: &Bindings,
    ) -> EvalResult<Option<(State<F, L>, Started)>> {
        if !self.can_start(state, bindings)? {
            return Ok(None);
        }

        let duration = self.evaluate_duration(state, bindings)?;
        let bindings = bindings.with_duration(duration);
        let mut context = EMPTY_ACTION_CONTEXT;
        for (i, (condition, _)) in self.timed_conditionals.iter().enumerate() {
            if condition.evaluate(state, &bindings)?.is_true() {
                context.set(i);
            }
        }

        let mut updates = Vec::new();
        self.start_effect.updates(state, &bindings, &mut updates)?;
        let mut res = state.clone();
        apply_updates(&updates, &mut res);
        debug!(
            "Started {} for {}, {} timed conditionals hold",
            crate::resolve(self.name),
            duration,
            context.len()
        );

        Ok(Some((
            res,
            Started {
                bindings,
                duration,
                context,
            },
        )))
    }

    /// Applies the continuous effects, `?duration` being the time
    /// elapsed since the action started.
    pub fn continuous<F: FactsContainer, L: FluentsContainer>(
        &self,
        state: &State<F, L>,
        started: &Started,
        elapsed: f64,
    ) -> EvalResult<State<F, L>> {
        let bindings = started.bindings.with_duration(elapsed);
        let mut updates = Vec::new();
        self.continuous_effect
            .updates(state, &bindings, &mut updates)?;
        let mut res = state.clone();
        apply_updates(&updates, &mut res);
        Ok(res)
    }

    /// Ends the action in `state`, or returns `None`
    /// if the end condition does not hold.
    pub fn end<F: FactsContainer, L: FluentsContainer>(
        &self,
        state: &State<F, L>,
        started: &Started,
    ) -> EvalResult<Option<State<F, L>>> {
        let bindings = &started.bindings;
        if !self
            .end_condition
            .evaluate_short_circuit(state, bindings)?
            .is_true()
        {
            return Ok(None);
        }

        let mut updates = Vec::new();
        self.end_effect.updates(state, bindings, &mut updates)?;
        for i in started.context.facts() {
            if let Some((_, effect)) = self.timed_conditionals.get(i) {
                effect.updates(state, bindings, &mut updates)?;
            }
        }
        let mut res = state.clone();
        apply_updates(&updates, &mut res);
        debug!("Ended {}", crate::resolve(self.name));
        Ok(Some(res))
    }

    /// What has to hold while the action runs, with the parameters bound.
    pub fn overall_constraint(&self, bindings: &Bindings) -> ConstraintExp {
        self.overall_effect.apply(bindings)
    }
}

#[allow(private_bounds)]
pub trait ActionBuilderState: Sealed {}

pub struct New;
pub struct HasName;
pub struct HasParameters;
pub struct HasPrecondition;
pub struct HasEffect;
pub struct HasDuration;

impl ActionBuilderState for New {}
impl ActionBuilderState for HasName {}
impl ActionBuilderState for HasParameters {}
impl ActionBuilderState for HasPrecondition {}
impl ActionBuilderState for HasEffect {}
impl ActionBuilderState for HasDuration {}

impl Sealed for New {}
impl Sealed for HasName {}
impl Sealed for HasParameters {}
impl Sealed for HasPrecondition {}
impl Sealed for HasEffect {}
impl Sealed for HasDuration {}

fn variables(parameters: &[(&str, &TypeSet)]) -> Vec<Variable> {
    parameters
        .iter()
        .map(|(name, typeset)| Variable::new(name, typeset))
        .collect()
}

pub struct ActionBuilder<S: ActionBuilderState> {
    name: InternerSymbol,
    priority: i32,
    parameters: Vec<Variable>,
    precondition: LogicalExp,
    effect: Effect,
    state: PhantomData<S>,
}

impl<S: ActionBuilderState> ActionBuilder<S> {
    fn into_state<T: ActionBuilderState>(self) -> ActionBuilder<T> {
        ActionBuilder {
            name: self.name,
            priority: self.priority,
            parameters: self.parameters,
            precondition: self.precondition,
            effect: self.effect,
            state: PhantomData,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl ActionBuilder<New> {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(name: &str) -> ActionBuilder<HasName> {
        ActionBuilder {
            name: crate::intern(name),
            priority: 0,
            parameters: Vec::new(),
            precondition: LogicalExp::True,
            effect: Effect::default(),
            state: PhantomData,
        }
    }
}

impl ActionBuilder<HasName> {
    pub fn parameters(mut self, parameters: &[(&str, &TypeSet)]) -> ActionBuilder<HasParameters> {
        self.parameters = variables(parameters);
        self.into_state()
    }
}

impl ActionBuilder<HasParameters> {
    pub fn precondition<F>(mut self, precondition: F) -> ActionBuilder<HasPrecondition>
    where
        F: FnOnce(&[Variable]) -> LogicalExp,
    {
        self.precondition = precondition(&self.parameters);
        self.into_state()
    }

    /// Without a precondition the action is always applicable.
    pub fn effect<F>(self, effect: F) -> ActionBuilder<HasEffect>
    where
        F: FnOnce(&[Variable]) -> Effect,
    {
        self.into_state::<HasPrecondition>().effect(effect)
    }
}

impl ActionBuilder<HasPrecondition> {
    pub fn effect<F>(mut self, effect: F) -> ActionBuilder<HasEffect>
    where
        F: FnOnce(&[Variable]) -> Effect,
    {
        self.effect = effect(&self.parameters);
        self.into_state()
    }

    pub fn build(self) -> Action {
        self.into_state::<HasEffect>().build()
    }
}

impl ActionBuilder<HasEffect> {
    pub fn build(self) -> Action {
        Action {
            name: self.name,
            priority: self.priority,
            parameters: self.parameters,
            precondition: self.precondition,
            effect: self.effect,
        }
    }
}

pub struct DurativeActionBuilder<S: ActionBuilderState> {
    action: DurativeAction,
    state: PhantomData<S>,
}

impl<S: ActionBuilderState> DurativeActionBuilder<S> {
    fn into_state<T: ActionBuilderState>(self) -> DurativeActionBuilder<T> {
        DurativeActionBuilder {
            action: self.action,
            state: PhantomData,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.action.priority = priority;
        self
    }
}

impl DurativeActionBuilder<New> {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(name: &str) -> DurativeActionBuilder<HasName> {
        DurativeActionBuilder {
            action: DurativeAction {
                name: crate::intern(name),
                priority: 0,
                parameters: Vec::new(),
                duration: NumericExp::number(0.0),
                start_condition: LogicalExp::True,
                overall_condition: LogicalExp::True,
                end_condition: LogicalExp::True,
                start_effect: Effect::default(),
                end_effect: Effect::default(),
                continuous_effect: Effect::default(),
                overall_effect: ConstraintExp::Literal(true.into()),
                timed_conditionals: Vec::new(),
            },
            state: PhantomData,
        }
    }
}

impl DurativeActionBuilder<HasName> {
    pub fn parameters(
        mut self,
        parameters: &[(&str, &TypeSet)],
    ) -> DurativeActionBuilder<HasParameters> {
        self.action.parameters = variables(parameters);
        self.into_state()
    }
}

impl DurativeActionBuilder<HasParameters> {
    pub fn duration<F>(mut self, duration: F) -> DurativeActionBuilder<HasDuration>
    where
        F: FnOnce(&[Variable]) -> NumericExp,
    {
        self.action.duration = duration(&self.action.parameters);
        self.into_state()
    }
}

impl DurativeActionBuilder<HasDuration> {
    pub fn at_start<F>(mut self, condition: F) -> Self
    where
        F: FnOnce(&[Variable]) -> LogicalExp,
    {
        self.action.start_condition = condition(&self.action.parameters);
        self
    }

    pub fn over_all<F>(mut self, condition: F) -> Self
    where
        F: FnOnce(&[Variable]) -> LogicalExp,
    {
        self.action.overall_condition = condition(&self.action.parameters);
        self
    }

    pub fn at_end<F>(mut self, condition: F) -> Self
    where
        F: FnOnce(&[Variable]) -> LogicalExp,
    {
        self.action.end_condition = condition(&self.action.parameters);
        self
    }

    pub fn start_effect<F>(mut self, effect: F) -> Self
    where
        F: FnOnce(&[Variable]) -> Effect,
    {
        self.action.start_effect = effect(&self.action.parameters);
        self
    }

    pub fn end_effect<F>(mut self, effect: F) -> Self
    where
        F: FnOnce(&[Variable]) -> Effect,
    {
        self.action.end_effect = effect(&self.action.parameters);
        self
    }

    pub fn continuous_effect<F>(mut self, effect: F) -> Self
    where
        F: FnOnce(&[Variable]) -> Effect,
    {
        self.action.continuous_effect = effect(&self.action.parameters);
        self
    }

    /// Effect at the end of the action, if `condition` held at its start.
    pub fn timed_conditional<F>(mut self, conditional: F) -> Self
    where
        F: FnOnce(&[Variable]) -> (LogicalExp, Effect),
    {
        let conditional = conditional(&self.action.parameters);
        self.action.timed_conditionals.push(conditional);
        self
    }

    pub fn build(self) -> DurativeAction {
        let mut action = self.action;
        action.overall_effect = match &action.overall_condition {
            LogicalExp::True => ConstraintExp::Literal(true.into()),
            condition => ConstraintExp::always(ConstraintExp::atomic(condition.clone())),
        };
        action
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "(:action {} :parameters ({}) :precondition {} :effect {})",
            crate::resolve(self.name),
            self.parameters.iter().map(Variable::typed).join(" "),
            self.precondition,
            self.effect
        )
    }
}
