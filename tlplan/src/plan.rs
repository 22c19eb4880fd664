//! Plans in the text format external validators read:
//!
//! ```text
//! 0.000: (stack a b) [1.000]
//! 1.000: (stack b c) [1.000]
//! ```
//!
//! Timestamps and durations may be left out, the steps
//! of such a plan are one time unit apart.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::{error::Error, fmt::Display};
use getset::Getters;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, multispace0, multispace1},
    combinator::{all_consuming, map, opt, recognize},
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::{
    action::{ActionDef, GroundAction},
    entity::EntityStorage,
    error::BuildError,
    fuzzy::Real,
    util::named::NamedStorage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanParseError {
    Syntax { line: usize, text: String },
    ActionDoesNotExist(String),
    ObjectDoesNotExist(String),
    Build(BuildError),
}

impl Display for PlanParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Syntax { line, text } => write!(f, "line {}: cannot read `{}`", line, text),
            Self::ActionDoesNotExist(name) => write!(f, "no action named {}", name),
            Self::ObjectDoesNotExist(name) => write!(f, "no object named {}", name),
            Self::Build(e) => write!(f, "{}", e),
        }
    }
}

impl Error for PlanParseError {}

impl From<BuildError> for PlanParseError {
    fn from(value: BuildError) -> Self {
        Self::Build(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct PlanStep {
    timestamp: Real,
    #[getset(get = "pub")]
    action: GroundAction,
    duration: Option<Real>,
}

impl PlanStep {
    pub fn new(timestamp: f64, action: GroundAction, duration: Option<f64>) -> Self {
        Self {
            timestamp: Real(timestamp),
            action,
            duration: duration.map(Real),
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp.0
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration.map(|d| d.0)
    }

    pub fn end(&self) -> f64 {
        self.timestamp() + self.duration().unwrap_or(0.0)
    }
}

impl Display for PlanStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.3}: {}", self.timestamp.0, self.action)?;
        if let Some(d) = self.duration {
            write!(f, " [{:.3}]", d.0)?;
        }
        Ok(())
    }
}

/// Steps ordered by start time.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: PlanStep) {
        let position = self
            .steps
            .partition_point(|s| s.timestamp <= step.timestamp);
        self.steps.insert(position, step);
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Time at which the last step ends.
    pub fn makespan(&self) -> f64 {
        self.steps.iter().map(PlanStep::end).fold(0.0, f64::max)
    }

    /// Reads a plan, looking actions and objects up by name.
    pub fn read<A: ActionDef + Clone>(
        text: &str,
        actions: &NamedStorage<A>,
        entities: &EntityStorage,
    ) -> Result<Self, PlanParseError> {
        let mut res = Self::new();
        for (i, line) in parse_plan(text)?.iter().enumerate() {
            res.push(PlanStep::new(
                line.timestamp.unwrap_or(i as f64),
                line.resolve(actions, entities)?,
                line.duration,
            ));
        }
        Ok(res)
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for step in &self.steps {
            writeln!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// One step as written, names not yet resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanLine<'a> {
    pub timestamp: Option<f64>,
    pub name: &'a str,
    pub arguments: Vec<&'a str>,
    pub duration: Option<f64>,
}

impl PlanLine<'_> {
    pub fn resolve<A: ActionDef + Clone>(
        &self,
        actions: &NamedStorage<A>,
        entities: &EntityStorage,
    ) -> Result<GroundAction, PlanParseError> {
        let action = actions
            .get(self.name)
            .ok_or_else(|| PlanParseError::ActionDoesNotExist(self.name.to_string()))?;
        let arguments = self
            .arguments
            .iter()
            .map(|a| {
                entities
                    .get_constant(a)
                    .ok_or_else(|| PlanParseError::ObjectDoesNotExist(a.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(action.ground(&arguments)?)
    }
}

fn brackets<'a, O, F>(f: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(pair(tag("("), multispace0), f, pair(multispace0, tag(")")))
}

fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alpha1,
        many0(alt((alphanumeric1, tag("-"), tag("_")))),
    ))(input)
}

fn action(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    brackets(pair(name, many0(preceded(multispace1, name))))(input)
}

fn step(input: &str) -> IResult<&str, PlanLine<'_>> {
    map(
        tuple((
            opt(terminated(double, pair(multispace0, tag(":")))),
            preceded(multispace0, action),
            opt(preceded(
                multispace0,
                delimited(
                    pair(tag("["), multispace0),
                    double,
                    pair(multispace0, tag("]")),
                ),
            )),
        )),
        |(timestamp, (name, arguments), duration)| PlanLine {
            timestamp,
            name,
            arguments,
            duration,
        },
    )(input)
}

/// Splits plan text into steps, skipping blank lines and `;` comments.
pub fn parse_plan(text: &str) -> Result<Vec<PlanLine<'_>>, PlanParseError> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with(';'))
        .map(|(i, l)| {
            all_consuming(step)(l)
                .map(|(_, s)| s)
                .map_err(|_| PlanParseError::Syntax {
                    line: i + 1,
                    text: l.to_string(),
                })
        })
        .collect()
}
