//! Three- and four-valued logic and the numeric and object values
//! that go along with it.
//!
//! Closed worlds evaluate to [Bool], [Double] and [ConstantValue],
//! open worlds to [FuzzyBool], [FuzzyDouble] and [FuzzyConstant].
//! The [Truth], [Number] and [ObjectValue] traits let one evaluator
//! serve both.

use alloc::{vec, vec::Vec};
use core::{
    cmp::Ordering,
    fmt::{Debug, Display},
    hash::Hash,
    ops::{BitAnd, BitOr, BitXor, Not},
};
use gazebo::dupe::Dupe;

use crate::{
    entity::ConstantHandle,
    error::{EvalResult, EvaluationError},
};

/// Returned when narrowing a fuzzy value that is Unknown
/// into its closed-world counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownValue;

/// Values with an Undefined and an Unknown state.
pub trait Indeterminate: Sized {
    const UNDEFINED: Self;
    /// Closed-world algebras cannot represent Unknown,
    /// for them this is the same as [Indeterminate::UNDEFINED].
    const UNKNOWN: Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bool {
    False,
    True,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FuzzyBool {
    False,
    True,
    Undefined,
    Unknown,
}

impl Bool {
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Undefined => None,
        }
    }
}

impl FuzzyBool {
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Undefined | Self::Unknown => None,
        }
    }
}

impl From<bool> for Bool {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl From<bool> for FuzzyBool {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl From<Bool> for FuzzyBool {
    fn from(value: Bool) -> Self {
        match value {
            Bool::False => Self::False,
            Bool::True => Self::True,
            Bool::Undefined => Self::Undefined,
        }
    }
}

impl TryFrom<FuzzyBool> for Bool {
    type Error = UnknownValue;

    fn try_from(value: FuzzyBool) -> Result<Self, Self::Error> {
        match value {
            FuzzyBool::False => Ok(Self::False),
            FuzzyBool::True => Ok(Self::True),
            FuzzyBool::Undefined => Ok(Self::Undefined),
            FuzzyBool::Unknown => Err(UnknownValue),
        }
    }
}

impl BitAnd for Bool {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Bool::*;
        match (self, rhs) {
            (False, _) | (_, False) => False,
            (Undefined, _) | (_, Undefined) => Undefined,
            (True, True) => True,
        }
    }
}

impl BitOr for Bool {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use Bool::*;
        match (self, rhs) {
            (True, _) | (_, True) => True,
            (Undefined, _) | (_, Undefined) => Undefined,
            (False, False) => False,
        }
    }
}

impl BitXor for Bool {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        match (self.to_bool(), rhs.to_bool()) {
            (Some(a), Some(b)) => (a ^ b).into(),
            _ => Self::Undefined,
        }
    }
}

impl Not for Bool {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Undefined => Self::Undefined,
        }
    }
}

impl BitAnd for FuzzyBool {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use FuzzyBool::*;
        match (self, rhs) {
            (False, _) | (_, False) => False,
            (Undefined, _) | (_, Undefined) => Undefined,
            (Unknown, _) | (_, Unknown) => Unknown,
            (True, True) => True,
        }
    }
}

impl BitOr for FuzzyBool {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use FuzzyBool::*;
        match (self, rhs) {
            (True, _) | (_, True) => True,
            (Unknown, _) | (_, Unknown) => Unknown,
            (Undefined, _) | (_, Undefined) => Undefined,
            (False, False) => False,
        }
    }
}

impl BitXor for FuzzyBool {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        use FuzzyBool::*;
        match (self, rhs) {
            (Undefined, _) | (_, Undefined) => Undefined,
            (Unknown, _) | (_, Unknown) => Unknown,
            (a, b) => ((a == True) != (b == True)).into(),
        }
    }
}

impl Not for FuzzyBool {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            other => other,
        }
    }
}

impl Display for Bool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

impl Display for FuzzyBool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Undefined => write!(f, "undefined"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl Indeterminate for Bool {
    const UNDEFINED: Self = Self::Undefined;
    const UNKNOWN: Self = Self::Undefined;
}

impl Indeterminate for FuzzyBool {
    const UNDEFINED: Self = Self::Undefined;
    const UNKNOWN: Self = Self::Unknown;
}

/// Truth values of a world.
pub trait Truth:
    Indeterminate
    + Copy
    + Eq
    + Ord
    + Hash
    + Debug
    + Display
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + From<bool>
    + Into<FuzzyBool>
{
    const TRUE: Self;
    const FALSE: Self;

    fn is_true(self) -> bool {
        self == Self::TRUE
    }

    fn is_false(self) -> bool {
        self == Self::FALSE
    }

    fn is_unknown(self) -> bool {
        let value: FuzzyBool = self.into();
        value == FuzzyBool::Unknown
    }
}

impl Truth for Bool {
    const TRUE: Self = Self::True;
    const FALSE: Self = Self::False;
}

impl Truth for FuzzyBool {
    const TRUE: Self = Self::True;
    const FALSE: Self = Self::False;
}

/// Result of an evaluation that stopped as soon as the outcome was decided.
///
/// Conjunctions stop at the first operand that is not true, disjunctions
/// at the first one that is true or Unknown. An Unknown operand can
/// therefore hide a later true one in open worlds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortCircuit<T: Truth>(pub T);

impl<T: Truth> ShortCircuit<T> {
    pub fn value(self) -> T {
        self.0
    }

    pub fn is_true(self) -> bool {
        self.0.is_true()
    }
}

/// A float with a total order, so expressions holding numbers
/// can be compared, hashed and sorted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Real(pub f64);

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Real {}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Real {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Real {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Display for Real {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    /// Applies the operator, rejecting NaN and infinite results.
    pub fn checked(self, lhs: f64, rhs: f64) -> EvalResult<f64> {
        let res = match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
        };

        if res.is_nan() || res.is_infinite() {
            return Err(EvaluationError::Numeric {
                operator: self.symbol(),
                operands: vec![lhs, rhs],
            });
        }
        Ok(res)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComparisonOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Gt => ">",
        }
    }

    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => lhs == rhs,
            Self::Ge => lhs >= rhs,
            Self::Gt => lhs > rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Double {
    Defined(f64),
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FuzzyDouble {
    Defined(f64),
    Undefined,
    Unknown,
}

impl From<f64> for Double {
    fn from(value: f64) -> Self {
        Self::Defined(value)
    }
}

impl From<f64> for FuzzyDouble {
    fn from(value: f64) -> Self {
        Self::Defined(value)
    }
}

impl From<Double> for FuzzyDouble {
    fn from(value: Double) -> Self {
        match value {
            Double::Defined(v) => Self::Defined(v),
            Double::Undefined => Self::Undefined,
        }
    }
}

impl TryFrom<FuzzyDouble> for Double {
    type Error = UnknownValue;

    fn try_from(value: FuzzyDouble) -> Result<Self, Self::Error> {
        match value {
            FuzzyDouble::Defined(v) => Ok(Self::Defined(v)),
            FuzzyDouble::Undefined => Ok(Self::Undefined),
            FuzzyDouble::Unknown => Err(UnknownValue),
        }
    }
}

impl Display for Double {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{}", v),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

impl Display for FuzzyDouble {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{}", v),
            Self::Undefined => write!(f, "undefined"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl Indeterminate for Double {
    const UNDEFINED: Self = Self::Undefined;
    const UNKNOWN: Self = Self::Undefined;
}

impl Indeterminate for FuzzyDouble {
    const UNDEFINED: Self = Self::Undefined;
    const UNKNOWN: Self = Self::Unknown;
}

/// Numeric values of a world.
///
/// Undefined wins over Unknown in arithmetic,
/// any comparison with an Undefined operand is Undefined.
pub trait Number:
    Indeterminate + Copy + PartialEq + Debug + Display + From<f64> + Into<FuzzyDouble>
{
    type Truth: Truth;

    fn arithmetic(op: ArithmeticOp, lhs: Self, rhs: Self) -> EvalResult<Self>;
    fn negate(self) -> Self;
    fn compare(op: ComparisonOp, lhs: Self, rhs: Self) -> Self::Truth;

    fn value(self) -> Option<f64> {
        let value: FuzzyDouble = self.into();
        match value {
            FuzzyDouble::Defined(v) => Some(v),
            _ => None,
        }
    }

    fn is_unknown(self) -> bool {
        let value: FuzzyDouble = self.into();
        value == FuzzyDouble::Unknown
    }
}

impl Number for Double {
    type Truth = Bool;

    fn arithmetic(op: ArithmeticOp, lhs: Self, rhs: Self) -> EvalResult<Self> {
        match (lhs, rhs) {
            (Self::Defined(a), Self::Defined(b)) => op.checked(a, b).map(Self::Defined),
            _ => Ok(Self::Undefined),
        }
    }

    fn negate(self) -> Self {
        match self {
            Self::Defined(v) => Self::Defined(-v),
            Self::Undefined => Self::Undefined,
        }
    }

    fn compare(op: ComparisonOp, lhs: Self, rhs: Self) -> Bool {
        match (lhs, rhs) {
            (Self::Defined(a), Self::Defined(b)) => op.holds(a, b).into(),
            _ => Bool::Undefined,
        }
    }
}

impl Number for FuzzyDouble {
    type Truth = FuzzyBool;

    fn arithmetic(op: ArithmeticOp, lhs: Self, rhs: Self) -> EvalResult<Self> {
        use FuzzyDouble::*;
        match (lhs, rhs) {
            (Undefined, _) | (_, Undefined) => Ok(Undefined),
            (Unknown, _) | (_, Unknown) => Ok(Unknown),
            (Defined(a), Defined(b)) => op.checked(a, b).map(Defined),
        }
    }

    fn negate(self) -> Self {
        match self {
            Self::Defined(v) => Self::Defined(-v),
            other => other,
        }
    }

    fn compare(op: ComparisonOp, lhs: Self, rhs: Self) -> FuzzyBool {
        use FuzzyDouble::*;
        match (lhs, rhs) {
            (Undefined, _) | (_, Undefined) => FuzzyBool::Undefined,
            (Unknown, _) | (_, Unknown) => FuzzyBool::Unknown,
            (Defined(a), Defined(b)) => op.holds(a, b).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstantValue {
    Defined(ConstantHandle),
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FuzzyConstant {
    Defined(ConstantHandle),
    Undefined,
    Unknown,
}

impl From<ConstantValue> for FuzzyConstant {
    fn from(value: ConstantValue) -> Self {
        match value {
            ConstantValue::Defined(c) => Self::Defined(c),
            ConstantValue::Undefined => Self::Undefined,
        }
    }
}

impl TryFrom<FuzzyConstant> for ConstantValue {
    type Error = UnknownValue;

    fn try_from(value: FuzzyConstant) -> Result<Self, Self::Error> {
        match value {
            FuzzyConstant::Defined(c) => Ok(Self::Defined(c)),
            FuzzyConstant::Undefined => Ok(Self::Undefined),
            FuzzyConstant::Unknown => Err(UnknownValue),
        }
    }
}

impl Indeterminate for ConstantValue {
    const UNDEFINED: Self = Self::Undefined;
    const UNKNOWN: Self = Self::Undefined;
}

impl Indeterminate for FuzzyConstant {
    const UNDEFINED: Self = Self::Undefined;
    const UNKNOWN: Self = Self::Unknown;
}

/// Object values of a world.
pub trait ObjectValue: Indeterminate + Clone + PartialEq + Debug + Into<FuzzyConstant> {
    type Truth: Truth;

    fn defined(constant: ConstantHandle) -> Self;

    fn constant(&self) -> Option<ConstantHandle> {
        let value: FuzzyConstant = self.clone().into();
        match value {
            FuzzyConstant::Defined(c) => Some(c),
            _ => None,
        }
    }

    fn is_unknown(&self) -> bool {
        let value: FuzzyConstant = self.clone().into();
        value == FuzzyConstant::Unknown
    }

    fn equals(&self, other: &Self) -> Self::Truth {
        let lhs: FuzzyConstant = self.clone().into();
        let rhs: FuzzyConstant = other.clone().into();
        match (lhs, rhs) {
            (FuzzyConstant::Undefined, _) | (_, FuzzyConstant::Undefined) => {
                <Self::Truth as Indeterminate>::UNDEFINED
            }
            (FuzzyConstant::Unknown, _) | (_, FuzzyConstant::Unknown) => {
                <Self::Truth as Indeterminate>::UNKNOWN
            }
            (FuzzyConstant::Defined(a), FuzzyConstant::Defined(b)) => (a == b).into(),
        }
    }
}

impl ObjectValue for ConstantValue {
    type Truth = Bool;

    fn defined(constant: ConstantHandle) -> Self {
        Self::Defined(constant)
    }
}

impl ObjectValue for FuzzyConstant {
    type Truth = FuzzyBool;

    fn defined(constant: ConstantHandle) -> Self {
        Self::Defined(constant)
    }
}

impl Dupe for ConstantValue {}
impl Dupe for FuzzyConstant {}

/// All four truth values, for exhaustive checks.
pub fn all_fuzzy() -> Vec<FuzzyBool> {
    vec![
        FuzzyBool::True,
        FuzzyBool::False,
        FuzzyBool::Undefined,
        FuzzyBool::Unknown,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use FuzzyBool::*;

    #[test]
    fn test_double_negation_and_identities() {
        for a in all_fuzzy() {
            assert_eq!(!!a, a);
            assert_eq!(a & True, a);
            assert_eq!(a & False, False);
            assert_eq!(a | False, a);
            assert_eq!(a | True, True);
        }
    }

    #[test]
    fn test_commutative_and_associative() {
        for a in all_fuzzy() {
            for b in all_fuzzy() {
                assert_eq!(a & b, b & a);
                assert_eq!(a | b, b | a);
                assert_eq!(a ^ b, b ^ a);
                for c in all_fuzzy() {
                    assert_eq!((a & b) & c, a & (b & c));
                    assert_eq!((a | b) | c, a | (b | c));
                }
            }
        }
    }

    #[test]
    fn test_priorities() {
        assert_eq!(False & Unknown, False);
        assert_eq!(False & Undefined, False);
        assert_eq!(Undefined & Unknown, Undefined);
        assert_eq!(Unknown | Undefined, Unknown);
        assert_eq!(True | Unknown, True);
        assert_eq!(Undefined | False, Undefined);
        assert_eq!(!Undefined, Undefined);
        assert_eq!(!Unknown, Unknown);

        assert_eq!(Bool::False & Bool::Undefined, Bool::False);
        assert_eq!(Bool::True & Bool::Undefined, Bool::Undefined);
        assert_eq!(Bool::True | Bool::Undefined, Bool::True);
        assert_eq!(Bool::False | Bool::Undefined, Bool::Undefined);
    }

    #[test]
    fn test_closed_agrees_with_fuzzy() {
        let closed = [Bool::True, Bool::False, Bool::Undefined];
        for a in closed {
            for b in closed {
                assert_eq!(FuzzyBool::from(a & b), FuzzyBool::from(a) & FuzzyBool::from(b));
                assert_eq!(FuzzyBool::from(a | b), FuzzyBool::from(a) | FuzzyBool::from(b));
                assert_eq!(FuzzyBool::from(a ^ b), FuzzyBool::from(a) ^ FuzzyBool::from(b));
            }
            assert_eq!(FuzzyBool::from(!a), !FuzzyBool::from(a));
        }
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(Bool::try_from(True), Ok(Bool::True));
        assert_eq!(Bool::try_from(Undefined), Ok(Bool::Undefined));
        assert_eq!(Bool::try_from(Unknown), Err(UnknownValue));
        assert_eq!(Double::try_from(FuzzyDouble::Unknown), Err(UnknownValue));
        assert_eq!(FuzzyBool::from(true), True);
        assert_eq!(Bool::from(false), Bool::False);
    }

    #[test]
    fn test_numeric_status_propagation() {
        use FuzzyDouble as FD;

        let res = FD::arithmetic(ArithmeticOp::Add, FD::Defined(1.0), FD::Defined(2.0));
        assert_eq!(res, Ok(FD::Defined(3.0)));
        let res = FD::arithmetic(ArithmeticOp::Add, FD::Unknown, FD::Undefined);
        assert_eq!(res, Ok(FD::Undefined));
        let res = FD::arithmetic(ArithmeticOp::Mul, FD::Unknown, FD::Defined(2.0));
        assert_eq!(res, Ok(FD::Unknown));

        assert_eq!(FD::compare(ComparisonOp::Le, FD::Defined(1.0), FD::Defined(1.0)), True);
        assert_eq!(FD::compare(ComparisonOp::Lt, FD::Unknown, FD::Undefined), Undefined);
        assert_eq!(FD::compare(ComparisonOp::Gt, FD::Unknown, FD::Defined(0.0)), Unknown);
        assert_eq!(
            Double::compare(ComparisonOp::Eq, Double::Undefined, Double::Defined(0.0)),
            Bool::Undefined
        );
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let res = Double::arithmetic(
            ArithmeticOp::Div,
            Double::Defined(10.0),
            Double::Defined(0.0),
        );
        assert!(matches!(
            res,
            Err(EvaluationError::Numeric { operator: "/", .. })
        ));

        let res = ArithmeticOp::Div.checked(0.0, 0.0);
        assert!(res.is_err());

        // Undefined operands never reach the arithmetic
        let res = Double::arithmetic(ArithmeticOp::Div, Double::Undefined, Double::Defined(0.0));
        assert_eq!(res, Ok(Double::Undefined));
    }

    #[test]
    fn test_real_total_order() {
        assert_eq!(Real(1.0), Real(1.0));
        assert!(Real(-1.0) < Real(2.5));
        assert_eq!(Real(f64::NAN), Real(f64::NAN));
    }
}
