pub mod binding;
pub mod constraint;
pub mod defined;
pub mod logical;
pub mod numeric;
pub mod object;
pub mod signature;

/// Outcome of partial evaluation.
///
/// Either the expression reduced to a value, or what remains
/// of it after every decided part was replaced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Simplified<T, E> {
    Value(T),
    Residual(E),
}

impl<T, E> Simplified<T, E> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Residual(_) => None,
        }
    }

    pub fn residual(&self) -> Option<&E> {
        match self {
            Self::Value(_) => None,
            Self::Residual(e) => Some(e),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}
