//! World-state representation and expression evaluation core
//! of a TLPlan-style temporal/numeric planner.
//!
//! The search driver builds a [State](state::State) from a facts
//! container and a fluents container, evaluates action preconditions
//! against it and applies effects to copies of it.
//! Temporal constraints are advanced between states with
//! [ConstraintExp::progress](calculus::constraint::ConstraintExp::progress).
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod action;
pub mod calculus;
pub mod effect;
pub mod entity;
pub mod error;
pub mod fuzzy;
pub mod plan;
pub mod state;
pub mod util;

#[cfg(test)]
mod testing;

use alloc::string::String;
use spin::Mutex;
use string_interner::{backend::BufferBackend, symbol::SymbolU32, StringInterner};

pub type InternerSymbol = SymbolU32;
type Interner = StringInterner<BufferBackend<InternerSymbol>>;
lazy_static::lazy_static! {
    static ref INTERNER: Mutex<Interner> = Mutex::new(Interner::new());
}

pub(crate) fn intern(name: &str) -> InternerSymbol {
    INTERNER.lock().get_or_intern(name)
}

pub(crate) fn resolve(symbol: InternerSymbol) -> String {
    INTERNER
        .lock()
        .resolve(symbol)
        .map(String::from)
        .unwrap_or_default()
}

pub(crate) mod sealed {
    pub trait Sealed {}
}
