//! Ember IR - symbols and free-variable sets.
//!
//! This crate holds the atoms shared by the compile-time and run-time halves
//! of the Ember evaluator:
//! - `Name`: compact interned string identifier
//! - `SymbolTable`: sharded name table behind interned symbols
//! - `Symbol`: interned (name-equality) or generated (identity-equality) atom
//! - `SymbolSet`: free-variable set with union, difference and membership

mod interner;
mod name;
mod symbol;
mod symbol_set;

pub use interner::{InternError, SymbolTable};
pub use name::Name;
pub use symbol::Symbol;
pub use symbol_set::SymbolSet;
