//! Compiler support utilities shared across stages.

pub mod intern;

pub use intern::{Interner, NameId};
