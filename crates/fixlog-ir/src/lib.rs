//! Typed program model for the fixlog solver.
//!
//! The front-end (tokeniser, parser, name resolution, type checking) lowers a
//! source program into a [`Program`]: a table of predicate
//! [`Interpretation`]s, a list of ground facts, a list of Horn clauses, and a
//! registry of builtin functions usable in functional body atoms. The
//! `fixlog-eval` crate consumes a `Program` and computes its minimal model.
//!
//! Everything in this crate is immutable after construction and cheap to
//! share: symbols and string values are interned process-wide, so a single
//! `Program` can back several concurrently running solver instances.

mod ast;
mod program;
mod span;
mod value;

pub use ast::{Atom, Clause, CompareOp, Constraint, FuncAtom, Literal, Term};
pub use program::{BuiltinFn, Interpretation, LeqFn, LubFn, Program};
pub use span::Span;
pub use value::{Tuple, Value};

use internment::Intern;

/// Interned string, used for predicate, variable, constructor and function
/// names. Equality and hashing are pointer-based; the backing interner is
/// process-wide and thread-safe.
pub type Symbol = Intern<String>;

/// Intern a string as a [`Symbol`].
pub fn sym(name: &str) -> Symbol {
    Intern::from_ref(name)
}
