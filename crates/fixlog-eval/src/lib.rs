//! Bottom-up fixed-point solver for stratified Datalog with lattices.
//!
//! Given a [`fixlog_ir::Program`] — predicate interpretations, ground facts,
//! Horn clauses — the solver computes the minimal model by stratum-ascending
//! semi-naive evaluation: relations grow monotonically through an indexed
//! fact store, lattice predicates move up their partial order through
//! user-supplied joins, and negation is admitted only across strata.
//!
//! # Example
//!
//! ```
//! use fixlog_eval::solve;
//! use fixlog_ir::{Atom, Interpretation, Literal, Program, Term, Value};
//!
//! let mut program = Program::new();
//! program.declare("edge", Interpretation::relation(2));
//! program.declare("path", Interpretation::relation(2));
//! program.fact(Atom::new("edge", vec![Term::val(1), Term::val(2)]));
//! program.fact(Atom::new("edge", vec![Term::val(2), Term::val(3)]));
//! program.rule(
//!     Atom::new("path", vec![Term::var("x"), Term::var("y")]),
//!     vec![Literal::pos("edge", vec![Term::var("x"), Term::var("y")])],
//! );
//! program.rule(
//!     Atom::new("path", vec![Term::var("x"), Term::var("z")]),
//!     vec![
//!         Literal::pos("path", vec![Term::var("x"), Term::var("y")]),
//!         Literal::pos("edge", vec![Term::var("y"), Term::var("z")]),
//!     ],
//! );
//!
//! let model = solve(&program).unwrap();
//! assert_eq!(model.relation("path").len(), 3); // (1,2), (2,3), (1,3)
//! assert!(model.contains("path", &[Value::I32(1), Value::I32(3)]));
//! ```

mod error;
mod eval;
mod lattice;
mod plan;
mod relation;
pub mod serde_bridge;
mod solver;
mod stratify;

pub use error::{Result, SolveError};
pub use eval::Bindings;
pub use lattice::LatticeMap;
pub use relation::{Lookup, Relation};
pub use solver::{CancelToken, Model, SolveStats, Solver, check, solve, solve_with_cancel};
