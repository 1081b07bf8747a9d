//! Error types for the solver.

use fixlog_ir::{Span, Symbol};
use thiserror::Error;

use crate::Model;

pub type Result<T> = std::result::Result<T, SolveError>;

/// A structured solver failure. Every static kind carries the offending
/// symbol and the source span the front-end attached to the clause or atom.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("unknown predicate `{pred}` at {span}")]
    UnknownPredicate { pred: Symbol, span: Span },

    #[error("`{pred}` expects {expected} argument(s), found {found} at {span}")]
    ArityMismatch {
        pred: Symbol,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("variable `{var}` is unbound where a ground value is required at {span}")]
    UnboundVariable { var: Symbol, span: Span },

    #[error("negated atom on `{pred}` leaves variable `{var}` unbound at {span}")]
    UngroundNegation {
        pred: Symbol,
        var: Symbol,
        span: Span,
    },

    #[error("head symbol `{pred}` is not a relational or lattice predicate at {span}")]
    NonRelationalHead { pred: Symbol, span: Span },

    #[error("program is not stratifiable: negative cycle {}", fmt_cycle(.cycle))]
    Unstratifiable { pred: Symbol, cycle: Vec<Symbol> },

    #[error("lattice contract violated on `{pred}`: {message} at {span}")]
    LatticeContract {
        pred: Symbol,
        message: String,
        span: Span,
    },

    /// The external cancellation token was set; the model derived so far is
    /// attached.
    #[error("solve cancelled")]
    Cancelled { partial: Box<Model> },
}

fn fmt_cycle(cycle: &[Symbol]) -> String {
    let mut names: Vec<&str> = cycle.iter().map(|s| s.as_ref().as_str()).collect();
    if let Some(&first) = names.first() {
        names.push(first);
    }
    names.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixlog_ir::sym;

    #[test]
    fn test_cycle_rendering() {
        let err = SolveError::Unstratifiable {
            pred: sym("a"),
            cycle: vec![sym("a"), sym("b")],
        };
        assert_eq!(
            err.to_string(),
            "program is not stratifiable: negative cycle a -> b -> a"
        );
    }

    #[test]
    fn test_span_in_message() {
        let err = SolveError::UnknownPredicate {
            pred: sym("ghost"),
            span: Span::new(10..15),
        };
        assert_eq!(err.to_string(), "unknown predicate `ghost` at 10..15");
    }
}
