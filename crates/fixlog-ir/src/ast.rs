//! Terms, atoms, literals and clauses: the symbolic side of the model.

use std::cmp::Ordering;
use std::fmt;

use crate::{Span, Symbol, Value, sym};

/// A term in a clause body or head.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A ground constant.
    Const(Value),
    /// A variable, scoped to its clause.
    Var(Symbol),
    /// A constructor applied to terms: `Name(t1, …, tn)`.
    Ctor(Symbol, Vec<Term>),
}

impl Term {
    /// A variable term.
    pub fn var(name: &str) -> Term {
        Term::Var(sym(name))
    }

    /// A constant term.
    pub fn val(v: impl Into<Value>) -> Term {
        Term::Const(v.into())
    }

    /// A constructor term.
    pub fn ctor(name: &str, args: Vec<Term>) -> Term {
        Term::Ctor(sym(name), args)
    }

    /// Append every variable occurring in this term, in syntactic order.
    pub fn collect_vars(&self, out: &mut Vec<Symbol>) {
        match self {
            Term::Const(_) => {}
            Term::Var(v) => out.push(*v),
            Term::Ctor(_, args) => {
                for arg in args {
                    arg.collect_vars(out);
                }
            }
        }
    }

    pub fn is_ground(&self) -> bool {
        match self {
            Term::Const(_) => true,
            Term::Var(_) => false,
            Term::Ctor(_, args) => args.iter().all(Term::is_ground),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Const(v) => write!(f, "{v:?}"),
            Term::Var(v) => write!(f, "{v}"),
            Term::Ctor(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A predicate applied to an ordered list of terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub pred: Symbol,
    pub terms: Vec<Term>,
    pub span: Span,
}

impl Atom {
    pub fn new(pred: &str, terms: Vec<Term>) -> Atom {
        Atom {
            pred: sym(pred),
            terms,
            span: Span::NONE,
        }
    }

    pub fn with_span(mut self, span: Span) -> Atom {
        self.span = span;
        self
    }

    pub fn arity(&self) -> usize {
        self.terms.len()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.pred)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{term}")?;
        }
        write!(f, ")")
    }
}

/// Comparison operators for constraint literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Whether an ordering between two ground values satisfies the operator.
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord.is_eq(),
            CompareOp::Ne => ord.is_ne(),
            CompareOp::Lt => ord.is_lt(),
            CompareOp::Le => ord.is_le(),
            CompareOp::Gt => ord.is_gt(),
            CompareOp::Ge => ord.is_ge(),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

/// A comparison between two terms, e.g. `n > 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub left: Term,
    pub op: CompareOp,
    pub right: Term,
    pub span: Span,
}

/// A functional atom `result = func(arg1, …, argn)`, evaluated through the
/// program's builtin registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncAtom {
    pub result: Term,
    pub func: Symbol,
    pub args: Vec<Term>,
    pub span: Span,
}

/// A body literal: the relational part of a clause body (positive or negated
/// predicate atoms) or the functional part (comparisons and builtin calls).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// `p(t1, …, tn)`
    Positive(Atom),
    /// `!p(t1, …, tn)`
    Negative(Atom),
    /// `left op right`
    Compare(Constraint),
    /// `result = func(args…)`
    Func(FuncAtom),
}

impl Literal {
    pub fn pos(pred: &str, terms: Vec<Term>) -> Literal {
        Literal::Positive(Atom::new(pred, terms))
    }

    pub fn neg(pred: &str, terms: Vec<Term>) -> Literal {
        Literal::Negative(Atom::new(pred, terms))
    }

    pub fn compare(left: Term, op: CompareOp, right: Term) -> Literal {
        Literal::Compare(Constraint {
            left,
            op,
            right,
            span: Span::NONE,
        })
    }

    pub fn func(result: Term, func: &str, args: Vec<Term>) -> Literal {
        Literal::Func(FuncAtom {
            result,
            func: sym(func),
            args,
            span: Span::NONE,
        })
    }

    pub fn span(&self) -> Span {
        match self {
            Literal::Positive(a) | Literal::Negative(a) => a.span,
            Literal::Compare(c) => c.span,
            Literal::Func(fa) => fa.span,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Positive(a) => write!(f, "{a}"),
            Literal::Negative(a) => write!(f, "!{a}"),
            Literal::Compare(c) => write!(f, "{} {} {}", c.left, c.op, c.right),
            Literal::Func(fa) => {
                write!(f, "{} = {}(", fa.result, fa.func)?;
                for (i, arg) in fa.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A Horn clause: a head atom implied by a conjunction of body literals.
/// An empty body makes it a fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub head: Atom,
    pub body: Vec<Literal>,
    pub span: Span,
}

impl Clause {
    pub fn fact(head: Atom) -> Clause {
        let span = head.span;
        Clause {
            head,
            body: Vec::new(),
            span,
        }
    }

    pub fn rule(head: Atom, body: Vec<Literal>) -> Clause {
        let span = body
            .iter()
            .map(Literal::span)
            .fold(head.span, Span::union);
        Clause { head, body, span }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            write!(f, " :- ")?;
            for (i, lit) in self.body.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{lit}")?;
            }
        }
        write!(f, ".")
    }
}
