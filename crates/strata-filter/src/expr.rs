//! Filter expression representation.
//!
//! This module defines the expression types produced by the parser:
//! comparisons, boolean combinators, and the disjunctive normal form the
//! query planner consumes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Returns the logical negation of the operator.
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::Eq => Self::Neq,
            Self::Neq => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
        }
    }

    /// Applies the operator to an ordering between lhs and rhs.
    #[must_use]
    pub fn matches(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Eq => ordering == Equal,
            Self::Neq => ordering != Equal,
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
        }
    }

    /// Returns the operator's source form.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An untyped literal as written in the expression source.
///
/// Literals are coerced to their column's type when the expression is
/// compiled onto a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// `true` / `false`
    Bool(bool),
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// A quoted or bare string literal.
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// An atomic comparison: column ⊗ literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// The column name.
    pub column: String,
    /// The comparison operator.
    pub op: CompareOp,
    /// The right-hand literal.
    pub literal: Literal,
}

impl Comparison {
    /// Creates a comparison.
    pub fn new(column: impl Into<String>, op: CompareOp, literal: Literal) -> Self {
        Self {
            column: column.into(),
            op,
            literal,
        }
    }

    /// Returns the comparison with its operator negated.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            column: self.column.clone(),
            op: self.op.negated(),
            literal: self.literal.clone(),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op, self.literal)
    }
}

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// An atomic comparison.
    Compare(Comparison),
    /// Conjunction of two sub-expressions.
    And(Box<Expr>, Box<Expr>),
    /// Disjunction of two sub-expressions.
    Or(Box<Expr>, Box<Expr>),
    /// Negation of a sub-expression.
    Not(Box<Expr>),
}

impl Expr {
    /// Creates a comparison expression.
    pub fn compare(column: impl Into<String>, op: CompareOp, literal: Literal) -> Self {
        Self::Compare(Comparison::new(column, op, literal))
    }

    /// Creates an AND expression.
    #[must_use]
    pub fn and(self, other: Expr) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Creates an OR expression.
    #[must_use]
    pub fn or(self, other: Expr) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Creates a NOT expression.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Rewrites the expression into disjunctive normal form.
    ///
    /// Negations are pushed down to the comparisons (De Morgan), then AND
    /// distributes over OR. Predicate sizes are small in practice, so the
    /// worst-case blowup is acceptable.
    #[must_use]
    pub fn to_dnf(&self) -> Dnf {
        let conjunctions = dnf_terms(self)
            .into_iter()
            .map(Conjunction)
            .collect();
        Dnf(conjunctions)
    }
}

fn dnf_terms(expr: &Expr) -> Vec<Vec<Comparison>> {
    match expr {
        Expr::Compare(c) => vec![vec![c.clone()]],
        Expr::Or(l, r) => {
            let mut terms = dnf_terms(l);
            terms.extend(dnf_terms(r));
            terms
        }
        Expr::And(l, r) => {
            let left = dnf_terms(l);
            let right = dnf_terms(r);
            let mut terms = Vec::with_capacity(left.len() * right.len());
            for lt in &left {
                for rt in &right {
                    let mut conjunct = lt.clone();
                    conjunct.extend(rt.iter().cloned());
                    terms.push(conjunct);
                }
            }
            terms
        }
        Expr::Not(inner) => dnf_terms(&pushed_down(inner)),
    }
}

/// Returns the negation of `expr` with the NOT pushed one level down.
fn pushed_down(expr: &Expr) -> Expr {
    match expr {
        Expr::Compare(c) => Expr::Compare(c.negated()),
        Expr::And(l, r) => Expr::Or(
            Box::new(Expr::Not(l.clone())),
            Box::new(Expr::Not(r.clone())),
        ),
        Expr::Or(l, r) => Expr::And(
            Box::new(Expr::Not(l.clone())),
            Box::new(Expr::Not(r.clone())),
        ),
        Expr::Not(inner) => (**inner).clone(),
    }
}

/// A conjunction of comparisons; one term of a DNF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conjunction(pub Vec<Comparison>);

/// A filter expression in disjunctive normal form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dnf(pub Vec<Conjunction>);

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(column: &str, op: CompareOp, value: i64) -> Expr {
        Expr::compare(column, op, Literal::Int(value))
    }

    #[test]
    fn test_negated_ops() {
        assert_eq!(CompareOp::Eq.negated(), CompareOp::Neq);
        assert_eq!(CompareOp::Lt.negated(), CompareOp::Ge);
        assert_eq!(CompareOp::Le.negated(), CompareOp::Gt);
    }

    #[test]
    fn test_op_matches() {
        use std::cmp::Ordering;
        assert!(CompareOp::Le.matches(Ordering::Equal));
        assert!(CompareOp::Le.matches(Ordering::Less));
        assert!(!CompareOp::Le.matches(Ordering::Greater));
        assert!(CompareOp::Neq.matches(Ordering::Greater));
    }

    #[test]
    fn test_dnf_single_comparison() {
        let dnf = cmp("a", CompareOp::Eq, 1).to_dnf();
        assert_eq!(dnf.0.len(), 1);
        assert_eq!(dnf.0[0].0.len(), 1);
    }

    #[test]
    fn test_dnf_distributes_and_over_or() {
        // a == 1 && (b == 2 || c == 3) -> (a && b) || (a && c)
        let expr = cmp("a", CompareOp::Eq, 1)
            .and(cmp("b", CompareOp::Eq, 2).or(cmp("c", CompareOp::Eq, 3)));
        let dnf = expr.to_dnf();
        assert_eq!(dnf.0.len(), 2);
        assert_eq!(dnf.0[0].0.len(), 2);
        assert_eq!(dnf.0[1].0.len(), 2);
        assert_eq!(dnf.0[0].0[1].column, "b");
        assert_eq!(dnf.0[1].0[1].column, "c");
    }

    #[test]
    fn test_dnf_pushes_negation_to_comparisons() {
        // !(a < 1 && b >= 2) -> a >= 1 || b < 2
        let expr = cmp("a", CompareOp::Lt, 1)
            .and(cmp("b", CompareOp::Ge, 2))
            .negate();
        let dnf = expr.to_dnf();
        assert_eq!(dnf.0.len(), 2);
        assert_eq!(dnf.0[0].0[0].op, CompareOp::Ge);
        assert_eq!(dnf.0[1].0[0].op, CompareOp::Lt);
    }

    #[test]
    fn test_double_negation() {
        let expr = cmp("a", CompareOp::Eq, 1).negate().negate();
        let dnf = expr.to_dnf();
        assert_eq!(dnf.0.len(), 1);
        assert_eq!(dnf.0[0].0[0].op, CompareOp::Eq);
    }
}
