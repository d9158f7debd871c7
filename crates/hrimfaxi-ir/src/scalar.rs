//! Symbolic scalar expressions.
//!
//! Every duration, amplitude, and position in the IR is a [`Scalar`]: a
//! small expression tree over literals and named free variables. Programs
//! are built symbolically and only forced to numbers at the compilation
//! boundary, which is what makes static and batched variable assignment
//! possible.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A value bound to a variable name at assignment time.
///
/// Most variables bind to a single number; variables used as run-time
/// spatial modulation vectors bind to one weight per site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssignedValue {
    /// A single numeric value.
    Number(f64),
    /// A per-site weight vector.
    Vector(Vec<f64>),
}

impl From<f64> for AssignedValue {
    fn from(value: f64) -> Self {
        AssignedValue::Number(value)
    }
}

impl From<Vec<f64>> for AssignedValue {
    fn from(values: Vec<f64>) -> Self {
        AssignedValue::Vector(values)
    }
}

/// A variable binding environment.
pub type Assignments = FxHashMap<String, AssignedValue>;

/// A symbolic or concrete scalar expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// A constant numeric value.
    Literal(f64),
    /// A named free variable.
    Variable(String),
    /// Negation.
    Neg(Box<Scalar>),
    /// Addition.
    Add(Box<Scalar>, Box<Scalar>),
    /// Subtraction.
    Sub(Box<Scalar>, Box<Scalar>),
    /// Multiplication.
    Mul(Box<Scalar>, Box<Scalar>),
    /// Division.
    Div(Box<Scalar>, Box<Scalar>),
    /// Minimum of two expressions.
    Min(Box<Scalar>, Box<Scalar>),
    /// Maximum of two expressions.
    Max(Box<Scalar>, Box<Scalar>),
}

impl Scalar {
    /// Create a literal scalar.
    pub fn literal(value: f64) -> Self {
        Scalar::Literal(value)
    }

    /// Create a named free variable.
    pub fn var(name: impl Into<String>) -> Self {
        Scalar::Variable(name.into())
    }

    /// Symbolic minimum of two expressions.
    pub fn min(self, other: impl Into<Scalar>) -> Self {
        Scalar::Min(Box::new(self), Box::new(other.into()))
    }

    /// Symbolic maximum of two expressions.
    pub fn max(self, other: impl Into<Scalar>) -> Self {
        Scalar::Max(Box::new(self), Box::new(other.into()))
    }

    /// Check if this expression contains any free variables.
    pub fn is_symbolic(&self) -> bool {
        match self {
            Scalar::Literal(_) => false,
            Scalar::Variable(_) => true,
            Scalar::Neg(e) => e.is_symbolic(),
            Scalar::Add(a, b)
            | Scalar::Sub(a, b)
            | Scalar::Mul(a, b)
            | Scalar::Div(a, b)
            | Scalar::Min(a, b)
            | Scalar::Max(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Get all free variable names in this expression.
    pub fn variables(&self) -> HashSet<String> {
        let mut set = HashSet::new();
        self.collect_variables(&mut set);
        set
    }

    fn collect_variables(&self, set: &mut HashSet<String>) {
        match self {
            Scalar::Literal(_) => {}
            Scalar::Variable(name) => {
                set.insert(name.clone());
            }
            Scalar::Neg(e) => e.collect_variables(set),
            Scalar::Add(a, b)
            | Scalar::Sub(a, b)
            | Scalar::Mul(a, b)
            | Scalar::Div(a, b)
            | Scalar::Min(a, b)
            | Scalar::Max(a, b) => {
                a.collect_variables(set);
                b.collect_variables(set);
            }
        }
    }

    /// Evaluate under the given bindings.
    ///
    /// Every free variable must be bound to a number; an unbound variable
    /// is an error, never a silent default. A variable bound to a per-site
    /// vector cannot appear in scalar position.
    pub fn evaluate(&self, assignments: &Assignments) -> crate::IrResult<f64> {
        match self {
            Scalar::Literal(v) => Ok(*v),
            Scalar::Variable(name) => match assignments.get(name) {
                Some(AssignedValue::Number(v)) => Ok(*v),
                Some(AssignedValue::Vector(_)) => {
                    Err(crate::IrError::NonScalarVariable(name.clone()))
                }
                None => Err(crate::IrError::UnboundVariable(name.clone())),
            },
            Scalar::Neg(e) => Ok(-e.evaluate(assignments)?),
            Scalar::Add(a, b) => Ok(a.evaluate(assignments)? + b.evaluate(assignments)?),
            Scalar::Sub(a, b) => Ok(a.evaluate(assignments)? - b.evaluate(assignments)?),
            Scalar::Mul(a, b) => Ok(a.evaluate(assignments)? * b.evaluate(assignments)?),
            Scalar::Div(a, b) => {
                let divisor = b.evaluate(assignments)?;
                if divisor == 0.0 {
                    return Err(crate::IrError::DivisionByZero(self.to_string()));
                }
                Ok(a.evaluate(assignments)? / divisor)
            }
            Scalar::Min(a, b) => Ok(a.evaluate(assignments)?.min(b.evaluate(assignments)?)),
            Scalar::Max(a, b) => Ok(a.evaluate(assignments)?.max(b.evaluate(assignments)?)),
        }
    }

    /// Replace bound variables with literals, leaving unbound ones intact.
    ///
    /// Partial substitution is legal; the missing-variable error only
    /// surfaces when a final numeric [`evaluate`](Self::evaluate) is
    /// attempted.
    pub fn substitute(&self, assignments: &Assignments) -> Scalar {
        match self {
            Scalar::Literal(_) => self.clone(),
            Scalar::Variable(name) => match assignments.get(name) {
                Some(AssignedValue::Number(v)) => Scalar::Literal(*v),
                _ => self.clone(),
            },
            Scalar::Neg(e) => Scalar::Neg(Box::new(e.substitute(assignments))),
            Scalar::Add(a, b) => Scalar::Add(
                Box::new(a.substitute(assignments)),
                Box::new(b.substitute(assignments)),
            ),
            Scalar::Sub(a, b) => Scalar::Sub(
                Box::new(a.substitute(assignments)),
                Box::new(b.substitute(assignments)),
            ),
            Scalar::Mul(a, b) => Scalar::Mul(
                Box::new(a.substitute(assignments)),
                Box::new(b.substitute(assignments)),
            ),
            Scalar::Div(a, b) => Scalar::Div(
                Box::new(a.substitute(assignments)),
                Box::new(b.substitute(assignments)),
            ),
            Scalar::Min(a, b) => Scalar::Min(
                Box::new(a.substitute(assignments)),
                Box::new(b.substitute(assignments)),
            ),
            Scalar::Max(a, b) => Scalar::Max(
                Box::new(a.substitute(assignments)),
                Box::new(b.substitute(assignments)),
            ),
        }
    }

    /// Try to fold to a concrete value without any bindings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Literal(v) => Some(*v),
            Scalar::Variable(_) => None,
            Scalar::Neg(e) => e.as_f64().map(|v| -v),
            Scalar::Add(a, b) => Some(a.as_f64()? + b.as_f64()?),
            Scalar::Sub(a, b) => Some(a.as_f64()? - b.as_f64()?),
            Scalar::Mul(a, b) => Some(a.as_f64()? * b.as_f64()?),
            Scalar::Div(a, b) => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                Some(a.as_f64()? / divisor)
            }
            Scalar::Min(a, b) => Some(a.as_f64()?.min(b.as_f64()?)),
            Scalar::Max(a, b) => Some(a.as_f64()?.max(b.as_f64()?)),
        }
    }

    /// Simplify the expression by folding constant subexpressions.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.as_f64() {
            return Scalar::Literal(v);
        }
        match self {
            Scalar::Neg(e) => Scalar::Neg(Box::new(e.simplify())),
            Scalar::Add(a, b) => Scalar::Add(Box::new(a.simplify()), Box::new(b.simplify())),
            Scalar::Sub(a, b) => Scalar::Sub(Box::new(a.simplify()), Box::new(b.simplify())),
            Scalar::Mul(a, b) => Scalar::Mul(Box::new(a.simplify()), Box::new(b.simplify())),
            Scalar::Div(a, b) => Scalar::Div(Box::new(a.simplify()), Box::new(b.simplify())),
            Scalar::Min(a, b) => Scalar::Min(Box::new(a.simplify()), Box::new(b.simplify())),
            Scalar::Max(a, b) => Scalar::Max(Box::new(a.simplify()), Box::new(b.simplify())),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Literal(v) => write!(f, "{v}"),
            Scalar::Variable(name) => write!(f, "{name}"),
            Scalar::Neg(e) => write!(f, "-({e})"),
            Scalar::Add(a, b) => write!(f, "({a} + {b})"),
            Scalar::Sub(a, b) => write!(f, "({a} - {b})"),
            Scalar::Mul(a, b) => write!(f, "({a} * {b})"),
            Scalar::Div(a, b) => write!(f, "({a} / {b})"),
            Scalar::Min(a, b) => write!(f, "min({a}, {b})"),
            Scalar::Max(a, b) => write!(f, "max({a}, {b})"),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Literal(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Literal(f64::from(value))
    }
}

impl From<&str> for Scalar {
    fn from(name: &str) -> Self {
        Scalar::Variable(name.to_string())
    }
}

impl std::ops::Add for Scalar {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Scalar::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for Scalar {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Scalar::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for Scalar {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Scalar::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for Scalar {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Scalar::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for Scalar {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Scalar::Neg(Box::new(self))
    }
}

/// A half-open time window used to slice waveforms and sequences.
///
/// `None` bounds default to the start (resp. end) of the sliced expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Start of the window; `None` means 0.
    pub start: Option<Scalar>,
    /// Stop of the window; `None` means the full duration.
    pub stop: Option<Scalar>,
}

impl Interval {
    /// Create an interval from optional bounds.
    pub fn new(start: Option<Scalar>, stop: Option<Scalar>) -> Self {
        Self { start, stop }
    }

    /// Symbolic width of the interval, given the duration of the sliced
    /// expression to fill in missing bounds.
    pub fn width(&self, full_duration: &Scalar) -> Scalar {
        let start = self.start.clone().unwrap_or(Scalar::Literal(0.0));
        let stop = self.stop.clone().unwrap_or_else(|| full_duration.clone());
        stop - start
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.start, &self.stop) {
            (Some(start), Some(stop)) => write!(f, "{start}..{stop}"),
            (Some(start), None) => write!(f, "{start}.."),
            (None, Some(stop)) => write!(f, "..{stop}"),
            (None, None) => write!(f, ".."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, f64)]) -> Assignments {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), AssignedValue::Number(*value)))
            .collect()
    }

    #[test]
    fn test_literal() {
        let s = Scalar::literal(1.5);
        assert!(!s.is_symbolic());
        assert_eq!(s.as_f64(), Some(1.5));
    }

    #[test]
    fn test_variable() {
        let s = Scalar::var("omega");
        assert!(s.is_symbolic());
        assert_eq!(s.as_f64(), None);
        assert!(s.variables().contains("omega"));
    }

    #[test]
    fn test_evaluate_unbound_fails() {
        let s = Scalar::var("t") + Scalar::literal(1.0);
        let err = s.evaluate(&Assignments::default()).unwrap_err();
        assert!(matches!(err, crate::IrError::UnboundVariable(name) if name == "t"));
    }

    #[test]
    fn test_evaluate_bound() {
        let s = Scalar::var("t") * Scalar::literal(2.0);
        let value = s.evaluate(&bindings(&[("t", 3.0)])).unwrap();
        assert!((value - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_vector_in_scalar_position_fails() {
        let mut assignments = Assignments::default();
        assignments.insert("mask".to_string(), AssignedValue::Vector(vec![1.0, 0.0]));
        let err = Scalar::var("mask").evaluate(&assignments).unwrap_err();
        assert!(matches!(err, crate::IrError::NonScalarVariable(_)));
    }

    #[test]
    fn test_partial_substitution() {
        let s = Scalar::var("a") + Scalar::var("b");
        let sub = s.substitute(&bindings(&[("a", 1.0)]));
        assert!(sub.is_symbolic());
        assert_eq!(sub.variables().len(), 1);
        let value = sub.evaluate(&bindings(&[("b", 2.0)])).unwrap();
        assert!((value - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_simplify_folds_literals() {
        let s = (Scalar::literal(2.0) + Scalar::literal(3.0)) * Scalar::var("x");
        let simplified = s.simplify();
        match simplified {
            Scalar::Mul(lhs, _) => assert_eq!(lhs.as_f64(), Some(5.0)),
            other => panic!("expected Mul, got {other:?}"),
        }
    }

    #[test]
    fn test_division_by_zero() {
        let s = Scalar::literal(1.0) / Scalar::literal(0.0);
        assert!(matches!(
            s.evaluate(&Assignments::default()),
            Err(crate::IrError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_min_max() {
        let s = Scalar::literal(2.0).min(Scalar::literal(5.0));
        assert_eq!(s.as_f64(), Some(2.0));
        let s = Scalar::literal(2.0).max(Scalar::literal(5.0));
        assert_eq!(s.as_f64(), Some(5.0));
    }

    #[test]
    fn test_interval_width() {
        let interval = Interval::new(Some(Scalar::literal(0.5)), None);
        let width = interval.width(&Scalar::literal(2.0));
        assert_eq!(width.simplify().as_f64(), Some(1.5));
    }
}
