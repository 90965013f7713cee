//! Variable declarations and their position in the global order.
//!
//! Variables are identified by name. The order in which they are declared on
//! the [`Xadd`][crate::xadd::Xadd] registry is the fixed total order used to
//! sort tests; it never changes afterwards.

use std::fmt;

use num_rational::BigRational;

/// The domain a variable ranges over.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Domain {
    /// Integers: elimination sums.
    Discrete,
    /// Reals: elimination integrates.
    Continuous,
}

/// A declared variable.
///
/// # Invariants
///
/// - If both bounds are present, `lower <= upper`.
/// - Bounds of a discrete variable are integral.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub domain: Domain,
    pub lower: Option<BigRational>,
    pub upper: Option<BigRational>,
}

impl VarDecl {
    /// An unbounded integer variable.
    pub fn discrete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Discrete,
            lower: None,
            upper: None,
        }
    }

    /// An unbounded real variable.
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Continuous,
            lower: None,
            upper: None,
        }
    }

    /// Restricts the variable to `lower..=upper`.
    ///
    /// # Panics
    ///
    /// Panics if `lower > upper`, or if the variable is discrete and a bound is not an integer.
    pub fn with_bounds(mut self, lower: BigRational, upper: BigRational) -> Self {
        assert!(lower <= upper, "Empty domain [{}, {}] for `{}`", lower, upper, self.name);
        if self.is_discrete() {
            assert!(
                lower.is_integer() && upper.is_integer(),
                "Bounds of discrete variable `{}` must be integers",
                self.name
            );
        }
        self.lower = Some(lower);
        self.upper = Some(upper);
        self
    }

    pub fn is_discrete(&self) -> bool {
        self.domain == Domain::Discrete
    }
}

impl fmt::Display for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.domain {
            Domain::Discrete => "int",
            Domain::Continuous => "real",
        };
        write!(f, "{}: {}", self.name, kind)?;
        if self.lower.is_some() || self.upper.is_some() {
            let show = |b: &Option<BigRational>| b.as_ref().map_or("∞".to_string(), |b| b.to_string());
            write!(f, "[{}, {}]", show(&self.lower), show(&self.upper))?;
        }
        Ok(())
    }
}

/// A level in the variable ordering (0-indexed).
///
/// Level 0 is the first declared variable; tests over lower levels sit
/// closer to the root.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Level(usize);

impl Level {
    pub fn new(index: usize) -> Self {
        Level(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}
