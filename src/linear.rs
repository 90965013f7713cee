//! Linear tests: normalized inequalities `Σ cᵢ·xᵢ ≤ k` (or `< k`).
//!
//! Only `≤` and `<` are stored. With that convention the sign of a
//! variable's coefficient says everything about the bound the test puts on
//! it: positive means the test is an upper bound on the variable, negative a
//! lower bound. `>` and `≥` are rewritten on construction.
//!
//! A test whose variables are all discrete is *integral*: its coefficients
//! are scaled to coprime integers and strict relations are tightened
//! (`Σ c·x < k` becomes `Σ c·x ≤ k - 1`), so integral tests are never strict.
//!
//! The pairwise elimination [`LinearTest::resolve`] is one Fourier–Motzkin
//! step; [`feasible`] iterates it to decide rational feasibility of a
//! conjunction, which the reduction pass uses for entailment.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::error::{Result, XaddError};
use crate::expr::{Expr, Monomial};

/// Relation of a user-written comparison `lhs ⊙ rhs`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Relation {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl FromStr for Relation {
    type Err = XaddError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "<" => Ok(Relation::Lt),
            "<=" => Ok(Relation::Le),
            ">" => Ok(Relation::Gt),
            ">=" => Ok(Relation::Ge),
            "=" | "==" => Ok(Relation::Eq),
            other => Err(XaddError::InvalidTest(format!("unknown relation `{}`", other))),
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Relation::Lt => "<",
            Relation::Le => "<=",
            Relation::Gt => ">",
            Relation::Ge => ">=",
            Relation::Eq => "=",
        };
        write!(f, "{}", s)
    }
}

/// Which side of a variable a test bounds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BoundKind {
    Upper,
    Lower,
}

impl Display for BoundKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundKind::Upper => write!(f, "upper"),
            BoundKind::Lower => write!(f, "lower"),
        }
    }
}

/// Result of building or combining tests: a proper test or a constant truth value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    True,
    False,
    Test(LinearTest),
}

impl Outcome {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Outcome::True
        } else {
            Outcome::False
        }
    }
}

/// `Σ coefficients[x]·x ≤ constant`, or `<` when `strict`.
///
/// # Invariants
///
/// - At least one coefficient, none of them zero.
/// - Continuous tests: the first coefficient (in name order) has magnitude one.
/// - Integral tests: coprime integer coefficients, integer constant, never strict.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct LinearTest {
    coefficients: BTreeMap<String, BigRational>,
    constant: BigRational,
    strict: bool,
    integral: bool,
}

impl LinearTest {
    /// Normalize `Σ c·x ≤ k` (`< k` when `strict`) without changing its direction.
    pub fn build(
        mut coefficients: BTreeMap<String, BigRational>,
        constant: BigRational,
        strict: bool,
        integral: bool,
    ) -> Outcome {
        coefficients.retain(|_, c| !c.is_zero());
        if coefficients.is_empty() {
            let holds = if strict {
                constant.is_positive()
            } else {
                !constant.is_negative()
            };
            return Outcome::from_bool(holds);
        }

        if integral {
            let denominators = coefficients
                .values()
                .fold(BigInt::one(), |acc, c| acc.lcm(c.denom()));
            let numerators: Vec<BigInt> = coefficients
                .values()
                .map(|c| (c * BigRational::from_integer(denominators.clone())).to_integer())
                .collect();
            let g = numerators.iter().fold(BigInt::zero(), |acc, n| acc.gcd(n));
            let k = constant * BigRational::from_integer(denominators) / BigRational::from_integer(g.clone());
            let k = if strict {
                k.ceil() - BigRational::one()
            } else {
                k.floor()
            };
            let coefficients = coefficients
                .into_keys()
                .zip(numerators)
                .map(|(v, n)| (v, BigRational::from_integer(n / &g)))
                .collect();
            return Outcome::Test(LinearTest {
                coefficients,
                constant: k,
                strict: false,
                integral: true,
            });
        }

        let scale = coefficients.values().next().map(|c| c.abs().recip()).unwrap_or_else(BigRational::one);
        let coefficients = coefficients.into_iter().map(|(v, c)| (v, c * &scale)).collect();
        Outcome::Test(LinearTest {
            coefficients,
            constant: constant * scale,
            strict,
            integral: false,
        })
    }

    /// Build `lhs ⊙ rhs`.
    ///
    /// Fails with [`XaddError::InvalidTest`] for non-linear terms and for `=`,
    /// which has no single-test complement; the builder expands `=` instead.
    pub fn compare(lhs: &Expr, relation: Relation, rhs: &Expr, integral: bool) -> Result<Outcome> {
        let difference = lhs - rhs;
        let (coefficients, constant) = difference
            .linear_parts()
            .ok_or_else(|| XaddError::InvalidTest(format!("`{} {} {}` is not linear", lhs, relation, rhs)))?;
        let negated = || coefficients.iter().map(|(v, c)| (v.clone(), -c)).collect();
        let outcome = match relation {
            // Σ c·x + k0 ≤ 0  ⇔  Σ c·x ≤ -k0
            Relation::Le => Self::build(coefficients.clone(), -constant, false, integral),
            Relation::Lt => Self::build(coefficients.clone(), -constant, true, integral),
            // Σ c·x + k0 ≥ 0  ⇔  Σ -c·x ≤ k0
            Relation::Ge => Self::build(negated(), constant, false, integral),
            Relation::Gt => Self::build(negated(), constant, true, integral),
            Relation::Eq => {
                return Err(XaddError::InvalidTest(format!(
                    "`{} = {}` is an equality; build it as a conjunction",
                    lhs, rhs
                )))
            }
        };
        Ok(outcome)
    }

    pub fn coefficients(&self) -> &BTreeMap<String, BigRational> {
        &self.coefficients
    }

    pub fn coefficient(&self, var: &str) -> BigRational {
        self.coefficients.get(var).cloned().unwrap_or_else(BigRational::zero)
    }

    pub fn constant(&self) -> &BigRational {
        &self.constant
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_integral(&self) -> bool {
        self.integral
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.coefficients.keys().map(String::as_str)
    }

    pub fn mentions(&self, var: &str) -> bool {
        self.coefficients.contains_key(var)
    }

    /// The complementary test `¬self`, normalized but not sign-canonical.
    pub fn complement(&self) -> LinearTest {
        let coefficients = self.coefficients.iter().map(|(v, c)| (v.clone(), -c)).collect();
        if self.integral {
            // ¬(Σ c·x ≤ k)  ⇔  Σ -c·x ≤ -k - 1
            LinearTest {
                coefficients,
                constant: -&self.constant - BigRational::one(),
                strict: false,
                integral: true,
            }
        } else {
            LinearTest {
                coefficients,
                constant: -&self.constant,
                strict: !self.strict,
                integral: false,
            }
        }
    }

    /// Sign-canonical form: the first coefficient is positive.
    ///
    /// Returns the canonical test and whether it is the complement of `self`.
    pub fn canonical(&self) -> (LinearTest, bool) {
        match self.coefficients.values().next() {
            Some(c) if c.is_negative() => (self.complement(), true),
            _ => (self.clone(), false),
        }
    }

    /// The kind of bound this test puts on `var`, if it mentions it.
    pub fn bound_kind(&self, var: &str) -> Option<BoundKind> {
        let c = self.coefficients.get(var)?;
        Some(if c.is_positive() {
            BoundKind::Upper
        } else {
            BoundKind::Lower
        })
    }

    /// Solve for `var`: `var ≤ bound` (upper) or `var ≥ bound` (lower).
    ///
    /// Strictness is dropped; callers needing it inspect [`is_strict`][Self::is_strict].
    pub fn bound(&self, var: &str) -> Option<(BoundKind, Expr)> {
        let kind = self.bound_kind(var)?;
        let c = &self.coefficients[var];
        let mut rest = Expr::constant(self.constant.clone());
        for (v, cv) in &self.coefficients {
            if v != var {
                rest = &rest - &Expr::term(cv.clone(), Monomial::var(v.clone()));
            }
        }
        Some((kind, rest.scale(&c.recip())))
    }

    pub fn holds(&self, values: &HashMap<String, BigRational>) -> Result<bool> {
        let mut lhs = BigRational::zero();
        for (v, c) in &self.coefficients {
            let value = values
                .get(v)
                .ok_or_else(|| XaddError::UnassignedVariable(v.clone()))?;
            lhs += c * value;
        }
        Ok(if self.strict {
            lhs < self.constant
        } else {
            lhs <= self.constant
        })
    }

    /// Fourier–Motzkin step: eliminate `var` between an upper and a lower bound on it.
    ///
    /// From `a·v + P ≤ k₁` (a > 0) and `-b·v + Q ≤ k₂` (b > 0) derive
    /// `b·P + a·Q ≤ b·k₁ + a·k₂`, strict if either input is.
    ///
    /// # Panics
    ///
    /// Panics with `BoundKindMismatch` unless `upper` is an upper bound and
    /// `lower` a lower bound on `var`.
    pub fn resolve(upper: &LinearTest, lower: &LinearTest, var: &str) -> Outcome {
        let (a, b) = match (upper.bound_kind(var), lower.bound_kind(var)) {
            (Some(BoundKind::Upper), Some(BoundKind::Lower)) => (upper.coefficient(var), -lower.coefficient(var)),
            (u, l) => panic!(
                "BoundKindMismatch: resolving `{}` ({:?}) against `{}` ({:?}) on `{}`",
                upper, u, lower, l, var
            ),
        };
        let mut coefficients: BTreeMap<String, BigRational> = BTreeMap::new();
        for (v, c) in upper.coefficients.iter().filter(|(v, _)| v.as_str() != var) {
            *coefficients.entry(v.clone()).or_insert_with(BigRational::zero) += c * &b;
        }
        for (v, c) in lower.coefficients.iter().filter(|(v, _)| v.as_str() != var) {
            *coefficients.entry(v.clone()).or_insert_with(BigRational::zero) += c * &a;
        }
        let constant = &upper.constant * &b + &lower.constant * &a;
        Self::build(
            coefficients,
            constant,
            upper.strict || lower.strict,
            upper.integral && lower.integral,
        )
    }

    /// The left-hand side `Σ c·x` as a polynomial.
    pub fn lhs(&self) -> Expr {
        self.coefficients.iter().fold(Expr::zero(), |acc, (v, c)| {
            &acc + &Expr::term(c.clone(), Monomial::var(v.clone()))
        })
    }
}

impl Display for LinearTest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let relation = if self.strict { "<" } else { "<=" };
        write!(f, "{} {} {}", self.lhs(), relation, self.constant)
    }
}

/// Decide whether a conjunction of tests has a rational solution.
///
/// Integral tests are tightened at every step, so a `false` answer also
/// rules out integer solutions; a `true` answer may be a relaxation.
pub fn feasible(constraints: &[LinearTest]) -> bool {
    let mut current: Vec<LinearTest> = constraints.to_vec();
    loop {
        let var = match current.iter().find_map(|t| t.coefficients.keys().next()) {
            Some(v) => v.clone(),
            None => return true,
        };

        let mut uppers = Vec::new();
        let mut lowers = Vec::new();
        let mut rest = Vec::new();
        for t in current {
            match t.bound_kind(&var) {
                Some(BoundKind::Upper) => uppers.push(t),
                Some(BoundKind::Lower) => lowers.push(t),
                None => rest.push(t),
            }
        }

        for u in &uppers {
            for l in &lowers {
                match LinearTest::resolve(u, l, &var) {
                    Outcome::False => return false,
                    Outcome::True => {}
                    Outcome::Test(t) => {
                        if !rest.contains(&t) {
                            rest.push(t);
                        }
                    }
                }
            }
        }
        current = rest;
    }
}

/// Indices of the constraints reachable from `vars` through shared variables.
///
/// Constraints outside that set share no variable with it, so for a
/// feasible conjunction they never change what is entailed over `vars`.
pub fn connected(constraints: &[LinearTest], vars: &BTreeSet<String>) -> Vec<usize> {
    let mut reached: BTreeSet<&str> = vars.iter().map(String::as_str).collect();
    let mut chosen = vec![false; constraints.len()];
    loop {
        let mut changed = false;
        for (i, c) in constraints.iter().enumerate() {
            if !chosen[i] && c.variables().any(|v| reached.contains(v)) {
                chosen[i] = true;
                reached.extend(c.variables());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    (0..constraints.len()).filter(|&i| chosen[i]).collect()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::expr::int;

    fn test(lhs: &str, relation: &str, rhs: &str, integral: bool) -> LinearTest {
        let lhs: Expr = lhs.parse().unwrap();
        let rhs: Expr = rhs.parse().unwrap();
        match LinearTest::compare(&lhs, relation.parse().unwrap(), &rhs, integral).unwrap() {
            Outcome::Test(t) => t,
            other => panic!("expected a proper test, got {:?}", other),
        }
    }

    #[test]
    fn test_direction_normalization() {
        let t = test("x", ">=", "3", false);
        assert_eq!(t.coefficient("x"), int(-1));
        assert_eq!(t.constant(), &int(-3));
        assert_eq!(t.bound_kind("x"), Some(BoundKind::Lower));
        assert_eq!(t.to_string(), "-x <= -3");
    }

    #[test]
    fn test_integral_tightening() {
        // 2x < 5  ⇔  x <= 2
        let t = test("2*x", "<", "5", true);
        assert_eq!(t.coefficient("x"), int(1));
        assert_eq!(t.constant(), &int(2));
        assert!(!t.is_strict());

        // x <= 2.5  ⇔  x <= 2
        let t = test("x", "<=", "2.5", true);
        assert_eq!(t.constant(), &int(2));
    }

    #[test]
    fn test_continuous_scaling() {
        let t = test("2*x + 4*y", "<", "6", false);
        assert_eq!(t.coefficient("x"), int(1));
        assert_eq!(t.coefficient("y"), int(2));
        assert_eq!(t.constant(), &int(3));
        assert!(t.is_strict());
    }

    #[test]
    fn test_complement() {
        let t = test("x", "<=", "5", true);
        let n = t.complement();
        // ¬(x <= 5) ⇔ x >= 6
        assert_eq!(n, test("x", ">=", "6", true));
        assert_eq!(n.complement(), t);

        let t = test("x", "<=", "5", false);
        assert_eq!(t.complement(), test("x", ">", "5", false));
    }

    #[test]
    fn test_canonical() {
        let t = test("x", ">", "5", false);
        let (c, negated) = t.canonical();
        assert!(negated);
        assert_eq!(c, test("x", "<=", "5", false));
        let (c2, negated2) = c.canonical();
        assert!(!negated2);
        assert_eq!(c2, c);
    }

    #[test]
    fn test_trivial_comparisons() {
        let zero = Expr::zero();
        let five = Expr::integer(5);
        assert_eq!(LinearTest::compare(&zero, Relation::Le, &five, true).unwrap(), Outcome::True);
        assert_eq!(LinearTest::compare(&five, Relation::Lt, &five, false).unwrap(), Outcome::False);
    }

    #[test]
    fn test_invalid_tests() {
        let xy: Expr = "x*y".parse().unwrap();
        assert!(matches!(
            LinearTest::compare(&xy, Relation::Le, &Expr::zero(), false),
            Err(XaddError::InvalidTest(_))
        ));
        assert!(matches!(
            LinearTest::compare(&Expr::var("x"), Relation::Eq, &Expr::zero(), false),
            Err(XaddError::InvalidTest(_))
        ));
    }

    #[test]
    fn test_bound() {
        // x + y <= 4  ⇒  x <= 4 - y
        let t = test("x + y", "<=", "4", true);
        let (kind, bound) = t.bound("x").unwrap();
        assert_eq!(kind, BoundKind::Upper);
        assert_eq!(bound, "4 - y".parse().unwrap());

        // x >= y  ⇔  y - x <= 0  ⇒  x >= y
        let t = test("x", ">=", "y", true);
        let (kind, bound) = t.bound("x").unwrap();
        assert_eq!(kind, BoundKind::Lower);
        assert_eq!(bound, Expr::var("y"));
        assert!(t.bound("z").is_none());
    }

    #[test]
    fn test_resolve() {
        // x <= a and x >= 2  ⇒  2 <= a
        let upper = test("x", "<=", "a", true);
        let lower = test("x", ">=", "2", true);
        assert_eq!(LinearTest::resolve(&upper, &lower, "x"), Outcome::Test(test("a", ">=", "2", true)));

        // x <= 1 and x >= 3  ⇒  false
        let upper = test("x", "<=", "1", true);
        let lower = test("x", ">=", "3", true);
        assert_eq!(LinearTest::resolve(&upper, &lower, "x"), Outcome::False);

        // x <= 3 and x >= 1  ⇒  true
        let upper = test("x", "<=", "3", true);
        let lower = test("x", ">=", "1", true);
        assert_eq!(LinearTest::resolve(&upper, &lower, "x"), Outcome::True);
    }

    #[test]
    #[should_panic(expected = "BoundKindMismatch")]
    fn test_resolve_mismatch() {
        let a = test("x", "<=", "a", true);
        let b = test("x", "<=", "2", true);
        LinearTest::resolve(&a, &b, "x");
    }

    #[test]
    fn test_holds() {
        let t = test("x - y", "<", "1", false);
        let values = HashMap::from([("x".to_string(), int(3)), ("y".to_string(), int(2))]);
        assert!(!t.holds(&values).unwrap());
        let values = HashMap::from([("x".to_string(), int(2)), ("y".to_string(), int(2))]);
        assert!(t.holds(&values).unwrap());
    }

    #[test]
    fn test_feasible() {
        let a = test("x", ">=", "0", true);
        let b = test("x", "<=", "10", true);
        let c = test("x", ">=", "y", true);
        let d = test("y", ">=", "11", true);
        assert!(feasible(&[a.clone(), b.clone(), c.clone()]));
        assert!(!feasible(&[a, b, c, d]));

        // Integer tightening: 2x >= 1 and 2x <= 1 has a rational solution only.
        let e = test("2*x", ">=", "1", true);
        let f = test("2*x", "<=", "1", true);
        assert!(!feasible(&[e, f]));
        let g = test("2*x", ">=", "1", false);
        let h = test("2*x", "<=", "1", false);
        assert!(feasible(&[g, h]));
    }

    #[test]
    fn test_connected() {
        let constraints = [
            test("x", "<=", "z", true),
            test("z", "<=", "0", true),
            test("y", ">=", "1", true),
            test("w - y", "<=", "2", true),
        ];
        let vars = |names: &[&str]| names.iter().map(|v| v.to_string()).collect::<BTreeSet<_>>();
        // `z <= 0` matters for `x` only through `x <= z`.
        assert_eq!(connected(&constraints, &vars(&["x"])), vec![0, 1]);
        assert_eq!(connected(&constraints, &vars(&["w"])), vec![2, 3]);
        assert_eq!(connected(&constraints, &vars(&["v"])), Vec::<usize>::new());
        assert_eq!(connected(&constraints, &vars(&["z", "y"])), vec![0, 1, 2, 3]);
    }
}
