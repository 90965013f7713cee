//! Leaf expressions: exact multivariate polynomials over the rationals.
//!
//! An [`Expr`] is a sum of products `c · x₁^e₁ · … · xₙ^eₙ` kept in a
//! canonical form (sorted monomials, no zero coefficients), so two equal
//! polynomials are always structurally equal. This is what lets the registry
//! hash-cons terminal nodes.
//!
//! Besides ring arithmetic the layer provides the two closed forms the
//! elimination engine needs:
//!
//! - [`Expr::sum_over`]: `Σ_{v=l}^{u} p(v)` for integer `v`, via Faulhaber's formula,
//! - [`Expr::integrate_over`]: `∫_l^u p(v) dv`.
//!
//! # Examples
//!
//! ```
//! use xadd_rs::expr::{int, Expr};
//!
//! let p: Expr = "2*x + 3*y".parse().unwrap();
//! let s = p.sum_over("x", &Expr::integer(0), &Expr::integer(2));
//! // (0 + 2 + 4) + 3 * 3y
//! assert_eq!(s, "6 + 9*y".parse().unwrap());
//! assert_eq!(Expr::integer(7).constant_value(), Some(int(7)));
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::error::{Result, XaddError};

/// Shorthand for an integral rational.
pub fn int(value: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(value))
}

/// A power product `x₁^e₁ · … · xₙ^eₙ` (all exponents positive).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Monomial(BTreeMap<String, u32>);

impl Monomial {
    /// The empty product.
    pub fn one() -> Self {
        Self::default()
    }

    pub fn var(name: impl Into<String>) -> Self {
        Monomial(BTreeMap::from([(name.into(), 1)]))
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    pub fn degree(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn exponent(&self, var: &str) -> u32 {
        self.0.get(var).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.0.iter().map(|(v, &e)| (v.as_str(), e))
    }

    fn mul(&self, other: &Monomial) -> Monomial {
        let mut powers = self.0.clone();
        for (v, &e) in &other.0 {
            *powers.entry(v.clone()).or_insert(0) += e;
        }
        Monomial(powers)
    }

    /// Split off the power of `var`.
    fn split(&self, var: &str) -> (u32, Monomial) {
        let mut rest = self.0.clone();
        let e = rest.remove(var).unwrap_or(0);
        (e, Monomial(rest))
    }
}

impl Display for Monomial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_one() {
            return write!(f, "1");
        }
        for (i, (v, e)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            if e == 1 {
                write!(f, "{}", v)?;
            } else {
                write!(f, "{}^{}", v, e)?;
            }
        }
        Ok(())
    }
}

/// A polynomial with rational coefficients in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Expr {
    terms: BTreeMap<Monomial, BigRational>,
}

impl Expr {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(BigRational::one())
    }

    pub fn constant(value: BigRational) -> Self {
        Self::term(value, Monomial::one())
    }

    pub fn integer(value: i64) -> Self {
        Self::constant(int(value))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::term(BigRational::one(), Monomial::var(name))
    }

    pub fn term(coefficient: BigRational, monomial: Monomial) -> Self {
        let mut e = Self::zero();
        e.add_term(monomial, coefficient);
        e
    }

    fn add_term(&mut self, monomial: Monomial, coefficient: BigRational) {
        if coefficient.is_zero() {
            return;
        }
        let c = self.terms.entry(monomial.clone()).or_insert_with(BigRational::zero);
        *c += coefficient;
        if c.is_zero() {
            self.terms.remove(&monomial);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_constant(&self) -> bool {
        self.terms.keys().all(Monomial::is_one)
    }

    /// The value of a constant polynomial, `None` if any variable occurs.
    pub fn constant_value(&self) -> Option<BigRational> {
        if !self.is_constant() {
            return None;
        }
        Some(self.terms.get(&Monomial::one()).cloned().unwrap_or_else(BigRational::zero))
    }

    /// Total degree (`0` for constants, including zero).
    pub fn degree(&self) -> u32 {
        self.terms.keys().map(Monomial::degree).max().unwrap_or(0)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &BigRational)> + '_ {
        self.terms.iter()
    }

    pub fn variables(&self) -> BTreeSet<String> {
        self.terms
            .keys()
            .flat_map(|m| m.iter().map(|(v, _)| v.to_string()))
            .collect()
    }

    pub fn contains(&self, var: &str) -> bool {
        self.terms.keys().any(|m| m.exponent(var) > 0)
    }

    pub fn scale(&self, factor: &BigRational) -> Expr {
        if factor.is_zero() {
            return Expr::zero();
        }
        Expr {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), c * factor)).collect(),
        }
    }

    pub fn pow(&self, n: u32) -> Expr {
        let mut result = Expr::one();
        for _ in 0..n {
            result = &result * self;
        }
        result
    }

    /// Decompose a polynomial of degree at most one into `(coefficients, constant)`.
    pub fn linear_parts(&self) -> Option<(BTreeMap<String, BigRational>, BigRational)> {
        if self.degree() > 1 {
            return None;
        }
        let mut coefficients = BTreeMap::new();
        let mut constant = BigRational::zero();
        for (m, c) in &self.terms {
            match m.iter().next() {
                None => constant = c.clone(),
                Some((v, _)) => {
                    coefficients.insert(v.to_string(), c.clone());
                }
            }
        }
        Some((coefficients, constant))
    }

    /// Replace variables by polynomials; unmapped variables stay symbolic.
    pub fn substitute(&self, replacements: &HashMap<String, Expr>) -> Expr {
        let mut result = Expr::zero();
        for (m, c) in &self.terms {
            let mut product = Expr::constant(c.clone());
            let mut kept = Monomial::one();
            for (v, e) in m.iter() {
                match replacements.get(v) {
                    Some(r) => product = &product * &r.pow(e),
                    None => {
                        kept.0.insert(v.to_string(), e);
                    }
                }
            }
            result = &result + &(&product * &Expr::term(BigRational::one(), kept));
        }
        result
    }

    pub fn substitute_values(&self, values: &HashMap<String, BigRational>) -> Expr {
        let replacements = values
            .iter()
            .filter(|(v, _)| self.contains(v))
            .map(|(v, value)| (v.clone(), Expr::constant(value.clone())))
            .collect::<HashMap<_, _>>();
        if replacements.is_empty() {
            return self.clone();
        }
        self.substitute(&replacements)
    }

    pub fn rename(&self, mapping: &HashMap<String, String>) -> Expr {
        let mut result = Expr::zero();
        for (m, c) in &self.terms {
            let mut renamed = Monomial::one();
            for (v, e) in m.iter() {
                let name = mapping.get(v).cloned().unwrap_or_else(|| v.to_string());
                *renamed.0.entry(name).or_insert(0) += e;
            }
            result.add_term(renamed, c.clone());
        }
        result
    }

    pub fn evaluate(&self, values: &HashMap<String, BigRational>) -> Result<BigRational> {
        let mut total = BigRational::zero();
        for (m, c) in &self.terms {
            let mut product = c.clone();
            for (v, e) in m.iter() {
                let value = values
                    .get(v)
                    .ok_or_else(|| XaddError::UnassignedVariable(v.to_string()))?;
                for _ in 0..e {
                    product *= value;
                }
            }
            total += product;
        }
        Ok(total)
    }

    /// View the polynomial as `Σ_k a_k · var^k`; returns the map `k ↦ a_k`.
    pub fn collect(&self, var: &str) -> BTreeMap<u32, Expr> {
        let mut result: BTreeMap<u32, Expr> = BTreeMap::new();
        for (m, c) in &self.terms {
            let (e, rest) = m.split(var);
            result.entry(e).or_default().add_term(rest, c.clone());
        }
        result
    }

    /// Closed form of `Σ_{var = lower}^{upper} self` over the integers.
    ///
    /// `lower` and `upper` must not mention `var` and are assumed to take
    /// integral values. For `upper = lower - 1` the result is zero; more
    /// inverted ranges are the caller's business.
    pub fn sum_over(&self, var: &str, lower: &Expr, upper: &Expr) -> Expr {
        debug_assert!(!lower.contains(var) && !upper.contains(var));
        let below = lower - &Expr::one();
        let mut result = Expr::zero();
        for (k, coefficient) in self.collect(var) {
            let s = power_sum(k);
            let delta = &horner(&s, upper) - &horner(&s, &below);
            result = &result + &(&coefficient * &delta);
        }
        result
    }

    /// Closed form of `∫_{lower}^{upper} self d(var)`.
    pub fn integrate_over(&self, var: &str, lower: &Expr, upper: &Expr) -> Expr {
        debug_assert!(!lower.contains(var) && !upper.contains(var));
        let mut result = Expr::zero();
        for (k, coefficient) in self.collect(var) {
            let antiderivative = &upper.pow(k + 1) - &lower.pow(k + 1);
            let factor = BigRational::new(BigInt::one(), BigInt::from(k + 1));
            result = &result + &(&coefficient * &antiderivative.scale(&factor));
        }
        result
    }
}

/// Evaluate `Σ_j coefficients[j] · x^j` symbolically.
fn horner(coefficients: &[BigRational], x: &Expr) -> Expr {
    let mut acc = Expr::zero();
    for c in coefficients.iter().rev() {
        acc = &(&acc * x) + &Expr::constant(c.clone());
    }
    acc
}

fn binomial(n: u32, k: u32) -> BigInt {
    let mut result = BigInt::one();
    for i in 0..k {
        result = result * BigInt::from(n - i) / BigInt::from(i + 1);
    }
    result
}

/// Bernoulli numbers `B_0..=B_m` with the `B_1 = -1/2` convention.
fn bernoulli(m: u32) -> Vec<BigRational> {
    let mut b: Vec<BigRational> = Vec::with_capacity(m as usize + 1);
    b.push(BigRational::one());
    for n in 1..=m {
        let mut acc = BigRational::zero();
        for (i, bi) in b.iter().enumerate() {
            acc += BigRational::from_integer(binomial(n + 1, i as u32)) * bi;
        }
        b.push(-acc / BigRational::from_integer(BigInt::from(n + 1)));
    }
    b
}

/// Coefficients (lowest degree first) of `S_k(n) = Σ_{j=1}^{n} j^k`.
///
/// `S_k(u) - S_k(l - 1) = Σ_{j=l}^{u} j^k` holds for every integer `l ≤ u + 1`,
/// negative bounds included, since `S_k(n) - S_k(n - 1) = n^k` is a polynomial identity.
fn power_sum(k: u32) -> Vec<BigRational> {
    let b = bernoulli(k);
    let mut coefficients = vec![BigRational::zero(); k as usize + 2];
    let scale = BigRational::new(BigInt::one(), BigInt::from(k + 1));
    for (i, bi) in b.iter().enumerate() {
        // Faulhaber uses B_1 = +1/2.
        let bi = if i == 1 { -bi.clone() } else { bi.clone() };
        let c = BigRational::from_integer(binomial(k + 1, i as u32)) * bi * &scale;
        coefficients[(k + 1) as usize - i] += c;
    }
    coefficients
}

impl Add for &Expr {
    type Output = Expr;

    fn add(self, rhs: &Expr) -> Expr {
        let mut result = self.clone();
        for (m, c) in &rhs.terms {
            result.add_term(m.clone(), c.clone());
        }
        result
    }
}

impl Sub for &Expr {
    type Output = Expr;

    fn sub(self, rhs: &Expr) -> Expr {
        let mut result = self.clone();
        for (m, c) in &rhs.terms {
            result.add_term(m.clone(), -c.clone());
        }
        result
    }
}

impl Mul for &Expr {
    type Output = Expr;

    fn mul(self, rhs: &Expr) -> Expr {
        let mut result = Expr::zero();
        for (m1, c1) in &self.terms {
            for (m2, c2) in &rhs.terms {
                result.add_term(m1.mul(m2), c1 * c2);
            }
        }
        result
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        self.scale(&-BigRational::one())
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        &self + &rhs
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        &self - &rhs
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        &self * &rhs
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        -&self
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::integer(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::integer(value.into())
    }
}

impl From<BigRational> for Expr {
    fn from(value: BigRational) -> Self {
        Expr::constant(value)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        // Highest degree first.
        let mut terms: Vec<_> = self.terms.iter().collect();
        terms.sort_by(|(a, _), (b, _)| b.degree().cmp(&a.degree()).then_with(|| a.cmp(b)));
        for (i, (m, c)) in terms.into_iter().enumerate() {
            let magnitude = c.abs();
            if i == 0 {
                if c.is_negative() {
                    write!(f, "-")?;
                }
            } else if c.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            if m.is_one() {
                write!(f, "{}", magnitude)?;
            } else if magnitude.is_one() {
                write!(f, "{}", m)?;
            } else {
                write!(f, "{}*{}", magnitude, m)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Expr {
    type Err = XaddError;

    fn from_str(s: &str) -> Result<Self> {
        Parser::new(s).parse()
    }
}

/// Recursive-descent parser for polynomial text such as `"(ub - lb)**2 / 2 + 3*x"`.
///
/// ```text
/// expr  := term (('+' | '-') term)*
/// term  := unary (('*' | '/') unary)*
/// unary := ('-' | '+') unary | power
/// power := atom (('^' | '**') digits)?
/// atom  := number | identifier | '(' expr ')'
/// ```
struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> XaddError {
        XaddError::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    fn parse(mut self) -> Result<Expr> {
        let e = self.expr()?;
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(e)
    }

    fn peek(&mut self) -> Option<u8> {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        self.input.get(self.pos).copied()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.peek().is_some() && self.input[self.pos..].starts_with(token.as_bytes()) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut acc = self.term()?;
        loop {
            if self.eat("+") {
                acc = &acc + &self.term()?;
            } else if self.eat("-") {
                acc = &acc - &self.term()?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut acc = self.unary()?;
        loop {
            if self.eat("*") {
                acc = &acc * &self.unary()?;
            } else if self.eat("/") {
                let at = self.pos;
                let divisor = self.unary()?;
                match divisor.constant_value() {
                    Some(d) if !d.is_zero() => acc = acc.scale(&d.recip()),
                    Some(_) => {
                        return Err(XaddError::Parse {
                            position: at,
                            message: "division by zero".to_string(),
                        })
                    }
                    None => {
                        return Err(XaddError::Parse {
                            position: at,
                            message: format!("division by non-constant `{}`", divisor),
                        })
                    }
                }
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat("-") {
            Ok(-self.unary()?)
        } else if self.eat("+") {
            self.unary()
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.atom()?;
        if self.eat("**") || self.eat("^") {
            self.peek();
            let digits = self.take_while(|c| c.is_ascii_digit());
            let exponent = digits
                .parse::<u32>()
                .map_err(|_| self.error("expected a non-negative integer exponent"))?;
            return Ok(base.pow(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let e = self.expr()?;
                if !self.eat(")") {
                    return Err(self.error("expected `)`"));
                }
                Ok(e)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
                Ok(Expr::var(name))
            }
            Some(c) => Err(self.error(format!("unexpected character `{}`", c as char))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn number(&mut self) -> Result<Expr> {
        let whole = self.take_while(|c| c.is_ascii_digit());
        let fraction = if self.input.get(self.pos) == Some(&b'.') {
            self.pos += 1;
            self.take_while(|c| c.is_ascii_digit())
        } else {
            String::new()
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(self.error("malformed number"));
        }
        let digits = format!("{}{}", whole, fraction);
        let numerator = digits
            .parse::<BigInt>()
            .map_err(|_| self.error("malformed number"))?;
        let denominator = num_traits::pow(BigInt::from(10), fraction.len());
        Ok(Expr::constant(BigRational::new(numerator, denominator)))
    }

    fn take_while(&mut self, predicate: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.pos < self.input.len() && predicate(self.input[self.pos]) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }
}
