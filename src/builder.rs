//! Convenience front end for building diagrams from text.
//!
//! ```
//! use xadd_rs::builder::Builder;
//! use xadd_rs::expr::int;
//! use xadd_rs::xadd::Xadd;
//!
//! let xadd = Xadd::default();
//! let b = Builder::new(&xadd);
//! b.ints(&["x"]).unwrap();
//!
//! let bounds = b.test("x", ">=", "0").unwrap().and(&b.test("x", "<=", "10").unwrap()).unwrap();
//! let f = b.ite(&bounds, &b.exp("x").unwrap(), &b.terminal(0)).unwrap();
//! let total = f.eliminate("x").unwrap();
//! assert_eq!(total.constant_value(), Some(int(55)));
//! ```

use log::debug;
use num_rational::BigRational;

use crate::diagram::Diagram;
use crate::error::{Result, XaddError};
use crate::expr::{int, Expr};
use crate::linear::Relation;
use crate::reference::NodeId;
use crate::types::VarDecl;
use crate::xadd::Xadd;

pub struct Builder<'a> {
    xadd: &'a Xadd,
}

impl<'a> Builder<'a> {
    pub fn new(xadd: &'a Xadd) -> Self {
        Self { xadd }
    }

    pub fn xadd(&self) -> &'a Xadd {
        self.xadd
    }

    /// Declare unbounded integer variables.
    pub fn ints(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.xadd.declare(VarDecl::discrete(*name))?;
        }
        Ok(())
    }

    /// Declare unbounded real variables.
    pub fn reals(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.xadd.declare(VarDecl::continuous(*name))?;
        }
        Ok(())
    }

    /// Declare an integer variable ranging over `lower..=upper`.
    pub fn int_var(&self, name: &str, lower: i64, upper: i64) -> Result<()> {
        if lower > upper {
            return Err(XaddError::InvalidTest(format!(
                "empty domain [{}, {}] for `{}`",
                lower, upper, name
            )));
        }
        self.xadd
            .declare(VarDecl::discrete(name).with_bounds(int(lower), int(upper)))?;
        Ok(())
    }

    /// Declare a real variable ranging over `[lower, upper]`.
    pub fn real_var(&self, name: &str, lower: BigRational, upper: BigRational) -> Result<()> {
        if lower > upper {
            return Err(XaddError::InvalidTest(format!(
                "empty domain [{}, {}] for `{}`",
                lower, upper, name
            )));
        }
        self.xadd
            .declare(VarDecl::continuous(name).with_bounds(lower, upper))?;
        Ok(())
    }

    fn wrap(&self, root: NodeId) -> Diagram<'a> {
        Diagram::new(self.xadd, root)
    }

    pub fn terminal(&self, value: impl Into<Expr>) -> Diagram<'a> {
        self.wrap(self.xadd.terminal(value.into()))
    }

    fn parse(&self, text: &str) -> Result<Expr> {
        let expr: Expr = text.parse()?;
        for v in expr.variables() {
            self.xadd.require(&v)?;
        }
        Ok(expr)
    }

    /// A leaf holding the polynomial `text`, over declared variables.
    pub fn exp(&self, text: &str) -> Result<Diagram<'a>> {
        Ok(self.terminal(self.parse(text)?))
    }

    /// The 0/1 diagram of `lhs ⊙ rhs`; `=` becomes the conjunction of `<=` and `>=`.
    pub fn test(&self, lhs: &str, relation: &str, rhs: &str) -> Result<Diagram<'a>> {
        debug!("test({} {} {})", lhs, relation, rhs);
        let lhs = self.parse(lhs)?;
        let rhs = self.parse(rhs)?;
        self.compare(&lhs, relation.parse()?, &rhs)
    }

    pub fn compare(&self, lhs: &Expr, relation: Relation, rhs: &Expr) -> Result<Diagram<'a>> {
        if relation == Relation::Eq {
            let le = self.compare(lhs, Relation::Le, rhs)?;
            let ge = self.compare(lhs, Relation::Ge, rhs)?;
            return le.and(&ge);
        }
        let outcome = self.xadd.compare(lhs, relation, rhs)?;
        Ok(self.wrap(self.xadd.outcome(outcome)))
    }

    pub fn ite(&self, condition: &Diagram<'a>, then: &Diagram<'a>, otherwise: &Diagram<'a>) -> Result<Diagram<'a>> {
        condition.ite(then, otherwise)
    }

    pub fn and(&self, a: &Diagram<'a>, b: &Diagram<'a>) -> Result<Diagram<'a>> {
        a.and(b)
    }

    pub fn or(&self, a: &Diagram<'a>, b: &Diagram<'a>) -> Result<Diagram<'a>> {
        a.or(b)
    }

    pub fn not(&self, a: &Diagram<'a>) -> Result<Diagram<'a>> {
        a.not()
    }

    /// `[lower <= var <= upper]`.
    pub fn limit(&self, var: &str, lower: i64, upper: i64) -> Result<Diagram<'a>> {
        let v = self.parse(var)?;
        let lo = self.compare(&v, Relation::Ge, &Expr::integer(lower))?;
        let hi = self.compare(&v, Relation::Le, &Expr::integer(upper))?;
        lo.and(&hi)
    }
}
