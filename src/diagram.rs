//! Lightweight diagram handles.
//!
//! A [`Diagram`] is a registry reference plus a root id. It is `Copy`, owns
//! nothing but its root, and every operation returns a new handle into the
//! same registry: diagrams are never mutated.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Formatter};

use num_rational::BigRational;

use crate::apply::Op;
use crate::error::Result;
use crate::expr::Expr;
use crate::reference::NodeId;
use crate::xadd::Xadd;

#[derive(Copy, Clone)]
pub struct Diagram<'a> {
    xadd: &'a Xadd,
    root: NodeId,
}

impl<'a> Diagram<'a> {
    pub fn new(xadd: &'a Xadd, root: NodeId) -> Self {
        Self { xadd, root }
    }

    pub fn xadd(&self) -> &'a Xadd {
        self.xadd
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn wrap(&self, root: NodeId) -> Diagram<'a> {
        Diagram::new(self.xadd, root)
    }

    fn combine(&self, op: Op, other: &Diagram<'a>) -> Result<Diagram<'a>> {
        assert!(
            std::ptr::eq(self.xadd, other.xadd),
            "Diagrams from different registries cannot be combined"
        );
        Ok(self.wrap(self.xadd.apply(op, self.root, other.root)?))
    }

    pub fn sum(&self, other: &Diagram<'a>) -> Result<Diagram<'a>> {
        self.combine(Op::Sum, other)
    }

    pub fn difference(&self, other: &Diagram<'a>) -> Result<Diagram<'a>> {
        self.combine(Op::Difference, other)
    }

    pub fn product(&self, other: &Diagram<'a>) -> Result<Diagram<'a>> {
        self.combine(Op::Product, other)
    }

    pub fn max(&self, other: &Diagram<'a>) -> Result<Diagram<'a>> {
        self.combine(Op::Max, other)
    }

    pub fn min(&self, other: &Diagram<'a>) -> Result<Diagram<'a>> {
        self.combine(Op::Min, other)
    }

    pub fn and(&self, other: &Diagram<'a>) -> Result<Diagram<'a>> {
        self.combine(Op::And, other)
    }

    pub fn or(&self, other: &Diagram<'a>) -> Result<Diagram<'a>> {
        self.combine(Op::Or, other)
    }

    /// `1 - self`; the complement of a 0/1 diagram.
    pub fn not(&self) -> Result<Diagram<'a>> {
        Ok(self.wrap(self.xadd.not(self.root)?))
    }

    /// `self ? then : otherwise`, with `self` a 0/1 diagram.
    pub fn ite(&self, then: &Diagram<'a>, otherwise: &Diagram<'a>) -> Result<Diagram<'a>> {
        Ok(self.wrap(self.xadd.ite(self.root, then.root, otherwise.root)?))
    }

    pub fn scale(&self, factor: &BigRational) -> Diagram<'a> {
        self.wrap(self.xadd.map_terminals(self.root, |e| e.scale(factor)))
    }

    pub fn map_terminals<F>(&self, f: F) -> Diagram<'a>
    where
        F: Fn(&Expr) -> Expr,
    {
        self.wrap(self.xadd.map_terminals(self.root, f))
    }

    pub fn evaluate(&self, assignment: &HashMap<String, BigRational>) -> Result<BigRational> {
        self.xadd.evaluate(self.root, assignment)
    }

    pub fn variables(&self) -> BTreeSet<String> {
        self.xadd.variables_of(self.root)
    }

    pub fn reduce(&self) -> Diagram<'a> {
        self.wrap(self.xadd.reduce(self.root, None))
    }

    pub fn reduce_over(&self, live: &[&str]) -> Diagram<'a> {
        self.wrap(self.xadd.reduce(self.root, Some(live)))
    }

    pub fn restrict(&self, assignment: &HashMap<String, BigRational>) -> Result<Diagram<'a>> {
        Ok(self.wrap(self.xadd.restrict(self.root, assignment)?))
    }

    pub fn rename(&self, mapping: &HashMap<String, String>) -> Result<Diagram<'a>> {
        Ok(self.wrap(self.xadd.rename(self.root, mapping)?))
    }

    pub fn eliminate(&self, var: &str) -> Result<Diagram<'a>> {
        Ok(self.wrap(self.xadd.eliminate(self.root, var)?))
    }

    pub fn eliminate_all<'v>(&self, vars: impl IntoIterator<Item = &'v str>) -> Result<Diagram<'a>> {
        Ok(self.wrap(self.xadd.eliminate_all(self.root, vars)?))
    }

    /// Number of distinct nodes reachable from the root.
    pub fn size(&self) -> usize {
        self.xadd.size(self.root)
    }

    pub fn is_terminal(&self) -> bool {
        self.xadd.is_terminal(self.root)
    }

    /// The constant value, if the diagram is a constant leaf.
    pub fn constant_value(&self) -> Option<BigRational> {
        self.xadd.expression(self.root)?.constant_value()
    }

    pub fn to_dot(&self) -> std::result::Result<String, std::fmt::Error> {
        self.xadd.to_dot(&[self.root])
    }
}

impl PartialEq for Diagram<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.xadd, other.xadd) && self.root == other.root
    }
}

impl Eq for Diagram<'_> {}

impl Debug for Diagram<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Diagram({})", self.root)
    }
}
