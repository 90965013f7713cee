//! Generic binary combination of diagrams.
//!
//! [`Xadd::apply`] walks both operands in lockstep, always branching on the
//! smaller of the two root tests in the fixed test order, and combines
//! terminals pointwise. Results are memoized in the registry's computed
//! table.
//!
//! `Max` and `Min` are special: combining two symbolic leaves yields a
//! comparison node, whose test may sort before tests already above it.
//! Every node is therefore rebuilt through [`Xadd::branch_on`], which falls
//! back to an `ite` built from indicators whenever the children would break
//! the test order.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use log::debug;
use num_traits::Zero;

use crate::cache::OpKey;
use crate::error::{Result, XaddError};
use crate::expr::Expr;
use crate::linear::{LinearTest, Outcome, Relation};
use crate::node::Node;
use crate::reference::{NodeId, TestId};
use crate::xadd::Xadd;

/// Binary operators understood by [`Xadd::apply`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Op {
    Sum,
    Difference,
    Product,
    Max,
    Min,
    /// Boolean conjunction; non-zero leaves count as true.
    And,
    /// Boolean disjunction; non-zero leaves count as true.
    Or,
}

impl Op {
    pub fn is_commutative(self) -> bool {
        !matches!(self, Op::Difference)
    }

    fn is_idempotent(self) -> bool {
        matches!(self, Op::Max | Op::Min | Op::And | Op::Or)
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Op::Sum => "+",
            Op::Difference => "-",
            Op::Product => "*",
            Op::Max => "max",
            Op::Min => "min",
            Op::And => "and",
            Op::Or => "or",
        };
        write!(f, "{}", s)
    }
}

impl Xadd {
    pub fn apply(&self, op: Op, f: NodeId, g: NodeId) -> Result<NodeId> {
        debug!("apply(op = {}, f = {}, g = {})", op, f, g);

        if let Some(res) = self.short_circuit(op, f, g) {
            debug!("apply: short circuit {} {} {} => {}", f, op, g, res);
            return Ok(res);
        }

        let key = OpKey::new(op, f, g);
        if let Some(res) = self.cache.borrow_mut().get(&key) {
            debug!("cache: apply(op = {}, f = {}, g = {}) -> {}", op, f, g, res);
            return Ok(res);
        }

        let res = match (self.node(f), self.node(g)) {
            (Node::Terminal(a), Node::Terminal(b)) => self.apply_terminals(op, &a, &b)?,
            (nf, ng) => {
                let top = match (nf.branch(), ng.branch()) {
                    (Some((tf, _, _)), Some((tg, _, _))) => match self.test_order(tf, tg) {
                        Ordering::Greater => tg,
                        _ => tf,
                    },
                    (Some((tf, _, _)), None) => tf,
                    (None, Some((tg, _, _))) => tg,
                    (None, None) => unreachable!(),
                };
                debug!("apply: top test = {}", top);

                let (f1, f0) = self.cofactors(f, top);
                let (g1, g0) = self.cofactors(g, top);
                let high = self.apply(op, f1, g1)?;
                let low = self.apply(op, f0, g0)?;
                self.branch_on(top, high, low)?
            }
        };

        debug!("computed: apply(op = {}, f = {}, g = {}) -> {}", op, f, g, res);
        self.cache.borrow_mut().insert(key, res);
        Ok(res)
    }

    fn short_circuit(&self, op: Op, f: NodeId, g: NodeId) -> Option<NodeId> {
        if op.is_idempotent() && f == g {
            return Some(f);
        }
        match op {
            Op::Sum if f.is_zero() => Some(g),
            Op::Sum if g.is_zero() => Some(f),
            Op::Difference if g.is_zero() => Some(f),
            Op::Difference if f == g => Some(NodeId::ZERO),
            Op::Product if f.is_zero() || g.is_zero() => Some(NodeId::ZERO),
            Op::Product if f.is_one() => Some(g),
            Op::Product if g.is_one() => Some(f),
            Op::And if f.is_zero() || g.is_zero() => Some(NodeId::ZERO),
            Op::Or if f.is_one() || g.is_one() => Some(NodeId::ONE),
            _ => None,
        }
    }

    fn apply_terminals(&self, op: Op, a: &Expr, b: &Expr) -> Result<NodeId> {
        let res = match op {
            Op::Sum => self.terminal(a + b),
            Op::Difference => self.terminal(a - b),
            Op::Product => self.terminal(a * b),
            Op::Max | Op::Min => {
                let (ta, tb) = (self.terminal(a.clone()), self.terminal(b.clone()));
                // `a <= b` selects b for max and a for min.
                let (when_le, otherwise) = if op == Op::Max { (tb, ta) } else { (ta, tb) };
                match self.compare(a, Relation::Le, b)? {
                    Outcome::True => when_le,
                    Outcome::False => otherwise,
                    Outcome::Test(t) => self.internal(t, when_le, otherwise),
                }
            }
            Op::And | Op::Or => {
                let truth = |e: &Expr| {
                    e.constant_value()
                        .map(|v| !v.is_zero())
                        .ok_or_else(|| XaddError::NonBooleanTerminal(e.to_string()))
                };
                let (x, y) = (truth(a)?, truth(b)?);
                let value = if op == Op::And { x && y } else { x || y };
                if value {
                    NodeId::ONE
                } else {
                    NodeId::ZERO
                }
            }
        };
        Ok(res)
    }

    /// Children of `id` when the test `top` is true and false.
    ///
    /// Nodes that do not branch on `top` are returned unchanged for both.
    pub(crate) fn cofactors(&self, id: NodeId, top: TestId) -> (NodeId, NodeId) {
        match self.branch(id) {
            Some((test, high, low)) if test == top => (high, low),
            _ => (id, id),
        }
    }

    /// `test ? high : low` for ordered children.
    ///
    /// When a child's root test does not come strictly after `test`, the
    /// result is assembled from indicators with [`apply`][Xadd::apply] instead.
    pub fn branch_on(&self, test: TestId, high: NodeId, low: NodeId) -> Result<NodeId> {
        if high == low {
            return Ok(low);
        }
        let ordered = |child: NodeId| match self.branch(child) {
            None => true,
            Some((t, _, _)) => self.test_order(test, t) == Ordering::Less,
        };
        if ordered(high) && ordered(low) {
            return Ok(self.mk_node(test, high, low));
        }
        debug!("branch_on: reordering below {}", test);
        let condition = self.mk_node(test, NodeId::ONE, NodeId::ZERO);
        self.ite(condition, high, low)
    }

    /// `test ? high : low` for an arbitrary test and ordered children.
    pub fn branch_on_test(&self, test: LinearTest, high: NodeId, low: NodeId) -> Result<NodeId> {
        if high == low {
            return Ok(low);
        }
        let id = self.internal(test, NodeId::ONE, NodeId::ZERO);
        match self.branch(id) {
            Some((t, h, _)) if h.is_one() => self.branch_on(t, high, low),
            Some((t, _, _)) => self.branch_on(t, low, high),
            None => unreachable!("indicator of a proper test is internal"),
        }
    }

    /// The node for a constant or proper test outcome, as a 0/1 diagram.
    pub fn outcome(&self, outcome: Outcome) -> NodeId {
        match outcome {
            Outcome::True => NodeId::ONE,
            Outcome::False => NodeId::ZERO,
            Outcome::Test(t) => self.indicator(t),
        }
    }

    /// `[test]`: one where the test holds, zero elsewhere.
    pub fn indicator(&self, test: LinearTest) -> NodeId {
        self.internal(test, NodeId::ONE, NodeId::ZERO)
    }

    /// `1 - f`, the negation of a 0/1 diagram.
    pub fn not(&self, f: NodeId) -> Result<NodeId> {
        self.apply(Op::Difference, NodeId::ONE, f)
    }

    /// `c ? t : e` for a 0/1 condition `c`.
    pub fn ite(&self, c: NodeId, t: NodeId, e: NodeId) -> Result<NodeId> {
        debug!("ite(c = {}, t = {}, e = {})", c, t, e);
        if c.is_one() || t == e {
            return Ok(t);
        }
        if c.is_zero() {
            return Ok(e);
        }
        let then = self.apply(Op::Product, c, t)?;
        let not_c = self.not(c)?;
        let otherwise = self.apply(Op::Product, not_c, e)?;
        self.apply(Op::Sum, then, otherwise)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use test_log::test;

    use super::*;
    use crate::expr::int;
    use crate::types::VarDecl;

    fn setup() -> Xadd {
        let xadd = Xadd::default();
        xadd.declare(VarDecl::discrete("x")).unwrap();
        xadd.declare(VarDecl::discrete("y")).unwrap();
        xadd
    }

    fn indicator(xadd: &Xadd, lhs: &str, rel: &str, rhs: &str) -> NodeId {
        let outcome = xadd
            .compare(&lhs.parse().unwrap(), rel.parse().unwrap(), &rhs.parse().unwrap())
            .unwrap();
        xadd.outcome(outcome)
    }

    fn leaf(xadd: &Xadd, s: &str) -> NodeId {
        xadd.terminal(s.parse().unwrap())
    }

    fn at(x: i64, y: i64) -> HashMap<String, num_rational::BigRational> {
        HashMap::from([("x".to_string(), int(x)), ("y".to_string(), int(y))])
    }

    #[test]
    fn test_short_circuits() {
        let xadd = setup();
        let f = indicator(&xadd, "x", "<=", "3");
        assert_eq!(xadd.apply(Op::Sum, NodeId::ZERO, f).unwrap(), f);
        assert_eq!(xadd.apply(Op::Difference, f, NodeId::ZERO).unwrap(), f);
        assert_eq!(xadd.apply(Op::Difference, f, f).unwrap(), NodeId::ZERO);
        assert_eq!(xadd.apply(Op::Product, NodeId::ZERO, f).unwrap(), NodeId::ZERO);
        assert_eq!(xadd.apply(Op::Product, NodeId::ONE, f).unwrap(), f);
        assert_eq!(xadd.apply(Op::And, NodeId::ZERO, f).unwrap(), NodeId::ZERO);
        assert_eq!(xadd.apply(Op::Or, f, NodeId::ONE).unwrap(), NodeId::ONE);
        assert_eq!(xadd.apply(Op::Max, f, f).unwrap(), f);
    }

    #[test]
    fn test_terminal_arithmetic() {
        let xadd = setup();
        let a = leaf(&xadd, "x + 1");
        let b = leaf(&xadd, "2*y");
        assert_eq!(xadd.apply(Op::Sum, a, b).unwrap(), leaf(&xadd, "x + 2*y + 1"));
        assert_eq!(xadd.apply(Op::Difference, a, b).unwrap(), leaf(&xadd, "x - 2*y + 1"));
        assert_eq!(xadd.apply(Op::Product, a, b).unwrap(), leaf(&xadd, "2*x*y + 2*y"));
    }

    #[test]
    fn test_commutativity() {
        let xadd = setup();
        let f = {
            let c = indicator(&xadd, "x", "<=", "y");
            xadd.ite(c, leaf(&xadd, "x"), leaf(&xadd, "3")).unwrap()
        };
        let g = {
            let c = indicator(&xadd, "y", ">", "2");
            xadd.ite(c, leaf(&xadd, "y + 1"), leaf(&xadd, "x")).unwrap()
        };
        for op in [Op::Sum, Op::Product, Op::Max, Op::Min] {
            assert_eq!(xadd.apply(op, f, g).unwrap(), xadd.apply(op, g, f).unwrap(), "{}", op);
        }
    }

    #[test]
    fn test_pointwise() {
        let xadd = setup();
        let c = indicator(&xadd, "x", "<=", "y");
        let f = xadd.ite(c, leaf(&xadd, "x*y"), leaf(&xadd, "x - 1")).unwrap();
        let c = indicator(&xadd, "x + y", ">=", "1");
        let g = xadd.ite(c, leaf(&xadd, "2"), leaf(&xadd, "y")).unwrap();

        let sum = xadd.apply(Op::Sum, f, g).unwrap();
        let diff = xadd.apply(Op::Difference, f, g).unwrap();
        let prod = xadd.apply(Op::Product, f, g).unwrap();
        for x in -3..4 {
            for y in -3..4 {
                let p = at(x, y);
                let fv = xadd.evaluate(f, &p).unwrap();
                let gv = xadd.evaluate(g, &p).unwrap();
                assert_eq!(xadd.evaluate(sum, &p).unwrap(), &fv + &gv);
                assert_eq!(xadd.evaluate(diff, &p).unwrap(), &fv - &gv);
                assert_eq!(xadd.evaluate(prod, &p).unwrap(), &fv * &gv);
            }
        }
    }

    #[test]
    fn test_max_min_of_symbolic_leaves() {
        let xadd = setup();
        let a = leaf(&xadd, "x");
        let b = leaf(&xadd, "y + 1");
        let max = xadd.apply(Op::Max, a, b).unwrap();
        let min = xadd.apply(Op::Min, a, b).unwrap();
        assert!(!xadd.is_terminal(max));
        for x in -3..4 {
            for y in -3..4 {
                let p = at(x, y);
                assert_eq!(xadd.evaluate(max, &p).unwrap(), int(x.max(y + 1)));
                assert_eq!(xadd.evaluate(min, &p).unwrap(), int(x.min(y + 1)));
            }
        }
    }

    #[test]
    fn test_max_keeps_order() {
        let xadd = setup();
        // The comparison `x <= y` created by max sorts before `y <= 0`.
        let c = indicator(&xadd, "y", "<=", "0");
        let f = xadd.ite(c, leaf(&xadd, "x"), leaf(&xadd, "0")).unwrap();
        let g = leaf(&xadd, "y");
        let max = xadd.apply(Op::Max, f, g).unwrap();
        for x in -3..4 {
            for y in -3..4 {
                let fv = if y <= 0 { x } else { 0 };
                assert_eq!(xadd.evaluate(max, &at(x, y)).unwrap(), int(fv.max(y)));
            }
        }
        // Every child sorts strictly after its parent.
        for id in xadd.descendants([max]) {
            if let Some((t, high, low)) = xadd.branch(id) {
                for child in [high, low] {
                    if let Some((tc, _, _)) = xadd.branch(child) {
                        assert_eq!(xadd.test_order(t, tc), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn test_max_nonlinear_is_invalid() {
        let xadd = setup();
        let a = leaf(&xadd, "x*y");
        let b = leaf(&xadd, "x");
        assert!(matches!(xadd.apply(Op::Max, a, b), Err(XaddError::InvalidTest(_))));
    }

    #[test]
    fn test_boolean_ops() {
        let xadd = setup();
        let a = indicator(&xadd, "x", ">=", "0");
        let b = indicator(&xadd, "x", "<=", "5");
        let and = xadd.apply(Op::And, a, b).unwrap();
        let or = xadd.apply(Op::Or, a, b).unwrap();
        for x in -3..9 {
            let p = at(x, 0);
            let expect_and = (0..=5).contains(&x) as i64;
            assert_eq!(xadd.evaluate(and, &p).unwrap(), int(expect_and));
            assert_eq!(xadd.evaluate(or, &p).unwrap(), int(1));
        }

        let symbolic = leaf(&xadd, "x");
        assert!(matches!(
            xadd.apply(Op::And, a, symbolic),
            Err(XaddError::NonBooleanTerminal(_))
        ));
    }

    #[test]
    fn test_cache_hits() {
        let xadd = setup();
        let a = indicator(&xadd, "x", ">=", "0");
        let b = leaf(&xadd, "y");
        let first = xadd.apply(Op::Product, a, b).unwrap();
        let hits = xadd.cache.borrow().hits();
        let second = xadd.apply(Op::Product, b, a).unwrap();
        assert_eq!(first, second);
        assert!(xadd.cache.borrow().hits() > hits);
    }
}
