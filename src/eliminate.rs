//! Exact elimination of a variable by bound resolution.
//!
//! `eliminate(f, v)` computes `Σ_v f` for a discrete `v`, or `∫ f dv` for a
//! continuous one, without enumerating values. The walk carries the
//! tightest upper and lower bound on `v` known along the current path,
//! starting from the declared domain bounds. Every test that mentions `v`
//! is a bound on it, so instead of being kept it is folded into that state:
//!
//! - on the branch where the test holds, its bound either tightens the
//!   current one (guarded by `new ≤ upper`, resp. `new ≥ lower`) or is
//!   dominated by it (guarded by the negation);
//! - on the other branch, the complement gives a bound of the opposite kind,
//!   split the same way.
//!
//! The two branch results are added. At a leaf `e` the bounds are final and
//! the contribution is `[lower ≤ upper] · S(e, lower, upper)`, where `S` is
//! the closed-form sum or integral from [`Expr`].
//!
//! Tests that do not mention `v` are kept as they are. The input is reduced
//! first, and the walk also keeps the kept tests and chosen guards of the
//! current path: a guard or kept test the path already decides is not split
//! on. The guards still introduce new tests over the remaining variables,
//! which is why the result is reduced afterwards (see
//! [`XaddConfig::reduce_after_eliminate`][crate::config::XaddConfig]).

use std::collections::{BTreeSet, HashMap};

use log::{debug, trace};
use num_traits::{One, Signed};

use crate::apply::Op;
use crate::error::{Result, XaddError};
use crate::expr::Expr;
use crate::linear::{connected, feasible, BoundKind, LinearTest, Outcome, Relation};
use crate::node::Node;
use crate::reduce::Support;
use crate::reference::NodeId;
use crate::types::VarDecl;
use crate::xadd::Xadd;

type Bound = Option<Expr>;

/// How the path decides a test.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Decision {
    Holds,
    Fails,
    Open,
}

struct Elimination<'a> {
    xadd: &'a Xadd,
    var: VarDecl,
    /// Kept tests and chosen guards along the current path, oriented.
    path: Vec<LinearTest>,
    support: Support,
    cache: HashMap<(NodeId, Bound, Bound, Vec<LinearTest>), NodeId>,
}

impl Xadd {
    /// Sum (discrete) or integrate (continuous) `var` out of the diagram.
    ///
    /// Returns the input unchanged if `var` does not occur in it.
    pub fn eliminate(&self, root: NodeId, var: &str) -> Result<NodeId> {
        debug!("eliminate(root = {}, var = {})", root, var);
        if !self.variables_of(root).contains(var) {
            debug!("eliminate: {} does not occur below {}", var, root);
            return Ok(root);
        }

        let decl = self.require(var)?;
        let upper = decl.upper.clone().map(Expr::constant);
        let lower = decl.lower.clone().map(Expr::constant);
        let input = self.reduce(root, None);
        let mut elimination = Elimination {
            xadd: self,
            var: decl,
            path: Vec::new(),
            support: HashMap::new(),
            cache: HashMap::new(),
        };
        let mut res = elimination.walk(input, upper, lower)?;
        debug!(
            "eliminate: {} walk states for {} input nodes",
            elimination.cache.len(),
            self.size(input)
        );

        if self.config().reduce_after_eliminate {
            res = self.reduce(res, None);
        }
        debug!("computed: eliminate(root = {}, var = {}) -> {}", root, var, res);
        Ok(res)
    }

    /// Eliminate several variables, in the given order.
    pub fn eliminate_all<'v>(&self, root: NodeId, vars: impl IntoIterator<Item = &'v str>) -> Result<NodeId> {
        let mut res = root;
        for var in vars {
            res = self.eliminate(res, var)?;
        }
        Ok(res)
    }
}

impl Elimination<'_> {
    /// Indices of the path constraints that can matter below `id` with the given bounds.
    fn context(&mut self, id: NodeId, upper: &Bound, lower: &Bound) -> Vec<usize> {
        let support = self.xadd.test_support(id, &mut self.support);
        let mut vars: BTreeSet<String> = support.iter().cloned().collect();
        for bound in [upper, lower].into_iter().flatten() {
            vars.extend(bound.variables());
        }
        connected(&self.path, &vars)
    }

    fn decide(&self, context: &[usize], test: &LinearTest) -> Decision {
        let mut constraints: Vec<LinearTest> = context.iter().map(|&i| self.path[i].clone()).collect();
        constraints.push(test.complement());
        if !feasible(&constraints) {
            return Decision::Holds;
        }
        constraints.pop();
        constraints.push(test.clone());
        if !feasible(&constraints) {
            return Decision::Fails;
        }
        Decision::Open
    }

    /// Walk `child` with `constraint` added to the path.
    fn assuming(&mut self, constraint: LinearTest, child: NodeId, upper: Bound, lower: Bound) -> Result<NodeId> {
        self.path.push(constraint);
        let res = self.walk(child, upper, lower);
        self.path.pop();
        res
    }

    fn walk(&mut self, id: NodeId, upper: Bound, lower: Bound) -> Result<NodeId> {
        let context = self.context(id, &upper, &lower);
        let projected: Vec<LinearTest> = context.iter().map(|&i| self.path[i].clone()).collect();
        let key = (id, upper, lower, projected);
        if let Some(&res) = self.cache.get(&key) {
            return Ok(res);
        }
        let (_, upper, lower, _) = &key;

        let res = match self.xadd.node(id) {
            Node::Terminal(e) => self.leaf(&e, upper, lower, &context)?,
            Node::Internal { test: test_id, high, low } => {
                let test = self.xadd.test(test_id);
                if !test.mentions(&self.var.name) {
                    match self.decide(&context, &test) {
                        Decision::Holds => self.walk(high, upper.clone(), lower.clone())?,
                        Decision::Fails => self.walk(low, upper.clone(), lower.clone())?,
                        Decision::Open => {
                            trace!("eliminate: {} is irrelevant", test);
                            let h = self.assuming(test.clone(), high, upper.clone(), lower.clone())?;
                            let l = self.assuming(test.complement(), low, upper.clone(), lower.clone())?;
                            self.xadd.branch_on(test_id, h, l)?
                        }
                    }
                } else {
                    self.check_integral(&test)?;
                    trace!(
                        "eliminate: {} is {} bound on true branch",
                        test,
                        test.bound_kind(&self.var.name).map_or("no", |k| match k {
                            BoundKind::Upper => "an upper",
                            BoundKind::Lower => "a lower",
                        })
                    );
                    let taken = self.tighten(high, &test, upper, lower, &context)?;
                    let skipped = self.tighten(low, &test.complement(), upper, lower, &context)?;
                    self.xadd.apply(Op::Sum, taken, skipped)?
                }
            }
        };

        self.cache.insert(key, res);
        Ok(res)
    }

    /// Continue into `child` under `test`, which bounds the variable.
    ///
    /// The result is `ite(new dominates old, walk(child, new), walk(child, old))`,
    /// with the guard dropped when the path decides it.
    fn tighten(
        &mut self,
        child: NodeId,
        test: &LinearTest,
        upper: &Bound,
        lower: &Bound,
        context: &[usize],
    ) -> Result<NodeId> {
        let Some((kind, new)) = test.bound(&self.var.name) else {
            unreachable!("test `{}` does not mention `{}`", test, self.var.name);
        };
        let (old, relation) = match kind {
            BoundKind::Upper => (upper, Relation::Le),
            BoundKind::Lower => (lower, Relation::Ge),
        };
        let with = |bound: Bound| match kind {
            BoundKind::Upper => (bound, lower.clone()),
            BoundKind::Lower => (upper.clone(), bound),
        };

        let Some(old) = old else {
            let (u, l) = with(Some(new));
            return self.walk(child, u, l);
        };

        let decision = match self.xadd.compare(&new, relation, old)? {
            Outcome::True => Decision::Holds,
            Outcome::False => Decision::Fails,
            Outcome::Test(dominates) => match self.decide(context, &dominates) {
                Decision::Open => {
                    trace!("eliminate: {} bound splits on {}", kind, dominates);
                    let (u, l) = with(Some(new));
                    let best = self.assuming(dominates.clone(), child, u, l)?;
                    let (u, l) = with(Some(old.clone()));
                    let some = self.assuming(dominates.complement(), child, u, l)?;
                    return self.xadd.branch_on_test(dominates, best, some);
                }
                decided => decided,
            },
        };
        let (u, l) = match decision {
            Decision::Fails => with(Some(old.clone())),
            _ => with(Some(new)),
        };
        self.walk(child, u, l)
    }

    fn leaf(&self, e: &Expr, upper: &Bound, lower: &Bound, context: &[usize]) -> Result<NodeId> {
        if e.is_zero() {
            return Ok(NodeId::ZERO);
        }
        let var = &self.var.name;
        let upper = upper
            .as_ref()
            .ok_or_else(|| XaddError::UnboundedVariable(var.clone(), "upper"))?;
        let lower = lower
            .as_ref()
            .ok_or_else(|| XaddError::UnboundedVariable(var.clone(), "lower"))?;

        let value = if self.var.is_discrete() {
            e.sum_over(var, lower, upper)
        } else {
            e.integrate_over(var, lower, upper)
        };
        trace!("eliminate: leaf {} over [{}, {}] -> {}", e, lower, upper, value);

        let value = self.xadd.terminal(value);
        let res = match self.xadd.compare(lower, Relation::Le, upper)? {
            Outcome::True => value,
            Outcome::False => NodeId::ZERO,
            Outcome::Test(nonempty) => match self.decide(context, &nonempty) {
                Decision::Holds => value,
                Decision::Fails => NodeId::ZERO,
                Decision::Open => self.xadd.internal(nonempty, value, NodeId::ZERO),
            },
        };
        Ok(res)
    }

    /// Summation needs bounds `v ≤ P` / `v ≥ P` with integral `P`.
    fn check_integral(&self, test: &LinearTest) -> Result<()> {
        if !self.var.is_discrete() {
            return Ok(());
        }
        let c = test.coefficient(&self.var.name);
        if test.is_integral() && c.abs().is_one() {
            Ok(())
        } else {
            Err(XaddError::NonIntegralBound {
                var: self.var.name.clone(),
                test: test.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use num_rational::BigRational;

    use super::*;
    use crate::config::XaddConfig;
    use crate::expr::int;

    fn indicator(xadd: &Xadd, lhs: &str, rel: &str, rhs: &str) -> NodeId {
        let outcome = xadd
            .compare(&lhs.parse().unwrap(), rel.parse().unwrap(), &rhs.parse().unwrap())
            .unwrap();
        xadd.outcome(outcome)
    }

    fn product(xadd: &Xadd, parts: &[NodeId]) -> NodeId {
        parts
            .iter()
            .fold(NodeId::ONE, |acc, &p| xadd.apply(Op::Product, acc, p).unwrap())
    }

    fn leaf(xadd: &Xadd, s: &str) -> NodeId {
        xadd.terminal(s.parse().unwrap())
    }

    fn at(pairs: &[(&str, i64)]) -> HashMap<String, BigRational> {
        pairs.iter().map(|&(v, x)| (v.to_string(), int(x))).collect()
    }

    #[test]
    fn test_sum_single_variable() {
        let xadd = Xadd::default();
        xadd.declare(VarDecl::discrete("x")).unwrap();
        let bounds = product(
            &xadd,
            &[indicator(&xadd, "x", ">=", "0"), indicator(&xadd, "x", "<=", "10")],
        );
        let f = xadd.ite(bounds, leaf(&xadd, "x"), NodeId::ZERO).unwrap();
        let s = xadd.eliminate(f, "x").unwrap();
        assert_eq!(xadd.evaluate(s, &HashMap::new()).unwrap(), int(55));
    }

    #[test]
    fn test_absent_variable_is_identity() {
        let xadd = Xadd::default();
        xadd.declare(VarDecl::discrete("x")).unwrap();
        xadd.declare(VarDecl::discrete("y")).unwrap();
        let f = indicator(&xadd, "x", "<=", "3");
        assert_eq!(xadd.eliminate(f, "y").unwrap(), f);
    }

    #[test]
    fn test_domain_bounds() {
        let xadd = Xadd::default();
        xadd.declare(VarDecl::discrete("x").with_bounds(int(1), int(4))).unwrap();
        let f = leaf(&xadd, "x^2");
        let s = xadd.eliminate(f, "x").unwrap();
        assert_eq!(s, xadd.terminal(Expr::integer(30)));
    }

    #[test]
    fn test_unbounded() {
        let xadd = Xadd::default();
        xadd.declare(VarDecl::discrete("x")).unwrap();
        let f = xadd.ite(indicator(&xadd, "x", ">=", "0"), leaf(&xadd, "1"), NodeId::ZERO).unwrap();
        assert_eq!(
            xadd.eliminate(f, "x"),
            Err(XaddError::UnboundedVariable("x".to_string(), "upper"))
        );
        let f = xadd.ite(indicator(&xadd, "x", "<=", "0"), leaf(&xadd, "x"), NodeId::ZERO).unwrap();
        assert_eq!(
            xadd.eliminate(f, "x"),
            Err(XaddError::UnboundedVariable("x".to_string(), "lower"))
        );
    }

    #[test]
    fn test_non_integral_bound() {
        let xadd = Xadd::default();
        xadd.declare(VarDecl::discrete("x").with_bounds(int(0), int(10))).unwrap();
        xadd.declare(VarDecl::discrete("y")).unwrap();
        let f = indicator(&xadd, "2*x", "<=", "y");
        assert!(matches!(
            xadd.eliminate(f, "x"),
            Err(XaddError::NonIntegralBound { .. })
        ));
    }

    #[test]
    fn test_undeclared_variable_in_leaf() {
        let xadd = Xadd::default();
        let f = leaf(&xadd, "w + 1");
        assert_eq!(xadd.eliminate(f, "w"), Err(XaddError::UndeclaredVariable("w".to_string())));
    }

    #[test]
    fn test_integrate_continuous() {
        let xadd = Xadd::default();
        xadd.declare(VarDecl::continuous("t")).unwrap();
        xadd.declare(VarDecl::continuous("a")).unwrap();
        // ∫_0^a 2t dt = a², for a >= 0
        let bounds = product(&xadd, &[indicator(&xadd, "t", ">=", "0"), indicator(&xadd, "t", "<=", "a")]);
        let f = xadd.ite(bounds, leaf(&xadd, "2*t"), NodeId::ZERO).unwrap();
        let g = xadd.eliminate(f, "t").unwrap();
        for a in -3..4 {
            let expected = if a >= 0 { int(a * a) } else { int(0) };
            assert_eq!(xadd.evaluate(g, &at(&[("a", a)])).unwrap(), expected);
        }
        assert!(!xadd.variables_of(g).contains("t"));
    }

    #[test]
    fn test_symbolic_upper_bounds() {
        // x in [0, min(b, c)] or [0, min(b, d)] depending on y.
        let xadd = Xadd::default();
        for v in ["x", "b", "c", "d", "y"] {
            xadd.declare(VarDecl::discrete(v)).unwrap();
        }
        let zero_test = indicator(&xadd, "x", ">=", "0");
        let b_test = indicator(&xadd, "x", "<=", "b");
        let y_test = indicator(&xadd, "y", "<=", "10");
        let c_branch = xadd.apply(Op::Product, indicator(&xadd, "x", "<=", "c"), leaf(&xadd, "3")).unwrap();
        let d_branch = xadd.apply(Op::Product, indicator(&xadd, "x", "<=", "d"), leaf(&xadd, "11")).unwrap();
        let inner = xadd.ite(y_test, c_branch, d_branch).unwrap();
        let f = product(&xadd, &[zero_test, b_test, inner]);

        let g = xadd.eliminate(f, "x").unwrap();
        assert!(!xadd.variables_of(g).contains("x"));
        for b in -1..4 {
            for c in -1..4 {
                for d in -1..4 {
                    for y in [9, 10, 11] {
                        let mut expected = int(0);
                        for x in -2..6 {
                            let p = at(&[("x", x), ("b", b), ("c", c), ("d", d), ("y", y)]);
                            expected += xadd.evaluate(f, &p).unwrap();
                        }
                        let p = at(&[("b", b), ("c", c), ("d", d), ("y", y)]);
                        assert_eq!(xadd.evaluate(g, &p).unwrap(), expected, "b={} c={} d={} y={}", b, c, d, y);
                    }
                }
            }
        }
    }

    #[test]
    fn test_without_reduction() {
        let xadd = Xadd::new(XaddConfig::default().with_reduce_after_eliminate(false));
        xadd.declare(VarDecl::discrete("x")).unwrap();
        xadd.declare(VarDecl::discrete("y")).unwrap();
        let bounds = product(
            &xadd,
            &[
                indicator(&xadd, "x", ">=", "0"),
                indicator(&xadd, "x", "<=", "y"),
                indicator(&xadd, "x", "<=", "5"),
            ],
        );
        let f = xadd.ite(bounds, leaf(&xadd, "1"), NodeId::ZERO).unwrap();
        let g = xadd.eliminate(f, "x").unwrap();
        for y in -3..9 {
            let expected = if y < 0 { 0 } else { y.min(5) + 1 };
            assert_eq!(xadd.evaluate(g, &at(&[("y", y)])).unwrap(), int(expected));
        }
    }

    #[test]
    fn test_redundant_symbolic_bounds() {
        let xadd = Xadd::new(XaddConfig::default().with_reduce_after_eliminate(false));
        for v in ["x", "y", "z"] {
            xadd.declare(VarDecl::discrete(v)).unwrap();
        }
        let ite = |t: NodeId, h: &str, l: &str| xadd.ite(t, leaf(&xadd, h), leaf(&xadd, l)).unwrap();
        // Sums of pieces keep every combination of `x <= 2`, `x <= 3`,
        // `x - z <= -2` and `x - y <= -1`, including contradictory ones.
        let pieces = [
            ite(indicator(&xadd, "x", "<=", "2"), "x", "y"),
            ite(indicator(&xadd, "x", "<=", "3"), "z", "1"),
            ite(indicator(&xadd, "x - z", "<=", "-2"), "2", "x"),
            ite(indicator(&xadd, "x - y", "<=", "-1"), "y", "3"),
            ite(indicator(&xadd, "x", "<=", "2"), "1", "z"),
            ite(indicator(&xadd, "x - z", "<=", "-2"), "x + y", "0"),
        ];
        let body = pieces
            .iter()
            .fold(NodeId::ZERO, |acc, &p| xadd.apply(Op::Sum, acc, p).unwrap());
        let domain = product(&xadd, &[indicator(&xadd, "x", ">=", "-3"), indicator(&xadd, "x", "<=", "3")]);
        let f = xadd.apply(Op::Product, domain, body).unwrap();
        assert!(xadd.reduce(f, None) != f);

        let start = std::time::Instant::now();
        let g = xadd.eliminate(f, "x").unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed.as_secs() < 10, "elimination took {:?}", elapsed);
        assert!(!xadd.variables_of(g).contains("x"));

        for y in -4..5 {
            for z in -4..5 {
                let expected: BigRational = (-3..=3)
                    .map(|x| xadd.evaluate(f, &at(&[("x", x), ("y", y), ("z", z)])).unwrap())
                    .sum();
                assert_eq!(xadd.evaluate(g, &at(&[("y", y), ("z", z)])).unwrap(), expected, "y={} z={}", y, z);
            }
        }
    }

    #[test]
    fn test_guards_decided_by_path() {
        let xadd = Xadd::new(XaddConfig::default().with_reduce_after_eliminate(false));
        xadd.declare(VarDecl::discrete("a")).unwrap();
        xadd.declare(VarDecl::discrete("x")).unwrap();
        let f = product(
            &xadd,
            &[
                indicator(&xadd, "a", "<=", "0"),
                indicator(&xadd, "x", ">=", "0"),
                indicator(&xadd, "x", "<=", "a"),
                indicator(&xadd, "x", "<=", "5"),
            ],
        );
        let g = xadd.eliminate(f, "x").unwrap();
        // Under `a <= 0` the bound `a` always beats `5`; only `a <= 0` and
        // the non-emptiness test `0 <= a` remain.
        assert_eq!(xadd.test_histogram(g).len(), 2);
        for a in -3..8 {
            let expected = if a == 0 { 1 } else { 0 };
            assert_eq!(xadd.evaluate(g, &at(&[("a", a)])).unwrap(), int(expected));
        }
    }
}
