//! Partial evaluation, variable renaming and leaf transforms.
//!
//! All three rebuild a diagram bottom-up with a per-call memo keyed by the
//! visited node. Substituting into a test can change its position in the test
//! order, so rebuilt nodes go through [`Xadd::branch_on_test`].

use std::collections::HashMap;

use log::debug;
use num_rational::BigRational;

use crate::error::Result;
use crate::expr::Expr;
use crate::linear::Outcome;
use crate::node::Node;
use crate::reference::NodeId;
use crate::xadd::Xadd;

impl Xadd {
    /// Fix some variables to constants.
    ///
    /// Tests whose variables are all assigned are decided and only the chosen
    /// branch is visited. Partially assigned tests and all leaves are
    /// substituted.
    pub fn restrict(&self, root: NodeId, assignment: &HashMap<String, BigRational>) -> Result<NodeId> {
        debug!("restrict(root = {}, assignment = {:?})", root, assignment);
        let mut cache = HashMap::new();
        self.restrict_(root, assignment, &mut cache)
    }

    fn restrict_(
        &self,
        id: NodeId,
        assignment: &HashMap<String, BigRational>,
        cache: &mut HashMap<NodeId, NodeId>,
    ) -> Result<NodeId> {
        if let Some(&res) = cache.get(&id) {
            return Ok(res);
        }

        let res = match self.node(id) {
            Node::Terminal(e) => self.terminal(e.substitute_values(assignment)),
            Node::Internal { test: test_id, high, low } => {
                let test = self.test(test_id);
                let assigned = test.variables().filter(|v| assignment.contains_key(*v)).count();
                if assigned == 0 {
                    let h = self.restrict_(high, assignment, cache)?;
                    let l = self.restrict_(low, assignment, cache)?;
                    self.branch_on(test_id, h, l)?
                } else {
                    let lhs = test.lhs().substitute_values(assignment);
                    match self.retest(&lhs, test.is_strict(), test.constant())? {
                        Outcome::True => self.restrict_(high, assignment, cache)?,
                        Outcome::False => self.restrict_(low, assignment, cache)?,
                        Outcome::Test(t) => {
                            let h = self.restrict_(high, assignment, cache)?;
                            let l = self.restrict_(low, assignment, cache)?;
                            self.branch_on_test(t, h, l)?
                        }
                    }
                }
            }
        };

        cache.insert(id, res);
        Ok(res)
    }

    /// Rename variables in tests and leaves.
    ///
    /// Target names must be declared. Renaming onto a variable already used
    /// by the diagram merges the two.
    pub fn rename(&self, root: NodeId, mapping: &HashMap<String, String>) -> Result<NodeId> {
        debug!("rename(root = {}, mapping = {:?})", root, mapping);
        for target in mapping.values() {
            self.require(target)?;
        }
        let mut cache = HashMap::new();
        self.rename_(root, mapping, &mut cache)
    }

    fn rename_(
        &self,
        id: NodeId,
        mapping: &HashMap<String, String>,
        cache: &mut HashMap<NodeId, NodeId>,
    ) -> Result<NodeId> {
        if let Some(&res) = cache.get(&id) {
            return Ok(res);
        }

        let res = match self.node(id) {
            Node::Terminal(e) => self.terminal(e.rename(mapping)),
            Node::Internal { test: test_id, high, low } => {
                let test = self.test(test_id);
                let h = self.rename_(high, mapping, cache)?;
                let l = self.rename_(low, mapping, cache)?;
                if test.variables().any(|v| mapping.contains_key(v)) {
                    let lhs = test.lhs().rename(mapping);
                    match self.retest(&lhs, test.is_strict(), test.constant())? {
                        Outcome::True => h,
                        Outcome::False => l,
                        Outcome::Test(t) => self.branch_on_test(t, h, l)?,
                    }
                } else {
                    self.branch_on(test_id, h, l)?
                }
            }
        };

        cache.insert(id, res);
        Ok(res)
    }

    /// Replace every leaf `e` by `f(e)`, keeping the tests.
    pub fn map_terminals<F>(&self, root: NodeId, f: F) -> NodeId
    where
        F: Fn(&Expr) -> Expr,
    {
        let mut cache = HashMap::new();
        self.map_terminals_(root, &f, &mut cache)
    }

    fn map_terminals_<F>(&self, id: NodeId, f: &F, cache: &mut HashMap<NodeId, NodeId>) -> NodeId
    where
        F: Fn(&Expr) -> Expr,
    {
        if let Some(&res) = cache.get(&id) {
            return res;
        }
        let res = match self.node(id) {
            Node::Terminal(e) => self.terminal(f(&e)),
            Node::Internal { test, high, low } => {
                let h = self.map_terminals_(high, f, cache);
                let l = self.map_terminals_(low, f, cache);
                self.mk_node(test, h, l)
            }
        };
        cache.insert(id, res);
        res
    }
}
