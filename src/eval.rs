//! Point evaluation and variable collection.

use std::collections::{BTreeSet, HashMap};

use num_rational::BigRational;

use crate::error::Result;
use crate::node::Node;
use crate::reference::NodeId;
use crate::xadd::Xadd;

impl Xadd {
    /// Follow the path selected by `assignment` and evaluate the leaf.
    ///
    /// Only variables on the taken path and in the reached leaf need values;
    /// a missing one is [`UnassignedVariable`][crate::error::XaddError::UnassignedVariable].
    pub fn evaluate(&self, root: NodeId, assignment: &HashMap<String, BigRational>) -> Result<BigRational> {
        let mut current = root;
        loop {
            match self.node(current) {
                Node::Terminal(e) => return e.evaluate(assignment),
                Node::Internal { test, high, low } => {
                    current = if self.test(test).holds(assignment)? {
                        high
                    } else {
                        low
                    };
                }
            }
        }
    }

    /// Variables mentioned anywhere below `root`, in tests or leaves.
    pub fn variables_of(&self, root: NodeId) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        for id in self.descendants([root]) {
            match self.node(id) {
                Node::Terminal(e) => vars.extend(e.variables()),
                Node::Internal { test, .. } => {
                    vars.extend(self.test(test).variables().map(str::to_string));
                }
            }
        }
        vars
    }
}
