use crate::expr::Expr;
use crate::reference::{NodeId, TestId};

/// A node of the shared decision graph.
///
/// Internal nodes branch on an interned test: `high` is followed when the
/// test holds, `low` otherwise. Nodes are immutable once created.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Node {
    Terminal(Expr),
    Internal { test: TestId, high: NodeId, low: NodeId },
}

impl Node {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Node::Terminal(_))
    }

    pub fn expression(&self) -> Option<&Expr> {
        match self {
            Node::Terminal(e) => Some(e),
            Node::Internal { .. } => None,
        }
    }

    pub fn branch(&self) -> Option<(TestId, NodeId, NodeId)> {
        match *self {
            Node::Terminal(_) => None,
            Node::Internal { test, high, low } => Some((test, high, low)),
        }
    }
}
