//! Diagram to DOT (Graphviz) conversion.
//!
//! Rendering only uses the read-only traversal API of the registry
//! ([`is_terminal`][Xadd::is_terminal], [`expression`][Xadd::expression],
//! [`branch`][Xadd::branch], [`test`][Xadd::test]).
//!
//! - **Leaves** are boxes labelled with their polynomial, at the sink rank.
//! - **Internal nodes** are ellipses labelled with their test.
//! - **Edges**: solid for the branch taken when the test holds, dashed otherwise.
//!
//! ```
//! use xadd_rs::builder::Builder;
//! use xadd_rs::xadd::Xadd;
//!
//! let xadd = Xadd::default();
//! let b = Builder::new(&xadd);
//! b.ints(&["x"]).unwrap();
//! let f = b.ite(&b.test("x", "<=", "3").unwrap(), &b.exp("x").unwrap(), &b.terminal(0)).unwrap();
//!
//! let dot = f.to_dot().unwrap();
//! assert!(dot.contains("x <= 3"));
//! ```

use crate::reference::NodeId;
use crate::xadd::Xadd;

/// Configuration options for DOT output.
#[derive(Debug, Clone)]
pub struct DotConfig {
    pub node_shape: &'static str,
    pub terminal_shape: &'static str,
    pub root_shape: &'static str,
    pub high_edge_style: &'static str,
    pub low_edge_style: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "ellipse",
            terminal_shape: "box",
            root_shape: "plaintext",
            high_edge_style: "solid",
            low_edge_style: "dashed",
        }
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Xadd {
    pub fn to_dot(&self, roots: &[NodeId]) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(roots, &DotConfig::default())
    }

    pub fn to_dot_with_config(&self, roots: &[NodeId], config: &DotConfig) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        let all_nodes = self.descendants(roots.iter().copied());

        writeln!(dot, "{{ rank=sink")?;
        for &id in all_nodes.iter().filter(|&&id| self.is_terminal(id)) {
            let label = self.expression(id).map(|e| e.to_string()).unwrap_or_default();
            writeln!(
                dot,
                "{} [shape={}, label=\"{}\"];",
                id.raw(),
                config.terminal_shape,
                escape(&label)
            )?;
        }
        writeln!(dot, "}}")?;

        for &id in all_nodes.iter() {
            if let Some((test, high, low)) = self.branch(id) {
                writeln!(dot, "{} [label=\"{}\"];", id.raw(), escape(&self.test(test).to_string()))?;
                writeln!(dot, "{} -> {} [style={}];", id.raw(), high.raw(), config.high_edge_style)?;
                writeln!(dot, "{} -> {} [style={}];", id.raw(), low.raw(), config.low_edge_style)?;
            }
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape={}, label=\"{}\"];", i, config.root_shape, root)?;
        }
        writeln!(dot, "}}")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} -> {};", i, root.raw())?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::expr::Expr;
    use crate::linear::{Outcome, Relation};
    use crate::types::VarDecl;

    #[test]
    fn test_to_dot_basic() {
        let xadd = Xadd::default();
        xadd.declare(VarDecl::discrete("x")).unwrap();
        let Outcome::Test(t) = xadd.compare(&Expr::var("x"), Relation::Le, &Expr::integer(3)).unwrap() else {
            panic!("expected a proper test");
        };
        let f = xadd.internal(t, xadd.terminal(Expr::var("x")), NodeId::ZERO);

        let dot = xadd.to_dot(&[f]).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("label=\"x <= 3\""));
        assert!(dot.contains("style=dashed"));
    }

    #[test]
    fn test_to_dot_constants() {
        let xadd = Xadd::default();
        let dot = xadd.to_dot(&[NodeId::ZERO, NodeId::ONE]).unwrap();
        assert!(dot.contains("0 [shape=box, label=\"0\"]"));
        assert!(dot.contains("1 [shape=box, label=\"1\"]"));
    }
}
