//! Conversion of axis-aligned decision trees into diagrams.
//!
//! Trees are produced elsewhere (any CART-style learner); only their shape
//! matters here. Feature `i` of the tree is the `i`-th variable of
//! `rows ++ cols`, which is how a classifier trained on concatenated
//! `(source, target)` attribute pairs becomes a matrix.

use num_rational::BigRational;

use crate::builder::Builder;
use crate::diagram::Diagram;
use crate::error::{Result, XaddError};
use crate::expr::Expr;
use crate::linear::Relation;
use crate::xadd::Xadd;

/// A binary decision tree over numeric features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionTree {
    Leaf(BigRational),
    /// `left` is taken when `feature <= threshold`.
    Split {
        feature: usize,
        threshold: BigRational,
        left: Box<DecisionTree>,
        right: Box<DecisionTree>,
    },
}

impl DecisionTree {
    pub fn leaf(value: BigRational) -> Self {
        DecisionTree::Leaf(value)
    }

    pub fn split(feature: usize, threshold: BigRational, left: DecisionTree, right: DecisionTree) -> Self {
        DecisionTree::Split {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            DecisionTree::Leaf(_) => 0,
            DecisionTree::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Build the diagram of `tree`, reading feature `i` as `(rows ++ cols)[i]`.
///
/// The variables must be declared. The result is reduced.
pub fn from_decision_tree<'a>(
    xadd: &'a Xadd,
    tree: &DecisionTree,
    rows: &[String],
    cols: &[String],
) -> Result<Diagram<'a>> {
    let features: Vec<&String> = rows.iter().chain(cols).collect();
    let builder = Builder::new(xadd);
    Ok(convert(&builder, tree, &features)?.reduce())
}

fn convert<'a>(builder: &Builder<'a>, tree: &DecisionTree, features: &[&String]) -> Result<Diagram<'a>> {
    match tree {
        DecisionTree::Leaf(value) => Ok(builder.terminal(value.clone())),
        DecisionTree::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let name = features.get(*feature).ok_or_else(|| {
                XaddError::DimensionMismatch(format!(
                    "feature {} out of range for {} variables",
                    feature,
                    features.len()
                ))
            })?;
            builder.xadd().require(name)?;
            let condition = builder.compare(
                &Expr::var(name.as_str()),
                Relation::Le,
                &Expr::constant(threshold.clone()),
            )?;
            let left = convert(builder, left, features)?;
            let right = convert(builder, right, features)?;
            condition.ite(&left, &right)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use test_log::test;

    use super::*;
    use crate::expr::int;
    use crate::types::VarDecl;

    fn half(n: i64) -> BigRational {
        BigRational::new(n.into(), 2.into())
    }

    #[test]
    fn test_tree_to_diagram() {
        let xadd = Xadd::default();
        for v in ["r_f0", "c_f0"] {
            xadd.declare(VarDecl::discrete(v)).unwrap();
        }
        // r_f0 <= 2.5 ? (c_f0 <= 0.5 ? 1 : 0) : 0.25
        let tree = DecisionTree::split(
            0,
            half(5),
            DecisionTree::split(1, half(1), DecisionTree::leaf(int(1)), DecisionTree::leaf(int(0))),
            DecisionTree::leaf(BigRational::new(1.into(), 4.into())),
        );
        assert_eq!(tree.depth(), 2);
        let rows = vec!["r_f0".to_string()];
        let cols = vec!["c_f0".to_string()];
        let d = from_decision_tree(&xadd, &tree, &rows, &cols).unwrap();
        for r in 0..5 {
            for c in 0..3 {
                let p = HashMap::from([("r_f0".to_string(), int(r)), ("c_f0".to_string(), int(c))]);
                let expected = if r <= 2 {
                    if c == 0 {
                        int(1)
                    } else {
                        int(0)
                    }
                } else {
                    BigRational::new(1.into(), 4.into())
                };
                assert_eq!(d.evaluate(&p).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_feature_out_of_range() {
        let xadd = Xadd::default();
        xadd.declare(VarDecl::discrete("a")).unwrap();
        let tree = DecisionTree::split(3, int(0), DecisionTree::leaf(int(1)), DecisionTree::leaf(int(0)));
        let r = from_decision_tree(&xadd, &tree, &["a".to_string()], &[]);
        assert!(matches!(r, Err(XaddError::DimensionMismatch(_))));
    }
}
