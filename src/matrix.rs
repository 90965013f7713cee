//! Symbolic matrices and vectors.
//!
//! A [`Matrix`] is a diagram read as a function of two groups of variables:
//! the row variables and the column variables. Entry `(r, c)` is the value of
//! the diagram at the assignment `rows = r, cols = c`. A (column) vector has
//! row variables only.
//!
//! Multiplication never enumerates indices: the column variables of the
//! left operand are identified with the row variables of the right one, the
//! diagrams are multiplied pointwise, and the shared variables are summed out
//! by the elimination engine.
//!
//! [`lifted_pagerank`] runs PageRank power iteration on such a matrix, with
//! every index group ranging over a bounded box of integer attributes.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Formatter};

use log::{debug, info};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::apply::Op;
use crate::diagram::Diagram;
use crate::error::{Result, XaddError};
use crate::expr::Expr;
use crate::linear::Relation;
use crate::reference::NodeId;
use crate::types::VarDecl;
use crate::xadd::Xadd;

#[derive(Clone)]
pub struct Matrix<'a> {
    diagram: Diagram<'a>,
    rows: Vec<String>,
    cols: Vec<String>,
}

impl<'a> Matrix<'a> {
    /// # Errors
    ///
    /// [`XaddError::DimensionMismatch`] if a variable is both a row and a column variable.
    pub fn new(diagram: Diagram<'a>, rows: Vec<String>, cols: Vec<String>) -> Result<Self> {
        if let Some(v) = rows.iter().find(|v| cols.contains(*v)) {
            return Err(XaddError::DimensionMismatch(format!(
                "`{}` is both a row and a column variable",
                v
            )));
        }
        Ok(Self { diagram, rows, cols })
    }

    /// A column vector indexed by `vars`.
    pub fn vector(diagram: Diagram<'a>, vars: Vec<String>) -> Self {
        Self {
            diagram,
            rows: vars,
            cols: Vec::new(),
        }
    }

    pub fn diagram(&self) -> Diagram<'a> {
        self.diagram
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn cols(&self) -> &[String] {
        &self.cols
    }

    /// One of the index lists is empty: a column vector as built by
    /// [`Matrix::vector`], or a row vector with no row variables.
    pub fn is_vector(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    fn xadd(&self) -> &'a Xadd {
        self.diagram.xadd()
    }

    fn with_diagram(&self, diagram: Diagram<'a>) -> Self {
        Self {
            diagram,
            rows: self.rows.clone(),
            cols: self.cols.clone(),
        }
    }

    /// `self · other`, summing out `shared`.
    ///
    /// The row variables of `other` (if any) are first renamed onto the
    /// column variables of `self`, position by position. The result keeps
    /// the rows of `self` and the columns of `other`, minus `shared`.
    pub fn multiply(&self, other: &Matrix<'a>, shared: &[&str]) -> Result<Matrix<'a>> {
        debug!(
            "multiply(rows = {:?}, cols = {:?}, other.rows = {:?}, other.cols = {:?}, shared = {:?})",
            self.rows, self.cols, other.rows, other.cols, shared
        );

        let mut right = other.diagram;
        if !other.rows.is_empty() {
            if other.rows.len() != self.cols.len() {
                return Err(XaddError::DimensionMismatch(format!(
                    "{} columns against {} rows",
                    self.cols.len(),
                    other.rows.len()
                )));
            }
            if let Some(v) = other.cols.iter().find(|v| self.cols.contains(*v)) {
                return Err(XaddError::DimensionMismatch(format!(
                    "column variable `{}` of the right operand clashes with the left operand",
                    v
                )));
            }
            let mapping: HashMap<String, String> = other
                .rows
                .iter()
                .zip(&self.cols)
                .filter(|(from, to)| from != to)
                .map(|(from, to)| (from.clone(), to.clone()))
                .collect();
            if !mapping.is_empty() {
                right = right.rename(&mapping)?;
            }
        }

        let product = self.diagram.product(&right)?;
        let result = product.eliminate_all(shared.iter().copied())?;

        let keep = |vars: &[String]| -> Vec<String> {
            vars.iter()
                .filter(|v| !shared.contains(&v.as_str()))
                .cloned()
                .collect()
        };
        Ok(Matrix {
            diagram: result,
            rows: keep(&self.rows),
            cols: keep(&other.cols),
        })
    }

    /// `self · other` over all columns of `self`.
    pub fn mul(&self, other: &Matrix<'a>) -> Result<Matrix<'a>> {
        let shared: Vec<&str> = self.cols.iter().map(String::as_str).collect();
        self.multiply(other, &shared)
    }

    pub fn transpose(&self) -> Matrix<'a> {
        Matrix {
            diagram: self.diagram,
            rows: self.cols.clone(),
            cols: self.rows.clone(),
        }
    }

    /// Entrywise sum. `other` is renamed onto the variables of `self` if needed.
    pub fn add(&self, other: &Matrix<'a>) -> Result<Matrix<'a>> {
        if self.rows.len() != other.rows.len() || self.cols.len() != other.cols.len() {
            return Err(XaddError::DimensionMismatch(format!(
                "{}x{} against {}x{} index groups",
                self.rows.len(),
                self.cols.len(),
                other.rows.len(),
                other.cols.len()
            )));
        }
        let mapping: HashMap<String, String> = other
            .rows
            .iter()
            .zip(&self.rows)
            .chain(other.cols.iter().zip(&self.cols))
            .filter(|(from, to)| from != to)
            .map(|(from, to)| (from.clone(), to.clone()))
            .collect();
        let right = if mapping.is_empty() {
            other.diagram
        } else {
            other.diagram.rename(&mapping)?
        };
        Ok(self.with_diagram(self.diagram.sum(&right)?))
    }

    pub fn scale(&self, factor: &BigRational) -> Matrix<'a> {
        self.with_diagram(self.diagram.scale(factor))
    }

    /// Rename variables in the diagram and in the index lists.
    pub fn rename(&self, mapping: &HashMap<String, String>) -> Result<Matrix<'a>> {
        let diagram = self.diagram.rename(mapping)?;
        let rename = |vars: &[String]| -> Vec<String> {
            vars.iter()
                .map(|v| mapping.get(v).cloned().unwrap_or_else(|| v.clone()))
                .collect()
        };
        Matrix::new(diagram, rename(&self.rows), rename(&self.cols))
    }

    pub fn reduce(&self) -> Matrix<'a> {
        self.with_diagram(self.diagram.reduce())
    }

    /// Sum of all entries.
    pub fn sum_all(&self) -> Result<BigRational> {
        let vars = self.rows.iter().chain(&self.cols).map(String::as_str);
        let total = self.diagram.eliminate_all(vars)?;
        total.evaluate(&HashMap::new())
    }

    /// The entry at the given row and column indices.
    pub fn element(&self, row: &[BigRational], col: &[BigRational]) -> Result<BigRational> {
        if row.len() != self.rows.len() || col.len() != self.cols.len() {
            return Err(XaddError::DimensionMismatch(format!(
                "index of length {}+{} for a {}x{} matrix",
                row.len(),
                col.len(),
                self.rows.len(),
                self.cols.len()
            )));
        }
        let assignment: HashMap<String, BigRational> = self
            .rows
            .iter()
            .zip(row)
            .chain(self.cols.iter().zip(col))
            .map(|(v, x)| (v.clone(), x.clone()))
            .collect();
        self.diagram.evaluate(&assignment)
    }

    /// Variables of the diagram that are neither rows nor columns.
    pub fn parameters(&self) -> BTreeSet<String> {
        let mut vars = self.diagram.variables();
        for v in self.rows.iter().chain(&self.cols) {
            vars.remove(v);
        }
        vars
    }
}

impl Debug for Matrix<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("diagram", &self.diagram)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

/// Parameters of [`lifted_pagerank`].
#[derive(Debug, Clone)]
pub struct PageRankOptions {
    /// Probability of following a link rather than teleporting.
    pub damping: BigRational,
    /// Stop once the L1 distance between two iterates is at most `delta`.
    pub delta: BigRational,
    /// Upper limit on the number of iterations.
    pub iterations: usize,
}

impl Default for PageRankOptions {
    fn default() -> Self {
        Self {
            damping: BigRational::new(BigInt::from(85), BigInt::from(100)),
            delta: BigRational::new(BigInt::from(1), BigInt::from(1000)),
            iterations: 100,
        }
    }
}

impl PageRankOptions {
    pub fn with_damping(mut self, damping: BigRational) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_delta(mut self, delta: BigRational) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }
}

/// Result of [`lifted_pagerank`].
#[derive(Debug)]
pub struct PageRank<'a> {
    /// The rank vector, indexed by the attribute variables.
    pub ranks: Matrix<'a>,
    pub iterations: usize,
    pub converged: bool,
    /// L1 distance between the last two iterates.
    pub residual: BigRational,
}

impl PageRank<'_> {
    /// Rank of the node with the given attribute values.
    pub fn rank(&self, values: &[BigRational]) -> Result<BigRational> {
        self.ranks.element(values, &[])
    }
}

/// `[lower ≤ v ≤ upper]` for every declared attribute.
fn domain<'a>(xadd: &'a Xadd, variables: &[VarDecl]) -> Result<(Diagram<'a>, BigRational)> {
    let mut indicator = NodeId::ONE;
    let mut size = BigRational::one();
    for decl in variables {
        let lower = decl
            .lower
            .clone()
            .ok_or_else(|| XaddError::UnboundedVariable(decl.name.clone(), "lower"))?;
        let upper = decl
            .upper
            .clone()
            .ok_or_else(|| XaddError::UnboundedVariable(decl.name.clone(), "upper"))?;
        let v = Expr::var(decl.name.clone());
        let lo = xadd.outcome(xadd.compare(&v, Relation::Ge, &Expr::constant(lower.clone()))?);
        let hi = xadd.outcome(xadd.compare(&v, Relation::Le, &Expr::constant(upper.clone()))?);
        indicator = xadd.apply(Op::Product, indicator, lo)?;
        indicator = xadd.apply(Op::Product, indicator, hi)?;
        size *= upper - lower + BigRational::one();
    }
    Ok((Diagram::new(xadd, indicator), size))
}

/// PageRank over the bounded attribute box described by `variables`.
///
/// `matrix` holds the link weight from row node to column node; its row and
/// column variables correspond position by position to `variables`. Every
/// iteration computes
///
/// `v'(a) = [a in box] · ((1 - d) / N + d · Σ_b M(b, a) · v(b))`
///
/// where `N` is the number of attribute vectors in the box, and stops once
/// the L1 distance `Σ_a |v'(a) - v(a)|` drops to `delta`.
pub fn lifted_pagerank<'a>(
    matrix: &Matrix<'a>,
    variables: &[VarDecl],
    options: &PageRankOptions,
) -> Result<PageRank<'a>> {
    let xadd = matrix.xadd();
    if matrix.rows.len() != variables.len() || matrix.cols.len() != variables.len() {
        return Err(XaddError::DimensionMismatch(format!(
            "{}x{} index groups for {} attributes",
            matrix.rows.len(),
            matrix.cols.len(),
            variables.len()
        )));
    }

    // Every index group ranges over the same box.
    for (i, decl) in variables.iter().enumerate() {
        if !decl.is_discrete() {
            return Err(XaddError::DimensionMismatch(format!(
                "attribute `{}` is not an integer index",
                decl.name
            )));
        }
        for name in [&decl.name, &matrix.rows[i], &matrix.cols[i]] {
            let mut d = decl.clone();
            d.name = name.clone();
            xadd.declare(d)?;
        }
    }

    let names: Vec<String> = variables.iter().map(|d| d.name.clone()).collect();
    let (indicator, size) = domain(xadd, variables)?;
    info!("lifted pagerank over {} attribute vectors", size);

    // Rank flows from row to column: v' = Mᵀ v.
    let flow = matrix.transpose();
    let to_names: HashMap<String, String> = flow.rows.iter().cloned().zip(names.iter().cloned()).collect();
    let teleport = indicator.scale(&((BigRational::one() - &options.damping) / &size));

    let mut ranks = indicator.scale(&size.recip());
    let mut residual = BigRational::zero();
    for iteration in 1..=options.iterations {
        let v = Matrix::vector(ranks, names.clone());
        let moved = flow.mul(&v)?.rename(&to_names)?;
        let linked = indicator.product(&moved.diagram.scale(&options.damping))?;
        let next = teleport.sum(&linked)?.reduce();

        let diff = next.difference(&ranks)?;
        let negated = diff.scale(&-BigRational::one());
        let distance = diff.max(&negated)?;
        residual = distance
            .eliminate_all(names.iter().map(String::as_str))?
            .evaluate(&HashMap::new())?;
        debug!("lifted pagerank: iteration {}, residual {}", iteration, residual);

        ranks = next;
        if residual <= options.delta {
            info!("lifted pagerank converged after {} iterations", iteration);
            return Ok(PageRank {
                ranks: Matrix::vector(ranks, names),
                iterations: iteration,
                converged: true,
                residual,
            });
        }
    }

    Ok(PageRank {
        ranks: Matrix::vector(ranks, names),
        iterations: options.iterations,
        converged: false,
        residual,
    })
}
