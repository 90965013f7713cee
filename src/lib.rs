//! # xadd-rs: Extended Algebraic Decision Diagrams in Rust
//!
//! **`xadd-rs`** is a manager-centric library for symbolic piecewise polynomials.
//! It is designed for probabilistic inference and lifted computations where sums over
//! many discrete or continuous variables must stay symbolic.
//!
//! ## What is an XADD?
//!
//! An XADD is a decision diagram whose internal nodes hold **linear tests** (`Σ c·x ≤ k`)
//! and whose leaves hold **polynomials** over rational coefficients.
//! Every path fixes a region of the variable space, and the leaf at its end gives the value there.
//! Summing a variable out (or integrating it) is done by resolving the lower and upper bounds
//! the tests impose on it, so the result remains a closed-form diagram over the remaining variables.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: All nodes live in the [`Xadd`][crate::xadd::Xadd] registry.
//!   Structurally equal nodes and tests are hash consed, so every diagram is a lightweight
//!   [`NodeId`][crate::reference::NodeId].
//! - **Exact Arithmetic**: Coefficients and constants are [`BigRational`][num_rational::BigRational].
//! - **Operation Caching**: [`apply`][crate::xadd::Xadd::apply] memoizes results in a computed table.
//! - **Symbolic Elimination**: [`eliminate`][crate::xadd::Xadd::eliminate] sums discrete variables and integrates continuous ones.
//! - **Matrices**: [`matrix`] treats diagrams as matrices over attribute variables, up to lifted PageRank.
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use xadd_rs::builder::Builder;
//! use xadd_rs::expr::int;
//! use xadd_rs::xadd::Xadd;
//!
//! // 1. Initialize the registry
//! let xadd = Xadd::default();
//! let b = Builder::new(&xadd);
//! b.ints(&["x", "y"]).unwrap();
//!
//! // 2. Build f = [0 <= x <= y] * x
//! let region = b.test("x", ">=", "0").unwrap().and(&b.test("x", "<=", "y").unwrap()).unwrap();
//! let f = region.product(&b.exp("x").unwrap()).unwrap();
//!
//! // 3. Sum over x: y*(y+1)/2 for y >= 0
//! let g = f.eliminate("x").unwrap();
//! assert!(!g.variables().contains("x"));
//!
//! let at = |y: i64| HashMap::from([("y".to_string(), int(y))]);
//! assert_eq!(g.evaluate(&at(10)).unwrap(), int(55));
//! assert_eq!(g.evaluate(&at(-1)).unwrap(), int(0));
//! ```
//!
//! ## Core Components
//!
//! - **[`xadd`]**: The registry with variables, tests and nodes.
//! - **[`apply`]**: Pointwise binary operations.
//! - **[`reduce`]**: Removal of unreachable and redundant branches.
//! - **[`eliminate`]**: Symbolic summation and integration.
//! - **[`builder`]** and **[`diagram`]**: The ergonomic front end.
//! - **[`matrix`]** and **[`tree`]**: Matrix algebra and decision tree import.
//! - **[`dot`]**: Visualization using Graphviz.

pub mod apply;
pub mod builder;
pub mod cache;
pub mod config;
pub mod diagram;
pub mod dot;
pub mod eliminate;
pub mod error;
pub mod eval;
pub mod expr;
pub mod linear;
pub mod matrix;
pub mod node;
pub mod reduce;
pub mod reference;
pub mod restrict;
pub mod tree;
pub mod types;
pub mod xadd;
