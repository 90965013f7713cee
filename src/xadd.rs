//! The node registry: the shared, hash-consed arena behind every diagram.
//!
//! All diagram operations go through a single [`Xadd`] instance, in the
//! same manager-centric style as a BDD package. The registry owns
//!
//! - the variable table (declaration order is the global order),
//! - the test table (every [`LinearTest`] appears once, in canonical sign),
//! - the node arena with its unique table, and
//! - the computed table used by [`apply`][Xadd::apply].
//!
//! Nodes are never freed; the registry is dropped as a whole.
//!
//! # Canonical nodes
//!
//! [`mk_node`][Xadd::mk_node] collapses `high == low` and reuses structurally
//! equal nodes, so two handles are equal exactly when they denote the same
//! graph. [`internal`][Xadd::internal] additionally brings a test into
//! canonical sign first, swapping the branches if that negated it.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Debug;

use log::debug;
use num_rational::BigRational;

use crate::cache::{Cache, OpKey};
use crate::config::XaddConfig;
use crate::error::{Result, XaddError};
use crate::expr::Expr;
use crate::linear::{LinearTest, Outcome, Relation};
use crate::node::Node;
use crate::reference::{NodeId, TestId};
use crate::types::{Level, VarDecl};

#[derive(Default)]
struct Variables {
    decls: Vec<VarDecl>,
    index: HashMap<String, Level>,
}

/// Position of a test in the fixed test order: coefficients by variable
/// level, then the constant, then strictness.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
struct TestKey {
    terms: Vec<(usize, String, BigRational)>,
    constant: BigRational,
    strict: bool,
}

#[derive(Default)]
struct Tests {
    tests: Vec<LinearTest>,
    keys: Vec<TestKey>,
    index: HashMap<LinearTest, TestId>,
}

#[derive(Default)]
struct Storage {
    nodes: Vec<Node>,
    unique: HashMap<(TestId, NodeId, NodeId), NodeId>,
    terminals: HashMap<Expr, NodeId>,
}

impl Storage {
    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
}

pub struct Xadd {
    config: XaddConfig,
    vars: RefCell<Variables>,
    tests: RefCell<Tests>,
    storage: RefCell<Storage>,
    pub(crate) cache: RefCell<Cache<OpKey, NodeId>>,
}

impl Xadd {
    pub fn new(config: XaddConfig) -> Self {
        let mut storage = Storage {
            nodes: Vec::with_capacity(config.node_capacity),
            ..Default::default()
        };

        // Reserve the constant terminals:
        for (value, expected) in [(Expr::zero(), NodeId::ZERO), (Expr::one(), NodeId::ONE)] {
            let id = storage.push(Node::Terminal(value.clone()));
            assert_eq!(id, expected);
            storage.terminals.insert(value, id);
        }

        Self {
            config,
            vars: RefCell::new(Variables::default()),
            tests: RefCell::new(Tests::default()),
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::with_capacity(config.cache_capacity)),
        }
    }

    pub fn config(&self) -> &XaddConfig {
        &self.config
    }

    pub fn cache(&self) -> std::cell::Ref<'_, Cache<OpKey, NodeId>> {
        self.cache.borrow()
    }
}

impl Default for Xadd {
    fn default() -> Self {
        Xadd::new(XaddConfig::default())
    }
}

impl Debug for Xadd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.borrow();
        f.debug_struct("Xadd")
            .field("variables", &self.vars.borrow().decls.len())
            .field("tests", &self.tests.borrow().tests.len())
            .field("nodes", &self.storage.borrow().nodes.len())
            .field("cache_size", &cache.len())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

// Variables
impl Xadd {
    /// Declare a variable, appending it to the global order.
    ///
    /// Declaring an existing name with the same domain is allowed; bounds
    /// given by the new declaration replace the old ones.
    pub fn declare(&self, decl: VarDecl) -> Result<Level> {
        debug!("declare({})", decl);
        let mut vars = self.vars.borrow_mut();
        if let Some(&level) = vars.index.get(&decl.name) {
            let existing = &mut vars.decls[level.index()];
            if existing.domain != decl.domain {
                return Err(XaddError::VariableRedeclared(decl.name));
            }
            if decl.lower.is_some() || decl.upper.is_some() {
                existing.lower = decl.lower;
                existing.upper = decl.upper;
            }
            return Ok(level);
        }
        let level = Level::new(vars.decls.len());
        vars.index.insert(decl.name.clone(), level);
        vars.decls.push(decl);
        Ok(level)
    }

    pub fn var(&self, name: &str) -> Option<VarDecl> {
        let vars = self.vars.borrow();
        vars.index.get(name).map(|level| vars.decls[level.index()].clone())
    }

    pub fn level(&self, name: &str) -> Option<Level> {
        self.vars.borrow().index.get(name).copied()
    }

    /// All declared variables, in order.
    pub fn variables(&self) -> Vec<VarDecl> {
        self.vars.borrow().decls.clone()
    }

    pub(crate) fn require(&self, name: &str) -> Result<VarDecl> {
        self.var(name)
            .ok_or_else(|| XaddError::UndeclaredVariable(name.to_string()))
    }

    /// Whether a test over these variables is integral (all of them discrete).
    fn integral<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Result<bool> {
        let mut integral = true;
        for name in names {
            integral &= self.require(name)?.is_discrete();
        }
        Ok(integral)
    }
}

// Tests
impl Xadd {
    /// Build the test `lhs ⊙ rhs` over declared variables.
    ///
    /// The returned test keeps the direction of the comparison; it becomes
    /// canonical when it is placed in a node.
    pub fn compare(&self, lhs: &Expr, relation: Relation, rhs: &Expr) -> Result<Outcome> {
        let difference = lhs - rhs;
        let integral = self.integral(difference.variables().iter())?;
        LinearTest::compare(lhs, relation, rhs, integral)
    }

    /// Renormalize a test whose variables may have changed domain class
    /// (after substitution or renaming).
    pub(crate) fn retest(&self, lhs: &Expr, strict: bool, constant: &BigRational) -> Result<Outcome> {
        let relation = if strict { Relation::Lt } else { Relation::Le };
        self.compare(lhs, relation, &Expr::constant(constant.clone()))
    }

    /// Intern a test that is already in canonical sign.
    fn intern(&self, test: LinearTest) -> TestId {
        if let Some(&id) = self.tests.borrow().index.get(&test) {
            return id;
        }
        let key = self.test_key(&test);
        let mut tests = self.tests.borrow_mut();
        let id = TestId::new(tests.tests.len() as u32);
        debug!("new test {}: {}", id, test);
        tests.index.insert(test.clone(), id);
        tests.tests.push(test);
        tests.keys.push(key);
        id
    }

    fn test_key(&self, test: &LinearTest) -> TestKey {
        let vars = self.vars.borrow();
        let mut terms: Vec<(usize, String, BigRational)> = test
            .coefficients()
            .iter()
            .map(|(v, c)| {
                let rank = vars.index.get(v).map_or(usize::MAX, |l| l.index());
                (rank, v.clone(), c.clone())
            })
            .collect();
        terms.sort();
        TestKey {
            terms,
            constant: test.constant().clone(),
            strict: test.is_strict(),
        }
    }

    /// The interned test behind `id`.
    pub fn test(&self, id: TestId) -> LinearTest {
        self.tests.borrow().tests[id.index()].clone()
    }

    /// Compare two interned tests in the fixed test order.
    pub fn test_order(&self, a: TestId, b: TestId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let tests = self.tests.borrow();
        tests.keys[a.index()].cmp(&tests.keys[b.index()])
    }

    pub fn num_tests(&self) -> usize {
        self.tests.borrow().tests.len()
    }
}

// Nodes
impl Xadd {
    pub fn zero(&self) -> NodeId {
        NodeId::ZERO
    }

    pub fn one(&self) -> NodeId {
        NodeId::ONE
    }

    /// The leaf holding `expr`.
    pub fn terminal(&self, expr: Expr) -> NodeId {
        if let Some(&id) = self.storage.borrow().terminals.get(&expr) {
            return id;
        }
        let mut storage = self.storage.borrow_mut();
        let id = storage.push(Node::Terminal(expr.clone()));
        storage.terminals.insert(expr, id);
        id
    }

    pub fn constant(&self, value: BigRational) -> NodeId {
        self.terminal(Expr::constant(value))
    }

    /// The node `test ? high : low` for an interned (canonical) test.
    pub fn mk_node(&self, test: TestId, high: NodeId, low: NodeId) -> NodeId {
        if high == low {
            return low;
        }
        let key = (test, high, low);
        if let Some(&id) = self.storage.borrow().unique.get(&key) {
            return id;
        }
        let mut storage = self.storage.borrow_mut();
        let id = storage.push(Node::Internal { test, high, low });
        storage.unique.insert(key, id);
        id
    }

    /// The node `test ? high : low` for an arbitrary test.
    pub fn internal(&self, test: LinearTest, high: NodeId, low: NodeId) -> NodeId {
        if high == low {
            debug!("internal: duplicates {} == {}", high, low);
            return low;
        }
        let (test, negated) = test.canonical();
        let id = self.intern(test);
        if negated {
            self.mk_node(id, low, high)
        } else {
            self.mk_node(id, high, low)
        }
    }

    /// # Panics
    ///
    /// Panics with `DanglingReference` if `id` was not created by this registry.
    pub fn node(&self, id: NodeId) -> Node {
        match self.storage.borrow().nodes.get(id.index()) {
            Some(node) => node.clone(),
            None => panic!("DanglingReference: no node {} in this registry", id),
        }
    }

    pub fn is_terminal(&self, id: NodeId) -> bool {
        self.node(id).is_terminal()
    }

    pub fn expression(&self, id: NodeId) -> Option<Expr> {
        match self.node(id) {
            Node::Terminal(e) => Some(e),
            Node::Internal { .. } => None,
        }
    }

    /// `(test, high, low)` of an internal node.
    pub fn branch(&self, id: NodeId) -> Option<(TestId, NodeId, NodeId)> {
        self.node(id).branch()
    }

    /// Total number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.storage.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct nodes reachable from `root`.
    pub fn size(&self, root: NodeId) -> usize {
        self.descendants([root]).len()
    }

    /// All nodes reachable from `roots`, children before parents.
    pub fn descendants(&self, roots: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<(NodeId, bool)> = roots.into_iter().map(|r| (r, false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            if let Some((_, high, low)) = self.branch(id) {
                stack.push((low, false));
                stack.push((high, false));
            }
        }
        order
    }

    /// Distinct tests on the paths below `root`, by number of occurrences.
    pub fn test_histogram(&self, root: NodeId) -> BTreeMap<TestId, usize> {
        let mut histogram = BTreeMap::new();
        for id in self.descendants([root]) {
            if let Some((test, _, _)) = self.branch(id) {
                *histogram.entry(test).or_insert(0) += 1;
            }
        }
        histogram
    }

    /// Drop all memoized operation results.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}
