//! Path-consistency reduction.
//!
//! A node whose test is decided by the tests on the path leading to it is
//! redundant: if the path entails the test, only the high child is
//! reachable; if it entails the negation, only the low child. The pass walks
//! the diagram top-down collecting path constraints and rebuilds it
//! bottom-up without the redundant nodes.
//!
//! Entailment `P ⊨ t` is checked as infeasibility of `P ∧ ¬t` by
//! Fourier–Motzkin elimination over the rationals. Integral tests are
//! tightened at every step, which keeps the check sound for discrete
//! variables. The pass never consults declared variable bounds.
//!
//! Only the part of the path connected to the variables of a subtree can
//! decide anything inside it (see [`connected`]), so results are memoized
//! on that part alone. A node shared by many paths that differ elsewhere
//! is rebuilt once.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use log::debug;

use crate::linear::{connected, feasible, LinearTest};
use crate::reference::{NodeId, TestId};
use crate::xadd::Xadd;

/// Variables mentioned by the tests of each visited subtree.
pub(crate) type Support = HashMap<NodeId, Rc<BTreeSet<String>>>;

struct Reduction<'a, 'l> {
    xadd: &'a Xadd,
    live: Option<&'l [&'l str]>,
    path: Vec<(TestId, bool)>,
    /// The path tests, oriented by the branch taken.
    constraints: Vec<LinearTest>,
    support: Support,
    cache: HashMap<(NodeId, Vec<(TestId, bool)>), NodeId>,
}

impl Xadd {
    /// Remove every node whose test is entailed or contradicted by its path.
    ///
    /// With `live` given, tests mentioning a variable outside `live` are kept
    /// as they are and do not constrain the nodes below them.
    pub fn reduce(&self, root: NodeId, live: Option<&[&str]>) -> NodeId {
        debug!("reduce(root = {}, live = {:?})", root, live);
        let mut reduction = Reduction {
            xadd: self,
            live,
            path: Vec::new(),
            constraints: Vec::new(),
            support: HashMap::new(),
            cache: HashMap::new(),
        };
        let res = reduction.reduce(root);
        debug!(
            "computed: reduce(root = {}) -> {} ({} memo entries)",
            root,
            res,
            reduction.cache.len()
        );
        res
    }

    /// Variables of the tests below `id`, leaves excluded.
    pub(crate) fn test_support(&self, id: NodeId, memo: &mut Support) -> Rc<BTreeSet<String>> {
        if let Some(vars) = memo.get(&id) {
            return Rc::clone(vars);
        }
        let vars = match self.branch(id) {
            None => BTreeSet::new(),
            Some((test, high, low)) => {
                let mut vars: BTreeSet<String> = self.test(test).variables().map(String::from).collect();
                vars.extend(self.test_support(high, memo).iter().cloned());
                vars.extend(self.test_support(low, memo).iter().cloned());
                vars
            }
        };
        let vars = Rc::new(vars);
        memo.insert(id, Rc::clone(&vars));
        vars
    }
}

impl Reduction<'_, '_> {
    fn reduce(&mut self, id: NodeId) -> NodeId {
        let Some((test_id, high, low)) = self.xadd.branch(id) else {
            return id;
        };

        let support = self.xadd.test_support(id, &mut self.support);
        let relevant = connected(&self.constraints, &support);
        let mut context: Vec<(TestId, bool)> = relevant.iter().map(|&i| self.path[i]).collect();
        context.sort();
        context.dedup();

        let key = (id, context);
        if let Some(&res) = self.cache.get(&key) {
            return res;
        }

        let test = self.xadd.test(test_id);
        let tracked = match self.live {
            None => true,
            Some(live) => test.variables().all(|v| live.contains(&v)),
        };

        let res = if !tracked {
            let h = self.reduce(high);
            let l = self.reduce(low);
            self.xadd.mk_node(test_id, h, l)
        } else {
            let mut constraints: Vec<LinearTest> = relevant.iter().map(|&i| self.constraints[i].clone()).collect();
            constraints.push(test.complement());
            let entailed = !feasible(&constraints);
            constraints.pop();
            constraints.push(test.clone());
            let contradicted = !feasible(&constraints);

            if entailed {
                debug!("reduce: {} entailed on path", test_id);
                self.reduce(high)
            } else if contradicted {
                debug!("reduce: {} contradicted on path", test_id);
                self.reduce(low)
            } else {
                let h = self.descend(high, (test_id, true), test.clone());
                let l = self.descend(low, (test_id, false), test.complement());
                self.xadd.mk_node(test_id, h, l)
            }
        };

        self.cache.insert(key, res);
        res
    }

    fn descend(&mut self, child: NodeId, step: (TestId, bool), constraint: LinearTest) -> NodeId {
        self.path.push(step);
        self.constraints.push(constraint);
        let res = self.reduce(child);
        self.constraints.pop();
        self.path.pop();
        res
    }
}
