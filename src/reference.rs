use std::fmt::{Display, Formatter};

/// A handle to a node in the [`Xadd`][crate::xadd::Xadd] registry.
///
/// Handles are plain indices: equal handles denote the same node, and since
/// nodes are hash-consed, equal functions built in the same registry (and
/// reduced) get equal handles.
///
/// # Terminal Values
///
/// - `NodeId::ZERO`: the constant leaf `0`
/// - `NodeId::ONE`: the constant leaf `1`
///
/// Other leaves get ordinary indices; use
/// [`Xadd::is_terminal`][crate::xadd::Xadd::is_terminal] to tell them apart.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const ZERO: NodeId = NodeId(0);
    pub const ONE: NodeId = NodeId(1);

    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_one(self) -> bool {
        self.0 == 1
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A handle to an interned [`LinearTest`][crate::linear::LinearTest].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TestId(u32);

impl TestId {
    pub const fn new(index: u32) -> Self {
        TestId(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for TestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}
