//! Registry configuration.

/// Configuration for [`Xadd`][crate::xadd::Xadd].
///
/// ```
/// use xadd_rs::config::XaddConfig;
///
/// let config = XaddConfig::default()
///     .with_cache_capacity(1 << 12)
///     .with_reduce_after_eliminate(false);
/// assert_eq!(config.cache_capacity, 4096);
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct XaddConfig {
    /// Initial capacity of the operation caches.
    pub cache_capacity: usize,
    /// Initial capacity of the node table.
    pub node_capacity: usize,
    /// Run the reduction pass on the result of every elimination.
    pub reduce_after_eliminate: bool,
}

impl Default for XaddConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1 << 14,
            node_capacity: 1 << 10,
            reduce_after_eliminate: true,
        }
    }
}

impl XaddConfig {
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_node_capacity(mut self, capacity: usize) -> Self {
        self.node_capacity = capacity;
        self
    }

    pub fn with_reduce_after_eliminate(mut self, reduce: bool) -> Self {
        self.reduce_after_eliminate = reduce;
        self
    }
}
