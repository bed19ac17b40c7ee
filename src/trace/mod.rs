//! Trace Records - nested statistics tree produced by one reduction run
//!
//! ## Shape
//!
//! ```text
//! TraceNode "LLL"              data: rhf, ghr, hvr, walltime
//!   ├── TraceNode ("tour", 0)  data: swaps, size_reductions, rhf, ghr, hvr, walltime
//!   └── TraceNode ("tour", 1)  ...
//! ```
//!
//! Children are addressed by `(label, index)`. Siblings are unique per key, so
//! metrics computed after a context closed can be injected with
//! [`TraceNode::node_mut`].
//!
//! ## Usage
//!
//! ```rust
//! use bkz_compare::trace::Tracer;
//!
//! let mut tracer = Tracer::new("LLL", false);
//! tracer.context("tour", Some(0), |t| {
//!     t.increment("swaps", 3.0);
//!     Ok(())
//! })?;
//!
//! let mut trace = tracer.finish();
//! trace.node_mut("tour", Some(0))?.data_mut().insert("rhf", 1.02);
//! assert_eq!(trace.find("tour", Some(0)).unwrap().data().get("swaps"), Some(3.0));
//! # Ok::<(), bkz_compare::Error>(())
//! ```

mod metrics;
mod tracer;

pub use metrics::Metrics;
pub use tracer::{Tracer, WALLTIME};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One node of a trace tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceNode {
    label: String,
    index: Option<usize>,
    data: Metrics,
    children: Vec<TraceNode>,
}

impl TraceNode {
    /// Create an empty node.
    #[must_use]
    pub fn new(label: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            label: label.into(),
            index,
            data: Metrics::new(),
            children: Vec::new(),
        }
    }

    /// Node label (e.g. `"tour"`).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Node index (e.g. the tour number).
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// Metrics attached to this node.
    #[must_use]
    pub const fn data(&self) -> &Metrics {
        &self.data
    }

    /// Mutable access to this node's metrics.
    pub fn data_mut(&mut self) -> &mut Metrics {
        &mut self.data
    }

    /// Direct children in creation order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    fn matches(&self, label: &str, index: Option<usize>) -> bool {
        self.label == label && self.index == index
    }

    /// Find a direct child by `(label, index)`.
    #[must_use]
    pub fn find(&self, label: &str, index: Option<usize>) -> Option<&Self> {
        self.children.iter().find(|c| c.matches(label, index))
    }

    /// Find a direct child by `(label, index)`, mutably.
    pub fn find_mut(&mut self, label: &str, index: Option<usize>) -> Option<&mut Self> {
        self.children.iter_mut().find(|c| c.matches(label, index))
    }

    /// Mutable handle to a direct child for late metric injection.
    ///
    /// # Errors
    ///
    /// Returns `TraceNodeNotFound` if no child has this `(label, index)`.
    pub fn node_mut(&mut self, label: &str, index: Option<usize>) -> Result<&mut Self> {
        self.find_mut(label, index)
            .ok_or_else(|| Error::TraceNodeNotFound {
                label: label.to_string(),
                index,
            })
    }

    /// Follow a path of `(label, index)` keys from this node.
    #[must_use]
    pub fn find_path(&self, path: &[(&str, Option<usize>)]) -> Option<&Self> {
        path.iter()
            .try_fold(self, |node, (label, index)| node.find(label, *index))
    }

    /// Position of the child with this key, creating it if absent.
    pub(crate) fn child_position(&mut self, label: &str, index: Option<usize>) -> usize {
        if let Some(pos) = self.children.iter().position(|c| c.matches(label, index)) {
            return pos;
        }
        self.children.push(Self::new(label, index));
        self.children.len() - 1
    }

    /// Total number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TraceNode {
        let mut root = TraceNode::new("BKZ", None);
        for i in 0..3 {
            let pos = root.child_position("tour", Some(i));
            let tour = &mut root.children[pos];
            tour.data_mut().insert("swaps", i as f64);
            tour.child_position("preprocessing", None);
        }
        root
    }

    #[test]
    fn test_find_by_label_and_index() {
        let root = sample_tree();
        let tour = root.find("tour", Some(1)).unwrap();
        assert_eq!(tour.data().get("swaps"), Some(1.0));
        assert!(root.find("tour", Some(7)).is_none());
        assert!(root.find("tour", None).is_none());
    }

    #[test]
    fn test_node_mut_injects_metrics() {
        let mut root = sample_tree();
        root.node_mut("tour", Some(2)).unwrap().data_mut().insert("rhf", 1.01);
        assert_eq!(root.find("tour", Some(2)).unwrap().data().get("rhf"), Some(1.01));
    }

    #[test]
    fn test_node_mut_missing_path_errors() {
        let mut root = sample_tree();
        let err = root.node_mut("tour", Some(9)).unwrap_err();
        assert!(matches!(err, Error::TraceNodeNotFound { index: Some(9), .. }));
    }

    #[test]
    fn test_child_position_is_unique_per_key() {
        let mut root = sample_tree();
        let before = root.children().len();
        let pos = root.child_position("tour", Some(0));
        assert_eq!(pos, 0);
        assert_eq!(root.children().len(), before);
    }

    #[test]
    fn test_find_path_and_node_count() {
        let root = sample_tree();
        assert!(root
            .find_path(&[("tour", Some(0)), ("preprocessing", None)])
            .is_some());
        assert!(root.find_path(&[("preprocessing", None)]).is_none());
        assert_eq!(root.node_count(), 7);
    }

    #[test]
    fn test_serde_roundtrip_keeps_structure() {
        let root = sample_tree();
        let json = serde_json::to_string(&root).unwrap();
        let back: TraceNode = serde_json::from_str(&json).unwrap();
        assert_eq!(root, back);
    }
}
