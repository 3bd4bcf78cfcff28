//! Decision tree structures for GBDT inference
//!
//! Integer-only nodes and traversal. Thresholds and leaf values are
//! fixed-point integers at the model scale.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// Internal nodes have `feature_idx >= 0`, valid `left`/`right` child
/// indices and `leaf == None`. Leaves have `feature_idx == -1` and carry
/// their value in `leaf`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature column to split on (-1 for leaf nodes)
    pub feature_idx: i32,

    /// Split threshold (fixed-point); `feature <= threshold` goes left
    pub threshold: i64,

    /// Leaf value (fixed-point log-odds contribution)
    pub leaf: Option<i64>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: i64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single decision tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,

    /// Shrinkage applied to this tree's leaves (fixed-point)
    pub weight: i64,
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: i64) -> Self {
        Self { nodes, weight }
    }

    /// Leaf value reached by `features`.
    ///
    /// Malformed structure evaluates to 0; `validate` rejects such trees
    /// before they are used.
    pub fn evaluate(&self, features: &[i64]) -> i64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0;
            };

            if node.is_leaf() {
                return node.leaf.unwrap_or(0);
            }

            let Some(&value) = features.get(node.feature_idx as usize) else {
                return 0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next < 0 {
                return 0;
            }
            idx = next as usize;
        }
    }

    /// Structural check: children in range and pointing forward, split
    /// features inside `feature_count`, leaves carry values.
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        let len = self.nodes.len() as i32;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("Leaf node {i} has no leaf value"));
                }
                continue;
            }

            for (side, child) in [("left", node.left), ("right", node.right)] {
                // children are stored after their parent, which also rules out cycles
                if child <= i as i32 || child >= len {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Node {i} splits on feature {} but the model has {feature_count} features",
                    node.feature_idx
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        Tree::new(
            vec![
                Node::internal(0, 0, 50, 1, 2),
                Node::leaf(1, 100),
                Node::leaf(2, 200),
            ],
            1_000_000,
        )
    }

    #[test]
    fn test_tree_evaluation() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[30]), 100);
        assert_eq!(tree.evaluate(&[50]), 100); // Equal goes left
        assert_eq!(tree.evaluate(&[60]), 200);
        assert_eq!(tree.evaluate(&[]), 0);
    }

    #[test]
    fn test_tree_validation() {
        assert!(stump().validate(1).is_ok());
        assert!(stump().validate(0).is_err());

        let bad_child = Tree::new(
            vec![
                Node::internal(0, 0, 50, 5, 2),
                Node::leaf(1, 100),
                Node::leaf(2, 200),
            ],
            1_000_000,
        );
        assert!(bad_child.validate(1).is_err());

        let cycle = Tree::new(
            vec![Node::internal(0, 0, 50, 0, 1), Node::leaf(1, 1)],
            1_000_000,
        );
        assert!(cycle.validate(1).is_err());

        assert!(Tree::new(vec![], 1).validate(1).is_err());
    }
}
