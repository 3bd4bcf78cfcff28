//! CART (Classification and Regression Tree) builder
//!
//! Deterministic exact-greedy regression trees on gradients and hessians,
//! integer arithmetic only. Each node keeps its rows sorted by every
//! feature, so a split search is one prefix-sum sweep per feature and a
//! split is a stable partition of those sorted lists.

use census_core::{Node, SCALE};

use crate::deterministic::SplitTieBreaker;

/// Largest absolute leaf value (fixed-point log-odds)
pub const MAX_LEAF: i64 = 16 * SCALE;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// L2 penalty added to every hessian sum (fixed-point)
    pub l2_regularization: i64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_leaf: 32,
            l2_regularization: SCALE,
        }
    }
}

/// Row indices sorted by `(value, row)` for every feature column
#[derive(Clone, Debug)]
pub struct SortedColumns {
    rows: usize,
    columns: Vec<Vec<u32>>,
}

impl SortedColumns {
    /// Sort once; the same order is reused by every tree.
    pub fn new(features: &[Vec<i64>], feature_count: usize) -> Self {
        let rows = features.len();
        let columns = (0..feature_count)
            .map(|feature| {
                let mut order: Vec<u32> = (0..rows as u32).collect();
                order.sort_by_key(|&row| (features[row as usize][feature], row));
                order
            })
            .collect();
        Self { rows, columns }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    gain: i128,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: i64, gain: i128, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold, node_id),
        }
    }

    fn beats(&self, current: &SplitCandidate) -> bool {
        self.gain > current.gain
            || (self.gain == current.gain && self.tie_breaker < current.tie_breaker)
    }
}

/// Rows reaching a node, kept sorted per feature
struct NodeRows {
    count: usize,
    sorted: Vec<Vec<u32>>,
}

/// Build a regression tree using the exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<i64>],
    gradients: &'a [i64],
    hessians: &'a [i64],
}

impl<'a> CartBuilder<'a> {
    /// `features`, `gradients` and `hessians` are position-aligned;
    /// callers check lengths.
    pub fn new(
        features: &'a [Vec<i64>],
        gradients: &'a [i64],
        hessians: &'a [i64],
        config: TreeConfig,
    ) -> Self {
        Self {
            config,
            features,
            gradients,
            hessians,
        }
    }

    /// Build tree and return its nodes; node 0 is the root and children
    /// always follow their parent.
    pub fn build(&self, columns: &SortedColumns) -> Vec<Node> {
        let root = NodeRows {
            count: columns.rows,
            sorted: columns.columns.clone(),
        };
        let root_rows: Vec<u32> = (0..columns.rows as u32).collect();

        let mut nodes = Vec::new();
        self.build_node(root, &root_rows, 0, &mut nodes);
        nodes
    }

    fn build_node(&self, rows: NodeRows, members: &[u32], depth: usize, nodes: &mut Vec<Node>) -> i32 {
        let current_idx = nodes.len();
        let (sum_g, sum_h) = self.sums(members);
        let leaf_value = self.leaf_value(sum_g, sum_h);

        if depth >= self.config.max_depth || rows.count < 2 * self.config.min_samples_leaf {
            nodes.push(Node::leaf(current_idx as i32, leaf_value));
            return current_idx as i32;
        }

        let Some(split) = self.find_best_split(&rows, sum_g, sum_h, current_idx) else {
            nodes.push(Node::leaf(current_idx as i32, leaf_value));
            return current_idx as i32;
        };

        let (left, left_members, right, right_members) = self.partition(rows, members, &split);

        // Reserve the parent slot; children are patched in below
        nodes.push(Node::internal(
            current_idx as i32,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));

        let left_idx = self.build_node(left, &left_members, depth + 1, nodes);
        let right_idx = self.build_node(right, &right_members, depth + 1, nodes);

        nodes[current_idx].left = left_idx;
        nodes[current_idx].right = right_idx;

        current_idx as i32
    }

    /// Sweep each feature's sorted rows once, scoring every boundary
    /// between distinct values.
    fn find_best_split(
        &self,
        rows: &NodeRows,
        sum_g: i64,
        sum_h: i64,
        node_id: usize,
    ) -> Option<SplitCandidate> {
        let min_leaf = self.config.min_samples_leaf.max(1);
        let parent_score = self.score(sum_g, sum_h);
        let mut best: Option<SplitCandidate> = None;

        for (feature_idx, sorted) in rows.sorted.iter().enumerate() {
            let mut left_g = 0i64;
            let mut left_h = 0i64;

            for position in 0..sorted.len().saturating_sub(1) {
                let row = sorted[position] as usize;
                left_g = left_g.saturating_add(self.gradients[row]);
                left_h = left_h.saturating_add(self.hessians[row]);

                let left_count = position + 1;
                let right_count = sorted.len() - left_count;
                if left_count < min_leaf {
                    continue;
                }
                if right_count < min_leaf {
                    break;
                }

                let value = self.features[row][feature_idx];
                let next = self.features[sorted[position + 1] as usize][feature_idx];
                if value == next {
                    continue;
                }

                let gain = self.score(left_g, left_h)
                    + self.score(sum_g.saturating_sub(left_g), sum_h.saturating_sub(left_h))
                    - parent_score;
                if gain <= 0 {
                    continue;
                }

                let candidate = SplitCandidate::new(feature_idx, value, gain, node_id);
                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Stable partition of every sorted column by the chosen split
    fn partition(
        &self,
        rows: NodeRows,
        members: &[u32],
        split: &SplitCandidate,
    ) -> (NodeRows, Vec<u32>, NodeRows, Vec<u32>) {
        let goes_left = |row: u32| self.features[row as usize][split.feature_idx] <= split.threshold;

        let (left_members, right_members): (Vec<u32>, Vec<u32>) =
            members.iter().partition(|&&row| goes_left(row));

        let mut left_sorted = Vec::with_capacity(rows.sorted.len());
        let mut right_sorted = Vec::with_capacity(rows.sorted.len());
        for column in rows.sorted {
            let (left, right): (Vec<u32>, Vec<u32>) = column.into_iter().partition(|&row| goes_left(row));
            left_sorted.push(left);
            right_sorted.push(right);
        }

        (
            NodeRows {
                count: left_members.len(),
                sorted: left_sorted,
            },
            left_members,
            NodeRows {
                count: right_members.len(),
                sorted: right_sorted,
            },
            right_members,
        )
    }

    fn sums(&self, members: &[u32]) -> (i64, i64) {
        members.iter().fold((0i64, 0i64), |(g, h), &row| {
            (
                g.saturating_add(self.gradients[row as usize]),
                h.saturating_add(self.hessians[row as usize]),
            )
        })
    }

    /// `G^2 / (H + lambda)` in i128
    fn score(&self, sum_g: i64, sum_h: i64) -> i128 {
        let denominator = sum_h as i128 + self.config.l2_regularization as i128;
        if denominator <= 0 {
            return 0;
        }
        (sum_g as i128 * sum_g as i128) / denominator
    }

    /// Newton step `-G * SCALE / (H + lambda)`, clamped to `MAX_LEAF`
    fn leaf_value(&self, sum_g: i64, sum_h: i64) -> i64 {
        let denominator = sum_h as i128 + self.config.l2_regularization as i128;
        if denominator <= 0 {
            return 0;
        }
        let value = -(sum_g as i128 * SCALE as i128) / denominator;
        value.clamp(-MAX_LEAF as i128, MAX_LEAF as i128) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_core::Tree;

    fn build(features: &[Vec<i64>], gradients: &[i64], hessians: &[i64], config: TreeConfig) -> Vec<Node> {
        let columns = SortedColumns::new(features, features.first().map_or(0, Vec::len));
        CartBuilder::new(features, gradients, hessians, config).build(&columns)
    }

    fn config(max_depth: usize, min_samples_leaf: usize) -> TreeConfig {
        TreeConfig {
            max_depth,
            min_samples_leaf,
            l2_regularization: 0,
        }
    }

    #[test]
    fn test_simple_split() {
        let features = vec![
            vec![100_000, 400_000],
            vec![200_000, 300_000],
            vec![300_000, 200_000],
            vec![400_000, 100_000],
        ];
        // feature 0 separates negative from positive gradients
        let gradients = vec![-SCALE, -SCALE, SCALE, SCALE];
        let hessians = vec![SCALE; 4];

        let nodes = build(&features, &gradients, &hessians, config(1, 1));

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].feature_idx, 0);
        assert_eq!(nodes[0].threshold, 200_000);
        assert_eq!(nodes[nodes[0].left as usize].leaf, Some(SCALE));
        assert_eq!(nodes[nodes[0].right as usize].leaf, Some(-SCALE));

        let tree = Tree::new(nodes, SCALE);
        assert!(tree.validate(2).is_ok());
        assert_eq!(tree.evaluate(&[150_000, 0]), SCALE);
        assert_eq!(tree.evaluate(&[350_000, 0]), -SCALE);
    }

    #[test]
    fn test_equal_gain_prefers_lower_feature() {
        // both columns separate the rows identically
        let features = vec![vec![0, 0], vec![0, 0], vec![SCALE, SCALE], vec![SCALE, SCALE]];
        let gradients = vec![SCALE, SCALE, -SCALE, -SCALE];
        let hessians = vec![SCALE; 4];

        let nodes = build(&features, &gradients, &hessians, config(1, 1));
        assert_eq!(nodes[0].feature_idx, 0);
        assert_eq!(nodes[0].threshold, 0);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let features: Vec<Vec<i64>> = (0..10).map(|i| vec![i * SCALE]).collect();
        let gradients: Vec<i64> = (0..10).map(|i| if i == 0 { -SCALE } else { SCALE / 10 }).collect();
        let hessians = vec![SCALE; 10];

        let nodes = build(&features, &gradients, &hessians, config(3, 3));
        let tree = Tree::new(nodes.clone(), SCALE);
        assert!(tree.validate(1).is_ok());

        // every leaf is reached by at least 3 rows
        let mut reached = vec![0usize; nodes.len()];
        for row in &features {
            let mut idx = 0usize;
            while !nodes[idx].is_leaf() {
                let node = &nodes[idx];
                let child = if row[0] <= node.threshold { node.left } else { node.right };
                idx = child as usize;
            }
            reached[idx] += 1;
        }
        for (idx, node) in nodes.iter().enumerate() {
            if node.is_leaf() {
                assert!(reached[idx] >= 3, "leaf {idx} reached by {}", reached[idx]);
            }
        }
    }

    #[test]
    fn test_leaf_only_tree() {
        let features = vec![vec![100_000]];
        let gradients = vec![-1000];
        let hessians = vec![1000];

        let nodes = build(&features, &gradients, &hessians, TreeConfig::default());
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].leaf.is_some());
    }

    #[test]
    fn test_constant_feature_yields_leaf() {
        let features = vec![vec![5]; 8];
        let gradients = vec![SCALE, -SCALE, SCALE, -SCALE, SCALE, -SCALE, SCALE, -SCALE];
        let hessians = vec![SCALE; 8];

        let nodes = build(&features, &gradients, &hessians, config(4, 1));
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_leaf_value_is_clamped() {
        let features = vec![vec![0]];
        let gradients = vec![-1_000 * SCALE];
        let hessians = vec![1];

        let nodes = build(&features, &gradients, &hessians, config(0, 1));
        assert_eq!(nodes[0].leaf, Some(MAX_LEAF));
    }
}
