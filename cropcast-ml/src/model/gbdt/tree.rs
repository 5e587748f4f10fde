//! Regression tree representation used for both training output and
//! inference.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A tree node. Children are indices into [`RegressionTree::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Rows with `x[feature] <= threshold` go left; everything else,
    /// including NaN, goes right.
    Split {
        feature: u32,
        threshold: f64,
        left: u32,
        right: u32,
    },
    /// Leaf value, already scaled by the learning rate.
    Leaf { value: f64 },
}

/// A binary regression tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<Node>,
}

impl RegressionTree {
    /// Structural check for a tree restored from bytes: every child index
    /// points forward inside `nodes` and every split feature is below
    /// `n_features`. A tree that passes cannot loop or index out of bounds
    /// in [`RegressionTree::predict_row`] given a row of `n_features` values.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            else {
                continue;
            };
            if *feature as usize >= n_features {
                return Err(format!(
                    "node {idx} splits on feature {feature} of {n_features}"
                ));
            }
            for child in [*left as usize, *right as usize] {
                if child <= idx || child >= self.nodes.len() {
                    return Err(format!(
                        "node {idx} has child {child} outside {}..{}",
                        idx + 1,
                        self.nodes.len()
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature as usize] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + walk(nodes, *left as usize).max(walk(nodes, *right as usize))
                }
            }
        }
        walk(&self.nodes, 0)
    }

    /// Largest feature index referenced by a split.
    pub fn max_feature(&self) -> Option<u32> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn stump() -> RegressionTree {
        RegressionTree {
            nodes: vec![
                Node::Split {
                    feature: 1,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: -1.0 },
                Node::Leaf { value: 1.0 },
            ],
        }
    }

    #[test]
    fn test_predict_row() {
        let tree = stump();
        assert_eq!(tree.predict_row(array![9.0, 0.5].view()), -1.0);
        assert_eq!(tree.predict_row(array![9.0, 0.6].view()), 1.0);
        assert_eq!(tree.predict_row(array![9.0, f64::NAN].view()), 1.0);
    }

    #[test]
    fn test_shape_queries() {
        let tree = stump();
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.max_feature(), Some(1));
        let single = RegressionTree {
            nodes: vec![Node::Leaf { value: 0.0 }],
        };
        assert_eq!(single.depth(), 0);
        assert_eq!(single.max_feature(), None);
    }

    #[test]
    fn test_validate_accepts_grown_shape() {
        assert!(stump().validate(2).is_ok());
    }

    #[test]
    fn test_validate_rejects_feature_out_of_range() {
        let err = stump().validate(1).unwrap_err();
        assert!(err.contains("feature 1"));
    }

    #[test]
    fn test_validate_rejects_bad_children() {
        let dangling = RegressionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 7,
                },
                Node::Leaf { value: 0.0 },
            ],
        };
        assert!(dangling.validate(1).unwrap_err().contains("child 7"));

        let cycle = RegressionTree {
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(cycle.validate(1).is_err());
        assert!(RegressionTree { nodes: Vec::new() }.validate(1).is_err());
    }
}
