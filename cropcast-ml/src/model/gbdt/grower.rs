//! Depth-wise tree growth from gradient histograms.
//!
//! All nodes of one depth level are expanded together: for every sampled
//! feature a histogram per frontier node is accumulated in a single pass over
//! that feature's non-default entries, the default bin is recovered from the
//! node totals, and a cumulative scan picks the best threshold.

use super::binning::BinnedMatrix;
use super::params::BoosterParams;
use super::tree::{Node, RegressionTree};
use ndarray::ArrayView2;

/// Marks rows that are not in any frontier node.
const INACTIVE: u32 = u32::MAX;

/// Gradient statistics of a node or histogram bin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GradStats {
    grad: f64,
    hess: f64,
    count: u32,
}

impl GradStats {
    #[inline]
    fn add(&mut self, grad: f64, hess: f64) {
        self.grad += grad;
        self.hess += hess;
        self.count += 1;
    }

    #[inline]
    fn merge(&mut self, other: &GradStats) {
        self.grad += other.grad;
        self.hess += other.hess;
        self.count += other.count;
    }

    #[inline]
    fn minus(&self, other: &GradStats) -> GradStats {
        GradStats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }
}

/// A node waiting to be expanded.
#[derive(Debug, Clone, Copy)]
struct FrontierNode {
    node: usize,
    stats: GradStats,
}

/// Best split found for a frontier node.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: GradStats,
}

/// Grows one regression tree per call.
pub(crate) struct TreeGrower<'a> {
    x: ArrayView2<'a, f64>,
    binned: &'a BinnedMatrix,
    params: &'a BoosterParams,
}

impl<'a> TreeGrower<'a> {
    pub(crate) fn new(
        x: ArrayView2<'a, f64>,
        binned: &'a BinnedMatrix,
        params: &'a BoosterParams,
    ) -> Self {
        Self { x, binned, params }
    }

    /// Grow a tree on the sampled `rows` using only `features`.
    pub(crate) fn grow(
        &self,
        grad: &[f64],
        hess: &[f64],
        rows: &[u32],
        features: &[usize],
    ) -> RegressionTree {
        let mut positions = vec![INACTIVE; self.binned.n_rows];
        let mut root = GradStats::default();
        for &row in rows {
            positions[row as usize] = 0;
            root.add(grad[row as usize], hess[row as usize]);
        }

        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut frontier = vec![FrontierNode {
            node: 0,
            stats: root,
        }];

        for _depth in 0..self.params.max_depth {
            if frontier.is_empty() {
                break;
            }
            let best = self.find_splits(&frontier, &positions, grad, hess, features);

            // Old slot -> (left slot, right slot) in the next frontier.
            let mut routes: Vec<Option<(u32, u32, usize, f64)>> = Vec::with_capacity(frontier.len());
            let mut next = Vec::new();
            for (slot, entry) in frontier.iter().enumerate() {
                match best[slot] {
                    Some(split) => {
                        let left_id = nodes.len();
                        let right_id = left_id + 1;
                        nodes.push(Node::Leaf { value: 0.0 });
                        nodes.push(Node::Leaf { value: 0.0 });
                        nodes[entry.node] = Node::Split {
                            feature: split.feature as u32,
                            threshold: split.threshold,
                            left: left_id as u32,
                            right: right_id as u32,
                        };
                        let left_slot = next.len() as u32;
                        next.push(FrontierNode {
                            node: left_id,
                            stats: split.left,
                        });
                        next.push(FrontierNode {
                            node: right_id,
                            stats: entry.stats.minus(&split.left),
                        });
                        routes.push(Some((left_slot, left_slot + 1, split.feature, split.threshold)));
                    }
                    None => {
                        nodes[entry.node] = self.leaf(&entry.stats);
                        routes.push(None);
                    }
                }
            }

            for (row, slot) in positions.iter_mut().enumerate() {
                if *slot == INACTIVE {
                    continue;
                }
                *slot = match routes[*slot as usize] {
                    Some((left, right, feature, threshold)) => {
                        if self.x[[row, feature]] <= threshold {
                            left
                        } else {
                            right
                        }
                    }
                    None => INACTIVE,
                };
            }
            frontier = next;
        }

        for entry in &frontier {
            nodes[entry.node] = self.leaf(&entry.stats);
        }
        RegressionTree { nodes }
    }

    fn leaf(&self, stats: &GradStats) -> Node {
        Node::Leaf {
            value: self.params.learning_rate * self.params.leaf_weight(stats.grad, stats.hess),
        }
    }

    fn find_splits(
        &self,
        frontier: &[FrontierNode],
        positions: &[u32],
        grad: &[f64],
        hess: &[f64],
        features: &[usize],
    ) -> Vec<Option<SplitCandidate>> {
        let mut best: Vec<Option<SplitCandidate>> = vec![None; frontier.len()];

        for &f in features {
            let feature = &self.binned.features[f];
            let n_bins = feature.n_bins();
            if n_bins < 2 {
                continue;
            }

            let mut hist = vec![GradStats::default(); frontier.len() * n_bins];
            for &(row, bin) in &feature.entries {
                let slot = positions[row as usize];
                if slot != INACTIVE {
                    hist[slot as usize * n_bins + bin as usize]
                        .add(grad[row as usize], hess[row as usize]);
                }
            }

            for (slot, entry) in frontier.iter().enumerate() {
                let bins = &mut hist[slot * n_bins..(slot + 1) * n_bins];
                let mut explicit = GradStats::default();
                for stats in bins.iter() {
                    explicit.merge(stats);
                }
                bins[feature.default_bin as usize] = entry.stats.minus(&explicit);

                let mut left = GradStats::default();
                for (b, stats) in bins[..n_bins - 1].iter().enumerate() {
                    left.merge(stats);
                    let right = entry.stats.minus(&left);
                    if left.count == 0 || right.count == 0 {
                        continue;
                    }
                    if left.hess < self.params.min_child_weight
                        || right.hess < self.params.min_child_weight
                    {
                        continue;
                    }
                    let gain = self.params.split_gain(
                        left.grad,
                        left.hess,
                        entry.stats.grad,
                        entry.stats.hess,
                    );
                    // Strict comparison keeps the earliest feature/bin on ties.
                    if gain > 1e-12 && best[slot].is_none_or(|c| gain > c.gain) {
                        best[slot] = Some(SplitCandidate {
                            feature: f,
                            threshold: feature.cuts[b],
                            gain,
                            left,
                        });
                    }
                }
            }
        }
        best
    }
}
