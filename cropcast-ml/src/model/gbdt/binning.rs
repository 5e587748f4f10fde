//! Feature quantization for histogram-based split finding.
//!
//! Each feature is cut into at most `max_bins` bins. A feature stores only
//! the rows whose bin differs from its most common ("default") bin, so the
//! mostly-zero one-hot columns cost little to scan; the default bin's
//! histogram entry is recovered by subtraction from node totals.

use ndarray::ArrayView2;

/// One quantized feature.
#[derive(Debug, Clone)]
pub struct BinnedFeature {
    /// Ascending split thresholds; bin `b` holds values in `(cuts[b-1], cuts[b]]`.
    pub cuts: Vec<f64>,
    /// Most frequent bin.
    pub default_bin: u16,
    /// `(row, bin)` for every row not in the default bin, ordered by row.
    pub entries: Vec<(u32, u16)>,
}

impl BinnedFeature {
    pub fn n_bins(&self) -> usize {
        self.cuts.len() + 1
    }

    /// Bin index of a raw value.
    #[inline]
    pub fn bin_of(cuts: &[f64], value: f64) -> u16 {
        cuts.partition_point(|&t| t < value) as u16
    }
}

/// Column-wise quantized view of a training matrix.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    pub n_rows: usize,
    pub features: Vec<BinnedFeature>,
}

impl BinnedMatrix {
    pub fn from_matrix(x: ArrayView2<'_, f64>, max_bins: u16) -> Self {
        let features = x
            .columns()
            .into_iter()
            .map(|column| {
                let values: Vec<f64> = column.iter().copied().collect();
                bin_feature(&values, max_bins as usize)
            })
            .collect();
        Self {
            n_rows: x.nrows(),
            features,
        }
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }
}

fn bin_feature(values: &[f64], max_bins: usize) -> BinnedFeature {
    let cuts = compute_cuts(values, max_bins);
    let bins: Vec<u16> = values
        .iter()
        .map(|&v| BinnedFeature::bin_of(&cuts, v))
        .collect();

    let mut counts = vec![0usize; cuts.len() + 1];
    for &b in &bins {
        counts[b as usize] += 1;
    }
    let mut default_bin = 0u16;
    for (b, &count) in counts.iter().enumerate() {
        if count > counts[default_bin as usize] {
            default_bin = b as u16;
        }
    }

    let entries = bins
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b != default_bin)
        .map(|(row, &b)| (row as u32, b))
        .collect();

    BinnedFeature {
        cuts,
        default_bin,
        entries,
    }
}

/// Split thresholds for one feature. Few distinct values get a cut at every
/// midpoint; otherwise cuts sit at evenly spaced quantiles.
fn compute_cuts(values: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    let mut distinct = sorted.clone();
    distinct.dedup();

    if distinct.len() <= 1 {
        return Vec::new();
    }
    if distinct.len() <= max_bins {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    let n = sorted.len();
    let max = sorted[n - 1];
    let mut cuts: Vec<f64> = (1..max_bins)
        .map(|k| {
            let idx = k * n / max_bins;
            let (lo, hi) = (sorted[idx - 1], sorted[idx]);
            if lo < hi { (lo + hi) / 2.0 } else { lo }
        })
        .filter(|&t| t < max)
        .collect();
    cuts.dedup();
    cuts
}
