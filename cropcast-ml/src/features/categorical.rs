//! Categorical column pipeline: most-frequent imputation, one-hot encoding
//! with unknown categories ignored, then scaling without centering.

use super::numeric::non_zero_scale;
use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fitted state for one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    /// Replacement for missing cells.
    pub most_frequent: String,
    /// Training vocabulary in sorted order; one indicator per entry.
    pub categories: Vec<String>,
    /// Per-indicator population standard deviation (1 when zero).
    pub scales: Vec<f64>,
}

impl CategoricalColumn {
    /// Fit imputation value, vocabulary and indicator scales.
    pub fn fit(name: &str, values: &[Option<String>]) -> Result<Self, MlError> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_default() += 1;
        }

        // BTreeMap iterates in sorted order and `>` keeps the first maximum,
        // so ties resolve to the smallest category.
        let mut most_frequent: Option<(&str, usize)> = None;
        for (&category, &count) in &counts {
            if most_frequent.is_none_or(|(_, best)| count > best) {
                most_frequent = Some((category, count));
            }
        }
        let (most_frequent, _) = most_frequent.ok_or_else(|| {
            MlError::transformation(format!(
                "categorical column '{name}' has no observed values to compute a most frequent value from"
            ))
        })?;
        let most_frequent = most_frequent.to_string();

        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            *counts.entry(most_frequent.as_str()).or_default() += missing;
        }

        let n = values.len();
        let mut categories = Vec::with_capacity(counts.len());
        let mut scales = Vec::with_capacity(counts.len());
        for (&category, &count) in &counts {
            // A 0/1 indicator with hit rate p has mean p and variance p(1 - p).
            let p = count as f64 / n as f64;
            categories.push(category.to_string());
            scales.push(non_zero_scale((p * (1.0 - p)).sqrt(), p));
        }

        Ok(Self {
            name: name.to_string(),
            most_frequent,
            categories,
            scales,
        })
    }

    /// Number of indicator columns this column expands into.
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Position and scaled value of the hot indicator, or `None` for a
    /// category never seen during fit.
    pub fn encode(&self, value: Option<&str>) -> Option<(usize, f64)> {
        let value = value.unwrap_or(self.most_frequent.as_str());
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
            .map(|idx| (idx, 1.0 / self.scales[idx]))
    }

    /// Output feature names, `<column>=<category>`.
    pub fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(move |c| format!("{}={}", self.name, c))
    }
}
