//! Feature schema: the fixed partition of input columns into numerical and
//! categorical blocks.

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const STATE_NAME: &str = "State_Name";
pub const DISTRICT_NAME: &str = "District_Name";
pub const SEASON: &str = "Season";
pub const CROP: &str = "Crop";
pub const CROP_YEAR: &str = "Crop_Year";
pub const AREA: &str = "Area";
pub const ANNUAL_RAINFALL: &str = "annual_rainfall";
pub const SOIL_PH: &str = "Soil pH";
pub const SOIL_TYPE: &str = "Soil Type";

/// Role of a column inside a [`FeatureSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Numerical,
    Categorical,
}

/// Named schema presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Every agronomic column, soil measurements included.
    #[default]
    Training,
    /// The columns a serving-time query is guaranteed to carry.
    Serving,
}

impl SchemaKind {
    pub fn schema(self) -> FeatureSchema {
        match self {
            Self::Training => FeatureSchema::training(),
            Self::Serving => FeatureSchema::serving(),
        }
    }
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Training => write!(f, "training"),
            Self::Serving => write!(f, "serving"),
        }
    }
}

impl std::str::FromStr for SchemaKind {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "training" => Ok(Self::Training),
            "serving" => Ok(Self::Serving),
            other => Err(MlError::Config(format!(
                "unknown schema '{other}' (expected 'training' or 'serving')"
            ))),
        }
    }
}

/// Column partition fed to the preprocessor. Block order is numerical first,
/// then categorical, each in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numerical: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeatureSchema {
    pub fn new<N, C>(numerical: N, categorical: C) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            numerical: numerical.into_iter().map(Into::into).collect(),
            categorical: categorical.into_iter().map(Into::into).collect(),
        }
    }

    /// Full schema used by the training CSVs.
    pub fn training() -> Self {
        Self::new(
            [CROP_YEAR, AREA, ANNUAL_RAINFALL, SOIL_PH],
            [STATE_NAME, DISTRICT_NAME, SEASON, CROP, SOIL_TYPE],
        )
    }

    /// Reduced schema matching the serving contract (no soil measurements).
    pub fn serving() -> Self {
        Self::new(
            [CROP_YEAR, AREA, ANNUAL_RAINFALL],
            [STATE_NAME, DISTRICT_NAME, SEASON, CROP],
        )
    }

    /// All feature columns in block order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.numerical
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.numerical.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn role(&self, column: &str) -> Option<ColumnRole> {
        if self.numerical.iter().any(|c| c == column) {
            Some(ColumnRole::Numerical)
        } else if self.categorical.iter().any(|c| c == column) {
            Some(ColumnRole::Categorical)
        } else {
            None
        }
    }

    /// Declared columns absent from `available`.
    pub fn missing_from<'a>(&self, available: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let available: BTreeSet<&str> = available.into_iter().collect();
        self.columns()
            .filter(|c| !available.contains(c))
            .map(str::to_string)
            .collect()
    }

    /// Reject empty schemas and columns declared twice.
    pub fn validate(&self) -> Result<(), MlError> {
        if self.is_empty() {
            return Err(MlError::transformation("feature schema declares no columns"));
        }
        let mut seen = BTreeSet::new();
        for column in self.columns() {
            if !seen.insert(column) {
                return Err(MlError::transformation(format!(
                    "column '{column}' is declared more than once in the feature schema"
                )));
            }
        }
        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::training()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_schema_partition() {
        let schema = FeatureSchema::training();
        assert_eq!(schema.numerical.len(), 4);
        assert_eq!(schema.categorical.len(), 5);
        assert_eq!(schema.role(SOIL_PH), Some(ColumnRole::Numerical));
        assert_eq!(schema.role(SOIL_TYPE), Some(ColumnRole::Categorical));
        assert_eq!(schema.role("Production"), None);
        schema.validate().unwrap();
    }

    #[test]
    fn test_serving_schema_is_subset_without_soil() {
        let training = FeatureSchema::training();
        let serving = FeatureSchema::serving();
        assert!(serving.columns().all(|c| training.role(c).is_some()));
        assert_eq!(
            training.missing_from(serving.columns()),
            vec![SOIL_PH.to_string(), SOIL_TYPE.to_string()]
        );
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let schema = FeatureSchema::new(["Area"], ["Area"]);
        assert!(matches!(
            schema.validate(),
            Err(MlError::Transformation(_))
        ));
    }

    #[test]
    fn test_schema_kind_parse() {
        assert_eq!("serving".parse::<SchemaKind>().unwrap(), SchemaKind::Serving);
        assert!("full".parse::<SchemaKind>().is_err());
        assert_eq!(SchemaKind::Training.to_string(), "training");
    }
}
